mod build;
mod info;
mod path;
mod query;

use std::path::Path;

use anyhow::{Context, Result};

use haul_lib::context::BuildContext;
use haul_lib::platform::{Platform, paths};
use haul_lib::project::Project;

pub use build::{BuildArgs, cmd_build};
pub use info::cmd_info;
pub use path::{PathArgs, cmd_path};
pub use query::cmd_query;

/// Locate and load the project named by `--project`, or the closest one
/// above the working directory.
pub fn load_project(project: Option<&Path>) -> Result<Project> {
  let config_path = match project {
    Some(path) if path.is_file() => path.to_path_buf(),
    Some(dir) => Project::discover(dir)?,
    None => {
      let cwd = std::env::current_dir().context("Failed to read working directory")?;
      Project::discover(&cwd)?
    }
  };

  Project::load(&config_path).with_context(|| format!("Failed to load project {}", config_path.display()))
}

pub fn host_platform() -> Result<Platform> {
  Platform::current().context("Unsupported platform")
}

/// Load the project and build its context for this host.
pub fn load_context(project: Option<&Path>) -> Result<(Project, BuildContext)> {
  let project = load_project(project)?;
  let ctx = project.context(host_platform()?, paths::root_dir());
  Ok((project, ctx))
}
