//! Implementation of the `haul query` command.

use std::path::Path;

use anyhow::Result;

use haul_lib::query::{BuildInfo, query};

use super::load_context;

pub fn cmd_query(project: Option<&Path>, selectors: &[String]) -> Result<()> {
  let (project, ctx) = load_context(project)?;
  let info = BuildInfo::new(&ctx, &project.locals);
  print!("{}", query(info.document(), selectors)?);
  Ok(())
}
