//! Implementation of the `haul info` command.

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use haul_lib::tiers::{InstallRoots, render_path};

use super::{host_platform, load_context};
use crate::output::{print_info, print_json, print_stat, print_success};

pub fn cmd_info(project: Option<&Path>, json: bool) -> Result<()> {
  let platform = host_platform()?;

  let loaded = load_context(project);
  let (project, ctx) = match loaded {
    Ok(loaded) => loaded,
    Err(err) if !json => {
      print_success(&format!("haul v{}", env!("CARGO_PKG_VERSION")));
      print_stat("Platform", &platform.triple());
      println!();
      print_info(&format!("No project loaded: {:#}", err));
      return Ok(());
    }
    Err(err) => return Err(err),
  };

  let roots = InstallRoots::resolve(&ctx);
  let packages: Vec<String> = project.locals.iter().map(|lp| lp.ident().to_string()).collect();

  if json {
    return print_json(&json!({
      "version": env!("CARGO_PKG_VERSION"),
      "platform": platform.triple(),
      "project": render_path(&ctx.project_root),
      "snapshot": ctx.snapshot,
      "compiler": ctx.compiler.actual.to_string(),
      "toolchain": ctx.compiler.toolchain.to_string(),
      "packages": packages,
      "snapshot_install_root": render_path(&roots.snapshot),
      "local_install_root": render_path(&roots.local),
    }));
  }

  print_success(&format!("haul v{}", env!("CARGO_PKG_VERSION")));
  print_stat("Platform", &platform.triple());
  println!();
  print_stat("Project", &render_path(&ctx.project_root));
  print_stat("Snapshot", &ctx.snapshot);
  print_stat("Compiler", &ctx.compiler.actual.to_string());
  print_stat("Toolchain", &ctx.compiler.toolchain.to_string());
  print_stat("Packages", &packages.join(", "));
  println!();
  print_stat("Snapshot install root", &render_path(&roots.snapshot));
  print_stat("Local install root", &render_path(&roots.local));

  Ok(())
}
