//! Dry-run rendering of a plan.

use std::fmt::Write;

use super::Plan;
use super::dag::{CycleError, PlanDag};

/// Render a plan for a dry run, tasks listed in execution-wave order.
///
/// ```text
/// Would build:
///   text-2.0.2: database=snapshot, source=/deps/text
///   app-0.1.0: database=local, source=/work/app, after: text-2.0.2
/// ```
pub fn render_plan(plan: &Plan) -> Result<String, CycleError> {
  if plan.is_empty() {
    return Ok("Nothing to build.\n".to_string());
  }

  let waves = PlanDag::from_plan(plan).waves()?;

  let mut out = String::from("Would build:\n");
  for ident in waves.iter().flatten() {
    let task = &plan.tasks[ident];
    let _ = write!(
      out,
      "  {}: database={}, source={}",
      ident,
      task.location,
      crate::tiers::render_path(task.task_type.source_dir())
    );
    if !task.deps.is_empty() {
      let after: Vec<String> = task.deps.iter().map(|d| d.to_string()).collect();
      let _ = write!(out, ", after: {}", after.join(", "));
    }
    out.push('\n');
  }

  Ok(out)
}
