//! The build-info document.
//!
//! ```yaml
//! compiler:
//!   actual: 9.6.4
//!   wanted: 9.6.4
//! global-hints:
//!   base: 4.18.2.0
//! locals:
//!   my-app:
//!     path: /home/me/my-app
//!     version: 0.1.0
//! ```

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::context::BuildContext;
use crate::package::LocalPackage;
use crate::tiers::render_path;

use super::selector::{SelectorError, select};

const GLOBAL_HINTS_KEY: &str = "global-hints";
const GLOBAL_HINTS_NOTE: &str = "Note: global-hints is experimental and may be renamed / removed in the future";

#[derive(Debug, Error)]
pub enum QueryError {
  #[error(transparent)]
  Selector(#[from] SelectorError),

  #[error("failed to render query result: {0}")]
  Render(#[from] serde_yaml::Error),
}

/// Information about the current build: project packages and compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInfo {
  doc: Value,
}

impl BuildInfo {
  pub fn new(ctx: &BuildContext, locals: &[LocalPackage]) -> Self {
    let locals: Map<String, Value> = locals
      .iter()
      .map(|lp| {
        (
          lp.name().to_string(),
          json!({
            "version": lp.ident().version.to_string(),
            "path": render_path(&lp.dir),
          }),
        )
      })
      .collect();

    let mut doc = Map::new();
    doc.insert("locals".to_string(), Value::Object(locals));
    doc.insert(
      "compiler".to_string(),
      json!({
        "wanted": ctx.compiler.wanted.to_string(),
        "actual": ctx.compiler.actual.to_string(),
      }),
    );

    if !ctx.global_hints.is_empty() {
      let hints: Map<String, Value> = ctx
        .global_hints
        .iter()
        .map(|(name, version)| (name.to_string(), Value::String(version.to_string())))
        .collect();
      doc.insert(GLOBAL_HINTS_KEY.to_string(), Value::Object(hints));
    }

    Self { doc: Value::Object(doc) }
  }

  pub fn document(&self) -> &Value {
    &self.doc
  }
}

/// Select from `doc` and render the result as YAML.
///
/// `global-hints` carries a note about its experimental status whenever it
/// is part of the output: inline above the block for the whole document, as
/// a document-start comment when it is selected directly.
pub fn query<S: AsRef<str>>(doc: &Value, selectors: &[S]) -> Result<String, QueryError> {
  let selected = select(doc, selectors)?;
  let rendered = serde_yaml::to_string(selected)?;

  let selects_hints = selectors.len() == 1 && selectors[0].as_ref() == GLOBAL_HINTS_KEY;
  let output = if selectors.is_empty() {
    comment_global_hints(&rendered)
  } else if selects_hints {
    format!("--- # {}\n{}", GLOBAL_HINTS_NOTE, rendered)
  } else {
    rendered
  };

  Ok(output)
}

fn comment_global_hints(rendered: &str) -> String {
  let block = format!("{}:\n", GLOBAL_HINTS_KEY);
  let commented = format!("# {}\n{}", GLOBAL_HINTS_NOTE, block);

  if rendered.starts_with(&block) {
    return rendered.replacen(&block, &commented, 1);
  }
  rendered.replacen(&format!("\n{}", block), &format!("\n{}", commented), 1)
}
