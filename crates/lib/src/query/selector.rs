//! Selector paths over nested documents.
//!
//! A selector path is a sequence of strings consumed one at a time against a
//! [`serde_json::Value`]: object members are selected by key, array elements
//! by decimal index. No schema is assumed.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
  #[error("Selector not found: {}", render_path(.path))]
  NotFound { path: Vec<String> },

  #[error("Index out of range: {}", render_path(.path))]
  IndexOutOfRange { path: Vec<String> },

  #[error("Encountered array and needed numeric selector: {}", render_path(.path))]
  NeedNumeric { path: Vec<String> },

  #[error("Cannot apply selector to {value}: {}", render_path(.path))]
  CannotApply { value: String, path: Vec<String> },
}

impl SelectorError {
  /// The selectors consumed up to and including the one that failed.
  pub fn path(&self) -> &[String] {
    match self {
      SelectorError::NotFound { path }
      | SelectorError::IndexOutOfRange { path }
      | SelectorError::NeedNumeric { path }
      | SelectorError::CannotApply { path, .. } => path,
    }
  }
}

fn render_path(path: &[String]) -> String {
  format!("[{}]", path.iter().map(|s| format!("{:?}", s)).collect::<Vec<_>>().join(","))
}

/// Follow `selectors` from the root of `doc` and return the addressed value.
///
/// An empty path returns `doc` itself.
pub fn select<'a, S: AsRef<str>>(doc: &'a Value, selectors: &[S]) -> Result<&'a Value, SelectorError> {
  let mut current = doc;

  for (consumed, selector) in selectors.iter().enumerate() {
    let selector = selector.as_ref();
    let path = || {
      selectors[..=consumed]
        .iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
    };

    current = match current {
      Value::Object(map) => map.get(selector).ok_or_else(|| SelectorError::NotFound { path: path() })?,
      Value::Array(items) => {
        let index = parse_index(selector).ok_or_else(|| SelectorError::NeedNumeric { path: path() })?;
        items
          .get(index)
          .ok_or_else(|| SelectorError::IndexOutOfRange { path: path() })?
      }
      scalar => {
        return Err(SelectorError::CannotApply {
          value: scalar.to_string(),
          path: path(),
        });
      }
    };
  }

  Ok(current)
}

/// A non-negative decimal integer with nothing else around it.
///
/// Digit runs too large for `usize` still count as numeric; they are simply
/// out of range.
fn parse_index(selector: &str) -> Option<usize> {
  if selector.is_empty() || !selector.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  Some(selector.parse::<usize>().unwrap_or(usize::MAX))
}
