//! Structured queries about a build.
//!
//! - [`selector`] - Path selection over arbitrary JSON-like documents
//! - [`build_info`] - The build-info document and its YAML rendering

pub mod build_info;
pub mod selector;

pub use build_info::{BuildInfo, QueryError, query};
pub use selector::{SelectorError, select};
