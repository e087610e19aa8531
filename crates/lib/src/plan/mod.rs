//! Build plans.
//!
//! A [`Plan`] is the complete set of tasks needed to satisfy the requested
//! targets. Plans are produced by a plan constructor and only ever read by the
//! rest of the crate.
//!
//! # Submodules
//!
//! - [`dag`] - Dependency graph over plan tasks and execution waves
//! - [`print`] - Dry-run rendering

pub mod dag;
pub mod print;
mod types;

pub use types::*;
