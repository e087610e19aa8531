//! haul-lib: Core types and logic for haul
//!
//! This crate provides the build orchestration behind the `haul` command:
//! - `Project`: the project file and the local packages it names
//! - `DatabaseTierSet`: the four package databases, lowest precedence first
//! - `Plan`: the tasks needed to satisfy a set of targets
//! - `pipeline::build`: the ordered stages from probing to execution
//! - `SnapshotLock`: the advisory lock over the shared install tree

pub mod collision;
pub mod consts;
pub mod context;
pub mod execute;
pub mod install;
pub mod package;
pub mod path_info;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod project;
pub mod query;
pub mod snapshot_lock;
pub mod tiers;
pub mod types;
pub mod util;
