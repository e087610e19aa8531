//! File-backed package databases: registrations, probing and planning.

pub mod dump;
pub mod planner;
pub mod probe;

pub use dump::{DumpError, DumpPackage};
pub use planner::{PlanError, ResolvedPlanner};
pub use probe::DbProber;
