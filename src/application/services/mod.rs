//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem)
//! but are themselves concrete structs, not traits.

mod catalog;
mod planner;

pub use catalog::{Catalog, CatalogService};
pub use planner::{Action, Outcome, PlannerService, Step, StepReport};
