//! Domain layer: talent trees and the allocation rule engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod accounting;
pub mod builder;
pub mod entities;
pub mod error;
pub mod rules;

pub use accounting::{points_below_row, points_spent, total_points_spent, Totals};
pub use builder::{BuildBuilder, TalentDef, TreeDef};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use rules::{can_decrease, can_increase, is_unlocked, Denial, NodeView};
