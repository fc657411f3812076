//! Talent tree point-allocation engine.
//!
//! The [`domain`] layer holds the rule engine: per-node rank caps,
//! prerequisite chains, tier unlocks based on points spent in a tree, and a
//! global budget shared across trees. Everything else loads catalogs, reads
//! configuration and drives the engine from the command line.
//!
//! ```
//! use talentcalc::domain::{BuildBuilder, Denial, Rules, TalentDef, TreeDef};
//!
//! let mut build = BuildBuilder::new(Rules::default())
//!     .tree(TreeDef::new("arms").talent(TalentDef::new("deflection", 0, 1, 5)))
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..5 {
//!     build.increase("arms", "deflection").unwrap();
//! }
//! assert_eq!(build.can_increase("arms", "deflection"), Err(Denial::RankCapReached));
//! assert_eq!(build.total_points_spent(), 5);
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
