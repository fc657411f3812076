//! Allocation rule engine
//!
//! Pure decisions over a [`Build`]: whether one rank may be added to or
//! removed from a node. Rules are evaluated in a fixed order and the first
//! failing rule is returned as a [`Denial`]. Nothing here mutates state.

use thiserror::Error;
use tracing::trace;

use crate::domain::accounting::{points_below_row, total_points_spent};
use crate::domain::entities::{Build, Node, Rules, Tree};
use crate::domain::error::DomainError;

/// Why a transition was declined.
///
/// Every variant except [`Denial::UnknownNode`] is an ordinary outcome of a
/// user action. `UnknownNode` means the caller referenced something the build
/// does not contain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("unknown node: {tree}:{node}")]
    UnknownNode { tree: String, node: String },

    #[error("rank cap reached")]
    RankCapReached,

    #[error("global point budget exhausted")]
    GlobalBudgetExhausted,

    #[error("prerequisite {prerequisite} is not maxed")]
    PrerequisiteUnmet { prerequisite: String },

    #[error("requires {required} points in lower rows, {spent} spent")]
    TierThresholdUnmet { required: u32, spent: u32 },

    #[error("no points allocated")]
    NoPointsAllocated,

    #[error("{dependent} depends on it")]
    HasDependents { dependent: String },

    #[error("{node} would lose its tier support")]
    TierConsistencyViolation { node: String },
}

impl Denial {
    /// True for denials that indicate a broken caller or configuration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Denial::UnknownNode { .. })
    }
}

impl TryFrom<Denial> for DomainError {
    type Error = Denial;

    /// Escalates fatal denials; ordinary denials are handed back unchanged.
    fn try_from(denial: Denial) -> Result<Self, Self::Error> {
        match denial {
            Denial::UnknownNode { tree, node } => Ok(DomainError::UnknownNode { tree, node }),
            other => Err(other),
        }
    }
}

/// Unlocked predicate plus both decisions for one node, as presentation needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    pub unlocked: bool,
    pub increase: Result<(), Denial>,
    pub decrease: Result<(), Denial>,
}

fn locate<'a>(build: &'a Build, tree: &str, node: &str) -> Result<(&'a Tree, &'a Node), Denial> {
    build
        .tree(tree)
        .and_then(|t| t.node(node).map(|n| (t, n)))
        .ok_or_else(|| Denial::UnknownNode {
            tree: tree.to_string(),
            node: node.to_string(),
        })
}

fn check_prerequisite(tree: &Tree, node: &Node) -> Result<(), Denial> {
    let Some(prerequisite) = node.prerequisite.as_deref() else {
        return Ok(());
    };
    match tree.node(prerequisite) {
        Some(p) if p.is_maxed() => Ok(()),
        _ => Err(Denial::PrerequisiteUnmet {
            prerequisite: prerequisite.to_string(),
        }),
    }
}

fn check_tier(tree: &Tree, node: &Node, rules: &Rules) -> Result<(), Denial> {
    let required = node.required_points(rules);
    let spent = points_below_row(tree, node.row);
    if spent < required {
        return Err(Denial::TierThresholdUnmet { required, spent });
    }
    Ok(())
}

/// First node holding ranks whose lower rows no longer carry its threshold.
fn find_unsupported<'a>(tree: &'a Tree, rules: &Rules) -> Option<&'a Node> {
    tree.nodes().iter().find(|n| {
        n.current_rank() > 0
            && n.row > 0
            && points_below_row(tree, n.row) < n.required_points(rules)
    })
}

/// Decides whether one rank may be added to `node` in `tree`.
///
/// Order: existence, rank cap, global budget, prerequisite maxed, tier threshold.
/// Budget and tier are checked against the pre-increment state.
pub fn can_increase(build: &Build, tree: &str, node: &str) -> Result<(), Denial> {
    let (t, n) = locate(build, tree, node)?;
    if n.is_maxed() {
        return Err(Denial::RankCapReached);
    }
    if total_points_spent(build) >= build.rules().max_points {
        return Err(Denial::GlobalBudgetExhausted);
    }
    check_prerequisite(t, n)?;
    check_tier(t, n, build.rules())?;
    trace!(tree, node, "increase admissible");
    Ok(())
}

/// Decides whether one rank may be removed from `node` in `tree`.
///
/// Order: existence and rank above 0, no learned dependent, then tier
/// consistency of the whole tree simulated with this node one rank lower.
/// Every learned node of the tree is re-checked, not only those downstream.
pub fn can_decrease(build: &Build, tree: &str, node: &str) -> Result<(), Denial> {
    let (t, n) = locate(build, tree, node)?;
    if n.current_rank() == 0 {
        return Err(Denial::NoPointsAllocated);
    }
    if let Some(dependent) = t.dependents_of(&n.id).find(|d| d.current_rank() > 0) {
        return Err(Denial::HasDependents {
            dependent: dependent.id.clone(),
        });
    }
    let hypothetical = t.with_rank(&n.id, n.current_rank() - 1);
    if let Some(unsupported) = find_unsupported(&hypothetical, build.rules()) {
        return Err(Denial::TierConsistencyViolation {
            node: unsupported.id.clone(),
        });
    }
    trace!(tree, node, "decrease admissible");
    Ok(())
}

/// Prerequisite maxed and tier threshold met; rank cap and budget are ignored.
pub fn is_unlocked(tree: &Tree, node: &Node, rules: &Rules) -> bool {
    check_prerequisite(tree, node).is_ok() && check_tier(tree, node, rules).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builder::{BuildBuilder, TalentDef, TreeDef};

    fn build() -> Build {
        BuildBuilder::new(Rules::new(51, 5))
            .tree(
                TreeDef::new("arms")
                    .talent(TalentDef::new("a", 0, 0, 5))
                    .talent(TalentDef::new("b", 0, 1, 3))
                    .talent(TalentDef::new("c", 1, 0, 1).requires("b"))
                    .talent(TalentDef::new("d", 1, 1, 5)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn given_fresh_build_when_checking_top_row_then_admissible() {
        assert_eq!(can_increase(&build(), "arms", "a"), Ok(()));
    }

    #[test]
    fn given_unknown_tree_when_checking_then_unknown_node() {
        let denial = can_increase(&build(), "fury", "a").unwrap_err();
        assert!(denial.is_fatal());
        assert_eq!(
            DomainError::try_from(denial),
            Ok(DomainError::UnknownNode {
                tree: "fury".into(),
                node: "a".into()
            })
        );
    }

    #[test]
    fn given_ordinary_denial_when_escalating_then_handed_back() {
        assert_eq!(
            DomainError::try_from(Denial::RankCapReached),
            Err(Denial::RankCapReached)
        );
    }

    #[test]
    fn given_unmet_prerequisite_and_tier_when_checking_then_prerequisite_reported_first() {
        assert_eq!(
            can_increase(&build(), "arms", "c"),
            Err(Denial::PrerequisiteUnmet {
                prerequisite: "b".into()
            })
        );
    }

    #[test]
    fn given_maxed_prerequisite_without_tier_support_when_checking_then_tier_unmet() {
        let mut build = build();
        for _ in 0..3 {
            build.increase("arms", "b").unwrap();
        }

        assert_eq!(
            can_increase(&build, "arms", "c"),
            Err(Denial::TierThresholdUnmet {
                required: 5,
                spent: 3
            })
        );
        assert!(!is_unlocked(
            build.tree("arms").unwrap(),
            build.node("arms", "c").unwrap(),
            build.rules()
        ));
    }

    #[test]
    fn given_zero_rank_when_decreasing_then_no_points_allocated() {
        assert_eq!(
            can_decrease(&build(), "arms", "a"),
            Err(Denial::NoPointsAllocated)
        );
    }

    #[test]
    fn given_tier_supported_by_two_nodes_when_removing_either_then_violation() {
        // a=2, b=3 support d=1 at row 1; any removal above drops support below 5.
        let mut build = build();
        build.increase("arms", "a").unwrap();
        build.increase("arms", "a").unwrap();
        for _ in 0..3 {
            build.increase("arms", "b").unwrap();
        }
        build.increase("arms", "d").unwrap();

        let violation = Err(Denial::TierConsistencyViolation { node: "d".into() });
        assert_eq!(can_decrease(&build, "arms", "a"), violation);
        assert_eq!(can_decrease(&build, "arms", "b"), violation);
        assert_eq!(can_decrease(&build, "arms", "d"), Ok(()));
    }

    #[test]
    fn given_excess_lower_points_when_decreasing_then_admissible() {
        let mut build = build();
        for _ in 0..5 {
            build.increase("arms", "a").unwrap();
        }
        build.increase("arms", "b").unwrap();
        build.increase("arms", "d").unwrap();

        assert_eq!(can_decrease(&build, "arms", "a"), Ok(()));
        assert_eq!(can_decrease(&build, "arms", "b"), Ok(()));

        build.decrease("arms", "b").unwrap();
        assert_eq!(
            can_decrease(&build, "arms", "a"),
            Err(Denial::TierConsistencyViolation { node: "d".into() })
        );
    }

    #[test]
    fn given_zero_points_per_row_when_checking_lower_rows_then_always_unlocked() {
        let build = BuildBuilder::new(Rules::new(10, 0))
            .tree(TreeDef::new("arms").talent(TalentDef::new("deep", 6, 0, 1)))
            .build()
            .unwrap();
        assert_eq!(can_increase(&build, "arms", "deep"), Ok(()));
    }
}
