//! Aggregate accounting: points spent per tree, per build, and below a row.
//!
//! All functions are pure and linear in the number of nodes.

use std::fmt;

use itertools::Itertools;

use crate::domain::entities::{Build, Node, Tree};

/// Sum of current ranks over every node of `tree`.
pub fn points_spent(tree: &Tree) -> u32 {
    tree.nodes().iter().map(Node::current_rank).sum()
}

/// Sum of [`points_spent`] over every tree of `build`.
pub fn total_points_spent(build: &Build) -> u32 {
    build.trees().iter().map(points_spent).sum()
}

/// Sum of current ranks over nodes whose row index is lower than `row`.
///
/// Works on any tree value, including hypothetical copies built while
/// checking whether a removal keeps higher tiers supported.
pub fn points_below_row(tree: &Tree, row: u32) -> u32 {
    tree.nodes()
        .iter()
        .filter(|n| n.row < row)
        .map(Node::current_rank)
        .sum()
}

/// Spent points per tree plus the global total, as reported after every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    /// (tree name, points spent) in build order
    pub per_tree: Vec<(String, u32)>,
    pub total: u32,
    pub max_points: u32,
}

impl Totals {
    pub fn tree(&self, name: &str) -> Option<u32> {
        self.per_tree
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spent)| *spent)
    }

    pub fn remaining(&self) -> u32 {
        self.max_points.saturating_sub(self.total)
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let split = self.per_tree.iter().map(|(_, spent)| spent).join("/");
        write!(f, "{} ({} / {})", split, self.total, self.max_points)
    }
}

pub fn totals(build: &Build) -> Totals {
    let per_tree: Vec<(String, u32)> = build
        .trees()
        .iter()
        .map(|t| (t.name().to_string(), points_spent(t)))
        .collect();
    let total = per_tree.iter().map(|(_, spent)| spent).sum();
    Totals {
        per_tree,
        total,
        max_points: build.rules().max_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builder::{BuildBuilder, TalentDef, TreeDef};
    use crate::domain::entities::Rules;

    fn build() -> Build {
        BuildBuilder::new(Rules::default())
            .tree(
                TreeDef::new("arms")
                    .talent(TalentDef::new("top", 0, 0, 5))
                    .talent(TalentDef::new("mid", 1, 0, 5))
                    .talent(TalentDef::new("low", 2, 0, 1)),
            )
            .tree(TreeDef::new("fury").talent(TalentDef::new("cruelty", 0, 1, 5)))
            .tree(TreeDef::new("prot"))
            .build()
            .unwrap()
    }

    #[test]
    fn given_empty_build_when_accounting_then_everything_is_zero() {
        let build = build();
        let totals = totals(&build);

        assert_eq!(totals.total, 0);
        assert_eq!(totals.remaining(), 51);
        assert_eq!(totals.tree("prot"), Some(0));
        assert_eq!(totals.tree("missing"), None);
    }

    #[test]
    fn given_points_in_two_trees_when_accounting_then_sums_per_tree_and_globally() {
        let mut build = build();
        for _ in 0..5 {
            build.increase("arms", "top").unwrap();
        }
        build.increase("arms", "mid").unwrap();
        build.increase("fury", "cruelty").unwrap();

        let arms = build.tree("arms").unwrap();
        assert_eq!(points_spent(arms), 6);
        assert_eq!(points_below_row(arms, 0), 0);
        assert_eq!(points_below_row(arms, 1), 5);
        assert_eq!(points_below_row(arms, 2), 6);
        assert_eq!(total_points_spent(&build), 7);
        assert_eq!(totals(&build).to_string(), "6/1/0 (7 / 51)");
    }
}
