//! Tree rendering for terminal output

use colored::Colorize;
use itertools::Itertools;
use termtree::Tree as TermTree;

use crate::domain::{is_unlocked, Node, Rules, Tree};

pub trait TreeDisplay {
    fn to_tree_string(&self, rules: &Rules) -> TermTree<String>;
}

impl TreeDisplay for Tree {
    /// One branch per row, talents ordered by column.
    fn to_tree_string(&self, rules: &Rules) -> TermTree<String> {
        if !self.is_available() {
            return TermTree::new(format!("{} (not yet available)", self.name()));
        }

        let mut root = TermTree::new(format!("{} [{}]", self.name(), self.points_spent()));
        let rows = self
            .nodes()
            .iter()
            .sorted_by_key(|n| (n.row, n.column))
            .chunk_by(|n| n.row);
        for (row, nodes) in &rows {
            let mut branch = TermTree::new(format!(
                "row {} (requires {})",
                row,
                rules.tier_threshold(row)
            ));
            for node in nodes {
                branch.push(TermTree::new(node_label(self, node, rules)));
            }
            root.push(branch);
        }
        root
    }
}

fn node_label(tree: &Tree, node: &Node, rules: &Rules) -> String {
    let label = format!("{} {}/{}", node.name, node.current_rank(), node.max_rank);
    if node.is_maxed() {
        label.yellow().to_string()
    } else if !is_unlocked(tree, node, rules) {
        format!("{label} (locked)").dimmed().to_string()
    } else if node.current_rank() > 0 {
        label.green().to_string()
    } else {
        label
    }
}
