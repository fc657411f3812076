//! Domain entities: talents, trees and the build that owns them
//!
//! `Build` is the only mutator of allocated ranks. Every transition goes
//! through the rule engine first; there is no setter that bypasses it.

use std::fmt;

use tracing::{debug, info};

use crate::domain::accounting::{self, Totals};
use crate::domain::builder::TalentDef;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::rules::{self, Denial, NodeView};

/// Default global budget shared by all trees of a build.
pub const DEFAULT_MAX_POINTS: u32 = 51;

/// Default number of lower-row points each row requires.
pub const DEFAULT_POINTS_PER_ROW: u32 = 5;

/// Constants that parameterise the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Total ranks allowed across every tree of a build
    pub max_points: u32,
    /// Points per row a node must see spent below it before it can hold ranks
    pub points_per_row: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            points_per_row: DEFAULT_POINTS_PER_ROW,
        }
    }
}

impl Rules {
    pub fn new(max_points: u32, points_per_row: u32) -> Self {
        Self {
            max_points,
            points_per_row,
        }
    }

    /// Points that must be spent in lower rows before a node at `row` unlocks.
    pub fn tier_threshold(&self, row: u32) -> u32 {
        row.saturating_mul(self.points_per_row)
    }
}

/// A single allocatable talent.
///
/// Configuration fields are fixed at load time; only the current rank changes,
/// and only through [`Build::increase`], [`Build::decrease`] and [`Build::reset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Unique within its tree
    pub id: String,
    /// Display name
    pub name: String,
    /// Tier of the node, 0 is the top row
    pub row: u32,
    /// Layout only, ignored by the rules
    pub column: u32,
    pub max_rank: u32,
    /// Id of a node in the same tree that must be maxed first
    pub prerequisite: Option<String>,
    /// One description per rank, index 0 describes rank 1
    pub rank_descriptions: Vec<String>,
    current_rank: u32,
}

impl Node {
    pub(crate) fn from_def(def: TalentDef) -> Self {
        let name = def.name.unwrap_or_else(|| def.id.clone());
        Self {
            id: def.id,
            name,
            row: def.row,
            column: def.column,
            max_rank: def.max_rank,
            prerequisite: def.prerequisite,
            rank_descriptions: def.ranks,
            current_rank: 0,
        }
    }

    pub fn current_rank(&self) -> u32 {
        self.current_rank
    }

    pub fn is_maxed(&self) -> bool {
        self.current_rank >= self.max_rank
    }

    /// Lower-row points this node needs before it can hold any rank.
    pub fn required_points(&self, rules: &Rules) -> u32 {
        rules.tier_threshold(self.row)
    }

    /// Description of the rank currently held, `None` at rank 0.
    pub fn current_description(&self) -> Option<&str> {
        let idx = self.current_rank.checked_sub(1)?;
        self.rank_descriptions.get(idx as usize).map(String::as_str)
    }

    /// Description of the next rank, `None` once maxed.
    pub fn next_description(&self) -> Option<&str> {
        if self.is_maxed() {
            return None;
        }
        self.rank_descriptions
            .get(self.current_rank as usize)
            .map(String::as_str)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.name, self.current_rank, self.max_rank)
    }
}

/// A named, ordered collection of nodes (one specialization).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    name: String,
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn new(name: String, nodes: Vec<Node>) -> Self {
        Self { name, nodes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Trees without nodes are placeholders for specializations not yet available.
    pub fn is_available(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn points_spent(&self) -> u32 {
        accounting::points_spent(self)
    }

    pub fn points_below_row(&self, row: u32) -> u32 {
        accounting::points_below_row(self, row)
    }

    /// Nodes that name `id` as their prerequisite.
    pub fn dependents_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.prerequisite.as_deref() == Some(id))
    }

    /// Copy of this tree with one node's rank replaced; the original is untouched.
    pub(crate) fn with_rank(&self, id: &str, rank: u32) -> Tree {
        let mut hypothetical = self.clone();
        if let Some(node) = hypothetical.node_mut(id) {
            node.current_rank = rank;
        }
        hypothetical
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn reset(&mut self) {
        for node in &mut self.nodes {
            node.current_rank = 0;
        }
    }
}

/// All trees a planner knows about plus the rules that bind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    rules: Rules,
    trees: Vec<Tree>,
}

impl Build {
    pub(crate) fn from_parts(rules: Rules, trees: Vec<Tree>) -> Self {
        Self { rules, trees }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn tree(&self, name: &str) -> Option<&Tree> {
        self.trees.iter().find(|t| t.name == name)
    }

    pub fn node(&self, tree: &str, node: &str) -> DomainResult<&Node> {
        self.tree(tree)
            .and_then(|t| t.node(node))
            .ok_or_else(|| DomainError::UnknownNode {
                tree: tree.to_string(),
                node: node.to_string(),
            })
    }

    /// Ranks spent in the named tree.
    pub fn points_spent(&self, tree: &str) -> DomainResult<u32> {
        self.tree(tree)
            .map(Tree::points_spent)
            .ok_or_else(|| DomainError::UnknownTree(tree.to_string()))
    }

    /// Ranks spent across every tree.
    pub fn total_points_spent(&self) -> u32 {
        accounting::total_points_spent(self)
    }

    pub fn totals(&self) -> Totals {
        accounting::totals(self)
    }

    pub fn can_increase(&self, tree: &str, node: &str) -> Result<(), Denial> {
        rules::can_increase(self, tree, node)
    }

    pub fn can_decrease(&self, tree: &str, node: &str) -> Result<(), Denial> {
        rules::can_decrease(self, tree, node)
    }

    /// Prerequisite maxed and tier threshold met, regardless of rank cap or budget.
    pub fn is_unlocked(&self, tree: &str, node: &str) -> DomainResult<bool> {
        let t = self
            .tree(tree)
            .ok_or_else(|| DomainError::UnknownTree(tree.to_string()))?;
        let n = self.node(tree, node)?;
        Ok(rules::is_unlocked(t, n, &self.rules))
    }

    pub fn node_view(&self, tree: &str, node: &str) -> DomainResult<NodeView> {
        Ok(NodeView {
            unlocked: self.is_unlocked(tree, node)?,
            increase: self.can_increase(tree, node),
            decrease: self.can_decrease(tree, node),
        })
    }

    /// The node that must be maxed before `node` accepts its first rank.
    pub fn prerequisite_of(&self, tree: &str, node: &str) -> DomainResult<Option<&Node>> {
        let n = self.node(tree, node)?;
        Ok(n
            .prerequisite
            .as_deref()
            .and_then(|p| self.tree(tree).and_then(|t| t.node(p))))
    }

    /// Adds one rank after re-validating against the current state.
    pub fn increase(&mut self, tree: &str, node: &str) -> Result<Totals, Denial> {
        if let Err(denial) = rules::can_increase(self, tree, node) {
            debug!(tree, node, %denial, "increase declined");
            return Err(denial);
        }
        let n = self.node_mut(tree, node)?;
        n.current_rank += 1;
        info!(tree, node, rank = n.current_rank, "rank increased");
        Ok(self.totals())
    }

    /// Removes one rank after re-validating against the current state.
    pub fn decrease(&mut self, tree: &str, node: &str) -> Result<Totals, Denial> {
        if let Err(denial) = rules::can_decrease(self, tree, node) {
            debug!(tree, node, %denial, "decrease declined");
            return Err(denial);
        }
        let n = self.node_mut(tree, node)?;
        n.current_rank -= 1;
        info!(tree, node, rank = n.current_rank, "rank decreased");
        Ok(self.totals())
    }

    /// Sets every rank in every tree back to 0. Always admissible.
    pub fn reset(&mut self) -> Totals {
        for tree in &mut self.trees {
            tree.reset();
        }
        info!("build reset");
        self.totals()
    }

    fn node_mut(&mut self, tree: &str, node: &str) -> Result<&mut Node, Denial> {
        self.trees
            .iter_mut()
            .find(|t| t.name == tree)
            .and_then(|t| t.node_mut(node))
            .ok_or_else(|| Denial::UnknownNode {
                tree: tree.to_string(),
                node: node.to_string(),
            })
    }
}
