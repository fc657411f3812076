//! Build construction from static talent definitions.
//!
//! Validates configuration once, up front, so the rule engine can rely on
//! resolvable, acyclic, same-tree prerequisites.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::entities::{Build, Node, Rules, Tree};
use crate::domain::error::{DomainError, DomainResult};

/// Static definition of one talent, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TalentDef {
    pub id: String,
    /// Display name, defaults to the id
    #[serde(default)]
    pub name: Option<String>,
    pub row: u32,
    #[serde(default)]
    pub column: u32,
    pub max_rank: u32,
    #[serde(default)]
    pub prerequisite: Option<String>,
    /// One description per rank
    #[serde(default)]
    pub ranks: Vec<String>,
}

impl TalentDef {
    /// Definition with placeholder rank descriptions.
    pub fn new(id: impl Into<String>, row: u32, column: u32, max_rank: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            row,
            column,
            max_rank,
            prerequisite: None,
            ranks: (1..=max_rank).map(|r| format!("Rank {r}")).collect(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn requires(mut self, prerequisite: impl Into<String>) -> Self {
        self.prerequisite = Some(prerequisite.into());
        self
    }

    pub fn describe(mut self, ranks: &[&str]) -> Self {
        self.ranks = ranks.iter().map(|r| r.to_string()).collect();
        self
    }
}

/// Static definition of one tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeDef {
    pub name: String,
    #[serde(default)]
    pub talents: Vec<TalentDef>,
}

impl TreeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            talents: Vec::new(),
        }
    }

    pub fn talent(mut self, talent: TalentDef) -> Self {
        self.talents.push(talent);
        self
    }
}

/// Assembles and validates a [`Build`].
#[derive(Debug, Clone)]
pub struct BuildBuilder {
    rules: Rules,
    trees: Vec<TreeDef>,
}

impl BuildBuilder {
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            trees: Vec::new(),
        }
    }

    pub fn tree(mut self, tree: TreeDef) -> Self {
        self.trees.push(tree);
        self
    }

    pub fn trees(mut self, trees: impl IntoIterator<Item = TreeDef>) -> Self {
        self.trees.extend(trees);
        self
    }

    /// Validates every definition and returns a build with all ranks at 0.
    #[instrument(level = "debug", skip(self))]
    pub fn build(self) -> DomainResult<Build> {
        if self.rules.max_points == 0 {
            return Err(DomainError::InvalidRules(
                "max_points must be at least 1".to_string(),
            ));
        }

        let mut seen_trees = HashSet::new();
        let mut trees = Vec::with_capacity(self.trees.len());
        for def in self.trees {
            check_name(&def.name)?;
            if def.name.contains(':') {
                return Err(DomainError::InvalidName {
                    name: def.name,
                    reason: "tree names cannot contain ':'",
                });
            }
            if !seen_trees.insert(def.name.clone()) {
                return Err(DomainError::DuplicateTree(def.name));
            }
            validate_tree(&def)?;
            debug!(tree = %def.name, talents = def.talents.len(), "tree validated");
            let nodes = def.talents.into_iter().map(Node::from_def).collect();
            trees.push(Tree::new(def.name, nodes));
        }

        Ok(Build::from_parts(self.rules, trees))
    }
}

/// Names end up in `tree:node+` plan steps, which are trimmed before parsing.
fn check_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidName {
            name: name.to_string(),
            reason: "must not be empty",
        });
    }
    if name.trim() != name {
        return Err(DomainError::InvalidName {
            name: name.to_string(),
            reason: "must not start or end with whitespace",
        });
    }
    Ok(())
}

fn validate_tree(def: &TreeDef) -> DomainResult<()> {
    let mut ids = HashSet::new();
    for talent in &def.talents {
        check_name(&talent.id)?;
        if !ids.insert(talent.id.as_str()) {
            return Err(DomainError::DuplicateNode {
                tree: def.name.clone(),
                node: talent.id.clone(),
            });
        }
        if talent.max_rank == 0 {
            return Err(DomainError::InvalidMaxRank {
                tree: def.name.clone(),
                node: talent.id.clone(),
            });
        }
        if talent.ranks.len() != talent.max_rank as usize {
            return Err(DomainError::RankDescriptionMismatch {
                tree: def.name.clone(),
                node: talent.id.clone(),
                expected: talent.max_rank,
                found: talent.ranks.len(),
            });
        }
    }

    for talent in &def.talents {
        if let Some(prerequisite) = &talent.prerequisite {
            if !ids.contains(prerequisite.as_str()) {
                return Err(DomainError::DanglingPrerequisite {
                    tree: def.name.clone(),
                    node: talent.id.clone(),
                    prerequisite: prerequisite.clone(),
                });
            }
        }
    }

    detect_cycles(def)
}

/// Each talent has at most one prerequisite, so following the chain from every
/// talent and watching for a repeat finds every cycle.
fn detect_cycles(def: &TreeDef) -> DomainResult<()> {
    let prerequisite_of = |id: &str| {
        def.talents
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.prerequisite.as_deref())
    };

    for talent in &def.talents {
        let mut visited = HashSet::new();
        let mut current = talent.id.as_str();
        while let Some(next) = prerequisite_of(current) {
            if !visited.insert(current) {
                return Err(DomainError::CycleDetected {
                    tree: def.name.clone(),
                    node: current.to_string(),
                });
            }
            current = next;
        }
    }
    Ok(())
}
