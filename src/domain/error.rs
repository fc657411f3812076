//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent malformed configuration or references to things
/// that do not exist in a build. They indicate a data-integrity bug, never a
/// user action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown tree: {0}")]
    UnknownTree(String),

    #[error("unknown node: {tree}:{node}")]
    UnknownNode { tree: String, node: String },

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("duplicate tree: {0}")]
    DuplicateTree(String),

    #[error("duplicate node in tree {tree}: {node}")]
    DuplicateNode { tree: String, node: String },

    #[error("max rank of {tree}:{node} must be at least 1")]
    InvalidMaxRank { tree: String, node: String },

    #[error("{tree}:{node} has {found} rank descriptions, expected {expected}")]
    RankDescriptionMismatch {
        tree: String,
        node: String,
        expected: u32,
        found: usize,
    },

    #[error("{tree}:{node} requires unknown node {prerequisite}")]
    DanglingPrerequisite {
        tree: String,
        node: String,
        prerequisite: String,
    },

    #[error("cycle detected in prerequisites of tree {tree} at: {node}")]
    CycleDetected { tree: String, node: String },

    #[error("invalid rules: {0}")]
    InvalidRules(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
