//! Planner service
//!
//! Command surface over a shared build. Every command holds the build lock
//! across decision and mutation, so two callers can never interleave a stale
//! check with another caller's write.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use regex::Regex;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Build, Denial, DomainError, NodeView, Totals};

/// Result of a command that was decided without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transition was applied; totals are post-mutation
    Applied(Totals),
    /// The transition was declined; state is untouched
    Declined(Denial),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied(totals) => write!(f, "applied: {totals}"),
            Outcome::Declined(denial) => write!(f, "declined: {denial}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Increase,
    Decrease,
}

/// One planned command, written `tree:node+`, `tree:node-` or `reset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Change {
        tree: String,
        node: String,
        action: Action,
    },
    Reset,
}

impl Step {
    pub fn increase(tree: impl Into<String>, node: impl Into<String>) -> Self {
        Step::Change {
            tree: tree.into(),
            node: node.into(),
            action: Action::Increase,
        }
    }

    pub fn decrease(tree: impl Into<String>, node: impl Into<String>) -> Self {
        Step::Change {
            tree: tree.into(),
            node: node.into(),
            action: Action::Decrease,
        }
    }
}

/// Tree names never contain `:`; node ids may hold anything, the operator is
/// always the last character.
fn step_regex() -> ApplicationResult<Regex> {
    Regex::new(r"^(?P<tree>[^:]+):(?P<node>.+)(?P<op>[+-])$").map_err(|e| {
        ApplicationError::OperationFailed {
            context: "compile step pattern".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            )),
        }
    })
}

impl FromStr for Step {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("reset") {
            return Ok(Step::Reset);
        }
        let re = step_regex()?;
        let caps = re
            .captures(s)
            .ok_or_else(|| ApplicationError::InvalidStep(s.to_string()))?;
        let action = match &caps["op"] {
            "+" => Action::Increase,
            _ => Action::Decrease,
        };
        Ok(Step::Change {
            tree: caps["tree"].to_string(),
            node: caps["node"].to_string(),
            action,
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Change { tree, node, action } => {
                let op = match action {
                    Action::Increase => '+',
                    Action::Decrease => '-',
                };
                write!(f, "{tree}:{node}{op}")
            }
            Step::Reset => write!(f, "reset"),
        }
    }
}

/// A step together with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
}

/// Serialized access to one build.
#[derive(Debug)]
pub struct PlannerService {
    build: Mutex<Build>,
}

impl PlannerService {
    pub fn new(build: Build) -> Self {
        Self {
            build: Mutex::new(build),
        }
    }

    fn lock(&self) -> ApplicationResult<MutexGuard<'_, Build>> {
        self.build
            .lock()
            .map_err(|e| ApplicationError::StateUnavailable(e.to_string()))
    }

    /// Adds one rank if every increase rule admits it.
    #[instrument(level = "debug", skip(self))]
    pub fn increase(&self, tree: &str, node: &str) -> ApplicationResult<Outcome> {
        let mut build = self.lock()?;
        settle(build.increase(tree, node))
    }

    /// Removes one rank if every decrease rule admits it.
    #[instrument(level = "debug", skip(self))]
    pub fn decrease(&self, tree: &str, node: &str) -> ApplicationResult<Outcome> {
        let mut build = self.lock()?;
        settle(build.decrease(tree, node))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn reset(&self) -> ApplicationResult<Totals> {
        let mut build = self.lock()?;
        Ok(build.reset())
    }

    /// Applies steps in order under a single lock. Declined steps are reported
    /// and skipped; an unknown node aborts the plan.
    #[instrument(level = "debug", skip(self, steps), fields(steps = steps.len()))]
    pub fn apply(&self, steps: &[Step]) -> ApplicationResult<Vec<StepReport>> {
        let mut build = self.lock()?;
        let mut reports = Vec::with_capacity(steps.len());
        for step in steps {
            let outcome = match step {
                Step::Change {
                    tree,
                    node,
                    action: Action::Increase,
                } => settle(build.increase(tree, node))?,
                Step::Change {
                    tree,
                    node,
                    action: Action::Decrease,
                } => settle(build.decrease(tree, node))?,
                Step::Reset => Outcome::Applied(build.reset()),
            };
            debug!(%step, %outcome, "step");
            reports.push(StepReport {
                step: step.clone(),
                outcome,
            });
        }
        Ok(reports)
    }

    pub fn totals(&self) -> ApplicationResult<Totals> {
        Ok(self.lock()?.totals())
    }

    pub fn points_spent(&self, tree: &str) -> ApplicationResult<u32> {
        Ok(self.lock()?.points_spent(tree)?)
    }

    /// Decision only; the build is left as is.
    pub fn can_increase(&self, tree: &str, node: &str) -> ApplicationResult<Result<(), Denial>> {
        decide(self.lock()?.can_increase(tree, node))
    }

    pub fn can_decrease(&self, tree: &str, node: &str) -> ApplicationResult<Result<(), Denial>> {
        decide(self.lock()?.can_decrease(tree, node))
    }

    pub fn is_unlocked(&self, tree: &str, node: &str) -> ApplicationResult<bool> {
        Ok(self.lock()?.is_unlocked(tree, node)?)
    }

    /// Unlocked state and both decisions for one node.
    pub fn node_view(&self, tree: &str, node: &str) -> ApplicationResult<NodeView> {
        Ok(self.lock()?.node_view(tree, node)?)
    }

    /// Copy of the current build for read-only presentation.
    pub fn snapshot(&self) -> ApplicationResult<Build> {
        Ok(self.lock()?.clone())
    }
}

/// Turns a domain transition result into an outcome, escalating unknown nodes.
fn settle(result: Result<Totals, Denial>) -> ApplicationResult<Outcome> {
    match result {
        Ok(totals) => Ok(Outcome::Applied(totals)),
        Err(denial) => match DomainError::try_from(denial) {
            Ok(fatal) => Err(fatal.into()),
            Err(denial) => Ok(Outcome::Declined(denial)),
        },
    }
}

fn decide(result: Result<(), Denial>) -> ApplicationResult<Result<(), Denial>> {
    match result {
        Ok(()) => Ok(Ok(())),
        Err(denial) => match DomainError::try_from(denial) {
            Ok(fatal) => Err(fatal.into()),
            Err(denial) => Ok(Err(denial)),
        },
    }
}
