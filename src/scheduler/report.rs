use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::graph::NodeId;
use crate::lang::StatusFormatter;
use crate::status::{StatusCode, StatusKind};

/// How a node ended up in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeDisposition {
    Succeeded,
    Failed,
    TimedOut,
    /// Not executed because a predecessor failed or was skipped
    /// (`OnFailure::SkipDependents`).
    Skipped,
    /// Never dispatched because the run stopped after a failure
    /// (`OnFailure::Stop`).
    NotReached,
}

impl NodeDisposition {
    pub fn executed(&self) -> bool {
        matches!(
            self,
            NodeDisposition::Succeeded | NodeDisposition::Failed | NodeDisposition::TimedOut
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub node_id: NodeId,
    pub name: String,
    pub status: StatusCode,
    pub disposition: NodeDisposition,
    pub iterations: u32,
    pub duration: Duration,
}

impl NodeOutcome {
    pub(crate) fn not_executed(
        node_id: NodeId,
        name: &str,
        disposition: NodeDisposition,
    ) -> Self {
        Self {
            node_id,
            name: name.to_string(),
            status: StatusCode::ok(),
            disposition,
            iterations: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Terminal result of one graph run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRunReport {
    pub run_id: Uuid,
    /// The aggregated verdict.
    pub status: StatusCode,
    /// Every error absorbed during the run, in completion order.
    pub errors: Vec<StatusCode>,
    /// Highest Info/Warning severity seen, whatever the verdict.
    pub worst_non_error: Option<StatusKind>,
    /// One entry per node, in completion order; nodes that never ran follow.
    pub outcomes: Vec<NodeOutcome>,
    /// Statuses returned by `destroy` when the run included teardown.
    pub teardown: Vec<(NodeId, StatusCode)>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl GraphRunReport {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    /// True when some node reported a warning.
    pub fn has_warnings(&self) -> bool {
        self.worst_non_error == Some(StatusKind::Warning)
    }

    pub fn outcome(&self, node: NodeId) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.node_id == node)
    }

    pub fn outcome_by_name(&self, name: &str) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Names of executed nodes in the order they completed.
    pub fn completion_order(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition.executed())
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn count(&self, disposition: NodeDisposition) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == disposition)
            .count()
    }

    /// Teardown statuses that reported an error.
    pub fn teardown_errors(&self) -> impl Iterator<Item = &(NodeId, StatusCode)> {
        self.teardown.iter().filter(|(_, s)| s.is_error())
    }

    /// Display text for the verdict.
    pub fn message(&self, formatter: &StatusFormatter, tag: &str, default: &str) -> String {
        formatter.message(&self.status, tag, default)
    }
}
