use serde::{Deserialize, Serialize};

use super::Level;

/// What an import did with one node of the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    Created,
    Updated,
    /// Content matched the stored node exactly.
    Unchanged,
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeOutcome {
    pub level: Level,
    /// Final ID for created/updated nodes, the supplied ID (if any) for skipped ones.
    pub id: Option<String>,
    pub label: Option<String>,
    pub outcome: MergeOutcome,
}

/// Per-node account of one import call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// The payload carried a new `coverage_summary` for the project.
    pub coverage_summary_updated: bool,
    /// Whether the import wrote a new document version.
    pub committed: bool,
    pub outcomes: Vec<NodeOutcome>,
}

impl MergeReport {
    pub fn record(
        &mut self,
        level: Level,
        id: Option<String>,
        label: Option<String>,
        outcome: MergeOutcome,
    ) {
        match outcome {
            MergeOutcome::Created => self.created += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Unchanged => self.unchanged += 1,
            MergeOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(NodeOutcome {
            level,
            id,
            label,
            outcome,
        });
    }

    pub fn has_changes(&self) -> bool {
        self.created > 0 || self.updated > 0 || self.coverage_summary_updated
    }

    /// Outcomes recorded for a given node ID.
    pub fn outcome_for(&self, id: &str) -> Option<&MergeOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.id.as_deref() == Some(id))
            .map(|o| &o.outcome)
    }

    pub fn created_ids(&self, level: Level) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.level == level && o.outcome == MergeOutcome::Created)
            .filter_map(|o| o.id.as_deref())
            .collect()
    }
}
