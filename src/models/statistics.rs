use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JiraSyncStats {
    pub pushed: usize,
    pub not_pushed: usize,
    pub failed: usize,
}

/// Aggregate counts over one project tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectStatistics {
    pub project_id: String,
    pub project_name: String,
    pub epic_count: usize,
    pub feature_count: usize,
    pub use_case_count: usize,
    pub test_case_count: usize,
    pub jira_sync_stats: JiraSyncStats,
    /// Test cases per `test_type`.
    pub test_type_distribution: BTreeMap<String, usize>,
    /// Use cases and test cases per review status.
    pub review_status_distribution: BTreeMap<String, usize>,
    /// Sorted union of every compliance tag mapped by a use case or test case.
    pub compliance_coverage: Vec<String>,
}
