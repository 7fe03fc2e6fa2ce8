//! Aggregate statistics, computed in a single pass over the tree.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{JiraStatus, JiraSyncStats, Project, ProjectStatistics};

pub fn compute(project: &Project) -> ProjectStatistics {
    let mut stats = ProjectStatistics {
        project_id: project.project_id.clone(),
        project_name: project.project_name.clone(),
        epic_count: project.epics.len(),
        feature_count: 0,
        use_case_count: 0,
        test_case_count: 0,
        jira_sync_stats: JiraSyncStats::default(),
        test_type_distribution: BTreeMap::new(),
        review_status_distribution: BTreeMap::new(),
        compliance_coverage: Vec::new(),
    };
    let mut coverage = BTreeSet::new();

    for epic in &project.epics {
        match epic.jira_status {
            JiraStatus::Pushed => stats.jira_sync_stats.pushed += 1,
            JiraStatus::NotPushed => stats.jira_sync_stats.not_pushed += 1,
            JiraStatus::Failed => stats.jira_sync_stats.failed += 1,
        }

        for feature in &epic.features {
            stats.feature_count += 1;

            for use_case in &feature.use_cases {
                stats.use_case_count += 1;
                *stats
                    .review_status_distribution
                    .entry(use_case.review_status.as_str().to_string())
                    .or_default() += 1;
                coverage.extend(use_case.compliance_mapping.iter().cloned());

                for test_case in &use_case.test_cases {
                    stats.test_case_count += 1;
                    *stats
                        .test_type_distribution
                        .entry(test_case.test_type.clone())
                        .or_default() += 1;
                    *stats
                        .review_status_distribution
                        .entry(test_case.review_status.as_str().to_string())
                        .or_default() += 1;
                    coverage.extend(test_case.compliance_mapping.iter().cloned());
                }
            }
        }
    }

    stats.compliance_coverage = coverage.into_iter().collect();
    stats
}
