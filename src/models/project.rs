use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Epic;

/// A project and its complete test-artifact tree.
///
/// The project is the unit of storage: the whole tree below it is persisted as
/// one document and every mutation replaces that document atomically.
/// `retired_ids` remembers the identifiers of deleted nodes so the allocator
/// never hands them out again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub project_id: String,
    #[serde(alias = "name")]
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub compliance_frameworks: Vec<String>,
    #[serde(default)]
    pub jira_project_key: Option<String>,
    /// Free-form coverage notes produced by the generating agent.
    #[serde(default)]
    pub coverage_summary: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub epics: Vec<Epic>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub retired_ids: BTreeSet<String>,
}

impl Project {
    pub fn feature_count(&self) -> usize {
        self.epics.iter().map(|e| e.features.len()).sum()
    }

    pub fn use_case_count(&self) -> usize {
        self.epics
            .iter()
            .flat_map(|e| &e.features)
            .map(|f| f.use_cases.len())
            .sum()
    }

    pub fn test_case_count(&self) -> usize {
        self.epics
            .iter()
            .flat_map(|e| &e.features)
            .flat_map(|f| &f.use_cases)
            .map(|uc| uc.test_cases.len())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "completed")]
    Completed,
    #[serde(rename = "On Hold", alias = "on_hold", alias = "OnHold")]
    OnHold,
    #[serde(alias = "archived")]
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::OnHold => "On Hold",
            Self::Archived => "Archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "on_hold" | "onhold" => Some(Self::OnHold),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Input for creating a new, empty project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectInput {
    #[serde(alias = "project_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub compliance_frameworks: Vec<String>,
    #[serde(default)]
    pub jira_project_key: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Input for updating project metadata. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    #[serde(default, alias = "project_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub compliance_frameworks: Option<Vec<String>>,
    #[serde(default)]
    pub jira_project_key: Option<String>,
    #[serde(default)]
    pub coverage_summary: Option<String>,
}

impl UpdateProjectInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.compliance_frameworks.is_none()
            && self.jira_project_key.is_none()
            && self.coverage_summary.is_none()
    }
}

/// Filters for listing projects. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    /// Matches projects whose `compliance_frameworks` contain this value.
    #[serde(default)]
    pub compliance_framework: Option<String>,
    /// Case-insensitive substring over name and description.
    #[serde(default)]
    pub text_search: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ProjectFilter {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn matches(&self, project: &Project) -> bool {
        if let Some(status) = self.status {
            if project.status != status {
                return false;
            }
        }
        if let Some(framework) = &self.compliance_framework {
            if !project.compliance_frameworks.iter().any(|f| f == framework) {
                return false;
            }
        }
        if let Some(term) = &self.text_search {
            let term = term.to_lowercase();
            let in_name = project.project_name.to_lowercase().contains(&term);
            let in_description = project
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

/// A project without its tree, with per-level counts. Used for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub project_id: String,
    pub project_name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub compliance_frameworks: Vec<String>,
    pub jira_project_key: Option<String>,
    pub created_by: Option<String>,
    pub epic_count: usize,
    pub feature_count: usize,
    pub use_case_count: usize,
    pub test_case_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            project_id: project.project_id.clone(),
            project_name: project.project_name.clone(),
            description: project.description.clone(),
            status: project.status,
            compliance_frameworks: project.compliance_frameworks.clone(),
            jira_project_key: project.jira_project_key.clone(),
            created_by: project.created_by.clone(),
            epic_count: project.epics.len(),
            feature_count: project.feature_count(),
            use_case_count: project.use_case_count(),
            test_case_count: project.test_case_count(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Removes blanks and duplicates while keeping first-seen order.
pub(crate) fn dedup_frameworks(frameworks: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    frameworks
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty() && seen.insert(f.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, description: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            project_id: "PROJ_test".into(),
            project_name: name.into(),
            description: description.map(String::from),
            status: ProjectStatus::Active,
            compliance_frameworks: vec!["HIPAA".into()],
            jira_project_key: None,
            coverage_summary: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            epics: vec![],
            retired_ids: BTreeSet::new(),
        }
    }

    #[test]
    fn filter_matches_text_in_name_or_description() {
        let p = project("Patient Portal", Some("Handles EHR access"));
        let by_name = ProjectFilter {
            text_search: Some("portal".into()),
            ..Default::default()
        };
        let by_description = ProjectFilter {
            text_search: Some("ehr".into()),
            ..Default::default()
        };
        let miss = ProjectFilter {
            text_search: Some("billing".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn filter_checks_framework_membership() {
        let p = project("Portal", None);
        let hit = ProjectFilter {
            compliance_framework: Some("HIPAA".into()),
            ..Default::default()
        };
        let miss = ProjectFilter {
            compliance_framework: Some("GDPR".into()),
            ..Default::default()
        };
        assert!(hit.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn dedup_frameworks_keeps_first_occurrence() {
        let out = dedup_frameworks(vec![
            "HIPAA".into(),
            " GDPR ".into(),
            "HIPAA".into(),
            "".into(),
        ]);
        assert_eq!(out, vec!["HIPAA".to_string(), "GDPR".to_string()]);
    }

    #[test]
    fn retired_ids_are_omitted_when_empty() {
        let json = serde_json::to_value(project("P", None)).unwrap();
        assert!(json.get("retired_ids").is_none());
        assert_eq!(json["status"], "Active");
    }
}
