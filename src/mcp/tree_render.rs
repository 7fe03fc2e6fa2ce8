//! ASCII tree rendering for project hierarchies.

use crate::models::{Epic, Feature, JiraStatus, Project, ReviewStatus, TestCase, UseCase};

const NOT_PUSHED: char = '○';
const PUSHED: char = '●';
const PUSH_FAILED: char = '✗';
const FEATURE: char = '•';

const PENDING: char = '◇';
const APPROVED: char = '✓';
const NEEDS_CLARIFICATION: char = '?';
const REJECTED: char = '✗';

fn jira_symbol(status: JiraStatus) -> char {
    match status {
        JiraStatus::NotPushed => NOT_PUSHED,
        JiraStatus::Pushed => PUSHED,
        JiraStatus::Failed => PUSH_FAILED,
    }
}

fn review_symbol(status: ReviewStatus) -> char {
    match status {
        ReviewStatus::Pending => PENDING,
        ReviewStatus::Approved => APPROVED,
        ReviewStatus::NeedsClarification => NEEDS_CLARIFICATION,
        ReviewStatus::Rejected => REJECTED,
    }
}

struct Row {
    symbol: char,
    label: String,
    children: Vec<Row>,
}

impl Row {
    fn epic(epic: &Epic) -> Self {
        Self {
            symbol: jira_symbol(epic.jira_status),
            label: format!("{} {}", epic.epic_id, epic.epic_name),
            children: epic.features.iter().map(Row::feature).collect(),
        }
    }

    fn feature(feature: &Feature) -> Self {
        Self {
            symbol: FEATURE,
            label: format!("{} {}", feature.feature_id, feature.feature_name),
            children: feature.use_cases.iter().map(Row::use_case).collect(),
        }
    }

    fn use_case(use_case: &UseCase) -> Self {
        Self {
            symbol: review_symbol(use_case.review_status),
            label: format!("{} {}", use_case.use_case_id, use_case.title),
            children: use_case.test_cases.iter().map(Row::test_case).collect(),
        }
    }

    fn test_case(test_case: &TestCase) -> Self {
        Self {
            symbol: review_symbol(test_case.review_status),
            label: format!(
                "{} {} [{}]",
                test_case.test_case_id, test_case.title, test_case.test_type
            ),
            children: Vec::new(),
        }
    }
}

/// Render a project as ASCII art with status symbols.
///
/// Epics show their Jira state (● pushed, ○ not pushed, ✗ failed); use cases
/// and test cases show their review state (◇ pending, ✓ approved,
/// ? needs clarification, ✗ rejected).
///
/// Example output:
/// ```text
/// Patient Portal
/// ├── ● E001 Authentication
/// │   └── • F001 Login
/// │       ├── ✓ UC001 Valid login
/// │       │   └── ◇ TC001 Verify login [Functional]
/// │       └── ◇ UC002 Locked account
/// └── ○ E002 Billing
/// ```
pub fn render_project(project: &Project) -> String {
    let mut output = String::new();
    output.push_str(&project.project_name);
    output.push('\n');

    let rows: Vec<Row> = project.epics.iter().map(Row::epic).collect();
    render_rows(&mut output, &rows, "");
    output
}

fn render_rows(output: &mut String, rows: &[Row], prefix: &str) {
    for (i, row) in rows.iter().enumerate() {
        let is_last = i == rows.len() - 1;
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(row.symbol);
        output.push(' ');
        output.push_str(&row.label);
        output.push('\n');

        let continuation = if is_last { "    " } else { "│   " };
        render_rows(output, &row.children, &format!("{prefix}{continuation}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::Utc;

    fn project(epics: Vec<Epic>) -> Project {
        let now = Utc::now();
        Project {
            project_id: "PROJ_render".into(),
            project_name: "Patient Portal".into(),
            description: None,
            status: ProjectStatus::Active,
            compliance_frameworks: vec![],
            jira_project_key: None,
            coverage_summary: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            epics,
            retired_ids: Default::default(),
        }
    }

    fn epic(id: &str, name: &str, status: JiraStatus, features: Vec<Feature>) -> Epic {
        let mut epic = Epic::new(
            id.into(),
            EpicFields {
                name: name.into(),
                description: None,
            },
        );
        epic.jira_status = status;
        epic.features = features;
        epic
    }

    #[test]
    fn test_empty_project() {
        assert_eq!(render_project(&project(vec![])), "Patient Portal\n");
    }

    #[test]
    fn test_epics_show_jira_state() {
        let output = render_project(&project(vec![
            epic("E001", "Authentication", JiraStatus::Pushed, vec![]),
            epic("E002", "Billing", JiraStatus::Failed, vec![]),
        ]));
        assert_eq!(
            output,
            "Patient Portal\n├── ● E001 Authentication\n└── ✗ E002 Billing\n"
        );
    }

    #[test]
    fn test_nested_levels() {
        let mut use_case = UseCase::new(
            "UC001".into(),
            UseCaseFields {
                title: "Valid login".into(),
                review_status: Some(ReviewStatus::Approved),
                ..Default::default()
            },
        );
        use_case.test_cases.push(TestCase::new(
            "TC001".into(),
            TestCaseFields {
                title: "Verify login".into(),
                test_steps: vec!["submit".into()],
                expected_result: "dashboard".into(),
                ..Default::default()
            },
        ));
        let locked = UseCase::new(
            "UC002".into(),
            UseCaseFields {
                title: "Locked account".into(),
                ..Default::default()
            },
        );
        let mut feature = Feature::new(
            "F001".into(),
            FeatureFields {
                name: "Login".into(),
                description: None,
            },
        );
        feature.use_cases = vec![use_case, locked];

        let output = render_project(&project(vec![
            epic("E001", "Authentication", JiraStatus::Pushed, vec![feature]),
            epic("E002", "Billing", JiraStatus::NotPushed, vec![]),
        ]));
        let expected = "Patient Portal\n├── ● E001 Authentication\n│   └── • F001 Login\n│       ├── ✓ UC001 Valid login\n│       │   └── ◇ TC001 Verify login [Functional]\n│       └── ◇ UC002 Locked account\n└── ○ E002 Billing\n";
        assert_eq!(output, expected);
    }
}
