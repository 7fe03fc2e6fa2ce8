//! Case-insensitive substring search across every level of a project.

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};
use crate::models::{Level, Node, PathSegment, Project};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    /// The matching node without its children.
    pub node: Node,
    /// Names of the fields that contain the term.
    pub matched_fields: Vec<String>,
    /// Ancestors of the node, root first.
    pub path: Vec<PathSegment>,
}

/// Finds nodes whose id, name/title or description contain `term`
/// (and `expected_result`, for test cases). Results are in document order.
pub fn search(project: &Project, term: &str, level: Option<Level>) -> RepoResult<Vec<SearchMatch>> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Err(RepoError::Validation("search term must not be empty".into()));
    }

    let wants = |l: Level| level.map_or(true, |wanted| wanted == l);
    let mut matches = Vec::new();

    for epic in &project.epics {
        let epic_path: Vec<PathSegment> = Vec::new();
        if wants(Level::Epic) {
            let fields = matching(
                &needle,
                &[
                    ("epic_id", Some(&epic.epic_id)),
                    ("epic_name", Some(&epic.epic_name)),
                    ("description", epic.description.as_ref()),
                ],
            );
            push(&mut matches, Node::Epic(epic.shallow()), fields, &epic_path);
        }

        let mut feature_path = epic_path.clone();
        feature_path.push(segment(Level::Epic, &epic.epic_id, &epic.epic_name));
        for feature in &epic.features {
            if wants(Level::Feature) {
                let fields = matching(
                    &needle,
                    &[
                        ("feature_id", Some(&feature.feature_id)),
                        ("feature_name", Some(&feature.feature_name)),
                        ("description", feature.description.as_ref()),
                    ],
                );
                push(&mut matches, Node::Feature(feature.shallow()), fields, &feature_path);
            }

            let mut use_case_path = feature_path.clone();
            use_case_path.push(segment(Level::Feature, &feature.feature_id, &feature.feature_name));
            for use_case in &feature.use_cases {
                if wants(Level::UseCase) {
                    let fields = matching(
                        &needle,
                        &[
                            ("use_case_id", Some(&use_case.use_case_id)),
                            ("title", Some(&use_case.title)),
                            ("description", use_case.description.as_ref()),
                        ],
                    );
                    push(&mut matches, Node::UseCase(use_case.shallow()), fields, &use_case_path);
                }

                if !wants(Level::TestCase) {
                    continue;
                }
                let mut test_case_path = use_case_path.clone();
                test_case_path.push(segment(Level::UseCase, &use_case.use_case_id, &use_case.title));
                for test_case in &use_case.test_cases {
                    let fields = matching(
                        &needle,
                        &[
                            ("test_case_id", Some(&test_case.test_case_id)),
                            ("title", Some(&test_case.title)),
                            ("description", test_case.description.as_ref()),
                            ("expected_result", Some(&test_case.expected_result)),
                        ],
                    );
                    push(&mut matches, Node::TestCase(test_case.clone()), fields, &test_case_path);
                }
            }
        }
    }

    Ok(matches)
}

fn matching(needle: &str, fields: &[(&str, Option<&String>)]) -> Vec<String> {
    fields
        .iter()
        .filter(|(_, value)| value.is_some_and(|v| v.to_lowercase().contains(needle)))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn push(matches: &mut Vec<SearchMatch>, node: Node, fields: Vec<String>, path: &[PathSegment]) {
    if fields.is_empty() {
        return;
    }
    matches.push(SearchMatch {
        node,
        matched_fields: fields,
        path: path.to_vec(),
    });
}

fn segment(level: Level, id: &str, label: &str) -> PathSegment {
    PathSegment {
        level,
        id: id.to_string(),
        label: label.to_string(),
    }
}
