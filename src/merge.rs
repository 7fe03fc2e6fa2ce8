//! Merging agent-generated trees into a stored project.
//!
//! The payload is walked top-down. Each node is deserialised on its own, so a
//! malformed branch is reported and skipped without affecting its siblings.
//! A node whose ID already exists under the same parent has its generated
//! content replaced while review and Jira state stay as they are; a node
//! without an ID (or with an unused one) is appended as a new child.
//!
//! Accepted payload keys:
//!
//! - `epics`: nested epic trees
//! - `features` (each with `epic_id`), `use_cases` (each with `feature_id`),
//!   `test_cases` (each with `use_case_id`): partial subtrees attached to
//!   existing parents, processed in that order after `epics`
//! - `coverage_summary`: free text stored on the project

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{RepoError, RepoResult};
use crate::ids;
use crate::models::{
    Epic, EpicFields, Feature, FeatureFields, Level, MergeOutcome, MergeReport, TestCase,
    TestCaseFields, UpdateProjectInput, UseCase, UseCaseFields,
};
use crate::tree::ProjectTree;

const NODE_KEYS: [&str; 4] = ["epics", "features", "use_cases", "test_cases"];
const COVERAGE_KEY: &str = "coverage_summary";

/// Rejects payloads that cannot be merged at all.
pub fn check_payload(payload: &Value) -> RepoResult<()> {
    let obj = payload
        .as_object()
        .ok_or_else(|| RepoError::Validation("import payload must be a JSON object".into()))?;

    if !NODE_KEYS.iter().chain([&COVERAGE_KEY]).any(|k| obj.contains_key(*k)) {
        return Err(RepoError::Validation(format!(
            "import payload needs at least one of: {}, {COVERAGE_KEY}",
            NODE_KEYS.join(", ")
        )));
    }
    for key in NODE_KEYS {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(RepoError::Validation(format!("'{key}' must be an array")));
            }
        }
    }
    match obj.get(COVERAGE_KEY) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(RepoError::Validation(format!(
            "'{COVERAGE_KEY}' must be a string"
        ))),
    }
}

/// Merges `payload` into `tree` and reports what happened to every node.
///
/// The tree is only modified through its checked mutators, so it stays
/// consistent whatever the payload contains. Call [`check_payload`] first.
pub fn merge_into(tree: &mut ProjectTree, payload: &Value) -> MergeReport {
    let Some(obj) = payload.as_object() else {
        return MergeReport::default();
    };
    let mut merger = Merger {
        tree,
        report: MergeReport::default(),
        reserved: explicit_ids(obj),
    };

    if let Some(summary) = obj.get(COVERAGE_KEY).and_then(Value::as_str) {
        merger.set_coverage_summary(summary);
    }
    for epic in nodes(obj, "epics") {
        merger.merge_node(Level::Epic, None, epic);
    }
    for level in [Level::Feature, Level::UseCase, Level::TestCase] {
        for value in nodes(obj, level.collection_key()) {
            merger.merge_detached(level, value);
        }
    }

    merger.report
}

fn nodes<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Every ID the payload names for its own nodes. Minting passes over these,
/// so an ID assigned early in the walk never matches a node further on.
fn explicit_ids(obj: &Map<String, Value>) -> HashSet<String> {
    fn collect(level: Level, value: &Value, ids: &mut HashSet<String>) {
        let id = value.get(level.id_field()).and_then(Value::as_str);
        if let Some(id) = ids::normalize(id) {
            ids.insert(id.to_string());
        }
        let Some(child_level) = level.child() else {
            return;
        };
        let children = value.get(child_level.collection_key()).and_then(Value::as_array);
        for child in children.into_iter().flatten() {
            collect(child_level, child, ids);
        }
    }

    let mut ids = HashSet::new();
    for level in Level::ALL {
        for value in nodes(obj, level.collection_key()) {
            collect(level, value, &mut ids);
        }
    }
    ids
}

// ============================================================
// Typed import nodes
// ============================================================

#[derive(Deserialize)]
struct ImportEpic {
    #[serde(default)]
    epic_id: Option<String>,
    #[serde(flatten)]
    fields: EpicFields,
    #[serde(default, deserialize_with = "null_as_empty")]
    features: Vec<Value>,
}

#[derive(Deserialize)]
struct ImportFeature {
    #[serde(default)]
    feature_id: Option<String>,
    #[serde(flatten)]
    fields: FeatureFields,
    #[serde(default, deserialize_with = "null_as_empty")]
    use_cases: Vec<Value>,
}

#[derive(Deserialize)]
struct ImportUseCase {
    #[serde(default)]
    use_case_id: Option<String>,
    #[serde(flatten)]
    fields: UseCaseFields,
    #[serde(default, deserialize_with = "null_as_empty")]
    test_cases: Vec<Value>,
}

#[derive(Deserialize)]
struct ImportTestCase {
    #[serde(default)]
    test_case_id: Option<String>,
    #[serde(flatten)]
    fields: TestCaseFields,
}

/// A `null` child list counts as empty.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

enum Content {
    Epic(EpicFields),
    Feature(FeatureFields),
    UseCase(UseCaseFields),
    TestCase(TestCaseFields),
}

struct ParsedNode {
    id: Option<String>,
    content: Content,
    children: Vec<Value>,
}

fn parse(level: Level, value: &Value) -> Result<ParsedNode, String> {
    let invalid = |e: serde_json::Error| format!("invalid {level}: {e}");
    let parsed = match level {
        Level::Epic => {
            let node: ImportEpic = serde_json::from_value(value.clone()).map_err(invalid)?;
            node.fields.validate().map_err(reason)?;
            ParsedNode {
                id: node.epic_id,
                content: Content::Epic(node.fields),
                children: node.features,
            }
        }
        Level::Feature => {
            let node: ImportFeature = serde_json::from_value(value.clone()).map_err(invalid)?;
            node.fields.validate().map_err(reason)?;
            ParsedNode {
                id: node.feature_id,
                content: Content::Feature(node.fields),
                children: node.use_cases,
            }
        }
        Level::UseCase => {
            let node: ImportUseCase = serde_json::from_value(value.clone()).map_err(invalid)?;
            node.fields.validate().map_err(reason)?;
            ParsedNode {
                id: node.use_case_id,
                content: Content::UseCase(node.fields),
                children: node.test_cases,
            }
        }
        Level::TestCase => {
            let node: ImportTestCase = serde_json::from_value(value.clone()).map_err(invalid)?;
            node.fields.validate().map_err(reason)?;
            ParsedNode {
                id: node.test_case_id,
                content: Content::TestCase(node.fields),
                children: Vec::new(),
            }
        }
    };
    Ok(parsed)
}

fn reason(err: RepoError) -> String {
    match err {
        RepoError::Validation(msg) | RepoError::Conflict(msg) => msg,
        other => other.to_string(),
    }
}

/// Best-effort ID and label of a raw node, for reporting.
fn describe(level: Level, value: &Value) -> (Option<String>, Option<String>) {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let id = text(level.id_field());
    let label = ["epic_name", "feature_name", "title", "test_case_title", "name"]
        .into_iter()
        .find_map(text);
    (id, label)
}

// ============================================================
// Merge walk
// ============================================================

enum Resolution {
    Existing(String),
    New(String),
    Rejected(String),
}

struct Merger<'a> {
    tree: &'a mut ProjectTree,
    report: MergeReport,
    reserved: HashSet<String>,
}

impl Merger<'_> {
    fn set_coverage_summary(&mut self, summary: &str) {
        if self.tree.project().coverage_summary.as_deref() == Some(summary) {
            return;
        }
        let input = UpdateProjectInput {
            coverage_summary: Some(summary.to_string()),
            ..Default::default()
        };
        if let Ok(changed) = self.tree.patch_project(input) {
            self.report.coverage_summary_updated = changed;
        }
    }

    /// A node from one of the flat lists, attached by its parent's ID.
    fn merge_detached(&mut self, level: Level, value: &Value) {
        let Some(parent_level) = level.parent() else {
            return self.merge_node(level, None, value);
        };
        let parent_field = parent_level.id_field();
        let parent_id = value
            .get(parent_field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty());

        match parent_id {
            None => self.skip(level, value, format!("missing {parent_field}")),
            Some(parent) if self.tree.level_of(parent) == Some(parent_level) => {
                self.merge_node(level, Some(parent), value)
            }
            Some(parent) => self.skip(level, value, format!("parent {parent_level} {parent} not found")),
        }
    }

    fn merge_node(&mut self, level: Level, parent: Option<&str>, value: &Value) {
        let parsed = match parse(level, value) {
            Ok(parsed) => parsed,
            Err(reason) => return self.skip(level, value, reason),
        };
        let label = label_of(&parsed.content);

        let id = match self.resolve(level, parent, parsed.id.as_deref()) {
            Resolution::Rejected(reason) => return self.skip(level, value, reason),
            Resolution::Existing(id) => match self.overwrite(&id, parsed.content) {
                Ok(true) => {
                    self.report.record(level, Some(id.clone()), Some(label), MergeOutcome::Updated);
                    id
                }
                Ok(false) => {
                    self.report.record(level, Some(id.clone()), Some(label), MergeOutcome::Unchanged);
                    id
                }
                Err(err) => return self.skip(level, value, reason(err)),
            },
            Resolution::New(id) => match self.insert(parent, &id, parsed.content) {
                Ok(()) => {
                    self.report.record(level, Some(id.clone()), Some(label), MergeOutcome::Created);
                    id
                }
                Err(err) => return self.skip(level, value, reason(err)),
            },
        };

        if let Some(child_level) = level.child() {
            for child in &parsed.children {
                self.merge_node(child_level, Some(&id), child);
            }
        }
    }

    fn resolve(&self, level: Level, parent: Option<&str>, explicit: Option<&str>) -> Resolution {
        let Some(id) = ids::normalize(explicit) else {
            return Resolution::New(ids::next_id_excluding(&*self.tree, level, &self.reserved));
        };
        if self.tree.level_of(id) == Some(level) && self.tree.parent_of(id) == parent {
            return Resolution::Existing(id.to_string());
        }
        if let Some(found) = self.tree.level_of(id) {
            let owner = self
                .tree
                .parent_of(id)
                .map_or_else(|| "the project".to_string(), |p| p.to_string());
            return Resolution::Rejected(format!(
                "id collision: {id} is already used by a {found} under {owner}"
            ));
        }
        if self.tree.is_retired(id) {
            return Resolution::Rejected(format!("id collision: {id} belonged to a deleted node"));
        }
        match ids::validate(id) {
            Ok(()) => Resolution::New(id.to_string()),
            Err(err) => Resolution::Rejected(reason(err)),
        }
    }

    fn overwrite(&mut self, id: &str, content: Content) -> RepoResult<bool> {
        match content {
            Content::Epic(fields) => self.tree.overwrite_epic_content(id, fields),
            Content::Feature(fields) => self.tree.overwrite_feature_content(id, fields),
            Content::UseCase(fields) => self.tree.overwrite_use_case_content(id, fields),
            Content::TestCase(fields) => self.tree.overwrite_test_case_content(id, fields),
        }
    }

    fn insert(&mut self, parent: Option<&str>, id: &str, content: Content) -> RepoResult<()> {
        let id = id.to_string();
        let parent = || parent.ok_or_else(|| RepoError::Validation("missing parent".into()));
        match content {
            Content::Epic(fields) => self.tree.insert_epic(Epic::new(id, fields)),
            Content::Feature(fields) => self.tree.insert_feature(parent()?, Feature::new(id, fields)),
            Content::UseCase(fields) => {
                self.tree.insert_use_case(parent()?, UseCase::new(id, fields))
            }
            Content::TestCase(fields) => {
                self.tree.insert_test_case(parent()?, TestCase::new(id, fields))
            }
        }
    }

    /// Records `value` as skipped, along with everything nested under it.
    fn skip(&mut self, level: Level, value: &Value, reason: String) {
        let (id, label) = describe(level, value);
        warn!(level = %level, id = ?id, %reason, "Skipping import node");
        self.report.record(level, id.clone(), label, MergeOutcome::Skipped { reason });

        let ancestor = id.unwrap_or_else(|| level.as_str().to_string());
        self.skip_descendants(level, value, &ancestor);
    }

    fn skip_descendants(&mut self, level: Level, value: &Value, ancestor: &str) {
        let Some(child_level) = level.child() else {
            return;
        };
        let Some(children) = value.get(child_level.collection_key()).and_then(Value::as_array) else {
            return;
        };
        for child in children {
            let (id, label) = describe(child_level, child);
            self.report.record(
                child_level,
                id,
                label,
                MergeOutcome::Skipped {
                    reason: format!("ancestor {ancestor} was skipped"),
                },
            );
            self.skip_descendants(child_level, child, ancestor);
        }
    }
}

fn label_of(content: &Content) -> String {
    match content {
        Content::Epic(f) => f.name.clone(),
        Content::Feature(f) => f.name.clone(),
        Content::UseCase(f) => f.title.clone(),
        Content::TestCase(f) => f.title.clone(),
    }
}
