use serde::{Deserialize, Serialize};

use super::{Epic, Feature, Level, TestCase, UseCase};

/// A single artifact of any level, without its children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Node {
    Epic(Epic),
    Feature(Feature),
    UseCase(UseCase),
    TestCase(TestCase),
}

impl Node {
    pub fn level(&self) -> Level {
        match self {
            Self::Epic(_) => Level::Epic,
            Self::Feature(_) => Level::Feature,
            Self::UseCase(_) => Level::UseCase,
            Self::TestCase(_) => Level::TestCase,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Epic(e) => &e.epic_id,
            Self::Feature(f) => &f.feature_id,
            Self::UseCase(uc) => &uc.use_case_id,
            Self::TestCase(tc) => &tc.test_case_id,
        }
    }

    /// Name or title, whichever the level carries.
    pub fn label(&self) -> &str {
        match self {
            Self::Epic(e) => &e.epic_name,
            Self::Feature(f) => &f.feature_name,
            Self::UseCase(uc) => &uc.title,
            Self::TestCase(tc) => &tc.title,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Epic(e) => e.description.as_deref(),
            Self::Feature(f) => f.description.as_deref(),
            Self::UseCase(uc) => uc.description.as_deref(),
            Self::TestCase(tc) => tc.description.as_deref(),
        }
    }
}

/// One ancestor on the path from the project root to a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathSegment {
    pub level: Level,
    pub id: String,
    pub label: String,
}

/// A node together with its root-first ancestor path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocatedNode {
    pub node: Node,
    pub path: Vec<PathSegment>,
}
