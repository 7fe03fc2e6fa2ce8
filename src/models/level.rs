use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four artifact levels below a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Epic,
    Feature,
    UseCase,
    TestCase,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Epic, Level::Feature, Level::UseCase, Level::TestCase];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::UseCase => "use_case",
            Self::TestCase => "test_case",
        }
    }

    /// Accepts the snake_case name plus a few spellings agents tend to use.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "epic" | "epics" => Some(Self::Epic),
            "feature" | "features" => Some(Self::Feature),
            "use_case" | "use_cases" | "usecase" => Some(Self::UseCase),
            "test_case" | "test_cases" | "testcase" => Some(Self::TestCase),
            _ => None,
        }
    }

    /// Prefix of minted identifiers (`E001`, `F001`, `UC001`, `TC001`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Epic => "E",
            Self::Feature => "F",
            Self::UseCase => "UC",
            Self::TestCase => "TC",
        }
    }

    /// Name of the identifier field in the JSON document.
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Epic => "epic_id",
            Self::Feature => "feature_id",
            Self::UseCase => "use_case_id",
            Self::TestCase => "test_case_id",
        }
    }

    /// Name of the array holding nodes of this level inside their parent.
    pub fn collection_key(&self) -> &'static str {
        match self {
            Self::Epic => "epics",
            Self::Feature => "features",
            Self::UseCase => "use_cases",
            Self::TestCase => "test_cases",
        }
    }

    pub fn parent(&self) -> Option<Level> {
        match self {
            Self::Epic => None,
            Self::Feature => Some(Self::Epic),
            Self::UseCase => Some(Self::Feature),
            Self::TestCase => Some(Self::UseCase),
        }
    }

    pub fn child(&self) -> Option<Level> {
        match self {
            Self::Epic => Some(Self::Feature),
            Self::Feature => Some(Self::UseCase),
            Self::UseCase => Some(Self::TestCase),
            Self::TestCase => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
