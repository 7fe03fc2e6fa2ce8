use serde::{Deserialize, Serialize};

/// Push state of an epic in the external tracker.
///
/// A push attempt always ends in `Pushed` or `Failed`; `NotPushed` is the
/// state of an epic the tracker has never seen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum JiraStatus {
    #[default]
    #[serde(rename = "Not Pushed", alias = "not_pushed", alias = "NotPushed")]
    NotPushed,
    #[serde(alias = "pushed")]
    Pushed,
    #[serde(alias = "failed")]
    Failed,
}

impl JiraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotPushed => "Not Pushed",
            Self::Pushed => "Pushed",
            Self::Failed => "Failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "not_pushed" | "notpushed" => Some(Self::NotPushed),
            "pushed" => Some(Self::Pushed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Human review verdict on a generated use case or test case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ReviewStatus {
    #[default]
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved")]
    Approved,
    #[serde(
        rename = "Needs Clarification",
        alias = "needs_clarification",
        alias = "NeedsClarification"
    )]
    NeedsClarification,
    #[serde(alias = "rejected")]
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::NeedsClarification => "Needs Clarification",
            Self::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "needs_clarification" | "needsclarification" => Some(Self::NeedsClarification),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    #[serde(alias = "high")]
    High,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "low")]
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_round_trip_through_serde() {
        let json = serde_json::to_string(&JiraStatus::NotPushed).unwrap();
        assert_eq!(json, "\"Not Pushed\"");
        let back: JiraStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JiraStatus::NotPushed);

        let review: ReviewStatus = serde_json::from_str("\"needs_clarification\"").unwrap();
        assert_eq!(review, ReviewStatus::NeedsClarification);
        assert_eq!(
            serde_json::to_string(&review).unwrap(),
            "\"Needs Clarification\""
        );
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!(JiraStatus::from_str("NOT PUSHED"), Some(JiraStatus::NotPushed));
        assert_eq!(ReviewStatus::from_str("Approved"), Some(ReviewStatus::Approved));
        assert_eq!(RiskLevel::from_str("medium"), Some(RiskLevel::Medium));
        assert_eq!(RiskLevel::from_str("critical"), None);
    }
}
