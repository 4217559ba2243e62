use serde::{Deserialize, Serialize};
use crate::models::domain::Meet;

/// What a user is currently doing, as seen by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "meet", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrentMeet {
    None,
    #[serde(rename = "SEARCH")]
    Searching,
    Active(Meet),
}

impl CurrentMeet {
    pub fn meet(&self) -> Option<&Meet> {
        match self {
            CurrentMeet::Active(meet) => Some(meet),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CurrentMeet::None)
    }
}

/// Result of a search-for-meet request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchOutcome {
    Error,
    Active,
    Search,
}

/// Result of a cancel-search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelStatus {
    Success,
    Fail,
    NotAllowed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_meet_wire_format() {
        let json = serde_json::to_value(CurrentMeet::Searching).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "SEARCH" }));

        let json = serde_json::to_value(CurrentMeet::None).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "NONE" }));
    }

    #[test]
    fn test_outcome_wire_format() {
        assert_eq!(serde_json::to_string(&SearchOutcome::Search).unwrap(), "\"SEARCH\"");
        assert_eq!(serde_json::to_string(&CancelStatus::NotAllowed).unwrap(), "\"NOT_ALLOWED\"");
    }
}
