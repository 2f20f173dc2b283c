//! User intent for a single turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user wants from this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Record something.
    Log,
    /// Ask about previously logged data.
    Query,
    /// Anything else.
    Other,
}

impl Intent {
    /// Maps a classifier label to an intent; anything unrecognized is `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "log" => Intent::Log,
            "query" => Intent::Query,
            _ => Intent::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Log => "log",
            Intent::Query => "query",
            Intent::Other => "other",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_map_case_insensitively() {
        assert_eq!(Intent::from_label("LOG"), Intent::Log);
        assert_eq!(Intent::from_label(" query "), Intent::Query);
        assert_eq!(Intent::from_label("other"), Intent::Other);
    }

    #[test]
    fn unknown_label_is_other() {
        assert_eq!(Intent::from_label("maybe_log"), Intent::Other);
        assert_eq!(Intent::from_label(""), Intent::Other);
    }

    #[test]
    fn serializes_to_snake_case() {
        assert_eq!(serde_json::to_string(&Intent::Query).unwrap(), "\"query\"");
    }
}
