use serde::{Deserialize, Serialize};

/// One annotatable statement about "Person A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub statement: String,
    pub true_label: String,
    /// Distractor candidates, already normalized (no delimiters, no duplicates).
    pub alternatives: Vec<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        statement: impl Into<String>,
        true_label: impl Into<String>,
        alternatives: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            true_label: true_label.into(),
            alternatives,
        }
    }
}

/// Alternative labels as they arrive from storage, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAlternatives {
    List(Vec<String>),
    Text(String),
}
