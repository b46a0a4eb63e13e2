use std::path::Path;

use serde::Deserialize;

use crate::models::question::{Question, RawAlternatives};
use crate::services::question_store::{dedup_by_id, StoreError};
use crate::utils::labels::normalize_alternatives;

/// One entry of a seed file. Field names follow the stored document shapes.
#[derive(Debug, Deserialize)]
struct SeedQuestion {
    #[serde(alias = "question_id")]
    id: String,
    #[serde(alias = "sentence", alias = "question_text")]
    statement: String,
    true_label: String,
    #[serde(default, alias = "others_options")]
    alternatives: Option<RawAlternatives>,
}

impl From<SeedQuestion> for Question {
    fn from(seed: SeedQuestion) -> Self {
        let alternatives = seed
            .alternatives
            .as_ref()
            .map(normalize_alternatives)
            .unwrap_or_default();
        Question::new(seed.id, seed.statement, seed.true_label, alternatives)
    }
}

/// Reads a JSON array of questions, e.g.
/// `[{"id": "q1", "sentence": "...", "true_label": "Male", "others_options": "{Female}"}]`.
pub fn load_seed_questions(path: &Path) -> Result<Vec<Question>, StoreError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Connection(format!("{}: {}", path.display(), e)))?;
    let seeds: Vec<SeedQuestion> = serde_json::from_str(&raw)
        .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e)))?;

    Ok(dedup_by_id(seeds.into_iter().map(Question::from).collect()))
}
