use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_COLUMNS: [&str; 2] = ["question_id", "id"];
const TEXT_COLUMNS: [&str; 3] = ["question_text", "text", "question"];

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV must have a column named question_text (or text/question); row {row} has none")]
    MissingText { row: usize },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("not enough questions to form one batch ({available} < {batch_size})")]
    TooFewQuestions { available: usize, batch_size: usize },
}

/// One row of the input sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchQuestion {
    pub question_id: Option<String>,
    pub question_text: String,
}

/// Task object in the labeling tool's import format.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelingTask {
    pub data: TaskData,
    pub meta: TaskMeta,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskData {
    pub question_text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskMeta {
    pub question_id: Option<String>,
}

impl From<BatchQuestion> for LabelingTask {
    fn from(question: BatchQuestion) -> Self {
        Self {
            data: TaskData {
                question_text: question.question_text,
            },
            meta: TaskMeta {
                question_id: question.question_id,
            },
        }
    }
}

/// Reads questions from a CSV with a header row.
///
/// Column aliases are tried in order and an empty cell counts as absent, so a
/// row whose text cells are all blank is rejected.
pub fn read_questions(path: &Path) -> Result<Vec<BatchQuestion>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let position = |names: &[&str]| -> Vec<usize> {
        names
            .iter()
            .filter_map(|name| headers.iter().position(|h| h.trim() == *name))
            .collect()
    };
    let id_columns = position(&ID_COLUMNS);
    let text_columns = position(&TEXT_COLUMNS);

    let mut questions = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let first_filled = |columns: &[usize]| {
            columns
                .iter()
                .filter_map(|&col| record.get(col))
                .find(|value| !value.is_empty())
                .map(str::to_string)
        };

        let question_text = first_filled(&text_columns).ok_or(BatchError::MissingText {
            row: idx + 2,
        })?;
        questions.push(BatchQuestion {
            question_id: first_filled(&id_columns),
            question_text,
        });
    }

    Ok(questions)
}

/// Shuffles and splits into groups of `batch_size`; the last group may be smaller.
pub fn partition<R: Rng + ?Sized>(
    mut questions: Vec<BatchQuestion>,
    batch_size: usize,
    rng: &mut R,
) -> Result<Vec<Vec<BatchQuestion>>, BatchError> {
    if batch_size == 0 {
        return Err(BatchError::InvalidBatchSize);
    }
    if questions.len() < batch_size {
        return Err(BatchError::TooFewQuestions {
            available: questions.len(),
            batch_size,
        });
    }

    questions.shuffle(rng);

    let mut batches = Vec::with_capacity(questions.len().div_ceil(batch_size));
    let mut rest = questions.into_iter().peekable();
    while rest.peek().is_some() {
        batches.push(rest.by_ref().take(batch_size).collect());
    }
    Ok(batches)
}

/// Writes `batch_1.json`, `batch_2.json`, ... into `out_dir`, creating it if needed.
pub fn write_batches(
    out_dir: &Path,
    batches: Vec<Vec<BatchQuestion>>,
) -> Result<Vec<PathBuf>, BatchError> {
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(batches.len());
    for (i, batch) in batches.into_iter().enumerate() {
        let tasks: Vec<LabelingTask> = batch.into_iter().map(LabelingTask::from).collect();
        let out_file = out_dir.join(format!("batch_{}.json", i + 1));
        fs::write(&out_file, serde_json::to_string_pretty(&tasks)?)?;
        tracing::info!("Wrote {} ({} tasks)", out_file.display(), tasks.len());
        written.push(out_file);
    }

    Ok(written)
}
