use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Collection, Database};

use crate::metrics::track_db_operation;
use crate::models::{
    question::{Question, RawAlternatives},
    response::ResponseRecord,
};
use crate::services::question_store::{dedup_by_id, QuestionStore, StoreError};
use crate::utils::{labels::normalize_alternatives, time::chrono_to_bson};

const MISSING_FIELD: &str = "N/A";

pub struct MongoQuestionStore {
    db: Database,
    questions_collection: String,
    responses_collection: String,
}

impl MongoQuestionStore {
    pub fn new(db: Database, questions_collection: &str, responses_collection: &str) -> Self {
        Self {
            db,
            questions_collection: questions_collection.to_string(),
            responses_collection: responses_collection.to_string(),
        }
    }

    fn questions(&self) -> Collection<Document> {
        self.db.collection::<Document>(&self.questions_collection)
    }

    fn responses(&self) -> Collection<Document> {
        self.db.collection::<Document>(&self.responses_collection)
    }
}

#[async_trait]
impl QuestionStore for MongoQuestionStore {
    async fn sample_questions(&self, n: usize) -> Result<Vec<Question>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let size = i64::try_from(n).unwrap_or(i64::MAX);
        let pipeline = vec![doc! { "$sample": { "size": size } }];

        let documents = track_db_operation("sample", &self.questions_collection, async {
            let cursor = self.questions().aggregate(pipeline).await?;
            let documents: Vec<Document> = cursor.try_collect().await?;
            Ok::<_, anyhow::Error>(documents)
        })
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let questions = documents.iter().filter_map(question_from_document).collect();

        // $sample may hand back the same document twice on large collections
        Ok(dedup_by_id(questions))
    }

    async fn append_response(&self, response: &ResponseRecord) -> Result<(), StoreError> {
        let document = doc! {
            "participant_id": &response.participant_id,
            "question_id": &response.question_id,
            "chosen_label": &response.chosen_label,
            "timestamp": chrono_to_bson(response.timestamp),
        };

        track_db_operation("insert", &self.responses_collection, async {
            self.responses().insert_one(document).await?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

/// Maps a stored question document onto a `Question`.
///
/// Both historical document shapes are accepted: `id`/`sentence` and
/// `question_id`/`question_text`, falling back to `_id`. Documents without any
/// usable identifier are skipped.
pub fn question_from_document(document: &Document) -> Option<Question> {
    let id = ["id", "question_id", "_id"]
        .iter()
        .find_map(|key| document.get(*key).and_then(bson_to_id));

    let Some(id) = id else {
        tracing::warn!("Skipping question document without identifier");
        return None;
    };

    let statement = ["sentence", "question_text", "text"]
        .iter()
        .find_map(|key| document.get_str(*key).ok())
        .unwrap_or(MISSING_FIELD)
        .to_string();

    let true_label = document
        .get_str("true_label")
        .unwrap_or(MISSING_FIELD)
        .to_string();

    let alternatives = match document.get("others_options") {
        Some(Bson::String(text)) => normalize_alternatives(&RawAlternatives::Text(text.clone())),
        Some(Bson::Array(items)) => {
            let labels = items
                .iter()
                .filter_map(|item| match item {
                    Bson::String(value) => Some(value.clone()),
                    _ => None,
                })
                .collect();
            normalize_alternatives(&RawAlternatives::List(labels))
        }
        Some(other) => {
            tracing::debug!(
                "Unsupported others_options encoding for question {}: {:?}",
                id,
                other.element_type()
            );
            Vec::new()
        }
        None => Vec::new(),
    };

    Some(Question {
        id,
        statement,
        true_label,
        alternatives,
    })
}

fn bson_to_id(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(value) if !value.trim().is_empty() => Some(value.to_string()),
        Bson::Int32(value) => Some(value.to_string()),
        Bson::Int64(value) => Some(value.to_string()),
        _ => None,
    }
}
