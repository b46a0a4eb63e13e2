use std::time::Duration;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::metrics::track_db_operation;
use crate::models::{
    question::{Question, RawAlternatives},
    response::ResponseRecord,
};
use crate::services::question_store::{dedup_by_id, QuestionStore, StoreError};
use crate::utils::labels::{normalize_alternatives, parse_alternatives};

/// Relational backend. Alternatives are stored as a JSON array of labels.
#[derive(Clone)]
pub struct SqliteQuestionStore {
    pool: SqlitePool,
}

impl SqliteQuestionStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        // In-memory databases live per connection, so keep a single one
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id TEXT PRIMARY KEY,
                    statement TEXT NOT NULL,
                    true_label TEXT NOT NULL,
                    alternatives TEXT NOT NULL DEFAULT ''
                );
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS responses (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    participant_id TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    chosen_label TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    /// Insert or replace a question; used by seeding and tests.
    ///
    /// Alternatives are written as a JSON array so labels may contain commas.
    pub async fn upsert_question(&self, question: &Question) -> Result<(), StoreError> {
        let alternatives = serde_json::to_string(&question.alternatives)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query(
            r"
                INSERT INTO questions (id, statement, true_label, alternatives)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    statement = excluded.statement,
                    true_label = excluded.true_label,
                    alternatives = excluded.alternatives
            ",
        )
        .bind(&question.id)
        .bind(&question.statement)
        .bind(&question.true_label)
        .bind(alternatives)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn response_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM responses")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        row.try_get::<i64, _>("total")
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl QuestionStore for SqliteQuestionStore {
    async fn sample_questions(&self, n: usize) -> Result<Vec<Question>, StoreError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);

        let rows = track_db_operation("sample", "questions", async {
            let rows = sqlx::query(
                r"
                    SELECT id, statement, true_label, alternatives
                    FROM questions
                    ORDER BY RANDOM()
                    LIMIT ?1
                ",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok::<_, anyhow::Error>(rows)
        })
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let alternatives: Option<String> = row
                .try_get("alternatives")
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            questions.push(Question {
                id: row
                    .try_get("id")
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
                statement: row
                    .try_get("statement")
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
                true_label: row
                    .try_get("true_label")
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
                alternatives: alternatives
                    .as_deref()
                    .map(decode_alternatives)
                    .unwrap_or_default(),
            });
        }

        Ok(dedup_by_id(questions))
    }

    async fn append_response(&self, response: &ResponseRecord) -> Result<(), StoreError> {
        track_db_operation("insert", "responses", async {
            sqlx::query(
                r"
                    INSERT INTO responses (participant_id, question_id, chosen_label, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(&response.participant_id)
            .bind(&response.question_id)
            .bind(&response.chosen_label)
            .bind(response.timestamp)
            .execute(&self.pool)
            .await?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

/// JSON arrays written by `upsert_question`, or legacy delimited text such as
/// `{Female, LGBTQ}` imported from elsewhere.
fn decode_alternatives(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(labels) => normalize_alternatives(&RawAlternatives::List(labels)),
        Err(_) => parse_alternatives(raw),
    }
}
