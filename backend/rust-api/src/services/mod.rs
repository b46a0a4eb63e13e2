use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use mongo_store::MongoQuestionStore;
use question_seed::load_seed_questions;
use question_store::{MemoryQuestionStore, QuestionStore};
use session_lock::SessionLocks;
use session_registry::{InMemorySessionRegistry, RedisSessionRegistry, SessionRegistry};
use session_service::{SessionService, SessionSettings};
use sqlite_store::SqliteQuestionStore;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn QuestionStore>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub session_locks: SessionLocks,
}

impl AppState {
    /// Connects the configured question store and session registry.
    ///
    /// An unreachable store is fatal here: the caller gets the error and the
    /// service does not start.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn QuestionStore> = match config.store_backend {
            StoreBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
                let db = client.database(&config.mongo_database);
                Arc::new(MongoQuestionStore::new(
                    db,
                    &config.questions_collection,
                    &config.responses_collection,
                ))
            }
            StoreBackend::Sqlite => {
                let store = SqliteQuestionStore::connect(&config.sqlite_url).await?;
                if let Some(path) = config.seed_questions_path.as_deref() {
                    let seeds = load_seed_questions(Path::new(path))?;
                    for question in &seeds {
                        store.upsert_question(question).await?;
                    }
                    tracing::info!("Seeded {} questions from {}", seeds.len(), path);
                }
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory question store; responses are not persisted");
                let seeds = match config.seed_questions_path.as_deref() {
                    Some(path) => {
                        let seeds = load_seed_questions(Path::new(path))?;
                        tracing::info!("Seeded {} questions from {}", seeds.len(), path);
                        seeds
                    }
                    None => {
                        tracing::warn!(
                            "No seed file configured (SEED_QUESTIONS_FILE); sessions will have no questions"
                        );
                        Vec::new()
                    }
                };
                Arc::new(MemoryQuestionStore::new(seeds))
            }
        };

        tokio::time::timeout(std::time::Duration::from_secs(10), store.ping())
            .await
            .map_err(|_| anyhow::anyhow!("{} ping timeout after 10s", store.backend_name()))??;
        tracing::info!("Question store connected ({})", store.backend_name());

        let sessions: Arc<dyn SessionRegistry> = match config.redis_uri.as_deref() {
            Some(uri) => Arc::new(RedisSessionRegistry::connect(uri, config.session_ttl_secs).await?),
            None => {
                tracing::info!("No Redis configured, keeping sessions in process");
                Arc::new(InMemorySessionRegistry::new())
            }
        };

        Ok(Self::from_parts(config, store, sessions))
    }

    pub fn from_parts(
        config: Config,
        store: Arc<dyn QuestionStore>,
        sessions: Arc<dyn SessionRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            sessions,
            session_locks: SessionLocks::new(),
        }
    }

    pub fn session_service(&self) -> SessionService {
        SessionService::new(self.store.clone(), SessionSettings::from(&self.config))
    }
}

pub mod batch_partition;
pub mod mongo_store;
pub mod options;
pub mod question_seed;
pub mod question_store;
pub mod session_lock;
pub mod session_registry;
pub mod session_service;
pub mod spreadsheet_export;
pub mod sqlite_store;
