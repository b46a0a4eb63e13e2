use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;

use crate::metrics::track_cache_operation;
use crate::models::session::Session;

/// Keeps in-progress sessions between requests.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Session>>;

    /// Inserts or overwrites. Sessions are never deleted explicitly; the
    /// Redis TTL expires idle ones.
    async fn save(&self, session: &Session) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Redis-backed registry: one JSON value per session with a TTL.
pub struct RedisSessionRegistry {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisSessionRegistry {
    pub async fn connect(redis_uri: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(redis_uri).context("Failed to create Redis client")?;

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let registry = Self { redis, ttl_secs };
        registry.ping().await?;

        tracing::info!("Redis connection established successfully");
        Ok(registry)
    }
}

#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let mut conn = self.redis.clone();
        let key = session_key(session_id);

        let raw: Option<String> = track_cache_operation("get", async {
            redis::cmd("GET")
                .arg(&key)
                .query_async::<Option<String>>(&mut conn)
                .await
                .context("Failed to read session from Redis")
        })
        .await?;

        raw.map(|json| serde_json::from_str::<Session>(&json).context("Corrupt session payload"))
            .transpose()
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut conn = self.redis.clone();
        let key = session_key(&session.id);
        let json = serde_json::to_string(session)?;

        track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(&key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut conn)
                .await
                .context("Failed to save session to Redis")
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Process-local registry used when no Redis is configured.
#[derive(Default)]
pub struct InMemorySessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
