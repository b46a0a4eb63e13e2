use serde::Deserialize;
use std::env;

pub const DEFAULT_PARTICIPANT: &str = "Annotator_Guest";
pub const DEFAULT_SAMPLE_SIZE: usize = 20;
pub const DEFAULT_GATE_DURATION_SECS: u64 = 20;
/// Longest instructions countdown accepted from configuration (one day).
pub const MAX_GATE_DURATION_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Mongo,
    Sqlite,
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Some(Self::Mongo),
            "sqlite" => Some(Self::Sqlite),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub questions_collection: String,
    pub responses_collection: String,
    pub sqlite_url: String,
    pub redis_uri: Option<String>,
    /// JSON file of questions loaded into the memory/sqlite store at startup
    pub seed_questions_path: Option<String>,
    pub default_participant: String,
    pub sample_size: usize,
    pub gate_duration_secs: u64,
    pub session_ttl_secs: u64,
    pub bind_addr: String,
    pub gate_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Mongo,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "responses".to_string(),
            questions_collection: "questions_collection".to_string(),
            responses_collection: "responses_collection".to_string(),
            sqlite_url: "sqlite://responses.db?mode=rwc".to_string(),
            redis_uri: None,
            seed_questions_path: None,
            default_participant: DEFAULT_PARTICIPANT.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            gate_duration_secs: DEFAULT_GATE_DURATION_SECS,
            session_ttl_secs: 3600,
            bind_addr: "0.0.0.0:8081".to_string(),
            gate_tick_ms: 1000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the working directory
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml, overridden by APP__SECTION__KEY variables
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let backend_raw = string_setting(&settings, "store.backend", "STORE_BACKEND")
            .unwrap_or_else(|| "mongo".to_string());
        let store_backend = StoreBackend::parse(&backend_raw).ok_or_else(|| {
            config::ConfigError::Message(format!("unknown store backend: {}", backend_raw))
        })?;

        let redis_uri = string_setting(&settings, "redis.uri", "REDIS_URI")
            .filter(|value| !value.trim().is_empty());

        Ok(Config {
            store_backend,
            mongo_uri: string_setting(&settings, "database.mongo_uri", "MONGO_URI")
                .unwrap_or(defaults.mongo_uri),
            mongo_database: string_setting(&settings, "database.mongo_database", "MONGO_DATABASE")
                .unwrap_or(defaults.mongo_database),
            questions_collection: string_setting(
                &settings,
                "database.questions_collection",
                "QUESTIONS_COLLECTION",
            )
            .unwrap_or(defaults.questions_collection),
            responses_collection: string_setting(
                &settings,
                "database.responses_collection",
                "RESPONSES_COLLECTION",
            )
            .unwrap_or(defaults.responses_collection),
            sqlite_url: string_setting(&settings, "database.sqlite_url", "SQLITE_URL")
                .unwrap_or(defaults.sqlite_url),
            redis_uri,
            seed_questions_path: string_setting(&settings, "store.seed_file", "SEED_QUESTIONS_FILE")
                .filter(|value| !value.trim().is_empty()),
            default_participant: string_setting(
                &settings,
                "survey.default_participant",
                "DEFAULT_PARTICIPANT",
            )
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.default_participant),
            sample_size: number_setting(&settings, "survey.sample_size", "SAMPLE_SIZE")
                .map(|value| value as usize)
                .filter(|value| *value > 0)
                .unwrap_or(defaults.sample_size),
            gate_duration_secs: number_setting(
                &settings,
                "survey.gate_duration_secs",
                "GATE_DURATION_SECONDS",
            )
            .map(clamp_gate_duration)
            .unwrap_or(defaults.gate_duration_secs),
            session_ttl_secs: number_setting(
                &settings,
                "survey.session_ttl_secs",
                "SESSION_TTL_SECONDS",
            )
            .filter(|value| *value > 0)
            .unwrap_or(defaults.session_ttl_secs),
            bind_addr: string_setting(&settings, "server.bind_addr", "BIND_ADDR")
                .unwrap_or(defaults.bind_addr),
            gate_tick_ms: number_setting(&settings, "server.gate_tick_ms", "GATE_TICK_MS")
                .filter(|value| *value > 0)
                .unwrap_or(defaults.gate_tick_ms),
        })
    }
}

fn clamp_gate_duration(secs: u64) -> u64 {
    if secs > MAX_GATE_DURATION_SECS {
        tracing::warn!(
            "gate duration {}s exceeds the maximum, using {}s",
            secs,
            MAX_GATE_DURATION_SECS
        );
    }
    secs.min(MAX_GATE_DURATION_SECS)
}

fn string_setting(settings: &config::Config, key: &str, env_key: &str) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .or_else(|| env::var(env_key).ok())
}

fn number_setting(settings: &config::Config, key: &str, env_key: &str) -> Option<u64> {
    settings
        .get_int(key)
        .ok()
        .and_then(|value| u64::try_from(value).ok())
        .or_else(|| env::var(env_key).ok().and_then(|v| v.trim().parse::<u64>().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!(StoreBackend::parse("mongo"), Some(StoreBackend::Mongo));
        assert_eq!(StoreBackend::parse("MongoDB"), Some(StoreBackend::Mongo));
        assert_eq!(StoreBackend::parse(" sqlite "), Some(StoreBackend::Sqlite));
        assert_eq!(StoreBackend::parse("memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse("postgres"), None);
    }

    #[test]
    fn defaults_match_survey_settings() {
        let config = Config::default();
        assert_eq!(config.sample_size, 20);
        assert_eq!(config.gate_duration_secs, 20);
        assert_eq!(config.default_participant, "Annotator_Guest");
        assert!(config.redis_uri.is_none());
        assert!(config.seed_questions_path.is_none());
    }

    #[test]
    fn gate_duration_is_capped() {
        assert_eq!(clamp_gate_duration(20), 20);
        assert_eq!(clamp_gate_duration(0), 0);
        assert_eq!(clamp_gate_duration(u64::MAX), MAX_GATE_DURATION_SECS);
    }
}
