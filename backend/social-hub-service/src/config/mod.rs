/// Configuration management for social-hub-service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub social: SocialConfig,
    pub media: MediaConfig,
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

/// Which persistence backend serves the repositories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local tables, lost on restart
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Empty when the memory backend is selected
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Page size of the "people you may know" list
    pub suggestion_limit: i64,
    /// Handle prefixes whose owners accept every friend request immediately
    pub auto_accept_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub upload_dir: String,
    pub public_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Unset falls back to `default`; a set but unparsable value is an error
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000)?,
        };

        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => StoreBackend::parse(&value)?,
            Err(_) => StoreBackend::Postgres,
        };

        let url = match backend {
            StoreBackend::Postgres => std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            StoreBackend::Memory => std::env::var("DATABASE_URL").unwrap_or_default(),
        };

        let database = DatabaseConfig {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", default_max_connections())?,
            min_connections: env_or("DB_MIN_CONNECTIONS", default_min_connections())?,
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 10)?,
        };

        let suggestion_limit: i64 = env_or("SUGGESTION_LIMIT", 15)?;
        if suggestion_limit <= 0 {
            bail!("SUGGESTION_LIMIT must be positive, got {}", suggestion_limit);
        }

        let social = SocialConfig {
            suggestion_limit,
            auto_accept_prefixes: parse_prefixes(
                &std::env::var("AUTO_ACCEPT_PREFIXES").unwrap_or_else(|_| "robot".to_string()),
            ),
        };

        let media = MediaConfig {
            upload_dir: std::env::var("MEDIA_UPLOAD_DIR").unwrap_or_else(|_| "public".to_string()),
            public_prefix: std::env::var("MEDIA_PUBLIC_PREFIX").unwrap_or_default(),
        };

        let websocket = WebSocketConfig {
            heartbeat_interval_secs: env_or("WS_HEARTBEAT_INTERVAL_SECS", 5)?,
            client_timeout_secs: env_or("WS_CLIENT_TIMEOUT_SECS", 30)?,
        };

        Ok(Config {
            app,
            storage: StorageConfig { backend },
            database,
            social,
            media,
            websocket,
        })
    }

    /// In-memory configuration used by tests and local demos
    pub fn for_memory_backend() -> Self {
        Config {
            app: AppConfig {
                env: "test".to_string(),
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                backend: StoreBackend::Memory,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                acquire_timeout_secs: 10,
            },
            social: SocialConfig {
                suggestion_limit: 15,
                auto_accept_prefixes: vec!["robot".to_string()],
            },
            media: MediaConfig {
                upload_dir: std::env::temp_dir()
                    .join("social-hub-media")
                    .to_string_lossy()
                    .into_owned(),
                public_prefix: String::new(),
            },
            websocket: WebSocketConfig {
                heartbeat_interval_secs: 5,
                client_timeout_secs: 30,
            },
        }
    }
}
