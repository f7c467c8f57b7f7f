/// Configuration management for Feed Service
///
/// Everything is read from environment variables. `main` loads a `.env` file
/// first when one is present.
use feed_cache::{ttl, FeedCacheBackend};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub events: EventConfig,
    pub jwt: JwtConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

/// Feed cache backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(with = "backend_name")]
    pub backend: FeedCacheBackend,
    pub redis_url: String,
    /// TTL applied to a Redis feed bucket on every push
    pub ttl_secs: u64,
}

/// Fan-out worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    pub handler_timeout_ms: u64,
}

impl EventConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 8,
            handler_timeout_ms: 5_000,
        }
    }
}

/// Bearer token verification keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// RS256 public key, preferred when both keys are set
    pub public_key_pem: Option<String>,
    pub hs256_secret: Option<String>,
    pub issuer: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let cache = {
            let backend = match std::env::var("FEED_CACHE_BACKEND") {
                Ok(raw) => raw
                    .parse::<FeedCacheBackend>()
                    .map_err(|e| format!("Failed to parse FEED_CACHE_BACKEND: {}", e))?,
                Err(_) => FeedCacheBackend::default(),
            };
            let redis_url = match std::env::var("REDIS_URL") {
                Ok(url) if !url.trim().is_empty() => url,
                _ if production && backend == FeedCacheBackend::Redis => {
                    return Err(
                        "REDIS_URL must be set in production when FEED_CACHE_BACKEND=redis"
                            .to_string(),
                    )
                }
                _ => "redis://localhost:6379".to_string(),
            };
            let ttl_secs = parse_env_or_default("FEED_CACHE_TTL_SECS", ttl::FEED_BUCKET)?;
            if ttl_secs == 0 {
                return Err("FEED_CACHE_TTL_SECS must be greater than zero".to_string());
            }

            CacheConfig {
                backend,
                redis_url,
                ttl_secs,
            }
        };

        let events = {
            let defaults = EventConfig::default();
            let events = EventConfig {
                queue_capacity: parse_env_or_default(
                    "FEED_EVENT_QUEUE_CAPACITY",
                    defaults.queue_capacity,
                )?,
                workers: parse_env_or_default("FEED_EVENT_WORKERS", defaults.workers)?,
                handler_timeout_ms: parse_env_or_default(
                    "FEED_EVENT_HANDLER_TIMEOUT_MS",
                    defaults.handler_timeout_ms,
                )?,
            };
            if events.queue_capacity == 0 || events.workers == 0 || events.handler_timeout_ms == 0
            {
                return Err(
                    "FEED_EVENT_QUEUE_CAPACITY, FEED_EVENT_WORKERS and FEED_EVENT_HANDLER_TIMEOUT_MS must be positive"
                        .to_string(),
                );
            }
            events
        };

        let jwt = JwtConfig {
            public_key_pem: non_empty_env("JWT_PUBLIC_KEY_PEM"),
            hs256_secret: non_empty_env("JWT_HS256_SECRET"),
            issuer: non_empty_env("JWT_ISSUER"),
        };
        if jwt.public_key_pem.is_none() && jwt.hs256_secret.is_none() {
            return Err("JWT_PUBLIC_KEY_PEM or JWT_HS256_SECRET must be set".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("FEED_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("FEED_SERVICE_PORT", 8080)?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/keklock".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_env_or_default("DATABASE_RUN_MIGRATIONS", true)?,
            },
            cache,
            events,
            jwt,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

mod backend_name {
    use feed_cache::FeedCacheBackend;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(backend: &FeedCacheBackend, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(backend)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FeedCacheBackend, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
