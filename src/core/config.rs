/// Server configuration
///
/// Every field can be overridden through an environment variable:
///
/// | Environment variable | Default | Description |
/// |----------------------|---------|-------------|
/// | HTTP_PORT | 3000 | HTTP service port |
/// | DATABASE_PATH | data/tiffin.db | SQLite database file |
/// | CACHE_BACKEND | memory | `memory` or `redis` |
/// | REDIS_URL | redis://localhost:6379 | Used when CACHE_BACKEND=redis |
/// | ADMIN_TOKEN | (unset) | Shared secret for the admin API |
/// | GEMINI_API_KEY | (unset) | Enables the LLM suggestion model |
/// | GEMINI_MODEL | gemini-2.5-flash | Model name for suggestions |
/// | ORDER_TX_TIMEOUT_MS | 10000 | Order commit transaction timeout |
/// | ENVIRONMENT | development | development \| staging \| production |
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// SQLite database file path
    pub database_path: String,
    /// Cache backend selector: "memory" | "redis"
    pub cache_backend: String,
    /// Redis connection URL (redis backend only)
    pub redis_url: String,
    /// Shared secret gating the admin API; admin routes reject when unset
    pub admin_token: Option<String>,
    /// Gemini API key; suggestion endpoints fall back to deterministic
    /// picks when unset
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Order commit transaction timeout (milliseconds)
    pub order_tx_timeout_ms: u64,
    /// Runtime environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/tiffin.db".into()),
            cache_backend: std::env::var("CACHE_BACKEND").unwrap_or_else(|_| "memory".into()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".into()),
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".into()),
            order_tx_timeout_ms: std::env::var("ORDER_TX_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
