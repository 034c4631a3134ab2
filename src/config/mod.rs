use std::env;

/// Application configuration, loaded once at startup and carried in the
/// router state. Defaults suit local development; every field can be
/// overridden through the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub search: SearchConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    /// Token validity window, in days.
    pub token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        Self {
            environment,
            http: HttpConfig {
                port: env_parse("PORT", 5000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            },
            security: SecurityConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
                token_ttl_days: env_parse("TOKEN_TTL_DAYS", 7),
            },
            search: SearchConfig {
                default_page_size: env_parse("SEARCH_DEFAULT_PAGE_SIZE", 12),
                max_page_size: env_parse("SEARCH_MAX_PAGE_SIZE", 100),
            },
            ai: AiConfig {
                api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
                base_url: env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
                timeout_secs: env_parse("AI_TIMEOUT_SECS", 30),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
