use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_MAX_TOKENS: i32 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct InterviewConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub store: StoreConfig,
    pub metrics: MetricsConfig,
    pub auth: AuthConfig,
    pub genai: GenaiConfig,
    pub identity: IdentityConfig,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb_uri: Option<String>,
    pub database: String,
    pub questions_collection: String,
    pub page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Group whose members may create, update and delete questions.
    pub admin_group: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenaiConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub text_model: String,
    pub max_tokens: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    pub auth_service_url: Option<String>,
    pub admin_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityBackend {
    AuthService,
    Memory,
}

impl InterviewConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| common_config.log_level.clone());

        let store_backend: StoreBackend = parse(get_env("STORE_BACKEND", Some("mongo"), is_prod)?)?;
        let provider: ProviderKind = parse(get_env("GENAI_PROVIDER", Some("gemini"), is_prod)?)?;
        let identity_backend: IdentityBackend =
            parse(get_env("IDENTITY_BACKEND", Some("auth_service"), is_prod)?)?;

        Ok(InterviewConfig {
            common: common_config,
            store: StoreConfig {
                backend: store_backend,
                mongodb_uri: match store_backend {
                    StoreBackend::Mongo => Some(get_env("MONGODB_URI", None, is_prod)?),
                    StoreBackend::Memory => env::var("MONGODB_URI").ok(),
                },
                database: get_env("MONGODB_DATABASE", Some("interview_db"), is_prod)?,
                questions_collection: get_env("QUESTIONS_COLLECTION", Some("questions"), is_prod)?,
                page_size: get_env(
                    "STORE_PAGE_SIZE",
                    Some(&DEFAULT_PAGE_SIZE.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_PAGE_SIZE),
            },
            metrics: MetricsConfig {
                namespace: get_env("METRICS_NAMESPACE", Some("RoleReady"), is_prod)?,
            },
            auth: AuthConfig {
                admin_group: get_env("ADMIN_GROUP", Some("Admin"), is_prod)?,
            },
            genai: GenaiConfig {
                provider,
                api_key: match provider {
                    ProviderKind::Gemini => Some(get_env("GOOGLE_API_KEY", None, is_prod)?),
                    ProviderKind::Mock => env::var("GOOGLE_API_KEY").ok(),
                },
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-2.0-flash"), is_prod)?,
                max_tokens: get_env(
                    "GENAI_MAX_TOKENS",
                    Some(&DEFAULT_MAX_TOKENS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_MAX_TOKENS),
            },
            identity: IdentityConfig {
                backend: identity_backend,
                auth_service_url: match identity_backend {
                    IdentityBackend::AuthService => Some(get_env(
                        "AUTH_SERVICE_URL",
                        Some("http://auth-service:8080"),
                        is_prod,
                    )?),
                    IdentityBackend::Memory => env::var("AUTH_SERVICE_URL").ok(),
                },
                admin_api_key: env::var("ADMIN_API_KEY").ok(),
            },
            log_level,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }
}

/// Settings of the `transfer` binary: copy one collection into another.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub source: MongoEndpoint,
    pub destination: MongoEndpoint,
    pub batch_size: usize,
    pub max_retries: u32,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoEndpoint {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl TransferConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let endpoint = |prefix: &str| -> Result<MongoEndpoint, AppError> {
            Ok(MongoEndpoint {
                uri: get_env(&format!("{}_MONGODB_URI", prefix), None, is_prod)?,
                database: get_env(
                    &format!("{}_MONGODB_DATABASE", prefix),
                    Some("interview_db"),
                    is_prod,
                )?,
                collection: get_env(
                    &format!("{}_COLLECTION", prefix),
                    Some("questions"),
                    is_prod,
                )?,
            })
        };

        Ok(TransferConfig {
            source: endpoint("SOURCE")?,
            destination: endpoint("DEST")?,
            batch_size: get_env("TRANSFER_BATCH_SIZE", Some("25"), false)?
                .parse()
                .unwrap_or(25),
            max_retries: get_env("TRANSFER_MAX_RETRIES", Some("5"), false)?
                .parse()
                .unwrap_or(5),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(format!("Invalid GenAI provider: {}", s)),
        }
    }
}

impl std::str::FromStr for IdentityBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auth_service" | "auth-service" => Ok(IdentityBackend::AuthService),
            "memory" => Ok(IdentityBackend::Memory),
            _ => Err(format!("Invalid identity backend: {}", s)),
        }
    }
}

fn parse<T>(value: String) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
