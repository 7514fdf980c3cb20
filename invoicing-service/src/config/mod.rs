use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

use crate::services::LifecyclePolicy;

const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub mongodb: MongoConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub policy: PolicyConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: Secret<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Proof images travel base64-encoded inside JSON bodies.
    pub max_body_bytes: usize,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub allow_self_invoice: bool,
    pub accept_client_date: bool,
}

impl From<&PolicyConfig> for LifecyclePolicy {
    fn from(config: &PolicyConfig) -> Self {
        LifecyclePolicy {
            allow_self_invoice: config.allow_self_invoice,
            accept_client_date: config.accept_client_date,
        }
    }
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles .env and the APP__ prefix
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        Ok(InvoicingConfig {
            common: common_config,
            environment,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("invoicing_db"), is_prod)?,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(get_env("JWT_SECRET", Some("dev-secret"), is_prod)?),
            },
            http: HttpConfig {
                max_body_bytes: parse_env(
                    "HTTP_MAX_BODY_BYTES",
                    DEFAULT_MAX_BODY_BYTES,
                )?,
                allowed_origins: parse_origins(
                    &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
            },
            policy: PolicyConfig {
                allow_self_invoice: parse_env("INVOICE_ALLOW_SELF_INVOICE", true)?,
                accept_client_date: parse_env("INVOICE_ACCEPT_CLIENT_DATE", true)?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
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
