//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::i18n::Locale;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Bearer token verification.
    pub auth: AuthConfig,
    /// Attachment intake and file-store settings.
    #[serde(default)]
    pub uploads: UploadConfig,
    /// Keyword tiers driving priority triage.
    #[serde(default)]
    pub triage: TriageConfig,
    /// Status lifecycle settings.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development; error responses carry diagnostic detail.
    #[default]
    Development,
    /// Production; diagnostic detail is never sent to callers.
    Production,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Locale used when the caller sends no usable `Accept-Language`.
    #[serde(default)]
    pub default_locale: Locale,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            default_locale: Locale::default(),
        }
    }
}

impl ServerConfig {
    /// Whether error responses may include diagnostic detail.
    #[must_use]
    pub fn expose_error_details(&self) -> bool {
        self.environment != Environment::Production
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Settings for verifying tokens minted by the external identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret.
    pub jwt_secret: String,
    /// Expected `iss` claim, if the issuer sets one.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Clock skew tolerated when checking `exp`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

/// Attachment intake configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Root directory of the local file store.
    #[serde(default = "default_upload_path")]
    pub base_path: PathBuf,
    /// URL prefix under which stored files are served.
    #[serde(default = "default_upload_url")]
    pub base_url: String,
    /// Per-file size ceiling in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_path: default_upload_path(),
            base_url: default_upload_url(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Ordered keyword tiers for the priority classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct TriageConfig {
    /// Terms that mark a report as life-threatening.
    #[serde(default = "default_critical_keywords")]
    pub critical_keywords: Vec<String>,
    /// Terms that indicate injuries.
    #[serde(default = "default_high_keywords")]
    pub high_keywords: Vec<String>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            critical_keywords: default_critical_keywords(),
            high_keywords: default_high_keywords(),
        }
    }
}

/// Which status changes a privileged handler may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may be set from any status.
    #[default]
    Permissive,
    /// Only same-state updates and forward moves towards a terminal state.
    ForwardOnly,
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LifecycleConfig {
    /// Transition policy applied by status updates.
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_leeway() -> u64 {
    30
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_upload_url() -> String {
    "/uploads".to_string()
}

/// 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

/// Life-threatening terms, checked before the injury tier.
pub fn default_critical_keywords() -> Vec<String> {
    [
        "إصابة خطيرة",
        "وفاة",
        "حريق",
        "انفجار",
        "طوارئ",
        "نزيف",
        "فاقد الوعي",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Injury-adjacent terms.
pub fn default_high_keywords() -> Vec<String> {
    ["إصابة", "مصاب", "دماء", "جريح", "كسر"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `ROADWATCH_ENV`)
    /// 4. Environment variables with `ROADWATCH__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("ROADWATCH_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ROADWATCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("triage.critical_keywords")
                    .with_list_parse_key("triage.high_keywords")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ROADWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
