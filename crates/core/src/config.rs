use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub recognizer: RecognizerConfig,
    pub identity: IdentityConfig,
    pub smtp: SmtpConfig,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub indexer: IndexerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Connection details for the external conversational-intent recognizer.
#[derive(Clone, Debug)]
pub struct RecognizerConfig {
    pub base_url: String,
    pub bot_id: String,
    pub locale: String,
    pub timeout_secs: u64,
}

/// Connection details for the external identity provider backing the
/// credential-issuance endpoint.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub base_url: String,
    pub client_id: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub relay: String,
    pub sender: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Messages received per drain; capped at 10.
    pub batch_size: u32,
    /// Candidate restaurants per recommendation; the worker abandons a
    /// message that cannot resolve this many.
    pub candidate_count: u32,
    pub visibility_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct IndexerConfig {
    pub cuisines: Vec<String>,
    pub locality: String,
    pub per_cuisine_cap: u32,
    pub page_size: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub recognizer_base_url: Option<String>,
    pub identity_base_url: Option<String>,
    pub smtp_relay: Option<String>,
    pub smtp_sender: Option<String>,
    pub worker_poll_interval_secs: Option<u64>,
    pub worker_visibility_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://concierge.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            recognizer: RecognizerConfig {
                base_url: "http://localhost:8089".to_string(),
                bot_id: "concierge-bot".to_string(),
                locale: "en_US".to_string(),
                timeout_secs: 10,
            },
            identity: IdentityConfig {
                base_url: "http://localhost:8090".to_string(),
                client_id: "concierge-web".to_string(),
                timeout_secs: 10,
            },
            smtp: SmtpConfig {
                relay: "localhost".to_string(),
                sender: "concierge@example.com".to_string(),
                username: None,
                password: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            worker: WorkerConfig {
                batch_size: 10,
                candidate_count: 3,
                visibility_timeout_secs: 60,
                poll_interval_secs: 30,
            },
            indexer: IndexerConfig {
                cuisines: vec![
                    "Indian".to_string(),
                    "Chinese".to_string(),
                    "Italian".to_string(),
                ],
                locality: "Manhattan".to_string(),
                per_cuisine_cap: 50,
                page_size: 25,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(recognizer) = patch.recognizer {
            if let Some(base_url) = recognizer.base_url {
                self.recognizer.base_url = base_url;
            }
            if let Some(bot_id) = recognizer.bot_id {
                self.recognizer.bot_id = bot_id;
            }
            if let Some(locale) = recognizer.locale {
                self.recognizer.locale = locale;
            }
            if let Some(timeout_secs) = recognizer.timeout_secs {
                self.recognizer.timeout_secs = timeout_secs;
            }
        }

        if let Some(identity) = patch.identity {
            if let Some(base_url) = identity.base_url {
                self.identity.base_url = base_url;
            }
            if let Some(client_id) = identity.client_id {
                self.identity.client_id = client_id;
            }
            if let Some(timeout_secs) = identity.timeout_secs {
                self.identity.timeout_secs = timeout_secs;
            }
        }

        if let Some(smtp) = patch.smtp {
            if let Some(relay) = smtp.relay {
                self.smtp.relay = relay;
            }
            if let Some(sender) = smtp.sender {
                self.smtp.sender = sender;
            }
            if let Some(username) = smtp.username {
                self.smtp.username = Some(username);
            }
            if let Some(smtp_password_value) = smtp.password {
                self.smtp.password = Some(secret_value(smtp_password_value));
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(worker) = patch.worker {
            if let Some(batch_size) = worker.batch_size {
                self.worker.batch_size = batch_size;
            }
            if let Some(candidate_count) = worker.candidate_count {
                self.worker.candidate_count = candidate_count;
            }
            if let Some(visibility_timeout_secs) = worker.visibility_timeout_secs {
                self.worker.visibility_timeout_secs = visibility_timeout_secs;
            }
            if let Some(poll_interval_secs) = worker.poll_interval_secs {
                self.worker.poll_interval_secs = poll_interval_secs;
            }
        }

        if let Some(indexer) = patch.indexer {
            if let Some(cuisines) = indexer.cuisines {
                self.indexer.cuisines = cuisines;
            }
            if let Some(locality) = indexer.locality {
                self.indexer.locality = locality;
            }
            if let Some(per_cuisine_cap) = indexer.per_cuisine_cap {
                self.indexer.per_cuisine_cap = per_cuisine_cap;
            }
            if let Some(page_size) = indexer.page_size {
                self.indexer.page_size = page_size;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CONCIERGE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CONCIERGE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_RECOGNIZER_BASE_URL") {
            self.recognizer.base_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_RECOGNIZER_BOT_ID") {
            self.recognizer.bot_id = value;
        }
        if let Some(value) = read_env("CONCIERGE_RECOGNIZER_LOCALE") {
            self.recognizer.locale = value;
        }
        if let Some(value) = read_env("CONCIERGE_RECOGNIZER_TIMEOUT_SECS") {
            self.recognizer.timeout_secs = parse_u64("CONCIERGE_RECOGNIZER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_IDENTITY_BASE_URL") {
            self.identity.base_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_IDENTITY_CLIENT_ID") {
            self.identity.client_id = value;
        }
        if let Some(value) = read_env("CONCIERGE_IDENTITY_TIMEOUT_SECS") {
            self.identity.timeout_secs = parse_u64("CONCIERGE_IDENTITY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_SMTP_RELAY") {
            self.smtp.relay = value;
        }
        if let Some(value) = read_env("CONCIERGE_SMTP_SENDER") {
            self.smtp.sender = value;
        }
        if let Some(value) = read_env("CONCIERGE_SMTP_USERNAME") {
            self.smtp.username = Some(value);
        }
        if let Some(value) = read_env("CONCIERGE_SMTP_PASSWORD") {
            self.smtp.password = Some(secret_value(value));
        }

        if let Some(value) = read_env("CONCIERGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_PORT") {
            self.server.port = parse_u16("CONCIERGE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CONCIERGE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_WORKER_BATCH_SIZE") {
            self.worker.batch_size = parse_u32("CONCIERGE_WORKER_BATCH_SIZE", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_WORKER_CANDIDATE_COUNT") {
            self.worker.candidate_count = parse_u32("CONCIERGE_WORKER_CANDIDATE_COUNT", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_WORKER_VISIBILITY_TIMEOUT_SECS") {
            self.worker.visibility_timeout_secs =
                parse_u64("CONCIERGE_WORKER_VISIBILITY_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_WORKER_POLL_INTERVAL_SECS") {
            self.worker.poll_interval_secs =
                parse_u64("CONCIERGE_WORKER_POLL_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_INDEXER_CUISINES") {
            self.indexer.cuisines = value
                .split(',')
                .map(|cuisine| cuisine.trim().to_string())
                .filter(|cuisine| !cuisine.is_empty())
                .collect();
        }
        if let Some(value) = read_env("CONCIERGE_INDEXER_LOCALITY") {
            self.indexer.locality = value;
        }
        if let Some(value) = read_env("CONCIERGE_INDEXER_PER_CUISINE_CAP") {
            self.indexer.per_cuisine_cap =
                parse_u32("CONCIERGE_INDEXER_PER_CUISINE_CAP", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_INDEXER_PAGE_SIZE") {
            self.indexer.page_size = parse_u32("CONCIERGE_INDEXER_PAGE_SIZE", &value)?;
        }

        let log_level =
            read_env("CONCIERGE_LOGGING_LEVEL").or_else(|| read_env("CONCIERGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CONCIERGE_LOGGING_FORMAT").or_else(|| read_env("CONCIERGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(recognizer_base_url) = overrides.recognizer_base_url {
            self.recognizer.base_url = recognizer_base_url;
        }
        if let Some(identity_base_url) = overrides.identity_base_url {
            self.identity.base_url = identity_base_url;
        }
        if let Some(smtp_relay) = overrides.smtp_relay {
            self.smtp.relay = smtp_relay;
        }
        if let Some(smtp_sender) = overrides.smtp_sender {
            self.smtp.sender = smtp_sender;
        }
        if let Some(poll_interval_secs) = overrides.worker_poll_interval_secs {
            self.worker.poll_interval_secs = poll_interval_secs;
        }
        if let Some(visibility_timeout_secs) = overrides.worker_visibility_timeout_secs {
            self.worker.visibility_timeout_secs = visibility_timeout_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_recognizer(&self.recognizer)?;
        validate_identity(&self.identity)?;
        validate_smtp(&self.smtp)?;
        validate_worker(&self.worker)?;
        validate_indexer(&self.indexer)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_recognizer(recognizer: &RecognizerConfig) -> Result<(), ConfigError> {
    if !recognizer.base_url.starts_with("http://") && !recognizer.base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "recognizer.base_url must be an http(s) URL".to_string(),
        ));
    }
    if recognizer.bot_id.trim().is_empty() {
        return Err(ConfigError::Validation("recognizer.bot_id is required".to_string()));
    }
    if recognizer.locale.trim().is_empty() {
        return Err(ConfigError::Validation("recognizer.locale is required".to_string()));
    }
    if recognizer.timeout_secs == 0 || recognizer.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "recognizer.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_identity(identity: &IdentityConfig) -> Result<(), ConfigError> {
    if !identity.base_url.starts_with("http://") && !identity.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "identity.base_url must be an http(s) URL".to_string(),
        ));
    }
    if identity.client_id.trim().is_empty() {
        return Err(ConfigError::Validation("identity.client_id is required".to_string()));
    }
    if identity.timeout_secs == 0 || identity.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "identity.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_smtp(smtp: &SmtpConfig) -> Result<(), ConfigError> {
    if smtp.relay.trim().is_empty() {
        return Err(ConfigError::Validation("smtp.relay is required".to_string()));
    }
    if !smtp.sender.contains('@') {
        return Err(ConfigError::Validation(
            "smtp.sender must be a full email address".to_string(),
        ));
    }
    if smtp.username.is_some() != smtp.password.is_some() {
        return Err(ConfigError::Validation(
            "smtp.username and smtp.password must be provided together".to_string(),
        ));
    }
    let _ = smtp.password.as_ref().map(|password| password.expose_secret().len());
    Ok(())
}

fn validate_worker(worker: &WorkerConfig) -> Result<(), ConfigError> {
    if worker.batch_size == 0 || worker.batch_size > 10 {
        return Err(ConfigError::Validation(
            "worker.batch_size must be in range 1..=10".to_string(),
        ));
    }
    if worker.candidate_count == 0 {
        return Err(ConfigError::Validation(
            "worker.candidate_count must be greater than zero".to_string(),
        ));
    }
    if worker.visibility_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "worker.visibility_timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_indexer(indexer: &IndexerConfig) -> Result<(), ConfigError> {
    if indexer.cuisines.is_empty() {
        return Err(ConfigError::Validation(
            "indexer.cuisines must name at least one cuisine".to_string(),
        ));
    }
    if indexer.per_cuisine_cap == 0 {
        return Err(ConfigError::Validation(
            "indexer.per_cuisine_cap must be greater than zero".to_string(),
        ));
    }
    if indexer.page_size == 0 {
        return Err(ConfigError::Validation(
            "indexer.page_size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "unsupported logging.level `{other}` (expected trace|debug|info|warn|error)"
        ))),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    recognizer: Option<RecognizerPatch>,
    identity: Option<IdentityPatch>,
    smtp: Option<SmtpPatch>,
    server: Option<ServerPatch>,
    worker: Option<WorkerPatch>,
    indexer: Option<IndexerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RecognizerPatch {
    base_url: Option<String>,
    bot_id: Option<String>,
    locale: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IdentityPatch {
    base_url: Option<String>,
    client_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SmtpPatch {
    relay: Option<String>,
    sender: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WorkerPatch {
    batch_size: Option<u32>,
    candidate_count: Option<u32>,
    visibility_timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IndexerPatch {
    cuisines: Option<Vec<String>>,
    locality: Option<String>,
    per_cuisine_cap: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn load_from_file(contents: &str, overrides: ConfigOverrides) -> Result<AppConfig, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().expect("temp config file");
        file.write_all(contents.as_bytes()).expect("write config");
        AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides,
        })
    }

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().expect("default config should be valid");
    }

    #[test]
    fn file_values_override_defaults() {
        let config = load_from_file(
            r#"
            [database]
            url = "sqlite::memory:"

            [indexer]
            cuisines = ["Thai"]
            locality = "Brooklyn"
            "#,
            ConfigOverrides::default(),
        )
        .expect("load config");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.indexer.cuisines, vec!["Thai".to_string()]);
        assert_eq!(config.indexer.locality, "Brooklyn");
        assert_eq!(config.worker.batch_size, 10);
    }

    #[test]
    fn programmatic_overrides_win_over_file_values() {
        let config = load_from_file(
            r#"
            [database]
            url = "sqlite://from-file.db"
            "#,
            ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
        )
        .expect("load config");

        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/concierge.toml")),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn batch_size_above_ten_is_rejected() {
        let result = load_from_file(
            r#"
            [worker]
            batch_size = 25
            "#,
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() {
        let result = load_from_file(
            r#"
            [database]
            url = "postgres://localhost/concierge"
            "#,
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unterminated_interpolation_is_reported() {
        let result = load_from_file(
            r#"
            [smtp]
            relay = "${SMTP_RELAY"
            "#,
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::UnterminatedInterpolation)));
    }

    #[test]
    fn smtp_credentials_must_come_in_pairs() {
        let result = load_from_file(
            r#"
            [smtp]
            username = "mailer"
            "#,
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
