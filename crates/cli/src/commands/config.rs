use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use concierge_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "CONCIERGE_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "CONCIERGE_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "recognizer.base_url",
        &config.recognizer.base_url,
        source("recognizer.base_url", "CONCIERGE_RECOGNIZER_BASE_URL"),
    ));
    lines.push(render_line(
        "recognizer.bot_id",
        &config.recognizer.bot_id,
        source("recognizer.bot_id", "CONCIERGE_RECOGNIZER_BOT_ID"),
    ));
    lines.push(render_line(
        "identity.base_url",
        &config.identity.base_url,
        source("identity.base_url", "CONCIERGE_IDENTITY_BASE_URL"),
    ));
    lines.push(render_line(
        "identity.client_id",
        &config.identity.client_id,
        source("identity.client_id", "CONCIERGE_IDENTITY_CLIENT_ID"),
    ));
    lines.push(render_line(
        "smtp.relay",
        &config.smtp.relay,
        source("smtp.relay", "CONCIERGE_SMTP_RELAY"),
    ));
    lines.push(render_line(
        "smtp.sender",
        &config.smtp.sender,
        source("smtp.sender", "CONCIERGE_SMTP_SENDER"),
    ));
    lines.push(render_line(
        "smtp.username",
        config.smtp.username.as_deref().unwrap_or("<unset>"),
        source("smtp.username", "CONCIERGE_SMTP_USERNAME"),
    ));
    let smtp_password = if config.smtp.password.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "smtp.password",
        smtp_password,
        source("smtp.password", "CONCIERGE_SMTP_PASSWORD"),
    ));
    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "CONCIERGE_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "CONCIERGE_SERVER_PORT"),
    ));
    lines.push(render_line(
        "worker.batch_size",
        &config.worker.batch_size.to_string(),
        source("worker.batch_size", "CONCIERGE_WORKER_BATCH_SIZE"),
    ));
    lines.push(render_line(
        "worker.candidate_count",
        &config.worker.candidate_count.to_string(),
        source("worker.candidate_count", "CONCIERGE_WORKER_CANDIDATE_COUNT"),
    ));
    lines.push(render_line(
        "worker.visibility_timeout_secs",
        &config.worker.visibility_timeout_secs.to_string(),
        source("worker.visibility_timeout_secs", "CONCIERGE_WORKER_VISIBILITY_TIMEOUT_SECS"),
    ));
    lines.push(render_line(
        "worker.poll_interval_secs",
        &config.worker.poll_interval_secs.to_string(),
        source("worker.poll_interval_secs", "CONCIERGE_WORKER_POLL_INTERVAL_SECS"),
    ));
    lines.push(render_line(
        "indexer.cuisines",
        &config.indexer.cuisines.join(","),
        source("indexer.cuisines", "CONCIERGE_INDEXER_CUISINES"),
    ));
    lines.push(render_line(
        "indexer.locality",
        &config.indexer.locality,
        source("indexer.locality", "CONCIERGE_INDEXER_LOCALITY"),
    ));
    lines.push(render_line(
        "indexer.per_cuisine_cap",
        &config.indexer.per_cuisine_cap.to_string(),
        source("indexer.per_cuisine_cap", "CONCIERGE_INDEXER_PER_CUISINE_CAP"),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "CONCIERGE_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "CONCIERGE_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("concierge.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/concierge.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
