use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use deckbot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key_path: &'static str,
    env_key: &'static str,
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file = ConfigFile::detect();
    std::iter::once("effective config (source precedence: env > file > default):".to_string())
        .chain(effective_fields(&config).into_iter().map(|field| {
            let source = Source::of(&field, file.as_ref());
            format!("- {} = {} (source: {source})", field.key_path, field.value)
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let field = |key_path, env_key, value: String| Field { key_path, env_key, value };
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let wkhtmltopdf = config
        .documents
        .wkhtmltopdf_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<PATH lookup>".to_string());

    vec![
        field("database.url", "DECKBOT_DATABASE_URL", config.database.url.clone()),
        field(
            "database.max_connections",
            "DECKBOT_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            "DECKBOT_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        field(
            "whatsapp.access_token",
            "DECKBOT_WHATSAPP_ACCESS_TOKEN",
            redact_token(config.whatsapp.access_token.expose_secret()),
        ),
        field(
            "whatsapp.phone_number_id",
            "DECKBOT_WHATSAPP_PHONE_NUMBER_ID",
            config.whatsapp.phone_number_id.clone(),
        ),
        field(
            "whatsapp.api_base_url",
            "DECKBOT_WHATSAPP_API_BASE_URL",
            config.whatsapp.api_base_url.clone(),
        ),
        field("llm.provider", "DECKBOT_LLM_PROVIDER", config.llm.provider.as_str().to_string()),
        field("llm.model", "DECKBOT_LLM_MODEL", config.llm.model.clone()),
        field("llm.base_url", "DECKBOT_LLM_BASE_URL", config.llm.effective_base_url()),
        field("llm.api_key", "DECKBOT_LLM_API_KEY", llm_api_key.to_string()),
        field("llm.temperature", "DECKBOT_LLM_TEMPERATURE", config.llm.temperature.to_string()),
        field("llm.max_tokens", "DECKBOT_LLM_MAX_TOKENS", config.llm.max_tokens.to_string()),
        field(
            "server.bind_address",
            "DECKBOT_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        field(
            "server.health_check_port",
            "DECKBOT_SERVER_HEALTH_CHECK_PORT",
            config.server.health_check_port.to_string(),
        ),
        field(
            "flows.utc_offset_hours",
            "DECKBOT_FLOWS_UTC_OFFSET_HOURS",
            config.flows.utc_offset_hours.to_string(),
        ),
        field(
            "reminders.lookahead_hours",
            "DECKBOT_REMINDERS_LOOKAHEAD_HOURS",
            config.reminders.lookahead_hours.to_string(),
        ),
        field(
            "reminders.send_spacing_ms",
            "DECKBOT_REMINDERS_SEND_SPACING_MS",
            config.reminders.send_spacing_ms.to_string(),
        ),
        field("documents.wkhtmltopdf_path", "DECKBOT_DOCUMENTS_WKHTMLTOPDF_PATH", wkhtmltopdf),
        field("logging.level", "DECKBOT_LOGGING_LEVEL", config.logging.level.clone()),
        field("logging.format", "DECKBOT_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

struct ConfigFile {
    path: PathBuf,
    doc: Value,
}

impl ConfigFile {
    fn detect() -> Option<Self> {
        let path = ["deckbot.toml", "config/deckbot.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())?;
        let doc = fs::read_to_string(&path).ok()?.parse::<Value>().ok()?;
        Some(Self { path, doc })
    }

    fn sets(&self, key_path: &str) -> bool {
        key_path.split('.').try_fold(&self.doc, |table, key| table.get(key)).is_some()
    }
}

enum Source<'a> {
    Env(&'static str),
    File(&'a Path),
    Default,
}

impl<'a> Source<'a> {
    fn of(field: &Field, file: Option<&'a ConfigFile>) -> Self {
        if env::var_os(field.env_key).is_some() {
            return Self::Env(field.env_key);
        }
        match file {
            Some(file) if file.sets(field.key_path) => Self::File(&file.path),
            _ => Self::Default,
        }
    }
}

impl fmt::Display for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(key) => write!(f, "env ({key})"),
            Self::File(path) => write!(f, "file ({})", path.display()),
            Self::Default => f.write_str("default"),
        }
    }
}

/// Keeps the first four characters of long tokens so operators can tell
/// tokens apart without exposing them.
pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}
