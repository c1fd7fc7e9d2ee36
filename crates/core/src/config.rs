//! Layered runtime configuration.
//!
//! Values resolve as defaults, then `deckbot.toml` (or `config/deckbot.toml`)
//! with `${VAR}` interpolation, then `DECKBOT_*` environment variables, then
//! programmatic overrides. The merged result is validated once at the end.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::FixedOffset;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_CANDIDATES: [&str; 2] = ["deckbot.toml", "config/deckbot.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub whatsapp: WhatsAppConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub flows: FlowsConfig,
    pub reminders: RemindersConfig,
    pub documents: DocumentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub access_token: SecretString,
    pub phone_number_id: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Explicit base URL, or the provider's OpenAI-compatible endpoint.
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(base_url) => base_url.trim_end_matches('/').to_string(),
            None => self.provider.default_base_url().to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct FlowsConfig {
    /// Business wall-clock offset used for appointment dates.
    pub utc_offset_hours: i32,
}

impl FlowsConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            ConfigError::Validation("flows.utc_offset_hours must be in range -23..=23".to_string())
        })
    }
}

#[derive(Clone, Debug)]
pub struct RemindersConfig {
    pub lookahead_hours: u32,
    pub send_spacing_ms: u64,
}

#[derive(Clone, Debug, Default)]
pub struct DocumentsConfig {
    pub wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Groq,
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Self::Groq, Self::OpenAi, Self::Ollama]
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "unsupported llm provider `{}` (expected groq|openai|ollama)",
                    value.trim()
                ))
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
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

/// Programmatic values that win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub whatsapp_access_token: Option<String>,
    pub whatsapp_phone_number_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("`${{{var}}}` is referenced in the config file but not set in the environment")]
    MissingEnvInterpolation { var: String },
    #[error("config file contains a `${{` without a closing `}}`")]
    UnterminatedInterpolation,
    #[error("{key}=`{value}` cannot be parsed")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://deckbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            whatsapp: WhatsAppConfig {
                access_token: SecretString::from(String::new()),
                phone_number_id: String::new(),
                api_base_url: "https://graph.facebook.com/v18.0".to_string(),
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: None,
                base_url: None,
                model: "llama-3.3-70b-versatile".to_string(),
                timeout_secs: 60,
                temperature: 0.7,
                max_tokens: 4000,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            flows: FlowsConfig { utc_offset_hours: -5 },
            reminders: RemindersConfig { lookahead_hours: 24, send_spacing_ms: 2000 },
            documents: DocumentsConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Self::load_with_env(options, |key| env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an explicit environment lookup.
    pub fn load_with_env<F>(options: LoadOptions, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match locate_file(options.config_path.as_deref()) {
            Some(path) => config.merge_file(read_file_layer(&path, &lookup)?),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_CANDIDATES[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.merge_env(&EnvLayer { lookup: &lookup })?;
        config.merge_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn merge_file(&mut self, file: FileLayer) {
        if let Some(section) = file.database {
            set(&mut self.database.url, section.url);
            set(&mut self.database.max_connections, section.max_connections);
            set(&mut self.database.timeout_secs, section.timeout_secs);
        }
        if let Some(section) = file.whatsapp {
            set(&mut self.whatsapp.access_token, section.access_token.map(SecretString::from));
            set(&mut self.whatsapp.phone_number_id, section.phone_number_id);
            set(&mut self.whatsapp.api_base_url, section.api_base_url);
            set(&mut self.whatsapp.timeout_secs, section.timeout_secs);
        }
        if let Some(section) = file.llm {
            set(&mut self.llm.provider, section.provider);
            set_some(&mut self.llm.api_key, section.api_key.map(SecretString::from));
            set_some(&mut self.llm.base_url, section.base_url);
            set(&mut self.llm.model, section.model);
            set(&mut self.llm.timeout_secs, section.timeout_secs);
            set(&mut self.llm.temperature, section.temperature);
            set(&mut self.llm.max_tokens, section.max_tokens);
        }
        if let Some(section) = file.server {
            set(&mut self.server.bind_address, section.bind_address);
            set(&mut self.server.health_check_port, section.health_check_port);
            set(&mut self.server.graceful_shutdown_secs, section.graceful_shutdown_secs);
        }
        if let Some(section) = file.flows {
            set(&mut self.flows.utc_offset_hours, section.utc_offset_hours);
        }
        if let Some(section) = file.reminders {
            set(&mut self.reminders.lookahead_hours, section.lookahead_hours);
            set(&mut self.reminders.send_spacing_ms, section.send_spacing_ms);
        }
        if let Some(section) = file.documents {
            set_some(&mut self.documents.wkhtmltopdf_path, section.wkhtmltopdf_path);
        }
        if let Some(section) = file.logging {
            set(&mut self.logging.level, section.level);
            set(&mut self.logging.format, section.format);
        }
    }

    fn merge_env<F>(&mut self, env: &EnvLayer<'_, F>) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        set(&mut self.database.url, env.text("DECKBOT_DATABASE_URL"));
        set(&mut self.database.max_connections, env.parsed("DECKBOT_DATABASE_MAX_CONNECTIONS")?);
        set(&mut self.database.timeout_secs, env.parsed("DECKBOT_DATABASE_TIMEOUT_SECS")?);

        set(
            &mut self.whatsapp.access_token,
            env.text("DECKBOT_WHATSAPP_ACCESS_TOKEN").map(SecretString::from),
        );
        set(&mut self.whatsapp.phone_number_id, env.text("DECKBOT_WHATSAPP_PHONE_NUMBER_ID"));
        set(&mut self.whatsapp.api_base_url, env.text("DECKBOT_WHATSAPP_API_BASE_URL"));
        set(&mut self.whatsapp.timeout_secs, env.parsed("DECKBOT_WHATSAPP_TIMEOUT_SECS")?);

        let provider = env.text("DECKBOT_LLM_PROVIDER").map(|v| v.parse()).transpose()?;
        set(&mut self.llm.provider, provider);
        set_some(&mut self.llm.api_key, env.text("DECKBOT_LLM_API_KEY").map(SecretString::from));
        set_some(&mut self.llm.base_url, env.text("DECKBOT_LLM_BASE_URL"));
        set(&mut self.llm.model, env.text("DECKBOT_LLM_MODEL"));
        set(&mut self.llm.timeout_secs, env.parsed("DECKBOT_LLM_TIMEOUT_SECS")?);
        set(&mut self.llm.temperature, env.parsed("DECKBOT_LLM_TEMPERATURE")?);
        set(&mut self.llm.max_tokens, env.parsed("DECKBOT_LLM_MAX_TOKENS")?);

        set(&mut self.server.bind_address, env.text("DECKBOT_SERVER_BIND_ADDRESS"));
        set(&mut self.server.health_check_port, env.parsed("DECKBOT_SERVER_HEALTH_CHECK_PORT")?);
        set(
            &mut self.server.graceful_shutdown_secs,
            env.parsed("DECKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS")?,
        );

        set(&mut self.flows.utc_offset_hours, env.parsed("DECKBOT_FLOWS_UTC_OFFSET_HOURS")?);
        set(&mut self.reminders.lookahead_hours, env.parsed("DECKBOT_REMINDERS_LOOKAHEAD_HOURS")?);
        set(&mut self.reminders.send_spacing_ms, env.parsed("DECKBOT_REMINDERS_SEND_SPACING_MS")?);
        set_some(
            &mut self.documents.wkhtmltopdf_path,
            env.text("DECKBOT_DOCUMENTS_WKHTMLTOPDF_PATH").map(PathBuf::from),
        );

        // The short LOG_* names are accepted as aliases.
        set(
            &mut self.logging.level,
            env.text("DECKBOT_LOGGING_LEVEL").or_else(|| env.text("DECKBOT_LOG_LEVEL")),
        );
        let format = env.text("DECKBOT_LOGGING_FORMAT").or_else(|| env.text("DECKBOT_LOG_FORMAT"));
        set(&mut self.logging.format, format.map(|v| v.parse()).transpose()?);

        Ok(())
    }

    fn merge_overrides(&mut self, overrides: ConfigOverrides) {
        set(&mut self.database.url, overrides.database_url);
        set(&mut self.logging.level, overrides.log_level);
        set(&mut self.llm.provider, overrides.llm_provider);
        set(&mut self.llm.model, overrides.llm_model);
        set(
            &mut self.whatsapp.access_token,
            overrides.whatsapp_access_token.map(SecretString::from),
        );
        set(&mut self.whatsapp.phone_number_id, overrides.whatsapp_phone_number_id);
    }

    /// Reports every problem at once so operators can fix them in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Problems::default();

        let url = self.database.url.trim();
        problems.check(
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:",
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        );
        problems.check(
            self.database.max_connections > 0,
            "database.max_connections must be greater than zero",
        );
        problems.in_range("database.timeout_secs", self.database.timeout_secs, 1, 300);

        problems.check(
            !self.whatsapp.access_token.expose_secret().trim().is_empty(),
            "whatsapp.access_token is required. Get it from Meta for Developers > Your App > WhatsApp > API Setup",
        );
        let phone_number_id = self.whatsapp.phone_number_id.trim();
        if phone_number_id.is_empty() {
            problems.push(
                "whatsapp.phone_number_id is required (the numeric id shown under WhatsApp > API Setup, not the phone number itself)",
            );
        } else {
            problems.check(
                phone_number_id.chars().all(|ch| ch.is_ascii_digit()),
                "whatsapp.phone_number_id must contain digits only",
            );
        }
        problems.http_url("whatsapp.api_base_url", &self.whatsapp.api_base_url);
        problems.in_range("whatsapp.timeout_secs", self.whatsapp.timeout_secs, 1, 300);

        problems.in_range("llm.timeout_secs", self.llm.timeout_secs, 1, 300);
        problems.check(
            (0.0..=2.0).contains(&self.llm.temperature),
            "llm.temperature must be in range 0.0..=2.0",
        );
        problems.check(self.llm.max_tokens > 0, "llm.max_tokens must be greater than zero");
        problems.check(!self.llm.model.trim().is_empty(), "llm.model must not be empty");
        if self.llm.provider.requires_api_key() {
            let has_key = self
                .llm
                .api_key
                .as_ref()
                .is_some_and(|key| !key.expose_secret().trim().is_empty());
            problems.check(
                has_key,
                format!("llm.api_key is required for the {} provider", self.llm.provider.as_str()),
            );
        }
        if let Some(base_url) = &self.llm.base_url {
            problems.http_url("llm.base_url", base_url);
        }

        problems.check(
            self.server.health_check_port > 0,
            "server.health_check_port must be greater than zero",
        );
        problems.check(
            self.server.graceful_shutdown_secs > 0,
            "server.graceful_shutdown_secs must be greater than zero",
        );

        if let Err(ConfigError::Validation(message)) = self.flows.utc_offset() {
            problems.push(message);
        }
        problems.in_range(
            "reminders.lookahead_hours",
            u64::from(self.reminders.lookahead_hours),
            1,
            168,
        );
        problems.check(
            matches!(
                self.logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "logging.level must be one of trace|debug|info|warn|error",
        );

        problems.into_result()
    }
}

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.push(message);
        }
    }

    fn in_range(&mut self, key: &str, value: u64, min: u64, max: u64) {
        self.check((min..=max).contains(&value), format!("{key} must be in range {min}..={max}"));
    }

    fn http_url(&mut self, key: &str, value: &str) {
        let value = value.trim();
        self.check(
            value.starts_with("http://") || value.starts_with("https://"),
            format!("{key} must start with http:// or https://"),
        );
    }

    fn into_result(self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(self.0.join("; ")))
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

struct EnvLayer<'a, F> {
    lookup: &'a F,
}

impl<F> EnvLayer<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Blank values count as unset.
    fn text(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.text(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: key.to_string(),
                    value,
                })
            })
            .transpose()
    }
}

fn locate_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => CONFIG_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_file_layer<F>(path: &Path, lookup: &F) -> Result<FileLayer, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let expanded = expand_placeholders(&raw, lookup)?;
    toml::from_str(&expanded)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn expand_placeholders<F>(raw: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &tail[..end];
        let value = lookup(var)
            .ok_or_else(|| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        expanded.push_str(&value);
        rest = &tail[end + 1..];
    }
    expanded.push_str(rest);

    Ok(expanded)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLayer {
    database: Option<DatabaseSection>,
    whatsapp: Option<WhatsAppSection>,
    llm: Option<LlmSection>,
    server: Option<ServerSection>,
    flows: Option<FlowsSection>,
    reminders: Option<RemindersSection>,
    documents: Option<DocumentsSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppSection {
    access_token: Option<String>,
    phone_number_id: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmSection {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowsSection {
    utc_offset_hours: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct RemindersSection {
    lookahead_hours: Option<u32>,
    send_spacing_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentsSection {
    wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    fn env_with(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = [
            ("DECKBOT_WHATSAPP_ACCESS_TOKEN", "EAAG-test-token"),
            ("DECKBOT_WHATSAPP_PHONE_NUMBER_ID", "109876543210"),
            ("DECKBOT_LLM_API_KEY", "gsk-test-key"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        vars
    }

    fn load(
        options: LoadOptions,
        vars: &HashMap<String, String>,
    ) -> Result<AppConfig, ConfigError> {
        AppConfig::load_with_env(options, |key| vars.get(key).cloned())
    }

    // Points at a file that never exists so a stray deckbot.toml in the
    // working directory cannot leak into the test.
    fn no_file() -> LoadOptions {
        LoadOptions { config_path: Some(PathBuf::from("/nonexistent/deckbot.toml")), ..LoadOptions::default() }
    }

    fn write_file(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("deckbot.toml");
        fs::write(&path, contents).expect("write config file");
        path
    }

    #[test]
    fn defaults_match_business_settings() {
        let config = load(no_file(), &env_with(&[])).expect("config loads");

        assert_eq!(config.llm.provider, LlmProvider::Groq);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.max_tokens, 4000);
        assert_eq!(config.llm.effective_base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(config.reminders.lookahead_hours, 24);
        assert_eq!(config.reminders.send_spacing_ms, 2000);
        assert_eq!(config.logging.format, LogFormat::Compact);
        let offset = config.flows.utc_offset().expect("valid offset");
        assert_eq!(offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn file_placeholders_resolve_from_the_environment() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(
            &dir,
            r#"
[whatsapp]
access_token = "${META_TOKEN}"
phone_number_id = "109876543210"

[llm]
api_key = "${GROQ_KEY}"
temperature = 0.4
"#,
        );
        let vars: HashMap<String, String> = [("META_TOKEN", "EAAG-from-env"), ("GROQ_KEY", "gsk-from-env")]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        let config = load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }, &vars)
            .expect("config loads");

        assert_eq!(config.whatsapp.access_token.expose_secret(), "EAAG-from-env");
        assert_eq!(
            config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("gsk-from-env".to_string())
        );
        assert!((config.llm.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_and_unterminated_placeholders_are_reported() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(&dir, "[whatsapp]\naccess_token = \"${UNSET_TOKEN}\"\n");
        let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
        let error = load(options, &HashMap::new());
        assert!(matches!(
            error,
            Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "UNSET_TOKEN"
        ));

        let path = write_file(&dir, "[whatsapp]\naccess_token = \"${UNSET_TOKEN\"\n");
        let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
        let error = load(options, &HashMap::new());
        assert!(matches!(error, Err(ConfigError::UnterminatedInterpolation)));
    }

    #[test]
    fn required_file_must_exist() {
        let options = LoadOptions { require_file: true, ..no_file() };
        assert!(matches!(load(options, &env_with(&[])), Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn short_logging_aliases_are_accepted() {
        let vars = env_with(&[("DECKBOT_LOG_LEVEL", "warn"), ("DECKBOT_LOG_FORMAT", "pretty")]);
        let config = load(no_file(), &vars).expect("config loads");

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_beat_env_which_beats_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(
            &dir,
            r#"
[database]
url = "sqlite://from-file.db"

[flows]
utc_offset_hours = -6

[reminders]
send_spacing_ms = 500

[logging]
level = "warn"
"#,
        );
        let vars = env_with(&[
            ("DECKBOT_DATABASE_URL", "sqlite://from-env.db"),
            ("DECKBOT_FLOWS_UTC_OFFSET_HOURS", "-3"),
        ]);
        let options = LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };

        let config = load(options, &vars).expect("config loads");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.flows.utc_offset_hours, -3);
        assert_eq!(config.reminders.send_spacing_ms, 500);
    }

    #[test]
    fn validation_lists_every_problem() {
        let mut vars = env_with(&[("DECKBOT_WHATSAPP_PHONE_NUMBER_ID", "+57 300 111")]);
        vars.remove("DECKBOT_LLM_API_KEY");

        let Err(ConfigError::Validation(message)) = load(no_file(), &vars) else {
            panic!("expected a validation failure");
        };
        assert!(message.contains("whatsapp.phone_number_id must contain digits only"));
        assert!(message.contains("llm.api_key is required for the groq provider"));
    }

    #[test]
    fn ollama_runs_without_an_api_key() {
        let mut vars = env_with(&[("DECKBOT_LLM_PROVIDER", "Ollama")]);
        vars.remove("DECKBOT_LLM_API_KEY");

        let config = load(no_file(), &vars).expect("config loads");
        assert_eq!(config.llm.effective_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn unparsable_env_value_names_the_variable() {
        let vars = env_with(&[("DECKBOT_REMINDERS_SEND_SPACING_MS", "two seconds")]);

        let error = load(no_file(), &vars);
        assert!(matches!(
            error,
            Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "DECKBOT_REMINDERS_SEND_SPACING_MS"
        ));
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let vars = env_with(&[("DECKBOT_WHATSAPP_ACCESS_TOKEN", "EAAG-secret-value")]);
        let config = load(no_file(), &vars).expect("config loads");
        let debug = format!("{config:?}");

        assert!(!debug.contains("EAAG-secret-value"));
        assert!(!debug.contains("gsk-test-key"));
    }
}
