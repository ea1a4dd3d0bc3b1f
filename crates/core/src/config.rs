use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub webex: WebexConfig,
    pub hec: HecConfig,
    pub knowledge: KnowledgeConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct WebexConfig {
    pub access_token: SecretString,
    pub bot_email: String,
    pub callback_url: String,
    pub webhook_name: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct HecConfig {
    pub url: String,
    pub token: SecretString,
    pub sourcetype: String,
    pub index: String,
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
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
    pub webex_access_token: Option<String>,
    pub webex_bot_email: Option<String>,
    pub webex_callback_url: Option<String>,
    pub hec_url: Option<String>,
    pub hec_token: Option<String>,
    pub knowledge_path: Option<PathBuf>,
    pub log_level: Option<String>,
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
            webex: WebexConfig {
                access_token: String::new().into(),
                bot_email: String::new(),
                callback_url: String::new(),
                webhook_name: "Agriculture Webex Webhook".to_string(),
                api_base_url: "https://webexapis.com/v1".to_string(),
                timeout_secs: 5,
            },
            hec: HecConfig {
                url: String::new(),
                token: String::new().into(),
                sourcetype: "Agricultural_Bot_Data".to_string(),
                index: "agriculture".to_string(),
                accept_invalid_certs: false,
                timeout_secs: 5,
            },
            knowledge: KnowledgeConfig { path: PathBuf::from("crops.json") },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 5000 },
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("harvestbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(webex) = patch.webex {
            if let Some(access_token_value) = webex.access_token {
                self.webex.access_token = secret_value(access_token_value);
            }
            if let Some(bot_email) = webex.bot_email {
                self.webex.bot_email = bot_email;
            }
            if let Some(callback_url) = webex.callback_url {
                self.webex.callback_url = callback_url;
            }
            if let Some(webhook_name) = webex.webhook_name {
                self.webex.webhook_name = webhook_name;
            }
            if let Some(api_base_url) = webex.api_base_url {
                self.webex.api_base_url = api_base_url;
            }
            if let Some(timeout_secs) = webex.timeout_secs {
                self.webex.timeout_secs = timeout_secs;
            }
        }

        if let Some(hec) = patch.hec {
            if let Some(url) = hec.url {
                self.hec.url = url;
            }
            if let Some(token_value) = hec.token {
                self.hec.token = secret_value(token_value);
            }
            if let Some(sourcetype) = hec.sourcetype {
                self.hec.sourcetype = sourcetype;
            }
            if let Some(index) = hec.index {
                self.hec.index = index;
            }
            if let Some(accept_invalid_certs) = hec.accept_invalid_certs {
                self.hec.accept_invalid_certs = accept_invalid_certs;
            }
            if let Some(timeout_secs) = hec.timeout_secs {
                self.hec.timeout_secs = timeout_secs;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(path) = knowledge.path {
                self.knowledge.path = path;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
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
        if let Some(value) = read_env("HARVESTBOT_WEBEX_ACCESS_TOKEN") {
            self.webex.access_token = secret_value(value);
        }
        if let Some(value) = read_env("HARVESTBOT_WEBEX_BOT_EMAIL") {
            self.webex.bot_email = value;
        }
        if let Some(value) = read_env("HARVESTBOT_WEBEX_CALLBACK_URL") {
            self.webex.callback_url = value;
        }
        if let Some(value) = read_env("HARVESTBOT_WEBEX_WEBHOOK_NAME") {
            self.webex.webhook_name = value;
        }
        if let Some(value) = read_env("HARVESTBOT_WEBEX_API_BASE_URL") {
            self.webex.api_base_url = value;
        }
        if let Some(value) = read_env("HARVESTBOT_WEBEX_TIMEOUT_SECS") {
            self.webex.timeout_secs = parse_u64("HARVESTBOT_WEBEX_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HARVESTBOT_HEC_URL") {
            self.hec.url = value;
        }
        if let Some(value) = read_env("HARVESTBOT_HEC_TOKEN") {
            self.hec.token = secret_value(value);
        }
        if let Some(value) = read_env("HARVESTBOT_HEC_SOURCETYPE") {
            self.hec.sourcetype = value;
        }
        if let Some(value) = read_env("HARVESTBOT_HEC_INDEX") {
            self.hec.index = value;
        }
        if let Some(value) = read_env("HARVESTBOT_HEC_ACCEPT_INVALID_CERTS") {
            self.hec.accept_invalid_certs =
                parse_bool("HARVESTBOT_HEC_ACCEPT_INVALID_CERTS", &value)?;
        }
        if let Some(value) = read_env("HARVESTBOT_HEC_TIMEOUT_SECS") {
            self.hec.timeout_secs = parse_u64("HARVESTBOT_HEC_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HARVESTBOT_KNOWLEDGE_PATH") {
            self.knowledge.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("HARVESTBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HARVESTBOT_SERVER_PORT") {
            self.server.port = parse_u16("HARVESTBOT_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("HARVESTBOT_LOGGING_LEVEL").or_else(|| read_env("HARVESTBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HARVESTBOT_LOGGING_FORMAT").or_else(|| read_env("HARVESTBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(access_token) = overrides.webex_access_token {
            self.webex.access_token = secret_value(access_token);
        }
        if let Some(bot_email) = overrides.webex_bot_email {
            self.webex.bot_email = bot_email;
        }
        if let Some(callback_url) = overrides.webex_callback_url {
            self.webex.callback_url = callback_url;
        }
        if let Some(url) = overrides.hec_url {
            self.hec.url = url;
        }
        if let Some(token) = overrides.hec_token {
            self.hec.token = secret_value(token);
        }
        if let Some(path) = overrides.knowledge_path {
            self.knowledge.path = path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_webex(&self.webex)?;
        validate_hec(&self.hec)?;
        validate_knowledge(&self.knowledge)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("harvestbot.toml"), PathBuf::from("config/harvestbot.toml")]
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

fn validate_webex(webex: &WebexConfig) -> Result<(), ConfigError> {
    if webex.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "webex.access_token is required. Create a bot at https://developer.webex.com/my-apps and use its access token".to_string()
        ));
    }

    let bot_email = webex.bot_email.trim();
    if bot_email.is_empty() {
        return Err(ConfigError::Validation(
            "webex.bot_email is required (the bot's own address, used to break reply loops)"
                .to_string(),
        ));
    }
    if !bot_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "webex.bot_email `{bot_email}` does not look like an email address"
        )));
    }

    if !is_http_url(&webex.callback_url) {
        return Err(ConfigError::Validation(
            "webex.callback_url is required and must start with http:// or https:// (the public URL Webex delivers events to)".to_string()
        ));
    }

    if !is_http_url(&webex.api_base_url) {
        return Err(ConfigError::Validation(
            "webex.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    validate_timeout("webex.timeout_secs", webex.timeout_secs)
}

fn validate_hec(hec: &HecConfig) -> Result<(), ConfigError> {
    if !is_http_url(&hec.url) {
        return Err(ConfigError::Validation(
            "hec.url is required and must start with http:// or https://".to_string(),
        ));
    }

    if hec.token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "hec.token is required (the HEC token for the indexing endpoint)".to_string(),
        ));
    }

    if hec.sourcetype.trim().is_empty() || hec.index.trim().is_empty() {
        return Err(ConfigError::Validation(
            "hec.sourcetype and hec.index must be non-empty".to_string(),
        ));
    }

    validate_timeout("hec.timeout_secs", hec.timeout_secs)
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("knowledge.path must be non-empty".to_string()));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must be non-empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    webex: Option<WebexPatch>,
    hec: Option<HecPatch>,
    knowledge: Option<KnowledgePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WebexPatch {
    access_token: Option<String>,
    bot_email: Option<String>,
    callback_url: Option<String>,
    webhook_name: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct HecPatch {
    url: Option<String>,
    token: Option<String>,
    sourcetype: Option<String>,
    index: Option<String>,
    accept_invalid_certs: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
