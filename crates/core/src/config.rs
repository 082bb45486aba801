use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub credentials: CredentialsConfig,
    pub conversation: ConversationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

/// Where the LLM API key is looked up, in priority order: the environment
/// variable named by `api_key_env`, then the parameter store, then the
/// secrets vault.
#[derive(Clone, Debug)]
pub struct CredentialsConfig {
    pub api_key_env: String,
    pub parameter_name: Option<String>,
    pub secret_id: Option<String>,
    pub region: String,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub history_turns: usize,
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
    pub log_level: Option<String>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub server_port: Option<u16>,
    pub history_turns: Option<usize>,
    pub parameter_name: Option<String>,
    pub secret_id: Option<String>,
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
            llm: LlmConfig {
                model: DEFAULT_MODEL.to_string(),
                max_tokens: DEFAULT_MAX_TOKENS,
                base_url: DEFAULT_BASE_URL.to_string(),
                api_version: DEFAULT_API_VERSION.to_string(),
                timeout_secs: 30,
            },
            credentials: CredentialsConfig {
                api_key_env: DEFAULT_API_KEY_ENV.to_string(),
                parameter_name: None,
                secret_id: None,
                region: "ap-northeast-1".to_string(),
            },
            conversation: ConversationConfig { history_turns: 6 },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 3000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("naturetalk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(api_version) = llm.api_version {
                self.llm.api_version = api_version;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(credentials) = patch.credentials {
            if let Some(api_key_env) = credentials.api_key_env {
                self.credentials.api_key_env = api_key_env;
            }
            if let Some(parameter_name) = credentials.parameter_name {
                self.credentials.parameter_name = Some(parameter_name);
            }
            if let Some(secret_id) = credentials.secret_id {
                self.credentials.secret_id = Some(secret_id);
            }
            if let Some(region) = credentials.region {
                self.credentials.region = region;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(history_turns) = conversation.history_turns {
                self.conversation.history_turns = history_turns;
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
        if let Some(value) = read_env("NATURETALK_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("NATURETALK_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("NATURETALK_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("NATURETALK_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("NATURETALK_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("NATURETALK_LLM_TIMEOUT_SECS", &value)?;
        }

        // The credential locations keep the names the deployment templates already export.
        if let Some(value) = read_env("ANTHROPIC_API_KEY_PARAM") {
            self.credentials.parameter_name = Some(value);
        }
        if let Some(value) = read_env("ANTHROPIC_SECRET_ID") {
            self.credentials.secret_id = Some(value);
        }
        let region = read_env("AWS_REGION").or_else(|| read_env("AWS_DEFAULT_REGION"));
        if let Some(value) = region {
            self.credentials.region = value;
        }

        if let Some(value) = read_env("NATURETALK_CONVERSATION_HISTORY_TURNS") {
            self.conversation.history_turns =
                parse_usize("NATURETALK_CONVERSATION_HISTORY_TURNS", &value)?;
        }

        if let Some(value) = read_env("NATURETALK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("NATURETALK_SERVER_PORT") {
            self.server.port = parse_u16("NATURETALK_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("NATURETALK_LOGGING_LEVEL").or_else(|| read_env("NATURETALK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("NATURETALK_LOGGING_FORMAT").or_else(|| read_env("NATURETALK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(history_turns) = overrides.history_turns {
            self.conversation.history_turns = history_turns;
        }
        if let Some(parameter_name) = overrides.parameter_name {
            self.credentials.parameter_name = Some(parameter_name);
        }
        if let Some(secret_id) = overrides.secret_id {
            self.credentials.secret_id = Some(secret_id);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_credentials(&self.credentials)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("naturetalk.toml"), PathBuf::from("config/naturetalk.toml")]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_credentials(credentials: &CredentialsConfig) -> Result<(), ConfigError> {
    if credentials.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "credentials.api_key_env must name an environment variable".to_string(),
        ));
    }

    let uses_remote_store =
        credentials.parameter_name.is_some() || credentials.secret_id.is_some();
    if uses_remote_store && credentials.region.trim().is_empty() {
        return Err(ConfigError::Validation(
            "credentials.region is required when a parameter name or secret id is configured"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    credentials: Option<CredentialsPatch>,
    conversation: Option<ConversationPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    model: Option<String>,
    max_tokens: Option<u32>,
    base_url: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsPatch {
    api_key_env: Option<String>,
    parameter_name: Option<String>,
    secret_id: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    history_turns: Option<usize>,
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
