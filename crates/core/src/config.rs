use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qualification::DEFAULT_LEAD_KEYWORDS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub crm: CrmConfig,
    pub listings: ListingsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub subdomain: Option<String>,
    pub base_url: Option<String>,
    pub authorize_url: String,
    pub callback_base_url: Option<String>,
    /// Lead pipeline and stage. Unset leaves the choice to the CRM's main pipeline.
    pub pipeline_id: Option<u64>,
    pub status_id: Option<u64>,
    pub lead_keywords: Vec<String>,
    pub token_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ListingsConfig {
    pub api_token: Option<SecretString>,
    pub base_url: String,
    pub actor_id: String,
    pub default_area_code: String,
    pub default_max_price: u64,
    pub max_results: usize,
    pub placeholder_image_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub upstream_timeout_secs: Option<u64>,
    pub graceful_shutdown_secs: u64,
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
    pub telegram_bot_token: Option<String>,
    pub telegram_api_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub crm_client_id: Option<String>,
    pub crm_client_secret: Option<String>,
    pub crm_subdomain: Option<String>,
    pub crm_base_url: Option<String>,
    pub crm_token_path: Option<PathBuf>,
    pub listings_api_token: Option<String>,
    pub listings_base_url: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
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
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
            },
            crm: CrmConfig {
                client_id: None,
                client_secret: None,
                subdomain: None,
                base_url: None,
                authorize_url: "https://www.kommo.com/oauth".to_string(),
                callback_base_url: None,
                pipeline_id: None,
                status_id: None,
                lead_keywords: DEFAULT_LEAD_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
                token_path: PathBuf::from("kommo_token.json"),
            },
            listings: ListingsConfig {
                api_token: None,
                base_url: "https://api.apify.com/v2".to_string(),
                actor_id: "maxcopell~zillow-zip-search".to_string(),
                default_area_code: "33101".to_string(),
                default_max_price: 500_000,
                max_results: 2,
                placeholder_image_url: "https://placehold.co/600x400?text=No+Image".to_string(),
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                upstream_timeout_secs: None,
                graceful_shutdown_secs: 15,
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

impl CrmConfig {
    /// `https://{subdomain}.kommo.com` unless `base_url` overrides it.
    pub fn api_base_url(&self) -> Option<String> {
        if let Some(base_url) = self.base_url.as_deref().filter(|value| !value.trim().is_empty()) {
            return Some(base_url.trim_end_matches('/').to_string());
        }
        self.subdomain
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|subdomain| format!("https://{subdomain}.kommo.com"))
    }

    /// Client id, secret and an API base are all needed for the OAuth grant.
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|value| !value.trim().is_empty())
            && self.client_secret.as_ref().is_some_and(|value| !value.expose_secret().is_empty())
            && self.api_base_url().is_some()
    }
}

impl ListingsConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_token.as_ref().is_some_and(|value| !value.expose_secret().trim().is_empty())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(client_id) = crm.client_id {
                self.crm.client_id = Some(client_id);
            }
            if let Some(client_secret) = crm.client_secret {
                self.crm.client_secret = Some(secret_value(client_secret));
            }
            if let Some(subdomain) = crm.subdomain {
                self.crm.subdomain = Some(subdomain);
            }
            if let Some(base_url) = crm.base_url {
                self.crm.base_url = Some(base_url);
            }
            if let Some(authorize_url) = crm.authorize_url {
                self.crm.authorize_url = authorize_url;
            }
            if let Some(callback_base_url) = crm.callback_base_url {
                self.crm.callback_base_url = Some(callback_base_url);
            }
            if let Some(pipeline_id) = crm.pipeline_id {
                self.crm.pipeline_id = Some(pipeline_id);
            }
            if let Some(status_id) = crm.status_id {
                self.crm.status_id = Some(status_id);
            }
            if let Some(lead_keywords) = crm.lead_keywords {
                self.crm.lead_keywords = lead_keywords;
            }
            if let Some(token_path) = crm.token_path {
                self.crm.token_path = token_path;
            }
        }

        if let Some(listings) = patch.listings {
            if let Some(api_token) = listings.api_token {
                self.listings.api_token = Some(secret_value(api_token));
            }
            if let Some(base_url) = listings.base_url {
                self.listings.base_url = base_url;
            }
            if let Some(actor_id) = listings.actor_id {
                self.listings.actor_id = actor_id;
            }
            if let Some(default_area_code) = listings.default_area_code {
                self.listings.default_area_code = default_area_code;
            }
            if let Some(default_max_price) = listings.default_max_price {
                self.listings.default_max_price = default_max_price;
            }
            if let Some(max_results) = listings.max_results {
                self.listings.max_results = max_results;
            }
            if let Some(placeholder_image_url) = listings.placeholder_image_url {
                self.listings.placeholder_image_url = placeholder_image_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(upstream_timeout_secs) = server.upstream_timeout_secs {
                self.server.upstream_timeout_secs = Some(upstream_timeout_secs);
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        let bot_token =
            read_env("LEADRELAY_TELEGRAM_BOT_TOKEN").or_else(|| read_env("TELEGRAM_BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("LEADRELAY_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }

        let llm_api_key = read_env("LEADRELAY_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = llm_api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADRELAY_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("LEADRELAY_LLM_MODEL") {
            self.llm.model = value;
        }

        let client_id = read_env("LEADRELAY_CRM_CLIENT_ID").or_else(|| read_env("KOMMO_CLIENT_ID"));
        if let Some(value) = client_id {
            self.crm.client_id = Some(value);
        }
        let client_secret =
            read_env("LEADRELAY_CRM_CLIENT_SECRET").or_else(|| read_env("KOMMO_CLIENT_SECRET"));
        if let Some(value) = client_secret {
            self.crm.client_secret = Some(secret_value(value));
        }
        let subdomain = read_env("LEADRELAY_CRM_SUBDOMAIN").or_else(|| read_env("KOMMO_SUBDOMAIN"));
        if let Some(value) = subdomain {
            self.crm.subdomain = Some(value);
        }
        if let Some(value) = read_env("LEADRELAY_CRM_BASE_URL") {
            self.crm.base_url = Some(value);
        }
        if let Some(value) = read_env("LEADRELAY_CRM_AUTHORIZE_URL") {
            self.crm.authorize_url = value;
        }
        if let Some(value) = read_env("LEADRELAY_CRM_CALLBACK_BASE_URL") {
            self.crm.callback_base_url = Some(value);
        }
        if let Some(value) = read_env("LEADRELAY_CRM_PIPELINE_ID") {
            self.crm.pipeline_id = Some(parse_u64("LEADRELAY_CRM_PIPELINE_ID", &value)?);
        }
        if let Some(value) = read_env("LEADRELAY_CRM_STATUS_ID") {
            self.crm.status_id = Some(parse_u64("LEADRELAY_CRM_STATUS_ID", &value)?);
        }
        if let Some(value) = read_env("LEADRELAY_CRM_LEAD_KEYWORDS") {
            self.crm.lead_keywords = split_list(&value);
        }
        if let Some(value) = read_env("LEADRELAY_CRM_TOKEN_PATH") {
            self.crm.token_path = PathBuf::from(value);
        }

        let listings_token =
            read_env("LEADRELAY_LISTINGS_API_TOKEN").or_else(|| read_env("APIFY_API_TOKEN"));
        if let Some(value) = listings_token {
            self.listings.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADRELAY_LISTINGS_BASE_URL") {
            self.listings.base_url = value;
        }
        if let Some(value) = read_env("LEADRELAY_LISTINGS_ACTOR_ID") {
            self.listings.actor_id = value;
        }
        if let Some(value) = read_env("LEADRELAY_LISTINGS_DEFAULT_AREA_CODE") {
            self.listings.default_area_code = value;
        }
        if let Some(value) = read_env("LEADRELAY_LISTINGS_DEFAULT_MAX_PRICE") {
            self.listings.default_max_price =
                parse_u64("LEADRELAY_LISTINGS_DEFAULT_MAX_PRICE", &value)?;
        }
        if let Some(value) = read_env("LEADRELAY_LISTINGS_MAX_RESULTS") {
            self.listings.max_results = parse_usize("LEADRELAY_LISTINGS_MAX_RESULTS", &value)?;
        }
        if let Some(value) = read_env("LEADRELAY_LISTINGS_PLACEHOLDER_IMAGE_URL") {
            self.listings.placeholder_image_url = value;
        }

        if let Some(value) = read_env("LEADRELAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LEADRELAY_SERVER_PORT") {
            self.server.port = parse_u16("LEADRELAY_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }
        if let Some(value) = read_env("LEADRELAY_SERVER_UPSTREAM_TIMEOUT_SECS") {
            self.server.upstream_timeout_secs =
                Some(parse_u64("LEADRELAY_SERVER_UPSTREAM_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = read_env("LEADRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LEADRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("LEADRELAY_LOGGING_LEVEL").or_else(|| read_env("LEADRELAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEADRELAY_LOGGING_FORMAT").or_else(|| read_env("LEADRELAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(api_base_url) = overrides.telegram_api_base_url {
            self.telegram.api_base_url = api_base_url;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(client_id) = overrides.crm_client_id {
            self.crm.client_id = Some(client_id);
        }
        if let Some(client_secret) = overrides.crm_client_secret {
            self.crm.client_secret = Some(secret_value(client_secret));
        }
        if let Some(subdomain) = overrides.crm_subdomain {
            self.crm.subdomain = Some(subdomain);
        }
        if let Some(base_url) = overrides.crm_base_url {
            self.crm.base_url = Some(base_url);
        }
        if let Some(token_path) = overrides.crm_token_path {
            self.crm.token_path = token_path;
        }
        if let Some(api_token) = overrides.listings_api_token {
            self.listings.api_token = Some(secret_value(api_token));
        }
        if let Some(base_url) = overrides.listings_base_url {
            self.listings.base_url = base_url;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_llm(&self.llm)?;
        validate_crm(&self.crm)?;
        validate_listings(&self.listings)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leadrelay.toml"), PathBuf::from("config/leadrelay.toml")]
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

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Get it from @BotFather on Telegram".to_string(),
        ));
    }
    if !bot_token.contains(':') {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }
    require_http_url("telegram.api_base_url", &telegram.api_base_url)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    require_http_url("llm.base_url", &llm.base_url)?;
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    Ok(())
}

fn validate_crm(crm: &CrmConfig) -> Result<(), ConfigError> {
    if crm.client_id.is_some() && crm.client_secret.is_none() {
        return Err(ConfigError::Validation(
            "crm.client_id is set but crm.client_secret is missing".to_string(),
        ));
    }
    if crm.client_id.is_some() && crm.api_base_url().is_none() {
        return Err(ConfigError::Validation(
            "crm.client_id is set but neither crm.subdomain nor crm.base_url is configured"
                .to_string(),
        ));
    }
    if let Some(base_url) = &crm.base_url {
        require_http_url("crm.base_url", base_url)?;
    }
    if let Some(base_url) = &crm.callback_base_url {
        require_http_url("crm.callback_base_url", base_url)?;
    }
    require_http_url("crm.authorize_url", &crm.authorize_url)?;
    for (key, value) in [("crm.pipeline_id", crm.pipeline_id), ("crm.status_id", crm.status_id)] {
        if value == Some(0) {
            return Err(ConfigError::Validation(format!(
                "{key} must be a real CRM id; leave it unset to use the main pipeline"
            )));
        }
    }
    if crm.token_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("crm.token_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_listings(listings: &ListingsConfig) -> Result<(), ConfigError> {
    require_http_url("listings.base_url", &listings.base_url)?;
    if listings.max_results == 0 || listings.max_results > 10 {
        return Err(ConfigError::Validation(
            "listings.max_results must be in range 1..=10".to_string(),
        ));
    }
    if listings.default_area_code.trim().is_empty() {
        return Err(ConfigError::Validation(
            "listings.default_area_code must not be empty".to_string(),
        ));
    }
    if listings.is_enabled() && listings.actor_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "listings.actor_id is required when listings.api_token is set".to_string(),
        ));
    }
    require_http_url("listings.placeholder_image_url", &listings.placeholder_image_url)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.upstream_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "server.upstream_timeout_secs must be greater than zero when set".to_string(),
        ));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
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

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
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

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    llm: Option<LlmPatch>,
    crm: Option<CrmPatch>,
    listings: Option<ListingsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    subdomain: Option<String>,
    base_url: Option<String>,
    authorize_url: Option<String>,
    callback_base_url: Option<String>,
    pipeline_id: Option<u64>,
    status_id: Option<u64>,
    lead_keywords: Option<Vec<String>>,
    token_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingsPatch {
    api_token: Option<String>,
    base_url: Option<String>,
    actor_id: Option<String>,
    default_area_code: Option<String>,
    default_max_price: Option<u64>,
    max_results: Option<usize>,
    placeholder_image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    upstream_timeout_secs: Option<u64>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
