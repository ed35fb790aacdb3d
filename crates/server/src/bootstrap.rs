use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use leadrelay_agent::{ConversationAgent, OpenAiClient};
use leadrelay_core::config::{AppConfig, ConfigError, LoadOptions, ServerConfig};
use leadrelay_core::{FileTokenStore, LeadPolicy, TokenHolder};
use leadrelay_listings::ApifyListingClient;
use leadrelay_telegram::TelegramBotClient;
use reqwest::Client;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::crm::{CrmApi, CrmSync, KommoClient};
use crate::health::{self, HealthState};
use crate::oauth::{self, OAuthSettings, OAuthState};
use crate::relay::{self, ConversationRelay, ListingMode};

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("page templates failed to compile: {0}")]
    Templates(#[source] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Shared client for every upstream. Calls wait indefinitely unless a timeout is configured.
pub fn http_client(server: &ServerConfig) -> Result<Client, BootstrapError> {
    let mut builder = Client::builder();
    if let Some(secs) = server.upstream_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(BootstrapError::HttpClient)
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let client = http_client(&config.server)?;

    let tokens = TokenHolder::new(Arc::new(FileTokenStore::new(config.crm.token_path.clone())));
    let crm_connected = tokens.get().await.is_some();

    let crm: Option<Arc<dyn CrmApi>> = match (
        config.crm.client_id.as_deref(),
        config.crm.client_secret.as_ref(),
        config.crm.api_base_url(),
    ) {
        (Some(client_id), Some(client_secret), Some(base_url)) if config.crm.is_configured() => {
            Some(Arc::new(KommoClient::new(
                client.clone(),
                base_url,
                client_id,
                client_secret.clone(),
            )))
        }
        _ => None,
    };

    let listings = match config.listings.api_token.as_ref() {
        Some(api_token) if config.listings.is_enabled() => Some(ListingMode {
            search: Arc::new(ApifyListingClient::new(
                client.clone(),
                config.listings.base_url.clone(),
                config.listings.actor_id.clone(),
                api_token.clone(),
            )),
            default_area_code: config.listings.default_area_code.clone(),
            default_max_price: config.listings.default_max_price,
            max_results: config.listings.max_results,
            placeholder_image_url: config.listings.placeholder_image_url.clone(),
        }),
        _ => None,
    };

    let agent = ConversationAgent::new(Arc::new(OpenAiClient::new(
        client.clone(),
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
    )));
    let chat = Arc::new(TelegramBotClient::new(
        client,
        config.telegram.api_base_url.clone(),
        config.telegram.bot_token.clone(),
    ));

    let relay = ConversationRelay::new(
        agent,
        chat,
        listings,
        CrmSync::new(crm.clone(), tokens.clone(), config.crm.pipeline_id, config.crm.status_id),
        LeadPolicy::keywords(&config.crm.lead_keywords),
    );
    let listing_mode = relay.listing_mode();

    let templates = oauth::templates().map_err(BootstrapError::Templates)?;
    let oauth_state =
        OAuthState::new(crm.clone(), tokens.clone(), OAuthSettings::from(&config.crm), templates);

    let router = Router::new()
        .merge(health::router(HealthState { tokens: tokens.clone(), listing_mode }))
        .merge(oauth::router(oauth_state))
        .merge(relay::router(relay))
        .layer(TraceLayer::new_for_http());

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        crm_configured = crm.is_some(),
        crm_connected,
        listing_mode,
        llm_configured = config.llm.api_key.is_some(),
        "application bootstrap complete"
    );

    Ok(Application { config, router })
}
