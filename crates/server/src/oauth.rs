//! CRM authorization: `GET /auth` links the operator to the provider's consent
//! screen, `GET /oauth` receives the one-time code and trades it for a token.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use leadrelay_core::{config::CrmConfig, RelayError, TokenHolder};
use reqwest::Url;
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::crm::CrmApi;

/// The subset of CRM configuration the authorization flow needs.
#[derive(Clone, Debug, Default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub authorize_url: String,
    pub callback_base_url: Option<String>,
}

impl From<&CrmConfig> for OAuthSettings {
    fn from(config: &CrmConfig) -> Self {
        Self {
            client_id: config.client_id.clone().filter(|value| !value.trim().is_empty()),
            authorize_url: config.authorize_url.clone(),
            callback_base_url: config.callback_base_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct OAuthState {
    crm: Option<Arc<dyn CrmApi>>,
    tokens: TokenHolder,
    settings: Arc<OAuthSettings>,
    templates: Arc<Tera>,
}

impl OAuthState {
    pub fn new(
        crm: Option<Arc<dyn CrmApi>>,
        tokens: TokenHolder,
        settings: OAuthSettings,
        templates: Arc<Tera>,
    ) -> Self {
        Self { crm, tokens, settings: Arc::new(settings), templates }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Pages are compiled into the binary.
pub fn templates() -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../../templates/oauth/base.html")),
        ("connect.html", include_str!("../../../templates/oauth/connect.html")),
        ("not_configured.html", include_str!("../../../templates/oauth/not_configured.html")),
        ("connected.html", include_str!("../../../templates/oauth/connected.html")),
        ("failed.html", include_str!("../../../templates/oauth/failed.html")),
    ])?;
    Ok(Arc::new(tera))
}

pub fn router(state: OAuthState) -> Router {
    Router::new().route("/auth", get(start)).route("/oauth", get(callback)).with_state(state)
}

/// `{authorize_url}?client_id=..&state=..&mode=post_message&redirect_uri=..`
pub fn authorization_url(
    authorize_url: &str,
    client_id: &str,
    redirect_uri: &str,
    nonce: &str,
) -> Result<String, String> {
    Url::parse_with_params(
        authorize_url,
        &[
            ("client_id", client_id),
            ("state", nonce),
            ("mode", "post_message"),
            ("redirect_uri", redirect_uri),
        ],
    )
    .map(String::from)
    .map_err(|error| format!("invalid crm.authorize_url `{authorize_url}`: {error}"))
}

/// Callback URL registered with the provider. Both `/auth` and `/oauth` must
/// derive the same value or the exchange is rejected.
pub fn redirect_uri(callback_base_url: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(base) = callback_base_url.map(str::trim).filter(|value| !value.is_empty()) {
        return Some(format!("{}/oauth", base.trim_end_matches('/')));
    }
    let host = headers.get(header::HOST)?.to_str().ok()?.trim();
    (!host.is_empty()).then(|| format!("https://{host}/oauth"))
}

pub async fn start(State(state): State<OAuthState>, headers: HeaderMap) -> Response {
    let Some(client_id) = state.settings.client_id.as_deref().filter(|_| state.crm.is_some())
    else {
        return not_configured_page(&state.templates);
    };
    let Some(redirect_uri) = redirect_uri(state.settings.callback_base_url.as_deref(), &headers)
    else {
        return (StatusCode::BAD_REQUEST, "Host header is required to build the callback URL.")
            .into_response();
    };

    let nonce = Uuid::new_v4().to_string();
    let authorize_url = &state.settings.authorize_url;
    let url = match authorization_url(authorize_url, client_id, &redirect_uri, &nonce) {
        Ok(url) => url,
        Err(message) => {
            error!(
                event_name = "crm.oauth.authorize_url_invalid",
                error = %message,
                "cannot build authorization url"
            );
            let body = RelayError::Configuration(message).user_message();
            return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        }
    };

    info!(
        event_name = "crm.oauth.started",
        redirect_uri = %redirect_uri,
        "authorization link issued"
    );
    let mut context = Context::new();
    context.insert("authorization_url", &url);
    context.insert("redirect_uri", &redirect_uri);
    render(&state.templates, StatusCode::OK, "connect.html", &context)
}

pub async fn callback(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let redirect_uri = redirect_uri(state.settings.callback_base_url.as_deref(), &headers);
    let Some(code) = params.code.as_deref().map(str::trim).filter(|code| !code.is_empty()) else {
        warn!(
            event_name = "crm.oauth.missing_code",
            provider_error = params.error.as_deref().unwrap_or("none"),
            "oauth callback without authorization code"
        );
        if let Some(provider_error) = params.error.as_deref() {
            return failure_page(
                &state.templates,
                StatusCode::BAD_REQUEST,
                &format!(
                    "{} The provider reported: {provider_error}",
                    RelayError::MissingCode.user_message()
                ),
                redirect_uri.as_deref(),
            );
        }
        return (StatusCode::BAD_REQUEST, RelayError::MissingCode.user_message()).into_response();
    };

    let Some(crm) = state.crm.as_ref() else {
        return not_configured_page(&state.templates);
    };
    let Some(redirect_uri) = redirect_uri else {
        return (StatusCode::BAD_REQUEST, "Host header is required to build the callback URL.")
            .into_response();
    };

    match crm.exchange_code(code, &redirect_uri).await {
        Ok(token) => {
            if let Err(error) = state.tokens.set(token).await {
                // The token is live in memory; only persistence across restarts is lost.
                error!(
                    event_name = "crm.token.persist_failed",
                    error = %error,
                    "crm token not persisted"
                );
            }
            info!(event_name = "crm.oauth.connected", "crm authorization completed");
            render(&state.templates, StatusCode::OK, "connected.html", &Context::new())
        }
        Err(error) => {
            warn!(
                event_name = "crm.oauth.exchange_failed",
                error = %error,
                "crm token exchange failed"
            );
            // The diagnostic page is the answer to the browser, so it is served as 200.
            failure_page(
                &state.templates,
                StatusCode::OK,
                &format!("The CRM rejected the authorization code: {error}"),
                Some(&redirect_uri),
            )
        }
    }
}

fn not_configured_page(templates: &Tera) -> Response {
    render(templates, StatusCode::SERVICE_UNAVAILABLE, "not_configured.html", &Context::new())
}

fn failure_page(
    templates: &Tera,
    status: StatusCode,
    reason: &str,
    redirect_uri: Option<&str>,
) -> Response {
    let mut context = Context::new();
    context.insert("reason", reason);
    context.insert("redirect_uri", redirect_uri.unwrap_or("https://<your-host>/oauth"));
    render(templates, status, "failed.html", &context)
}

fn render(templates: &Tera, status: StatusCode, name: &str, context: &Context) -> Response {
    match templates.render(name, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(error) => {
            error!(
                event_name = "system.template.error",
                template = name,
                error = ?error,
                "template render failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Error</h1>".to_string()))
                .into_response()
        }
    }
}
