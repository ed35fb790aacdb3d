//! Kommo CRM client and the per-message CRM sync.
//!
//! Sync runs only while a token is held:
//! - upsert a contact keyed by the sender's Telegram id (stored as PHONE)
//! - append an interaction note to that contact
//! - create a lead when the lead policy qualifies the user's text
//!
//! Every failure is logged and absorbed. A `401` from any call invalidates the
//! token so the next message skips sync until `/auth` is completed again.

use std::sync::Arc;

use async_trait::async_trait;
use leadrelay_core::{
    ConversationOutcome, CrmContactId, CrmLeadId, InboundMessage, LeadPolicy, NewContact, NewLead,
    NewNote, RelayError, TokenHolder, Upstream, UpstreamError,
};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Exchanges a one-time authorization code for a bearer token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, RelayError>;
    async fn create_contact(
        &self,
        token: &str,
        contact: &NewContact,
    ) -> Result<CrmContactId, RelayError>;
    async fn add_note(&self, token: &str, note: &NewNote) -> Result<(), RelayError>;
    async fn create_lead(&self, token: &str, lead: &NewLead)
        -> Result<Option<CrmLeadId>, RelayError>;
}

#[derive(Clone)]
pub struct KommoClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
}

#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Embedded<T> {
    #[serde(rename = "_embedded")]
    embedded: T,
}

#[derive(Deserialize)]
struct EmbeddedContacts {
    contacts: Vec<EmbeddedId>,
}

#[derive(Deserialize)]
struct EmbeddedLeads {
    #[serde(default)]
    leads: Vec<EmbeddedId>,
}

#[derive(Deserialize)]
struct EmbeddedId {
    id: u64,
}

impl KommoClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, client_id: client_id.into(), client_secret }
    }

    async fn post_resource(
        &self,
        token: &str,
        resource: &str,
        body: Value,
    ) -> Result<Response, RelayError> {
        let response = self
            .client
            .post(format!("{}/api/v4/{resource}", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|error| UpstreamError::transport(Upstream::Crm, error))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RelayError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(Upstream::Crm, status.as_u16(), &body).into());
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    service: Upstream,
) -> Result<T, RelayError> {
    response.json::<T>().await.map_err(|error| UpstreamError::decode(service, error).into())
}

#[async_trait]
impl CrmApi for KommoClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, RelayError> {
        let response = self
            .client
            .post(format!("{}/oauth2/access_token", self.base_url))
            .json(&TokenExchangeRequest {
                client_id: &self.client_id,
                client_secret: self.client_secret.expose_secret(),
                grant_type: "authorization_code",
                code,
                redirect_uri,
            })
            .send()
            .await
            .map_err(|error| {
                error!(error = %error, "crm token exchange request failed");
                UpstreamError::transport(Upstream::OAuth, error)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(Upstream::OAuth, status.as_u16(), &body).into());
        }

        let token: OAuthTokenResponse = decode(response, Upstream::OAuth).await?;
        if token.access_token.is_empty() {
            let reason = "token endpoint returned empty access token";
            return Err(UpstreamError::decode(Upstream::OAuth, reason).into());
        }
        Ok(token.access_token)
    }

    async fn create_contact(
        &self,
        token: &str,
        contact: &NewContact,
    ) -> Result<CrmContactId, RelayError> {
        let body = json!([{
            "name": contact.name,
            "custom_fields_values": [{
                "field_code": "PHONE",
                "values": [{ "value": contact.phone }]
            }]
        }]);
        let response = self.post_resource(token, "contacts", body).await?;
        let payload: Embedded<EmbeddedContacts> = decode(response, Upstream::Crm).await?;

        payload
            .embedded
            .contacts
            .first()
            .map(|contact| CrmContactId(contact.id))
            .ok_or_else(|| {
                UpstreamError::decode(Upstream::Crm, "contact response had no contacts").into()
            })
    }

    async fn add_note(&self, token: &str, note: &NewNote) -> Result<(), RelayError> {
        let body = json!([{ "entity_id": note.contact_id.0, "note": note.text }]);
        self.post_resource(token, "events", body).await?;
        Ok(())
    }

    async fn create_lead(
        &self,
        token: &str,
        lead: &NewLead,
    ) -> Result<Option<CrmLeadId>, RelayError> {
        let mut body = json!({
            "name": lead.name,
            "_embedded": { "contacts": [{ "id": lead.contact_id.0 }] }
        });
        // Without ids the CRM files the lead under its main pipeline.
        if let Some(pipeline_id) = lead.pipeline_id {
            body["pipeline_id"] = json!(pipeline_id);
        }
        if let Some(status_id) = lead.status_id {
            body["status_id"] = json!(status_id);
        }
        let response = self.post_resource(token, "leads", json!([body])).await?;
        // The lead exists once the call succeeded; the id is informational.
        let lead_id = response
            .json::<Embedded<EmbeddedLeads>>()
            .await
            .ok()
            .and_then(|payload| payload.embedded.leads.first().map(|lead| CrmLeadId(lead.id)));
        Ok(lead_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CrmSyncOutcome {
    /// No CRM configured or no token held.
    Skipped,
    /// The CRM rejected the token; it has been cleared.
    TokenInvalidated,
    /// Contact creation failed, so nothing else was written.
    ContactFailed,
    Synced { contact_id: CrmContactId, note_added: bool, lead_created: bool },
}

#[derive(Clone)]
pub struct CrmSync {
    api: Option<Arc<dyn CrmApi>>,
    tokens: TokenHolder,
    pipeline_id: Option<u64>,
    status_id: Option<u64>,
}

impl CrmSync {
    pub fn new(
        api: Option<Arc<dyn CrmApi>>,
        tokens: TokenHolder,
        pipeline_id: Option<u64>,
        status_id: Option<u64>,
    ) -> Self {
        Self { api, tokens, pipeline_id, status_id }
    }

    pub async fn sync(
        &self,
        message: &InboundMessage,
        outcome: &ConversationOutcome,
        lead_policy: &LeadPolicy,
    ) -> CrmSyncOutcome {
        let Some(api) = &self.api else {
            return CrmSyncOutcome::Skipped;
        };
        let Some(token) = self.tokens.get().await else {
            info!(
                event_name = "crm.sync.skipped",
                "no crm token held; complete /auth to enable sync"
            );
            return CrmSyncOutcome::Skipped;
        };

        let contact =
            NewContact { name: message.sender_name.clone(), phone: message.sender_id.to_string() };
        let contact_id = match api.create_contact(&token, &contact).await {
            Ok(contact_id) => {
                info!(
                    event_name = "crm.sync.contact_created",
                    contact_id = contact_id.0,
                    "crm contact upserted"
                );
                contact_id
            }
            Err(error) if error.is_auth_expired() => return self.invalidate(&token).await,
            Err(error) => {
                warn!(
                    event_name = "crm.sync.contact_failed",
                    error = %error,
                    "crm contact upsert failed"
                );
                return CrmSyncOutcome::ContactFailed;
            }
        };

        let note = NewNote { contact_id, text: outcome.note_text(&message.text) };
        let note_added = match api.add_note(&token, &note).await {
            Ok(()) => true,
            Err(error) if error.is_auth_expired() => return self.invalidate(&token).await,
            Err(error) => {
                warn!(
                    event_name = "crm.sync.note_failed",
                    contact_id = contact_id.0,
                    error = %error,
                    "crm note failed"
                );
                false
            }
        };

        let lead_created = match lead_policy.qualify(&message.text) {
            None => false,
            Some(reason) => {
                let lead = NewLead {
                    name: format!("New Lead from Telegram: {}", message.sender_first_name),
                    pipeline_id: self.pipeline_id,
                    status_id: self.status_id,
                    contact_id,
                };
                match api.create_lead(&token, &lead).await {
                    Ok(lead_id) => {
                        info!(
                            event_name = "crm.sync.lead_created",
                            contact_id = contact_id.0,
                            lead_id = lead_id.map(|id| id.0),
                            reason,
                            "crm lead created"
                        );
                        true
                    }
                    Err(error) if error.is_auth_expired() => return self.invalidate(&token).await,
                    Err(error) => {
                        warn!(
                            event_name = "crm.sync.lead_failed",
                            contact_id = contact_id.0,
                            error = %error,
                            "crm lead failed"
                        );
                        false
                    }
                }
            }
        };

        CrmSyncOutcome::Synced { contact_id, note_added, lead_created }
    }

    async fn invalidate(&self, token: &str) -> CrmSyncOutcome {
        match self.tokens.invalidate(token).await {
            Ok(cleared) => warn!(
                event_name = "crm.token.invalidated",
                cleared,
                "crm rejected the access token; re-authorize via /auth"
            ),
            Err(error) => error!(
                event_name = "crm.token.invalidate_failed",
                error = %error,
                "crm token could not be cleared from storage"
            ),
        }
        CrmSyncOutcome::TokenInvalidated
    }
}
