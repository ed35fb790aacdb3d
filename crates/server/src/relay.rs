//! The per-message pipeline behind `POST /webhook`.
//!
//! Chat mode: persona reply (or the fallback greeting), deliver it, then CRM sync
//! with keyword-gated lead creation.
//!
//! Listing mode: extract search criteria, run the listing search, deliver a
//! summary plus the top listings as captioned photos, then CRM sync where every
//! search becomes a lead. Extraction and search failures end the run early with
//! a message to the user and no CRM sync.
//!
//! The webhook always answers `200`; outcomes are only logged.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use leadrelay_agent::{ConversationAgent, FALLBACK_GREETING};
use leadrelay_core::{
    format_price, ConversationOutcome, InboundMessage, LeadPolicy, ListingQuery, PropertyListing,
};
use leadrelay_listings::ListingSearch;
use leadrelay_telegram::{decode_update, listing_caption, ChatClient, Update};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::crm::{CrmSync, CrmSyncOutcome};

pub const CLARIFICATION_PROMPT: &str =
    "Could you tell me the ZIP code and maximum budget you're looking for?";
pub const SEARCH_UNAVAILABLE: &str =
    "Sorry, property search is temporarily unavailable. Please try again in a few minutes.";

/// Listing search plus the fallbacks used when extraction leaves gaps.
pub struct ListingMode {
    pub search: Arc<dyn ListingSearch>,
    pub default_area_code: String,
    pub default_max_price: u64,
    pub max_results: usize,
    pub placeholder_image_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No text message in the update.
    Ignored,
    Replied { used_fallback: bool, delivered: bool, crm: CrmSyncOutcome },
    Listed { found: usize, photos_sent: usize, crm: CrmSyncOutcome },
    ClarificationRequested,
    SearchUnavailable,
}

#[derive(Clone)]
pub struct ConversationRelay {
    agent: ConversationAgent,
    chat: Arc<dyn ChatClient>,
    listings: Option<Arc<ListingMode>>,
    crm: CrmSync,
    lead_policy: LeadPolicy,
}

impl ConversationRelay {
    pub fn new(
        agent: ConversationAgent,
        chat: Arc<dyn ChatClient>,
        listings: Option<ListingMode>,
        crm: CrmSync,
        lead_policy: LeadPolicy,
    ) -> Self {
        Self { agent, chat, listings: listings.map(Arc::new), crm, lead_policy }
    }

    pub fn listing_mode(&self) -> bool {
        self.listings.is_some()
    }

    pub async fn handle_update(&self, update: &Update) -> RelayOutcome {
        match update.inbound_message() {
            Some(message) => self.handle(&message).await,
            None => {
                info!(event_name = "relay.webhook.ignored", "update carries no text message");
                RelayOutcome::Ignored
            }
        }
    }

    pub async fn handle(&self, message: &InboundMessage) -> RelayOutcome {
        info!(
            event_name = "relay.message.received",
            chat_id = message.chat_id,
            sender_id = message.sender_id,
            listing_mode = self.listing_mode(),
            "processing inbound message"
        );
        match &self.listings {
            Some(listings) => self.search_listings(message, listings).await,
            None => self.reply(message).await,
        }
    }

    async fn reply(&self, message: &InboundMessage) -> RelayOutcome {
        let (reply, used_fallback) = match self.agent.reply(&message.text).await {
            Ok(reply) if !reply.trim().is_empty() => (reply, false),
            Ok(_) => {
                warn!(
                    event_name = "relay.reply.fallback",
                    reason = "empty completion",
                    "using fallback greeting"
                );
                (FALLBACK_GREETING.to_string(), true)
            }
            Err(error) => {
                warn!(
                    event_name = "relay.reply.fallback",
                    error = %error,
                    "using fallback greeting"
                );
                (FALLBACK_GREETING.to_string(), true)
            }
        };

        let delivered = self.send_text(message.chat_id, &reply).await;
        let crm = self
            .crm
            .sync(message, &ConversationOutcome::Reply { reply }, &self.lead_policy)
            .await;
        RelayOutcome::Replied { used_fallback, delivered, crm }
    }

    async fn search_listings(
        &self,
        message: &InboundMessage,
        listings: &ListingMode,
    ) -> RelayOutcome {
        let criteria = match self.agent.extract_criteria(&message.text).await {
            Ok(criteria) => criteria,
            Err(error) => {
                warn!(
                    event_name = "relay.criteria.failed",
                    error = %error,
                    "asking user to clarify"
                );
                self.send_text(message.chat_id, CLARIFICATION_PROMPT).await;
                return RelayOutcome::ClarificationRequested;
            }
        };
        let query = criteria.resolve(&listings.default_area_code, listings.default_max_price);

        let found = match listings.search.search(&query).await {
            Ok(found) => found,
            Err(error) => {
                warn!(
                    event_name = "relay.listings.failed",
                    area_code = %query.area_code,
                    error = %error,
                    "listing search failed"
                );
                self.send_text(message.chat_id, SEARCH_UNAVAILABLE).await;
                return RelayOutcome::SearchUnavailable;
            }
        };
        info!(
            event_name = "relay.listings.found",
            area_code = %query.area_code,
            max_price = query.max_price,
            results = found.len(),
            "listing search completed"
        );

        self.send_text(message.chat_id, &summary(&query, found.len(), listings.max_results)).await;

        let mut photos_sent = 0;
        for listing in found.iter().take(listings.max_results) {
            if self.send_listing(message.chat_id, listing, &listings.placeholder_image_url).await {
                photos_sent += 1;
            }
        }

        let outcome = ConversationOutcome::Search {
            area_code: query.area_code,
            max_price: query.max_price,
            result_count: found.len(),
        };
        let crm = self.crm.sync(message, &outcome, &LeadPolicy::Always).await;
        RelayOutcome::Listed { found: found.len(), photos_sent, crm }
    }

    async fn send_listing(
        &self,
        chat_id: i64,
        listing: &PropertyListing,
        placeholder: &str,
    ) -> bool {
        let photo = listing
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(placeholder);
        match self.chat.send_photo(chat_id, photo, &listing_caption(listing)).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "relay.delivery.failed",
                    kind = "photo",
                    chat_id,
                    error = %error,
                    "listing photo not delivered"
                );
                false
            }
        }
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> bool {
        match self.chat.send_message(chat_id, text).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "relay.delivery.failed",
                    kind = "text",
                    chat_id,
                    error = %error,
                    "reply not delivered"
                );
                false
            }
        }
    }
}

fn summary(query: &ListingQuery, found: usize, max_results: usize) -> String {
    let price = format_price(query.max_price);
    if found == 0 {
        return format!(
            "I couldn't find any listings in {} up to ${price}. Try a different area or budget?",
            query.area_code
        );
    }
    format!(
        "I found {found} listings in {} up to ${price}. Here are the top {}:",
        query.area_code,
        found.min(max_results)
    )
}

pub fn router(relay: ConversationRelay) -> Router {
    Router::new().route("/webhook", post(webhook)).with_state(relay)
}

/// Takes the raw body so malformed deliveries still get a `200`.
pub async fn webhook(State(relay): State<ConversationRelay>, body: Bytes) -> StatusCode {
    let update = decode_update(&body);
    let correlation_id = match update.update_id {
        Some(update_id) => format!("tg-{update_id}"),
        None => Uuid::new_v4().to_string(),
    };
    let span = info_span!("webhook", correlation_id = %correlation_id);

    async {
        info!(event_name = "relay.webhook.received", "telegram update received");
        let outcome = relay.handle_update(&update).await;
        info!(
            event_name = "relay.webhook.completed",
            outcome = ?outcome,
            "telegram update handled"
        );
    }
    .instrument(span)
    .await;

    StatusCode::OK
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use leadrelay_agent::{CompletionRequest, ConversationAgent, LlmClient, FALLBACK_GREETING};
    use leadrelay_core::{
        CrmContactId, InboundMessage, LeadPolicy, ListingQuery, PropertyListing, RelayError,
        Upstream, UpstreamError,
    };
    use leadrelay_listings::ListingSearch;
    use leadrelay_telegram::ChatClient;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::{
        router, summary, ConversationRelay, ListingMode, RelayOutcome, CLARIFICATION_PROMPT,
        SEARCH_UNAVAILABLE,
    };
    use crate::crm::{
        tests::{token_holder, CrmCall, RecordingCrm},
        CrmSync, CrmSyncOutcome,
    };

    /// Answers text prompts and JSON prompts from separate scripts.
    #[derive(Default)]
    pub(crate) struct ScriptedLlm {
        pub reply: Option<Result<String, RelayError>>,
        pub criteria: Option<Result<String, RelayError>>,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, RelayError> {
            self.requests.lock().expect("lock").push(request.clone());
            let scripted = if request.json_output { &self.criteria } else { &self.reply };
            scripted.clone().unwrap_or_else(|| {
                Err(UpstreamError::transport(Upstream::Completion, "no script").into())
            })
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Sent {
        Text { chat_id: i64, text: String },
        Photo { chat_id: i64, photo: String, caption: String },
    }

    /// `fail` rejects every send; `fail_photos` rejects photos only.
    #[derive(Default)]
    pub(crate) struct RecordingChat {
        pub sent: Mutex<Vec<Sent>>,
        pub fail: bool,
        pub fail_photos: bool,
    }

    impl RecordingChat {
        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().expect("lock").clone()
        }
    }

    fn blocked() -> RelayError {
        UpstreamError::status(Upstream::Messaging, 403, "bot was blocked").into()
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), RelayError> {
            self.sent.lock().expect("lock").push(Sent::Text { chat_id, text: text.to_string() });
            if self.fail {
                return Err(blocked());
            }
            Ok(())
        }

        async fn send_photo(
            &self,
            chat_id: i64,
            photo_url: &str,
            caption: &str,
        ) -> Result<(), RelayError> {
            self.sent.lock().expect("lock").push(Sent::Photo {
                chat_id,
                photo: photo_url.to_string(),
                caption: caption.to_string(),
            });
            if self.fail || self.fail_photos {
                return Err(blocked());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeListings {
        pub result: Option<Result<Vec<PropertyListing>, RelayError>>,
        pub queries: Mutex<Vec<ListingQuery>>,
    }

    #[async_trait]
    impl ListingSearch for FakeListings {
        async fn search(&self, query: &ListingQuery) -> Result<Vec<PropertyListing>, RelayError> {
            self.queries.lock().expect("lock").push(query.clone());
            self.result.clone().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    pub(crate) struct Harness {
        pub llm: Arc<ScriptedLlm>,
        pub chat: Arc<RecordingChat>,
        pub listings: Option<Arc<FakeListings>>,
        pub crm: Arc<RecordingCrm>,
        pub relay: ConversationRelay,
        pub dir: TempDir,
    }

    pub(crate) async fn harness(
        llm: ScriptedLlm,
        chat: RecordingChat,
        listings: Option<FakeListings>,
        crm: RecordingCrm,
        with_token: bool,
    ) -> Harness {
        let dir = TempDir::new().expect("tempdir");
        let tokens = token_holder(&dir);
        if with_token {
            tokens.set("live-token").await.expect("set token");
        }
        let llm = Arc::new(llm);
        let chat = Arc::new(chat);
        let crm = Arc::new(crm);
        let listings = listings.map(Arc::new);
        let mode = listings.clone().map(|search| ListingMode {
            search,
            default_area_code: "33101".to_string(),
            default_max_price: 500_000,
            max_results: 2,
            placeholder_image_url: "https://placehold.co/600x400?text=No+Image".to_string(),
        });
        let relay = ConversationRelay::new(
            ConversationAgent::new(llm.clone()),
            chat.clone(),
            mode,
            CrmSync::new(Some(crm.clone()), tokens, Some(123_456), Some(1_234_567)),
            LeadPolicy::keywords(["buy", "interested", "budget", "viewing"]),
        );
        Harness { llm, chat, listings, crm, relay, dir }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage::new(7, 42, "Sam", None, text)
    }

    fn replying(reply: &str) -> ScriptedLlm {
        ScriptedLlm { reply: Some(Ok(reply.to_string())), ..ScriptedLlm::default() }
    }

    fn extracting(criteria: &str) -> ScriptedLlm {
        ScriptedLlm { criteria: Some(Ok(criteria.to_string())), ..ScriptedLlm::default() }
    }

    fn text_to_chat(text: &str) -> Sent {
        Sent::Text { chat_id: 7, text: text.to_string() }
    }

    fn listing(n: usize, image: Option<&str>) -> PropertyListing {
        PropertyListing {
            status_text: Some("Condo for sale!".to_string()),
            price: Some(format!("$2{n}9,000")),
            address: Some(format!("{n}00 N.W. 1st St, Miami-Dade, FL 33101")),
            beds: Some("2".to_string()),
            baths: Some("1.5".to_string()),
            area: Some("950".to_string()),
            detail_url: Some(format!("https://www.zillow.com/homedetails/{n}_zpid/")),
            image_url: image.map(str::to_string),
        }
    }

    async fn post_webhook(relay: ConversationRelay, body: &'static str) -> StatusCode {
        router(relay)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response")
            .status()
    }

    #[tokio::test]
    async fn payloads_without_text_make_no_outbound_calls() {
        let h = harness(
            ScriptedLlm::default(),
            RecordingChat::default(),
            Some(FakeListings::default()),
            RecordingCrm::default(),
            true,
        )
        .await;

        for body in [
            r#"{"update_id": 1}"#,
            r#"{"update_id": 2, "message": {"chat": {"id": 7}, "sticker": {}}}"#,
            r#"{"update_id": 3, "message": {"chat": {"id": 7}, "text": ""}}"#,
            "not json at all",
        ] {
            assert_eq!(post_webhook(h.relay.clone(), body).await, StatusCode::OK);
        }

        assert!(h.llm.requests.lock().expect("lock").is_empty());
        assert!(h.chat.sent().is_empty());
        assert!(h.crm.calls().is_empty());
        let listings = h.listings.as_ref().expect("listing fake");
        assert!(listings.queries.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn chat_mode_replies_and_syncs_conversation() {
        let h = harness(
            replying("What's your budget?"),
            RecordingChat::default(),
            None,
            RecordingCrm::default(),
            true,
        )
        .await;

        let outcome = h.relay.handle(&message("hello, looking for a condo")).await;

        assert_eq!(
            outcome,
            RelayOutcome::Replied {
                used_fallback: false,
                delivered: true,
                crm: CrmSyncOutcome::Synced {
                    contact_id: CrmContactId(555),
                    note_added: true,
                    lead_created: false,
                },
            }
        );
        assert_eq!(h.chat.sent(), vec![text_to_chat("What's your budget?")]);
        let requests = h.llm.requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user, "A client texted this: \"hello, looking for a condo\"");
    }

    #[tokio::test]
    async fn completion_failure_falls_back_to_greeting_and_still_delivers() {
        let h = harness(
            ScriptedLlm {
                reply: Some(Err(UpstreamError::status(Upstream::Completion, 429, "quota").into())),
                ..ScriptedLlm::default()
            },
            RecordingChat::default(),
            None,
            RecordingCrm::default(),
            false,
        )
        .await;

        let outcome = h.relay.handle(&message("hi")).await;

        assert_eq!(
            outcome,
            RelayOutcome::Replied {
                used_fallback: true,
                delivered: true,
                crm: CrmSyncOutcome::Skipped,
            }
        );
        assert_eq!(h.chat.sent(), vec![text_to_chat(FALLBACK_GREETING)]);
        assert!(h.crm.calls().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_crm_sync() {
        let h = harness(
            replying("Sure!"),
            RecordingChat { fail: true, ..RecordingChat::default() },
            None,
            RecordingCrm::default(),
            true,
        )
        .await;

        let outcome = h.relay.handle(&message("I'm INTERESTED")).await;

        assert!(matches!(
            outcome,
            RelayOutcome::Replied {
                delivered: false,
                crm: CrmSyncOutcome::Synced { lead_created: true, .. },
                ..
            }
        ));
        assert!(h.crm.calls().iter().any(|call| matches!(call, CrmCall::Lead(_))));
    }

    #[tokio::test]
    async fn unauthorized_crm_response_forces_reauthorization() {
        let h = harness(
            replying("Sure!"),
            RecordingChat::default(),
            None,
            RecordingCrm {
                contact_error: Some(RelayError::AuthExpired),
                ..RecordingCrm::default()
            },
            true,
        )
        .await;

        let first = h.relay.handle(&message("buy")).await;
        let second = h.relay.handle(&message("buy")).await;

        assert!(matches!(
            first,
            RelayOutcome::Replied { crm: CrmSyncOutcome::TokenInvalidated, .. }
        ));
        assert!(matches!(second, RelayOutcome::Replied { crm: CrmSyncOutcome::Skipped, .. }));
        assert_eq!(token_holder(&h.dir).get().await, None);
        assert_eq!(h.crm.calls().len(), 1);
    }

    #[tokio::test]
    async fn miami_search_sends_two_escaped_listing_photos() {
        let h = harness(
            extracting(r#"{"area_code": "33101", "max_price": 300000}"#),
            RecordingChat::default(),
            Some(FakeListings {
                result: Some(Ok(vec![
                    listing(1, Some("https://photos.example/1.jpg")),
                    listing(2, None),
                    listing(3, Some("https://photos.example/3.jpg")),
                ])),
                ..FakeListings::default()
            }),
            RecordingCrm::default(),
            true,
        )
        .await;

        let status = post_webhook(
            h.relay.clone(),
            r#"{"update_id": 99, "message": {"text": "I want a 2BR in Miami under $300k",
                "from": {"id": 42, "first_name": "Sam"}, "chat": {"id": 7}}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let sent = h.chat.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(
            sent[0],
            Sent::Text {
                chat_id: 7,
                text: "I found 3 listings in 33101 up to $300,000. Here are the top 2:".to_string(),
            }
        );
        let photos: Vec<(&str, &str)> = sent
            .iter()
            .filter_map(|sent| match sent {
                Sent::Photo { photo, caption, .. } => Some((photo.as_str(), caption.as_str())),
                Sent::Text { .. } => None,
            })
            .collect();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].0, "https://photos.example/1.jpg");
        assert_eq!(photos[1].0, "https://placehold.co/600x400?text=No+Image");
        for (_, caption) in &photos {
            assert!(caption.contains("Condo for sale\\!"));
            assert!(caption.contains("N\\.W\\. 1st St, Miami\\-Dade"));
            assert!(caption.contains("1\\.5 ba"));
        }

        let listings = h.listings.as_ref().expect("listing fake");
        assert_eq!(
            listings.queries.lock().expect("lock").clone(),
            vec![ListingQuery { area_code: "33101".to_string(), max_price: 300_000 }]
        );
        let lead = h.crm.calls().into_iter().find(|call| matches!(call, CrmCall::Lead(_)));
        assert!(lead.is_some(), "every listing search becomes a lead");
    }

    #[tokio::test]
    async fn failed_listing_photos_still_sync_the_search() {
        let h = harness(
            extracting(r#"{"area_code": "33101", "max_price": 300000}"#),
            RecordingChat { fail_photos: true, ..RecordingChat::default() },
            Some(FakeListings {
                result: Some(Ok(vec![
                    listing(1, Some("https://photos.example/1.jpg")),
                    listing(2, None),
                ])),
                ..FakeListings::default()
            }),
            RecordingCrm::default(),
            true,
        )
        .await;

        let outcome = h.relay.handle(&message("2BR in Miami under 300k")).await;

        assert_eq!(
            outcome,
            RelayOutcome::Listed {
                found: 2,
                photos_sent: 0,
                crm: CrmSyncOutcome::Synced {
                    contact_id: CrmContactId(555),
                    note_added: true,
                    lead_created: true,
                },
            }
        );
        let photo_attempts =
            h.chat.sent().iter().filter(|sent| matches!(sent, Sent::Photo { .. })).count();
        assert_eq!(photo_attempts, 2);
    }

    #[tokio::test]
    async fn missing_criteria_use_configured_defaults() {
        let h = harness(
            extracting(r#"{"area_code": null, "max_price": null}"#),
            RecordingChat::default(),
            Some(FakeListings::default()),
            RecordingCrm::default(),
            false,
        )
        .await;

        let outcome = h.relay.handle(&message("show me something nice")).await;

        assert_eq!(
            outcome,
            RelayOutcome::Listed { found: 0, photos_sent: 0, crm: CrmSyncOutcome::Skipped }
        );
        assert_eq!(
            h.chat.sent(),
            vec![text_to_chat(
                "I couldn't find any listings in 33101 up to $500,000. \
                 Try a different area or budget?"
            )]
        );
    }

    #[tokio::test]
    async fn unparsable_criteria_ask_for_clarification_without_search_or_crm() {
        let h = harness(
            extracting("Sure! Miami is lovely."),
            RecordingChat::default(),
            Some(FakeListings::default()),
            RecordingCrm::default(),
            true,
        )
        .await;

        let outcome = h.relay.handle(&message("somewhere sunny")).await;

        assert_eq!(outcome, RelayOutcome::ClarificationRequested);
        assert_eq!(h.chat.sent(), vec![text_to_chat(CLARIFICATION_PROMPT)]);
        let listings = h.listings.as_ref().expect("listing fake");
        assert!(listings.queries.lock().expect("lock").is_empty());
        assert!(h.crm.calls().is_empty());
    }

    #[tokio::test]
    async fn search_failure_reports_unavailable_and_skips_crm() {
        let h = harness(
            extracting(r#"{"area_code": "10001", "max_price": 900000}"#),
            RecordingChat::default(),
            Some(FakeListings {
                result: Some(Err(
                    UpstreamError::status(Upstream::Listings, 502, "bad gateway").into()
                )),
                ..FakeListings::default()
            }),
            RecordingCrm::default(),
            true,
        )
        .await;

        let outcome = h.relay.handle(&message("NYC under 900k")).await;

        assert_eq!(outcome, RelayOutcome::SearchUnavailable);
        assert_eq!(h.chat.sent(), vec![text_to_chat(SEARCH_UNAVAILABLE)]);
        assert!(h.crm.calls().is_empty());
    }

    #[test]
    fn summary_counts_top_results() {
        let query = ListingQuery { area_code: "33101".to_string(), max_price: 1_250_000 };
        assert_eq!(
            summary(&query, 1, 2),
            "I found 1 listings in 33101 up to $1,250,000. Here are the top 1:"
        );
        assert_eq!(
            summary(&query, 9, 2),
            "I found 9 listings in 33101 up to $1,250,000. Here are the top 2:"
        );
    }
}
