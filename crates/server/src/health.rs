use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use leadrelay_core::TokenHolder;
use serde::Serialize;

pub const LIVENESS: &str = "leadrelay is running";

#[derive(Clone)]
pub struct HealthState {
    pub tokens: TokenHolder,
    pub listing_mode: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether a CRM token is held. The token itself is never exposed.
    pub crm_connected: bool,
    pub listing_mode: bool,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(liveness)).route("/health", get(health)).with_state(state)
}

pub async fn liveness() -> &'static str {
    LIVENESS
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        crm_connected: state.tokens.get().await.is_some(),
        listing_mode: state.listing_mode,
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, Json};
    use tempfile::TempDir;

    use crate::crm::tests::token_holder;
    use crate::health::{health, liveness, HealthState, LIVENESS};

    #[tokio::test]
    async fn liveness_is_a_plain_string() {
        assert_eq!(liveness().await, LIVENESS);
    }

    #[tokio::test]
    async fn health_reports_crm_connection_without_the_token() {
        let dir = TempDir::new().expect("tempdir");
        let tokens = token_holder(&dir);

        let Json(before) =
            health(State(HealthState { tokens: tokens.clone(), listing_mode: true })).await;
        assert!(!before.crm_connected);
        assert!(before.listing_mode);

        tokens.set("secret-token").await.expect("set");
        let Json(after) = health(State(HealthState { tokens, listing_mode: false })).await;
        assert_eq!(after.status, "ready");
        assert!(after.crm_connected);

        let body = serde_json::to_string(&after).expect("serialize");
        assert!(!body.contains("secret-token"));
    }
}
