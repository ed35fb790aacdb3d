//! Property listing search through an Apify scraping actor.
//!
//! The actor is run synchronously with `run-sync-get-dataset-items`: the
//! request carries the ZIP codes to search and a price ceiling, the response
//! is the dataset as a JSON array of listing records.

use async_trait::async_trait;
use leadrelay_core::{ListingQuery, PropertyListing, RelayError, Upstream, UpstreamError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[async_trait]
pub trait ListingSearch: Send + Sync {
    async fn search(&self, query: &ListingQuery) -> Result<Vec<PropertyListing>, RelayError>;
}

#[derive(Clone)]
pub struct ApifyListingClient {
    client: Client,
    base_url: String,
    actor_id: String,
    api_token: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActorInput<'a> {
    zip_codes: [&'a str; 1],
    price_max: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingRecord {
    #[serde(default)]
    status_text: Option<Value>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    address: Option<Value>,
    #[serde(default)]
    beds: Option<Value>,
    #[serde(default)]
    baths: Option<Value>,
    #[serde(default)]
    area: Option<Value>,
    #[serde(default)]
    detail_url: Option<Value>,
    #[serde(default)]
    img_src: Option<Value>,
}

impl From<ListingRecord> for PropertyListing {
    fn from(record: ListingRecord) -> Self {
        Self {
            status_text: display(record.status_text),
            price: display(record.price),
            address: display(record.address),
            beds: display(record.beds),
            baths: display(record.baths),
            area: display(record.area),
            detail_url: display(record.detail_url),
            image_url: display(record.img_src),
        }
    }
}

/// Scraped fields arrive as strings, numbers or null depending on the source page.
fn display(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl ApifyListingClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        actor_id: impl Into<String>,
        api_token: SecretString,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, actor_id: actor_id.into(), api_token }
    }
}

#[async_trait]
impl ListingSearch for ApifyListingClient {
    async fn search(&self, query: &ListingQuery) -> Result<Vec<PropertyListing>, RelayError> {
        let url = format!("{}/acts/{}/run-sync-get-dataset-items", self.base_url, self.actor_id);
        let response = self
            .client
            .post(url)
            .query(&[("token", self.api_token.expose_secret())])
            .json(&ActorInput { zip_codes: [query.area_code.as_str()], price_max: query.max_price })
            .send()
            .await
            // The query string carries the API token.
            .map_err(|error| UpstreamError::transport(Upstream::Listings, error.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(Upstream::Listings, status.as_u16(), &body).into());
        }

        let records: Vec<Value> = response
            .json()
            .await
            .map_err(|error| UpstreamError::decode(Upstream::Listings, error.without_url()))?;

        let listings: Vec<PropertyListing> = records
            .into_iter()
            .filter_map(|record| serde_json::from_value::<ListingRecord>(record).ok())
            .map(PropertyListing::from)
            .collect();

        debug!(
            area_code = %query.area_code,
            max_price = query.max_price,
            results = listings.len(),
            "listing search completed"
        );
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use leadrelay_core::{ListingQuery, RelayError, Upstream, UpstreamError};
    use reqwest::Client;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::{ApifyListingClient, ListingSearch};

    fn client(server: &MockServer) -> ApifyListingClient {
        ApifyListingClient::new(
            Client::new(),
            format!("{}/v2", server.uri()),
            "maxcopell~zillow-zip-search",
            "apify-token".to_string().into(),
        )
    }

    fn query() -> ListingQuery {
        ListingQuery { area_code: "33101".to_string(), max_price: 300_000 }
    }

    #[tokio::test]
    async fn search_posts_actor_input_and_maps_records() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/acts/maxcopell~zillow-zip-search/run-sync-get-dataset-items"))
            .and(query_param("token", "apify-token"))
            .and(body_json(json!({ "zipCodes": ["33101"], "priceMax": 300000 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {
                    "statusText": "Condo for sale",
                    "price": "$289,000",
                    "address": "100 Biscayne Blvd #1203, Miami, FL 33132",
                    "beds": 2,
                    "baths": 1.5,
                    "area": 950,
                    "detailUrl": "https://www.zillow.com/homedetails/1_zpid/",
                    "imgSrc": "https://photos.zillowstatic.com/1.jpg"
                },
                { "statusText": "House for sale", "price": 275000, "imgSrc": null, "beds": null },
                "not an object"
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let listings = client(&server).search(&query()).await.expect("search should succeed");

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price.as_deref(), Some("$289,000"));
        assert_eq!(listings[0].beds.as_deref(), Some("2"));
        assert_eq!(listings[0].baths.as_deref(), Some("1.5"));
        assert_eq!(listings[0].image_url.as_deref(), Some("https://photos.zillowstatic.com/1.jpg"));
        assert_eq!(listings[1].price.as_deref(), Some("275000"));
        assert_eq!(listings[1].image_url, None);
        assert_eq!(listings[1].beds, None);
    }

    #[tokio::test]
    async fn actor_failure_is_an_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_string("usage limit exceeded"))
            .mount(&server)
            .await;

        let error = client(&server).search(&query()).await.expect_err("402 should fail");
        assert!(matches!(
            error,
            RelayError::Upstream(UpstreamError::Status {
                service: Upstream::Listings,
                status: 402,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn non_array_response_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "nope" })))
            .mount(&server)
            .await;

        let error = client(&server).search(&query()).await.expect_err("object should fail");
        assert!(matches!(error, RelayError::Upstream(UpstreamError::Decode { .. })));
        assert!(!error.to_string().contains("apify-token"));
    }
}
