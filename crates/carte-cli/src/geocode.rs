//! HTTP client for the national address API (`api-adresse.data.gouv.fr`).

use carte_editor::search::{
    Address, AddressSearch, SearchError, SearchOutcome, SearchRequest, SearchStep,
    parse_search_response,
};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GeocodeClient {
    http: reqwest::Client,
}

impl GeocodeClient {
    pub fn new() -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("carte/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;
        Ok(Self { http })
    }

    /// `GET {endpoint}?q={query}&limit={limit}`. Single attempt, no retry.
    pub async fn fetch(&self, request: &SearchRequest) -> Result<Vec<Address>, SearchError> {
        let limit = request.limit.to_string();
        let response = self
            .http
            .get(&request.endpoint)
            .query(&[("q", request.query.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        parse_search_response(&body)
    }
}

/// Run one search step to completion. `None` for terms too short to search.
pub async fn run_search(
    search: &mut AddressSearch,
    client: &GeocodeClient,
    term: &str,
) -> Option<SearchOutcome> {
    match search.query(term) {
        SearchStep::Idle => None,
        SearchStep::Ready(results) => Some(SearchOutcome::Results(results)),
        SearchStep::Fetch(request) => {
            log::info!("querying {} for {:?}", request.endpoint, request.query);
            let result = client.fetch(&request).await;
            search.resolve(&request.ticket, result)
        }
    }
}
