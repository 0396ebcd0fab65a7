//! Address search with a bounded result cache.
//!
//! The network call itself belongs to the host (browser `fetch`, or
//! `reqwest` in the CLI). The search component decides whether a call is
//! needed, and drops results that arrive after a newer query superseded
//! them:
//!
//! ```text
//! query("10 rue") ─► Fetch(ticket 1)
//! query("10 rue de") ─► Fetch(ticket 2)      ticket 1 is now stale
//! resolve(ticket 1, ..) ─► None               discarded, not cached
//! resolve(ticket 2, ..) ─► Some(Results)      cached under "10 rue de"
//! ```

use crate::config::EditorConfig;
use carte_core::LonLat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("address search request failed: {0}")]
    Network(String),
    #[error("address search returned HTTP {0}")]
    Status(u16),
    #[error("unreadable address search response: {0}")]
    Decode(String),
}

/// A geocoding result the user can pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub city: String,
    pub coordinates: LonLat,
}

impl Address {
    /// `"<name>, <city>"`, or just the name when the city is unknown.
    pub fn label(&self) -> String {
        if self.city.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.city)
        }
    }
}

/// Read the geocoder's FeatureCollection response. Entries without a name or
/// usable coordinates are skipped.
pub fn parse_search_response(body: &Value) -> Result<Vec<Address>, SearchError> {
    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Decode("missing `features` array".into()))?;

    let addresses = features
        .iter()
        .filter_map(|feature| {
            let props = feature.get("properties")?;
            let name = props.get("name")?.as_str()?.to_string();
            let city = props
                .get("city")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let coords = feature.get("geometry")?.get("coordinates")?;
            let lon = coords.get(0)?.as_f64()?;
            let lat = coords.get(1)?.as_f64()?;
            Some(Address {
                name,
                city,
                coordinates: LonLat::new(lon, lat),
            })
        })
        .collect::<Vec<_>>();

    if addresses.len() < features.len() {
        log::debug!(
            "skipped {} unusable search results",
            features.len() - addresses.len()
        );
    }
    Ok(addresses)
}

// ─── Cache ────────────────────────────────────────────────────────────────

/// Least-recently-used cache of search results, bounded by entry count.
#[derive(Debug, Clone)]
pub struct SearchCache {
    capacity: usize,
    /// Most recently used last.
    entries: VecDeque<(String, Vec<Address>)>,
}

impl SearchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    pub fn get(&mut self, query: &str) -> Option<Vec<Address>> {
        let pos = self.entries.iter().position(|(q, _)| q == query)?;
        let entry = self.entries.remove(pos)?;
        let results = entry.1.clone();
        self.entries.push_back(entry);
        Some(results)
    }

    pub fn insert(&mut self, query: String, results: Vec<Address>) {
        if self.capacity == 0 {
            return;
        }
        self.entries.retain(|(q, _)| *q != query);
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((query, results));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Search ───────────────────────────────────────────────────────────────

/// Freshness token for one network request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    query: String,
}

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// What the host must fetch: `GET {endpoint}?q={query}&limit={limit}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub ticket: SearchTicket,
    pub endpoint: String,
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchStep {
    /// Term too short; nothing to show.
    Idle,
    /// Served from cache.
    Ready(Vec<Address>),
    /// The host must perform this request and hand the result to `resolve`.
    Fetch(SearchRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Possibly empty: the host shows "no results".
    Results(Vec<Address>),
    /// The host shows an error state, distinct from "no results".
    Failed(SearchError),
}

pub struct AddressSearch {
    cache: SearchCache,
    endpoint: String,
    limit: usize,
    min_query_len: usize,
    generation: u64,
    in_flight: Option<SearchTicket>,
}

impl AddressSearch {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            cache: SearchCache::new(config.search_cache_capacity),
            endpoint: config.search_endpoint.clone(),
            limit: config.search_limit,
            min_query_len: config.min_query_len,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn in_flight(&self) -> Option<&SearchTicket> {
        self.in_flight.as_ref()
    }

    /// Start a search for `term`. Any request still in flight becomes stale.
    pub fn query(&mut self, term: &str) -> SearchStep {
        let term = term.trim();
        self.in_flight = None;

        if term.is_empty() || term.chars().count() < self.min_query_len {
            return SearchStep::Idle;
        }
        if let Some(results) = self.cache.get(term) {
            log::debug!("address search cache hit for {term:?}");
            return SearchStep::Ready(results);
        }

        self.generation += 1;
        let ticket = SearchTicket {
            generation: self.generation,
            query: term.to_string(),
        };
        self.in_flight = Some(ticket.clone());
        SearchStep::Fetch(SearchRequest {
            ticket,
            endpoint: self.endpoint.clone(),
            query: term.to_string(),
            limit: self.limit,
        })
    }

    /// Deliver the result of a request issued by `query`. Returns `None` when
    /// the ticket is stale; stale results are never cached.
    pub fn resolve(
        &mut self,
        ticket: &SearchTicket,
        result: Result<Vec<Address>, SearchError>,
    ) -> Option<SearchOutcome> {
        if self.in_flight.as_ref() != Some(ticket) {
            log::debug!(
                "dropping stale address results for {:?} (generation {})",
                ticket.query,
                ticket.generation
            );
            return None;
        }
        self.in_flight = None;

        match result {
            Ok(addresses) => {
                self.cache.insert(ticket.query.clone(), addresses.clone());
                Some(SearchOutcome::Results(addresses))
            }
            Err(e) => {
                log::warn!("address search for {:?} failed: {e}", ticket.query);
                Some(SearchOutcome::Failed(e))
            }
        }
    }
}
