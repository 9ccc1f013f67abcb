//! Query submitter backed by SerpApi's Google Images engine.
//!
//! A search turns a term and a result bound into an ordered batch of
//! [`Descriptor`]s. Nothing is fetched here; the batch only says where each
//! image lives and what it is called.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Default SerpApi search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search.json";

const ENGINE: &str = "google_images";

/// SerpApi answers an empty search with a 200 and this phrase in `error`.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// Longest error body kept in a [`SearchError::Status`].
const MAX_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    images_results: Vec<ImageResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResult {
    thumbnail: Option<String>,
    original: Option<String>,
    title: Option<String>,
    original_width: Option<u32>,
    original_height: Option<u32>,
}

/// Which of the result's URLs a descriptor points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageVariant {
    /// The search engine's cached thumbnail. Small and reliably reachable.
    #[default]
    Thumbnail,
    /// The full-size image on its origin site.
    Original,
}

/// A single search result, prior to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub source_url: String,
    pub title: String,
    /// Size reported by the service. Only known for the original image.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Descriptor {
    fn from_result(result: ImageResult, variant: ImageVariant) -> Option<Descriptor> {
        let (source_url, width, height) = match variant {
            ImageVariant::Thumbnail => (result.thumbnail, None, None),
            ImageVariant::Original => (
                result.original,
                result.original_width,
                result.original_height,
            ),
        };
        let source_url = source_url.filter(|url| !url.trim().is_empty())?;

        Some(Descriptor {
            source_url,
            title: result.title.unwrap_or_default(),
            width,
            height,
        })
    }
}

/// Client for the hosted image-search service.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    variant: ImageVariant,
}

impl SearchClient {
    /// Creates a client for the default endpoint.
    ///
    /// Fails with [`SearchError::MissingApiKey`] when the key is blank, before
    /// any request is made.
    pub fn new(api_key: impl Into<String>) -> Result<SearchClient, SearchError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }

        Ok(SearchClient {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            variant: ImageVariant::default(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_variant(mut self, variant: ImageVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Searches for `term` and returns at most `max_results` descriptors, in
    /// the order the service ranked them.
    ///
    /// A bound of zero returns an empty batch without contacting the service.
    /// A search the engine found nothing for is an empty batch as well.
    ///
    /// # Errors
    /// - `SearchError::Unauthorized` if the service rejects the API key.
    /// - `SearchError::Status`, `SearchError::Api`, `SearchError::Malformed` or
    ///   `SearchError::Transport` for every other failure.
    pub async fn search(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<Vec<Descriptor>, SearchError> {
        if max_results == 0 {
            debug!(term, "result bound is zero, skipping search");
            return Ok(vec![]);
        }

        debug!(term, max_results, endpoint = %self.endpoint, "submitting image search");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", ENGINE),
                ("q", term),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(SearchError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(SearchError::transport)?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SearchError::Unauthorized {
                status,
                message: error_message(&body),
            });
        }

        if !status.is_success() {
            return Err(SearchError::Status {
                status,
                body: summarize(&error_message(&body)),
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|source| SearchError::Malformed { source })?;

        if let Some(message) = parsed.error {
            if message.contains(NO_RESULTS_MARKER) {
                debug!(term, "search engine returned no results");
                return Ok(vec![]);
            }

            return Err(SearchError::Api { message });
        }

        let variant = self.variant;
        Ok(parsed
            .images_results
            .into_iter()
            .filter_map(|result| Descriptor::from_result(result, variant))
            .take(max_results)
            .collect())
    }
}

/// Pulls the `error` field out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<SearchResponse>(body)
        .ok()
        .and_then(|response| response.error)
        .unwrap_or_else(|| body.trim().to_string())
}

fn summarize(message: &str) -> String {
    match message.char_indices().nth(MAX_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &message[..end]),
        None => message.to_string(),
    }
}

/// Errors raised while submitting a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no search API key configured")]
    MissingApiKey,

    #[error("search API rejected the credentials ({status}): {message}")]
    Unauthorized { status: StatusCode, message: String },

    #[error("search API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("search API reported an error: {message}")]
    Api { message: String },

    #[error("search API returned a malformed payload")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    #[error("search request failed")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
}

impl SearchError {
    /// The request URL carries the API key, so it is stripped from transport errors.
    fn transport(source: reqwest::Error) -> SearchError {
        SearchError::Transport {
            source: source.without_url(),
        }
    }

    /// Whether the error concerns missing or rejected credentials.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SearchError::MissingApiKey | SearchError::Unauthorized { .. }
        )
    }
}
