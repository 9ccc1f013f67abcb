//! Image fetcher: one HTTP GET per descriptor, bytes in memory.

use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Per-request timeout used unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Fetcher, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Client { source })?;

        Ok(Fetcher { client })
    }

    /// Downloads the resource at `url` and returns its raw bytes.
    ///
    /// A single attempt is made. Non-success statuses, transport failures
    /// (including the timeout) and empty bodies are all errors.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!(url, "fetching image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        if bytes.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!(url, size = bytes.len(), "fetched image");
        Ok(bytes)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client itself could not be built.
    #[error("failed to build the HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for URL: {url}")]
    Status { url: String, status: StatusCode },

    /// Connection failure, timeout or an interrupted body.
    #[error("request failed for URL: {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("empty response body for URL: {url}")]
    EmptyBody { url: String },
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_TIMEOUT, FetchError, Fetcher};
    use reqwest::StatusCode;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apple.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8\xff\xe0jpeg".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        let bytes = fetcher
            .fetch(&format!("{}/apple.jpg", server.uri()))
            .await
            .unwrap();

        assert_eq!(&b"\xff\xd8\xff\xe0jpeg"[..], bytes.as_ref());
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        let result = fetcher.fetch(&format!("{}/missing.jpg", server.uri())).await;

        let Err(FetchError::Status { status, .. }) = result else {
            panic!("Expected Status error, but got {:?}", result);
        };
        assert_eq!(StatusCode::NOT_FOUND, status);
    }

    #[tokio::test]
    async fn test_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        let result = fetcher.fetch(&format!("{}/empty.jpg", server.uri())).await;

        assert!(matches!(result, Err(FetchError::EmptyBody { .. })));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Duration::from_millis(100)).unwrap();
        let result = fetcher.fetch(&format!("{}/slow.jpg", server.uri())).await;

        let Err(FetchError::Transport { source, .. }) = result else {
            panic!("Expected Transport error, but got {:?}", result);
        };
        assert!(source.is_timeout());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Grab a free port, then release it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let fetcher = Fetcher::new(DEFAULT_TIMEOUT).unwrap();
        let result = fetcher
            .fetch(&format!("http://127.0.0.1:{port}/apple.jpg"))
            .await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
