//! `reqwest` implementation of [`SearchBackend`].

use std::time::Duration;

use async_trait::async_trait;
use postcode_map_search_models::PostcodeBody;

use crate::{BackendError, SearchBackend};

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a client for `base_url` whose requests give up after
    /// `timeout`.
    ///
    /// A base URL without a scheme (e.g. `localhost:3000`) is treated as
    /// plain `http://`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidUrl`] if the URL is unusable, or
    /// [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// The normalized base URL (scheme included, no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Normalizes a configured backend base URL.
///
/// # Errors
///
/// Returns [`BackendError::InvalidUrl`] for empty values, values with
/// whitespace, and schemes other than `http`/`https`.
pub fn normalize_base_url(raw: &str) -> Result<String, BackendError> {
    let trimmed = raw.trim();
    let invalid = || BackendError::InvalidUrl {
        url: raw.to_string(),
    };

    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (scheme, rest) = trimmed.split_once("://").unwrap_or(("http", trimmed));
    let rest = rest.trim_end_matches('/');

    if rest.is_empty() || !matches!(scheme, "http" | "https") {
        return Err(invalid());
    }

    Ok(format!("{scheme}://{rest}"))
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn validate_postcode(&self, postcode: &str) -> Result<(), BackendError> {
        let url = self.url("/postcodes/validate");
        log::debug!("POST {url} ({postcode})");

        let response = self
            .client
            .post(&url)
            .json(&PostcodeBody {
                postcode: postcode.to_string(),
            })
            .send()
            .await?;

        ensure_success(response).map(|_| ())
    }

    async fn search_postcode(&self, postcode: &str) -> Result<serde_json::Value, BackendError> {
        let url = self.url("/search");
        log::debug!("POST {url} ({postcode})");

        let response = self
            .client
            .post(&url)
            .json(&PostcodeBody {
                postcode: postcode.to_string(),
            })
            .send()
            .await?;

        Ok(ensure_success(response)?.json().await?)
    }

    async fn search_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<serde_json::Value, BackendError> {
        let url = self.url("/search");
        log::debug!("GET {url} ({latitude}, {longitude})");

        let response = self
            .client
            .get(&url)
            .query(&[("latitude", latitude), ("longitude", longitude)])
            .send()
            .await?;

        Ok(ensure_success(response)?.json().await?)
    }

    async fn health(&self) -> Result<serde_json::Value, BackendError> {
        let url = self.url("/health");
        log::debug!("GET {url}");

        let response = self.client.get(&url).send().await?;

        Ok(ensure_success(response)?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// Answers a single request with `status_line` and a JSON `body`.
    /// Returns the base URL to point a client at.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    /// Accepts a single request and never answers it.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            std::future::pending::<()>().await;
            drop(socket);
        });

        format!("http://{addr}")
    }

    /// Reads headers and a `content-length` body.
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request);
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                let length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if body.len() >= length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let base = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let backend = HttpBackend::new(&base, Duration::from_secs(5)).unwrap();

        let err = backend.health().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        match err {
            BackendError::Status { url, .. } => assert_eq!(url, format!("{base}/health")),
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_postcode_is_a_status_error() {
        let base = serve_once("404 Not Found", r#"{"error":"Invalid postcode"}"#).await;
        let backend = HttpBackend::new(&base, Duration::from_secs(5)).unwrap();

        let err = backend.validate_postcode("ZZ1 1ZZ").await.unwrap_err();
        assert!(
            matches!(err, BackendError::Status { status: 404, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn success_returns_the_body() {
        let base = serve_once("200 OK", r#"{"status":"healthy"}"#).await;
        let backend = HttpBackend::new(&base, Duration::from_secs(5)).unwrap();

        let body = backend.search_postcode("SW1A 2AA").await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn slow_backend_times_out_as_http_error() {
        let base = serve_silence().await;
        let backend = HttpBackend::new(&base, Duration::from_millis(200)).unwrap();

        let err = backend.health().await.unwrap_err();
        assert_eq!(err.status(), None);
        match err {
            BackendError::Http(e) => assert!(e.is_timeout(), "{e:?}"),
            other => panic!("expected an HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = backend.search_coordinates(51.5, -0.12).await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)), "{err:?}");
    }

    #[test]
    fn bare_host_gets_http_scheme() {
        assert_eq!(
            normalize_base_url("localhost:3000").unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn trailing_slashes_and_whitespace_are_trimmed() {
        assert_eq!(
            normalize_base_url("  https://api.example.org/v1/ ").unwrap(),
            "https://api.example.org/v1"
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        for raw in ["", "   ", "ftp://example.org", "http://", "local host:80"] {
            assert!(
                matches!(
                    normalize_base_url(raw),
                    Err(BackendError::InvalidUrl { .. })
                ),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn builds_endpoint_urls() {
        let backend = HttpBackend::new("127.0.0.1:4000/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:4000");
        assert_eq!(
            backend.url("/postcodes/validate"),
            "http://127.0.0.1:4000/postcodes/validate"
        );
    }
}
