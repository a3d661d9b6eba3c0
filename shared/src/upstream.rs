//! Outbound provider access shared by the tool handlers.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::apod::ApodClient;
use crate::image::ImageFetcher;
use crate::models::ApodResult;
use crate::planets::{PlanetsClient, SolarBody};
use crate::{Config, Error, Result};

/// The three outbound calls the tools can make.
///
/// `HttpUpstream` is the production implementation; tests substitute a stub
/// to count calls and script responses.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch APOD metadata for a date, or the most recent entry.
    async fn apod(&self, date: Option<NaiveDate>) -> Result<ApodResult>;

    /// Fetch the full solar-system bodies catalog.
    async fn bodies(&self) -> Result<Vec<SolarBody>>;

    /// Download raw image bytes.
    async fn image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production upstream backed by one pooled `reqwest` client.
pub struct HttpUpstream {
    apod: ApodClient,
    planets: PlanetsClient,
    images: ImageFetcher,
}

impl HttpUpstream {
    /// Create the clients from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = build_http_client(config)?;

        Ok(Self {
            apod: ApodClient::new(
                http.clone(),
                config.apod_base_url.clone(),
                config.nasa_api_key.clone(),
            ),
            planets: PlanetsClient::new(http.clone(), config.solar_system_base_url.clone()),
            images: ImageFetcher::new(http, config.max_image_bytes),
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn apod(&self, date: Option<NaiveDate>) -> Result<ApodResult> {
        self.apod.fetch(date).await
    }

    async fn bodies(&self) -> Result<Vec<SolarBody>> {
        self.planets.fetch_bodies().await
    }

    async fn image(&self, url: &str) -> Result<Vec<u8>> {
        self.images.fetch(url).await
    }
}

/// Build the shared outbound HTTP client with the configured timeout.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .user_agent(concat!("nasa-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Error bodies the providers are known to send.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderErrorBody {
    /// `{"code": 400, "msg": "..."}`
    Msg { msg: String },
    /// `{"error": {"code": "...", "message": "..."}}`
    Nested { error: NestedError },
    /// `{"message": "..."}`
    Message { message: String },
}

#[derive(Debug, Deserialize)]
struct NestedError {
    message: String,
}

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Turn a non-success provider response into an `Error::Upstream`.
pub async fn error_from_response(provider: &'static str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    Error::Upstream {
        provider,
        status: Some(status.as_u16()),
        message: provider_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
    }
}

fn provider_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ProviderErrorBody>(body) {
        return Some(match parsed {
            ProviderErrorBody::Msg { msg } => msg,
            ProviderErrorBody::Nested { error } => error.message,
            ProviderErrorBody::Message { message } => message,
        });
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Client with a short timeout for loopback tests.
    pub fn test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    /// Raw HTTP/1.1 response with a fixed-length body.
    pub fn http_response(status: &str, body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .into_bytes()
    }

    /// Answer one connection on a loopback port with `response`.
    ///
    /// Returns the base URL and a handle that resolves to the request head.
    pub async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            // The client may hang up early, e.g. on an oversized Content-Length.
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&head).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    /// Accept connections and never answer.
    pub async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        format!("http://{}", addr)
    }

    /// URL of a loopback port nothing listens on.
    pub async fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_error_from_response_uses_status_and_body() {
        let (url, _) = serve_once(http_response(
            "502 Bad Gateway",
            r#"{"error":{"code":"BAD","message":"backend down"}}"#,
        ))
        .await;

        let response = test_client().get(&url).send().await.unwrap();
        let err = error_from_response("APOD", response).await;
        assert_eq!(err.kind(), "upstream_error");
        assert_eq!(err.to_string(), "APOD error (HTTP 502): backend down");
    }

    #[tokio::test]
    async fn test_http_upstream_reads_configured_catalog() {
        let (url, request) = serve_once(http_response(
            "200 OK",
            r#"{"bodies": [{"id": "mars", "englishName": "Mars", "isPlanet": true,
                "gravity": 3.711, "density": 3.93, "moons": [{"moon": "Phobos"}]}]}"#,
        ))
        .await;

        let mut config = crate::tools::tests::test_config();
        config.solar_system_base_url = format!("{}/rest/bodies/", url);
        let upstream = HttpUpstream::new(&config).unwrap();

        let bodies = upstream.bodies().await.unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].english_name, "Mars");

        let head = request.await.unwrap();
        assert!(head.starts_with("GET /rest/bodies/ HTTP/1.1"), "{}", head);
        assert!(head.to_ascii_lowercase().contains("user-agent: nasa-mcp/"), "{}", head);
    }

    #[test]
    fn test_provider_message_shapes() {
        assert_eq!(
            provider_message(r#"{"code":400,"msg":"Date must be between Jun 16, 1995 and Oct 16, 2026.","service_version":"v1"}"#),
            Some("Date must be between Jun 16, 1995 and Oct 16, 2026.".to_string())
        );
        assert_eq!(
            provider_message(r#"{"error":{"code":"API_KEY_INVALID","message":"An invalid api_key was supplied."}}"#),
            Some("An invalid api_key was supplied.".to_string())
        );
        assert_eq!(
            provider_message("<html>Bad Gateway</html>"),
            Some("<html>Bad Gateway</html>".to_string())
        );
        assert_eq!(provider_message("  "), None);
    }

    #[test]
    fn test_provider_message_truncates_long_bodies() {
        let body = "x".repeat(1000);
        assert_eq!(provider_message(&body).unwrap().len(), MAX_ERROR_BODY_CHARS);
    }
}
