//! Image download and base64 encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use tracing::debug;

use crate::upstream::error_from_response;
use crate::{Error, Result};

const PROVIDER: &str = "image host";

/// Encode raw image bytes for embedding in a JSON value.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Downloads images with a hard cap on the body size.
pub struct ImageFetcher {
    http: reqwest::Client,
    max_bytes: usize,
}

impl ImageFetcher {
    /// Create a fetcher that refuses bodies larger than `max_bytes`.
    pub fn new(http: reqwest::Client, max_bytes: usize) -> Self {
        Self { http, max_bytes }
    }

    /// Download `url` in full. Non-success status, an empty body, or a body
    /// over the cap is an error.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = check_scheme(url)?;

        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        check_declared_length(response.content_length(), self.max_bytes)?;

        let mut bytes = Vec::with_capacity(
            response
                .content_length()
                .map_or(0, |len| len as usize)
                .min(self.max_bytes),
        );
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::from_reqwest(PROVIDER, e))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large(self.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(Error::Upstream {
                provider: PROVIDER,
                status: None,
                message: "Empty image body".to_string(),
            });
        }

        debug!(url = %url, size = bytes.len(), "Downloaded image");
        Ok(bytes)
    }
}

fn check_scheme(raw: &str) -> Result<Url> {
    let unsupported = || Error::InvalidArgument(format!("Unsupported image URL: {}", raw));

    let url = Url::parse(raw).map_err(|_| unsupported())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(unsupported()),
    }
}

fn check_declared_length(content_length: Option<u64>, max_bytes: usize) -> Result<()> {
    match content_length {
        Some(len) if len > max_bytes as u64 => Err(too_large(max_bytes)),
        _ => Ok(()),
    }
}

fn too_large(max_bytes: usize) -> Error {
    Error::Upstream {
        provider: PROVIDER,
        status: None,
        message: format!("Image exceeds {} byte limit", max_bytes),
    }
}
