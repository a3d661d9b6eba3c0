//! NASA Astronomy Picture of the Day client.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::ApodResult;
use crate::upstream::error_from_response;
use crate::{Error, Result};

const PROVIDER: &str = "APOD";

/// Earliest date the APOD archive serves.
pub fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
}

/// APOD entry as returned by api.nasa.gov.
#[derive(Debug, Deserialize)]
struct ApodResponse {
    title: Option<String>,
    date: String,
    #[serde(default)]
    explanation: String,
    media_type: String,
    url: Option<String>,
    hdurl: Option<String>,
    thumbnail_url: Option<String>,
    copyright: Option<String>,
}

impl From<ApodResponse> for ApodResult {
    fn from(raw: ApodResponse) -> Self {
        Self {
            title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
            date: raw.date,
            explanation: raw.explanation,
            media_type: raw.media_type,
            url: raw.url,
            hdurl: raw.hdurl,
            thumbnail: raw.thumbnail_url,
            copyright: raw.copyright.map(|c| c.trim().to_string()),
            image_base64: None,
        }
    }
}

/// Client for the APOD endpoint.
pub struct ApodClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApodClient {
    /// Create a new APOD client.
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    /// Fetch the entry for `date`, or the most recent one when `None`.
    pub async fn fetch(&self, date: Option<NaiveDate>) -> Result<ApodResult> {
        let mut query = vec![
            ("api_key", self.api_key.clone()),
            ("thumbs", "true".to_string()),
        ];
        if let Some(date) = date {
            query.push(("date", date.format("%Y-%m-%d").to_string()));
        }

        debug!(date = ?date, "Requesting APOD metadata");

        let response = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(PROVIDER, e.without_url()))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest(PROVIDER, e.without_url()))?;

        let result = parse_apod(&body).map_err(|e| Error::Upstream {
            provider: PROVIDER,
            status: Some(status),
            message: format!("Malformed response: {}", e),
        })?;

        info!(date = %result.date, media_type = %result.media_type, "Fetched APOD metadata");
        Ok(result)
    }
}

fn parse_apod(body: &str) -> std::result::Result<ApodResult, serde_json::Error> {
    serde_json::from_str::<ApodResponse>(body).map(ApodResult::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::tests::{
        http_response, refused_url, serve_once, serve_silence, test_client,
    };

    #[test]
    fn test_parse_image_entry() {
        let body = r#"{
            "copyright": "\nJohn Doe\n",
            "date": "2024-03-10",
            "explanation": "A galaxy far away.",
            "hdurl": "https://apod.nasa.gov/apod/image/2403/galaxy_hd.jpg",
            "media_type": "image",
            "service_version": "v1",
            "title": "Distant Galaxy",
            "url": "https://apod.nasa.gov/apod/image/2403/galaxy.jpg"
        }"#;

        let result = parse_apod(body).unwrap();
        assert_eq!(result.title, "Distant Galaxy");
        assert_eq!(result.date, "2024-03-10");
        assert_eq!(result.media_type, "image");
        assert_eq!(
            result.hdurl.as_deref(),
            Some("https://apod.nasa.gov/apod/image/2403/galaxy_hd.jpg")
        );
        assert_eq!(result.copyright.as_deref(), Some("John Doe"));
        assert_eq!(result.thumbnail, None);
        assert_eq!(result.image_base64, None);
    }

    #[test]
    fn test_parse_video_entry_with_thumbnail() {
        let body = r#"{
            "date": "2024-03-11",
            "explanation": "A launch.",
            "media_type": "video",
            "thumbnail_url": "https://img.youtube.com/vi/abc/0.jpg",
            "url": "https://www.youtube.com/embed/abc"
        }"#;

        let result = parse_apod(body).unwrap();
        assert_eq!(result.title, "Untitled");
        assert_eq!(result.media_type, "video");
        assert_eq!(
            result.thumbnail.as_deref(),
            Some("https://img.youtube.com/vi/abc/0.jpg")
        );
        assert_eq!(result.hdurl, None);
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        assert!(parse_apod("not json").is_err());
        assert!(parse_apod(r#"{"title": "missing date"}"#).is_err());
    }

    #[test]
    fn test_earliest_date() {
        assert_eq!(earliest_date().to_string(), "1995-06-16");
    }

    fn client(base_url: String) -> ApodClient {
        ApodClient::new(test_client(), base_url, "DEMO_KEY".to_string())
    }

    #[tokio::test]
    async fn test_fetch_sends_key_thumbs_and_date() {
        let (url, request) = serve_once(http_response(
            "200 OK",
            r#"{"date": "2024-03-10", "title": "Distant Galaxy", "explanation": "x",
                "media_type": "image", "url": "https://apod.nasa.gov/a.jpg"}"#,
        ))
        .await;

        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let result = client(url).fetch(Some(date)).await.unwrap();
        assert_eq!(result.title, "Distant Galaxy");
        assert_eq!(result.url.as_deref(), Some("https://apod.nasa.gov/a.jpg"));

        let head = request.await.unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.contains("api_key=DEMO_KEY"), "{}", request_line);
        assert!(request_line.contains("thumbs=true"), "{}", request_line);
        assert!(request_line.contains("date=2024-03-10"), "{}", request_line);
    }

    #[tokio::test]
    async fn test_fetch_latest_omits_date() {
        let (url, request) = serve_once(http_response(
            "200 OK",
            r#"{"date": "2024-03-11", "media_type": "video", "url": "https://youtu.be/x"}"#,
        ))
        .await;

        client(url).fetch(None).await.unwrap();
        let head = request.await.unwrap();
        assert!(!head.lines().next().unwrap().contains("date="));
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_upstream_error_with_status() {
        let (url, _) = serve_once(http_response(
            "400 Bad Request",
            r#"{"code": 400, "msg": "Date must be between Jun 16, 1995 and today.", "service_version": "v1"}"#,
        ))
        .await;

        let err = client(url).fetch(None).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: Some(400), .. }), "{:?}", err);
        assert_eq!(err.kind(), "upstream_error");
        assert_eq!(
            err.to_string(),
            "APOD error (HTTP 400): Date must be between Jun 16, 1995 and today."
        );
    }

    #[tokio::test]
    async fn test_fetch_malformed_success_body_is_upstream_error() {
        let (url, _) = serve_once(http_response("200 OK", "<html>maintenance</html>")).await;

        let err = client(url).fetch(None).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: Some(200), .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        let err = client(refused_url().await).fetch(None).await.unwrap_err();
        assert_eq!(err.kind(), "network_error");
        assert!(!err.to_string().contains("DEMO_KEY"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_error() {
        let err = client(serve_silence().await).fetch(None).await.unwrap_err();
        assert!(matches!(err, Error::Network { provider: "APOD", .. }), "{:?}", err);
    }
}
