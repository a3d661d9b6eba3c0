//! Configuration management for the tool server.

use std::env;
use std::time::Duration;

use tracing::info;

use crate::secrets;
use crate::{Error, Result};

/// Default astronomy-picture endpoint.
pub const DEFAULT_APOD_BASE_URL: &str = "https://api.nasa.gov/planetary/apod";
/// Default solar-system bodies catalog endpoint.
pub const DEFAULT_SOLAR_SYSTEM_BASE_URL: &str = "https://api.le-systeme-solaire.net/rest/bodies/";
/// Default server name reported by `initialize`.
pub const DEFAULT_SERVER_NAME: &str = "NASA Astronomy MCP Server";

const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
///
/// Built once at cold start and shared read-only for the lifetime of the
/// process.
#[derive(Clone)]
pub struct Config {
    /// Secret every caller must present as a bearer token
    pub auth_token: String,
    /// Identifier string returned by the `validate` tool
    pub my_number: String,
    /// NASA API key for the APOD endpoint
    pub nasa_api_key: String,
    /// APOD endpoint
    pub apod_base_url: String,
    /// Solar-system bodies catalog endpoint
    pub solar_system_base_url: String,
    /// Bound on every outbound request
    pub upstream_timeout: Duration,
    /// Largest image body we are willing to buffer
    pub max_image_bytes: usize,
    pub server_name: String,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("auth_token", &"<redacted>")
            .field("my_number", &self.my_number)
            .field("nasa_api_key", &"<redacted>")
            .field("apod_base_url", &self.apod_base_url)
            .field("solar_system_base_url", &self.solar_system_base_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration, resolving the auth token from Secrets Manager when
    /// only `AUTH_TOKEN_SECRET_ARN` is set.
    pub async fn load() -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok();

        if non_empty(&lookup, "AUTH_TOKEN").is_none() {
            if let Some(arn) = non_empty(&lookup, "AUTH_TOKEN_SECRET_ARN") {
                info!(secret_arn = %arn, "Resolving auth token from Secrets Manager");
                let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let client = aws_sdk_secretsmanager::Client::new(&aws);
                let token = secrets::get_auth_token(&client, &arn).await?;
                return Self::from_lookup(|key| match key {
                    "AUTH_TOKEN" => Some(token.clone()),
                    _ => lookup(key),
                });
            }
        }

        Self::from_lookup(lookup)
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            non_empty(&lookup, key)
                .ok_or_else(|| Error::Config(format!("{} must be set", key)))
        };

        let upstream_timeout_secs = match non_empty(&lookup, "UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => parse_positive::<u64>("UPSTREAM_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let max_image_bytes = match non_empty(&lookup, "MAX_IMAGE_BYTES") {
            Some(raw) => parse_positive::<usize>("MAX_IMAGE_BYTES", &raw)?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        Ok(Self {
            auth_token: required("AUTH_TOKEN")?,
            my_number: required("MY_NUMBER")?,
            nasa_api_key: required("NASA_API_KEY")?,
            apod_base_url: non_empty(&lookup, "APOD_BASE_URL")
                .unwrap_or_else(|| DEFAULT_APOD_BASE_URL.to_string()),
            solar_system_base_url: non_empty(&lookup, "SOLAR_SYSTEM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SOLAR_SYSTEM_BASE_URL.to_string()),
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            max_image_bytes,
            server_name: non_empty(&lookup, "SERVER_NAME")
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(Error::Config(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}
