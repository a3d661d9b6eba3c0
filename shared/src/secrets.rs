//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;

use crate::{Error, Result};

/// JSON shape accepted for the auth token secret.
#[derive(Debug, Deserialize)]
struct AuthTokenSecret {
    token: String,
}

/// Get a secret string value from Secrets Manager.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    response
        .secret_string()
        .map(str::to_string)
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))
}

/// Get the bearer token secret, stored either as a plain string or as
/// `{"token": "..."}`.
pub async fn get_auth_token(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_auth_token(&secret_string)
}

fn parse_auth_token(secret_string: &str) -> Result<String> {
    let trimmed = secret_string.trim();

    let token = if trimmed.starts_with('{') {
        serde_json::from_str::<AuthTokenSecret>(trimmed)
            .map_err(|e| Error::Aws(format!("Failed to parse auth token secret: {}", e)))?
            .token
    } else {
        trimmed.to_string()
    };

    if token.trim().is_empty() {
        return Err(Error::Config("Auth token secret is empty".to_string()));
    }

    Ok(token)
}
