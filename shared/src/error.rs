//! Error types for the NASA astronomy tool server.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a tool call.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error (startup only)
    #[error("AWS error: {0}")]
    Aws(String),

    /// Missing or incorrect bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed or out-of-range tool input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider answered with a non-success status or an unparseable body
    #[error("{provider} error{}: {message}", http_status_suffix(.status))]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Timeout or connection failure reaching a provider
    #[error("Network error reaching {provider}: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn http_status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl Error {
    /// Classify a transport failure from `reqwest` for the given provider.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return Error::Network {
                provider,
                message: err.to_string(),
            };
        }

        Error::Upstream {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    /// Stable machine-readable kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthorized(_) => "unauthorized",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::Upstream { .. } => "upstream_error",
            Error::Network { .. } => "network_error",
            Error::Config(_) | Error::Aws(_) | Error::Serialization(_) => "internal",
        }
    }

    /// JSON-RPC error code for this error.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Error::Unauthorized(_) => -32001,
            Error::InvalidArgument(_) => -32602,
            Error::NotFound(_) => -32002,
            Error::Upstream { .. } => -32003,
            Error::Network { .. } => -32004,
            _ => -32603,
        }
    }

    /// Get HTTP status code for this error.
    ///
    /// Only authentication failures change the transport status; every other
    /// tool failure travels inside a 200 JSON-RPC error response.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unauthorized(_) => 401,
            _ => 200,
        }
    }
}
