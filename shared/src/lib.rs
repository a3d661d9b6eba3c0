//! Shared library for the NASA astronomy MCP Lambda.
//!
//! This crate provides configuration, bearer authentication, the upstream
//! clients (APOD, solar-system bodies, image download), the tool dispatcher
//! and the JSON-RPC envelope. The Lambda binary only wires them together.

pub mod apod;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod image;
pub mod models;
pub mod planets;
pub mod rpc;
pub mod secrets;
pub mod tools;
pub mod upstream;

pub use auth::{extract_bearer, validate_token};
pub use config::Config;
pub use error::{Error, Result};
pub use http::handle_request;
pub use models::{ApodResult, PlanetResult};
pub use tools::{Dispatcher, Tool, ToolOutput, ToolRequest};
pub use upstream::{HttpUpstream, Upstream};
