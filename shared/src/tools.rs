//! Tool registry and dispatcher.
//!
//! Every call is authenticated, parsed into a [`ToolRequest`] and routed to
//! exactly one handler. Handlers return one result or one error; the only
//! downgrade is a failed image download, which leaves `image_base64` null.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::apod::earliest_date;
use crate::auth::validate_token;
use crate::image::encode_image;
use crate::models::{ApodResult, PlanetResult};
use crate::planets::{find_body, normalize_name};
use crate::upstream::Upstream;
use crate::{Config, Error, Result};

/// The tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Validate,
    GetApodWithImage,
    GetPlanet,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Validate, Tool::GetApodWithImage, Tool::GetPlanet];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Validate => "validate",
            Tool::GetApodWithImage => "get_apod_with_image",
            Tool::GetPlanet => "get_planet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Listing entry with a JSON Schema for the arguments.
    pub fn definition(self) -> ToolDefinition {
        let (description, input_schema) = match self {
            Tool::Validate => (
                "Confirm the server is reachable and the caller is authenticated",
                json!({ "type": "object", "properties": {} }),
            ),
            Tool::GetApodWithImage => (
                "Get NASA Astronomy Picture of the Day with image data",
                json!({
                    "type": "object",
                    "properties": {
                        "date": {
                            "type": "string",
                            "description": "Date in YYYY-MM-DD format (optional)",
                            "format": "date"
                        }
                    }
                }),
            ),
            Tool::GetPlanet => (
                "Get planetary information",
                json!({
                    "type": "object",
                    "properties": {
                        "planet_name": {
                            "type": "string",
                            "description": "Planet name (e.g., mars, jupiter)"
                        }
                    },
                    "required": ["planet_name"]
                }),
            ),
        };

        ToolDefinition {
            name: self.name(),
            description,
            input_schema,
        }
    }
}

/// Entry in a `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// A parsed, argument-checked tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Validate,
    GetApodWithImage { date: Option<NaiveDate> },
    GetPlanet { planet_name: String },
}

#[derive(Debug, Deserialize)]
struct ApodArgs {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanetArgs {
    planet_name: String,
}

impl ToolRequest {
    /// Parse a tool name and its argument object.
    ///
    /// Date range checks need "today" and happen at dispatch time.
    pub fn parse(name: &str, arguments: Map<String, Value>) -> Result<Self> {
        let tool = Tool::from_name(name)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown tool: {}", name)))?;

        match tool {
            Tool::Validate => Ok(ToolRequest::Validate),
            Tool::GetApodWithImage => {
                let args: ApodArgs = parse_args(tool, arguments)?;
                let date = match args.date.as_deref().map(str::trim) {
                    None | Some("") => None,
                    Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                        Error::InvalidArgument(format!(
                            "date must be in YYYY-MM-DD format, got '{}'",
                            raw
                        ))
                    })?),
                };
                Ok(ToolRequest::GetApodWithImage { date })
            }
            Tool::GetPlanet => {
                let args: PlanetArgs = parse_args(tool, arguments)?;
                if args.planet_name.trim().is_empty() {
                    return Err(Error::InvalidArgument(
                        "planet_name must not be empty".to_string(),
                    ));
                }
                Ok(ToolRequest::GetPlanet {
                    planet_name: args.planet_name,
                })
            }
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            ToolRequest::Validate => Tool::Validate,
            ToolRequest::GetApodWithImage { .. } => Tool::GetApodWithImage,
            ToolRequest::GetPlanet { .. } => Tool::GetPlanet,
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: Tool, arguments: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| {
        Error::InvalidArgument(format!("Invalid arguments for {}: {}", tool.name(), e))
    })
}

/// Reject dates the archive cannot serve.
pub fn validate_apod_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(Error::InvalidArgument(format!(
            "date {} is in the future (today is {})",
            date, today
        )));
    }

    let earliest = earliest_date();
    if date < earliest {
        return Err(Error::InvalidArgument(format!(
            "date {} is before the first APOD ({})",
            date, earliest
        )));
    }

    Ok(())
}

/// What a tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Apod(ApodResult),
    Planet(PlanetResult),
}

impl ToolOutput {
    /// JSON form used for structured content.
    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            ToolOutput::Text(text) => Value::String(text.clone()),
            ToolOutput::Apod(apod) => serde_json::to_value(apod)?,
            ToolOutput::Planet(planet) => serde_json::to_value(planet)?,
        })
    }
}

/// Authenticates and routes tool calls.
pub struct Dispatcher {
    config: Arc<Config>,
    upstream: Arc<dyn Upstream>,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check the caller's bearer token against the configured secret.
    pub fn authorize(&self, token: Option<&str>) -> Result<()> {
        validate_token(token, &self.config.auth_token)
    }

    /// Authenticate, parse and run one tool call.
    pub async fn dispatch(
        &self,
        token: Option<&str>,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput> {
        self.authorize(token)?;
        let request = ToolRequest::parse(name, arguments)?;
        let tool = request.tool().name();

        let started = Instant::now();
        let result = self.run(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(tool, elapsed_ms, "Tool call succeeded"),
            Err(e) => warn!(tool, kind = e.kind(), elapsed_ms, error = %e, "Tool call failed"),
        }

        result
    }

    async fn run(&self, request: ToolRequest) -> Result<ToolOutput> {
        match request {
            ToolRequest::Validate => Ok(ToolOutput::Text(self.config.my_number.clone())),
            ToolRequest::GetApodWithImage { date } => {
                self.get_apod_with_image(date).await.map(ToolOutput::Apod)
            }
            ToolRequest::GetPlanet { planet_name } => {
                self.get_planet(&planet_name).await.map(ToolOutput::Planet)
            }
        }
    }

    async fn get_apod_with_image(&self, date: Option<NaiveDate>) -> Result<ApodResult> {
        if let Some(date) = date {
            validate_apod_date(date, Utc::now().date_naive())?;
        }

        let mut apod = self.upstream.apod(date).await?;

        if let Some(source) = apod.image_source().map(str::to_string) {
            match self.upstream.image(&source).await {
                Ok(bytes) => apod.image_base64 = Some(encode_image(&bytes)),
                Err(e) => {
                    warn!(url = %source, error = %e, "Image download failed, returning metadata only");
                }
            }
        }

        Ok(apod)
    }

    async fn get_planet(&self, planet_name: &str) -> Result<PlanetResult> {
        let bodies = self.upstream.bodies().await?;
        info!(name = %normalize_name(planet_name), "Looking up solar-system body");
        find_body(&bodies, planet_name)
    }
}
