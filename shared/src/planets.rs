//! Solar-system bodies client (api.le-systeme-solaire.net).

use serde::Deserialize;
use tracing::{debug, info};

use crate::models::PlanetResult;
use crate::upstream::error_from_response;
use crate::{Error, Result};

const PROVIDER: &str = "Solar System OpenData";

/// A body from the catalog. Only the fields we use are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarBody {
    /// Provider id, the lowercase French name ("mars", "lune")
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub english_name: String,
    pub is_planet: Option<bool>,
    pub body_type: Option<String>,
    pub gravity: Option<f64>,
    pub density: Option<f64>,
    /// Null for bodies without moons
    pub moons: Option<Vec<MoonRef>>,
}

/// Moon reference inside a body entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MoonRef {
    pub moon: String,
}

impl SolarBody {
    /// Whether this body answers to the already-normalized `name`.
    fn matches(&self, name: &str) -> bool {
        self.english_name.trim().to_lowercase() == name || self.id.trim().to_lowercase() == name
    }
}

impl From<&SolarBody> for PlanetResult {
    fn from(body: &SolarBody) -> Self {
        let is_planet = body
            .is_planet
            .unwrap_or_else(|| body.body_type.as_deref() == Some("Planet"));

        Self {
            name: if body.english_name.is_empty() {
                body.id.clone()
            } else {
                body.english_name.clone()
            },
            is_planet,
            gravity: body.gravity,
            density: body.density,
            moons: body
                .moons
                .iter()
                .flatten()
                .map(|m| m.moon.clone())
                .collect(),
        }
    }
}

/// Catalog payload: normally `{"bodies": [...]}`, a bare array is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Catalog {
    Wrapped { bodies: Vec<SolarBody> },
    Bare(Vec<SolarBody>),
}

impl Catalog {
    fn into_bodies(self) -> Vec<SolarBody> {
        match self {
            Catalog::Wrapped { bodies } | Catalog::Bare(bodies) => bodies,
        }
    }
}

/// Normalize a caller-supplied body name for matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive linear scan of the catalog.
///
/// English names are matched before provider ids.
pub fn find_body(bodies: &[SolarBody], name: &str) -> Result<PlanetResult> {
    let wanted = normalize_name(name);

    bodies
        .iter()
        .find(|b| b.english_name.trim().to_lowercase() == wanted)
        .or_else(|| bodies.iter().find(|b| b.matches(&wanted)))
        .map(PlanetResult::from)
        .ok_or_else(|| {
            Error::NotFound(format!(
                "No solar-system body named '{}'. Try: mercury, venus, earth, mars, jupiter, saturn, uranus, neptune",
                name.trim()
            ))
        })
}

/// Client for the bodies catalog.
pub struct PlanetsClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlanetsClient {
    /// Create a new catalog client.
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Fetch every body in one request; the provider cannot filter by name.
    pub async fn fetch_bodies(&self) -> Result<Vec<SolarBody>> {
        debug!("Requesting solar-system bodies catalog");

        let response = self
            .http
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest(PROVIDER, e))?;

        let bodies = parse_catalog(&body).map_err(|e| Error::Upstream {
            provider: PROVIDER,
            status: Some(status),
            message: format!("Malformed catalog: {}", e),
        })?;

        info!(count = bodies.len(), "Fetched solar-system bodies catalog");
        Ok(bodies)
    }
}

fn parse_catalog(body: &str) -> std::result::Result<Vec<SolarBody>, serde_json::Error> {
    serde_json::from_str::<Catalog>(body).map(Catalog::into_bodies)
}
