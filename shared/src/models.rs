//! Result shapes returned to callers.

use serde::{Deserialize, Serialize};

/// Normalized Astronomy Picture of the Day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApodResult {
    pub title: String,
    /// ISO calendar date (YYYY-MM-DD)
    pub date: String,
    pub explanation: String,
    /// "image", "video" or whatever else the provider reports
    pub media_type: String,
    pub url: Option<String>,
    pub hdurl: Option<String>,
    /// Provider thumbnail, set for video entries
    pub thumbnail: Option<String>,
    pub copyright: Option<String>,
    /// Base64 image bytes; null when not an image or the fetch failed
    pub image_base64: Option<String>,
}

impl ApodResult {
    /// The URL worth downloading for an image entry, preferring high resolution.
    pub fn image_source(&self) -> Option<&str> {
        if self.media_type != "image" {
            return None;
        }

        [self.hdurl.as_deref(), self.url.as_deref()]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty())
    }
}

/// Physical facts about a solar-system body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetResult {
    pub name: String,
    pub is_planet: bool,
    /// Surface gravity in m/s²; null when the provider does not know it
    pub gravity: Option<f64>,
    /// Density in g/cm³; null when the provider does not know it
    pub density: Option<f64>,
    /// Moon names in provider order
    pub moons: Vec<String>,
}
