//! Editor configuration.
//!
//! Every field has a default matching the public French base maps and the
//! national address API, so an empty JSON object is a valid config.

use carte_core::LonLat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ORTHO_STYLE_URL: &str = "https://raw.githubusercontent.com/etalab/cadastre.data.gouv.fr/master/components/react-map-gl/styles/ortho.json";
pub const VECTOR_STYLE_URL: &str = "https://raw.githubusercontent.com/etalab/cadastre.data.gouv.fr/master/components/react-map-gl/styles/vector.json";
pub const ADDRESS_SEARCH_ENDPOINT: &str = "https://api-adresse.data.gouv.fr/search/";
/// Upper bound on `search_cache_capacity`.
pub const MAX_SEARCH_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid editor config: {0}")]
    Invalid(String),
}

/// Which draw tools the map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawControls {
    pub point: bool,
    pub line_string: bool,
    pub polygon: bool,
    pub trash: bool,
}

impl Default for DrawControls {
    fn default() -> Self {
        Self {
            point: true,
            line_string: true,
            polygon: true,
            trash: true,
        }
    }
}

/// Configuration for a map editor instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Center before any bounds fit or search. Default: mainland France.
    pub initial_center: LonLat,
    pub initial_zoom: f64,
    /// Zoom applied when the user picks an address. Default: **17**.
    pub search_zoom: f64,
    /// Padding in pixels around the initial collection's bbox.
    pub fit_bounds_padding: u32,
    pub ortho_style_url: String,
    pub vector_style_url: String,
    pub search_endpoint: String,
    /// Maximum results requested per address search. Default: **5**.
    pub search_limit: usize,
    /// Cached address searches kept per editor; 0 disables the cache.
    pub search_cache_capacity: usize,
    /// Trimmed terms shorter than this never hit the network.
    pub min_query_len: usize,
    pub draw_controls: DrawControls,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_center: LonLat::new(1.7, 46.9),
            initial_zoom: 5.0,
            search_zoom: 17.0,
            fit_bounds_padding: 100,
            ortho_style_url: ORTHO_STYLE_URL.to_string(),
            vector_style_url: VECTOR_STYLE_URL.to_string(),
            search_endpoint: ADDRESS_SEARCH_ENDPOINT.to_string(),
            search_limit: 5,
            search_cache_capacity: 64,
            min_query_len: 2,
            draw_controls: DrawControls::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed JSON, a zero search limit, a cache
    /// capacity above `MAX_SEARCH_CACHE_CAPACITY`, or a zoom outside `0..=24`.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_limit == 0 {
            return Err(ConfigError::Invalid("search_limit must be at least 1".into()));
        }
        if self.search_cache_capacity > MAX_SEARCH_CACHE_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "search_cache_capacity must be at most {MAX_SEARCH_CACHE_CAPACITY}, got {}",
                self.search_cache_capacity
            )));
        }
        for (name, zoom) in [
            ("initial_zoom", self.initial_zoom),
            ("search_zoom", self.search_zoom),
        ] {
            if !(0.0..=24.0).contains(&zoom) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0..=24, got {zoom}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.search_zoom, 17.0);
        assert_eq!(config.initial_center, LonLat::new(1.7, 46.9));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = EditorConfig::from_json(
            r#"{ "search_limit": 10, "draw_controls": { "point": false } }"#,
        )
        .unwrap();
        assert_eq!(config.search_limit, 10);
        assert!(!config.draw_controls.point);
        assert!(config.draw_controls.polygon);
        assert_eq!(config.search_endpoint, ADDRESS_SEARCH_ENDPOINT);
    }

    #[test]
    fn zero_limit_is_invalid() {
        let err = EditorConfig::from_json(r#"{ "search_limit": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_cache_capacity_is_invalid() {
        let err = EditorConfig::from_json(r#"{ "search_cache_capacity": 18446744073709551615 }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(
            EditorConfig::from_json(&format!(
                r#"{{ "search_cache_capacity": {MAX_SEARCH_CACHE_CAPACITY} }}"#
            ))
            .is_ok()
        );
    }

    #[test]
    fn out_of_range_zoom_is_invalid() {
        assert!(EditorConfig::from_json(r#"{ "search_zoom": 30 }"#).is_err());
    }
}
