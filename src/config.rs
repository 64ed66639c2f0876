//! Scene configuration
//!
//! Everything the core needs is read once at construction. Files are JSON;
//! every section has defaults so a partial file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::atmosphere::AtmosphereConfig;
use crate::seeds::SceneSeeds;
use crate::shoreline::ShorelineDescriptor;
use crate::terrain::TerrainConfig;
use crate::time_of_day::{SkyConfig, TimeConfig};
use crate::water::WaterConfig;
use crate::water_sync::WaterPalette;

/// Complete scene configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Master seed; random when absent
    pub seed: Option<u64>,
    pub terrain: TerrainConfig,
    pub shoreline: ShorelineDescriptor,
    pub water: WaterConfig,
    pub water_palette: WaterPalette,
    pub sky: SkyConfig,
    pub time: TimeConfig,
    pub atmosphere: AtmosphereConfig,
}

impl SceneConfig {
    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Parse)
    }

    /// Reject structurally invalid values. Zero sizes and radii pass and
    /// degrade to empty meshes / no-op passes instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;

        let s = &self.shoreline;
        check_finite("shoreline.base_radius", s.base_radius)?;
        check_non_negative("shoreline.feather", s.feather)?;
        check_finite("shoreline.noise_amp", s.noise_amp)?;
        check_finite("shoreline.inflow", s.inflow)?;
        check_finite("shoreline.center.x", s.center[0])?;
        check_finite("shoreline.center.z", s.center[1])?;
        if let Some(clamp) = s.clamp_radius {
            check_non_negative("shoreline.clamp_radius", clamp)?;
        }

        self.water.validate()?;
        self.time.validate()?;
        self.sky.validate()?;
        self.atmosphere.validate()?;
        Ok(())
    }

    /// Fill every unset per-system seed from the master seed and return the
    /// seeds that were used.
    pub fn resolve_seeds(&mut self) -> SceneSeeds {
        let master = *self.seed.get_or_insert_with(rand::random);
        let seeds = SceneSeeds::from_master(master);
        self.terrain.basin.seed.get_or_insert(seeds.basin);
        self.shoreline.seed.get_or_insert(seeds.shoreline);
        seeds
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    Io(std::io::Error),
    /// Malformed JSON or a type mismatch
    Parse(serde_json::Error),
    /// Structurally invalid value
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Failed to read configuration: {}", err),
            ConfigError::Parse(err) => write!(f, "Failed to parse configuration: {}", err),
            ConfigError::Invalid { field, reason } => write!(f, "Invalid value for {}: {}", field, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

pub(crate) fn check_finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a finite number, got {}", value),
        })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must not be negative, got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SceneConfig::from_json_str(
            r#"{ "seed": 17, "terrain": { "size": 250.0 }, "time": { "hours": 20.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.terrain.size, 250.0);
        assert_eq!(config.terrain.segments, TerrainConfig::default().segments);
        assert_eq!(config.time.hours, 20.5);
        assert_eq!(config.shoreline, ShorelineDescriptor::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = SceneConfig { seed: Some(3), ..Default::default() };
        config.resolve_seeds();
        let text = config.to_json_pretty().unwrap();
        assert_eq!(SceneConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_negative_size_rejected() {
        let mut config = SceneConfig::default();
        config.terrain.size = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("terrain.size"));
    }

    #[test]
    fn test_non_finite_feather_rejected() {
        let mut config = SceneConfig::default();
        config.shoreline.feather = f32::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "shoreline.feather", .. })));
    }

    #[test]
    fn test_zero_radius_is_allowed() {
        let mut config = SceneConfig::default();
        config.shoreline.base_radius = 0.0;
        config.terrain.segments = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_seeds_keeps_explicit_values() {
        let mut config = SceneConfig { seed: Some(99), ..Default::default() };
        config.shoreline.seed = Some(1);
        let seeds = config.resolve_seeds();
        assert_eq!(config.shoreline.seed, Some(1));
        assert_eq!(config.terrain.basin.seed, Some(seeds.basin));
        assert_eq!(seeds.master, 99);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(SceneConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    }
}
