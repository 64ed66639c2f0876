//! Sky, fog and weather derived from the current lighting

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{check_finite, check_non_negative, ConfigError};
use crate::lattice::{clamp01, lerp, lerp_rgb, smoothstep};
use crate::time_of_day::LightingSnapshot;

/// Weather overlay on top of the day/night cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Fog,
}

impl Weather {
    pub fn name(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Rain => "rain",
            Weather::Fog => "fog",
        }
    }

    /// Next weather in the viewer's cycle order
    pub fn next(&self) -> Self {
        match self {
            Weather::Clear => Weather::Rain,
            Weather::Rain => Weather::Fog,
            Weather::Fog => Weather::Clear,
        }
    }
}

impl FromStr for Weather {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clear" => Ok(Weather::Clear),
            "rain" => Ok(Weather::Rain),
            "fog" => Ok(Weather::Fog),
            other => Err(format!("unknown weather '{}' (expected clear, rain or fog)", other)),
        }
    }
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sky and fog palette
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereConfig {
    pub day_sky_top: [f32; 3],
    pub day_sky_horizon: [f32; 3],
    pub night_sky_top: [f32; 3],
    pub night_sky_horizon: [f32; 3],
    /// Horizon tint while the sun is close to the horizon
    pub twilight_horizon: [f32; 3],
    pub day_fog_color: [f32; 3],
    pub night_fog_color: [f32; 3],
    /// Exponential-squared fog density in clear weather
    pub fog_density: f32,
    pub weather: Weather,
    /// Strength of the weather overlay (0-1)
    pub weather_intensity: f32,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            day_sky_top: [0.24, 0.50, 0.86],
            day_sky_horizon: [0.70, 0.83, 0.95],
            night_sky_top: [0.01, 0.015, 0.05],
            night_sky_horizon: [0.05, 0.07, 0.14],
            twilight_horizon: [0.96, 0.55, 0.30],
            day_fog_color: [0.74, 0.81, 0.88],
            night_fog_color: [0.04, 0.05, 0.09],
            fog_density: 0.0025,
            weather: Weather::Clear,
            weather_intensity: 0.6,
        }
    }
}

impl AtmosphereConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("atmosphere.fog_density", self.fog_density)?;
        check_finite("atmosphere.weather_intensity", self.weather_intensity)?;
        Ok(())
    }
}

/// Derived sky/fog values for one frame
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereState {
    pub weather: Weather,
    pub sky_top: [f32; 3],
    pub sky_horizon: [f32; 3],
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub star_opacity: f32,
    /// Extra wave amplitude for the water (0 = calm)
    pub wave_boost: f32,
}

impl AtmosphereState {
    /// Fog blend weight at `distance` from the viewer (0 clear, 1 fully fogged)
    pub fn fog_amount(&self, distance: f32) -> f32 {
        let d = self.fog_density * distance.max(0.0);
        clamp01(1.0 - (-d * d).exp())
    }

    /// Blend a colour toward the fog colour
    pub fn apply_fog(&self, color: [f32; 3], distance: f32) -> [f32; 3] {
        lerp_rgb(color, self.fog_color, self.fog_amount(distance))
    }

    /// Sky colour at a normalized height above the horizon (0 horizon, 1 zenith)
    pub fn sky_at(&self, height: f32) -> [f32; 3] {
        lerp_rgb(self.sky_horizon, self.sky_top, clamp01(height).sqrt())
    }
}

pub fn derive_atmosphere(
    config: &AtmosphereConfig,
    weather: Weather,
    intensity: f32,
    lighting: &LightingSnapshot,
) -> AtmosphereState {
    let day = lighting.daylight_factor;
    let intensity = clamp01(intensity);

    let mut sky_top = lerp_rgb(config.night_sky_top, config.day_sky_top, day);
    let mut sky_horizon = lerp_rgb(config.night_sky_horizon, config.day_sky_horizon, day);
    let twilight = 1.0 - smoothstep(0.0, 0.25, lighting.elevation_sin.abs());
    sky_horizon = lerp_rgb(sky_horizon, config.twilight_horizon, twilight * 0.6);

    let mut fog_color = lerp_rgb(config.night_fog_color, config.day_fog_color, day);
    let mut fog_density = config.fog_density;

    // Stars come out once the sun is well below the horizon
    let mut star_opacity = smoothstep(0.0, 0.2, -lighting.elevation_sin) * (1.0 - day);

    match weather {
        Weather::Clear => {}
        Weather::Rain => {
            let grey = luminance(sky_top) * 0.8;
            sky_top = lerp_rgb(sky_top, [grey; 3], intensity * 0.6);
            sky_horizon = lerp_rgb(sky_horizon, [grey; 3], intensity * 0.5);
            fog_density *= 1.0 + 2.0 * intensity;
            star_opacity *= 1.0 - intensity;
        }
        Weather::Fog => {
            let grey = luminance(fog_color);
            fog_color = lerp_rgb(fog_color, [grey; 3], intensity * 0.7);
            sky_horizon = lerp_rgb(sky_horizon, fog_color, intensity);
            fog_density *= 1.0 + 6.0 * intensity;
            star_opacity *= lerp(1.0, 0.1, intensity);
        }
    }

    AtmosphereState {
        weather,
        sky_top,
        sky_horizon,
        fog_color,
        fog_density,
        star_opacity: clamp01(star_opacity),
        wave_boost: wave_boost(weather, intensity),
    }
}

/// Extra wave amplitude a weather adds on top of the calm palette value.
/// Depends only on the weather, so the water can be synced before the sky.
pub fn wave_boost(weather: Weather, intensity: f32) -> f32 {
    match weather {
        Weather::Rain => 0.5 * clamp01(intensity),
        Weather::Clear | Weather::Fog => 0.0,
    }
}

fn luminance(c: [f32; 3]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

/// Owns the weather selection and the last derived state
#[derive(Clone, Debug)]
pub struct Atmosphere {
    config: AtmosphereConfig,
    weather: Weather,
    intensity: f32,
    state: AtmosphereState,
}

impl Atmosphere {
    pub fn new(config: AtmosphereConfig, lighting: &LightingSnapshot) -> Self {
        let weather = config.weather;
        let intensity = clamp01(config.weather_intensity);
        let state = derive_atmosphere(&config, weather, intensity, lighting);
        Self {
            config,
            weather,
            intensity,
            state,
        }
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    /// Takes effect on the next [`update`](Self::update)
    pub fn set_weather(&mut self, weather: Weather) {
        self.weather = weather;
    }

    pub fn cycle_weather(&mut self) -> Weather {
        self.weather = self.weather.next();
        self.weather
    }

    pub fn wave_boost(&self) -> f32 {
        wave_boost(self.weather, self.intensity)
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = clamp01(intensity);
    }

    pub fn update(&mut self, lighting: &LightingSnapshot) -> &AtmosphereState {
        self.state = derive_atmosphere(&self.config, self.weather, self.intensity, lighting);
        &self.state
    }

    pub fn state(&self) -> &AtmosphereState {
        &self.state
    }
}
