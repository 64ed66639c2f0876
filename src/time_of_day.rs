//! Time-of-day engine
//!
//! A single `hours` scalar drives sun and moon placement, colour temperature,
//! light intensities and the normalized daylight factor that every other
//! day/night dependent system blends on. Lighting is never stored as state:
//! it is re-derived from `hours` whenever the clock moves.
//!
//! Conventions:
//! - `hours` wraps modulo 24.
//! - Solar elevation exactly 0 is night. `is_daytime` and `daylight_factor`
//!   agree at the boundary: the factor is 0 whenever it is not daytime.
//! - Declination is fixed at 0 by default; there is no seasonal model.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::config::{check_finite, check_non_negative, ConfigError};
use crate::lattice::{clamp01, lerp, normalize3, smoothstep, EPSILON};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Sky geometry and light levels
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Observer latitude (radians)
    pub latitude: f32,
    /// Solar declination (radians)
    pub declination: f32,
    /// Radius of the sphere the sun and moon travel on
    pub orbit_radius: f32,
    /// Sun intensity at full daylight
    pub sun_intensity: f32,
    pub moon_intensity: f32,
    pub hemisphere_day: f32,
    pub hemisphere_night: f32,
    /// Extra angle added to the antipodal moon position (radians)
    pub moon_phase_offset: f32,
    /// Extra elevation tilt of the moon's path (radians)
    pub moon_tilt: f32,
    /// Elevation-sine band over which lights fade in above the horizon.
    /// Zero gives a hard cut at the horizon.
    pub horizon_fade: f32,
    pub sunrise_kelvin: f32,
    pub noon_kelvin: f32,
    pub moon_color: [f32; 3],
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            latitude: 0.2,
            declination: 0.0,
            orbit_radius: 400.0,
            sun_intensity: 1.6,
            moon_intensity: 0.35,
            hemisphere_day: 0.9,
            hemisphere_night: 0.12,
            moon_phase_offset: 0.12,
            moon_tilt: 0.18,
            horizon_fade: 0.08,
            sunrise_kelvin: 2200.0,
            noon_kelvin: 6500.0,
            moon_color: [0.62, 0.72, 1.0],
        }
    }
}

impl SkyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("sky.latitude", self.latitude)?;
        check_finite("sky.declination", self.declination)?;
        check_non_negative("sky.orbit_radius", self.orbit_radius)?;
        check_non_negative("sky.sun_intensity", self.sun_intensity)?;
        check_non_negative("sky.moon_intensity", self.moon_intensity)?;
        check_non_negative("sky.horizon_fade", self.horizon_fade)?;
        check_non_negative("sky.sunrise_kelvin", self.sunrise_kelvin)?;
        check_non_negative("sky.noon_kelvin", self.noon_kelvin)?;
        Ok(())
    }
}

/// Initial clock settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub hours: f32,
    pub auto: bool,
    /// In-game hours per second of frame time
    pub speed: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            hours: 10.0,
            auto: true,
            speed: 0.05,
        }
    }
}

impl TimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("time.hours", self.hours)?;
        check_finite("time.speed", self.speed)?;
        Ok(())
    }
}

/// Fixed jump targets for the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePreset {
    Dawn,
    Day,
    Dusk,
    Night,
}

impl TimePreset {
    pub fn hours(&self) -> f32 {
        match self {
            TimePreset::Dawn => 6.5,
            TimePreset::Day => 12.0,
            TimePreset::Dusk => 18.5,
            TimePreset::Night => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimePreset::Dawn => "Dawn",
            TimePreset::Day => "Day",
            TimePreset::Dusk => "Dusk",
            TimePreset::Night => "Night",
        }
    }
}

// =============================================================================
// STATE AND DERIVED LIGHTING
// =============================================================================

/// The only mutable clock state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayState {
    pub hours: f32,
    pub auto: bool,
    pub speed: f32,
}

/// Everything derived from one `hours` value
#[derive(Clone, Debug, PartialEq)]
pub struct LightingSnapshot {
    pub hours: f32,
    pub sun_position: [f32; 3],
    pub sun_direction: [f32; 3],
    pub sun_color: [f32; 3],
    pub sun_intensity: f32,
    pub moon_position: [f32; 3],
    pub moon_direction: [f32; 3],
    pub moon_color: [f32; 3],
    pub moon_intensity: f32,
    /// Emissive strength of the moon disc (0-1)
    pub moon_glow: f32,
    pub hemisphere_intensity: f32,
    /// Sine of the solar elevation
    pub elevation_sin: f32,
    pub is_daytime: bool,
    /// Canonical day/night blend key (0 night, 1 full day)
    pub daylight_factor: f32,
}

impl LightingSnapshot {
    pub fn print_summary(&self) {
        println!(
            "{} {} daylight {:.3} sun {:.2} moon {:.2} ambient {:.2}",
            format_clock(self.hours),
            if self.is_daytime { "day  " } else { "night" },
            self.daylight_factor,
            self.sun_intensity,
            self.moon_intensity,
            self.hemisphere_intensity,
        );
    }
}

/// Wrap into `[0, 24)`; non-finite input maps to midnight
pub fn wrap_hours(hours: f32) -> f32 {
    if !hours.is_finite() {
        return 0.0;
    }
    let wrapped = hours.rem_euclid(24.0);
    // rem_euclid can round up to exactly 24 for tiny negative inputs
    if wrapped >= 24.0 {
        0.0
    } else {
        wrapped
    }
}

/// Fade a light in over `band` of elevation sine; zero at or below the horizon
fn horizon_fade(elevation_sin: f32, band: f32) -> f32 {
    if elevation_sin <= 0.0 {
        0.0
    } else if band <= EPSILON {
        1.0
    } else {
        smoothstep(0.0, band, elevation_sin)
    }
}

fn orbit_position(radius: f32, theta: f32, elevation: f32) -> [f32; 3] {
    let (sin_t, cos_t) = theta.sin_cos();
    [
        radius * cos_t,
        radius * sin_t * elevation.sin(),
        radius * sin_t * elevation.cos(),
    ]
}

/// Derive lighting for `hours` under `sky`
pub fn derive_lighting(sky: &SkyConfig, hours: f32) -> LightingSnapshot {
    let hours = wrap_hours(hours);
    let theta = hours / 24.0 * TAU - FRAC_PI_2;
    let max_elevation = FRAC_PI_2 - (sky.latitude - sky.declination).abs();

    // Sun
    let sun_position = orbit_position(sky.orbit_radius, theta, max_elevation);
    let elevation_sin = theta.sin() * max_elevation.sin();
    let is_daytime = elevation_sin > 0.0;
    let elevation_norm = clamp01((elevation_sin + 1.0) * 0.5);

    let sun_intensity = if is_daytime {
        elevation_norm.powf(1.25) * sky.sun_intensity * horizon_fade(elevation_sin, sky.horizon_fade)
    } else {
        0.0
    };
    let warmth = clamp01(elevation_sin).powf(0.65);
    let sun_color = kelvin_to_rgb(lerp(sky.sunrise_kelvin, sky.noon_kelvin, warmth));

    let hemisphere_intensity = lerp(sky.hemisphere_night, sky.hemisphere_day, elevation_norm.powf(0.7));

    // Moon: roughly opposite the sun on a slightly tilted path
    let moon_theta = theta + PI + sky.moon_phase_offset;
    let moon_elevation = max_elevation + sky.moon_tilt;
    let moon_position = orbit_position(sky.orbit_radius, moon_theta, moon_elevation);
    let moon_elevation_sin = moon_theta.sin() * moon_elevation.sin();
    let night_blend = clamp01(1.0 - elevation_norm.powf(1.25));
    let moon_glow = night_blend * horizon_fade(moon_elevation_sin, sky.horizon_fade);

    let daylight_factor = if sky.sun_intensity > EPSILON {
        clamp01(sun_intensity / sky.sun_intensity)
    } else {
        0.0
    };

    LightingSnapshot {
        hours,
        sun_position,
        sun_direction: normalize3(sun_position),
        sun_color,
        sun_intensity,
        moon_position,
        moon_direction: normalize3(moon_position),
        moon_color: sky.moon_color,
        moon_intensity: sky.moon_intensity * moon_glow,
        moon_glow,
        hemisphere_intensity,
        elevation_sin,
        is_daytime,
        daylight_factor,
    }
}

/// Blackbody colour approximation for 1000K-40000K, returned as linear 0-1 RGB
pub fn kelvin_to_rgb(kelvin: f32) -> [f32; 3] {
    let temp = kelvin.clamp(1000.0, 40000.0) / 100.0;

    let red = if temp <= 66.0 {
        255.0
    } else {
        329.698_73 * (temp - 60.0).powf(-0.133_204_76)
    };

    let green = if temp <= 66.0 {
        99.470_8 * temp.ln() - 161.119_57
    } else {
        288.122_16 * (temp - 60.0).powf(-0.075_514_85)
    };

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.517_73 * (temp - 10.0).ln() - 305.044_8
    };

    [
        red.clamp(0.0, 255.0) / 255.0,
        green.clamp(0.0, 255.0) / 255.0,
        blue.clamp(0.0, 255.0) / 255.0,
    ]
}

/// `HH.MM` clock text; minutes round and roll over into the next hour
pub fn format_clock(hours: f32) -> String {
    let minutes_per_day = 24 * 60;
    let total = ((wrap_hours(hours) * 60.0).round() as u32) % minutes_per_day;
    NaiveTime::from_hms_opt(total / 60, total % 60, 0)
        .map(|t| t.format("%H.%M").to_string())
        .unwrap_or_else(|| String::from("00.00"))
}

// =============================================================================
// ENGINE
// =============================================================================

/// Owns the clock state and the lighting derived from it
#[derive(Clone, Debug)]
pub struct TimeOfDay {
    sky: SkyConfig,
    state: TimeOfDayState,
    lighting: LightingSnapshot,
}

impl TimeOfDay {
    pub fn new(sky: SkyConfig, time: &TimeConfig) -> Self {
        let hours = wrap_hours(time.hours);
        let lighting = derive_lighting(&sky, hours);
        Self {
            sky,
            state: TimeOfDayState {
                hours,
                auto: time.auto,
                speed: if time.speed.is_finite() { time.speed } else { 0.0 },
            },
            lighting,
        }
    }

    pub fn sky(&self) -> &SkyConfig {
        &self.sky
    }

    pub fn state(&self) -> &TimeOfDayState {
        &self.state
    }

    pub fn lighting(&self) -> &LightingSnapshot {
        &self.lighting
    }

    pub fn hours(&self) -> f32 {
        self.state.hours
    }

    pub fn is_daytime(&self) -> bool {
        self.lighting.is_daytime
    }

    pub fn daylight_factor(&self) -> f32 {
        self.lighting.daylight_factor
    }

    pub fn is_auto(&self) -> bool {
        self.state.auto
    }

    pub fn set_auto(&mut self, auto: bool) {
        self.state.auto = auto;
    }

    pub fn toggle_auto(&mut self) -> bool {
        self.state.auto = !self.state.auto;
        self.state.auto
    }

    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.state.speed = speed;
        }
    }

    /// Integrate the clock. Only moves when auto mode is on; returns whether
    /// the lighting was re-derived.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.state.auto || !dt.is_finite() || dt == 0.0 || self.state.speed == 0.0 {
            return false;
        }
        self.state.hours = wrap_hours(self.state.hours + self.state.speed * dt);
        self.rederive();
        true
    }

    /// Jump the clock and re-derive immediately, regardless of auto mode.
    /// Non-finite input is ignored.
    pub fn set_hours(&mut self, hours: f32) {
        if !hours.is_finite() {
            return;
        }
        self.state.hours = wrap_hours(hours);
        self.rederive();
    }

    pub fn apply_preset(&mut self, preset: TimePreset) {
        self.set_hours(preset.hours());
    }

    fn rederive(&mut self) {
        self.lighting = derive_lighting(&self.sky, self.state.hours);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(hours: f32, auto: bool, speed: f32) -> TimeOfDay {
        TimeOfDay::new(SkyConfig::default(), &TimeConfig { hours, auto, speed })
    }

    #[test]
    fn test_early_afternoon_is_bright_day() {
        let mut tod = engine(0.0, false, 0.0);
        tod.set_hours(13.0);
        assert!(tod.is_daytime());
        assert!(tod.daylight_factor() > 0.9, "daylight {}", tod.daylight_factor());
    }

    #[test]
    fn test_one_am_is_moonlit_night() {
        let mut tod = engine(12.0, false, 0.0);
        tod.set_hours(1.0);
        assert!(!tod.is_daytime());
        assert_eq!(tod.lighting().sun_intensity, 0.0);
        assert!(tod.lighting().moon_intensity > 0.0);
        assert_eq!(tod.daylight_factor(), 0.0);
    }

    #[test]
    fn test_advance_requires_auto() {
        let mut tod = engine(7.0, false, 1.0);
        for _ in 0..10 {
            assert!(!tod.advance(0.5));
        }
        assert_eq!(tod.hours(), 7.0);
    }

    #[test]
    fn test_advance_integrates_and_wraps() {
        let mut tod = engine(6.0, true, 1.0);
        tod.advance(1.0);
        assert_eq!(tod.hours(), 7.0);
        tod.advance(20.0);
        assert_eq!(tod.hours(), 3.0);

        // One simulated hour per 3600 seconds
        let mut slow = engine(22.5, true, 1.0 / 3600.0);
        slow.advance(3600.0);
        assert!((slow.hours() - 23.5).abs() < 1e-3);
        slow.advance(3600.0);
        assert!((slow.hours() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_daylight_single_peak_per_cycle() {
        let sky = SkyConfig::default();
        let steps = 24 * 40;
        let values: Vec<f32> = (0..steps)
            .map(|i| derive_lighting(&sky, i as f32 * 24.0 / steps as f32).daylight_factor)
            .collect();

        let mut maxima = 0;
        for i in 1..steps - 1 {
            if values[i] > values[i - 1] && values[i] >= values[i + 1] {
                maxima += 1;
            }
        }
        assert_eq!(maxima, 1);

        let peak = values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i as f32 * 24.0 / steps as f32)
            .unwrap();
        assert!((peak - 12.0).abs() < 0.1);

        assert_eq!(derive_lighting(&sky, 0.0).daylight_factor, 0.0);
        assert_eq!(derive_lighting(&sky, 3.0).daylight_factor, 0.0);
        assert_eq!(derive_lighting(&sky, 21.0).daylight_factor, 0.0);
    }

    #[test]
    fn test_daylight_is_continuous() {
        let sky = SkyConfig::default();
        let steps = 24 * 200;
        let mut last = derive_lighting(&sky, 0.0).daylight_factor;
        for i in 1..=steps {
            let value = derive_lighting(&sky, i as f32 * 24.0 / steps as f32).daylight_factor;
            assert!((value - last).abs() < 0.05, "jump of {} at step {}", value - last, i);
            last = value;
        }
    }

    #[test]
    fn test_daytime_and_daylight_agree() {
        let sky = SkyConfig::default();
        for i in 0..2400 {
            let l = derive_lighting(&sky, i as f32 * 0.01);
            assert_eq!(l.is_daytime, l.daylight_factor > 0.0, "disagree at {}", l.hours);
        }
    }

    #[test]
    fn test_sun_warmer_near_horizon() {
        let sky = SkyConfig::default();
        let morning = derive_lighting(&sky, 6.6).sun_color;
        let noon = derive_lighting(&sky, 12.0).sun_color;
        assert!(morning[2] < noon[2]);
        assert!(morning[0] >= noon[0] - 1e-6);
    }

    #[test]
    fn test_kelvin_reference_points() {
        let white = kelvin_to_rgb(6600.0);
        assert!(white.iter().all(|c| *c > 0.95));
        let candle = kelvin_to_rgb(1900.0);
        assert_eq!(candle[0], 1.0);
        assert_eq!(candle[2], 0.0);
    }

    #[test]
    fn test_wrap_hours() {
        assert_eq!(wrap_hours(24.0), 0.0);
        assert_eq!(wrap_hours(25.5), 1.5);
        assert_eq!(wrap_hours(-1.0), 23.0);
        assert_eq!(wrap_hours(f32::NAN), 0.0);
        assert!(wrap_hours(-1e-9) < 24.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(13.5), "13.30");
        assert_eq!(format_clock(6.25), "06.15");
        assert_eq!(format_clock(9.9999), "10.00");
        assert_eq!(format_clock(23.9999), "00.00");
        assert_eq!(format_clock(-0.5), "23.30");
    }

    #[test]
    fn test_presets_and_manual_set() {
        let mut tod = engine(12.0, false, 0.0);
        tod.apply_preset(TimePreset::Night);
        assert!(!tod.is_daytime());
        tod.apply_preset(TimePreset::Day);
        assert!(tod.is_daytime());
        assert_eq!(tod.hours(), 12.0);

        tod.set_hours(f32::INFINITY);
        assert_eq!(tod.hours(), 12.0);
        tod.set_hours(30.0);
        assert_eq!(tod.hours(), 6.0);
    }

    #[test]
    fn test_moon_not_exactly_opposite_sun() {
        let l = derive_lighting(&SkyConfig::default(), 2.0);
        let dot: f32 = (0..3).map(|i| l.sun_direction[i] * l.moon_direction[i]).sum();
        assert!(dot > -0.9999);
        assert!(dot < -0.9);
    }
}
