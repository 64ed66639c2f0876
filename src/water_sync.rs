//! Day/night water parameter synchronization
//!
//! Every tier is written every frame, visible or not, so a quality switch in
//! the middle of a dusk transition shows the same tint on the new surface.

use serde::{Deserialize, Serialize};

use crate::lattice::{clamp01, lerp, lerp_rgb};
use crate::material::{slots, ParamValue};
use crate::water::{uniforms, WaterSurfaceSet};

/// Day and night bounds for every synchronized water parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterPalette {
    pub day_color: [f32; 3],
    pub night_color: [f32; 3],
    pub day_reflectivity: f32,
    pub night_reflectivity: f32,
    pub day_wave_scale: f32,
    pub night_wave_scale: f32,
    /// Static tier only
    pub day_roughness: f32,
    pub night_roughness: f32,
    pub day_metalness: f32,
    pub night_metalness: f32,
}

impl Default for WaterPalette {
    fn default() -> Self {
        Self {
            day_color: [0.16, 0.42, 0.50],
            night_color: [0.02, 0.05, 0.11],
            day_reflectivity: 0.35,
            night_reflectivity: 0.75,
            day_wave_scale: 1.0,
            night_wave_scale: 0.6,
            day_roughness: 0.15,
            night_roughness: 0.4,
            day_metalness: 0.05,
            night_metalness: 0.2,
        }
    }
}

impl WaterPalette {
    /// Interpolate between the night (0) and day (1) bounds
    pub fn blend(&self, daylight: f32) -> WaterParams {
        let t = clamp01(daylight);
        WaterParams {
            color: lerp_rgb(self.night_color, self.day_color, t),
            reflectivity: lerp(self.night_reflectivity, self.day_reflectivity, t),
            wave_scale: lerp(self.night_wave_scale, self.day_wave_scale, t),
            roughness: lerp(self.night_roughness, self.day_roughness, t),
            metalness: lerp(self.night_metalness, self.day_metalness, t),
        }
    }
}

/// Values pushed to the water surfaces for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterParams {
    pub color: [f32; 3],
    pub reflectivity: f32,
    pub wave_scale: f32,
    pub roughness: f32,
    pub metalness: f32,
}

/// Pushes palette values and the animation clock into a [`WaterSurfaceSet`]
#[derive(Clone, Debug)]
pub struct WaterSynchronizer {
    palette: WaterPalette,
    elapsed: f32,
    last: Option<WaterParams>,
}

impl WaterSynchronizer {
    pub fn new(palette: WaterPalette) -> Self {
        Self {
            palette,
            elapsed: 0.0,
            last: None,
        }
    }

    pub fn palette(&self) -> &WaterPalette {
        &self.palette
    }

    /// Seconds fed into the animated `time` uniform
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Parameters written by the most recent [`sync`](Self::sync)
    pub fn last(&self) -> Option<&WaterParams> {
        self.last.as_ref()
    }

    /// Update every tier from the current daylight factor. `wave_boost`
    /// scales wave amplitude up for rough weather (0 = calm).
    pub fn sync(&mut self, set: &mut WaterSurfaceSet, daylight: f32, dt: f32, wave_boost: f32) -> WaterParams {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }

        let mut params = self.palette.blend(daylight);
        if wave_boost.is_finite() && wave_boost > 0.0 {
            params.wave_scale *= 1.0 + wave_boost;
        }

        for surface in set.animated_surfaces_mut() {
            let material = surface.material_mut();
            material.set(uniforms::COLOR, ParamValue::Color(params.color));
            material.set(uniforms::REFLECTIVITY, ParamValue::Float(params.reflectivity));
            material.set(uniforms::WAVE_SCALE, ParamValue::Float(params.wave_scale));
            material.set(uniforms::TIME, ParamValue::Float(self.elapsed));
        }

        let material = set.static_surface_mut().material_mut();
        material.set(slots::COLOR, ParamValue::Color(params.color));
        material.set(slots::ROUGHNESS, ParamValue::Float(params.roughness));
        material.set(slots::METALNESS, ParamValue::Float(params.metalness));

        self.last = Some(params);
        params
    }
}
