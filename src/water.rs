//! Quality-tiered water surfaces
//!
//! One logical lake rendered by several parallel surfaces of different cost.
//! All tiers share a single footprint built from the scene's
//! [`ShorelineDescriptor`]; exactly one tier is visible at a time.

use std::str::FromStr;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::config::{check_finite, ConfigError};
use crate::material::{MaterialParameterSet, ParamValue, StandardMaterial, UniformMaterial};
use crate::shoreline::{ShorelineDescriptor, ShorelineField};

/// Uniform names shared by every animated tier
pub mod uniforms {
    pub const COLOR: &str = "color";
    pub const REFLECTIVITY: &str = "reflectivity";
    pub const WAVE_SCALE: &str = "waveScale";
    pub const FLOW_DIRECTION: &str = "flowDirection";
    pub const TIME: &str = "time";
    pub const DISTORTION: &str = "distortion";
}

// =============================================================================
// QUALITY TIERS
// =============================================================================

/// Water rendering tier, highest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterQuality {
    Ultra,
    High,
    Low,
    Static,
}

impl WaterQuality {
    pub const ALL: [WaterQuality; 4] = [
        WaterQuality::Ultra,
        WaterQuality::High,
        WaterQuality::Low,
        WaterQuality::Static,
    ];

    pub fn highest() -> Self {
        WaterQuality::Ultra
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Animated tiers run the wave shader; the static tier is a plain material
    pub fn is_animated(&self) -> bool {
        !matches!(self, WaterQuality::Static)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WaterQuality::Ultra => "ultra",
            WaterQuality::High => "high",
            WaterQuality::Low => "low",
            WaterQuality::Static => "static",
        }
    }

    /// Normal-map distortion strength once a normal map is attached
    fn distortion(&self) -> f32 {
        match self {
            WaterQuality::Ultra => 0.35,
            WaterQuality::High => 0.25,
            WaterQuality::Low => 0.15,
            WaterQuality::Static => 0.0,
        }
    }
}

impl FromStr for WaterQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ultra" => Ok(WaterQuality::Ultra),
            "high" => Ok(WaterQuality::High),
            "low" => Ok(WaterQuality::Low),
            "static" => Ok(WaterQuality::Static),
            other => Err(format!("unknown water quality '{}' (expected ultra, high, low or static)", other)),
        }
    }
}

impl std::fmt::Display for WaterQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Water body settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Water surface elevation
    pub height: f32,
    /// Vertices in the silhouette polygon
    pub outline_segments: usize,
    pub base_color: [f32; 3],
    pub flow_direction: [f32; 2],
    /// Reflection/refraction texture resolution per animated tier
    pub ultra_resolution: u32,
    pub high_resolution: u32,
    pub low_resolution: u32,
    /// Highest tier when absent
    pub initial_quality: Option<WaterQuality>,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            height: 0.0,
            outline_segments: 96,
            base_color: [0.16, 0.36, 0.42],
            flow_direction: [1.0, 0.35],
            ultra_resolution: 1024,
            high_resolution: 512,
            low_resolution: 256,
            initial_quality: None,
        }
    }
}

impl WaterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("water.height", self.height)?;
        check_finite("water.flow_direction.x", self.flow_direction[0])?;
        check_finite("water.flow_direction.y", self.flow_direction[1])?;
        Ok(())
    }

    pub fn resolution(&self, quality: WaterQuality) -> u32 {
        match quality {
            WaterQuality::Ultra => self.ultra_resolution,
            WaterQuality::High => self.high_resolution,
            WaterQuality::Low => self.low_resolution,
            WaterQuality::Static => 0,
        }
    }
}

// =============================================================================
// FOOTPRINT
// =============================================================================

/// Shared world placement of the lake
#[derive(Clone, Debug, PartialEq)]
pub struct WaterFootprint {
    pub center: [f32; 2],
    pub height: f32,
    /// Furthest outline vertex from the center
    pub radius: f32,
    /// Closed silhouette polygon in world `(x, z)`
    pub outline: Vec<[f32; 2]>,
}

impl WaterFootprint {
    /// Trace the shoreline boundary, pushed one feather width outward so the
    /// water edge tucks under the terrain rim.
    pub fn from_shoreline(shoreline: &ShorelineDescriptor, height: f32, segments: usize) -> Self {
        let field = ShorelineField::new(shoreline);
        let outline = field.outline(segments, shoreline.feather.max(0.0));
        let radius = outline
            .iter()
            .map(|p| {
                let dx = p[0] - shoreline.center[0];
                let dz = p[1] - shoreline.center[1];
                (dx * dx + dz * dz).sqrt()
            })
            .fold(0.0, f32::max);

        Self {
            center: shoreline.center,
            height,
            radius,
            outline,
        }
    }

    /// Even-odd point-in-polygon test against the outline
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let n = self.outline.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [xi, zi] = self.outline[i];
            let [xj, zj] = self.outline[j];
            if (zi > z) != (zj > z) && x < (xj - xi) * (z - zi) / (zj - zi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

// =============================================================================
// SURFACES
// =============================================================================

/// GPU layout of the animated water uniform block
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct WaterUniform {
    pub color: [f32; 4],
    pub flow_direction: [f32; 2],
    pub reflectivity: f32,
    pub wave_scale: f32,
    pub time: f32,
    pub distortion: f32,
    pub _pad: [f32; 2],
}

#[derive(Clone, Debug)]
enum SurfaceMaterial {
    Animated(UniformMaterial),
    Static(StandardMaterial),
}

/// One tier's renderable
#[derive(Clone, Debug)]
pub struct WaterSurface {
    quality: WaterQuality,
    footprint: Arc<WaterFootprint>,
    visible: bool,
    texture_resolution: u32,
    normal_map: Option<RgbaImage>,
    material: SurfaceMaterial,
}

impl WaterSurface {
    fn new(quality: WaterQuality, footprint: Arc<WaterFootprint>, config: &WaterConfig) -> Self {
        let material = if quality.is_animated() {
            SurfaceMaterial::Animated(
                UniformMaterial::new()
                    .with(uniforms::COLOR, ParamValue::Color(config.base_color))
                    .with(uniforms::REFLECTIVITY, ParamValue::Float(0.5))
                    .with(uniforms::WAVE_SCALE, ParamValue::Float(1.0))
                    .with(uniforms::FLOW_DIRECTION, ParamValue::Vec2(config.flow_direction))
                    .with(uniforms::TIME, ParamValue::Float(0.0))
                    // No normal map yet: render undistorted
                    .with(uniforms::DISTORTION, ParamValue::Float(0.0)),
            )
        } else {
            SurfaceMaterial::Static(StandardMaterial {
                color: config.base_color,
                roughness: 0.2,
                metalness: 0.1,
            })
        };

        Self {
            quality,
            footprint,
            visible: false,
            texture_resolution: config.resolution(quality),
            normal_map: None,
            material,
        }
    }

    pub fn quality(&self) -> WaterQuality {
        self.quality
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.material, SurfaceMaterial::Animated(_))
    }

    pub fn footprint(&self) -> &WaterFootprint {
        &self.footprint
    }

    pub fn texture_resolution(&self) -> u32 {
        self.texture_resolution
    }

    pub fn material(&self) -> &dyn MaterialParameterSet {
        match &self.material {
            SurfaceMaterial::Animated(m) => m,
            SurfaceMaterial::Static(m) => m,
        }
    }

    pub fn material_mut(&mut self) -> &mut dyn MaterialParameterSet {
        match &mut self.material {
            SurfaceMaterial::Animated(m) => m,
            SurfaceMaterial::Static(m) => m,
        }
    }

    pub fn normal_map(&self) -> Option<&RgbaImage> {
        self.normal_map.as_ref()
    }

    /// Attach a normal map and enable distortion. The static tier has no
    /// normal map slot and rejects it.
    pub fn attach_normal_map(&mut self, image: RgbaImage) -> bool {
        let SurfaceMaterial::Animated(material) = &mut self.material else {
            return false;
        };
        material.set(uniforms::DISTORTION, ParamValue::Float(self.quality.distortion()));
        self.normal_map = Some(image);
        true
    }

    /// Packed uniform block for animated tiers
    pub fn uniform(&self) -> Option<WaterUniform> {
        let SurfaceMaterial::Animated(m) = &self.material else {
            return None;
        };
        let color = m.get_color(uniforms::COLOR).unwrap_or([0.0; 3]);
        Some(WaterUniform {
            color: [color[0], color[1], color[2], 1.0],
            flow_direction: m.get_vec2(uniforms::FLOW_DIRECTION).unwrap_or([1.0, 0.0]),
            reflectivity: m.get_float(uniforms::REFLECTIVITY).unwrap_or(0.0),
            wave_scale: m.get_float(uniforms::WAVE_SCALE).unwrap_or(1.0),
            time: m.get_float(uniforms::TIME).unwrap_or(0.0),
            distortion: m.get_float(uniforms::DISTORTION).unwrap_or(0.0),
            _pad: [0.0; 2],
        })
    }

    /// Uniform block as raw bytes in [`WaterUniform`] layout
    pub fn uniform_bytes(&self) -> Option<Vec<u8>> {
        self.uniform().map(|u| bytemuck::bytes_of(&u).to_vec())
    }

    /// Color currently presented, whichever material kind backs the surface
    pub fn presented_color(&self) -> [f32; 3] {
        self.material().get_color(uniforms::COLOR).unwrap_or([0.0; 3])
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// All tiers of the lake plus the active-tier switch
#[derive(Clone, Debug)]
pub struct WaterSurfaceSet {
    footprint: Arc<WaterFootprint>,
    surfaces: Vec<WaterSurface>,
    active: WaterQuality,
    switches: u64,
}

impl WaterSurfaceSet {
    pub fn new(config: &WaterConfig, shoreline: &ShorelineDescriptor) -> Result<Self, ConfigError> {
        config.validate()?;
        let footprint = Arc::new(WaterFootprint::from_shoreline(
            shoreline,
            config.height,
            config.outline_segments,
        ));

        let mut surfaces: Vec<WaterSurface> = WaterQuality::ALL
            .iter()
            .map(|q| WaterSurface::new(*q, Arc::clone(&footprint), config))
            .collect();

        let active = config.initial_quality.unwrap_or_else(WaterQuality::highest);
        surfaces[active.index()].visible = true;

        Ok(Self {
            footprint,
            surfaces,
            active,
            switches: 0,
        })
    }

    pub fn footprint(&self) -> &WaterFootprint {
        &self.footprint
    }

    /// Active tier
    pub fn quality(&self) -> WaterQuality {
        self.active
    }

    /// Show exactly the requested tier. Returns false without touching any
    /// surface when it is already active.
    pub fn set_quality(&mut self, quality: WaterQuality) -> bool {
        if quality == self.active {
            return false;
        }
        for surface in &mut self.surfaces {
            surface.visible = surface.quality == quality;
        }
        self.active = quality;
        self.switches += 1;
        true
    }

    /// Number of tier switches performed
    pub fn switch_count(&self) -> u64 {
        self.switches
    }

    pub fn visible_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.visible).count()
    }

    pub fn surface(&self, quality: WaterQuality) -> &WaterSurface {
        &self.surfaces[quality.index()]
    }

    pub fn surface_mut(&mut self, quality: WaterQuality) -> &mut WaterSurface {
        &mut self.surfaces[quality.index()]
    }

    pub fn active_surface(&self) -> &WaterSurface {
        self.surface(self.active)
    }

    pub fn surfaces(&self) -> &[WaterSurface] {
        &self.surfaces
    }

    /// Every animated tier, visible or not
    pub fn animated_surfaces(&self) -> impl Iterator<Item = &WaterSurface> {
        self.surfaces.iter().filter(|s| s.is_animated())
    }

    pub fn animated_surfaces_mut(&mut self) -> impl Iterator<Item = &mut WaterSurface> {
        self.surfaces.iter_mut().filter(|s| s.is_animated())
    }

    /// The non-animated tier, visible or not
    pub fn static_surface(&self) -> &WaterSurface {
        self.surface(WaterQuality::Static)
    }

    pub fn static_surface_mut(&mut self) -> &mut WaterSurface {
        self.surface_mut(WaterQuality::Static)
    }
}
