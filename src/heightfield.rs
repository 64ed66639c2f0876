//! Planar height-field grid and the deformation passes that sculpt it
//!
//! Every pass mutates vertex heights in place as a pure function of the
//! vertex's `(x, z)` and its current height, so the passes are safe to run
//! data-parallel. Order between passes matters and is fixed by
//! [`crate::terrain::TerrainBuilder`]:
//! displace -> sculpt_basin -> sculpt_shoreline -> flatten_plateau.

use std::f32::consts::FRAC_PI_2;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::lattice::{clamp01, lerp, normalize3, smoothstep, LatticeNoise, EPSILON};
use crate::shoreline::ShorelineField;

// =============================================================================
// PASS PARAMETERS
// =============================================================================

/// Macro bowl around a flat interior
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasinParams {
    /// Untouched interior radius (fraction of half size)
    pub plateau_radius: f32,
    /// Radius where the full edge drop is reached (fraction of half size)
    pub drop_radius: f32,
    /// Height removed at the drop radius
    pub edge_drop: f32,
    /// Shapes the smoothstepped falloff
    pub slope_exponent: f32,
    /// Low-frequency noise amplitude outside the plateau
    pub noise_amplitude: f32,
    /// World-space frequency of that noise
    pub noise_scale: f32,
    /// Relative wobble of the plateau/drop radii around the circle
    pub angular_noise_amplitude: f32,
    pub angular_noise_frequency: f32,
    /// Height of the angular ridge term near the rim
    pub ridge_amplitude: f32,
    pub ridge_frequency: f32,
    /// Resolved from the scene seeds when absent
    pub seed: Option<u64>,
}

impl Default for BasinParams {
    fn default() -> Self {
        Self {
            plateau_radius: 0.2,
            drop_radius: 1.35,
            edge_drop: 2.0,
            slope_exponent: 1.6,
            noise_amplitude: 0.8,
            noise_scale: 0.015,
            angular_noise_amplitude: 0.08,
            angular_noise_frequency: 3.0,
            ridge_amplitude: 0.6,
            ridge_frequency: 7.0,
            seed: None,
        }
    }
}

/// Flat buildable area at the center of the grid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauParams {
    /// Fully flat radius (fraction of half size)
    pub radius: f32,
    /// Width of the blend ring past the radius (fraction of half size)
    pub blend: f32,
    /// Height the plateau is forced to
    pub height: f32,
}

impl Default for PlateauParams {
    fn default() -> Self {
        Self {
            radius: 0.2,
            blend: 0.12,
            height: 2.5,
        }
    }
}

/// Beach rim above the waterline and shelf below it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShorelineSculptParams {
    pub rim_height: f32,
    pub rim_exponent: f32,
    pub rim_ripple: f32,
    /// Angular ripple frequency, kept integral so the ring closes
    pub rim_ripple_frequency: u32,
    pub depth: f32,
    pub depth_exponent: f32,
    pub underwater_shelf: f32,
    /// Height above the waterline that land past the boundary settles at
    pub beach_clearance: f32,
}

impl Default for ShorelineSculptParams {
    fn default() -> Self {
        Self {
            rim_height: 1.4,
            rim_exponent: 2.0,
            rim_ripple: 0.3,
            rim_ripple_frequency: 9,
            depth: 9.0,
            depth_exponent: 1.3,
            underwater_shelf: 1.5,
            beach_clearance: 0.4,
        }
    }
}

// =============================================================================
// HEIGHT FIELD
// =============================================================================

/// Regular `(segments + 1)²` vertex grid over `[-size/2, size/2]²`
#[derive(Clone, Debug)]
pub struct HeightField {
    size: f32,
    segments: usize,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals_dirty: bool,
}

impl HeightField {
    /// Allocate a flat grid at `base_height`. Zero size or zero segments
    /// produce an empty field on which every pass is a no-op.
    pub fn new(size: f32, segments: usize, base_height: f32) -> Self {
        if !(size > 0.0) || segments == 0 {
            return Self {
                size: size.max(0.0),
                segments: 0,
                positions: Vec::new(),
                normals: Vec::new(),
                uvs: Vec::new(),
                normals_dirty: false,
            };
        }

        let row_len = segments + 1;
        let half = size * 0.5;
        let cell = size / segments as f32;
        let mut positions = Vec::with_capacity(row_len * row_len);
        let mut uvs = Vec::with_capacity(row_len * row_len);

        for row in 0..row_len {
            for col in 0..row_len {
                positions.push([-half + col as f32 * cell, base_height, -half + row as f32 * cell]);
                uvs.push([col as f32 / segments as f32, 1.0 - row as f32 / segments as f32]);
            }
        }

        Self {
            size,
            segments,
            normals: vec![[0.0, 1.0, 0.0]; positions.len()],
            positions,
            uvs,
            normals_dirty: false,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn half_size(&self) -> f32 {
        self.size * 0.5
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Vertices per row (0 for an empty field)
    pub fn row_len(&self) -> usize {
        if self.positions.is_empty() {
            0
        } else {
            self.segments + 1
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    /// True when a pass has changed heights since the last normal update
    pub fn normals_dirty(&self) -> bool {
        self.normals_dirty
    }

    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.row_len() + col
    }

    pub fn height(&self, col: usize, row: usize) -> f32 {
        self.positions[self.index(col, row)][1]
    }

    /// Bilinear height at world `(x, z)`; `None` outside the grid
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let half = self.half_size();
        if x < -half || x > half || z < -half || z > half {
            return None;
        }

        let cell = self.size / self.segments as f32;
        let fx = ((x + half) / cell).clamp(0.0, self.segments as f32);
        let fz = ((z + half) / cell).clamp(0.0, self.segments as f32);
        let c0 = (fx.floor() as usize).min(self.segments - 1);
        let r0 = (fz.floor() as usize).min(self.segments - 1);
        let tx = fx - c0 as f32;
        let tz = fz - r0 as f32;

        let top = lerp(self.height(c0, r0), self.height(c0 + 1, r0), tx);
        let bottom = lerp(self.height(c0, r0 + 1), self.height(c0 + 1, r0 + 1), tx);
        Some(lerp(top, bottom, tz))
    }

    /// Min and max vertex height, `None` when empty
    pub fn height_range(&self) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        Some(self.positions.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
            (lo.min(p[1]), hi.max(p[1]))
        }))
    }

    /// Recompute per-vertex normals from central differences
    pub fn recompute_normals(&mut self) {
        let row_len = self.row_len();
        if row_len < 2 {
            self.normals_dirty = false;
            return;
        }

        let positions = &self.positions;
        let normals: Vec<[f32; 3]> = (0..positions.len())
            .into_par_iter()
            .map(|i| {
                let col = i % row_len;
                let row = i / row_len;
                let left = row * row_len + col.saturating_sub(1);
                let right = row * row_len + (col + 1).min(row_len - 1);
                let up = col.min(row_len - 1) + row.saturating_sub(1) * row_len;
                let down = col + (row + 1).min(row_len - 1) * row_len;

                let dx = positions[right][0] - positions[left][0];
                let dz = positions[down][2] - positions[up][2];
                let slope_x = (positions[right][1] - positions[left][1]) / dx.max(EPSILON);
                let slope_z = (positions[down][1] - positions[up][1]) / dz.max(EPSILON);

                normalize3([-slope_x, 1.0, -slope_z])
            })
            .collect();

        self.normals = normals;
        self.normals_dirty = false;
    }

    // =========================================================================
    // PASSES
    // =========================================================================

    /// Micro variation: a product of sinusoids plus a secondary harmonic
    pub fn displace(&mut self, amplitude: f32, scale: f32) {
        if self.is_empty() || amplitude == 0.0 {
            return;
        }
        self.positions.par_iter_mut().for_each(|p| {
            p[1] += displacement(p[0], p[2], amplitude, scale);
        });
        self.normals_dirty = true;
    }

    /// Carve the macro bowl. Vertices inside the perturbed plateau radius
    /// are left untouched.
    pub fn sculpt_basin(&mut self, size: f32, params: &BasinParams) {
        let half = size * 0.5;
        if self.is_empty() || half <= EPSILON {
            return;
        }

        let seed = params.seed.unwrap_or(0);
        let shape_noise = LatticeNoise::new(seed);
        let ridge_noise = LatticeNoise::new(seed.wrapping_add(2222));

        self.positions.par_iter_mut().for_each(|p| {
            let (x, z) = (p[0], p[2]);
            let radius = (x * x + z * z).sqrt() / half;
            let angle = z.atan2(x);
            let (sin, cos) = angle.sin_cos();

            // Sampling on a circle keeps the wobble continuous across ±π
            let wobble = params.angular_noise_amplitude
                * shape_noise.noise3(
                    cos * params.angular_noise_frequency,
                    sin * params.angular_noise_frequency,
                    0.37,
                );
            let plateau_r = params.plateau_radius * (1.0 + wobble);
            let drop_r = (params.drop_radius * (1.0 + wobble * 0.5)).max(plateau_r + EPSILON);

            if radius <= plateau_r {
                return;
            }

            let t = smoothstep(plateau_r, drop_r, radius);
            let falloff = t.powf(params.slope_exponent.max(EPSILON));

            let low = shape_noise.fbm2(x * params.noise_scale, z * params.noise_scale, 3, 0.5, 2.0);
            let ridge_sample = ridge_noise.noise3(
                cos * params.ridge_frequency,
                sin * params.ridge_frequency,
                1.7,
            );
            let ridge = params.ridge_amplitude * (1.0 - 2.0 * ridge_sample.abs());

            p[1] -= params.edge_drop * falloff
                + params.noise_amplitude * low * t
                + ridge * (1.0 - falloff) * t;
        });
        self.normals_dirty = true;
    }

    /// Raise the beach rim and lower the lake floor from the shoreline field.
    /// Land at or past the boundary is kept at or above `water_level`, rising
    /// to `beach_clearance` over one feather width.
    pub fn sculpt_shoreline(&mut self, field: &ShorelineField, params: &ShorelineSculptParams, water_level: f32) {
        if self.is_empty() || field.is_degenerate() {
            return;
        }

        let ripple_frequency = params.rim_ripple_frequency as f32;
        self.positions.par_iter_mut().for_each(|p| {
            let s = field.sample(p[0], p[2]);

            let rim = s.shoreline.powf(params.rim_exponent.max(EPSILON));
            p[1] += params.rim_height * rim + params.rim_ripple * (s.angle * ripple_frequency).sin() * rim;

            let water = clamp01(s.water);
            p[1] -= params.depth * water.powf(params.depth_exponent.max(EPSILON))
                - params.underwater_shelf * (water * FRAC_PI_2).sin();

            if water <= 0.0 {
                let floor = water_level + params.beach_clearance.max(0.0) * smoothstep(0.0, 1.0, s.outside);
                p[1] = p[1].max(floor);
            }
        });
        self.normals_dirty = true;
    }

    /// Force the central plateau to `height`, blending out over `blend`
    pub fn flatten_plateau(&mut self, size: f32, params: &PlateauParams) {
        let half = size * 0.5;
        if self.is_empty() || half <= EPSILON || params.radius < 0.0 {
            return;
        }

        let outer = params.radius + params.blend.max(0.0);
        self.positions.par_iter_mut().for_each(|p| {
            let radius = (p[0] * p[0] + p[2] * p[2]).sqrt() / half;
            if radius <= params.radius {
                p[1] = params.height;
            } else if radius < outer {
                let t = smoothstep(params.radius, outer, radius);
                p[1] = lerp(params.height, p[1], t);
            }
        });
        self.normals_dirty = true;
    }
}

/// Height offset added by [`HeightField::displace`] at `(x, z)`
pub fn displacement(x: f32, z: f32, amplitude: f32, scale: f32) -> f32 {
    let primary = (x * scale).sin() * (z * scale).cos();
    let secondary = 0.35 * (x * scale * 2.7 + 1.3).sin() * (z * scale * 2.3 - 0.7).cos();
    (primary + secondary) * amplitude
}
