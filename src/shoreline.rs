//! Shoreline heat-field sampler
//!
//! A lake boundary described as an organic, noise-perturbed closed curve. The
//! sampler is a pure function of world `(x, z)` returning how far a point is
//! from the shore and which side it is on. The same [`ShorelineDescriptor`]
//! drives both the terrain rim carve and the water body silhouette, so the
//! two can never disagree about where the shore is.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::lattice::{clamp01, jitter_table, phase_table, smoothstep, EPSILON};

/// Target radius never shrinks below this fraction of the base radius
const MIN_TARGET_FRACTION: f32 = 0.22;
/// Target radius never grows above this multiple of the base radius
const MAX_TARGET_FRACTION: f32 = 2.6;
/// Default clamp radius as a multiple of the base radius
const DEFAULT_CLAMP_FACTOR: f32 = 3.0;

/// Integral angular frequencies for the coastline irregularity term
const ANGLE_FREQUENCIES: [f32; 2] = [3.0, 7.0];
/// Distance-domain wavelengths as fractions of the base radius
const INFLOW_WAVELENGTHS: [f32; 2] = [0.45, 0.17];

const BOUNDARY_ITERATIONS: usize = 40;
/// Coarse samples along a ray when looking for the outermost crossing
const BOUNDARY_SCAN_STEPS: usize = 128;

// =============================================================================
// DESCRIPTOR
// =============================================================================

/// Optional silhouette shaping on top of the perturbed circle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganicSettings {
    /// Elliptical stretch amplitude (fraction of radius)
    pub eccentricity: f32,
    /// Orientation of the long axis (radians)
    pub eccentricity_angle: f32,
    /// Low-frequency shoreline push (fraction of radius)
    pub push: f32,
    /// Mid-frequency ripple (fraction of radius)
    pub ripple: f32,
    /// High-frequency detail (fraction of radius)
    pub noise: f32,
    /// Inner bay center, offset from the lake center in units of base radius
    pub bay_offset: [f32; 2],
    /// Reach of the bay mask around the inner center (units of base radius)
    pub bay_radius: f32,
    /// How far bays cut into the target radius (fraction of radius)
    pub bay_depth: f32,
    /// Number of bay lobes around the inner center
    pub bay_lobes: u32,
}

impl Default for OrganicSettings {
    fn default() -> Self {
        Self {
            eccentricity: 0.12,
            eccentricity_angle: 0.6,
            push: 0.07,
            ripple: 0.03,
            noise: 0.012,
            bay_offset: [0.45, -0.3],
            bay_radius: 0.7,
            bay_depth: 0.25,
            bay_lobes: 3,
        }
    }
}

/// Shared description of the lake boundary.
///
/// Handed to both the terrain builder and the water surface set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShorelineDescriptor {
    /// Lake center in world `(x, z)`
    pub center: [f32; 2],
    /// Nominal lake radius (world units)
    pub base_radius: f32,
    /// Half-width of the shoreline transition band
    pub feather: f32,
    /// Amplitude of the angle-domain coastline perturbation
    pub noise_amp: f32,
    /// Amplitude of the distance-domain inflow warp
    pub inflow: f32,
    /// Phase seed; resolved from the scene seeds when absent
    pub seed: Option<u64>,
    /// Perturbed distances are clamped to this radius (default 3x base
    /// radius). Never smaller than the largest target radius plus one feather.
    pub clamp_radius: Option<f32>,
    pub organic: Option<OrganicSettings>,
}

impl Default for ShorelineDescriptor {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            base_radius: 140.0,
            feather: 14.0,
            noise_amp: 4.0,
            inflow: 2.5,
            seed: None,
            clamp_radius: None,
            organic: Some(OrganicSettings::default()),
        }
    }
}

impl ShorelineDescriptor {
    /// A radius at or below zero describes no lake at all
    pub fn is_degenerate(&self) -> bool {
        !(self.base_radius > 0.0)
    }

    /// Clamp radius actually applied. A clamp inside the largest possible
    /// target radius would fold far-away points back into the lake.
    pub fn effective_clamp_radius(&self) -> f32 {
        self.clamp_radius
            .unwrap_or(self.base_radius * DEFAULT_CLAMP_FACTOR)
            .max(self.min_clamp_radius())
    }

    /// Smallest clamp radius that keeps every clamped sample dry
    pub fn min_clamp_radius(&self) -> f32 {
        (MAX_TARGET_FRACTION * self.base_radius + self.feather.max(0.0)).max(EPSILON)
    }

    /// Largest offset the two noise terms can add to the raw distance
    pub fn perturbation_bound(&self) -> f32 {
        self.noise_amp.abs() + self.inflow.abs()
    }
}

// =============================================================================
// SAMPLE
// =============================================================================

/// Result of one shoreline query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShorelineSample {
    /// Perturbed, clamped distance from the lake center
    pub dist: f32,
    /// Local boundary radius at this point
    pub target_radius: f32,
    /// 1 inside the feather band, 0.5 on the boundary, 0 outside it
    pub shoreline: f32,
    /// Strict interior mask: 0 at/outside the boundary
    pub water: f32,
    /// Exterior mask growing over one feather width past the boundary
    pub outside: f32,
    /// Polar angle around the lake center
    pub angle: f32,
}

impl ShorelineSample {
    /// Derive the masks from a distance/target pair.
    ///
    /// Works on `dist - target` so a point exactly on the boundary yields
    /// `shoreline == 0.5` with no rounding.
    pub fn from_distance(dist: f32, target_radius: f32, feather: f32, angle: f32) -> Self {
        let feather = feather.max(EPSILON);
        let delta = dist - target_radius;
        Self {
            dist,
            target_radius,
            shoreline: clamp01((feather - delta) / (2.0 * feather)),
            water: clamp01(-delta / (feather * 0.5)),
            outside: clamp01(delta / feather),
            angle,
        }
    }

    fn dry(dist: f32, angle: f32) -> Self {
        Self {
            dist,
            target_radius: 0.0,
            shoreline: 0.0,
            water: 0.0,
            outside: 1.0,
            angle,
        }
    }
}

// =============================================================================
// FIELD
// =============================================================================

/// Evaluates a [`ShorelineDescriptor`] with its seeded phase tables resolved
#[derive(Clone, Debug)]
pub struct ShorelineField {
    descriptor: ShorelineDescriptor,
    angle_phases: [f32; 2],
    inflow_phases: [f32; 2],
    inflow_frequencies: [f32; 2],
    organic_phases: [f32; 4],
}

impl ShorelineField {
    pub fn new(descriptor: &ShorelineDescriptor) -> Self {
        let seed = descriptor.seed.unwrap_or(0);
        let phases = phase_table(seed, 8);
        let jitter = jitter_table(seed, 2, 0.15);

        let radius = descriptor.base_radius.max(EPSILON);
        let inflow_frequencies = [
            TAU / (radius * INFLOW_WAVELENGTHS[0]) * jitter[0],
            TAU / (radius * INFLOW_WAVELENGTHS[1]) * jitter[1],
        ];

        Self {
            descriptor: descriptor.clone(),
            angle_phases: [phases[0], phases[1]],
            inflow_phases: [phases[2], phases[3]],
            inflow_frequencies,
            organic_phases: [phases[4], phases[5], phases[6], phases[7]],
        }
    }

    pub fn descriptor(&self) -> &ShorelineDescriptor {
        &self.descriptor
    }

    pub fn is_degenerate(&self) -> bool {
        self.descriptor.is_degenerate()
    }

    /// Sample the field at world `(x, z)`
    pub fn sample(&self, x: f32, z: f32) -> ShorelineSample {
        let d = &self.descriptor;
        let dx = x - d.center[0];
        let dz = z - d.center[1];
        let raw = (dx * dx + dz * dz).sqrt();
        // atan2(0, 0) is 0, so the exact center has a defined angle
        let angle = dz.atan2(dx);

        if d.is_degenerate() {
            return ShorelineSample::dry(raw, angle);
        }

        let dist = self.perturbed_distance(raw, angle);
        let target = self.target_radius(x, z, angle);
        ShorelineSample::from_distance(dist, target, d.feather, angle)
    }

    /// Raw distance warped by the coastline and inflow terms, then clamped
    fn perturbed_distance(&self, raw: f32, angle: f32) -> f32 {
        let d = &self.descriptor;

        let coast = d.noise_amp
            * (0.65 * (angle * ANGLE_FREQUENCIES[0] + self.angle_phases[0]).sin()
                + 0.35 * (angle * ANGLE_FREQUENCIES[1] + self.angle_phases[1]).sin());

        let inflow = d.inflow
            * (0.6 * (raw * self.inflow_frequencies[0] + self.inflow_phases[0]).sin()
                + 0.4 * (raw * self.inflow_frequencies[1] + self.inflow_phases[1]).cos());

        (raw + coast + inflow).clamp(0.0, d.effective_clamp_radius())
    }

    /// Boundary radius for the direction `angle`, reduced near the inner bay
    fn target_radius(&self, x: f32, z: f32, angle: f32) -> f32 {
        let d = &self.descriptor;
        let base = d.base_radius;
        let Some(org) = &d.organic else {
            return base;
        };
        let p = &self.organic_phases;

        // Coarse to fine silhouette detail
        let stretch = 1.0 + org.eccentricity * (2.0 * (angle - org.eccentricity_angle)).cos();
        let mut radius = base * stretch;
        radius += base
            * (org.push * (2.0 * angle + p[0]).sin()
                + org.ripple * (5.0 * angle + p[1]).sin()
                + org.noise * (11.0 * angle + p[2]).sin());

        // Bays only bite near the inner center
        let inner_x = d.center[0] + org.bay_offset[0] * base;
        let inner_z = d.center[1] + org.bay_offset[1] * base;
        let bx = x - inner_x;
        let bz = z - inner_z;
        let bay_dist = (bx * bx + bz * bz).sqrt();
        let reach = (org.bay_radius * base).max(EPSILON);
        let influence = 1.0 - smoothstep(0.0, reach, bay_dist);
        let lobes = 0.5 + 0.5 * (bz.atan2(bx) * org.bay_lobes as f32 + p[3]).sin();
        radius -= base * org.bay_depth * influence * lobes;

        radius.clamp(MIN_TARGET_FRACTION * base, MAX_TARGET_FRACTION * base)
    }

    /// Outermost radius along `angle` where the perturbed distance meets the
    /// target radius. A coarse scan inward from `clamp_radius` brackets the
    /// crossing, then bisection refines it, so every interior point along
    /// the ray lies within the returned radius.
    pub fn boundary_radius(&self, angle: f32) -> f32 {
        let d = &self.descriptor;
        if d.is_degenerate() {
            return 0.0;
        }
        let (sin, cos) = angle.sin_cos();
        let inside = |r: f32| {
            let s = self.sample(d.center[0] + cos * r, d.center[1] + sin * r);
            s.dist - s.target_radius < 0.0
        };

        let clamp = d.effective_clamp_radius();
        if inside(clamp) {
            return clamp;
        }
        let step = clamp / BOUNDARY_SCAN_STEPS as f32;
        let Some(lo) = (0..BOUNDARY_SCAN_STEPS)
            .rev()
            .map(|i| step * i as f32)
            .find(|&r| inside(r))
        else {
            return 0.0;
        };

        let mut lo = lo;
        let mut hi = lo + step;
        for _ in 0..BOUNDARY_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if inside(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    /// Closed boundary polygon in world `(x, z)`, pushed outward by `margin`
    pub fn outline(&self, segments: usize, margin: f32) -> Vec<[f32; 2]> {
        let d = &self.descriptor;
        if d.is_degenerate() || segments < 3 {
            return Vec::new();
        }
        (0..segments)
            .map(|i| {
                let angle = -std::f32::consts::PI + TAU * i as f32 / segments as f32;
                let r = self.boundary_radius(angle) + margin;
                let (sin, cos) = angle.sin_cos();
                [d.center[0] + cos * r, d.center[1] + sin * r]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_descriptor() -> ShorelineDescriptor {
        ShorelineDescriptor {
            seed: Some(9),
            organic: None,
            ..ShorelineDescriptor::default()
        }
    }

    #[test]
    fn test_boundary_is_exactly_half() {
        let s = ShorelineSample::from_distance(137.3, 137.3, 14.0, 0.0);
        assert_eq!(s.shoreline, 0.5);
        assert_eq!(s.water, 0.0);
        assert_eq!(s.outside, 0.0);
    }

    #[test]
    fn test_feather_band_limits() {
        let inside = ShorelineSample::from_distance(126.0, 140.0, 14.0, 0.0);
        let outside = ShorelineSample::from_distance(154.0, 140.0, 14.0, 0.0);
        assert_eq!(inside.shoreline, 1.0);
        assert_eq!(inside.water, 1.0);
        assert_eq!(outside.shoreline, 0.0);
        assert_eq!(outside.outside, 1.0);

        // Monotonic across the band
        let mut last = 1.0;
        for i in 0..=28 {
            let s = ShorelineSample::from_distance(126.0 + i as f32, 140.0, 14.0, 0.0);
            assert!(s.shoreline <= last);
            last = s.shoreline;
        }
    }

    #[test]
    fn test_plain_circle_is_half_at_base_radius() {
        let desc = plain_descriptor();
        let field = ShorelineField::new(&desc);
        let tolerance = desc.perturbation_bound() / (2.0 * desc.feather) + 1e-4;
        for i in 0..72 {
            let a = TAU * i as f32 / 72.0;
            let s = field.sample(desc.base_radius * a.cos(), desc.base_radius * a.sin());
            assert_eq!(s.target_radius, desc.base_radius);
            assert!((s.shoreline - 0.5).abs() <= tolerance, "angle {} gave {}", a, s.shoreline);
        }
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let desc = ShorelineDescriptor { seed: Some(5), ..Default::default() };
        let a = ShorelineField::new(&desc);
        let b = ShorelineField::new(&desc);
        for i in 0..50 {
            let (x, z) = (i as f32 * 3.7 - 90.0, i as f32 * -2.9 + 60.0);
            assert_eq!(a.sample(x, z), b.sample(x, z));
        }

        let other = ShorelineField::new(&ShorelineDescriptor { seed: Some(6), ..desc });
        let differs = (0..50).any(|i| {
            let (x, z) = (i as f32 * 3.7 - 90.0, i as f32 * -2.9 + 60.0);
            a.sample(x, z).dist != other.sample(x, z).dist
        });
        assert!(differs);
    }

    #[test]
    fn test_target_radius_clamped() {
        let desc = ShorelineDescriptor {
            seed: Some(1),
            organic: Some(OrganicSettings {
                eccentricity: 3.0,
                push: 2.0,
                bay_depth: 5.0,
                ..OrganicSettings::default()
            }),
            ..Default::default()
        };
        let field = ShorelineField::new(&desc);
        for i in 0..200 {
            let a = TAU * i as f32 / 200.0;
            let r = 20.0 + i as f32;
            let s = field.sample(r * a.cos(), r * a.sin());
            assert!(s.target_radius >= MIN_TARGET_FRACTION * desc.base_radius - 1e-3);
            assert!(s.target_radius <= MAX_TARGET_FRACTION * desc.base_radius + 1e-3);
        }
    }

    #[test]
    fn test_far_samples_stay_finite() {
        let field = ShorelineField::new(&ShorelineDescriptor::default());
        let s = field.sample(1.0e6, -1.0e6);
        assert!(s.dist.is_finite());
        assert!(s.dist <= field.descriptor().effective_clamp_radius());
        assert_eq!(s.water, 0.0);
        assert_eq!(s.outside, 1.0);
    }

    #[test]
    fn test_small_clamp_radius_is_raised() {
        let desc = ShorelineDescriptor { seed: Some(3), clamp_radius: Some(50.0), ..Default::default() };
        assert_eq!(desc.effective_clamp_radius(), desc.min_clamp_radius());
        assert!(desc.min_clamp_radius() >= MAX_TARGET_FRACTION * desc.base_radius + desc.feather);

        let field = ShorelineField::new(&desc);
        let s = field.sample(195.0, -195.0);
        assert_eq!(s.water, 0.0);
        assert_eq!(s.outside, 1.0);

        let free = ShorelineField::new(&ShorelineDescriptor { clamp_radius: None, ..desc.clone() });
        for angle in [0.3, 2.0, -1.4] {
            assert!((field.boundary_radius(angle) - free.boundary_radius(angle)).abs() < 1e-2);
        }
    }

    #[test]
    fn test_interior_never_past_boundary() {
        let field = ShorelineField::new(&ShorelineDescriptor { seed: Some(44), ..Default::default() });
        for i in 0..36 {
            let angle = TAU * i as f32 / 36.0;
            let boundary = field.boundary_radius(angle);
            let (sin, cos) = angle.sin_cos();
            let mut r = boundary + 0.5;
            while r < field.descriptor().effective_clamp_radius() {
                let s = field.sample(cos * r, sin * r);
                assert!(s.dist >= s.target_radius, "interior at r={} past boundary {}", r, boundary);
                r += 2.0;
            }
        }
    }

    #[test]
    fn test_center_sample_is_water() {
        let field = ShorelineField::new(&ShorelineDescriptor { seed: Some(2), ..Default::default() });
        let s = field.sample(0.0, 0.0);
        assert_eq!(s.angle, 0.0);
        assert_eq!(s.water, 1.0);
    }

    #[test]
    fn test_degenerate_radius_is_dry() {
        let field = ShorelineField::new(&ShorelineDescriptor { base_radius: 0.0, ..Default::default() });
        let s = field.sample(0.0, 0.0);
        assert_eq!(s.water, 0.0);
        assert_eq!(s.shoreline, 0.0);
        assert_eq!(s.outside, 1.0);
        assert!(field.outline(32, 0.0).is_empty());
    }

    #[test]
    fn test_outline_lies_on_boundary() {
        let field = ShorelineField::new(&ShorelineDescriptor { seed: Some(77), ..Default::default() });
        let outline = field.outline(48, 0.0);
        assert_eq!(outline.len(), 48);
        for p in outline {
            let s = field.sample(p[0], p[1]);
            assert!((s.dist - s.target_radius).abs() < 0.05, "off boundary by {}", s.dist - s.target_radius);
            assert!((s.shoreline - 0.5).abs() < 0.01);
        }
    }
}
