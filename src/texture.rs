//! Procedural textures
//!
//! Plain functions from size and parameters to a pixel buffer; nothing here
//! touches a renderer.

use std::f64::consts::TAU;

use image::{Rgba, RgbaImage};
use noise::{NoiseFn, Perlin};
use rayon::prelude::*;

use crate::atmosphere::AtmosphereState;
use crate::lattice::normalize3;

/// Water normal map settings
#[derive(Clone, Debug, PartialEq)]
pub struct NormalMapParams {
    pub seed: u32,
    /// Feature frequency across one tile
    pub frequency: f64,
    pub octaves: u32,
    /// Height gradient exaggeration before normalizing
    pub strength: f32,
}

impl Default for NormalMapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            frequency: 1.5,
            octaves: 4,
            strength: 2.5,
        }
    }
}

/// Wrapping ripple height at tile coordinates `u, v` in `[0, 1)`.
///
/// Both axes are mapped onto circles in 4-D noise space, so the field tiles
/// seamlessly in each direction.
fn torus_height(perlin: &Perlin, u: f64, v: f64, params: &NormalMapParams) -> f64 {
    let (su, cu) = (u * TAU).sin_cos();
    let (sv, cv) = (v * TAU).sin_cos();

    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut radius = params.frequency;
    let mut max_value = 0.0;
    for octave in 0..params.octaves.max(1) {
        // Offset each octave so they don't share lattice alignment
        let offset = octave as f64 * 17.31;
        total += perlin.get([cu * radius + offset, su * radius, cv * radius, sv * radius + offset]) * amplitude;
        max_value += amplitude;
        amplitude *= 0.5;
        radius *= 2.0;
    }
    total / max_value
}

/// Tileable tangent-space normal map for the animated water tiers
pub fn water_normal_map(size: u32, params: &NormalMapParams) -> RgbaImage {
    if size == 0 {
        return RgbaImage::new(0, 0);
    }
    let n = size as usize;
    let perlin = Perlin::new(params.seed);

    let mut heights = vec![0.0f32; n * n];
    heights.par_iter_mut().enumerate().for_each(|(i, h)| {
        let u = (i % n) as f64 / n as f64;
        let v = (i / n) as f64 / n as f64;
        *h = torus_height(&perlin, u, v, params) as f32;
    });

    let mut img = RgbaImage::new(size, size);
    for y in 0..n {
        for x in 0..n {
            // Central differences with wraparound
            let left = heights[y * n + (x + n - 1) % n];
            let right = heights[y * n + (x + 1) % n];
            let up = heights[((y + n - 1) % n) * n + x];
            let down = heights[((y + 1) % n) * n + x];

            let scale = params.strength * n as f32 / 64.0;
            let normal = normalize3([(left - right) * scale, (up - down) * scale, 1.0]);
            img.put_pixel(
                x as u32,
                y as u32,
                Rgba([encode_unit(normal[0]), encode_unit(normal[1]), encode_unit(normal[2]), 255]),
            );
        }
    }
    img
}

/// Vertical sky gradient, zenith at the top row
pub fn sky_gradient(width: u32, height: u32, state: &AtmosphereState) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    let span = height.saturating_sub(1).max(1) as f32;
    for y in 0..height {
        let c = to_rgb8(state.sky_at(1.0 - y as f32 / span));
        for x in 0..width {
            img.put_pixel(x, y, Rgba([c[0], c[1], c[2], 255]));
        }
    }
    img
}

/// Sparse star field on a transparent background. `density` is the fraction
/// of pixels that hold a star.
pub fn star_field(size: u32, seed: u32, density: f32) -> RgbaImage {
    let mut img = RgbaImage::new(size, size);
    if density <= 0.0 {
        return img;
    }
    for y in 0..size {
        for x in 0..size {
            let roll = hash_unit(x as i32, y as i32, seed);
            if roll >= density {
                continue;
            }
            // Magnitude: most stars dim, a few bright
            let magnitude = hash_unit(x as i32, y as i32, seed.wrapping_add(1));
            let brightness = 0.25 + 0.75 * magnitude * magnitude * magnitude;
            let tint = hash_unit(x as i32, y as i32, seed.wrapping_add(2));
            let color = if tint < 0.15 {
                [0.75, 0.85, 1.0]
            } else if tint < 0.3 {
                [1.0, 0.92, 0.75]
            } else {
                [1.0, 1.0, 1.0]
            };
            let c = to_rgb8(color);
            img.put_pixel(x, y, Rgba([c[0], c[1], c[2], (brightness * 255.0) as u8]));
        }
    }
    img
}

/// Integer lattice hash to `[0, 1)`
fn hash_unit(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = (x as u32).wrapping_mul(374761393);
    h = h.wrapping_add((y as u32).wrapping_mul(668265263));
    h = h.wrapping_add(seed.wrapping_mul(2246822519));
    h = (h ^ (h >> 13)).wrapping_mul(1274126177);
    h = h ^ (h >> 16);
    (h >> 8) as f32 / (1u32 << 24) as f32
}

fn encode_unit(v: f32) -> u8 {
    ((v * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Linear 0-1 colour to 8-bit
pub fn to_rgb8(c: [f32; 3]) -> [u8; 3] {
    [
        (c[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (c[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (c[2].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}
