//! Seeded lattice noise and shared interpolation helpers
//!
//! Everything the terrain passes and the shoreline sampler need from "noise":
//! a classic gradient lattice noise (`noise3`, periodic at 256), a small fBm
//! wrapper, and reproducible phase/frequency tables for the sinusoid
//! perturbations.

use std::f32::consts::TAU;

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Guard for feather/radius denominators.
pub const EPSILON: f32 = 1e-4;

// =============================================================================
// LATTICE NOISE
// =============================================================================

/// Classic lattice gradient noise with a seeded permutation table.
///
/// Output is in `[-1, 1]`. Two instances built from the same seed return
/// bit-identical values for the same input.
#[derive(Clone)]
pub struct LatticeNoise {
    perlin: Perlin,
    seed: u32,
}

impl LatticeNoise {
    pub fn new(seed: u64) -> Self {
        let seed = fold_seed(seed);
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    /// Seed of the permutation table
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Sample 3D noise
    pub fn noise3(&self, x: f32, y: f32, z: f32) -> f32 {
        let v = self.perlin.get([x as f64, y as f64, z as f64]) as f32;
        v.clamp(-1.0, 1.0)
    }

    /// Sample the horizontal plane. The fixed y offset keeps samples off the
    /// integer lattice plane where gradient noise degenerates.
    pub fn noise2(&self, x: f32, z: f32) -> f32 {
        self.noise3(x, 0.5, z)
    }

    /// Fractal Brownian motion over the horizontal plane, normalized to `[-1, 1]`
    pub fn fbm2(&self, x: f32, z: f32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_value = 0.0;

        for _ in 0..octaves {
            total += amplitude * self.noise2(x * frequency, z * frequency);
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_value <= 0.0 {
            0.0
        } else {
            total / max_value
        }
    }
}

impl std::fmt::Debug for LatticeNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatticeNoise").field("seed", &self.seed).finish()
    }
}

/// Fold a 64-bit seed into the 32 bits the permutation table takes
fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

// =============================================================================
// SEEDED SINUSOID TABLES
// =============================================================================

/// `count` phases in `[0, 2π)`, reproducible for a seed.
pub fn phase_table(seed: u64, count: usize) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(0.0..TAU)).collect()
}

/// Multipliers in `[1 - spread, 1 + spread]`, reproducible for a seed.
///
/// Only used for distance-domain frequencies; angle-domain frequencies must
/// stay integral or the closed curve gets a seam at ±π.
pub fn jitter_table(seed: u64, count: usize, spread: f32) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(0x9e37_79b9));
    let spread = spread.abs();
    (0..count)
        .map(|_| 1.0 + rng.gen_range(-spread..=spread))
        .collect()
}

// =============================================================================
// INTERPOLATION
// =============================================================================

pub fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_rgb(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

/// Hermite smoothstep; a zero-width band degenerates to a step at `edge0`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let width = edge1 - edge0;
    if width.abs() <= f32::EPSILON {
        return if x > edge0 { 1.0 } else { 0.0 };
    }
    let t = clamp01((x - edge0) / width);
    t * t * (3.0 - 2.0 * t)
}

pub fn normalize3(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0, 1.0, 0.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_deterministic() {
        let a = LatticeNoise::new(42);
        let b = LatticeNoise::new(42);
        for i in 0..64 {
            let x = i as f32 * 0.37;
            let z = i as f32 * -0.91;
            assert_eq!(a.noise3(x, 1.3, z).to_bits(), b.noise3(x, 1.3, z).to_bits());
        }
    }

    #[test]
    fn test_noise_range() {
        let n = LatticeNoise::new(7);
        for i in 0..500 {
            let v = n.noise3(i as f32 * 0.113, i as f32 * 0.071, i as f32 * 0.029);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_noise_periodic_at_256() {
        let n = LatticeNoise::new(3);
        let a = n.noise3(1.25, 2.5, 3.75);
        let b = n.noise3(1.25 + 256.0, 2.5, 3.75);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_phase_table_reproducible() {
        assert_eq!(phase_table(11, 6), phase_table(11, 6));
        assert_ne!(phase_table(11, 6), phase_table(12, 6));
        assert!(phase_table(11, 6).iter().all(|p| (0.0..TAU).contains(p)));
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert_eq!(smoothstep(1.0, 1.0, 1.0), 0.0);
        assert_eq!(smoothstep(1.0, 1.0, 1.5), 1.0);
    }
}
