//! Seed management for scene generation
//!
//! Each procedural system gets its own seed, derived from a master seed by
//! default, so one system can be re-rolled while the others stay fixed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for all procedural systems of a scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Basin rim wobble and ridges
    pub basin: u64,
    /// Shoreline phase tables
    pub shoreline: u64,
    /// Procedural textures (water normals, star field)
    pub textures: u64,
}

impl SceneSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            basin: derive_seed(master, "basin"),
            shoreline: derive_seed(master, "shoreline"),
            textures: derive_seed(master, "textures"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> SceneSeedsBuilder {
        SceneSeedsBuilder {
            seeds: SceneSeeds::from_master(master),
        }
    }
}

/// Builder for overriding individual seeds while deriving the rest
pub struct SceneSeedsBuilder {
    seeds: SceneSeeds,
}

impl SceneSeedsBuilder {
    pub fn basin(mut self, seed: u64) -> Self {
        self.seeds.basin = seed;
        self
    }

    pub fn shoreline(mut self, seed: u64) -> Self {
        self.seeds.shoreline = seed;
        self
    }

    pub fn textures(mut self, seed: u64) -> Self {
        self.seeds.textures = seed;
        self
    }

    pub fn build(self) -> SceneSeeds {
        self.seeds
    }
}

/// Derive a sub-seed by hashing the master seed with a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for SceneSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SceneSeeds {{ master: {}, basin: {}, shoreline: {}, textures: {} }}",
            self.master, self.basin, self.shoreline, self.textures,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        assert_eq!(SceneSeeds::from_master(12345), SceneSeeds::from_master(12345));
    }

    #[test]
    fn test_systems_get_distinct_seeds() {
        let seeds = SceneSeeds::from_master(12345);
        assert_ne!(seeds.basin, seeds.shoreline);
        assert_ne!(seeds.shoreline, seeds.textures);
    }

    #[test]
    fn test_builder_override() {
        let seeds = SceneSeeds::builder(12345).shoreline(7).build();
        let derived = SceneSeeds::from_master(12345);
        assert_eq!(seeds.shoreline, 7);
        assert_eq!(seeds.basin, derived.basin);
    }
}
