//! Terrain builder
//!
//! Runs the fixed sculpting pipeline over a fresh height field and commits the
//! result as a static mesh. The shoreline carve reads the same
//! [`ShorelineDescriptor`] the water surfaces are built from.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{check_finite, check_non_negative, ConfigError};
use crate::heightfield::{BasinParams, HeightField, PlateauParams, ShorelineSculptParams};
use crate::lattice::{clamp01, lerp_rgb, smoothstep};
use crate::shoreline::{ShorelineDescriptor, ShorelineField};

// Vertex palette
const GRASS: [f32; 3] = [0.33, 0.48, 0.22];
const DRY_GRASS: [f32; 3] = [0.47, 0.50, 0.28];
const SAND: [f32; 3] = [0.76, 0.70, 0.50];
const MUD: [f32; 3] = [0.36, 0.31, 0.24];
const LAKE_BED: [f32; 3] = [0.18, 0.20, 0.20];
const PAVING: [f32; 3] = [0.55, 0.53, 0.50];

/// Height above the waterline still painted as beach
const BEACH_BAND: f32 = 1.2;
/// Depth over which the lake bed darkens fully
const DARKEN_DEPTH: f32 = 6.0;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Ground mesh extent and sculpting parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Side length of the square world
    pub size: f32,
    /// Grid cells per side
    pub segments: usize,
    /// Starting elevation of every vertex
    pub base_height: f32,
    pub displace_amplitude: f32,
    pub displace_scale: f32,
    pub basin: BasinParams,
    pub shoreline_sculpt: ShorelineSculptParams,
    pub plateau: PlateauParams,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 400.0,
            segments: 160,
            base_height: 1.5,
            displace_amplitude: 0.5,
            displace_scale: 0.045,
            basin: BasinParams::default(),
            shoreline_sculpt: ShorelineSculptParams::default(),
            plateau: PlateauParams::default(),
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("terrain.size", self.size)?;
        check_finite("terrain.base_height", self.base_height)?;
        check_finite("terrain.displace_amplitude", self.displace_amplitude)?;
        check_finite("terrain.displace_scale", self.displace_scale)?;
        check_non_negative("terrain.basin.plateau_radius", self.basin.plateau_radius)?;
        check_non_negative("terrain.basin.drop_radius", self.basin.drop_radius)?;
        check_finite("terrain.basin.edge_drop", self.basin.edge_drop)?;
        check_non_negative("terrain.plateau.radius", self.plateau.radius)?;
        check_non_negative("terrain.plateau.blend", self.plateau.blend)?;
        check_finite("terrain.plateau.height", self.plateau.height)?;
        check_finite("terrain.shoreline_sculpt.depth", self.shoreline_sculpt.depth)?;
        check_finite("terrain.shoreline_sculpt.rim_height", self.shoreline_sculpt.rim_height)?;
        Ok(())
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// One stage of the sculpting pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainPass {
    Displace,
    Basin,
    Shoreline,
    Plateau,
}

impl TerrainPass {
    /// Each pass builds on the previous pass's output; the plateau must win
    /// over any shoreline influence leaking inward.
    pub const PIPELINE: [TerrainPass; 4] = [
        TerrainPass::Displace,
        TerrainPass::Basin,
        TerrainPass::Shoreline,
        TerrainPass::Plateau,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TerrainPass::Displace => "displace",
            TerrainPass::Basin => "basin",
            TerrainPass::Shoreline => "shoreline",
            TerrainPass::Plateau => "plateau",
        }
    }
}

/// Builds a [`Terrain`] from its configuration and the shared shoreline
pub struct TerrainBuilder<'a> {
    config: &'a TerrainConfig,
    shoreline: &'a ShorelineDescriptor,
    water_level: f32,
}

impl<'a> TerrainBuilder<'a> {
    pub fn new(config: &'a TerrainConfig, shoreline: &'a ShorelineDescriptor, water_level: f32) -> Self {
        Self {
            config,
            shoreline,
            water_level,
        }
    }

    /// Allocate the flat grid the pipeline starts from
    pub fn allocate(&self) -> HeightField {
        HeightField::new(self.config.size, self.config.segments, self.config.base_height)
    }

    /// Apply a single pass
    pub fn apply(&self, field: &mut HeightField, pass: TerrainPass, shore: &ShorelineField) {
        let c = self.config;
        match pass {
            TerrainPass::Displace => field.displace(c.displace_amplitude, c.displace_scale),
            TerrainPass::Basin => field.sculpt_basin(c.size, &c.basin),
            TerrainPass::Shoreline => field.sculpt_shoreline(shore, &c.shoreline_sculpt, self.water_level),
            TerrainPass::Plateau => field.flatten_plateau(c.size, &c.plateau),
        }
    }

    /// Run the full pipeline and commit the mesh
    pub fn build(&self) -> Result<Terrain, ConfigError> {
        self.config.validate()?;
        check_finite("shoreline.base_radius", self.shoreline.base_radius)?;
        check_non_negative("shoreline.feather", self.shoreline.feather)?;
        check_finite("water.height", self.water_level)?;

        let shore = ShorelineField::new(self.shoreline);
        let mut field = self.allocate();
        for pass in TerrainPass::PIPELINE {
            self.apply(&mut field, pass, &shore);
        }
        Ok(Terrain::commit(field, &shore, &self.config.plateau, self.water_level))
    }
}

// =============================================================================
// OUTPUT MESH
// =============================================================================

/// Interleaved vertex layout for upload
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

/// Summary of a committed terrain
#[derive(Clone, Debug, Default)]
pub struct TerrainStats {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub min_height: f32,
    pub max_height: f32,
    pub submerged_vertices: usize,
    pub water_level: f32,
}

impl TerrainStats {
    pub fn submerged_fraction(&self) -> f32 {
        if self.vertex_count == 0 {
            0.0
        } else {
            self.submerged_vertices as f32 / self.vertex_count as f32
        }
    }

    pub fn print_summary(&self) {
        println!("Terrain: {} vertices, {} triangles", self.vertex_count, self.triangle_count);
        println!(
            "  Height range: {:.2} to {:.2} ({:.1}% below water level {:.2})",
            self.min_height,
            self.max_height,
            100.0 * self.submerged_fraction(),
            self.water_level
        );
    }
}

/// Static ground mesh; never mutated after construction
#[derive(Clone, Debug)]
pub struct Terrain {
    field: HeightField,
    colors: Vec<[f32; 3]>,
    indices: Vec<u32>,
    water_level: f32,
    stats: TerrainStats,
}

impl Terrain {
    fn commit(mut field: HeightField, shore: &ShorelineField, plateau: &PlateauParams, water_level: f32) -> Self {
        field.recompute_normals();

        let half = field.half_size().max(f32::EPSILON);
        let colors: Vec<[f32; 3]> = field
            .positions()
            .par_iter()
            .map(|p| {
                let sample = shore.sample(p[0], p[2]);
                let radius = (p[0] * p[0] + p[2] * p[2]).sqrt() / half;
                vertex_color(p[1], sample.shoreline, radius, plateau, water_level)
            })
            .collect();

        let indices = grid_indices(field.segments(), field.row_len());
        let (min_height, max_height) = field.height_range().unwrap_or((0.0, 0.0));
        let submerged_vertices = field.positions().iter().filter(|p| p[1] < water_level).count();
        let stats = TerrainStats {
            vertex_count: field.len(),
            triangle_count: indices.len() / 3,
            min_height,
            max_height,
            submerged_vertices,
            water_level,
        };

        Self {
            field,
            colors,
            indices,
            water_level,
            stats,
        }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn water_level(&self) -> f32 {
        self.water_level
    }

    pub fn stats(&self) -> &TerrainStats {
        &self.stats
    }

    /// Ground height for collision and placement queries
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.field.height_at(x, z)
    }

    /// Whether `(x, z)` lies on dry ground
    pub fn is_dry(&self, x: f32, z: f32) -> bool {
        self.height_at(x, z).map_or(false, |h| h >= self.water_level)
    }

    /// Interleaved vertices ready for a vertex buffer
    pub fn vertices(&self) -> Vec<TerrainVertex> {
        let f = &self.field;
        f.positions()
            .iter()
            .zip(f.normals())
            .zip(f.uvs())
            .zip(&self.colors)
            .map(|(((position, normal), uv), color)| TerrainVertex {
                position: *position,
                normal: *normal,
                uv: *uv,
                color: *color,
            })
            .collect()
    }

    /// Interleaved vertex buffer as raw bytes in [`TerrainVertex`] layout
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice::<TerrainVertex, u8>(self.vertices().as_slice()).to_vec()
    }

    /// Index buffer as raw `u32` bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.indices.as_slice())
    }
}

/// Two counter-clockwise triangles per grid cell
fn grid_indices(segments: usize, row_len: usize) -> Vec<u32> {
    if row_len < 2 {
        return Vec::new();
    }
    let mut indices = Vec::with_capacity(segments * segments * 6);
    for row in 0..segments {
        for col in 0..segments {
            let a = (row * row_len + col) as u32;
            let b = a + 1;
            let c = a + row_len as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    indices
}

fn vertex_color(height: f32, shoreline: f32, radius: f32, plateau: &PlateauParams, water_level: f32) -> [f32; 3] {
    if radius <= plateau.radius {
        return PAVING;
    }

    let above = height - water_level;
    if above < 0.0 {
        let depth = clamp01(-above / DARKEN_DEPTH);
        return lerp_rgb(MUD, LAKE_BED, depth);
    }

    // Sand hugs the waterline and fades out up the rim
    let beach = (1.0 - smoothstep(0.0, BEACH_BAND, above)) * smoothstep(0.05, 0.4, shoreline);
    let inland = lerp_rgb(GRASS, DRY_GRASS, clamp01(above / 8.0));
    lerp_rgb(inland, SAND, beach)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_config(plateau_radius: f32) -> TerrainConfig {
        TerrainConfig {
            size: 200.0,
            segments: 64,
            basin: BasinParams { seed: Some(21), ..Default::default() },
            plateau: PlateauParams { radius: plateau_radius, blend: 0.1, height: 3.0 },
            ..Default::default()
        }
    }

    fn scenario_shoreline() -> ShorelineDescriptor {
        ShorelineDescriptor {
            base_radius: 70.0,
            feather: 7.0,
            seed: Some(8),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_pipeline_flat_plateau() {
        let config = scenario_config(0.5);
        let shoreline = scenario_shoreline();
        let terrain = TerrainBuilder::new(&config, &shoreline, 0.0).build().unwrap();

        let half = config.size * 0.5;
        let mut inside = 0;
        for p in terrain.field().positions() {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            if r < 0.5 * half {
                assert_eq!(p[1], 3.0);
                inside += 1;
            }
        }
        assert!(inside > 0);
    }

    #[test]
    fn test_plateau_before_shoreline_is_not_flat() {
        let config = scenario_config(0.5);
        let shoreline = scenario_shoreline();
        let builder = TerrainBuilder::new(&config, &shoreline, 0.0);
        let shore = ShorelineField::new(&shoreline);

        let mut field = builder.allocate();
        for pass in [TerrainPass::Displace, TerrainPass::Basin, TerrainPass::Plateau, TerrainPass::Shoreline] {
            builder.apply(&mut field, pass, &shore);
        }

        let half = config.size * 0.5;
        let broken = field.positions().iter().any(|p| {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            r < 0.5 * half && p[1] != 3.0
        });
        assert!(broken);
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = scenario_config(0.2);
        let shoreline = scenario_shoreline();
        let a = TerrainBuilder::new(&config, &shoreline, 0.0).build().unwrap();
        let b = TerrainBuilder::new(&config, &shoreline, 0.0).build().unwrap();
        assert_eq!(a.vertices(), b.vertices());
    }

    #[test]
    fn test_lake_interior_below_water() {
        let config = TerrainConfig {
            basin: BasinParams { seed: Some(5), ..Default::default() },
            segments: 96,
            ..Default::default()
        };
        let shoreline = ShorelineDescriptor { seed: Some(5), ..Default::default() };
        let terrain = TerrainBuilder::new(&config, &shoreline, 0.0).build().unwrap();
        let shore = ShorelineField::new(&shoreline);

        let half = config.size * 0.5;
        let island = config.plateau.radius + config.plateau.blend;
        let mut checked = 0;
        for p in terrain.field().positions() {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt() / half;
            if r > island && shore.sample(p[0], p[2]).water >= 1.0 {
                assert!(p[1] < 0.0, "lake floor above water at ({}, {}): {}", p[0], p[2], p[1]);
                checked += 1;
            }
        }
        assert!(checked > 100);
        assert!(terrain.is_dry(0.0, 0.0));
    }

    #[test]
    fn test_mesh_buffers_consistent() {
        let config = scenario_config(0.2);
        let shoreline = scenario_shoreline();
        let terrain = TerrainBuilder::new(&config, &shoreline, 0.0).build().unwrap();

        assert_eq!(terrain.vertices().len(), 65 * 65);
        assert_eq!(terrain.indices().len(), 64 * 64 * 6);
        assert!(terrain.indices().iter().all(|&i| (i as usize) < 65 * 65));
        assert!(!terrain.field().normals_dirty());
        assert_eq!(terrain.stats().triangle_count, 64 * 64 * 2);
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 44);
    }

    #[test]
    fn test_upload_bytes_match_layout() {
        let config = scenario_config(0.2);
        let shoreline = scenario_shoreline();
        let terrain = TerrainBuilder::new(&config, &shoreline, 0.0).build().unwrap();

        let bytes = terrain.vertex_bytes();
        let stride = std::mem::size_of::<TerrainVertex>();
        assert_eq!(bytes.len(), 65 * 65 * stride);
        let vertices = terrain.vertices();
        let last = bytes.len() - stride;
        assert_eq!(bytemuck::pod_read_unaligned::<TerrainVertex>(&bytes[..stride]), vertices[0]);
        assert_eq!(bytemuck::pod_read_unaligned::<TerrainVertex>(&bytes[last..]), vertices[vertices.len() - 1]);

        let indices = terrain.index_bytes();
        assert_eq!(indices.len(), terrain.indices().len() * 4);
        assert_eq!(bytemuck::pod_read_unaligned::<u32>(&indices[4..8]), terrain.indices()[1]);
    }

    #[test]
    fn test_zero_size_builds_empty_mesh() {
        let config = TerrainConfig { size: 0.0, ..Default::default() };
        let terrain = TerrainBuilder::new(&config, &ShorelineDescriptor::default(), 0.0).build().unwrap();
        assert!(terrain.vertices().is_empty());
        assert!(terrain.indices().is_empty());
    }

    #[test]
    fn test_invalid_size_rejected() {
        let config = TerrainConfig { size: f32::NAN, ..Default::default() };
        let result = TerrainBuilder::new(&config, &ShorelineDescriptor::default(), 0.0).build();
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let config = TerrainConfig { size: -5.0, ..Default::default() };
        assert!(TerrainBuilder::new(&config, &ShorelineDescriptor::default(), 0.0).build().is_err());
    }
}
