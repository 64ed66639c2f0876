use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb, RgbImage};
use rayon::prelude::*;

use crate::lattice::{clamp01, lerp_rgb};
use crate::scene::Scene;
use crate::terrain::Terrain;
use crate::texture::{self, to_rgb8, NormalMapParams};

/// Export the terrain heights using the spectral colormap, one pixel per vertex
pub fn export_heightmap(terrain: &Terrain, path: &Path) -> Result<(), image::ImageError> {
    render_heightmap(terrain).save(path)
}

/// Render terrain heights normalized to the mesh's own height range
pub fn render_heightmap(terrain: &Terrain) -> RgbImage {
    let field = terrain.field();
    let n = field.row_len();
    let mut img: RgbImage = ImageBuffer::new(n as u32, n as u32);
    let (min, max) = field.height_range().unwrap_or((0.0, 1.0));
    let range = (max - min).max(f32::EPSILON);

    for row in 0..n {
        for col in 0..n {
            let t = (field.height(col, row) - min) / range;
            img.put_pixel(col as u32, row as u32, Rgb(spectral_colormap(t.clamp(0.0, 1.0))));
        }
    }
    img
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],  // Dark blue/purple (low)
        [0.20, 0.53, 0.74],  // Blue
        [0.40, 0.76, 0.65],  // Teal
        [0.67, 0.87, 0.64],  // Light green
        [0.90, 0.96, 0.60],  // Yellow-green
        [1.00, 1.00, 0.75],  // Light yellow / white
        [1.00, 0.88, 0.55],  // Yellow
        [0.99, 0.68, 0.38],  // Light orange
        [0.96, 0.43, 0.26],  // Orange
        [0.84, 0.24, 0.31],  // Red
        [0.62, 0.00, 0.26],  // Dark red (high)
    ];

    let t_scaled = t * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;
    to_rgb8(lerp_rgb(colors[idx], colors[idx + 1], frac))
}

/// Export the lit top-down scene at its current time of day
pub fn export_scene(scene: &Scene, resolution: u32, path: &Path) -> Result<(), image::ImageError> {
    render_scene(scene, resolution).save(path)
}

/// Top-down render of terrain and water lit by the scene's current sun, moon
/// and sky, with distance fog measured from the world centre.
pub fn render_scene(scene: &Scene, resolution: u32) -> RgbImage {
    let terrain = scene.terrain();
    let field = terrain.field();
    let lighting = scene.time_of_day().lighting();
    let atmosphere = scene.atmosphere().state();
    let water = scene.water();
    let footprint = water.footprint();
    let water_color = water.active_surface().presented_color();
    let reflectivity = scene
        .synchronizer()
        .last()
        .map_or(0.0, |params| params.reflectivity);

    let res = resolution as usize;
    let half = field.half_size();
    let size = field.size();
    let segments = field.segments();
    let background = to_rgb8(atmosphere.sky_at(0.0));

    let pixels: Vec<[u8; 3]> = (0..res * res)
        .into_par_iter()
        .map(|i| {
            if segments == 0 {
                return background;
            }
            let x = ((i % res) as f32 + 0.5) / res as f32 * size - half;
            let z = ((i / res) as f32 + 0.5) / res as f32 * size - half;
            let Some(height) = terrain.height_at(x, z) else {
                return background;
            };

            // Nearest vertex supplies colour and normal
            let col = (((x + half) / size) * segments as f32).round() as usize;
            let row = (((z + half) / size) * segments as f32).round() as usize;
            let idx = field.index(col.min(segments), row.min(segments));
            let normal = field.normals()[idx];

            let sun = dot(normal, lighting.sun_direction).max(0.0) * lighting.sun_intensity;
            let moon = dot(normal, lighting.moon_direction).max(0.0) * lighting.moon_intensity;
            let ambient = lighting.hemisphere_intensity;
            let light = [
                ambient * atmosphere.sky_top[0] + sun * lighting.sun_color[0] + moon * lighting.moon_color[0],
                ambient * atmosphere.sky_top[1] + sun * lighting.sun_color[1] + moon * lighting.moon_color[1],
                ambient * atmosphere.sky_top[2] + sun * lighting.sun_color[2] + moon * lighting.moon_color[2],
            ];

            let color = if height < footprint.height && footprint.contains(x, z) {
                // Water reflects the horizon and takes only part of the direct light
                let base = lerp_rgb(water_color, atmosphere.sky_horizon, clamp01(reflectivity) * 0.5);
                let shade = 0.35 + 0.65 * clamp01(ambient + 0.5 * (lighting.sun_intensity + lighting.moon_intensity));
                [base[0] * shade, base[1] * shade, base[2] * shade]
            } else {
                let base = terrain.colors()[idx];
                [base[0] * light[0], base[1] * light[1], base[2] * light[2]]
            };

            let distance = (x * x + z * z).sqrt();
            to_rgb8(atmosphere.apply_fog(color, distance))
        })
        .collect();

    let mut img: RgbImage = ImageBuffer::new(resolution, resolution);
    for (i, pixel) in pixels.into_iter().enumerate() {
        img.put_pixel((i % res) as u32, (i / res) as u32, Rgb(pixel));
    }
    img
}

/// Write the water normal map, current sky gradient and star field into `dir`
pub fn export_textures(scene: &Scene, dir: &Path, size: u32) -> Result<Vec<PathBuf>, image::ImageError> {
    std::fs::create_dir_all(dir).map_err(image::ImageError::IoError)?;
    let seed = scene.seeds().textures as u32;

    let normals = texture::water_normal_map(size, &NormalMapParams { seed, ..Default::default() });
    let sky = texture::sky_gradient(size.max(1), size, scene.atmosphere().state());
    let stars = texture::star_field(size, seed, 0.004);

    let mut written = Vec::new();
    for (name, image) in [("water_normals.png", normals), ("sky.png", sky), ("stars.png", stars)] {
        let path = dir.join(name);
        image.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::terrain::TerrainConfig;
    use crate::time_of_day::TimeConfig;

    fn small_scene() -> Scene {
        let config = SceneConfig {
            seed: Some(77),
            terrain: TerrainConfig { segments: 32, ..Default::default() },
            time: TimeConfig { hours: 12.0, auto: false, speed: 0.0 },
            ..Default::default()
        };
        Scene::new(config).unwrap()
    }

    #[test]
    fn test_spectral_endpoints() {
        assert_eq!(spectral_colormap(0.0), to_rgb8([0.37, 0.31, 0.64]));
        assert_eq!(spectral_colormap(1.0), to_rgb8([0.62, 0.00, 0.26]));
    }

    #[test]
    fn test_heightmap_matches_grid() {
        let scene = small_scene();
        let img = render_heightmap(scene.terrain());
        assert_eq!(img.dimensions(), (33, 33));
    }

    #[test]
    fn test_night_render_is_darker() {
        let mut scene = small_scene();
        let brightness = |img: &RgbImage| img.pixels().map(|p| p[0] as u64 + p[1] as u64 + p[2] as u64).sum::<u64>();

        let day = brightness(&render_scene(&scene, 48));
        scene.set_hours(0.5);
        let night = brightness(&render_scene(&scene, 48));
        assert!(night < day);
    }

    #[test]
    fn test_lake_pixels_use_water_color() {
        let scene = small_scene();
        let img = render_scene(&scene, 64);
        let field = scene.terrain().field();
        let footprint = scene.water().footprint();

        let mut checked = 0;
        for px in 0..64u32 {
            let x = (px as f32 + 0.5) / 64.0 * field.size() - field.half_size();
            let z = 32.5 / 64.0 * field.size() - field.half_size();
            let submerged = scene.terrain().height_at(x, z).map_or(false, |h| h < footprint.height);
            if submerged && footprint.contains(x, z) {
                let pixel = img.get_pixel(px, 32);
                assert!(pixel[2] > pixel[0], "expected a blue lake pixel, got {:?}", pixel);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }
}
