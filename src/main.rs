use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use lakeside::atmosphere::Weather;
use lakeside::config::SceneConfig;
use lakeside::export;
use lakeside::scene::{FrameInput, Scene};
use lakeside::time_of_day::format_clock;
use lakeside::viewer;
use lakeside::water::WaterQuality;

#[derive(Parser, Debug)]
#[command(name = "lakeside")]
#[command(about = "Lake-ringed terrain with a day/night cycle and tiered water")]
struct Args {
    /// JSON scene configuration (defaults are used for anything it omits)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Master seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Terrain edge length in world units
    #[arg(long)]
    size: Option<f32>,

    /// Terrain grid segments per side
    #[arg(long)]
    segments: Option<usize>,

    /// Initial hour of day (0-24)
    #[arg(long)]
    hours: Option<f32>,

    /// In-game hours per second while auto time runs
    #[arg(long)]
    speed: Option<f32>,

    /// Enable or disable automatic time (true/false)
    #[arg(long)]
    auto: Option<bool>,

    /// Simulate this many frames before exporting
    #[arg(long, default_value = "0")]
    frames: usize,

    /// Seconds per simulated frame
    #[arg(long, default_value = "0.016")]
    dt: f32,

    /// Water quality tier (ultra, high, low, static)
    #[arg(short, long)]
    quality: Option<WaterQuality>,

    /// Weather (clear, rain, fog)
    #[arg(short, long)]
    weather: Option<Weather>,

    /// Export the lit scene to PNG
    #[arg(long)]
    export_terrain: Option<PathBuf>,

    /// Export the terrain heightmap (spectral colormap) to PNG
    #[arg(long)]
    export_heightmap: Option<PathBuf>,

    /// Export procedural textures into this directory
    #[arg(long)]
    export_textures: Option<PathBuf>,

    /// Resolution of exported scene and texture images
    #[arg(long, default_value = "512")]
    resolution: u32,

    /// Water normal map resolution (0 renders the water without one)
    #[arg(long, default_value = "256")]
    normal_map_size: u32,

    /// Print the lighting for every hour of the day
    #[arg(long)]
    sweep: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Open the interactive viewer
    #[arg(long)]
    view: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            println!("Loading configuration from {}", path.display());
            SceneConfig::load(path)?
        }
        None => SceneConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(size) = args.size {
        config.terrain.size = size;
    }
    if let Some(segments) = args.segments {
        config.terrain.segments = segments;
    }
    if let Some(hours) = args.hours {
        config.time.hours = hours;
    }
    if let Some(speed) = args.speed {
        config.time.speed = speed;
    }
    if let Some(auto) = args.auto {
        config.time.auto = auto;
    }
    if let Some(quality) = args.quality {
        config.water.initial_quality = Some(quality);
    }
    if let Some(weather) = args.weather {
        config.atmosphere.weather = weather;
    }

    if args.dump_config {
        config.resolve_seeds();
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    println!("Building scene...");
    let mut scene = Scene::new(config)?;
    scene.print_summary();

    if args.normal_map_size > 0 {
        println!("Generating {}x{} water normal map...", args.normal_map_size, args.normal_map_size);
        scene.attach_water_normals(args.normal_map_size);
    }

    if args.sweep {
        println!("Lighting over 24 hours:");
        let start = scene.hours();
        for hour in 0..24 {
            scene.set_hours(hour as f32).lighting.print_summary();
        }
        scene.set_hours(start);
    }

    if args.frames > 0 {
        println!("Simulating {} frames (dt {}s)...", args.frames, args.dt);
        for i in 0..args.frames {
            let out = scene.frame(args.dt, FrameInput::default());
            if (i + 1) % 600 == 0 {
                println!("  frame {}: {} daylight {:.3}", out.frame, format_clock(out.lighting.hours), out.lighting.daylight_factor);
            }
        }
    }
    scene.time_of_day().lighting().print_summary();

    if let Some(path) = &args.export_heightmap {
        println!("Exporting heightmap to {}...", path.display());
        export::export_heightmap(scene.terrain(), path)?;
    }

    if let Some(path) = &args.export_terrain {
        println!("Exporting lit scene to {}...", path.display());
        export::export_scene(&scene, args.resolution, path)?;
    }

    if let Some(dir) = &args.export_textures {
        println!("Exporting textures to {}...", dir.display());
        for path in export::export_textures(&scene, dir, args.resolution)? {
            println!("  wrote {}", path.display());
        }
    }

    if args.view {
        viewer::run_viewer(&mut scene, 640)?;
    }

    println!("Done!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_flag_takes_a_value() {
        let args = Args::try_parse_from(["lakeside", "--auto", "false"]).unwrap();
        assert_eq!(args.auto, Some(false));
        let args = Args::try_parse_from(["lakeside", "--auto", "true"]).unwrap();
        assert_eq!(args.auto, Some(true));
        let args = Args::try_parse_from(["lakeside"]).unwrap();
        assert_eq!(args.auto, None);
    }
}
