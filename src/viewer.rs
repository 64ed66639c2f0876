use std::time::Instant;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::export;
use crate::scene::{FrameInput, Scene};
use crate::time_of_day::TimePreset;
use crate::water::WaterQuality;

/// In-game hours per second while an arrow key is held
const SCRUB_RATE: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
enum ViewMode {
    Lit,
    Heightmap,
}

/// Run the interactive top-down preview, driving the scene's frame loop.
/// Space toggles auto time, arrows scrub, D/N jump to day/night, 1-4 pick the
/// water tier, W cycles weather, H toggles the heightmap, Escape exits.
pub fn run_viewer(scene: &mut Scene, size: usize) -> Result<(), minifb::Error> {
    let mut window = Window::new(
        "Lakeside - Space: Auto, Arrows: Scrub, D/N: Day/Night, 1-4: Water, W: Weather, Esc: Exit",
        size,
        size,
        WindowOptions {
            resize: false,
            scale: minifb::Scale::X1,
            ..WindowOptions::default()
        },
    )?;

    // Limit to ~60fps
    window.set_target_fps(60);

    println!("Viewer started. Controls:");
    println!("  Space: Toggle automatic time");
    println!("  Left/Right: Scrub time");
    println!("  D / N: Jump to day / night");
    println!("  1-4: Water quality (ultra, high, low, static)");
    println!("  W: Cycle weather");
    println!("  H: Toggle heightmap view");
    println!("  Esc: Exit");

    let mut view_mode = ViewMode::Lit;
    let mut last = Instant::now();
    let mut last_title = String::new();

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let mut input = FrameInput {
            toggle_auto: window.is_key_pressed(Key::Space, KeyRepeat::No),
            ..Default::default()
        };

        if window.is_key_pressed(Key::D, KeyRepeat::No) {
            input.hours = Some(TimePreset::Day.hours());
        } else if window.is_key_pressed(Key::N, KeyRepeat::No) {
            input.hours = Some(TimePreset::Night.hours());
        } else if window.is_key_down(Key::Left) {
            input.hours = Some(scene.hours() - SCRUB_RATE * dt);
        } else if window.is_key_down(Key::Right) {
            input.hours = Some(scene.hours() + SCRUB_RATE * dt);
        }

        input.quality = if window.is_key_pressed(Key::Key1, KeyRepeat::No) {
            Some(WaterQuality::Ultra)
        } else if window.is_key_pressed(Key::Key2, KeyRepeat::No) {
            Some(WaterQuality::High)
        } else if window.is_key_pressed(Key::Key3, KeyRepeat::No) {
            Some(WaterQuality::Low)
        } else if window.is_key_pressed(Key::Key4, KeyRepeat::No) {
            Some(WaterQuality::Static)
        } else {
            None
        };

        if window.is_key_pressed(Key::W, KeyRepeat::No) {
            input.weather = Some(scene.atmosphere().weather().next());
        }
        if window.is_key_pressed(Key::H, KeyRepeat::No) {
            view_mode = match view_mode {
                ViewMode::Lit => ViewMode::Heightmap,
                ViewMode::Heightmap => ViewMode::Lit,
            };
        }

        let toggled = input.toggle_auto;
        let weather_requested = input.weather.is_some();
        let out = scene.frame(dt, input);

        if toggled {
            println!("Auto time: {}", if scene.time_of_day().is_auto() { "on" } else { "off" });
        }
        if out.quality_changed {
            println!("Water quality: {}", out.quality);
        }
        if weather_requested {
            println!("Weather: {}", out.atmosphere.weather);
        }

        let title = format!(
            "Lakeside - {} {} - water {} - {}",
            scene.collaborators().hud.text,
            if out.signal.is_daytime { "day" } else { "night" },
            out.quality,
            out.atmosphere.weather
        );
        if title != last_title {
            window.set_title(&title);
            last_title = title;
        }

        let buffer = render_view(scene, view_mode, size);
        window.update_with_buffer(&buffer, size, size)?;
    }
    Ok(())
}

/// Render the current view mode to a pixel buffer
fn render_view(scene: &Scene, mode: ViewMode, size: usize) -> Vec<u32> {
    let img = match mode {
        ViewMode::Lit => export::render_scene(scene, size as u32),
        ViewMode::Heightmap => export::render_heightmap(scene.terrain()),
    };

    let img_width = img.width() as usize;
    let img_height = img.height() as usize;

    // Start with dark background
    let bg_color: u32 = (5 << 16) | (5 << 8) | 15;
    let mut buffer = vec![bg_color; size * size];
    if img_width == 0 || img_height == 0 {
        return buffer;
    }

    // Nearest-neighbour scale onto the window
    for oy in 0..size {
        let iy = oy * img_height / size;
        for ox in 0..size {
            let ix = ox * img_width / size;
            let pixel = img.get_pixel(ix as u32, iy as u32);
            buffer[oy * size + ox] = ((pixel[0] as u32) << 16) | ((pixel[1] as u32) << 8) | pixel[2] as u32;
        }
    }
    buffer
}
