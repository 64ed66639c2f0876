//! Scene composition root
//!
//! Owns every core component of one lakeside scene. Nothing is global, so
//! several scenes can coexist and tests build isolated instances.
//!
//! Per-frame order:
//! 1. quality and weather requests
//! 2. clock advance, or the manual hours override
//! 3. lighting derivation
//! 4. water synchronization (reads the fresh daylight factor)
//! 5. sky and fog
//! 6. observer notification

use crate::atmosphere::{Atmosphere, AtmosphereState, Weather};
use crate::config::{ConfigError, SceneConfig};
use crate::seeds::SceneSeeds;
use crate::signals::{Collaborators, DaylightObserver, DaylightSignal};
use crate::terrain::{Terrain, TerrainBuilder};
use crate::texture::{water_normal_map, NormalMapParams};
use crate::time_of_day::{format_clock, LightingSnapshot, TimeOfDay, TimePreset};
use crate::water::{WaterQuality, WaterSurfaceSet};
use crate::water_sync::{WaterParams, WaterSynchronizer};

/// Requests gathered from input handling for one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Manual clock override, applied instead of auto advance
    pub hours: Option<f32>,
    pub quality: Option<WaterQuality>,
    pub weather: Option<Weather>,
    pub toggle_auto: bool,
}

impl FrameInput {
    pub fn hours(hours: f32) -> Self {
        Self {
            hours: Some(hours),
            ..Default::default()
        }
    }

    pub fn quality(quality: WaterQuality) -> Self {
        Self {
            quality: Some(quality),
            ..Default::default()
        }
    }
}

/// Everything a frame produced for the renderer and collaborators
#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub frame: u64,
    pub signal: DaylightSignal,
    pub lighting: LightingSnapshot,
    pub atmosphere: AtmosphereState,
    pub water: WaterParams,
    pub quality: WaterQuality,
    pub quality_changed: bool,
    /// Whether the clock moved this frame
    pub clock_moved: bool,
}

pub struct Scene {
    config: SceneConfig,
    seeds: SceneSeeds,
    terrain: Terrain,
    water: WaterSurfaceSet,
    clock: TimeOfDay,
    sync: WaterSynchronizer,
    atmosphere: Atmosphere,
    collaborators: Collaborators,
    observers: Vec<Box<dyn DaylightObserver>>,
    frame: u64,
}

impl Scene {
    /// Validate the configuration, build terrain and water from the same
    /// shoreline descriptor, and bring every dependent up to the initial hour.
    pub fn new(mut config: SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seeds = config.resolve_seeds();

        let terrain = TerrainBuilder::new(&config.terrain, &config.shoreline, config.water.height).build()?;
        let water = WaterSurfaceSet::new(&config.water, &config.shoreline)?;
        let clock = TimeOfDay::new(config.sky.clone(), &config.time);
        let sync = WaterSynchronizer::new(config.water_palette.clone());
        let atmosphere = Atmosphere::new(config.atmosphere.clone(), clock.lighting());

        let mut scene = Self {
            config,
            seeds,
            terrain,
            water,
            clock,
            sync,
            atmosphere,
            collaborators: Collaborators::default(),
            observers: Vec::new(),
            frame: 0,
        };
        scene.propagate(0.0);
        Ok(scene)
    }

    /// Run one frame
    pub fn frame(&mut self, dt: f32, input: FrameInput) -> FrameOutput {
        let quality_changed = match input.quality {
            Some(quality) => self.water.set_quality(quality),
            None => false,
        };
        if let Some(weather) = input.weather {
            self.atmosphere.set_weather(weather);
        }
        if input.toggle_auto {
            self.clock.toggle_auto();
        }

        let clock_moved = match input.hours {
            Some(hours) if hours.is_finite() => {
                self.clock.set_hours(hours);
                true
            }
            _ => self.clock.advance(dt),
        };

        let (water, signal) = self.propagate(dt);
        self.frame += 1;

        FrameOutput {
            frame: self.frame,
            signal,
            lighting: self.clock.lighting().clone(),
            atmosphere: self.atmosphere.state().clone(),
            water,
            quality: self.water.quality(),
            quality_changed,
            clock_moved,
        }
    }

    /// Jump the clock and push the result to every dependent immediately
    pub fn set_hours(&mut self, hours: f32) -> FrameOutput {
        self.frame(0.0, FrameInput::hours(hours))
    }

    pub fn apply_preset(&mut self, preset: TimePreset) -> FrameOutput {
        self.set_hours(preset.hours())
    }

    pub fn set_quality(&mut self, quality: WaterQuality) -> bool {
        self.water.set_quality(quality)
    }

    /// Generate one tileable normal map and attach it to every animated tier.
    /// Until this runs the water renders undistorted.
    pub fn attach_water_normals(&mut self, size: u32) {
        let params = NormalMapParams {
            seed: self.seeds.textures as u32,
            ..Default::default()
        };
        let image = water_normal_map(size, &params);
        for surface in self.water.animated_surfaces_mut() {
            surface.attach_normal_map(image.clone());
        }
    }

    /// Register an extra collaborator; it receives the current state at once
    pub fn add_observer(&mut self, mut observer: Box<dyn DaylightObserver>) {
        observer.on_daylight(&DaylightSignal::from_lighting(self.clock.lighting()));
        self.observers.push(observer);
    }

    // Steps 4-6 of the frame order
    fn propagate(&mut self, dt: f32) -> (WaterParams, DaylightSignal) {
        let lighting = self.clock.lighting();
        let water = self
            .sync
            .sync(&mut self.water, lighting.daylight_factor, dt, self.atmosphere.wave_boost());
        self.atmosphere.update(lighting);

        let signal = DaylightSignal::from_lighting(lighting);
        self.collaborators.on_daylight(&signal);
        for observer in &mut self.observers {
            observer.on_daylight(&signal);
        }
        (water, signal)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn seeds(&self) -> &SceneSeeds {
        &self.seeds
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn water(&self) -> &WaterSurfaceSet {
        &self.water
    }

    pub fn time_of_day(&self) -> &TimeOfDay {
        &self.clock
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn synchronizer(&self) -> &WaterSynchronizer {
        &self.sync
    }

    pub fn hours(&self) -> f32 {
        self.clock.hours()
    }

    pub fn is_daytime(&self) -> bool {
        self.clock.is_daytime()
    }

    pub fn daylight_factor(&self) -> f32 {
        self.clock.daylight_factor()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn print_summary(&self) {
        println!("Seeds: {}", self.seeds);
        self.terrain.stats().print_summary();
        let fp = self.water.footprint();
        println!(
            "Water: {} outline vertices, radius {:.1}, height {:.2}, quality {}",
            fp.outline.len(),
            fp.radius,
            fp.height,
            self.water.quality()
        );
        println!(
            "Clock: {} (auto {}, speed {}), weather {}",
            format_clock(self.clock.hours()),
            if self.clock.is_auto() { "on" } else { "off" },
            self.clock.state().speed,
            self.atmosphere.weather()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::shoreline::ShorelineField;
    use crate::terrain::TerrainConfig;
    use crate::time_of_day::TimeConfig;

    fn test_config() -> SceneConfig {
        SceneConfig {
            seed: Some(2024),
            terrain: TerrainConfig { segments: 64, ..Default::default() },
            time: TimeConfig { hours: 10.0, auto: false, speed: 1.0 },
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_noon() {
        let mut scene = Scene::new(test_config()).unwrap();
        let out = scene.set_hours(13.0);
        assert!(scene.is_daytime());
        assert!(scene.daylight_factor() > 0.9);
        assert!(out.signal.is_daytime);
        assert!(!scene.collaborators().fire.enabled);
        assert_eq!(scene.collaborators().hud.text, "13.00");
    }

    #[test]
    fn test_scenario_night() {
        let mut scene = Scene::new(test_config()).unwrap();
        let out = scene.set_hours(1.0);
        assert!(!scene.is_daytime());
        assert!(out.lighting.moon_intensity > 0.0);
        assert_eq!(out.lighting.sun_intensity, 0.0);
        assert!(scene.collaborators().fire.enabled);
        assert!(scene.collaborators().torch.night_mode);
    }

    #[test]
    fn test_water_tint_is_never_stale() {
        let mut scene = Scene::new(test_config()).unwrap();
        for hours in [5.0, 6.3, 12.0, 18.2, 23.0] {
            let out = scene.set_hours(hours);
            let expected = scene.synchronizer().palette().blend(out.lighting.daylight_factor);
            assert_eq!(out.water, expected);
            assert_eq!(scene.water().active_surface().presented_color(), expected.color);
        }
    }

    #[test]
    fn test_quality_switch_keeps_color() {
        let mut scene = Scene::new(test_config()).unwrap();
        let before = scene.set_hours(18.3).water.color;
        let out = scene.frame(0.0, FrameInput::quality(WaterQuality::Low));
        assert!(out.quality_changed);
        assert_eq!(scene.water().visible_count(), 1);
        assert_eq!(scene.water().active_surface().presented_color(), before);

        let again = scene.frame(0.0, FrameInput::quality(WaterQuality::Low));
        assert!(!again.quality_changed);
        assert_eq!(scene.water().switch_count(), 1);
    }

    #[test]
    fn test_auto_advance() {
        let mut scene = Scene::new(test_config()).unwrap();
        let out = scene.frame(3600.0, FrameInput::default());
        assert!(!out.clock_moved);
        assert_eq!(scene.hours(), 10.0);

        scene.frame(0.0, FrameInput { toggle_auto: true, ..Default::default() });
        let out = scene.frame(3.5, FrameInput::default());
        assert!(out.clock_moved);
        assert!((scene.hours() - 13.5).abs() < 1e-4);

        // Override wins over auto advance
        scene.frame(100.0, FrameInput::hours(22.0));
        assert_eq!(scene.hours(), 22.0);
    }

    #[test]
    fn test_observer_receives_every_update() {
        struct Recorder(Rc<RefCell<Vec<f32>>>);
        impl DaylightObserver for Recorder {
            fn on_daylight(&mut self, signal: &DaylightSignal) {
                self.0.borrow_mut().push(signal.hours);
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new(test_config()).unwrap();
        scene.add_observer(Box::new(Recorder(Rc::clone(&seen))));
        scene.set_hours(7.0);
        scene.set_hours(21.0);
        assert_eq!(*seen.borrow(), vec![10.0, 7.0, 21.0]);
    }

    #[test]
    fn test_terrain_and_water_share_shoreline() {
        let scene = Scene::new(test_config()).unwrap();
        let config = scene.config();
        let shore = ShorelineField::new(&config.shoreline);
        let half = config.terrain.size * 0.5;
        let island = config.terrain.plateau.radius + config.terrain.plateau.blend;
        let footprint = scene.water().footprint();

        let mut checked = 0;
        for p in scene.terrain().field().positions() {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt() / half;
            if r > island && shore.sample(p[0], p[2]).water >= 1.0 {
                assert!(footprint.contains(p[0], p[2]));
                assert!(p[1] < footprint.height);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_no_submerged_land_outside_water() {
        for seed in [1, 7, 2024] {
            let scene = Scene::new(SceneConfig { seed: Some(seed), ..test_config() }).unwrap();
            let footprint = scene.water().footprint();
            let stray: Vec<&[f32; 3]> = scene
                .terrain()
                .field()
                .positions()
                .iter()
                .filter(|p| p[1] < footprint.height && !footprint.contains(p[0], p[2]))
                .collect();
            assert!(stray.is_empty(), "seed {}: {} vertices below water outside the lake", seed, stray.len());

            let half = scene.config().terrain.size * 0.5 - 1.0;
            for (x, z) in [(half, half), (-half, half), (half, -half), (-half, -half)] {
                assert!(scene.terrain().is_dry(x, z));
            }
        }
    }

    #[test]
    fn test_weather_request() {
        let mut scene = Scene::new(test_config()).unwrap();
        let calm = scene.set_hours(12.0).water.wave_scale;
        let out = scene.frame(0.0, FrameInput { weather: Some(Weather::Rain), ..Default::default() });
        assert_eq!(out.atmosphere.weather, Weather::Rain);
        assert!(out.water.wave_scale > calm);
    }

    #[test]
    fn test_normal_maps_enable_distortion() {
        let mut scene = Scene::new(test_config()).unwrap();
        assert_eq!(scene.water().active_surface().uniform().unwrap().distortion, 0.0);
        scene.attach_water_normals(16);
        for surface in scene.water().animated_surfaces() {
            assert!(surface.normal_map().is_some());
            assert!(surface.uniform().unwrap().distortion > 0.0);
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = test_config();
        config.terrain.size = f32::NAN;
        assert!(Scene::new(config).is_err());
    }
}
