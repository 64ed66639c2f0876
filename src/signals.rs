//! Day/night outputs for the collaborators around the core
//!
//! Fire effects, torches, ambient audio and the HUD never read the clock
//! themselves. They receive a [`DaylightSignal`] after each derivation.

use crate::lattice::clamp01;
use crate::time_of_day::{format_clock, LightingSnapshot};

/// Per-frame day/night snapshot handed to observers
#[derive(Clone, Debug, PartialEq)]
pub struct DaylightSignal {
    pub hours: f32,
    pub is_daytime: bool,
    pub daylight_factor: f32,
    pub sun_direction: [f32; 3],
    pub sun_color: [f32; 3],
    pub moon_direction: [f32; 3],
    pub moon_color: [f32; 3],
}

impl DaylightSignal {
    pub fn from_lighting(lighting: &LightingSnapshot) -> Self {
        Self {
            hours: lighting.hours,
            is_daytime: lighting.is_daytime,
            daylight_factor: lighting.daylight_factor,
            sun_direction: lighting.sun_direction,
            sun_color: lighting.sun_color,
            moon_direction: lighting.moon_direction,
            moon_color: lighting.moon_color,
        }
    }
}

/// Receives every daylight update
pub trait DaylightObserver {
    fn on_daylight(&mut self, signal: &DaylightSignal);
}

/// Fire effects only burn at night
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FireGate {
    pub enabled: bool,
    /// Number of on/off flips observed
    pub transitions: u32,
}

impl DaylightObserver for FireGate {
    fn on_daylight(&mut self, signal: &DaylightSignal) {
        let enabled = !signal.is_daytime;
        if enabled != self.enabled {
            self.enabled = enabled;
            self.transitions += 1;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TorchMode {
    pub night_mode: bool,
}

impl DaylightObserver for TorchMode {
    fn on_daylight(&mut self, signal: &DaylightSignal) {
        self.night_mode = !signal.is_daytime;
    }
}

/// Day and night ambience gains, cross-faded on the daylight factor
#[derive(Clone, Debug, PartialEq)]
pub struct AmbientMix {
    pub master: f32,
    pub day_gain: f32,
    pub night_gain: f32,
}

impl AmbientMix {
    pub fn new(master: f32) -> Self {
        Self {
            master: clamp01(master),
            day_gain: 0.0,
            night_gain: clamp01(master),
        }
    }

    /// Track that dominates the current mix
    pub fn dominant(&self) -> &'static str {
        if self.day_gain >= self.night_gain {
            "day"
        } else {
            "night"
        }
    }
}

impl Default for AmbientMix {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DaylightObserver for AmbientMix {
    fn on_daylight(&mut self, signal: &DaylightSignal) {
        let t = clamp01(signal.daylight_factor);
        self.day_gain = self.master * t;
        self.night_gain = self.master * (1.0 - t);
    }
}

/// `HH.MM` clock text
#[derive(Clone, Debug, PartialEq)]
pub struct HudClock {
    pub text: String,
}

impl Default for HudClock {
    fn default() -> Self {
        Self {
            text: format_clock(0.0),
        }
    }
}

impl DaylightObserver for HudClock {
    fn on_daylight(&mut self, signal: &DaylightSignal) {
        self.text = format_clock(signal.hours);
    }
}

/// The built-in collaborators, updated together
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collaborators {
    pub fire: FireGate,
    pub torch: TorchMode,
    pub ambient: AmbientMix,
    pub hud: HudClock,
}

impl DaylightObserver for Collaborators {
    fn on_daylight(&mut self, signal: &DaylightSignal) {
        self.fire.on_daylight(signal);
        self.torch.on_daylight(signal);
        self.ambient.on_daylight(signal);
        self.hud.on_daylight(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_of_day::{derive_lighting, SkyConfig};

    fn signal(hours: f32) -> DaylightSignal {
        DaylightSignal::from_lighting(&derive_lighting(&SkyConfig::default(), hours))
    }

    #[test]
    fn test_fire_and_torch_follow_night() {
        let mut c = Collaborators::default();
        c.on_daylight(&signal(1.0));
        assert!(c.fire.enabled);
        assert!(c.torch.night_mode);

        c.on_daylight(&signal(13.0));
        assert!(!c.fire.enabled);
        assert!(!c.torch.night_mode);
        assert_eq!(c.fire.transitions, 2);

        // Repeated signals don't count as transitions
        c.on_daylight(&signal(13.5));
        assert_eq!(c.fire.transitions, 2);
    }

    #[test]
    fn test_ambient_crossfade() {
        let mut mix = AmbientMix::new(0.8);
        mix.on_daylight(&signal(13.0));
        assert_eq!(mix.dominant(), "day");
        assert!((mix.day_gain + mix.night_gain - 0.8).abs() < 1e-5);

        mix.on_daylight(&signal(1.0));
        assert_eq!(mix.day_gain, 0.0);
        assert_eq!(mix.night_gain, 0.8);
    }

    #[test]
    fn test_hud_clock_text() {
        let mut hud = HudClock::default();
        assert_eq!(hud.text, "00.00");
        hud.on_daylight(&signal(13.5));
        assert_eq!(hud.text, "13.30");
    }
}
