//! Proximity light pulse

use glam::Vec3;

use crate::error::{Error, Result};

/// Pulse timing and shape.
#[derive(Debug, Clone)]
pub struct ProximityLightConfig {
    /// Seconds for the pulse to reach full intensity. Default: 0.2.
    pub rise_duration: f32,
    /// Seconds for the pulse to fade back to rest. Default: 0.4.
    pub fade_duration: f32,
    /// Intensity at rest (0-1). Default: 0.0.
    pub rest_intensity: f32,
    /// Intensity at the top of the pulse (0-1). Default: 1.0.
    pub peak_intensity: f32,
    /// Light color, linear RGB.
    pub color: Vec3,
}

impl Default for ProximityLightConfig {
    fn default() -> Self {
        Self {
            rise_duration: 0.2,
            fade_duration: 0.4,
            rest_intensity: 0.0,
            peak_intensity: 1.0,
            color: Vec3::new(0.22, 0.55, 1.0),
        }
    }
}

impl ProximityLightConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rise_duration < 0.0 || self.fade_duration < 0.0 {
            return Err(Error::InvalidConfig(
                "proximity light durations must be non-negative".into(),
            ));
        }
        let unit = 0.0_f32..=1.0;
        if !unit.contains(&self.rest_intensity) || !unit.contains(&self.peak_intensity) {
            return Err(Error::InvalidConfig(
                "proximity light intensities must be within 0..=1".into(),
            ));
        }
        Ok(())
    }
}

/// Pulse phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulsePhase {
    #[default]
    Idle,
    Rising,
    Fading,
}

/// Light carried by a cursor, pulsed when the cursor presses something.
#[derive(Debug, Clone)]
pub struct ProximityLight {
    pub config: ProximityLightConfig,
    phase: PulsePhase,
    elapsed: f32,
    intensity: f32,
    pulses: u32,
}

impl ProximityLight {
    pub fn new(config: ProximityLightConfig) -> Self {
        let intensity = config.rest_intensity;
        Self {
            config,
            phase: PulsePhase::Idle,
            elapsed: 0.0,
            intensity,
            pulses: 0,
        }
    }

    /// Start a pulse. A pulse in progress restarts from its current intensity.
    pub fn pulse(&mut self) {
        self.phase = PulsePhase::Rising;
        self.elapsed = self.rise_progress_for(self.intensity) * self.config.rise_duration;
        self.pulses += 1;
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    /// Current intensity, between rest and peak.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Number of pulses started so far.
    pub fn pulse_count(&self) -> u32 {
        self.pulses
    }

    fn rise_progress_for(&self, intensity: f32) -> f32 {
        let span = self.config.peak_intensity - self.config.rest_intensity;
        if span.abs() <= f32::EPSILON {
            return 1.0;
        }
        ((intensity - self.config.rest_intensity) / span).clamp(0.0, 1.0)
    }

    /// Advance the pulse by `delta_time` seconds.
    pub fn advance(&mut self, delta_time: f32) {
        let rest = self.config.rest_intensity;
        let peak = self.config.peak_intensity;
        let mut dt = delta_time;

        // A long frame may finish rising and start fading in one step.
        if self.phase == PulsePhase::Rising {
            self.elapsed += dt;
            let rise = self.config.rise_duration;
            if self.elapsed < rise {
                self.intensity = rest + (peak - rest) * (self.elapsed / rise);
                return;
            }
            dt = self.elapsed - rise;
            self.phase = PulsePhase::Fading;
            self.elapsed = 0.0;
            self.intensity = peak;
        }

        if self.phase == PulsePhase::Fading {
            self.elapsed += dt;
            let fade = self.config.fade_duration;
            if self.elapsed < fade {
                self.intensity = peak + (rest - peak) * (self.elapsed / fade);
            } else {
                self.phase = PulsePhase::Idle;
                self.elapsed = 0.0;
                self.intensity = rest;
            }
        }
    }
}

impl Default for ProximityLight {
    fn default() -> Self {
        Self::new(ProximityLightConfig::default())
    }
}

/// Advance every proximity light pulse.
pub fn proximity_light_system(world: &mut hecs::World, delta_time: f32) {
    for (_, light) in world.query_mut::<&mut ProximityLight>() {
        if light.phase != PulsePhase::Idle {
            light.advance(delta_time);
        }
    }
}
