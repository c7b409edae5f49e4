//! User-adjustable simulation parameters.
//!
//! Every value that reaches [`SimulationConfig`] is clamped into its
//! documented range. Callers never see a validation error for a bad number:
//! non-numeric text and NaN resolve to the parameter minimum, infinities and
//! out-of-range values snap to the nearest bound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lower bound applied to the particle count everywhere (config and governor).
pub const MIN_PARTICLES: u32 = 100;
/// Upper bound for the particle count.
pub const MAX_PARTICLES: u32 = 5000;

/// Quality preset that trades lensing/bloom fidelity for frame time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    #[default]
    High,
    Medium,
    Low,
}

impl PerformanceMode {
    /// Number of ray-march steps the lensing pass may spend per pixel.
    pub fn lensing_steps(self) -> u32 {
        match self {
            PerformanceMode::High => 48,
            PerformanceMode::Medium => 32,
            PerformanceMode::Low => 16,
        }
    }

    /// Fraction of the surface resolution used for the bloom chain.
    pub fn bloom_resolution_scale(self) -> f32 {
        match self {
            PerformanceMode::High => 1.0,
            PerformanceMode::Medium => 0.5,
            PerformanceMode::Low => 0.25,
        }
    }

    /// Multiplier applied to the configured particle count.
    pub fn particle_scale(self) -> f32 {
        match self {
            PerformanceMode::High => 1.0,
            PerformanceMode::Medium => 0.75,
            PerformanceMode::Low => 0.5,
        }
    }

    /// Lenient parse used for raw updates; unknown names fall back to the default.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl FromStr for PerformanceMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(PerformanceMode::High),
            "medium" | "med" => Ok(PerformanceMode::Medium),
            "low" => Ok(PerformanceMode::Low),
            other => Err(format!(
                "unknown performance mode '{other}'; expected high, medium, or low"
            )),
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceMode::High => f.write_str("high"),
            PerformanceMode::Medium => f.write_str("medium"),
            PerformanceMode::Low => f.write_str("low"),
        }
    }
}

/// Numeric parameters exposed to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    ParticleCount,
    DiskRotationSpeed,
    LensingIntensity,
    CameraSensitivity,
    BloomStrength,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::ParticleCount,
        Parameter::DiskRotationSpeed,
        Parameter::LensingIntensity,
        Parameter::CameraSensitivity,
        Parameter::BloomStrength,
    ];

    /// Inclusive `(min, max)` range of the parameter.
    pub fn bounds(self) -> (f32, f32) {
        match self {
            Parameter::ParticleCount => (MIN_PARTICLES as f32, MAX_PARTICLES as f32),
            Parameter::DiskRotationSpeed => (0.1, 5.0),
            Parameter::LensingIntensity => (0.0, 2.0),
            Parameter::CameraSensitivity => (0.1, 2.0),
            Parameter::BloomStrength => (0.0, 3.0),
        }
    }

    /// Canonical snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Parameter::ParticleCount => "particle_count",
            Parameter::DiskRotationSpeed => "disk_rotation_speed",
            Parameter::LensingIntensity => "lensing_intensity",
            Parameter::CameraSensitivity => "camera_sensitivity",
            Parameter::BloomStrength => "bloom_strength",
        }
    }

    /// Accepts snake_case, kebab-case, and camelCase spellings.
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .trim()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "particlecount" | "particles" => Some(Parameter::ParticleCount),
            "diskrotationspeed" | "rotationspeed" => Some(Parameter::DiskRotationSpeed),
            "lensingintensity" | "lensing" => Some(Parameter::LensingIntensity),
            "camerasensitivity" | "sensitivity" => Some(Parameter::CameraSensitivity),
            "bloomstrength" | "bloom" => Some(Parameter::BloomStrength),
            _ => None,
        }
    }

    /// Clamps a numeric input into range. NaN resolves to the minimum.
    pub fn clamp(self, raw: f32) -> f32 {
        let (min, max) = self.bounds();
        let value = if raw.is_nan() { min } else { raw.clamp(min, max) };
        if matches!(self, Parameter::ParticleCount) {
            value.round()
        } else {
            value
        }
    }

    /// Parses text input; anything that is not a number resolves to the minimum.
    pub fn clamp_str(self, raw: &str) -> f32 {
        match raw.trim().parse::<f32>() {
            Ok(value) => self.clamp(value),
            Err(_) => self.bounds().0,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
    #[error("expected KEY=VALUE, got '{0}'")]
    MalformedAssignment(String),
}

/// Fully resolved simulation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub particle_count: u32,
    pub disk_rotation_speed: f32,
    pub lensing_intensity: f32,
    pub camera_sensitivity: f32,
    pub bloom_strength: f32,
    pub performance_mode: PerformanceMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 1000,
            disk_rotation_speed: 1.0,
            lensing_intensity: 1.0,
            camera_sensitivity: 1.0,
            bloom_strength: 1.5,
            performance_mode: PerformanceMode::High,
        }
    }
}

impl SimulationConfig {
    /// Returns a copy with every field clamped into range.
    pub fn sanitized(self) -> Self {
        Self {
            particle_count: Parameter::ParticleCount.clamp(self.particle_count as f32) as u32,
            disk_rotation_speed: Parameter::DiskRotationSpeed.clamp(self.disk_rotation_speed),
            lensing_intensity: Parameter::LensingIntensity.clamp(self.lensing_intensity),
            camera_sensitivity: Parameter::CameraSensitivity.clamp(self.camera_sensitivity),
            bloom_strength: Parameter::BloomStrength.clamp(self.bloom_strength),
            performance_mode: self.performance_mode,
        }
    }

    /// Applies a partial update and returns the resolved configuration.
    pub fn apply(&mut self, update: &ConfigUpdate) -> SimulationConfig {
        if let Some(value) = update.particle_count {
            self.particle_count = Parameter::ParticleCount.clamp(value) as u32;
        }
        if let Some(value) = update.disk_rotation_speed {
            self.disk_rotation_speed = Parameter::DiskRotationSpeed.clamp(value);
        }
        if let Some(value) = update.lensing_intensity {
            self.lensing_intensity = Parameter::LensingIntensity.clamp(value);
        }
        if let Some(value) = update.camera_sensitivity {
            self.camera_sensitivity = Parameter::CameraSensitivity.clamp(value);
        }
        if let Some(value) = update.bloom_strength {
            self.bloom_strength = Parameter::BloomStrength.clamp(value);
        }
        if let Some(mode) = update.performance_mode {
            self.performance_mode = mode;
        }
        *self
    }

    /// Reads a numeric parameter back as `f32`.
    pub fn get(&self, parameter: Parameter) -> f32 {
        match parameter {
            Parameter::ParticleCount => self.particle_count as f32,
            Parameter::DiskRotationSpeed => self.disk_rotation_speed,
            Parameter::LensingIntensity => self.lensing_intensity,
            Parameter::CameraSensitivity => self.camera_sensitivity,
            Parameter::BloomStrength => self.bloom_strength,
        }
    }
}

/// Partial configuration change; `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigUpdate {
    pub particle_count: Option<f32>,
    pub disk_rotation_speed: Option<f32>,
    pub lensing_intensity: Option<f32>,
    pub camera_sensitivity: Option<f32>,
    pub bloom_strength: Option<f32>,
    pub performance_mode: Option<PerformanceMode>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sets a numeric parameter; the value is clamped when applied.
    pub fn set(&mut self, parameter: Parameter, value: f32) -> &mut Self {
        let slot = match parameter {
            Parameter::ParticleCount => &mut self.particle_count,
            Parameter::DiskRotationSpeed => &mut self.disk_rotation_speed,
            Parameter::LensingIntensity => &mut self.lensing_intensity,
            Parameter::CameraSensitivity => &mut self.camera_sensitivity,
            Parameter::BloomStrength => &mut self.bloom_strength,
        };
        *slot = Some(value);
        self
    }

    /// Sets a parameter from raw text such as a form field or CLI flag.
    pub fn set_raw(&mut self, key: &str, raw: &str) -> Result<&mut Self, UpdateError> {
        let normalized = key.trim().to_ascii_lowercase().replace('-', "_");
        if matches!(
            normalized.as_str(),
            "performance_mode" | "performancemode" | "performance"
        ) {
            self.performance_mode = Some(PerformanceMode::parse_lenient(raw));
            return Ok(self);
        }
        let parameter =
            Parameter::from_key(key).ok_or_else(|| UpdateError::UnknownKey(key.to_string()))?;
        Ok(self.set(parameter, parameter.clamp_str(raw)))
    }

    /// Parses `key=value` and records it.
    pub fn set_assignment(&mut self, assignment: &str) -> Result<&mut Self, UpdateError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| UpdateError::MalformedAssignment(assignment.to_string()))?;
        self.set_raw(key, value)
    }

    /// Folds `other` on top of `self`; fields set in `other` win.
    pub fn merge(mut self, other: &ConfigUpdate) -> Self {
        self.particle_count = other.particle_count.or(self.particle_count);
        self.disk_rotation_speed = other.disk_rotation_speed.or(self.disk_rotation_speed);
        self.lensing_intensity = other.lensing_intensity.or(self.lensing_intensity);
        self.camera_sensitivity = other.camera_sensitivity.or(self.camera_sensitivity);
        self.bloom_strength = other.bloom_strength.or(self.bloom_strength);
        self.performance_mode = other.performance_mode.or(self.performance_mode);
        self
    }
}

impl From<SimulationConfig> for ConfigUpdate {
    fn from(config: SimulationConfig) -> Self {
        Self {
            particle_count: Some(config.particle_count as f32),
            disk_rotation_speed: Some(config.disk_rotation_speed),
            lensing_intensity: Some(config.lensing_intensity),
            camera_sensitivity: Some(config.camera_sensitivity),
            bloom_strength: Some(config.bloom_strength),
            performance_mode: Some(config.performance_mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBES: [f32; 12] = [
        f32::NAN,
        f32::NEG_INFINITY,
        -1000.0,
        -0.5,
        0.0,
        0.05,
        0.1,
        1.234,
        2.5,
        4999.6,
        1.0e9,
        f32::INFINITY,
    ];

    #[test]
    fn clamping_is_idempotent_and_in_bounds() {
        for parameter in Parameter::ALL {
            let (min, max) = parameter.bounds();
            for raw in PROBES {
                let once = parameter.clamp(raw);
                let twice = parameter.clamp(once);
                assert_eq!(once.to_bits(), twice.to_bits(), "{parameter} {raw}");
                assert!(once >= min && once <= max, "{parameter} {raw} -> {once}");
            }
        }
    }

    #[test]
    fn non_numeric_text_resolves_to_minimum() {
        for parameter in Parameter::ALL {
            assert_eq!(parameter.clamp_str("abc"), parameter.bounds().0);
            assert_eq!(parameter.clamp_str(""), parameter.bounds().0);
        }
        assert_eq!(Parameter::BloomStrength.clamp_str(" 2.5 "), 2.5);
    }

    #[test]
    fn particle_count_rounds_to_whole_particles() {
        assert_eq!(Parameter::ParticleCount.clamp(250.6), 251.0);
        assert_eq!(Parameter::ParticleCount.clamp(12.0), 100.0);
        assert_eq!(Parameter::ParticleCount.clamp(9000.0), 5000.0);
    }

    #[test]
    fn partial_update_touches_only_supplied_fields() {
        let mut config = SimulationConfig::default();
        let mut update = ConfigUpdate::new();
        update
            .set(Parameter::LensingIntensity, 7.0)
            .set(Parameter::ParticleCount, 50.0);
        let resolved = config.apply(&update);
        assert_eq!(resolved.lensing_intensity, 2.0);
        assert_eq!(resolved.particle_count, 100);
        assert_eq!(resolved.disk_rotation_speed, 1.0);
        assert_eq!(resolved.bloom_strength, 1.5);
        assert_eq!(config, resolved);
    }

    #[test]
    fn sanitized_config_is_stable() {
        let wild = SimulationConfig {
            particle_count: 0,
            disk_rotation_speed: f32::NAN,
            lensing_intensity: -3.0,
            camera_sensitivity: 50.0,
            bloom_strength: f32::INFINITY,
            performance_mode: PerformanceMode::Low,
        };
        let once = wild.sanitized();
        assert_eq!(once.particle_count, MIN_PARTICLES);
        assert_eq!(once.disk_rotation_speed, 0.1);
        assert_eq!(once.lensing_intensity, 0.0);
        assert_eq!(once.camera_sensitivity, 2.0);
        assert_eq!(once.bloom_strength, 3.0);
        assert_eq!(once.sanitized(), once);
    }

    #[test]
    fn raw_assignments_accept_several_spellings() {
        let mut update = ConfigUpdate::new();
        update.set_assignment("particleCount=2400").unwrap();
        update.set_assignment("bloom-strength=oops").unwrap();
        update.set_assignment("performance_mode=ultra").unwrap();
        assert_eq!(update.particle_count, Some(2400.0));
        assert_eq!(update.bloom_strength, Some(0.0));
        assert_eq!(update.performance_mode, Some(PerformanceMode::High));
        assert_eq!(
            update.set_assignment("gravity=3").unwrap_err(),
            UpdateError::UnknownKey("gravity".into())
        );
        assert!(matches!(
            update.set_assignment("bloom"),
            Err(UpdateError::MalformedAssignment(_))
        ));
    }

    #[test]
    fn merge_prefers_later_values() {
        let mut base = ConfigUpdate::new();
        base.set(Parameter::BloomStrength, 1.0)
            .set(Parameter::DiskRotationSpeed, 2.0);
        let mut overlay = ConfigUpdate::new();
        overlay.set(Parameter::BloomStrength, 2.0);
        let merged = base.merge(&overlay);
        assert_eq!(merged.bloom_strength, Some(2.0));
        assert_eq!(merged.disk_rotation_speed, Some(2.0));
    }
}
