use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use simulation::config::{ConfigUpdate, Parameter, PerformanceMode, SimulationConfig};
use simulation::engine::EngineSettings;
use simulation::geometry::BlackHoleGeometry;
use simulation::governor::GovernorSettings;

/// File name looked up inside the configuration directory.
pub const SCENE_FILE_NAME: &str = "scene.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub geometry: BlackHoleGeometry,
    #[serde(default)]
    pub governor: GovernorSection,
    #[serde(default)]
    pub scene: SceneSection,
    #[serde(default)]
    pub window: WindowSection,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            simulation: SimulationSection::default(),
            geometry: BlackHoleGeometry::default(),
            governor: GovernorSection::default(),
            scene: SceneSection::default(),
            window: WindowSection::default(),
        }
    }
}

/// User-facing parameters. Values are kept raw so that anything, including
/// text, can be clamped instead of rejected.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SimulationSection {
    pub particle_count: Option<toml::Value>,
    pub disk_rotation_speed: Option<toml::Value>,
    pub lensing_intensity: Option<toml::Value>,
    pub camera_sensitivity: Option<toml::Value>,
    pub bloom_strength: Option<toml::Value>,
    pub performance_mode: Option<toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GovernorSection {
    pub window: usize,
    pub slow_frame_streak: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub slow_frame_threshold: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub target_frame_time: Duration,
    pub particle_floor: u32,
}

impl Default for GovernorSection {
    fn default() -> Self {
        let defaults = GovernorSettings::default();
        Self {
            window: defaults.window_size,
            slow_frame_streak: defaults.slow_frame_streak,
            slow_frame_threshold: defaults.slow_frame_threshold,
            target_frame_time: defaults.target_frame_time,
            particle_floor: defaults.particle_floor,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneSection {
    pub star_count: usize,
    pub seed: Option<u64>,
    pub device_retry_budget: u32,
    pub fov_degrees: f32,
}

impl Default for SceneSection {
    fn default() -> Self {
        let defaults = EngineSettings::default();
        Self {
            star_count: defaults.star_count,
            seed: None,
            device_retry_budget: defaults.device_retry_budget,
            fov_degrees: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    #[serde(deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<AntialiasSetting>,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Black Hole".to_string(),
            vsync: true,
            antialias: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

fn default_version() -> u32 {
    1
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer)?
        .ok_or_else(|| de::Error::custom("duration may not be empty"))
}

/// Accepts humantime strings (`"50ms"`, `"1s"`) or plain numbers of milliseconds.
fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map(Some)
                .map_err(|err| E::custom(format!("duration {v}ms is out of range: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

/// Number or text -> clamped parameter value. Anything else is the minimum.
fn lenient_value(parameter: Parameter, value: &toml::Value) -> f32 {
    match value {
        toml::Value::Integer(v) => parameter.clamp(*v as f32),
        toml::Value::Float(v) => parameter.clamp(*v as f32),
        toml::Value::String(raw) => parameter.clamp_str(raw),
        _ => parameter.bounds().0,
    }
}

impl SimulationSection {
    /// Converts the raw section into a partial update.
    pub fn to_update(&self) -> ConfigUpdate {
        let mut update = ConfigUpdate::new();
        let fields = [
            (Parameter::ParticleCount, &self.particle_count),
            (Parameter::DiskRotationSpeed, &self.disk_rotation_speed),
            (Parameter::LensingIntensity, &self.lensing_intensity),
            (Parameter::CameraSensitivity, &self.camera_sensitivity),
            (Parameter::BloomStrength, &self.bloom_strength),
        ];
        for (parameter, value) in fields {
            if let Some(value) = value {
                update.set(parameter, lenient_value(parameter, value));
            }
        }
        if let Some(mode) = &self.performance_mode {
            update.performance_mode = Some(match mode {
                toml::Value::String(raw) => PerformanceMode::parse_lenient(raw),
                _ => PerformanceMode::default(),
            });
        }
        update
    }
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        self.geometry
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("geometry: {err}")))?;

        let governor = &self.governor;
        if governor.window == 0 {
            return Err(ConfigError::Invalid("governor.window must be > 0".into()));
        }
        if governor.slow_frame_streak == 0 {
            return Err(ConfigError::Invalid(
                "governor.slow_frame_streak must be > 0".into(),
            ));
        }
        if governor.slow_frame_threshold.is_zero() {
            return Err(ConfigError::Invalid(
                "governor.slow_frame_threshold must be greater than zero".into(),
            ));
        }
        if governor.target_frame_time.is_zero() {
            return Err(ConfigError::Invalid(
                "governor.target_frame_time must be greater than zero".into(),
            ));
        }

        if !(self.scene.fov_degrees.is_finite()
            && self.scene.fov_degrees > 1.0
            && self.scene.fov_degrees < 179.0)
        {
            return Err(ConfigError::Invalid(format!(
                "scene.fov_degrees must be between 1 and 179 (got {})",
                self.scene.fov_degrees
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero (got {}x{})",
                self.window.width, self.window.height
            )));
        }

        Ok(())
    }

    /// Defaults with the file's simulation section applied on top.
    pub fn simulation_config(&self) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.apply(&self.simulation.to_update());
        config
    }

    pub fn governor_settings(&self) -> GovernorSettings {
        GovernorSettings {
            window_size: self.governor.window,
            slow_frame_streak: self.governor.slow_frame_streak,
            slow_frame_threshold: self.governor.slow_frame_threshold,
            target_frame_time: self.governor.target_frame_time,
            particle_floor: self.governor.particle_floor,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            geometry: self.geometry,
            governor: self.governor_settings(),
            star_count: self.scene.star_count,
            seed: self.scene.seed,
            device_retry_budget: self.scene.device_retry_budget,
            fov_y: self.scene.fov_degrees.to_radians(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[simulation]
particle_count = 2500
disk_rotation_speed = 2
lensing_intensity = "1.25"
bloom_strength = 99
performance_mode = "medium"

[geometry]
event_horizon_radius = 1.0
disk_inner_radius = 2.0
disk_outer_radius = 7.0
spawn_radius = 9.0

[governor]
window = 90
slow_frame_threshold = "40ms"
target_frame_time = 16.67

[scene]
star_count = 500
seed = 42

[window]
width = 1600
height = 900
antialias = 4
"#;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        let simulation = config.simulation_config();
        assert_eq!(simulation.particle_count, 2500);
        assert_eq!(simulation.disk_rotation_speed, 2.0);
        assert_eq!(simulation.lensing_intensity, 1.25);
        assert_eq!(simulation.bloom_strength, 3.0);
        assert_eq!(simulation.camera_sensitivity, 1.0);
        assert_eq!(simulation.performance_mode, PerformanceMode::Medium);

        let settings = config.engine_settings();
        assert_eq!(settings.geometry.disk_inner_radius, 2.0);
        assert_eq!(settings.governor.window_size, 90);
        assert_eq!(settings.governor.slow_frame_streak, 30);
        assert_eq!(settings.governor.slow_frame_threshold, Duration::from_millis(40));
        let target = settings.governor.target_frame_time.as_secs_f64();
        assert!((target - 0.01667).abs() < 1e-9);
        assert_eq!(settings.star_count, 500);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(config.window.antialias, Some(AntialiasSetting::Samples4));
    }

    #[test]
    fn empty_file_means_defaults() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config.simulation_config(), SimulationConfig::default());
        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn garbage_values_clamp_to_minimum() {
        let config = SceneConfig::from_toml_str(
            r#"
[simulation]
particle_count = "lots"
camera_sensitivity = true
performance_mode = "warp"
"#,
        )
        .unwrap();
        let simulation = config.simulation_config();
        assert_eq!(simulation.particle_count, 100);
        assert_eq!(simulation.camera_sensitivity, 0.1);
        assert_eq!(simulation.performance_mode, PerformanceMode::High);
    }

    #[test]
    fn rejects_misordered_geometry() {
        let err = SceneConfig::from_toml_str(
            r#"
[geometry]
event_horizon_radius = 3.0
disk_inner_radius = 2.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_durations_and_versions() {
        let err = SceneConfig::from_toml_str("[governor]\ntarget_frame_time = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = SceneConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = SceneConfig::from_toml_str("[governor]\nslow_frame_threshold = \"soon\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = SceneConfig::from_toml_str("[governor]\ntarget_frame_time = 1e300\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SCENE_FILE_NAME);
        assert!(SceneConfig::load_or_default(&path).is_ok());
        assert!(matches!(
            SceneConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));

        fs::write(&path, SAMPLE).unwrap();
        let config = SceneConfig::load_or_default(&path).unwrap();
        assert_eq!(config.simulation_config().particle_count, 2500);
    }
}
