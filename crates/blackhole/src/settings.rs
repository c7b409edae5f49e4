use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use renderer::Antialiasing;
use sceneconfig::{AntialiasSetting, SceneConfig};
use serde::Serialize;
use simulation::{ConfigUpdate, EngineSettings, SimulationConfig};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Everything the window or headless runner needs, after layering
/// defaults, the scene file and the command line.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Scene file that was read, if any.
    pub source: Option<PathBuf>,
    pub scene: SceneConfig,
    pub simulation: SimulationConfig,
    pub engine: EngineSettings,
    pub surface_size: (u32, u32),
    pub antialias: AntialiasSetting,
    pub vsync: bool,
}

/// Serializable view printed by `blackhole config`.
#[derive(Debug, Serialize)]
pub struct SettingsSummary<'a> {
    pub source: Option<&'a PathBuf>,
    pub simulation: &'a SimulationConfig,
    pub surface_size: (u32, u32),
    pub antialias: AntialiasSetting,
    pub vsync: bool,
    pub seed: Option<u64>,
    pub star_count: usize,
}

impl ResolvedSettings {
    pub fn resolve(args: &RunArgs, paths: &AppPaths) -> Result<Self> {
        let (scene, source) = match &args.config {
            Some(path) => {
                let scene = SceneConfig::load(path)
                    .with_context(|| format!("failed to load scene config {}", path.display()))?;
                (scene, Some(path.clone()))
            }
            None => {
                let path = paths.scene_file();
                let exists = path.exists();
                let scene = SceneConfig::load_or_default(&path)
                    .with_context(|| format!("failed to load scene config {}", path.display()))?;
                (scene, exists.then_some(path))
            }
        };
        tracing::debug!(source = ?source, "resolved scene configuration");

        let mut simulation = scene.simulation_config();
        simulation.apply(&cli_update(args)?);

        let mut engine = scene.engine_settings();
        if args.seed.is_some() {
            engine.seed = args.seed;
        }

        let surface_size = match &args.size {
            Some(spec) => parse_surface_size(spec)?,
            None => (scene.window.width, scene.window.height),
        };
        let antialias = args
            .antialias
            .or(scene.window.antialias)
            .unwrap_or(AntialiasSetting::Auto);
        let vsync = scene.window.vsync && !args.no_vsync;

        Ok(Self {
            source,
            scene,
            simulation,
            engine,
            surface_size,
            antialias,
            vsync,
        })
    }

    pub fn summary(&self) -> SettingsSummary<'_> {
        SettingsSummary {
            source: self.source.as_ref(),
            simulation: &self.simulation,
            surface_size: self.surface_size,
            antialias: self.antialias,
            vsync: self.vsync,
            seed: self.engine.seed,
            star_count: self.engine.star_count,
        }
    }
}

/// Folds the individual flags and then every `--set` into one update.
pub fn cli_update(args: &RunArgs) -> Result<ConfigUpdate> {
    let mut update = ConfigUpdate::new();
    let flags = [
        ("particle_count", &args.particles),
        ("disk_rotation_speed", &args.rotation_speed),
        ("lensing_intensity", &args.lensing),
        ("camera_sensitivity", &args.sensitivity),
        ("bloom_strength", &args.bloom),
        ("performance_mode", &args.performance),
    ];
    for (key, value) in flags {
        if let Some(value) = value {
            update.set_raw(key, value)?;
        }
    }
    for assignment in &args.overrides {
        update
            .set_assignment(assignment)
            .with_context(|| format!("invalid --set {assignment}"))?;
    }
    Ok(update)
}

pub fn antialiasing(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples2 => Antialiasing::Samples(2),
        AntialiasSetting::Samples4 => Antialiasing::Samples(4),
        AntialiasSetting::Samples8 => Antialiasing::Samples(8),
        AntialiasSetting::Samples16 => Antialiasing::Samples(16),
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}
