use anyhow::Result;
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{ConfigArgs, HeadlessArgs, RunArgs};
use crate::headless;
use crate::paths::AppPaths;
use crate::settings::{self, ResolvedSettings};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve(args: &RunArgs) -> Result<ResolvedSettings> {
    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved blackhole paths");
    ResolvedSettings::resolve(args, &paths)
}

pub fn run_window(args: &RunArgs) -> Result<()> {
    let resolved = resolve(args)?;
    let config = RendererConfig {
        surface_size: resolved.surface_size,
        title: resolved.scene.window.title.clone(),
        antialiasing: settings::antialiasing(resolved.antialias),
        vsync: resolved.vsync,
        simulation: resolved.simulation,
        engine: resolved.engine,
    };
    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        particles = config.simulation.particle_count,
        mode = %config.simulation.performance_mode,
        "opening black hole window"
    );
    Renderer::new(config).run()
}

pub fn run_headless(args: &RunArgs, headless_args: &HeadlessArgs) -> Result<()> {
    let resolved = resolve(args)?;
    let report = headless::run_headless(&resolved, headless_args)?;
    headless::print_report(&report, headless_args.json)
}

pub fn print_config(args: &RunArgs, config_args: &ConfigArgs) -> Result<()> {
    let resolved = resolve(args)?;
    let summary = resolved.summary();
    if config_args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    match summary.source {
        Some(path) => println!("scene file:          {}", path.display()),
        None => println!("scene file:          (defaults)"),
    }
    let simulation = summary.simulation;
    println!("particle_count:      {}", simulation.particle_count);
    println!("disk_rotation_speed: {}", simulation.disk_rotation_speed);
    println!("lensing_intensity:   {}", simulation.lensing_intensity);
    println!("camera_sensitivity:  {}", simulation.camera_sensitivity);
    println!("bloom_strength:      {}", simulation.bloom_strength);
    println!("performance_mode:    {}", simulation.performance_mode);
    println!(
        "window:              {}x{}, antialias {:?}, vsync {}",
        summary.surface_size.0, summary.surface_size.1, summary.antialias, summary.vsync
    );
    Ok(())
}
