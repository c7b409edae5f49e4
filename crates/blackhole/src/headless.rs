use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;
use simulation::particles::FieldSummary;
use simulation::{
    Engine, EngineEvent, EngineStats, NullBackend, OrbitCamera, SimulationConfig, Surface,
};

use crate::cli::HeadlessArgs;
use crate::settings::ResolvedSettings;

/// Result of a headless run, printed as text or JSON.
#[derive(Debug, Serialize)]
pub struct HeadlessReport {
    pub ticks: u32,
    pub config: SimulationConfig,
    pub stats: EngineStats,
    pub field: Option<FieldSummary>,
    pub degradations: u32,
    pub frames_drawn: u64,
}

/// Drives the engine against a backend that draws nothing.
///
/// The camera orbits slowly so particle and lensing state sees a moving
/// viewpoint, the same way an idle window would.
pub fn run_headless(settings: &ResolvedSettings, args: &HeadlessArgs) -> Result<HeadlessReport> {
    if !(args.dt.is_finite() && args.dt >= 0.0) {
        anyhow::bail!("--dt must be a non-negative number of seconds (got {})", args.dt);
    }
    let step = Duration::try_from_secs_f32(args.dt)
        .map_err(|err| anyhow!("--dt {} is out of range: {err}", args.dt))?;
    let frame_time = match args.frame_ms {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Duration::try_from_secs_f64(ms / 1000.0)
            .map_err(|err| anyhow!("--frame-ms {ms} is out of range: {err}"))?,
        Some(ms) => anyhow::bail!("--frame-ms must be a non-negative number (got {ms})"),
        None => step,
    };

    let (width, height) = settings.surface_size;
    let mut engine = Engine::initialize(
        Some(Surface::new(NullBackend::new(), width, height)),
        settings.simulation,
        settings.engine.clone(),
    )
    .map_err(|err| anyhow!("failed to initialise engine: {err}"))?;

    let degradations = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&degradations);
    engine.subscribe(move |event| {
        if let EngineEvent::PerformanceDegraded { from, to, tier } = event {
            tracing::info!(from, to, ?tier, "particle count reduced");
            counter.set(counter.get() + 1);
        }
    });
    engine.start()?;

    let mut camera = OrbitCamera::new(engine.config().camera_sensitivity);
    for _ in 0..args.ticks {
        camera.rotate_by_pixels(1.0, 0.0);
        camera.update(args.dt);
        engine.tick_timed(args.dt, camera.position(), frame_time);
    }

    let report = HeadlessReport {
        ticks: args.ticks,
        config: engine.config(),
        stats: engine.stats(),
        field: engine.field_summary(),
        degradations: degradations.get(),
        frames_drawn: engine.backend().frames(),
    };
    engine.dispose();
    Ok(report)
}

pub fn print_report(report: &HeadlessReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let stats = &report.stats;
    let performance = &stats.performance;
    println!("ticks:            {}", report.ticks);
    println!("frames drawn:     {}", report.frames_drawn);
    println!("simulated time:   {:.2}s", stats.elapsed_seconds);
    println!("particles:        {}", stats.particle_count);
    println!(
        "frame time:       avg {:.2}ms, min {:.2}ms, max {:.2}ms ({:.1} fps)",
        performance.average_frame_ms,
        performance.min_frame_ms,
        performance.max_frame_ms,
        performance.fps
    );
    println!(
        "governor:         {} ({} reductions)",
        if performance.degraded { "degraded" } else { "nominal" },
        report.degradations
    );
    if let Some(field) = &report.field {
        println!(
            "field:            distance {:.2}..{:.2}, mean speed {:.3}",
            field.min_distance, field.max_distance, field.mean_speed
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RunArgs;
    use crate::paths::AppPaths;
    use tempfile::TempDir;

    fn settings(args: RunArgs) -> ResolvedSettings {
        let dir = TempDir::new().unwrap();
        ResolvedSettings::resolve(&args, &AppPaths::from_raw(dir.path().to_path_buf())).unwrap()
    }

    fn headless(ticks: u32, frame_ms: Option<f64>) -> HeadlessArgs {
        HeadlessArgs {
            ticks,
            dt: 0.016,
            frame_ms,
            json: false,
        }
    }

    #[test]
    fn fast_frames_keep_the_configured_count() {
        let settings = settings(RunArgs {
            particles: Some("300".into()),
            seed: Some(5),
            ..RunArgs::default()
        });
        let report = run_headless(&settings, &headless(120, None)).unwrap();
        assert_eq!(report.frames_drawn, 120);
        assert_eq!(report.stats.particle_count, 300);
        assert_eq!(report.degradations, 0);
        let field = report.field.unwrap();
        assert!(field.min_distance >= settings.engine.geometry.event_horizon_radius);
    }

    #[test]
    fn slow_frames_shed_particles() {
        let settings = settings(RunArgs {
            particles: Some("2000".into()),
            seed: Some(5),
            ..RunArgs::default()
        });
        let report = run_headless(&settings, &headless(120, Some(100.0))).unwrap();
        assert!(report.degradations >= 1);
        assert!(report.stats.particle_count < 2000);
        assert!(report.stats.performance.degraded);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let settings = settings(RunArgs::default());
        let mut args = headless(1, None);
        args.dt = 1e20;
        let err = run_headless(&settings, &args).unwrap_err();
        assert!(err.to_string().contains("--dt"), "{err}");

        let args = headless(1, Some(1e300));
        let err = run_headless(&settings, &args).unwrap_err();
        assert!(err.to_string().contains("--frame-ms"), "{err}");
    }

    #[test]
    fn negative_dt_is_rejected() {
        let settings = settings(RunArgs::default());
        let mut args = headless(1, None);
        args.dt = -1.0;
        assert!(run_headless(&settings, &args).is_err());
    }
}
