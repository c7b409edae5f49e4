//! The engine: owns the simulation state, run state, device lifecycle and the
//! render backend, and exposes the API the host application drives.

use std::time::Duration;

use glam::{Mat4, Vec3};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendError, FrameState, RenderBackend, SceneResources, Surface, SurfaceSize};
use crate::bloom::BloomSettings;
use crate::camera::CameraFrame;
use crate::config::{ConfigUpdate, SimulationConfig, MIN_PARTICLES};
use crate::disk::DiskShading;
use crate::geometry::BlackHoleGeometry;
use crate::governor::{GovernorEvent, GovernorSettings, PerformanceGovernor, PerformanceStats, ReductionTier};
use crate::horizon::HorizonShading;
use crate::lensing::LensingParams;
use crate::lifecycle::{DeviceLifecycle, DEFAULT_RETRY_BUDGET};
use crate::materials::{MaterialId, MaterialReport};
use crate::observers::{Observers, SubscriptionId};
use crate::particles::{FieldSummary, ParticleField};
use crate::starfield::{Starfield, DEFAULT_STAR_COUNT};
use crate::time::ShaderTimeState;

#[derive(Debug, thiserror::Error)]
pub enum InitializationError {
    #[error("no drawable surface was supplied")]
    MissingSurface,
    #[error("surface has zero size ({width}x{height})")]
    ZeroSizedSurface { width: u32, height: u32 },
    #[error("black-hole geometry is invalid: {0}")]
    Geometry(#[from] crate::geometry::GeometryError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine has been disposed")]
    Disposed,
    #[error("graphics device failed permanently")]
    DeviceFailed,
}

/// Structural settings fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub geometry: BlackHoleGeometry,
    pub governor: GovernorSettings,
    pub star_count: usize,
    /// Seed for particles and stars; `None` draws from entropy.
    pub seed: Option<u64>,
    pub device_retry_budget: u32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            geometry: BlackHoleGeometry::default(),
            governor: GovernorSettings::default(),
            star_count: DEFAULT_STAR_COUNT,
            seed: None,
            device_retry_budget: DEFAULT_RETRY_BUDGET,
            fov_y: 60f32.to_radians(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Stopped,
    Running,
    Disposed,
}

/// Notifications delivered to [`Engine::subscribe`] listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ConfigChanged(SimulationConfig),
    ParticleCountChanged { from: u32, to: u32 },
    PerformanceDegraded { from: u32, to: u32, tier: ReductionTier },
    PerformanceRecovered,
    Resized(SurfaceSize),
    MaterialFallback { material: MaterialId, reason: String },
    DeviceLost,
    DeviceRestored,
    /// Terminal: the retry budget is spent and the engine will not recover.
    DeviceFailed { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStats {
    pub performance: PerformanceStats,
    pub particle_count: u32,
    pub frames: u64,
    pub elapsed_seconds: f64,
    pub run_state: RunState,
    pub device: DeviceLifecycle,
    pub surface: SurfaceSize,
}

/// Particle multiplier for narrow viewports.
pub fn viewport_particle_scale(width: u32) -> f32 {
    if width < 768 {
        0.5
    } else if width < 1024 {
        0.75
    } else {
        1.0
    }
}

struct Scene {
    particles: ParticleField,
    starfield: Starfield,
}

pub struct Engine<B: RenderBackend> {
    backend: B,
    settings: EngineSettings,
    config: SimulationConfig,
    scene: Option<Scene>,
    governor: PerformanceGovernor,
    /// Ceiling imposed by the governor until the host sets a new particle count.
    governor_cap: Option<u32>,
    times: ShaderTimeState,
    materials: MaterialReport,
    size: SurfaceSize,
    pending_resize: Option<SurfaceSize>,
    run_state: RunState,
    device: DeviceLifecycle,
    frames: u64,
    elapsed: f64,
    observers: Observers<EngineEvent>,
}

impl<B: RenderBackend> Engine<B> {
    /// Builds the engine and acquires device resources.
    ///
    /// Nothing is retained on failure. The engine starts in `Stopped`.
    pub fn initialize(
        surface: Option<Surface<B>>,
        initial: SimulationConfig,
        settings: EngineSettings,
    ) -> Result<Self, InitializationError> {
        let Surface { mut backend, size } = surface.ok_or(InitializationError::MissingSurface)?;
        if size.is_empty() {
            return Err(InitializationError::ZeroSizedSurface {
                width: size.width,
                height: size.height,
            });
        }
        settings.geometry.validate()?;

        let config = initial.sanitized();
        let target = effective_count(&config, size, None);
        let (particles, starfield) = match settings.seed {
            Some(seed) => (
                ParticleField::with_seed(target, settings.geometry, seed),
                Starfield::with_seed(settings.star_count, seed.wrapping_add(1)),
            ),
            None => (
                ParticleField::new(target, settings.geometry),
                Starfield::new(settings.star_count),
            ),
        };

        let resources = SceneResources {
            geometry: &settings.geometry,
            starfield: &starfield,
            particle_capacity: crate::config::MAX_PARTICLES,
        };
        let materials = backend.acquire(size, &resources)?;
        log_fallbacks(&materials);

        info!(
            width = size.width,
            height = size.height,
            particles = particles.len(),
            stars = starfield.len(),
            mode = %config.performance_mode,
            "engine initialized"
        );

        Ok(Self {
            backend,
            governor: PerformanceGovernor::new(settings.governor),
            settings,
            config,
            scene: Some(Scene {
                particles,
                starfield,
            }),
            governor_cap: None,
            times: ShaderTimeState::default(),
            materials,
            size,
            pending_resize: None,
            run_state: RunState::Stopped,
            device: DeviceLifecycle::Active,
            frames: 0,
            elapsed: 0.0,
            observers: Observers::default(),
        })
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.run_state {
            RunState::Disposed => Err(EngineError::Disposed),
            _ if self.device.is_failed() => Err(EngineError::DeviceFailed),
            RunState::Running => Ok(()),
            RunState::Stopped => {
                self.run_state = RunState::Running;
                info!("engine started");
                Ok(())
            }
        }
    }

    pub fn stop(&mut self) {
        if self.run_state == RunState::Running {
            self.run_state = RunState::Stopped;
            info!(frames = self.frames, "engine stopped");
        }
    }

    /// Releases device resources and particle buffers. Safe to call twice.
    pub fn dispose(&mut self) {
        if self.run_state == RunState::Disposed {
            return;
        }
        self.run_state = RunState::Disposed;
        self.backend.release();
        self.scene = None;
        self.pending_resize = None;
        self.observers.clear();
        info!("engine disposed");
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn device_state(&self) -> DeviceLifecycle {
        self.device
    }

    pub fn config(&self) -> SimulationConfig {
        self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn materials(&self) -> &MaterialReport {
        &self.materials
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    pub fn particle_count(&self) -> u32 {
        self.scene
            .as_ref()
            .map_or(0, |scene| scene.particles.len() as u32)
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.scene.as_ref().map(|scene| &scene.particles)
    }

    pub fn field_summary(&self) -> Option<FieldSummary> {
        self.particles().map(ParticleField::summary)
    }

    pub fn shader_times(&self) -> ShaderTimeState {
        self.times
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            performance: self.governor.stats(),
            particle_count: self.particle_count(),
            frames: self.frames,
            elapsed_seconds: self.elapsed,
            run_state: self.run_state,
            device: self.device,
            surface: self.size,
        }
    }

    /// Applies a partial update, resizes the particle field right away and
    /// notifies listeners. Returns the resolved configuration.
    pub fn update_config(&mut self, update: &ConfigUpdate) -> SimulationConfig {
        let resolved = self.config.apply(update);
        if update.particle_count.is_some() {
            self.governor_cap = None;
        }
        self.sync_particle_count();
        debug!(?resolved, "configuration updated");
        self.observers.notify(&EngineEvent::ConfigChanged(resolved));
        resolved
    }

    pub fn reset_config(&mut self) -> SimulationConfig {
        self.update_config(&ConfigUpdate::from(SimulationConfig::default()))
    }

    /// Queues a resize; it takes effect at the start of the next tick.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        let size = SurfaceSize::new(width, height);
        if size.is_empty() {
            debug!(width, height, "ignoring zero-sized resize");
            return;
        }
        self.pending_resize = Some(size);
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&EngineEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Registers a callback for device loss only.
    pub fn on_lost(&mut self, mut callback: impl FnMut() + 'static) -> SubscriptionId {
        self.observers.subscribe(move |event| {
            if matches!(event, EngineEvent::DeviceLost) {
                callback();
            }
        })
    }

    /// Registers a callback for successful device restoration only.
    pub fn on_restored(&mut self, mut callback: impl FnMut() + 'static) -> SubscriptionId {
        self.observers.subscribe(move |event| {
            if matches!(event, EngineEvent::DeviceRestored) {
                callback();
            }
        })
    }

    /// Advances one frame using `delta_time` as the frame duration.
    pub fn tick(&mut self, delta_time: f32, camera_position: Vec3) {
        let frame = Duration::try_from_secs_f32(delta_time).unwrap_or_default();
        self.tick_timed(delta_time, camera_position, frame);
    }

    /// Advances one frame and samples `frame_time` for the governor.
    pub fn tick_timed(&mut self, delta_time: f32, camera_position: Vec3, frame_time: Duration) {
        if self.run_state != RunState::Running || !self.device.is_active() {
            return;
        }
        if !(delta_time.is_finite() && delta_time >= 0.0) {
            debug!(delta_time, "skipping tick with invalid delta");
            return;
        }
        self.apply_pending_resize();

        self.times.advance(delta_time);
        self.elapsed += f64::from(delta_time);

        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let center = self.settings.geometry.center();
        scene.particles.update(delta_time, center);

        let camera = CameraFrame::looking_at(
            camera_position,
            center,
            self.settings.fov_y,
            self.size.aspect(),
        );
        let projection = Mat4::perspective_rh(self.settings.fov_y, self.size.aspect(), 0.1, 500.0);
        let geometry = &self.settings.geometry;
        let frame = FrameState {
            size: self.size,
            camera,
            view_projection: projection * camera.view_matrix(),
            times: self.times,
            particles: &scene.particles,
            starfield: &scene.starfield,
            disk: DiskShading::new(geometry, self.config.disk_rotation_speed),
            horizon: HorizonShading::new(geometry.event_horizon_radius),
            lensing: LensingParams::new(
                &camera,
                center,
                geometry.schwarzschild_radius(),
                self.config.lensing_intensity,
                self.config.performance_mode.lensing_steps(),
            ),
            bloom: BloomSettings::from_config(&self.config),
            materials: &self.materials,
        };

        match self.backend.render(&frame) {
            Ok(()) => {}
            Err(BackendError::DeviceLost) => {
                self.notify_device_lost();
                return;
            }
            Err(err) => {
                warn!(error = %err, "frame was not presented");
            }
        }
        self.frames += 1;

        let current = self.particle_count();
        match self.governor.record_frame(frame_time, current) {
            Some(GovernorEvent::Reduced { from, to, tier }) => {
                self.governor_cap = Some(to);
                self.sync_particle_count();
                self.observers
                    .notify(&EngineEvent::PerformanceDegraded { from, to, tier });
            }
            Some(GovernorEvent::Recovered) => {
                self.observers.notify(&EngineEvent::PerformanceRecovered);
            }
            None => {}
        }

        if self.frames % 600 == 0 {
            let stats = self.governor.stats();
            debug!(
                fps = stats.fps,
                avg_ms = stats.average_frame_ms,
                particles = self.particle_count(),
                "engine stats"
            );
        }
    }

    /// Pauses simulation and governor sampling until the device is restored.
    pub fn notify_device_lost(&mut self) {
        if !self.device.is_active() {
            return;
        }
        self.device = self.device.lost();
        self.backend.release();
        warn!("graphics device lost; simulation paused");
        self.observers.notify(&EngineEvent::DeviceLost);
    }

    /// Re-acquires every device-bound resource. Returns the resulting state.
    pub fn notify_device_restored(&mut self) -> DeviceLifecycle {
        let DeviceLifecycle::Lost { attempts } = self.device else {
            return self.device;
        };
        let Some(scene) = self.scene.as_ref() else {
            return self.device;
        };
        let resources = SceneResources {
            geometry: &self.settings.geometry,
            starfield: &scene.starfield,
            particle_capacity: crate::config::MAX_PARTICLES,
        };
        match self.backend.acquire(self.size, &resources) {
            Ok(report) => {
                self.device = DeviceLifecycle::Active;
                self.times.reset_all();
                log_fallbacks(&report);
                self.materials = report;
                info!(attempts, "graphics device restored");
                self.notify_fallbacks();
                self.observers.notify(&EngineEvent::DeviceRestored);
            }
            Err(err) => {
                self.device = self
                    .device
                    .retry_failed(self.settings.device_retry_budget);
                if self.device.is_failed() {
                    let attempts = attempts + 1;
                    error!(attempts, error = %err, "graphics device could not be restored; giving up");
                    self.run_state = match self.run_state {
                        RunState::Disposed => RunState::Disposed,
                        _ => RunState::Stopped,
                    };
                    self.observers
                        .notify(&EngineEvent::DeviceFailed { attempts });
                } else {
                    warn!(attempts = attempts + 1, error = %err, "device restore failed; will retry");
                }
            }
        }
        self.device
    }

    fn notify_fallbacks(&mut self) {
        let fallbacks: Vec<(MaterialId, String)> = self
            .materials
            .fallbacks()
            .map(|(id, reason)| (id, reason.to_string()))
            .collect();
        for (material, reason) in fallbacks {
            self.observers
                .notify(&EngineEvent::MaterialFallback { material, reason });
        }
    }

    fn apply_pending_resize(&mut self) {
        let Some(size) = self.pending_resize.take() else {
            return;
        };
        if size == self.size {
            return;
        }
        self.size = size;
        self.backend.resize(size);
        self.sync_particle_count();
        debug!(width = size.width, height = size.height, "applied resize");
        self.observers.notify(&EngineEvent::Resized(size));
    }

    fn sync_particle_count(&mut self) {
        let target = effective_count(&self.config, self.size, self.governor_cap);
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let from = scene.particles.len() as u32;
        if from == target {
            return;
        }
        scene.particles.set_particle_count(target);
        let to = scene.particles.len() as u32;
        self.observers
            .notify(&EngineEvent::ParticleCountChanged { from, to });
    }
}

/// Particle count after performance mode, viewport and governor scaling.
fn effective_count(config: &SimulationConfig, size: SurfaceSize, cap: Option<u32>) -> u32 {
    let scale = config.performance_mode.particle_scale() * viewport_particle_scale(size.width);
    let scaled = (config.particle_count as f32 * scale).round() as u32;
    let capped = cap.map_or(scaled, |cap| scaled.min(cap));
    capped.clamp(MIN_PARTICLES, crate::config::MAX_PARTICLES)
}

fn log_fallbacks(report: &MaterialReport) {
    for (material, reason) in report.fallbacks() {
        if material.is_post_pass() {
            warn!(%material, reason, "post pass replaced by pass-through copy");
        } else {
            warn!(%material, reason, "material replaced by flat-colored fallback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerformanceMode;

    #[test]
    fn viewport_scale_steps() {
        assert_eq!(viewport_particle_scale(640), 0.5);
        assert_eq!(viewport_particle_scale(800), 0.75);
        assert_eq!(viewport_particle_scale(1024), 1.0);
    }

    #[test]
    fn effective_count_combines_scales() {
        let config = SimulationConfig {
            particle_count: 2000,
            performance_mode: PerformanceMode::Medium,
            ..SimulationConfig::default()
        };
        assert_eq!(effective_count(&config, SurfaceSize::new(1920, 1080), None), 1500);
        assert_eq!(effective_count(&config, SurfaceSize::new(800, 600), None), 1125);
        assert_eq!(effective_count(&config, SurfaceSize::new(1920, 1080), Some(700)), 700);
        let tiny = SimulationConfig {
            particle_count: 100,
            performance_mode: PerformanceMode::Low,
            ..SimulationConfig::default()
        };
        assert_eq!(effective_count(&tiny, SurfaceSize::new(320, 240), None), MIN_PARTICLES);
    }
}
