//! Seam between the engine and whatever draws the frame.

use glam::Mat4;

use crate::bloom::BloomSettings;
use crate::camera::CameraFrame;
use crate::disk::DiskShading;
use crate::geometry::BlackHoleGeometry;
use crate::horizon::HorizonShading;
use crate::lensing::LensingParams;
use crate::materials::MaterialReport;
use crate::particles::ParticleField;
use crate::starfield::Starfield;
use crate::time::ShaderTimeState;

/// Drawable size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("graphics device lost")]
    DeviceLost,
    #[error("surface unavailable: {0}")]
    Surface(String),
    #[error("failed to acquire graphics resources: {0}")]
    Acquire(String),
}

/// Static scene content uploaded when resources are (re)acquired.
#[derive(Debug, Clone, Copy)]
pub struct SceneResources<'a> {
    pub geometry: &'a BlackHoleGeometry,
    pub starfield: &'a Starfield,
    pub particle_capacity: u32,
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameState<'a> {
    pub size: SurfaceSize,
    pub camera: CameraFrame,
    pub view_projection: Mat4,
    pub times: ShaderTimeState,
    pub particles: &'a ParticleField,
    pub starfield: &'a Starfield,
    pub disk: DiskShading,
    pub horizon: HorizonShading,
    pub lensing: LensingParams,
    pub bloom: BloomSettings,
    pub materials: &'a MaterialReport,
}

/// Render target owned by the engine.
///
/// `acquire` builds every device-bound resource and reports which materials
/// had to fall back; it is called once at initialization and again after a
/// device loss. `release` drops them and must be safe to call repeatedly.
pub trait RenderBackend {
    fn acquire(
        &mut self,
        size: SurfaceSize,
        scene: &SceneResources<'_>,
    ) -> Result<MaterialReport, BackendError>;

    fn resize(&mut self, size: SurfaceSize);

    fn render(&mut self, frame: &FrameState<'_>) -> Result<(), BackendError>;

    fn release(&mut self);
}

/// Backend that draws nothing. Drives the engine in headless runs.
#[derive(Debug, Default, Clone)]
pub struct NullBackend {
    frames: u64,
    size: SurfaceSize,
    acquired: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }
}

impl RenderBackend for NullBackend {
    fn acquire(
        &mut self,
        size: SurfaceSize,
        _scene: &SceneResources<'_>,
    ) -> Result<MaterialReport, BackendError> {
        self.size = size;
        self.acquired = true;
        Ok(MaterialReport::all_compiled())
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn render(&mut self, _frame: &FrameState<'_>) -> Result<(), BackendError> {
        self.frames += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.acquired = false;
    }
}

/// A backend paired with its initial pixel size.
#[derive(Debug)]
pub struct Surface<B> {
    pub backend: B,
    pub size: SurfaceSize,
}

impl<B> Surface<B> {
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        Self {
            backend,
            size: SurfaceSize::new(width, height),
        }
    }
}
