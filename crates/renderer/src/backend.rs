use std::sync::Arc;

use simulation::{
    BackendError, FrameState, MaterialReport, RenderBackend, SceneResources, SurfaceSize,
};
use winit::window::Window;

use crate::gpu::{FrameOutcome, GpuState};
use crate::types::{AdapterProfile, Antialiasing};

/// `RenderBackend` that draws into a winit window through wgpu.
pub struct WgpuBackend {
    // Declared before `window` so the surface is dropped first.
    gpu: Option<GpuState>,
    window: Arc<Window>,
    antialiasing: Antialiasing,
    vsync: bool,
    fatal: Option<String>,
    presented: u64,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, antialiasing: Antialiasing, vsync: bool) -> Self {
        Self {
            gpu: None,
            window,
            antialiasing,
            vsync,
            fatal: None,
            presented: 0,
        }
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.gpu.as_ref().map(GpuState::adapter_profile)
    }

    pub fn is_acquired(&self) -> bool {
        self.gpu.is_some()
    }

    /// Frames that actually reached the surface.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    /// Returns the error that makes further rendering pointless, if one occurred.
    pub fn take_fatal_error(&mut self) -> Option<String> {
        self.fatal.take()
    }
}

impl RenderBackend for WgpuBackend {
    fn acquire(
        &mut self,
        size: SurfaceSize,
        scene: &SceneResources<'_>,
    ) -> Result<MaterialReport, BackendError> {
        // Release the previous device before asking for a new one.
        self.gpu = None;
        let (gpu, report) = GpuState::new(
            self.window.as_ref(),
            size,
            scene,
            self.antialiasing,
            self.vsync,
        )
        .map_err(|err| BackendError::Acquire(format!("{err:#}")))?;
        self.gpu = Some(gpu);
        Ok(report)
    }

    fn resize(&mut self, size: SurfaceSize) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(size);
        }
    }

    fn render(&mut self, frame: &FrameState<'_>) -> Result<(), BackendError> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Err(BackendError::Surface("no device acquired".to_string()));
        };
        if gpu.is_lost() {
            return Err(BackendError::DeviceLost);
        }
        match gpu.render(frame) {
            Ok(FrameOutcome::Presented) => {
                self.presented += 1;
                Ok(())
            }
            Ok(FrameOutcome::Skipped) => Ok(()),
            Err(err) => {
                let message = format!("surface error: {err}");
                self.fatal = Some(message.clone());
                Err(BackendError::Surface(message))
            }
        }
    }

    fn release(&mut self) {
        if self.gpu.take().is_some() {
            tracing::debug!("released GPU resources");
        }
    }
}
