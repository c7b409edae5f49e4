//! wgpu renderer for the black-hole scene.
//!
//! The crate owns the window and everything on the GPU; the `simulation`
//! crate owns time, particles and the lifecycle. They meet at
//! [`simulation::RenderBackend`], implemented here by [`WgpuBackend`]:
//!
//! ```text
//!   CLI / blackhole
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ Engine::tick_timed()
//!                                                │ FrameState
//!                                                ▼
//!                     WgpuBackend ──▶ GpuState::render()
//!                                       scene ─▶ lensing ─▶ bloom ─▶ surface
//! ```
//!
//! Materials are WGSL programs compiled at acquisition time. A material that
//! fails validation is swapped for a flat (scene) or pass-through (post)
//! program and reported, so the scene keeps rendering.

mod backend;
mod compile;
mod gpu;
mod types;
mod window;

use anyhow::Result;

pub use backend::WgpuBackend;
pub use types::{AdapterProfile, Antialiasing, RendererConfig};

/// Entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and runs until it is closed.
    ///
    /// Returns an error if no window or device can be created, or if the
    /// device is lost and cannot be restored.
    pub fn run(&mut self) -> Result<()> {
        window::run_window(self.config.clone())
    }
}
