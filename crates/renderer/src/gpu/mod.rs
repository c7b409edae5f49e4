//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, surface and device, and watches for
//!   device loss.
//! - `pipeline` turns the WGSL materials into render pipelines, substituting
//!   flat or pass-through programs when a material fails validation.
//! - `targets` holds the HDR offscreen textures the scene, lensing and bloom
//!   passes render into.
//! - `uniforms` mirrors the WGSL uniform blocks and instance layouts.
//! - `state` glues everything together and records one frame:
//!   scene, lensing, bloom, present.

mod context;
mod pipeline;
mod state;
mod targets;
mod uniforms;

pub(crate) use state::{FrameOutcome, GpuState};
