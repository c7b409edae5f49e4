//! Black-hole scene simulation.
//!
//! The crate holds everything that does not need a GPU: the particle
//! integrator, the disk/horizon/lensing/bloom shading math the WGSL programs
//! mirror, the frame-time governor, and the [`Engine`] that ties them to a
//! [`RenderBackend`].

pub mod backend;
pub mod bloom;
pub mod camera;
pub mod config;
pub mod disk;
pub mod engine;
pub mod geometry;
pub mod governor;
pub mod horizon;
pub mod lensing;
pub mod lifecycle;
pub mod materials;
pub mod mesh;
pub mod observers;
pub mod particles;
pub mod starfield;
pub mod time;
pub mod vector;

pub use backend::{BackendError, FrameState, NullBackend, RenderBackend, SceneResources, Surface, SurfaceSize};
pub use camera::{CameraFrame, OrbitCamera};
pub use config::{ConfigUpdate, Parameter, PerformanceMode, SimulationConfig, UpdateError};
pub use engine::{
    Engine, EngineError, EngineEvent, EngineSettings, EngineStats, InitializationError, RunState,
};
pub use geometry::BlackHoleGeometry;
pub use governor::{GovernorSettings, PerformanceGovernor, PerformanceStats};
pub use lifecycle::DeviceLifecycle;
pub use materials::{MaterialId, MaterialReport};
pub use observers::SubscriptionId;
pub use particles::ParticleField;
