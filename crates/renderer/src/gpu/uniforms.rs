//! `#[repr(C)]` records mirrored by the WGSL uniform blocks and vertex layouts.
//!
//! Every uniform struct is a multiple of 16 bytes and only uses `vec4`-sized
//! fields (or a leading `vec2` pair) so the Rust and WGSL layouts line up
//! without explicit padding rules.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use simulation::starfield::Starfield;
use simulation::time::ShaderComponent;
use simulation::{FrameState, MaterialId, ParticleField};

/// Sprite size in pixels of a star with brightness 0.5.
const STAR_SIZE: f32 = 3.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
    /// Width, height in pixels.
    pub viewport: [f32; 4],
}

impl CameraUniforms {
    pub fn from_frame(frame: &FrameState<'_>) -> Self {
        Self {
            view_proj: frame.view_projection.to_cols_array_2d(),
            position: frame.camera.position.extend(1.0).to_array(),
            viewport: [
                frame.size.width.max(1) as f32,
                frame.size.height.max(1) as f32,
                0.0,
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct DiskUniforms {
    pub params: [f32; 4],
    pub hot: [f32; 4],
    pub cool: [f32; 4],
}

impl DiskUniforms {
    pub fn from_frame(frame: &FrameState<'_>) -> Self {
        let disk = &frame.disk;
        Self {
            params: [
                disk.inner_radius,
                disk.outer_radius,
                disk.rotation_speed,
                frame.times.get(ShaderComponent::Disk),
            ],
            hot: disk.hot_color.extend(disk.emissive_strength).to_array(),
            cool: disk.cool_color.extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct HorizonUniforms {
    pub glow: [f32; 4],
    pub params: [f32; 4],
}

impl HorizonUniforms {
    pub fn from_frame(frame: &FrameState<'_>) -> Self {
        let horizon = &frame.horizon;
        Self {
            glow: horizon.glow_color.extend(horizon.glow_intensity).to_array(),
            params: [
                horizon.radius,
                frame.times.get(ShaderComponent::Horizon),
                0.0,
                0.0,
            ],
        }
    }
}

/// Shared by the particle and star programs: time plus a size multiplier.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct SpriteUniforms {
    pub params: [f32; 4],
}

impl SpriteUniforms {
    pub fn new(time: f32, size_scale: f32) -> Self {
        Self {
            params: [time, size_scale, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct FlatUniforms {
    pub color: [f32; 4],
}

impl FlatUniforms {
    pub fn for_material(id: MaterialId) -> Self {
        Self {
            color: id.fallback_color().extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct LensingUniforms {
    pub camera_position: [f32; 4],
    pub forward: [f32; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    pub black_hole: [f32; 4],
    pub params: [f32; 4],
}

impl LensingUniforms {
    pub fn from_frame(frame: &FrameState<'_>) -> Self {
        let camera = &frame.camera;
        let lensing = &frame.lensing;
        Self {
            camera_position: camera.position.extend((camera.fov_y * 0.5).tan()).to_array(),
            forward: camera.forward.extend(camera.aspect).to_array(),
            right: camera.right.extend(0.0).to_array(),
            up: camera.up.extend(0.0).to_array(),
            black_hole: lensing
                .black_hole
                .extend(lensing.schwarzschild_radius)
                .to_array(),
            params: [
                lensing.intensity,
                lensing.step_size,
                lensing.influence_radius,
                lensing.steps as f32,
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct BloomUniforms {
    pub texel: [f32; 2],
    pub direction: [f32; 2],
    pub settings: [f32; 4],
}

impl BloomUniforms {
    /// `extent` is the size of the texture the pass samples from.
    pub fn new(frame: &FrameState<'_>, extent: (u32, u32), direction: [f32; 2]) -> Self {
        let bloom = &frame.bloom;
        Self {
            texel: [1.0 / extent.0.max(1) as f32, 1.0 / extent.1.max(1) as f32],
            direction,
            settings: [
                bloom.threshold,
                bloom.soft_threshold,
                bloom.strength,
                bloom.radius,
            ],
        }
    }
}

/// Vertex of the disk and horizon meshes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn from_mesh(mesh: &simulation::mesh::Mesh) -> Vec<Self> {
        mesh.positions
            .iter()
            .zip(&mesh.normals)
            .map(|(position, normal)| Self {
                position: position.to_array(),
                normal: normal.to_array(),
            })
            .collect()
    }
}

/// Per-instance data for particle and star sprites.
///
/// `center.w` is the sprite size in pixels; `extra` is the particle color or
/// the star's (brightness, twinkle speed, phase).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct SpriteInstance {
    pub center: [f32; 4],
    pub extra: [f32; 4],
}

impl SpriteInstance {
    fn new(position: Vec3, size: f32, extra: Vec4) -> Self {
        Self {
            center: position.extend(size).to_array(),
            extra: extra.to_array(),
        }
    }
}

pub(crate) fn particle_instances(field: &ParticleField) -> Vec<SpriteInstance> {
    field
        .positions()
        .iter()
        .zip(field.colors())
        .zip(field.sizes())
        .map(|((position, color), size)| SpriteInstance::new(*position, *size, color.extend(1.0)))
        .collect()
}

pub(crate) fn star_instances(starfield: &Starfield) -> Vec<SpriteInstance> {
    starfield
        .stars()
        .iter()
        .map(|star| {
            SpriteInstance::new(
                star.position,
                STAR_SIZE * (0.5 + star.brightness),
                Vec4::new(star.brightness, star.twinkle_speed, star.phase, 0.0),
            )
        })
        .collect()
}
