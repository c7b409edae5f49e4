use anyhow::{anyhow, Result};
use simulation::MaterialId;

use crate::compile::{self, validated};

use super::context::{DEPTH_FORMAT, HDR_FORMAT};
use super::uniforms::{MeshVertex, SpriteInstance};

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
const SPRITE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

const MESH_LAYOUT: [wgpu::VertexBufferLayout<'static>; 1] = [wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &MESH_ATTRIBUTES,
}];
const SPRITE_LAYOUT: [wgpu::VertexBufferLayout<'static>; 1] = [wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<SpriteInstance>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &SPRITE_ATTRIBUTES,
}];

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Bind group layouts shared by every pipeline.
///
/// Scene programs read the camera from group 0 and their own uniform block
/// from group 1. Post programs take a single group: source texture, sampler,
/// uniform block and an optional second texture.
pub(crate) struct PipelineLayouts {
    pub camera_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    pub post_layout: wgpu::BindGroupLayout,
    scene: wgpu::PipelineLayout,
    post: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera layout"),
            entries: &[uniform_entry(0)],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material layout"),
            entries: &[uniform_entry(0)],
        });
        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post layout"),
            entries: &[
                texture_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(2),
                texture_entry(3),
            ],
        });

        let scene = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&camera_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let post = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post pipeline layout"),
            bind_group_layouts: &[&post_layout],
            push_constant_ranges: &[],
        });

        Self {
            camera_layout,
            material_layout,
            post_layout,
            scene,
            post,
        }
    }
}

/// The four draws of the scene pass, in the order they are issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SceneDraw {
    Starfield,
    Horizon,
    Disk,
    Particles,
}

impl SceneDraw {
    pub const ALL: [SceneDraw; 4] = [
        SceneDraw::Starfield,
        SceneDraw::Horizon,
        SceneDraw::Disk,
        SceneDraw::Particles,
    ];

    pub fn material(self) -> MaterialId {
        match self {
            SceneDraw::Starfield => MaterialId::Starfield,
            SceneDraw::Horizon => MaterialId::Horizon,
            SceneDraw::Disk => MaterialId::Disk,
            SceneDraw::Particles => MaterialId::Particles,
        }
    }

    fn is_sprite(self) -> bool {
        matches!(self, SceneDraw::Starfield | SceneDraw::Particles)
    }

    fn vertex_buffers(self) -> &'static [wgpu::VertexBufferLayout<'static>] {
        if self.is_sprite() {
            &SPRITE_LAYOUT
        } else {
            &MESH_LAYOUT
        }
    }

    /// Vertex entry point of the flat stand-in program for this draw.
    fn flat_vertex_entry(self) -> &'static str {
        if self.is_sprite() {
            "vs_billboard"
        } else {
            "vs_mesh"
        }
    }

    fn blend(self) -> Option<wgpu::BlendState> {
        match self {
            SceneDraw::Starfield | SceneDraw::Particles => Some(ADDITIVE),
            SceneDraw::Disk => Some(wgpu::BlendState::ALPHA_BLENDING),
            SceneDraw::Horizon => None,
        }
    }

    /// Only the opaque horizon occludes what is drawn after it.
    fn writes_depth(self) -> bool {
        matches!(self, SceneDraw::Horizon)
    }
}

fn scene_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    module: &wgpu::ShaderModule,
    vertex_entry: &str,
    draw: SceneDraw,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(draw.material().label()),
        layout: Some(&layouts.scene),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vertex_entry),
            buffers: draw.vertex_buffers(),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: draw.writes_depth(),
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: draw.blend(),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn post_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    module: &wgpu::ShaderModule,
    label: &str,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layouts.post),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

/// A pipeline plus the reason it is a stand-in, if it is one.
pub(crate) struct Built {
    pub pipeline: wgpu::RenderPipeline,
    pub fallback: Option<String>,
}

/// Builds one scene material. If its own program does not validate, the
/// flat program is used instead and the validation message is kept.
pub(crate) fn build_scene_material(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    flat: &wgpu::ShaderModule,
    draw: SceneDraw,
    sample_count: u32,
) -> Result<Built> {
    let id = draw.material();
    let own = validated(device, || {
        let module = compile::create_module(device, id.label(), compile::material_source(id));
        scene_pipeline(device, layouts, &module, "vs_main", draw, sample_count)
    });
    match own {
        Ok(pipeline) => Ok(Built {
            pipeline,
            fallback: None,
        }),
        Err(reason) => {
            let pipeline = validated(device, || {
                scene_pipeline(device, layouts, flat, draw.flat_vertex_entry(), draw, sample_count)
            })
            .map_err(|err| anyhow!("flat stand-in for {id} failed to build: {err}"))?;
            Ok(Built {
                pipeline,
                fallback: Some(reason),
            })
        }
    }
}

/// Builds the lensing pass. The error is the validation message.
pub(crate) fn build_lensing(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
) -> Result<wgpu::RenderPipeline, String> {
    validated(device, || {
        let module = compile::create_module(device, "lensing", compile::LENSING_WGSL);
        post_pipeline(device, layouts, &module, "lensing", "fs_main", HDR_FORMAT)
    })
}

pub(crate) struct BloomPipelines {
    pub threshold: wgpu::RenderPipeline,
    pub blur: wgpu::RenderPipeline,
    pub combine: wgpu::RenderPipeline,
}

/// Builds the three bloom stages. They share one program, so they succeed
/// or fail together.
pub(crate) fn build_bloom(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    surface_format: wgpu::TextureFormat,
) -> Result<BloomPipelines, String> {
    validated(device, || {
        let module = compile::create_module(device, "bloom", compile::BLOOM_WGSL);
        let stage = |label, entry, format| {
            post_pipeline(device, layouts, &module, label, entry, format)
        };
        BloomPipelines {
            threshold: stage("bloom threshold", "fs_threshold", HDR_FORMAT),
            blur: stage("bloom blur", "fs_blur", HDR_FORMAT),
            combine: stage("bloom combine", "fs_combine", surface_format),
        }
    })
}

/// Pass-through copies for post passes that fell back or are disabled.
pub(crate) struct CopyPipelines {
    pub hdr: wgpu::RenderPipeline,
    pub surface: wgpu::RenderPipeline,
}

pub(crate) fn build_copies(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    surface_format: wgpu::TextureFormat,
) -> Result<CopyPipelines> {
    validated(device, || {
        let module = compile::create_module(device, "copy", compile::COPY_WGSL);
        let copy = |label, format| post_pipeline(device, layouts, &module, label, "fs_main", format);
        CopyPipelines {
            hdr: copy("copy hdr", HDR_FORMAT),
            surface: copy("copy surface", surface_format),
        }
    })
    .map_err(|err| anyhow!("pass-through copy failed to build: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_draws_cover_the_scene_materials() {
        let materials: Vec<MaterialId> =
            SceneDraw::ALL.iter().map(|draw| draw.material()).collect();
        for id in MaterialId::ALL {
            assert_eq!(materials.contains(&id), !id.is_post_pass(), "{id}");
        }
    }

    #[test]
    fn only_the_horizon_is_opaque() {
        for draw in SceneDraw::ALL {
            assert_eq!(draw.writes_depth(), draw.blend().is_none(), "{draw:?}");
        }
    }

    #[test]
    fn sprite_draws_use_instanced_layout() {
        assert_eq!(
            SceneDraw::Particles.vertex_buffers()[0].step_mode,
            wgpu::VertexStepMode::Instance
        );
        assert_eq!(
            SceneDraw::Disk.vertex_buffers()[0].step_mode,
            wgpu::VertexStepMode::Vertex
        );
        assert_eq!(SceneDraw::Starfield.flat_vertex_entry(), "vs_billboard");
        assert_eq!(SceneDraw::Horizon.flat_vertex_entry(), "vs_mesh");
    }
}
