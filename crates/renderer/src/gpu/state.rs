use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use simulation::bloom::BloomSettings;
use simulation::mesh::Mesh;
use simulation::time::ShaderComponent;
use simulation::{FrameState, MaterialId, MaterialReport, SceneResources, SurfaceSize};
use wgpu::util::DeviceExt;

use crate::compile;
use crate::types::{AdapterProfile, Antialiasing};

use super::context::GpuContext;
use super::pipeline::{self, BloomPipelines, CopyPipelines, PipelineLayouts, SceneDraw};
use super::targets::RenderTargets;
use super::uniforms::{
    self, BloomUniforms, CameraUniforms, DiskUniforms, FlatUniforms, HorizonUniforms,
    LensingUniforms, MeshVertex, SpriteInstance, SpriteUniforms,
};

const DISK_RADIAL_SEGMENTS: u32 = 32;
const DISK_ANGULAR_SEGMENTS: u32 = 128;
const HORIZON_STACKS: u32 = 32;
const HORIZON_SLICES: u32 = 48;
/// Particle sizes are stored in nominal pixels; this maps them to sprite diameter.
const PARTICLE_SIZE_SCALE: f32 = 2.0;

/// Outcome of a frame that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Presented,
    /// The surface was stale or busy; nothing was drawn this time.
    Skipped,
}

struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn new(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&MeshVertex::from_mesh(mesh)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// One draw of the scene pass with its uniform block.
struct ScenePass {
    draw: SceneDraw,
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Flat stand-in; its color is written once and never updated.
    fallback: bool,
}

impl ScenePass {
    fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        draw: SceneDraw,
        built: pipeline::Built,
    ) -> Self {
        let fallback = built.fallback.is_some();
        let id = draw.material();
        let contents: Vec<u8> = if fallback {
            bytemuck::bytes_of(&FlatUniforms::for_material(id)).to_vec()
        } else {
            vec![0; material_uniform_size(draw)]
        };
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(id.label()),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(id.label()),
            layout: &layouts.material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });
        Self {
            draw,
            pipeline: built.pipeline,
            uniforms,
            bind_group,
            fallback,
        }
    }
}

fn material_uniform_size(draw: SceneDraw) -> usize {
    match draw {
        SceneDraw::Disk => std::mem::size_of::<DiskUniforms>(),
        SceneDraw::Horizon => std::mem::size_of::<HorizonUniforms>(),
        SceneDraw::Particles | SceneDraw::Starfield => std::mem::size_of::<SpriteUniforms>(),
    }
}

/// Uniform buffers of the post chain.
struct PostBuffers {
    lensing: wgpu::Buffer,
    threshold: wgpu::Buffer,
    blur_horizontal: wgpu::Buffer,
    blur_vertical: wgpu::Buffer,
    combine: wgpu::Buffer,
}

impl PostBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let buffer = |label, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let bloom = std::mem::size_of::<BloomUniforms>();
        Self {
            lensing: buffer("lensing uniforms", std::mem::size_of::<LensingUniforms>()),
            threshold: buffer("bloom threshold uniforms", bloom),
            blur_horizontal: buffer("bloom horizontal uniforms", bloom),
            blur_vertical: buffer("bloom vertical uniforms", bloom),
            combine: buffer("bloom combine uniforms", bloom),
        }
    }
}

/// Bind groups of the post chain. They reference target views, so they are
/// rebuilt together with the targets.
struct PostBindGroups {
    lensing: wgpu::BindGroup,
    threshold: wgpu::BindGroup,
    blur_horizontal: wgpu::BindGroup,
    blur_vertical: wgpu::BindGroup,
    combine: wgpu::BindGroup,
}

impl PostBindGroups {
    fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        sampler: &wgpu::Sampler,
        targets: &RenderTargets,
        buffers: &PostBuffers,
    ) -> Self {
        let group = |label, source: &wgpu::TextureView, uniforms: &wgpu::Buffer, extra: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.post_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(extra),
                    },
                ],
            })
        };
        let scene = &targets.scene.view;
        let lensed = &targets.lensed.view;
        let bloom_a = &targets.bloom_a.view;
        let bloom_b = &targets.bloom_b.view;
        Self {
            lensing: group("lensing group", scene, &buffers.lensing, scene),
            threshold: group("bloom threshold group", lensed, &buffers.threshold, lensed),
            blur_horizontal: group("bloom horizontal group", bloom_a, &buffers.blur_horizontal, bloom_a),
            blur_vertical: group("bloom vertical group", bloom_b, &buffers.blur_vertical, bloom_b),
            combine: group("bloom combine group", lensed, &buffers.combine, bloom_a),
        }
    }
}

/// Every device-bound resource of the renderer.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    sampler: wgpu::Sampler,
    targets: RenderTargets,
    camera_buffer: wgpu::Buffer,
    camera_group: wgpu::BindGroup,
    scene_passes: Vec<ScenePass>,
    disk_mesh: MeshBuffers,
    horizon_mesh: MeshBuffers,
    star_instances: wgpu::Buffer,
    star_count: u32,
    particle_instances: wgpu::Buffer,
    particle_capacity: u32,
    lensing: Option<wgpu::RenderPipeline>,
    bloom: Option<BloomPipelines>,
    copies: CopyPipelines,
    post_buffers: PostBuffers,
    post_groups: PostBindGroups,
}

impl GpuState {
    /// Acquires a device for `target` and builds every pipeline and buffer.
    ///
    /// Materials whose programs fail validation are replaced by their stand-in
    /// and listed in the returned report.
    pub(crate) fn new<T>(
        target: &T,
        size: SurfaceSize,
        scene: &SceneResources<'_>,
        antialiasing: Antialiasing,
        vsync: bool,
    ) -> Result<(Self, MaterialReport)>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, antialiasing, vsync)?;
        let device = &context.device;
        let layouts = PipelineLayouts::new(device);
        let mut report = MaterialReport::all_compiled();

        let flat = compile::create_module(device, "flat", compile::FLAT_WGSL);
        let mut scene_passes = Vec::with_capacity(SceneDraw::ALL.len());
        for draw in SceneDraw::ALL {
            let built =
                pipeline::build_scene_material(device, &layouts, &flat, draw, context.sample_count)?;
            if let Some(reason) = &built.fallback {
                report.mark_fallback(draw.material(), reason.clone());
            }
            scene_passes.push(ScenePass::new(device, &layouts, draw, built));
        }

        let lensing = pipeline::build_lensing(device, &layouts)
            .map_err(|reason| report.mark_fallback(MaterialId::Lensing, reason))
            .ok();
        let bloom = pipeline::build_bloom(device, &layouts, context.surface_format)
            .map_err(|reason| report.mark_fallback(MaterialId::Bloom, reason))
            .ok();
        let copies = pipeline::build_copies(device, &layouts, context.surface_format)?;

        let geometry = scene.geometry;
        let disk_mesh = MeshBuffers::new(
            device,
            "disk mesh",
            &Mesh::annulus(
                geometry.disk_inner_radius,
                geometry.disk_outer_radius,
                DISK_RADIAL_SEGMENTS,
                DISK_ANGULAR_SEGMENTS,
            ),
        );
        let horizon_mesh = MeshBuffers::new(
            device,
            "horizon mesh",
            &Mesh::uv_sphere(geometry.event_horizon_radius, HORIZON_STACKS, HORIZON_SLICES),
        );

        let stars = uniforms::star_instances(scene.starfield);
        let star_instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("star instances"),
            // Zero-sized vertex buffers are invalid; keep one slot around.
            contents: if stars.is_empty() {
                bytemuck::bytes_of(&SpriteInstance {
                    center: [0.0; 4],
                    extra: [0.0; 4],
                })
            } else {
                bytemuck::cast_slice(&stars)
            },
            usage: wgpu::BufferUsages::VERTEX,
        });
        let particle_capacity = scene.particle_capacity.max(1);
        let particle_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle instances"),
            size: (particle_capacity as usize * std::mem::size_of::<SpriteInstance>())
                as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera group"),
            layout: &layouts.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bloom_extent = BloomSettings::default().target_extent(context.size.width, context.size.height);
        let targets = RenderTargets::new(device, context.size, context.sample_count, bloom_extent);
        let post_buffers = PostBuffers::new(device);
        let post_groups = PostBindGroups::new(device, &layouts, &sampler, &targets, &post_buffers);

        tracing::info!(
            adapter = %context.adapter_profile.name,
            width = context.size.width,
            height = context.size.height,
            sample_count = context.sample_count,
            stars = stars.len(),
            "GPU resources acquired"
        );

        let state = Self {
            star_count: stars.len() as u32,
            context,
            layouts,
            sampler,
            targets,
            camera_buffer,
            camera_group,
            scene_passes,
            disk_mesh,
            horizon_mesh,
            star_instances,
            particle_instances,
            particle_capacity,
            lensing,
            bloom,
            copies,
            post_buffers,
            post_groups,
        };
        Ok((state, report))
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn is_lost(&self) -> bool {
        self.context.is_lost()
    }

    pub(crate) fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() || size == self.context.size {
            return;
        }
        self.context.resize(size);
        self.rebuild_targets(size, self.targets.bloom_extent);
    }

    fn rebuild_targets(&mut self, size: SurfaceSize, bloom_extent: (u32, u32)) {
        let device = &self.context.device;
        self.targets = RenderTargets::new(device, size, self.context.sample_count, bloom_extent);
        self.post_groups = PostBindGroups::new(
            device,
            &self.layouts,
            &self.sampler,
            &self.targets,
            &self.post_buffers,
        );
        tracing::debug!(
            width = size.width,
            height = size.height,
            bloom_width = bloom_extent.0,
            bloom_height = bloom_extent.1,
            "rebuilt render targets"
        );
    }

    fn write_uniforms(&self, frame: &FrameState<'_>) -> u32 {
        let queue = &self.context.queue;
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms::from_frame(frame)),
        );

        for pass in self.scene_passes.iter().filter(|pass| !pass.fallback) {
            match pass.draw {
                SceneDraw::Disk => queue.write_buffer(
                    &pass.uniforms,
                    0,
                    bytemuck::bytes_of(&DiskUniforms::from_frame(frame)),
                ),
                SceneDraw::Horizon => queue.write_buffer(
                    &pass.uniforms,
                    0,
                    bytemuck::bytes_of(&HorizonUniforms::from_frame(frame)),
                ),
                SceneDraw::Particles => queue.write_buffer(
                    &pass.uniforms,
                    0,
                    bytemuck::bytes_of(&SpriteUniforms::new(
                        frame.times.get(ShaderComponent::Particles),
                        PARTICLE_SIZE_SCALE,
                    )),
                ),
                SceneDraw::Starfield => queue.write_buffer(
                    &pass.uniforms,
                    0,
                    bytemuck::bytes_of(&SpriteUniforms::new(
                        frame.times.get(ShaderComponent::Starfield),
                        1.0,
                    )),
                ),
            }
        }

        let full = (self.targets.size.width, self.targets.size.height);
        let bloom = self.targets.bloom_extent;
        let post = &self.post_buffers;
        queue.write_buffer(
            &post.lensing,
            0,
            bytemuck::bytes_of(&LensingUniforms::from_frame(frame)),
        );
        let bloom_uniforms = [
            (&post.threshold, BloomUniforms::new(frame, full, [0.0, 0.0])),
            (&post.blur_horizontal, BloomUniforms::new(frame, bloom, [1.0, 0.0])),
            (&post.blur_vertical, BloomUniforms::new(frame, bloom, [0.0, 1.0])),
            (&post.combine, BloomUniforms::new(frame, full, [0.0, 0.0])),
        ];
        for (buffer, record) in bloom_uniforms {
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(&record));
        }

        let instances = uniforms::particle_instances(frame.particles);
        let count = instances.len().min(self.particle_capacity as usize);
        if count > 0 {
            queue.write_buffer(
                &self.particle_instances,
                0,
                bytemuck::cast_slice(&instances[..count]),
            );
        }
        count as u32
    }

    /// Draws and presents one frame.
    ///
    /// Only an out-of-memory surface is an error; stale or busy surfaces are
    /// reconfigured and the frame is skipped.
    pub(crate) fn render(&mut self, frame: &FrameState<'_>) -> Result<FrameOutcome, wgpu::SurfaceError> {
        let size = self.context.size;
        let bloom_extent = frame.bloom.target_extent(size.width, size.height);
        if bloom_extent != self.targets.bloom_extent || size != self.targets.size {
            self.rebuild_targets(size, bloom_extent);
        }

        let output = match self.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface is stale; reconfiguring");
                self.context.reconfigure();
                return Ok(FrameOutcome::Skipped);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(wgpu::SurfaceError::OutOfMemory),
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; retrying next frame");
                return Ok(FrameOutcome::Skipped);
            }
            Err(other) => {
                tracing::warn!(error = ?other, "surface error; retrying next frame");
                return Ok(FrameOutcome::Skipped);
            }
        };
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let particle_count = self.write_uniforms(frame);
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        self.encode_scene(&mut encoder, particle_count);

        let lensed = &self.targets.lensed.view;
        match &self.lensing {
            Some(lensing) => fullscreen(&mut encoder, "lensing", lensed, lensing, &self.post_groups.lensing),
            None => fullscreen(&mut encoder, "lensing copy", lensed, &self.copies.hdr, &self.post_groups.lensing),
        }

        match self.bloom.as_ref().filter(|_| frame.bloom.is_enabled()) {
            Some(bloom) => self.encode_bloom(&mut encoder, bloom, frame.bloom.blur_iterations, &surface_view),
            None => fullscreen(
                &mut encoder,
                "present copy",
                &surface_view,
                &self.copies.surface,
                &self.post_groups.combine,
            ),
        }

        self.context.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(FrameOutcome::Presented)
    }

    fn encode_scene(&self, encoder: &mut wgpu::CommandEncoder, particle_count: u32) {
        let (view, resolve_target) = self.targets.scene_attachment();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.camera_group, &[]);

        for scene_pass in &self.scene_passes {
            pass.set_pipeline(&scene_pass.pipeline);
            pass.set_bind_group(1, &scene_pass.bind_group, &[]);
            match scene_pass.draw {
                SceneDraw::Starfield if self.star_count > 0 => {
                    pass.set_vertex_buffer(0, self.star_instances.slice(..));
                    pass.draw(0..6, 0..self.star_count);
                }
                SceneDraw::Particles if particle_count > 0 => {
                    pass.set_vertex_buffer(0, self.particle_instances.slice(..));
                    pass.draw(0..6, 0..particle_count);
                }
                SceneDraw::Horizon => draw_mesh(&mut pass, &self.horizon_mesh),
                SceneDraw::Disk => draw_mesh(&mut pass, &self.disk_mesh),
                SceneDraw::Starfield | SceneDraw::Particles => {}
            }
        }
    }

    fn encode_bloom(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bloom: &BloomPipelines,
        iterations: u32,
        surface_view: &wgpu::TextureView,
    ) {
        let groups = &self.post_groups;
        let bloom_a = &self.targets.bloom_a.view;
        let bloom_b = &self.targets.bloom_b.view;
        fullscreen(encoder, "bloom threshold", bloom_a, &bloom.threshold, &groups.threshold);
        for _ in 0..iterations.max(1) {
            fullscreen(encoder, "bloom horizontal", bloom_b, &bloom.blur, &groups.blur_horizontal);
            fullscreen(encoder, "bloom vertical", bloom_a, &bloom.blur, &groups.blur_vertical);
        }
        fullscreen(encoder, "bloom combine", surface_view, &bloom.combine, &groups.combine);
    }
}

fn draw_mesh(pass: &mut wgpu::RenderPass<'_>, mesh: &MeshBuffers) {
    pass.set_vertex_buffer(0, mesh.vertices.slice(..));
    pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
}

fn fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, group, &[]);
    pass.draw(0..3, 0..1);
}
