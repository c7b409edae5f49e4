use simulation::SurfaceSize;

use super::context::{DEPTH_FORMAT, HDR_FORMAT};

/// A texture together with the view passes bind or render into.
pub(crate) struct Target {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Target {
    fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Offscreen targets for one surface size.
///
/// The scene is drawn into `scene` (through `multisampled` when MSAA is on),
/// lensed into `lensed`, and the bloom chain ping-pongs between `bloom_a` and
/// `bloom_b` at `bloom_extent`.
pub(crate) struct RenderTargets {
    pub size: SurfaceSize,
    pub bloom_extent: (u32, u32),
    pub scene: Target,
    pub multisampled: Option<Target>,
    pub depth: Target,
    pub lensed: Target,
    pub bloom_a: Target,
    pub bloom_b: Target,
}

impl RenderTargets {
    pub fn new(
        device: &wgpu::Device,
        size: SurfaceSize,
        sample_count: u32,
        bloom_extent: (u32, u32),
    ) -> Self {
        let full = (size.width, size.height);
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let multisampled = (sample_count > 1).then(|| {
            Target::new(
                device,
                "scene msaa target",
                full,
                HDR_FORMAT,
                sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
        });
        Self {
            size,
            bloom_extent,
            scene: Target::new(device, "scene target", full, HDR_FORMAT, 1, sampled),
            multisampled,
            depth: Target::new(
                device,
                "scene depth",
                full,
                DEPTH_FORMAT,
                sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            lensed: Target::new(device, "lensed target", full, HDR_FORMAT, 1, sampled),
            bloom_a: Target::new(device, "bloom target a", bloom_extent, HDR_FORMAT, 1, sampled),
            bloom_b: Target::new(device, "bloom target b", bloom_extent, HDR_FORMAT, 1, sampled),
        }
    }

    /// Attachment for the scene pass: the MSAA target resolving into `scene`,
    /// or `scene` itself.
    pub fn scene_attachment(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match &self.multisampled {
            Some(msaa) => (&msaa.view, Some(&self.scene.view)),
            None => (&self.scene.view, None),
        }
    }
}
