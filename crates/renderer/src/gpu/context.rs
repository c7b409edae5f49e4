use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use simulation::SurfaceSize;

use crate::types::{AdapterProfile, Antialiasing};

/// Format of every offscreen scene and post-processing target.
pub(crate) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// `Auto` never asks for more samples than this.
const AUTO_SAMPLE_CAP: u32 = 4;

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: SurfaceSize,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub adapter_profile: AdapterProfile,
    /// Raised from the device-lost callback, which may run on any thread.
    pub lost: Arc<AtomicBool>,
}

impl GpuContext {
    /// Creates instance, surface, adapter and device for `target`.
    ///
    /// # Safety contract
    ///
    /// The surface is created from raw handles, so `target` must outlive the
    /// returned context. `WgpuBackend` guarantees this by holding the window
    /// alongside the context and dropping the context first.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: SurfaceSize,
        antialiasing: Antialiasing,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // SAFETY: see the contract on this function.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info());
        let is_software = adapter_profile.is_software();
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial_size.width.max(1);
        let height = initial_size.height.max(1);
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            anyhow::bail!("surface reports no supported formats for this adapter");
        };
        // Post passes write linear color; an sRGB swapchain does the encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    "no sRGB surface format available; output will look darker"
                );
                first_format
            });

        let sample_count = if is_software {
            if !matches!(antialiasing, Antialiasing::Off) {
                tracing::warn!("software rasterizer detected; disabling MSAA for performance");
            }
            1
        } else {
            choose_sample_count(&adapter, antialiasing)
        };

        let mut required_features = wgpu::Features::empty();
        if sample_count > 4 {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("blackhole device"),
            required_features,
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            tracing::warn!(?reason, %message, "GPU device lost");
            flag.store(true, Ordering::SeqCst);
        });
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured GPU error");
        }));

        let present_mode = choose_present_mode(&surface_caps.present_modes, vsync);
        tracing::debug!(?present_mode, vsync, sample_count, "using present mode");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size: SurfaceSize::new(width, height),
            sample_count,
            surface_format,
            adapter_profile,
            lost,
        })
    }

    pub(crate) fn resize(&mut self, new_size: SurfaceSize) {
        if new_size.is_empty() {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Re-applies the current configuration after the surface went stale.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}

/// Picks the MSAA sample count for the scene pass, honouring what both the
/// color and depth formats support.
fn choose_sample_count(adapter: &wgpu::Adapter, antialiasing: Antialiasing) -> u32 {
    let color = adapter.get_texture_format_features(HDR_FORMAT).flags;
    let depth = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
    let mut supported: Vec<u32> = color
        .supported_sample_counts()
        .into_iter()
        .filter(|&count| depth.sample_count_supported(count))
        .collect();
    if !supported.contains(&1) {
        supported.push(1);
    }
    supported.sort_unstable();
    supported.dedup();

    let resolvable = color.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE);
    let requested = match antialiasing {
        Antialiasing::Off => return 1,
        Antialiasing::Auto => AUTO_SAMPLE_CAP,
        Antialiasing::Samples(requested) => requested.max(1),
    };
    if !resolvable {
        tracing::warn!(format = ?HDR_FORMAT, "scene format does not support MSAA resolve; disabling MSAA");
        return 1;
    }
    let chosen = supported
        .iter()
        .copied()
        .filter(|&count| count <= requested)
        .max()
        .unwrap_or(1);
    if matches!(antialiasing, Antialiasing::Samples(_)) && chosen != requested {
        tracing::warn!(
            requested,
            fallback = chosen,
            ?supported,
            "requested MSAA sample count not supported; falling back"
        );
    }
    chosen
}

fn choose_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    let fifo = wgpu::PresentMode::Fifo;
    if vsync {
        return fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(fifo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_always_presents_in_fifo() {
        let modes = [wgpu::PresentMode::Immediate, wgpu::PresentMode::Fifo];
        assert_eq!(choose_present_mode(&modes, true), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn uncapped_prefers_immediate_then_mailbox() {
        let all = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];
        assert_eq!(choose_present_mode(&all, false), wgpu::PresentMode::Immediate);
        let mailbox = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox];
        assert_eq!(choose_present_mode(&mailbox, false), wgpu::PresentMode::Mailbox);
        assert_eq!(
            choose_present_mode(&[wgpu::PresentMode::Fifo], false),
            wgpu::PresentMode::Fifo
        );
    }
}
