use simulation::{EngineSettings, SimulationConfig};

/// Anti-aliasing policy for the scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick a sample count the device supports, up to 4.
    #[default]
    Auto,
    /// Render the scene without MSAA.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// What the renderer learned about the adapter it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    /// CPU rasterizers such as llvmpipe or SwiftShader.
    pub fn is_software(&self) -> bool {
        if self.device_type == wgpu::DeviceType::Cpu {
            return true;
        }
        let name = self.name.to_ascii_lowercase();
        ["llvmpipe", "swiftshader", "softpipe", "lavapipe"]
            .iter()
            .any(|needle| name.contains(needle))
    }
}

/// Configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the CLI and scene file: window geometry and
/// presentation on one side, the simulation's initial tunables and structural
/// settings on the other.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    pub antialiasing: Antialiasing,
    pub vsync: bool,
    pub simulation: SimulationConfig,
    pub engine: EngineSettings,
}

impl Default for RendererConfig {
    /// A 1280x720 vsynced window with default simulation settings.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Black Hole".to_string(),
            antialiasing: Antialiasing::default(),
            vsync: true,
            simulation: SimulationConfig::default(),
            engine: EngineSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: name.to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type,
        }
    }

    #[test]
    fn software_adapters_are_detected_by_type_or_name() {
        assert!(profile("anything", wgpu::DeviceType::Cpu).is_software());
        assert!(profile("llvmpipe (LLVM 17.0.6, 256 bits)", wgpu::DeviceType::Other).is_software());
        assert!(profile("SwiftShader Device", wgpu::DeviceType::Other).is_software());
        assert!(!profile("AMD Radeon RX 7800 XT", wgpu::DeviceType::DiscreteGpu).is_software());
    }

    #[test]
    fn default_config_is_a_vsynced_window() {
        let config = RendererConfig::default();
        assert_eq!(config.surface_size, (1280, 720));
        assert!(config.vsync);
        assert_eq!(config.antialiasing, Antialiasing::Auto);
    }
}
