use std::borrow::Cow;

use simulation::MaterialId;

pub(crate) const DISK_WGSL: &str = include_str!("shaders/disk.wgsl");
pub(crate) const HORIZON_WGSL: &str = include_str!("shaders/horizon.wgsl");
pub(crate) const PARTICLES_WGSL: &str = include_str!("shaders/particles.wgsl");
pub(crate) const STARFIELD_WGSL: &str = include_str!("shaders/starfield.wgsl");
pub(crate) const LENSING_WGSL: &str = include_str!("shaders/lensing.wgsl");
pub(crate) const BLOOM_WGSL: &str = include_str!("shaders/bloom.wgsl");
/// Stand-in for failed scene materials.
pub(crate) const FLAT_WGSL: &str = include_str!("shaders/flat.wgsl");
/// Stand-in for failed post passes.
pub(crate) const COPY_WGSL: &str = include_str!("shaders/copy.wgsl");

/// WGSL program for a material.
pub(crate) fn material_source(id: MaterialId) -> &'static str {
    match id {
        MaterialId::Disk => DISK_WGSL,
        MaterialId::Horizon => HORIZON_WGSL,
        MaterialId::Particles => PARTICLES_WGSL,
        MaterialId::Starfield => STARFIELD_WGSL,
        MaterialId::Lensing => LENSING_WGSL,
        MaterialId::Bloom => BLOOM_WGSL,
    }
}

/// Creates a WGSL shader module without validating it.
///
/// Pair with [`validated`] when the caller wants compile errors back instead of
/// the device's uncaptured-error handler.
pub(crate) fn create_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_owned())),
    })
}

/// Runs `build` inside a validation error scope.
///
/// Shader modules and pipelines built from them report errors asynchronously;
/// the scope turns the first one into an `Err` carrying the validation message.
pub(crate) fn validated<T>(device: &wgpu::Device, build: impl FnOnce() -> T) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(label: &str, source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|err| panic!("{label}: {}", err.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|err| panic!("{label}: {err:?}"));
    }

    fn entry_points(source: &str) -> Vec<String> {
        let module = naga::front::wgsl::parse_str(source).unwrap();
        module
            .entry_points
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    #[test]
    fn every_material_program_validates() {
        for id in MaterialId::ALL {
            validate(id.label(), material_source(id));
        }
        validate("flat", FLAT_WGSL);
        validate("copy", COPY_WGSL);
    }

    #[test]
    fn entry_points_match_pipeline_builders() {
        for source in [DISK_WGSL, HORIZON_WGSL, PARTICLES_WGSL, STARFIELD_WGSL, LENSING_WGSL, COPY_WGSL] {
            let names = entry_points(source);
            assert!(names.contains(&"vs_main".to_string()));
            assert!(names.contains(&"fs_main".to_string()));
        }
        let bloom = entry_points(BLOOM_WGSL);
        for name in ["vs_main", "fs_threshold", "fs_blur", "fs_combine"] {
            assert!(bloom.contains(&name.to_string()), "bloom is missing {name}");
        }
        let flat = entry_points(FLAT_WGSL);
        for name in ["vs_mesh", "vs_billboard", "fs_main"] {
            assert!(flat.contains(&name.to_string()), "flat is missing {name}");
        }
    }
}
