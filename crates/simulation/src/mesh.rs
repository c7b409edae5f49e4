//! CPU-side meshes for the disk and horizon.

use glam::Vec3;

/// Indexed triangle list built on the CPU and uploaded once by the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat annulus in the XZ plane facing +Y.
    ///
    /// Rings run from `inner` to `outer`; each ring has `angular_segments + 1`
    /// vertices so the seam carries its own copy.
    pub fn annulus(inner: f32, outer: f32, radial_segments: u32, angular_segments: u32) -> Self {
        let radial = radial_segments.max(1);
        let angular = angular_segments.max(3);
        let ring_len = angular + 1;
        let mut mesh = Mesh::default();
        for ring in 0..=radial {
            let radius = inner + (outer - inner) * ring as f32 / radial as f32;
            for step in 0..=angular {
                let theta = std::f32::consts::TAU * step as f32 / angular as f32;
                mesh.positions
                    .push(Vec3::new(radius * theta.cos(), 0.0, radius * theta.sin()));
                mesh.normals.push(Vec3::Y);
            }
        }
        for ring in 0..radial {
            for step in 0..angular {
                let a = ring * ring_len + step;
                let b = a + ring_len;
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh
    }

    /// Latitude/longitude sphere centred on the origin.
    pub fn uv_sphere(radius: f32, stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);
        let row_len = slices + 1;
        let mut mesh = Mesh::default();
        for stack in 0..=stacks {
            let polar = std::f32::consts::PI * stack as f32 / stacks as f32;
            let (sin_polar, cos_polar) = polar.sin_cos();
            for slice in 0..=slices {
                let azimuth = std::f32::consts::TAU * slice as f32 / slices as f32;
                let normal = Vec3::new(
                    sin_polar * azimuth.cos(),
                    cos_polar,
                    sin_polar * azimuth.sin(),
                );
                mesh.positions.push(normal * radius);
                mesh.normals.push(normal);
            }
        }
        for stack in 0..stacks {
            for slice in 0..slices {
                let a = stack * row_len + slice;
                let b = a + row_len;
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annulus_vertices_stay_between_radii() {
        let mesh = Mesh::annulus(1.5, 6.0, 4, 32);
        assert_eq!(mesh.vertex_count(), 5 * 33);
        assert_eq!(mesh.triangle_count(), 4 * 32 * 2);
        for p in &mesh.positions {
            let r = p.length();
            assert!(r >= 1.5 - 1e-4 && r <= 6.0 + 1e-4);
            assert_eq!(p.y, 0.0);
        }
        let max_index = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max_index < mesh.vertex_count());
    }

    #[test]
    fn sphere_normals_are_unit_and_outward() {
        let mesh = Mesh::uv_sphere(2.0, 8, 16);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((p.length() - 2.0).abs() < 1e-4);
            assert!(p.dot(*n) > 0.0);
        }
    }
}
