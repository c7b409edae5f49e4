//! Accretion disk shading math.
//!
//! This is the reference for `disk.wgsl`: the vertex stage spins each ring at
//! its own Keplerian rate, the fragment stage maps radius to temperature and
//! fades the disk toward its outer edge and at grazing angles.

use glam::{Vec3, Vec4};

use crate::geometry::BlackHoleGeometry;
use crate::vector;

/// Radii below this are treated as this value when computing angular velocity.
const MIN_ORBIT_RADIUS: f32 = 1e-3;

/// Angular velocity of a ring of radius `r`, `rotation_speed / r^1.5`.
pub fn angular_velocity(rotation_speed: f32, r: f32) -> f32 {
    rotation_speed / r.max(MIN_ORBIT_RADIUS).powf(1.5)
}

/// Output of the vertex stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskVertex {
    pub position: Vec3,
    /// Planar radius of the vertex before rotation.
    pub radius: f32,
}

/// Rotates `position` about the disk normal by `angular_velocity(r) * time`.
pub fn rotate_vertex(position: Vec3, rotation_speed: f32, time: f32) -> DiskVertex {
    let radius = vector::planar_distance(position);
    let angle = angular_velocity(rotation_speed, radius) * time;
    DiskVertex {
        position: vector::rotate_about_y(position, angle),
        radius,
    }
}

/// Parameters shared by both disk shader stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskShading {
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub rotation_speed: f32,
    pub hot_color: Vec3,
    pub cool_color: Vec3,
    pub emissive_strength: f32,
}

impl DiskShading {
    pub fn new(geometry: &BlackHoleGeometry, rotation_speed: f32) -> Self {
        Self {
            inner_radius: geometry.disk_inner_radius,
            outer_radius: geometry.disk_outer_radius,
            rotation_speed,
            hot_color: Vec3::new(1.0, 0.9, 0.6),
            cool_color: Vec3::new(0.9, 0.3, 0.05),
            emissive_strength: 0.5,
        }
    }

    pub fn normalized_radius(&self, radius: f32) -> f32 {
        let span = (self.outer_radius - self.inner_radius).max(f32::EPSILON);
        ((radius - self.inner_radius) / span).clamp(0.0, 1.0)
    }

    /// Fragment stage. Returns premultiplication-free RGBA.
    pub fn shade_fragment(&self, radius: f32, view_dir: Vec3, normal: Vec3) -> Vec4 {
        let nr = self.normalized_radius(radius);
        let base = self.hot_color.lerp(self.cool_color, nr);
        let color = base + base * self.emissive_strength;
        let fresnel = view_dir
            .normalize_or_zero()
            .dot(normal.normalize_or_zero())
            .abs();
        let alpha = (0.9 - 0.6 * nr) * (0.3 + 0.7 * fresnel);
        color.extend(alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shading() -> DiskShading {
        DiskShading::new(&BlackHoleGeometry::default(), 1.0)
    }

    #[test]
    fn inner_rings_orbit_faster() {
        let radii = [1.5f32, 2.0, 3.0, 4.5, 6.0];
        for speed in [0.1f32, 1.0, 5.0] {
            for pair in radii.windows(2) {
                assert!(angular_velocity(speed, pair[0]) > angular_velocity(speed, pair[1]));
            }
        }
    }

    #[test]
    fn rotation_keeps_ring_radius() {
        let vertex = rotate_vertex(Vec3::new(3.0, 0.0, 0.0), 2.0, 7.5);
        assert!((vertex.radius - 3.0).abs() < 1e-6);
        assert!((vector::planar_distance(vertex.position) - 3.0).abs() < 1e-4);
        let still = rotate_vertex(Vec3::new(3.0, 0.0, 0.0), 2.0, 0.0);
        assert_eq!(still.position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn alpha_fades_outward_and_at_grazing_angles() {
        let shading = shading();
        let face_on = shading.shade_fragment(1.5, Vec3::Y, Vec3::Y);
        assert!((face_on.w - 0.9).abs() < 1e-6);
        let outer = shading.shade_fragment(6.0, Vec3::Y, Vec3::Y);
        assert!((outer.w - 0.3).abs() < 1e-6);
        let edge_on = shading.shade_fragment(1.5, Vec3::X, Vec3::Y);
        assert!((edge_on.w - 0.27).abs() < 1e-6);
        let from_below = shading.shade_fragment(1.5, -Vec3::Y, Vec3::Y);
        assert_eq!(from_below.w, face_on.w);
    }

    #[test]
    fn inner_edge_is_hotter() {
        let shading = shading();
        let inner = shading.shade_fragment(1.5, Vec3::Y, Vec3::Y);
        let outer = shading.shade_fragment(6.0, Vec3::Y, Vec3::Y);
        assert!(inner.z > outer.z);
        assert!((inner.x - 1.5).abs() < 1e-6);
    }
}
