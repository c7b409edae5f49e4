//! Vector-field helpers shared by the particle integrator, the disk/horizon
//! shading math, and the lensing ray-marcher.
//!
//! Everything here operates on `glam::Vec3`; the functions only add the
//! handful of guarded operations the simulation keeps repeating (normalising
//! near zero, building tangents, measuring distance from the disk plane).

use glam::{Vec2, Vec3};

/// Normal of the accretion disk plane. The disk lies in world XZ.
pub const DISK_NORMAL: Vec3 = Vec3::Y;

/// Returns `v / |v|`, or `None` when the length is below `epsilon`.
pub fn normalize_or_none(v: Vec3, epsilon: f32) -> Option<Vec3> {
    let length = v.length();
    if length < epsilon || !length.is_finite() {
        None
    } else {
        Some(v / length)
    }
}

/// Unit tangent that curls around `axis` at the given inward direction.
///
/// Returns `None` when `inward` is (anti)parallel to `axis`, i.e. at the
/// poles, where the cross product collapses.
pub fn swirl_tangent(inward: Vec3, axis: Vec3, epsilon: f32) -> Option<Vec3> {
    normalize_or_none(inward.cross(axis), epsilon)
}

/// Distance from the disk's rotation axis, measured in the disk plane.
pub fn planar_distance(position: Vec3) -> f32 {
    Vec2::new(position.x, position.z).length()
}

/// Signed distance from the disk plane.
pub fn height_above_disk(position: Vec3) -> f32 {
    position.dot(DISK_NORMAL)
}

/// Rotates `(x, z)` about the Y axis by `angle` radians.
pub fn rotate_about_y(point: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(
        point.x * cos - point.z * sin,
        point.y,
        point.x * sin + point.z * cos,
    )
}

/// Point on a sphere of `radius` from the usual inverse-transform pair.
///
/// `u_azimuth` and `u_polar` are uniform samples in `[0, 1)`. Taking the polar
/// angle as `acos(2u - 1)` keeps the surface density uniform instead of
/// clustering points at the poles.
pub fn sphere_point(radius: f32, u_azimuth: f32, u_polar: f32) -> Vec3 {
    let azimuth = u_azimuth * std::f32::consts::TAU;
    let polar = (2.0 * u_polar - 1.0).clamp(-1.0, 1.0).acos();
    let (sin_polar, cos_polar) = polar.sin_cos();
    Vec3::new(
        radius * sin_polar * azimuth.cos(),
        radius * cos_polar,
        radius * sin_polar * azimuth.sin(),
    )
}

/// True when every component is finite.
pub fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rejects_tiny_vectors() {
        assert!(normalize_or_none(Vec3::splat(1e-6), 1e-3).is_none());
        let unit = normalize_or_none(Vec3::new(3.0, 0.0, 4.0), 1e-3).unwrap();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn swirl_tangent_vanishes_at_poles() {
        assert!(swirl_tangent(Vec3::Y, DISK_NORMAL, 1e-3).is_none());
        let tangent = swirl_tangent(-Vec3::X, DISK_NORMAL, 1e-3).unwrap();
        assert!(tangent.dot(Vec3::X).abs() < 1e-6);
        assert!(tangent.dot(DISK_NORMAL).abs() < 1e-6);
    }

    #[test]
    fn rotation_preserves_planar_distance() {
        let point = Vec3::new(2.0, 0.5, -1.0);
        let rotated = rotate_about_y(point, 1.3);
        assert!((planar_distance(point) - planar_distance(rotated)).abs() < 1e-5);
        assert_eq!(rotated.y, point.y);
    }

    #[test]
    fn sphere_point_lands_on_radius() {
        for (a, p) in [(0.0, 0.0), (0.25, 0.5), (0.9, 0.999)] {
            let point = sphere_point(5.0, a, p);
            assert!((point.length() - 5.0).abs() < 1e-4);
        }
    }
}
