//! Screen-space gravitational lensing.
//!
//! The scene is rendered into an offscreen texture first; this pass then
//! re-samples it with bent rays near the projected black hole. The functions
//! here are the CPU reference for `lensing.wgsl` and are kept in step with it.

use glam::{Vec2, Vec3};

use crate::camera::CameraFrame;

/// Deflection is suppressed inside this multiple of the Schwarzschild radius.
pub const SINGULARITY_GUARD: f32 = 1.1;

/// Anything that can be sampled at a texture coordinate.
pub trait SceneTexture {
    fn sample(&self, uv: Vec2) -> Vec3;
}

impl<F> SceneTexture for F
where
    F: Fn(Vec2) -> Vec3,
{
    fn sample(&self, uv: Vec2) -> Vec3 {
        self(uv)
    }
}

/// Per-frame lensing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensingParams {
    pub black_hole: Vec3,
    pub schwarzschild_radius: f32,
    pub intensity: f32,
    /// Ray-march step budget for the current performance mode.
    pub steps: u32,
    pub step_size: f32,
    /// Screen-space radius (in UV units) beyond which pixels pass through.
    pub influence_radius: f32,
}

impl LensingParams {
    pub const DEFAULT_INFLUENCE_RADIUS: f32 = 0.45;

    /// Spreads the step budget over twice the camera distance to the hole.
    pub fn new(
        camera: &CameraFrame,
        black_hole: Vec3,
        schwarzschild_radius: f32,
        intensity: f32,
        steps: u32,
    ) -> Self {
        let steps = steps.max(1);
        let span = 2.0 * camera.position.distance(black_hole);
        Self {
            black_hole,
            schwarzschild_radius,
            intensity,
            steps,
            step_size: (span / steps as f32).max(1e-3),
            influence_radius: Self::DEFAULT_INFLUENCE_RADIUS,
        }
    }
}

/// Acceleration-like bend toward the hole, `rs^2 / d^3` along the inward
/// direction. Zero inside `1.1 * rs`.
pub fn calculate_deflection(point: Vec3, black_hole: Vec3, schwarzschild_radius: f32) -> Vec3 {
    let to_hole = black_hole - point;
    let distance = to_hole.length();
    if distance < SINGULARITY_GUARD * schwarzschild_radius || distance <= f32::EPSILON {
        return Vec3::ZERO;
    }
    let magnitude = schwarzschild_radius * schwarzschild_radius / (distance * distance * distance);
    to_hole / distance * magnitude
}

/// Projects the hole with the pinhole shortcut `uv = 0.5 + 0.5 * (x/-z, -y/-z)`.
///
/// Field of view and aspect are ignored. Returns `None` when the hole is
/// behind the camera.
pub fn project_black_hole(camera: &CameraFrame, black_hole: Vec3) -> Option<Vec2> {
    let view = camera.to_view_space(black_hole);
    if view.z > -1e-4 {
        return None;
    }
    let depth = -view.z;
    Some(Vec2::new(
        0.5 + 0.5 * view.x / depth,
        0.5 - 0.5 * view.y / depth,
    ))
}

/// Screen-space radius of the horizon under the same pinhole shortcut.
pub fn projected_horizon_radius(camera: &CameraFrame, params: &LensingParams) -> f32 {
    let depth = -camera.to_view_space(params.black_hole).z;
    if depth <= 1e-4 {
        return 0.0;
    }
    0.5 * params.schwarzschild_radius / depth
}

/// Marches a ray from `origin` along the unit vector `direction` and returns
/// the final direction after bending.
pub fn trace_ray(origin: Vec3, direction: Vec3, params: &LensingParams) -> Vec3 {
    let rs = params.schwarzschild_radius;
    let mut position = origin;
    let mut direction = direction;
    for _ in 0..params.steps {
        let to_hole = params.black_hole - position;
        let impact = direction.cross(to_hole).length();
        let amplification = rs / impact.max(0.5 * rs).max(f32::EPSILON);
        let deflection = calculate_deflection(position, params.black_hole, rs) * amplification;
        let bend = deflection * params.intensity * params.step_size;
        if bend != Vec3::ZERO {
            direction = (direction + bend).try_normalize().unwrap_or(direction);
        }
        position += direction * params.step_size;
    }
    direction
}

/// Shades one output pixel of the lensing pass.
pub fn shade_pixel<T: SceneTexture + ?Sized>(
    uv: Vec2,
    camera: &CameraFrame,
    params: &LensingParams,
    scene: &T,
) -> Vec3 {
    let Some(hole_uv) = project_black_hole(camera, params.black_hole) else {
        return scene.sample(uv);
    };
    let screen_distance = (uv - hole_uv).length();
    if screen_distance > params.influence_radius || params.influence_radius <= 0.0 {
        return scene.sample(uv);
    }

    let initial = camera.ray_direction(uv);
    let bent = trace_ray(camera.position, initial, params);
    let change = bent - initial;
    let distorted = uv + Vec2::new(change.dot(camera.right), -change.dot(camera.up)) * 0.5;

    let falloff = 1.0 - screen_distance / params.influence_radius;
    let strength = falloff * falloff * (3.0 - 2.0 * falloff);
    let sample_uv = uv.lerp(distorted, strength).clamp(Vec2::ZERO, Vec2::ONE);
    let color = scene.sample(sample_uv);

    let horizon = projected_horizon_radius(camera, params);
    if horizon > 0.0 {
        let shade = ((screen_distance - 0.9 * horizon) / (0.6 * horizon)).clamp(0.0, 1.0);
        color * shade
    } else {
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraFrame {
        CameraFrame::looking_at(Vec3::new(0.0, 2.0, 20.0), Vec3::ZERO, 1.0, 1.5)
    }

    fn gradient(uv: Vec2) -> Vec3 {
        Vec3::new(uv.x, uv.y, 0.5)
    }

    #[test]
    fn deflection_vanishes_near_singularity() {
        let rs = 1.0;
        assert_eq!(calculate_deflection(Vec3::ZERO, Vec3::ZERO, rs), Vec3::ZERO);
        assert_eq!(
            calculate_deflection(Vec3::new(1.05, 0.0, 0.0), Vec3::ZERO, rs),
            Vec3::ZERO
        );
        let outside = calculate_deflection(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, rs);
        assert!((outside - Vec3::new(-0.125, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn deflection_points_inward_and_decays() {
        let near = calculate_deflection(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 1.0);
        let far = calculate_deflection(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, 1.0);
        assert!(near.z < 0.0);
        assert!(near.length() > far.length());
    }

    #[test]
    fn hole_projects_near_screen_centre() {
        let uv = project_black_hole(&camera(), Vec3::ZERO).unwrap();
        assert!((uv - Vec2::splat(0.5)).length() < 1e-4);
        let behind = CameraFrame::looking_at(Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, 40.0), 1.0, 1.0);
        assert!(project_black_hole(&behind, Vec3::ZERO).is_none());
    }

    #[test]
    fn zero_intensity_leaves_outer_pixels_untouched() {
        let camera = camera();
        let params = LensingParams::new(&camera, Vec3::ZERO, 1.0, 0.0, 48);
        let uv = Vec2::new(0.3, 0.6);
        assert_eq!(shade_pixel(uv, &camera, &params, &gradient), gradient(uv));
    }

    #[test]
    fn pixels_outside_influence_pass_through() {
        let camera = camera();
        let params = LensingParams::new(&camera, Vec3::ZERO, 1.0, 2.0, 48);
        let uv = Vec2::new(0.02, 0.98);
        assert_eq!(shade_pixel(uv, &camera, &params, &gradient), gradient(uv));
    }

    #[test]
    fn intensity_bends_nearby_pixels() {
        let camera = camera();
        let params = LensingParams::new(&camera, Vec3::ZERO, 1.0, 2.0, 48);
        let uv = Vec2::new(0.6, 0.5);
        let lensed = shade_pixel(uv, &camera, &params, &gradient);
        assert!(lensed.is_finite());
        assert_ne!(lensed, gradient(uv));
    }

    #[test]
    fn ray_through_the_hole_stays_finite() {
        let camera = camera();
        let params = LensingParams::new(&camera, Vec3::ZERO, 1.0, 2.0, 16);
        let direction = trace_ray(camera.position, camera.forward, &params);
        assert!(direction.is_finite());
        assert!((direction.length() - 1.0).abs() < 1e-4);
        let centre = shade_pixel(Vec2::splat(0.5), &camera, &params, &gradient);
        assert!(centre.is_finite());
        assert_eq!(centre, Vec3::ZERO);
    }
}
