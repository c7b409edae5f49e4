//! Orbit camera around the black hole.

use glam::{Mat4, Vec2, Vec3};

/// Radians of rotation per pixel of pointer drag at sensitivity 1.0.
pub const ROTATE_RADIANS_PER_PIXEL: f32 = 0.005;
pub const MIN_POLAR: f32 = 0.05;
pub const MAX_POLAR: f32 = std::f32::consts::PI - 0.05;

/// Position and orientation of a camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
}

impl CameraFrame {
    /// Frame at `position` looking at `target` with world +Y as up.
    ///
    /// Degenerate input (camera on the target or looking straight down the
    /// Y axis) falls back to a basis built around -Z / +X.
    pub fn looking_at(position: Vec3, target: Vec3, fov_y: f32, aspect: f32) -> Self {
        let forward = (target - position).try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        Self {
            position,
            forward,
            right,
            up,
            fov_y,
            aspect,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Coordinates of `point` in camera space (camera looks down -Z).
    pub fn to_view_space(&self, point: Vec3) -> Vec3 {
        let relative = point - self.position;
        Vec3::new(
            relative.dot(self.right),
            relative.dot(self.up),
            -relative.dot(self.forward),
        )
    }

    /// World-space ray direction through texture coordinate `uv`
    /// (origin top-left, y down).
    pub fn ray_direction(&self, uv: Vec2) -> Vec3 {
        let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
        let half_height = (self.fov_y * 0.5).tan();
        let half_width = half_height * self.aspect;
        (self.forward + self.right * ndc.x * half_width + self.up * ndc.y * half_height)
            .normalize()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    polar: f32,
    azimuth: f32,
}

/// Rotate/zoom controls with exponential damping toward a goal orientation.
///
/// Only the eye position leaves the camera; the engine pairs it with its own
/// field of view and the surface aspect when it builds a [`CameraFrame`].
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Rate of the exponential approach toward the goal, per second.
    pub damping: f32,
    sensitivity: f32,
    current: Spherical,
    goal: Spherical,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let start = Spherical {
            radius: 20.0,
            polar: 1.25,
            azimuth: 0.0,
        };
        Self {
            target: Vec3::ZERO,
            min_distance: 3.0,
            max_distance: 60.0,
            damping: 8.0,
            sensitivity: 1.0,
            current: start,
            goal: start,
        }
    }
}

impl OrbitCamera {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            ..Self::default()
        }
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Accumulates a pointer drag. Dragging right orbits the camera left.
    pub fn rotate_by_pixels(&mut self, delta_x: f32, delta_y: f32) {
        let scale = ROTATE_RADIANS_PER_PIXEL * self.sensitivity;
        self.goal.azimuth -= delta_x * scale;
        self.goal.polar = (self.goal.polar - delta_y * scale).clamp(MIN_POLAR, MAX_POLAR);
    }

    /// Multiplies the goal distance by `factor`; values below 1 move closer.
    pub fn zoom(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        self.goal.radius = (self.goal.radius * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Mouse-wheel helper; positive lines zoom in.
    pub fn zoom_by_wheel(&mut self, lines: f32) {
        self.zoom((1.0 - 0.1 * self.sensitivity).powf(lines));
    }

    /// Moves the current orientation toward the goal.
    pub fn update(&mut self, delta_time: f32) {
        if !(delta_time.is_finite() && delta_time > 0.0) {
            return;
        }
        let t = 1.0 - (-self.damping * delta_time).exp();
        self.current.radius += (self.goal.radius - self.current.radius) * t;
        self.current.polar += (self.goal.polar - self.current.polar) * t;
        self.current.azimuth += (self.goal.azimuth - self.current.azimuth) * t;
    }

    pub fn distance(&self) -> f32 {
        self.current.radius
    }

    pub fn polar(&self) -> f32 {
        self.current.polar
    }

    pub fn position(&self) -> Vec3 {
        let Spherical {
            radius,
            polar,
            azimuth,
        } = self.current;
        let (sin_polar, cos_polar) = polar.sin_cos();
        self.target
            + Vec3::new(
                radius * sin_polar * azimuth.cos(),
                radius * cos_polar,
                radius * sin_polar * azimuth.sin(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(camera: &mut OrbitCamera) {
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate_by_pixels(0.0, 1.0e6);
        settle(&mut camera);
        assert!((camera.polar() - MIN_POLAR).abs() < 1e-4);
        camera.rotate_by_pixels(0.0, -1.0e6);
        settle(&mut camera);
        assert!((camera.polar() - MAX_POLAR).abs() < 1e-4);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = OrbitCamera::default();
        camera.zoom(0.0001);
        settle(&mut camera);
        assert!((camera.distance() - 3.0).abs() < 1e-3);
        camera.zoom(1.0e6);
        settle(&mut camera);
        assert!((camera.distance() - 60.0).abs() < 1e-3);
        camera.zoom(f32::NAN);
        settle(&mut camera);
        assert!((camera.distance() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn sensitivity_scales_rotation() {
        let mut slow = OrbitCamera::new(0.5);
        let mut fast = OrbitCamera::new(2.0);
        slow.rotate_by_pixels(0.0, 40.0);
        fast.rotate_by_pixels(0.0, 40.0);
        settle(&mut slow);
        settle(&mut fast);
        let start = OrbitCamera::default().polar();
        let slow_delta = (start - slow.polar()).abs();
        let fast_delta = (start - fast.polar()).abs();
        assert!((fast_delta / slow_delta - 4.0).abs() < 1e-3);
    }

    #[test]
    fn damping_approaches_goal_gradually() {
        let mut camera = OrbitCamera::default();
        camera.zoom(0.5);
        camera.update(1.0 / 60.0);
        assert!(camera.distance() < 20.0 && camera.distance() > 10.0);
    }

    #[test]
    fn frame_projects_target_to_centre() {
        let camera = OrbitCamera::default();
        let frame =
            CameraFrame::looking_at(camera.position(), camera.target, 60f32.to_radians(), 16.0 / 9.0);
        let view = frame.to_view_space(Vec3::ZERO);
        assert!(view.x.abs() < 1e-4 && view.y.abs() < 1e-4);
        assert!(view.z < 0.0);
        let centre_ray = frame.ray_direction(Vec2::splat(0.5));
        assert!((centre_ray - frame.forward).length() < 1e-5);
    }
}
