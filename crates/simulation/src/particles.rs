//! Particle buffers and the per-frame gravity integrator.
//!
//! Positions, velocities, colors and sizes live in four parallel buffers so the
//! renderer can upload each one as its own instance stream. Nothing here
//! allocates after construction except [`ParticleField::set_particle_count`].

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{MAX_PARTICLES, MIN_PARTICLES};
use crate::geometry::BlackHoleGeometry;
use crate::vector::{self, DISK_NORMAL};

/// Gravitational constant of the toy model.
pub const GRAVITY: f32 = 5.0;
/// Mass of the black hole in the toy model.
pub const BLACK_HOLE_MASS: f32 = 10.0;
/// Numerator of the tangential swirl acceleration (`SPIRAL_STRENGTH / distance`).
pub const SPIRAL_STRENGTH: f32 = 0.5;
/// Below this raw tangent length the swirl term is skipped.
pub const TANGENT_EPSILON: f32 = 0.001;
/// Thickness of the spawn shell beyond the spawn radius.
pub const SPAWN_SHELL_THICKNESS: f32 = 2.0;
/// Half-width of the uniform velocity jitter given to fresh particles.
pub const SPAWN_VELOCITY_JITTER: f32 = 0.05;

pub const BASE_COLOR: Vec3 = Vec3::new(0.8, 0.6, 0.4);
pub const HOT_TINT: Vec3 = Vec3::new(0.2, 0.3, 0.6);
pub const DISK_GLOW: Vec3 = Vec3::new(1.0, 0.5, 0.1);
const DISK_GLOW_STRENGTH: f32 = 0.3;
const DISK_GLOW_HALF_HEIGHT: f32 = 1.0;
/// Speed at which a particle reaches the full hot tint.
const FULL_HEAT_SPEED: f32 = 10.0;

/// Uniform point on the spawn shell `[spawn_radius, spawn_radius + 2]`.
pub fn sample_spawn_position<R: Rng + ?Sized>(rng: &mut R, spawn_radius: f32) -> Vec3 {
    let radius = spawn_radius + rng.gen_range(0.0..SPAWN_SHELL_THICKNESS);
    vector::sphere_point(radius, rng.gen::<f32>(), rng.gen::<f32>())
}

/// Aggregate numbers over the field, used by logs and the headless runner.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FieldSummary {
    pub count: usize,
    pub min_distance: f32,
    pub max_distance: f32,
    pub mean_speed: f32,
}

pub struct ParticleField {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    colors: Vec<Vec3>,
    sizes: Vec<f32>,
    geometry: BlackHoleGeometry,
    rng: StdRng,
    respawned: u64,
}

impl ParticleField {
    /// Allocates `count` particles (clamped to the supported range) seeded from entropy.
    pub fn new(count: u32, geometry: BlackHoleGeometry) -> Self {
        Self::with_rng(count, geometry, StdRng::from_entropy())
    }

    /// Same as [`ParticleField::new`] with a fixed seed.
    pub fn with_seed(count: u32, geometry: BlackHoleGeometry, seed: u64) -> Self {
        Self::with_rng(count, geometry, StdRng::seed_from_u64(seed))
    }

    fn with_rng(count: u32, geometry: BlackHoleGeometry, rng: StdRng) -> Self {
        let count = clamp_count(count);
        let mut field = Self {
            positions: vec![Vec3::ZERO; count],
            velocities: vec![Vec3::ZERO; count],
            colors: vec![BASE_COLOR; count],
            sizes: vec![0.0; count],
            geometry,
            rng,
            respawned: 0,
        };
        for index in 0..count {
            field.reset_particle(index);
        }
        field.respawned = 0;
        field
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn geometry(&self) -> &BlackHoleGeometry {
        &self.geometry
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    /// Particles respawned by `update` since construction.
    pub fn respawn_count(&self) -> u64 {
        self.respawned
    }

    /// Places particle `index` back on the spawn shell with fresh attributes.
    ///
    /// Panics when `index` is out of range.
    pub fn reset_particle(&mut self, index: usize) {
        let position = sample_spawn_position(&mut self.rng, self.geometry.spawn_radius);
        let jitter = SPAWN_VELOCITY_JITTER;
        let velocity = Vec3::new(
            self.rng.gen_range(-jitter..jitter),
            self.rng.gen_range(-jitter..jitter),
            self.rng.gen_range(-jitter..jitter),
        );
        self.positions[index] = position;
        self.velocities[index] = velocity;
        self.colors[index] = BASE_COLOR;
        self.sizes[index] = self.rng.gen_range(2.0..4.0);
    }

    /// Advances every particle by `delta_time` seconds.
    ///
    /// Negative or non-finite deltas leave the field untouched. On return every
    /// particle is at least one horizon radius away from `black_hole`.
    pub fn update(&mut self, delta_time: f32, black_hole: Vec3) {
        if !(delta_time.is_finite() && delta_time >= 0.0) {
            return;
        }
        let horizon = self.geometry.event_horizon_radius;
        for index in 0..self.positions.len() {
            let position = self.positions[index];
            let to_hole = black_hole - position;
            let distance = to_hole.length();
            if distance < horizon || !distance.is_finite() {
                self.respawn(index);
                continue;
            }

            let inward = to_hole / distance;
            let pull = GRAVITY * BLACK_HOLE_MASS / (distance * distance);
            let mut velocity = self.velocities[index] + inward * pull * delta_time;
            if let Some(tangent) = vector::swirl_tangent(inward, DISK_NORMAL, TANGENT_EPSILON) {
                velocity += tangent * (SPIRAL_STRENGTH / distance) * delta_time;
            }
            let next = position + velocity * delta_time;

            let escaped_numerics = !vector::is_finite(next) || !vector::is_finite(velocity);
            if escaped_numerics || (next - black_hole).length() < horizon {
                self.respawn(index);
                continue;
            }

            self.positions[index] = next;
            self.velocities[index] = velocity;
            self.colors[index] = self.shade(next - black_hole, velocity.length());
        }
    }

    /// Grows or shrinks the field, keeping the surviving prefix untouched.
    pub fn set_particle_count(&mut self, count: u32) {
        let count = clamp_count(count);
        let previous = self.len();
        if count == previous {
            return;
        }
        self.positions.resize(count, Vec3::ZERO);
        self.velocities.resize(count, Vec3::ZERO);
        self.colors.resize(count, BASE_COLOR);
        self.sizes.resize(count, 0.0);
        for index in previous..count {
            self.reset_particle(index);
        }
        tracing::debug!(previous, count, "resized particle field");
    }

    pub fn summary(&self) -> FieldSummary {
        let center = self.geometry.center();
        let mut min_distance = f32::INFINITY;
        let mut max_distance = 0.0f32;
        let mut speed_total = 0.0f32;
        for (position, velocity) in self.positions.iter().zip(&self.velocities) {
            let distance = position.distance(center);
            min_distance = min_distance.min(distance);
            max_distance = max_distance.max(distance);
            speed_total += velocity.length();
        }
        let count = self.len();
        FieldSummary {
            count,
            min_distance,
            max_distance,
            mean_speed: if count == 0 {
                0.0
            } else {
                speed_total / count as f32
            },
        }
    }

    fn respawn(&mut self, index: usize) {
        self.reset_particle(index);
        self.respawned += 1;
    }

    fn shade(&self, relative: Vec3, speed: f32) -> Vec3 {
        let heat = (speed / FULL_HEAT_SPEED).min(1.0);
        let mut color = BASE_COLOR.lerp(BASE_COLOR + HOT_TINT, heat);

        let planar = vector::planar_distance(relative);
        let height = vector::height_above_disk(relative).abs();
        let in_annulus = planar >= self.geometry.disk_inner_radius
            && planar <= self.geometry.disk_outer_radius;
        if in_annulus && height < DISK_GLOW_HALF_HEIGHT {
            color += DISK_GLOW * (1.0 - height) * DISK_GLOW_STRENGTH;
        }
        color.clamp(Vec3::ZERO, Vec3::ONE)
    }
}

impl std::fmt::Debug for ParticleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleField")
            .field("len", &self.len())
            .field("geometry", &self.geometry)
            .field("respawned", &self.respawned)
            .finish()
    }
}

fn clamp_count(count: u32) -> usize {
    count.clamp(MIN_PARTICLES, MAX_PARTICLES) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(count: u32, seed: u64) -> ParticleField {
        ParticleField::with_seed(count, BlackHoleGeometry::default(), seed)
    }

    #[test]
    fn spawn_points_cover_the_sphere_uniformly() {
        let mut rng = StdRng::seed_from_u64(7);
        const SAMPLES: usize = 20_000;
        const BINS: usize = 10;
        let mut histogram = [0usize; BINS];
        for _ in 0..SAMPLES {
            let point = sample_spawn_position(&mut rng, 8.0);
            let cos_polar = point.y / point.length();
            let bin = (((cos_polar + 1.0) * 0.5) * BINS as f32) as usize;
            histogram[bin.min(BINS - 1)] += 1;
        }
        let expected = SAMPLES as f32 / BINS as f32;
        for (bin, count) in histogram.iter().enumerate() {
            let deviation = (*count as f32 - expected).abs() / expected;
            assert!(deviation < 0.15, "bin {bin} holds {count} samples");
        }
    }

    #[test]
    fn new_particles_start_on_spawn_shell() {
        let field = field(500, 1);
        assert_eq!(field.len(), 500);
        for (i, position) in field.positions().iter().enumerate() {
            let distance = position.length();
            assert!((8.0 - 1e-4..=10.0 + 1e-4).contains(&distance), "particle {i}");
            assert!((2.0..4.0).contains(&field.sizes()[i]));
            let v = field.velocities()[i];
            assert!(v.abs().max_element() <= SPAWN_VELOCITY_JITTER);
            assert_eq!(field.colors()[i], BASE_COLOR);
        }
    }

    #[test]
    fn count_is_clamped() {
        assert_eq!(field(3, 0).len(), MIN_PARTICLES as usize);
        assert_eq!(field(90_000, 0).len(), MAX_PARTICLES as usize);
    }

    #[test]
    fn resize_preserves_prefix() {
        let mut field = field(400, 3);
        for _ in 0..20 {
            field.update(0.016, Vec3::ZERO);
        }
        let before: Vec<Vec3> = field.positions().to_vec();
        let velocities: Vec<Vec3> = field.velocities().to_vec();
        let colors: Vec<Vec3> = field.colors().to_vec();
        let sizes: Vec<f32> = field.sizes().to_vec();
        let bits = |v: Vec3| v.to_array().map(f32::to_bits);

        field.set_particle_count(700);
        assert_eq!(field.len(), 700);
        for i in 0..400 {
            assert_eq!(bits(field.positions()[i]), bits(before[i]));
            assert_eq!(bits(field.velocities()[i]), bits(velocities[i]));
            assert_eq!(bits(field.colors()[i]), bits(colors[i]));
            assert_eq!(field.sizes()[i].to_bits(), sizes[i].to_bits());
        }
        for position in &field.positions()[400..] {
            assert!(position.length() >= 8.0 - 1e-4);
        }

        field.set_particle_count(150);
        assert_eq!(field.len(), 150);
        assert_eq!(field.colors().len(), 150);
        assert_eq!(field.sizes().len(), 150);
        for i in 0..150 {
            assert_eq!(bits(field.positions()[i]), bits(before[i]));
            assert_eq!(bits(field.velocities()[i]), bits(velocities[i]));
            assert_eq!(bits(field.colors()[i]), bits(colors[i]));
            assert_eq!(field.sizes()[i].to_bits(), sizes[i].to_bits());
        }
    }

    #[test]
    fn particle_inside_horizon_is_respawned() {
        let mut field = field(100, 9);
        field.positions[0] = Vec3::new(0.2, 0.0, 0.0);
        field.velocities[0] = Vec3::splat(4.0);
        field.update(0.016, Vec3::ZERO);
        assert!(field.positions()[0].length() >= 8.0 - 1e-4);
        assert_eq!(field.respawn_count(), 1);
    }

    #[test]
    fn diving_particle_never_ends_inside_horizon() {
        let mut field = field(100, 11);
        // Moving straight at the hole fast enough to land inside in one step.
        field.positions[0] = Vec3::new(1.5, 0.0, 0.0);
        field.velocities[0] = Vec3::new(-60.0, 0.0, 0.0);
        field.update(0.016, Vec3::ZERO);
        assert!(field.positions()[0].length() >= 1.0);
    }

    #[test]
    fn swirl_is_skipped_on_the_axis() {
        let mut field = field(100, 5);
        field.positions[0] = Vec3::new(0.0, 5.0, 0.0);
        field.velocities[0] = Vec3::ZERO;
        field.update(0.01, Vec3::ZERO);
        let v = field.velocities()[0];
        assert_eq!(v.x, 0.0);
        assert_eq!(v.z, 0.0);
        assert!(v.y < 0.0);
    }

    #[test]
    fn invalid_delta_is_ignored() {
        let mut field = field(100, 2);
        let before = field.positions().to_vec();
        field.update(f32::NAN, Vec3::ZERO);
        field.update(-0.5, Vec3::ZERO);
        assert_eq!(field.positions(), before.as_slice());
    }

    #[test]
    fn colors_stay_in_unit_range() {
        let mut field = field(1000, 21);
        for _ in 0..200 {
            field.update(0.016, Vec3::ZERO);
        }
        for color in field.colors() {
            assert!(color.min_element() >= 0.0 && color.max_element() <= 1.0);
        }
    }

    #[test]
    fn disk_plane_particles_pick_up_glow() {
        let field = field(100, 4);
        let in_disk = field.shade(Vec3::new(3.0, 0.0, 0.0), 0.0);
        let above = field.shade(Vec3::new(3.0, 2.0, 0.0), 0.0);
        assert_eq!(above, BASE_COLOR);
        assert!(in_disk.x > above.x && in_disk.y > above.y);
    }
}
