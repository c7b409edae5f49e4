//! Seeded background stars on a distant shell, with per-star twinkle.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::vector;

pub const SHELL_INNER: f32 = 80.0;
pub const SHELL_OUTER: f32 = 100.0;
pub const DEFAULT_STAR_COUNT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub position: Vec3,
    pub brightness: f32,
    pub twinkle_speed: f32,
    pub phase: f32,
}

impl Star {
    /// Twinkled brightness, always within `[0.4 * base, base]`.
    pub fn brightness_at(&self, time: f32) -> f32 {
        self.brightness * (0.7 + 0.3 * (time * self.twinkle_speed + self.phase).sin())
    }
}

/// Background stars on a distant shell. Generated once and never mutated.
#[derive(Debug, Clone)]
pub struct Starfield {
    stars: Vec<Star>,
}

impl Starfield {
    pub fn new(count: usize) -> Self {
        Self::generate(count, &mut StdRng::from_entropy())
    }

    pub fn with_seed(count: usize, seed: u64) -> Self {
        Self::generate(count, &mut StdRng::seed_from_u64(seed))
    }

    fn generate(count: usize, rng: &mut StdRng) -> Self {
        let stars = (0..count)
            .map(|_| {
                let radius = rng.gen_range(SHELL_INNER..SHELL_OUTER);
                Star {
                    position: vector::sphere_point(radius, rng.gen(), rng.gen()),
                    brightness: rng.gen_range(0.3..1.0),
                    twinkle_speed: rng.gen_range(0.5..2.0),
                    phase: rng.gen_range(0.0..std::f32::consts::TAU),
                }
            })
            .collect();
        Self { stars }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}
