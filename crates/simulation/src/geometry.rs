//! Radii of the event horizon, accretion disk and particle spawn shell.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("{name} must be positive and finite (got {value})")]
    NonPositive { name: &'static str, value: f32 },
    #[error("radii must satisfy horizon < disk inner < disk outer <= spawn (got {horizon}, {inner}, {outer}, {spawn})")]
    Ordering {
        horizon: f32,
        inner: f32,
        outer: f32,
        spawn: f32,
    },
}

/// Fixed shape of the black hole and its surroundings.
///
/// The hole sits at the world origin. The Schwarzschild radius used by the
/// lensing pass is the event-horizon radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackHoleGeometry {
    pub event_horizon_radius: f32,
    pub disk_inner_radius: f32,
    pub disk_outer_radius: f32,
    pub spawn_radius: f32,
}

impl Default for BlackHoleGeometry {
    fn default() -> Self {
        Self {
            event_horizon_radius: 1.0,
            disk_inner_radius: 1.5,
            disk_outer_radius: 6.0,
            spawn_radius: 8.0,
        }
    }
}

impl BlackHoleGeometry {
    pub const CENTER: Vec3 = Vec3::ZERO;

    /// Builds a geometry after checking that the radii nest correctly.
    pub fn new(
        event_horizon_radius: f32,
        disk_inner_radius: f32,
        disk_outer_radius: f32,
        spawn_radius: f32,
    ) -> Result<Self, GeometryError> {
        let geometry = Self {
            event_horizon_radius,
            disk_inner_radius,
            disk_outer_radius,
            spawn_radius,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        for (name, value) in [
            ("event_horizon_radius", self.event_horizon_radius),
            ("disk_inner_radius", self.disk_inner_radius),
            ("disk_outer_radius", self.disk_outer_radius),
            ("spawn_radius", self.spawn_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeometryError::NonPositive { name, value });
            }
        }
        let ordered = self.event_horizon_radius < self.disk_inner_radius
            && self.disk_inner_radius < self.disk_outer_radius
            && self.disk_outer_radius <= self.spawn_radius;
        if !ordered {
            return Err(GeometryError::Ordering {
                horizon: self.event_horizon_radius,
                inner: self.disk_inner_radius,
                outer: self.disk_outer_radius,
                spawn: self.spawn_radius,
            });
        }
        Ok(())
    }

    pub fn center(&self) -> Vec3 {
        Self::CENTER
    }

    pub fn schwarzschild_radius(&self) -> f32 {
        self.event_horizon_radius
    }

    /// Position of `r` across the disk annulus, `0` at the inner edge and `1`
    /// at the outer edge. Values outside the annulus are clamped.
    pub fn normalized_disk_radius(&self, r: f32) -> f32 {
        let span = self.disk_outer_radius - self.disk_inner_radius;
        ((r - self.disk_inner_radius) / span).clamp(0.0, 1.0)
    }
}
