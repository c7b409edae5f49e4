//! Bloom parameters and the bright-pass/blur weights used by `bloom.wgsl`.

use glam::Vec3;

use crate::config::SimulationConfig;

/// Rec. 709 luma weights.
pub const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// One side of the 9-tap separable Gaussian, centre tap first.
pub const BLUR_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    /// Multiplier on the blurred highlights when composited.
    pub strength: f32,
    /// Luminance at which pixels start to bloom.
    pub threshold: f32,
    /// Relative width of the smooth knee around `threshold`.
    pub soft_threshold: f32,
    /// Spread of each blur tap in bloom-target pixels.
    pub radius: f32,
    /// Horizontal + vertical blur rounds.
    pub blur_iterations: u32,
    /// Bloom target size relative to the surface.
    pub resolution_scale: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 1.5,
            threshold: 0.7,
            soft_threshold: 0.5,
            radius: 1.0,
            blur_iterations: 3,
            resolution_scale: 1.0,
        }
    }
}

impl BloomSettings {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            strength: config.bloom_strength,
            resolution_scale: config.performance_mode.bloom_resolution_scale(),
            ..Self::default()
        }
    }

    /// Bloom is skipped entirely at zero strength.
    pub fn is_enabled(&self) -> bool {
        self.strength > 0.0
    }

    /// Size of the bloom targets for a surface of `width x height`.
    pub fn target_extent(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.resolution_scale).floor() as u32).max(1);
        (scale(width), scale(height))
    }

    /// Fraction of `color` that survives the bright pass.
    pub fn bright_pass_weight(&self, color: Vec3) -> f32 {
        let brightness = color.dot(LUMA);
        let knee = self.threshold * self.soft_threshold;
        smoothstep(self.threshold - knee, self.threshold + knee, brightness)
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerformanceMode;

    #[test]
    fn blur_weights_sum_to_one() {
        let total = BLUR_WEIGHTS[0] + 2.0 * BLUR_WEIGHTS[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn performance_mode_shrinks_targets() {
        let config = SimulationConfig {
            performance_mode: PerformanceMode::Low,
            ..SimulationConfig::default()
        };
        let settings = BloomSettings::from_config(&config);
        assert_eq!(settings.target_extent(1920, 1080), (480, 270));
        assert_eq!(settings.target_extent(2, 2), (1, 1));
        assert_eq!(settings.strength, 1.5);
    }

    #[test]
    fn bright_pass_keeps_highlights_only() {
        let settings = BloomSettings::default();
        assert_eq!(settings.bright_pass_weight(Vec3::splat(0.1)), 0.0);
        assert_eq!(settings.bright_pass_weight(Vec3::splat(2.0)), 1.0);
        let mid = settings.bright_pass_weight(Vec3::splat(0.7));
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn zero_strength_disables_bloom() {
        let config = SimulationConfig {
            bloom_strength: 0.0,
            ..SimulationConfig::default()
        };
        assert!(!BloomSettings::from_config(&config).is_enabled());
    }
}
