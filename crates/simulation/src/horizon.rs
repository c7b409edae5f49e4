//! Event-horizon shading: a near-black sphere with a pulsing rim glow.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonShading {
    pub radius: f32,
    pub glow_color: Vec3,
    pub glow_intensity: f32,
}

impl HorizonShading {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            glow_color: Vec3::new(1.0, 0.55, 0.2),
            glow_intensity: 1.2,
        }
    }

    /// Rim factor `(1 - |view . normal|)^3`.
    pub fn fresnel(view_dir: Vec3, normal: Vec3) -> f32 {
        let facing = view_dir
            .normalize_or_zero()
            .dot(normal.normalize_or_zero())
            .abs()
            .min(1.0);
        (1.0 - facing).powi(3)
    }

    pub fn shade_fragment(&self, view_dir: Vec3, normal: Vec3, time: f32) -> Vec3 {
        let fresnel = Self::fresnel(view_dir, normal);
        let base = Vec3::splat(0.05 + 0.02 * (0.5 * time).sin());
        let glow = self.glow_color * fresnel * self.glow_intensity;
        let pulse = 0.8 + 0.2 * (2.0 * time).sin();
        base + glow + 0.3 * glow * pulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_is_dark_and_rim_glows() {
        let shading = HorizonShading::new(1.0);
        let centre = shading.shade_fragment(Vec3::Z, Vec3::Z, 0.0);
        assert_eq!(centre, Vec3::splat(0.05));
        let rim = shading.shade_fragment(Vec3::Z, Vec3::X, 0.0);
        assert!(rim.x > 1.0);
        assert!(rim.x > rim.z);
    }

    #[test]
    fn fresnel_is_bounded() {
        for normal in [Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0), -Vec3::Z] {
            let f = HorizonShading::fresnel(Vec3::Z, normal);
            assert!((0.0..=1.0).contains(&f));
        }
    }
}
