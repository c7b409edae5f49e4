//! Material identities and the outcome of compiling their shaders.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialId {
    Disk,
    Horizon,
    Particles,
    Starfield,
    Lensing,
    Bloom,
}

impl MaterialId {
    pub const ALL: [MaterialId; 6] = [
        MaterialId::Disk,
        MaterialId::Horizon,
        MaterialId::Particles,
        MaterialId::Starfield,
        MaterialId::Lensing,
        MaterialId::Bloom,
    ];

    /// Flat color drawn when the material's shader does not compile.
    pub fn fallback_color(self) -> Vec3 {
        match self {
            MaterialId::Disk => Vec3::new(0.9, 0.45, 0.1),
            MaterialId::Horizon => Vec3::ZERO,
            MaterialId::Particles => Vec3::new(0.8, 0.6, 0.4),
            MaterialId::Starfield => Vec3::splat(0.8),
            MaterialId::Lensing | MaterialId::Bloom => Vec3::ONE,
        }
    }

    /// Fullscreen post passes fall back to a straight copy instead of a flat color.
    pub fn is_post_pass(self) -> bool {
        matches!(self, MaterialId::Lensing | MaterialId::Bloom)
    }

    pub fn label(self) -> &'static str {
        match self {
            MaterialId::Disk => "disk",
            MaterialId::Horizon => "horizon",
            MaterialId::Particles => "particles",
            MaterialId::Starfield => "starfield",
            MaterialId::Lensing => "lensing",
            MaterialId::Bloom => "bloom",
        }
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MaterialStatus {
    Compiled,
    Fallback { reason: String },
}

/// Which materials compiled and which run on their fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterialReport {
    entries: BTreeMap<MaterialId, MaterialStatus>,
}

impl MaterialReport {
    /// Report with every material compiled.
    pub fn all_compiled() -> Self {
        let mut report = Self::default();
        for id in MaterialId::ALL {
            report.mark_compiled(id);
        }
        report
    }

    pub fn mark_compiled(&mut self, id: MaterialId) {
        self.entries.insert(id, MaterialStatus::Compiled);
    }

    pub fn mark_fallback(&mut self, id: MaterialId, reason: impl Into<String>) {
        self.entries.insert(
            id,
            MaterialStatus::Fallback {
                reason: reason.into(),
            },
        );
    }

    pub fn status(&self, id: MaterialId) -> Option<&MaterialStatus> {
        self.entries.get(&id)
    }

    pub fn is_fallback(&self, id: MaterialId) -> bool {
        matches!(self.entries.get(&id), Some(MaterialStatus::Fallback { .. }))
    }

    pub fn fallbacks(&self) -> impl Iterator<Item = (MaterialId, &str)> {
        self.entries.iter().filter_map(|(id, status)| match status {
            MaterialStatus::Fallback { reason } => Some((*id, reason.as_str())),
            MaterialStatus::Compiled => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_fallbacks() {
        let mut report = MaterialReport::all_compiled();
        report.mark_fallback(MaterialId::Lensing, "bad binding");
        assert!(report.is_fallback(MaterialId::Lensing));
        assert!(!report.is_fallback(MaterialId::Disk));
        let fallbacks: Vec<_> = report.fallbacks().collect();
        assert_eq!(fallbacks, vec![(MaterialId::Lensing, "bad binding")]);
        assert!(MaterialId::Lensing.is_post_pass());
        assert!(!MaterialId::Horizon.is_post_pass());
    }
}
