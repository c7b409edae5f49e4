//! Per-component shader clocks, each reset independently.

use serde::Serialize;

/// Components whose shaders read an elapsed-time uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderComponent {
    Disk,
    Horizon,
    Particles,
    Starfield,
    Lensing,
}

impl ShaderComponent {
    pub const ALL: [ShaderComponent; 5] = [
        ShaderComponent::Disk,
        ShaderComponent::Horizon,
        ShaderComponent::Particles,
        ShaderComponent::Starfield,
        ShaderComponent::Lensing,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Elapsed shader time per component.
///
/// Times only move forward. They go back to zero when the component's
/// device resources are re-acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShaderTimeState {
    times: [f32; 5],
}

impl ShaderTimeState {
    /// Adds `delta_time` to every component; negative or non-finite deltas are ignored.
    pub fn advance(&mut self, delta_time: f32) {
        if !(delta_time.is_finite() && delta_time > 0.0) {
            return;
        }
        for time in &mut self.times {
            *time += delta_time;
        }
    }

    pub fn get(&self, component: ShaderComponent) -> f32 {
        self.times[component.slot()]
    }

    pub fn reset(&mut self, component: ShaderComponent) {
        self.times[component.slot()] = 0.0;
    }

    pub fn reset_all(&mut self) {
        self.times = [0.0; 5];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_ignores_bad_deltas() {
        let mut times = ShaderTimeState::default();
        times.advance(0.5);
        times.advance(-1.0);
        times.advance(f32::NAN);
        times.advance(f32::INFINITY);
        for component in ShaderComponent::ALL {
            assert_eq!(times.get(component), 0.5);
        }
    }

    #[test]
    fn reset_is_per_component() {
        let mut times = ShaderTimeState::default();
        times.advance(2.0);
        times.reset(ShaderComponent::Lensing);
        assert_eq!(times.get(ShaderComponent::Lensing), 0.0);
        assert_eq!(times.get(ShaderComponent::Disk), 2.0);
        times.reset_all();
        assert_eq!(times, ShaderTimeState::default());
    }
}
