//! Frame-time observer that sheds particles when the frame rate collapses.
//!
//! The governor watches a rolling window of frame durations. A long enough run
//! of slow frames triggers a particle reduction sized by how far the rolling
//! average sits above the target frame time. Recovery only flips the state
//! back; particles are never added back automatically.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::config::MIN_PARTICLES;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorSettings {
    pub window_size: usize,
    pub slow_frame_streak: u32,
    pub slow_frame_threshold: Duration,
    pub target_frame_time: Duration,
    pub particle_floor: u32,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            window_size: 60,
            slow_frame_streak: 30,
            slow_frame_threshold: Duration::from_millis(50),
            target_frame_time: Duration::from_micros(16_670),
            particle_floor: MIN_PARTICLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernorState {
    Nominal,
    Degraded,
}

/// Size of a particle reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionTier {
    Mild,
    Moderate,
    Aggressive,
}

impl ReductionTier {
    /// Picks the tier for `average / target`.
    pub fn for_ratio(ratio: f32) -> Self {
        if ratio <= 1.5 {
            ReductionTier::Mild
        } else if ratio <= 2.5 {
            ReductionTier::Moderate
        } else {
            ReductionTier::Aggressive
        }
    }

    /// Fraction of the particle count removed.
    pub fn fraction(self) -> f32 {
        match self {
            ReductionTier::Mild => 0.10,
            ReductionTier::Moderate => 0.25,
            ReductionTier::Aggressive => 0.50,
        }
    }

    pub fn apply(self, count: u32, floor: u32) -> u32 {
        let reduced = (count as f32 * (1.0 - self.fraction())).floor() as u32;
        reduced.max(floor).min(count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorEvent {
    Reduced {
        from: u32,
        to: u32,
        tier: ReductionTier,
    },
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PerformanceStats {
    pub average_frame_ms: f32,
    pub min_frame_ms: f32,
    pub max_frame_ms: f32,
    pub fps: f32,
    pub degraded: bool,
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct PerformanceGovernor {
    settings: GovernorSettings,
    samples: VecDeque<f32>,
    total_ms: f32,
    slow_streak: u32,
    state: GovernorState,
}

impl Default for PerformanceGovernor {
    fn default() -> Self {
        Self::new(GovernorSettings::default())
    }
}

impl PerformanceGovernor {
    pub fn new(settings: GovernorSettings) -> Self {
        let settings = GovernorSettings {
            window_size: settings.window_size.max(1),
            slow_frame_streak: settings.slow_frame_streak.max(1),
            ..settings
        };
        Self {
            samples: VecDeque::with_capacity(settings.window_size),
            settings,
            total_ms: 0.0,
            slow_streak: 0,
            state: GovernorState::Nominal,
        }
    }

    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    pub fn state(&self) -> GovernorState {
        self.state
    }

    pub fn slow_streak(&self) -> u32 {
        self.slow_streak
    }

    /// Records one frame and returns what, if anything, changed.
    ///
    /// `particle_count` is the count currently being simulated; a
    /// [`GovernorEvent::Reduced`] carries the count the caller should switch to.
    pub fn record_frame(&mut self, frame: Duration, particle_count: u32) -> Option<GovernorEvent> {
        let frame_ms = frame.as_secs_f32() * 1000.0;
        if !frame_ms.is_finite() {
            return None;
        }
        self.samples.push_back(frame_ms);
        self.total_ms += frame_ms;
        while self.samples.len() > self.settings.window_size {
            if let Some(old) = self.samples.pop_front() {
                self.total_ms -= old;
            }
        }

        let threshold_ms = self.settings.slow_frame_threshold.as_secs_f32() * 1000.0;
        if frame_ms > threshold_ms {
            self.slow_streak += 1;
        } else {
            self.slow_streak = 0;
        }

        let average = self.average_ms();
        let target_ms = self.settings.target_frame_time.as_secs_f32() * 1000.0;

        if self.slow_streak >= self.settings.slow_frame_streak {
            self.slow_streak = 0;
            self.state = GovernorState::Degraded;
            let tier = ReductionTier::for_ratio(average / target_ms.max(f32::EPSILON));
            let to = tier.apply(particle_count, self.settings.particle_floor);
            tracing::warn!(
                average_ms = average,
                from = particle_count,
                to,
                ?tier,
                "frame time over budget; reducing particles"
            );
            return Some(GovernorEvent::Reduced {
                from: particle_count,
                to,
                tier,
            });
        }

        if self.state == GovernorState::Degraded && self.slow_streak == 0 && average < target_ms {
            self.state = GovernorState::Nominal;
            tracing::info!(average_ms = average, "frame time back within target");
            return Some(GovernorEvent::Recovered);
        }
        None
    }

    pub fn stats(&self) -> PerformanceStats {
        if self.samples.is_empty() {
            return PerformanceStats {
                degraded: self.state == GovernorState::Degraded,
                ..PerformanceStats::default()
            };
        }
        let average = self.average_ms();
        let (min, max) = self
            .samples
            .iter()
            .fold((f32::INFINITY, 0.0f32), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        PerformanceStats {
            average_frame_ms: average,
            min_frame_ms: min,
            max_frame_ms: max,
            fps: if average > 0.0 { 1000.0 / average } else { 0.0 },
            degraded: self.state == GovernorState::Degraded,
            samples: self.samples.len(),
        }
    }

    /// Forgets all samples and returns to `Nominal`.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.total_ms = 0.0;
        self.slow_streak = 0;
        self.state = GovernorState::Nominal;
    }

    fn average_ms(&self) -> f32 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.total_ms / self.samples.len() as f32
        }
    }
}
