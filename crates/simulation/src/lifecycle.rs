//! Device health tracking and the retry budget for re-acquiring a lost device.

use serde::Serialize;

pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Health of the GPU device behind the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DeviceLifecycle {
    Active,
    /// Device is gone; `attempts` counts failed re-acquisitions so far.
    Lost { attempts: u32 },
    /// Retry budget exhausted. Terminal.
    Failed,
}

impl DeviceLifecycle {
    pub fn is_active(self) -> bool {
        matches!(self, DeviceLifecycle::Active)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, DeviceLifecycle::Failed)
    }

    /// State after the device reports loss. `Failed` stays failed.
    pub fn lost(self) -> Self {
        match self {
            DeviceLifecycle::Active => DeviceLifecycle::Lost { attempts: 0 },
            other => other,
        }
    }

    /// State after a failed re-acquisition.
    pub fn retry_failed(self, budget: u32) -> Self {
        match self {
            DeviceLifecycle::Lost { attempts } if attempts + 1 >= budget => DeviceLifecycle::Failed,
            DeviceLifecycle::Lost { attempts } => DeviceLifecycle::Lost {
                attempts: attempts + 1,
            },
            other => other,
        }
    }
}
