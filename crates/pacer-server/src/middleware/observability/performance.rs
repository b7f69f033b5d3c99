//! Request performance classification.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Upper bound (exclusive) of the [`PerformanceCategory::Fast`] range.
pub const FAST_THRESHOLD_MS: u64 = 100;
/// Upper bound (exclusive) of the [`PerformanceCategory::Normal`] range.
pub const NORMAL_THRESHOLD_MS: u64 = 500;
/// Upper bound (exclusive) of the [`PerformanceCategory::Slow`] range.
pub const SLOW_THRESHOLD_MS: u64 = 1000;

/// Coarse latency bucket for a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, AsRefStr, IntoStaticStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PerformanceCategory {
    /// Under 100ms.
    Fast,
    /// 100ms up to 500ms.
    Normal,
    /// 500ms up to one second.
    Slow,
    /// One second or more.
    VerySlow,
}

impl PerformanceCategory {
    /// Classifies an elapsed duration in milliseconds.
    #[must_use]
    pub const fn from_elapsed_ms(elapsed_ms: u64) -> Self {
        if elapsed_ms < FAST_THRESHOLD_MS {
            Self::Fast
        } else if elapsed_ms < NORMAL_THRESHOLD_MS {
            Self::Normal
        } else if elapsed_ms < SLOW_THRESHOLD_MS {
            Self::Slow
        } else {
            Self::VerySlow
        }
    }

    /// Returns `true` for categories worth a warning in the logs.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::VerySlow)
    }
}

/// Maps an elapsed duration to its [`PerformanceCategory`].
#[inline]
#[must_use]
pub const fn classify(elapsed_ms: u64) -> PerformanceCategory {
    PerformanceCategory::from_elapsed_ms(elapsed_ms)
}
