use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::StauError;

/// Dense index of a window within one run's timeline.
pub type WindowId = usize;

/// A half-open time slice `[left, right)` in seconds.
///
/// The last window of a run additionally absorbs the maximum timestamp,
/// so assignment never leaves an event without a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub left: f64,
    pub right: f64,
}

impl Window {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.left && ts < self.right
    }
}

/// Fixed calendar units usable as window widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    /// The unit's length in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Minutes => Duration::minutes(1).num_seconds(),
            TimeUnit::Hours => Duration::hours(1).num_seconds(),
            TimeUnit::Days => Duration::days(1).num_seconds(),
            TimeUnit::Weeks => Duration::weeks(1).num_seconds(),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Minutes => write!(f, "minutes"),
            TimeUnit::Hours => write!(f, "hours"),
            TimeUnit::Days => write!(f, "days"),
            TimeUnit::Weeks => write!(f, "weeks"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = StauError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "hour" | "hours" => Ok(TimeUnit::Hours),
            "day" | "days" => Ok(TimeUnit::Days),
            "week" | "weeks" => Ok(TimeUnit::Weeks),
            other => Err(StauError::UnknownTimeUnit(other.to_string())),
        }
    }
}

/// How the observed timeline is cut into windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowPolicy {
    /// Split the span into this many equally wide windows.
    Count(usize),
    /// One window per fixed calendar unit.
    Unit(TimeUnit),
    /// Explicit window width in seconds.
    Width(f64),
}

impl WindowPolicy {
    pub fn validate(&self) -> Result<(), StauError> {
        match self {
            WindowPolicy::Count(0) => Err(StauError::Config(
                "Window count must be positive".to_string(),
            )),
            WindowPolicy::Width(w) if !w.is_finite() || *w <= 0.0 => Err(StauError::Config(
                format!("Window width must be a positive number of seconds, got {}", w),
            )),
            _ => Ok(()),
        }
    }

    /// Window width in seconds for the given observed span, at least 1.
    pub fn width(&self, span: f64) -> f64 {
        let width = match self {
            WindowPolicy::Count(n) => (span / *n as f64).ceil(),
            WindowPolicy::Unit(unit) => unit.seconds() as f64,
            WindowPolicy::Width(w) => *w,
        };
        width.max(1.0)
    }
}
