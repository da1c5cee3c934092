//! Cuts the observed time span into equal-width windows and assigns every
//! event to exactly one of them.

use serde::Serialize;
use stau_core::{EventId, EventLog, StauError, Window, WindowId, WindowPolicy};
use tracing::debug;

/// The windowed timeline of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Windowing {
    /// Contiguous windows in ascending order; ids equal vector positions.
    pub windows: Vec<Window>,
    /// Window of each event, indexed by event id.
    pub assignment: Vec<WindowId>,
}

impl Windowing {
    /// Builds the window sequence for `log` and assigns each event.
    ///
    /// Windows start at the minimum timestamp and are emitted while the next
    /// right border stays below the maximum timestamp; the final window keeps
    /// its full width and absorbs everything up to and including the maximum.
    pub fn build(log: &EventLog, policy: &WindowPolicy) -> Result<Self, StauError> {
        policy.validate()?;
        if log.is_empty() {
            return Err(StauError::EmptyLog);
        }

        let ids_sorted = log.ids_by_timestamp();
        let min_ts = log.events[ids_sorted[0]].timestamp;
        let max_ts = log.events[ids_sorted[ids_sorted.len() - 1]].timestamp;
        let width = policy.width(max_ts - min_ts);

        let mut windows = Vec::new();
        let mut left = min_ts;
        let mut right = min_ts + width;
        while right < max_ts {
            windows.push(Window { id: windows.len(), left, right });
            left = right;
            right = left + width;
        }
        windows.push(Window { id: windows.len(), left, right });

        // Forward sweep over events sorted by timestamp; the window pointer
        // only ever advances and clamps at the last window.
        let last = windows.len() - 1;
        let mut assignment = vec![0; log.len()];
        let mut current = 0;
        for &id in &ids_sorted {
            let ts = log.events[id].timestamp;
            while current < last && ts >= windows[current].right {
                current += 1;
            }
            assignment[id] = current;
        }

        debug!(
            windows = windows.len(),
            width, "partitioned events into windows"
        );
        Ok(Self { windows, assignment })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window_of(&self, event: EventId) -> WindowId {
        self.assignment[event]
    }

    pub fn right_border(&self, window: WindowId) -> f64 {
        self.windows[window].right
    }

    /// Border lookup keyed by window id.
    pub fn borders(&self) -> Vec<(f64, f64)> {
        self.windows.iter().map(|w| (w.left, w.right)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stau_core::{Event, TimeUnit};

    fn log_with_timestamps(timestamps: &[f64]) -> EventLog {
        let events: Vec<Event> = timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| Event::new(format!("c{i}"), "a", ts))
            .collect();
        let n = events.len();
        EventLog::new(events, Vec::new(), vec![Vec::new(); n], vec![Vec::new(); n]).unwrap()
    }

    #[test]
    fn count_policy_covers_span_and_absorbs_max() {
        let log = log_with_timestamps(&[0.0, 5.0, 5.0, 12.0, 20.0]);
        let windowing = Windowing::build(&log, &WindowPolicy::Count(2)).unwrap();

        assert_eq!(windowing.len(), 2);
        assert_eq!(windowing.borders(), vec![(0.0, 10.0), (10.0, 20.0)]);
        // The maximum timestamp lands in the last window despite the
        // half-open borders.
        assert_eq!(windowing.assignment, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn windows_are_contiguous_and_uniform() {
        let log = log_with_timestamps(&[3.0, 47.0, 95.0, 123.0]);
        let windowing = Windowing::build(&log, &WindowPolicy::Count(5)).unwrap();

        for pair in windowing.windows.windows(2) {
            assert_eq!(pair[0].right, pair[1].left);
            assert_eq!(pair[0].width(), pair[1].width());
        }
        assert_eq!(windowing.windows[0].left, 3.0);
        for (event, &w) in windowing.assignment.iter().enumerate() {
            let ts = log.events[event].timestamp;
            assert!(windowing.windows[w].contains(ts) || w == windowing.len() - 1);
        }
    }

    #[test]
    fn unit_policy_uses_fixed_width() {
        let day = 86_400.0;
        let log = log_with_timestamps(&[0.0, 2.5 * day]);
        let windowing = Windowing::build(&log, &WindowPolicy::Unit(TimeUnit::Days)).unwrap();

        assert_eq!(windowing.len(), 3);
        assert_eq!(windowing.windows[2].right, 3.0 * day);
        assert_eq!(windowing.window_of(1), 2);
    }

    #[test]
    fn interior_windows_may_stay_empty() {
        let log = log_with_timestamps(&[0.0, 95.0]);
        let windowing = Windowing::build(&log, &WindowPolicy::Width(10.0)).unwrap();

        assert_eq!(windowing.len(), 10);
        assert_eq!(windowing.window_of(0), 0);
        assert_eq!(windowing.window_of(1), 9);
    }

    #[test]
    fn single_event_log_gets_one_window() {
        let log = log_with_timestamps(&[42.0]);
        let windowing = Windowing::build(&log, &WindowPolicy::Count(4)).unwrap();

        assert_eq!(windowing.len(), 1);
        assert_eq!(windowing.window_of(0), 0);
    }

    #[test]
    fn empty_log_is_rejected() {
        let log = EventLog::default();
        assert!(matches!(
            Windowing::build(&log, &WindowPolicy::Count(2)),
            Err(StauError::EmptyLog)
        ));
    }
}
