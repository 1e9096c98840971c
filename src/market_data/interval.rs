// =============================================================================
// Bar interval helpers
// =============================================================================
//
// The rolling window targets roughly 100 minutes of history:
//
//   n = max(5, floor(100 / minutes_per_bar))

use tracing::debug;

/// Minutes of history the rolling window aims to cover.
const WINDOW_MINUTES: u32 = 100;

/// Smallest window the detectors run with.
pub const MIN_WINDOW: usize = 5;

/// Minutes per bar for unrecognised intervals.
const DEFAULT_MINUTES_PER_BAR: u32 = 5;

/// Minutes covered by one bar of `interval`. Unknown intervals map to 5.
pub fn minutes_per_bar(interval: &str) -> u32 {
    match interval {
        "1m" => 1,
        "5m" => 5,
        "15m" => 15,
        "30m" => 30,
        "1h" => 60,
        _ => DEFAULT_MINUTES_PER_BAR,
    }
}

/// Rolling window size `n` for `interval`.
pub fn window_size_for(interval: &str) -> usize {
    let n = (WINDOW_MINUTES / minutes_per_bar(interval)) as usize;
    if n < MIN_WINDOW {
        debug!(interval, n, "interval too coarse for a 100-minute window, using minimum");
        return MIN_WINDOW;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_intervals() {
        assert_eq!(window_size_for("1m"), 100);
        assert_eq!(window_size_for("5m"), 20);
        assert_eq!(window_size_for("15m"), 6);
        assert_eq!(window_size_for("30m"), 5);
        assert_eq!(window_size_for("1h"), 5);
    }

    #[test]
    fn unknown_interval_defaults_to_five_minutes() {
        assert_eq!(minutes_per_bar("1d"), 5);
        assert_eq!(window_size_for("banana"), 20);
    }

    #[test]
    fn window_never_below_minimum() {
        for iv in ["1m", "5m", "15m", "30m", "1h", "2h", ""] {
            assert!(window_size_for(iv) >= MIN_WINDOW);
        }
    }
}
