// =============================================================================
// Day-partitioned trailing window
// =============================================================================
//
// Rolling statistics over the `n` values that precede the current bar within
// the same trading day.  The window is cleared whenever the trading day
// changes, so the first `n` bars of every day have no statistics.
//
// Standard deviation is the sample estimate (n - 1 denominator).  Both passes
// are taken relative to the oldest value in the window, so a window of
// identical values has a mean equal to that value and a std of exactly 0.0.

use std::collections::VecDeque;

use chrono::NaiveDate;

/// Mean and sample standard deviation of a full window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
}

/// Trailing window of at most `n` same-day observations.
///
/// A `None` observation (undefined upstream value) poisons every window it
/// sits in: stats are only produced when all `n` values are defined.
#[derive(Debug, Clone)]
pub struct DayWindow {
    n: usize,
    day: Option<NaiveDate>,
    values: VecDeque<Option<f64>>,
}

impl DayWindow {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            day: None,
            values: VecDeque::with_capacity(n + 1),
        }
    }

    /// Return the stats of the window *before* `value`, then push `value`.
    pub fn advance(&mut self, day: NaiveDate, value: Option<f64>) -> Option<WindowStats> {
        if self.day != Some(day) {
            self.values.clear();
            self.day = Some(day);
        }

        let stats = self.stats();

        self.values.push_back(value);
        while self.values.len() > self.n {
            self.values.pop_front();
        }

        stats
    }

    fn stats(&self) -> Option<WindowStats> {
        if self.n < 2 || self.values.len() < self.n {
            return None;
        }

        let first = (*self.values.front()?)?;
        let mut shifted = 0.0;
        for v in &self.values {
            shifted += (*v)? - first;
        }
        let mean = first + shifted / self.n as f64;

        let sq: f64 = self
            .values
            .iter()
            .flatten()
            .map(|v| (v - mean).powi(2))
            .sum();
        let std = (sq / (self.n - 1) as f64).sqrt();

        Some(WindowStats { mean, std })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn no_stats_until_window_full() {
        let mut w = DayWindow::new(3);
        assert!(w.advance(day(4), Some(1.0)).is_none());
        assert!(w.advance(day(4), Some(2.0)).is_none());
        assert!(w.advance(day(4), Some(3.0)).is_none());
        let s = w.advance(day(4), Some(100.0)).unwrap();
        assert!((s.mean - 2.0).abs() < 1e-12);
        assert!((s.std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn excludes_current_value_and_slides() {
        let mut w = DayWindow::new(2);
        w.advance(day(4), Some(1.0));
        w.advance(day(4), Some(3.0));
        let s = w.advance(day(4), Some(5.0)).unwrap();
        assert!((s.mean - 2.0).abs() < 1e-12);
        let s = w.advance(day(4), Some(0.0)).unwrap();
        assert!((s.mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn resets_on_new_day() {
        let mut w = DayWindow::new(2);
        w.advance(day(4), Some(1.0));
        w.advance(day(4), Some(1.0));
        assert!(w.advance(day(4), Some(1.0)).is_some());
        assert!(w.advance(day(5), Some(1.0)).is_none());
        assert!(w.advance(day(5), Some(1.0)).is_none());
        assert!(w.advance(day(5), Some(1.0)).is_some());
    }

    #[test]
    fn constant_window_has_exactly_zero_std() {
        let mut w = DayWindow::new(20);
        for _ in 0..20 {
            w.advance(day(4), Some(1234.5678));
        }
        let s = w.advance(day(4), Some(0.0)).unwrap();
        assert_eq!(s.mean, 1234.5678);
        assert_eq!(s.std, 0.0);

        let mut w = DayWindow::new(7);
        for _ in 0..7 {
            w.advance(day(4), Some(0.1));
        }
        assert_eq!(w.advance(day(4), None).unwrap().std, 0.0);
    }

    #[test]
    fn undefined_value_poisons_window() {
        let mut w = DayWindow::new(2);
        w.advance(day(4), None);
        w.advance(day(4), Some(1.0));
        assert!(w.advance(day(4), Some(2.0)).is_none());
        // `None` has slid out.
        assert!(w.advance(day(4), Some(3.0)).is_some());
    }
}
