use crate::TICK_RATE_MS;

/// Tenths of a second removed from the clock on every tick
const TENTHS_PER_TICK: i64 = (TICK_RATE_MS / 100) as i64;

/// Discrete round countdown.
///
/// Remaining time is held as whole tenths of a second so that a clock
/// started at 10.0s reaches exactly zero after 100 ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    total_tenths: i64,
    remaining_tenths: i64,
    running: bool,
}

impl Countdown {
    pub fn new(total_secs: f64) -> Self {
        let total_tenths = (total_secs * 10.0).round() as i64;
        Self {
            total_tenths,
            remaining_tenths: total_tenths,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Stop and refill to the full duration
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_tenths = self.total_tenths;
    }

    /// Advance one tick and report the new remaining time.
    ///
    /// Frozen while stopped. No clamping: callers watch for `<= 0.0`.
    pub fn tick(&mut self) -> f64 {
        if self.running {
            self.remaining_tenths -= TENTHS_PER_TICK;
        }
        self.remaining()
    }

    pub fn remaining(&self) -> f64 {
        self.remaining_tenths as f64 / 10.0
    }

    pub fn total(&self) -> f64 {
        self.total_tenths as f64 / 10.0
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_tenths <= 0
    }

    /// Fraction of the round left, clamped to `[0, 1]` for progress bars
    pub fn fraction_left(&self) -> f64 {
        if self.total_tenths <= 0 {
            return 0.0;
        }
        (self.remaining_tenths as f64 / self.total_tenths as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_full_and_stopped() {
        let timer = Countdown::new(10.0);
        assert_eq!(timer.remaining(), 10.0);
        assert_eq!(timer.total(), 10.0);
        assert!(!timer.is_running());
        assert!(!timer.is_exhausted());
    }

    #[test]
    fn test_tick_while_stopped_is_frozen() {
        let mut timer = Countdown::new(10.0);
        assert_eq!(timer.tick(), 10.0);
        assert_eq!(timer.remaining(), 10.0);
    }

    #[test]
    fn test_tick_decrements_by_tenth() {
        let mut timer = Countdown::new(10.0);
        timer.start();
        assert_eq!(timer.tick(), 9.9);
        assert_eq!(timer.tick(), 9.8);
    }

    #[test]
    fn test_reaches_exactly_zero() {
        let mut timer = Countdown::new(10.0);
        timer.start();
        for _ in 0..100 {
            timer.tick();
        }
        assert_eq!(timer.remaining(), 0.0);
        assert!(timer.is_exhausted());
    }

    #[test]
    fn test_tick_does_not_clamp() {
        let mut timer = Countdown::new(0.1);
        timer.start();
        timer.tick();
        assert_eq!(timer.tick(), -0.1);
    }

    #[test]
    fn test_stop_and_reset() {
        let mut timer = Countdown::new(2.0);
        timer.start();
        timer.tick();
        timer.stop();
        timer.tick();
        assert_eq!(timer.remaining(), 1.9);

        timer.reset();
        assert_eq!(timer.remaining(), 2.0);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_fraction_left() {
        let mut timer = Countdown::new(10.0);
        timer.start();
        for _ in 0..25 {
            timer.tick();
        }
        assert!((timer.fraction_left() - 0.75).abs() < 1e-9);
    }
}
