/// VelocityEstimator derives a rate from successive position samples taken
/// at a fixed cadence. One sample of history only; used for the unwrapped
/// shaft angle (deg/s) and, with its own frequency, for quadrature ticks
/// (ticks/s).
pub struct VelocityEstimator {
    freq: u16,     // Sampling frequency in Hz
    velocity: f32, // Last computed rate (units per second)
    prev: f32,     // Position at the previous tick
}

impl VelocityEstimator {
    /// Create a new estimator at the given sampling frequency.
    pub fn new(init_position: f32, freq: u16) -> Self {
        Self {
            freq,
            velocity: 0.0,
            prev: init_position,
        }
    }

    /// Finite difference over exactly one sample period.
    pub fn tick(&mut self, position: f32) -> f32 {
        self.velocity = (position - self.prev) * self.freq as f32;
        self.prev = position;
        self.velocity
    }

    /// Re-baselines the history after a missed tick. History must never be
    /// differenced across a gap, so no velocity is produced here.
    pub fn resync(&mut self, position: f32) {
        self.prev = position;
        self.velocity = 0.0;
    }

    /// Getter for the last computed rate
    pub fn velocity(&self) -> f32 {
        self.velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_difference_at_1khz() {
        // Scenario: raw 350 -> 2 unwraps to 362; 12 degrees in 1 ms.
        let mut est = VelocityEstimator::new(350.0, 1000);
        let v = est.tick(362.0);
        assert!((v - 12_000.0).abs() < 1e-1);
    }

    #[test]
    fn resync_drops_stale_history() {
        let mut est = VelocityEstimator::new(0.0, 1000);
        est.tick(5.0);
        est.resync(500.0); // gap: do not difference 5 -> 500
        assert_eq!(est.velocity(), 0.0);
        let v = est.tick(501.0);
        assert!((v - 1000.0).abs() < 1e-1);
    }
}
