pub mod velocity_estimator;

/// One full turn of the absolute angle sensor, in degrees.
pub const FULL_TURN: f32 = 360.0;

/// Wrap detection threshold: half a turn.
const HALF_TURN: f32 = 180.0;

/// AngleTracker converts bounded [0, 360) sensor readings into a continuous
/// unwrapped angle by counting zero-boundary crossings.
///
/// Operating precondition: the shaft moves less than half a revolution
/// between consecutive samples. A faster move is indistinguishable from a
/// wrap in the opposite direction and mis-counts by exactly one revolution;
/// this is a documented limitation, not corrected here.
pub struct AngleTracker {
    wrap_count: i32, // Completed revolutions relative to the origin (wrapping on overflow)
    prev_raw: f32,   // Raw reading at the previous tick
    unwrapped: f32,  // wrap_count * 360 + raw
}

impl AngleTracker {
    /// Creates a tracker referenced to the given initial raw reading.
    pub fn new(initial_raw: f32) -> Self {
        Self {
            wrap_count: 0,
            prev_raw: initial_raw,
            unwrapped: initial_raw,
        }
    }

    /// Feeds one raw sample in [0, 360) and returns the unwrapped angle.
    pub fn tick(&mut self, raw: f32) -> f32 {
        let delta = raw - self.prev_raw;

        // A jump of more than half a turn means the sensor crossed the 0/360
        // boundary; the sign of the jump tells the crossing direction.
        if delta > HALF_TURN {
            self.wrap_count = self.wrap_count.wrapping_sub(1);
        } else if delta < -HALF_TURN {
            self.wrap_count = self.wrap_count.wrapping_add(1);
        }

        self.prev_raw = raw;
        self.unwrapped = self.wrap_count as f32 * FULL_TURN + raw;
        self.unwrapped
    }

    /// Getter for the unwrapped angle
    pub fn unwrapped(&self) -> f32 {
        self.unwrapped
    }

    /// Getter for completed revolutions
    pub fn wrap_count(&self) -> i32 {
        self.wrap_count
    }

    /// Getter for the last raw reading
    pub fn raw(&self) -> f32 {
        self.prev_raw
    }

    /// Re-references the origin to the current shaft position. Called
    /// explicitly by the homing routine; never invoked automatically.
    pub fn rebase(&mut self) {
        self.wrap_count = 0;
        self.unwrapped = self.prev_raw;
    }
}
