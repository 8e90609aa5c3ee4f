/// StepDirCounter accumulates the external step/direction command stream.
/// `step_edge` is called once per clean rising edge of the STEP line with
/// the level of the DIR line at that instant; debouncing is the ISR or
/// input-filter boundary's concern.
///
/// The count wraps on i32 overflow rather than saturating; a slave axis
/// that far from its commanded origin has bigger problems than the counter.
pub struct StepDirCounter {
    count: i32,      // Net commanded steps
    direction: bool, // DIR level at the last edge
}

impl StepDirCounter {
    pub fn new() -> Self {
        Self {
            count: 0,
            direction: false,
        }
    }

    /// One rising edge of STEP; DIR high steps forward, low backward.
    #[inline(always)]
    pub fn step_edge(&mut self, dir_high: bool) {
        self.direction = dir_high;
        let delta = if dir_high { 1 } else { -1 };
        self.count = self.count.wrapping_add(delta);
    }

    /// Getter for the net step count
    pub fn count(&self) -> i32 {
        self.count
    }

    /// Getter for the direction at the last edge
    pub fn direction(&self) -> bool {
        self.direction
    }

    /// Explicit origin reset (homing or re-zeroing by the consumer).
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

impl Default for StepDirCounter {
    fn default() -> Self {
        Self::new()
    }
}
