/// Tick delta per (previous, current) state pair, indexed by
/// `(prev << 2) | current` with a state encoded as `(A << 1) | B`.
/// Forward Gray sequence 00 -> 10 -> 11 -> 01 -> 00 counts +1 per edge.
/// Zero entries at indices where both channels changed are invalid and
/// handled separately, never counted.
const TICK_DELTA: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Both channels differ between the two states.
const BOTH_CHANGED: u8 = 0b11;

/// QuadratureDecoder turns two phase-offset digital channels into a signed
/// tick counter. Driven from the edge interrupt of either channel; the
/// handler samples both current levels and feeds them here.
///
/// The counter wraps on i32 overflow; at realistic tick rates that is years
/// of continuous rotation in one direction.
pub struct QuadratureDecoder {
    state: u8,          // Previous (A << 1) | B levels
    ticks: i32,         // Accumulated position in quadrature ticks
    decode_errors: u32, // Invalid (double-change) transitions seen
    homing: bool,       // Consumer is establishing a zero reference
}

impl QuadratureDecoder {
    /// Creates a decoder referenced to the given initial channel levels.
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            state: Self::encode(a, b),
            ticks: 0,
            decode_errors: 0,
            homing: false,
        }
    }

    #[inline(always)]
    fn encode(a: bool, b: bool) -> u8 {
        (a as u8) << 1 | b as u8
    }

    /// Feeds the current channel levels and returns the tick delta applied.
    ///
    /// Exactly one channel changed: +-1 per the transition table. Both
    /// changed: a missed edge, discarded and counted as a decode error.
    /// No change: no-op (a glitch short enough to land on the same level).
    pub fn update(&mut self, a: bool, b: bool) -> i32 {
        let next = Self::encode(a, b);

        if self.state ^ next == BOTH_CHANGED {
            self.decode_errors = self.decode_errors.wrapping_add(1);
            self.state = next;
            return 0;
        }

        let delta = TICK_DELTA[(self.state << 2 | next) as usize] as i32;
        self.state = next;
        self.ticks = self.ticks.wrapping_add(delta);
        delta
    }

    /// Getter for the accumulated tick counter
    pub fn ticks(&self) -> i32 {
        self.ticks
    }

    /// Getter for the invalid-transition diagnostic counter
    pub fn decode_errors(&self) -> u32 {
        self.decode_errors
    }

    /// Homing flag. While set the decoder keeps counting; re-referencing the
    /// origin is the caller's job so ticks arriving while the flag is read
    /// are never lost.
    pub fn set_homing(&mut self, homing: bool) {
        self.homing = homing;
    }

    pub fn is_homing(&self) -> bool {
        self.homing
    }

    /// Explicit origin reset, called by the consumer once it has taken its
    /// zero reference. Never invoked from inside the decoder.
    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One forward Gray cycle starting and ending at (0, 0).
    const FORWARD: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    #[test]
    fn full_forward_cycle_counts_four() {
        let mut dec = QuadratureDecoder::new(false, false);
        for (a, b) in FORWARD {
            dec.update(a, b);
        }
        assert_eq!(dec.ticks(), 4);
        assert_eq!(dec.decode_errors(), 0);
    }

    #[test]
    fn forward_then_backward_returns_to_origin() {
        let mut dec = QuadratureDecoder::new(false, false);
        let n = 3;
        for _ in 0..n {
            for (a, b) in FORWARD {
                dec.update(a, b);
            }
        }
        assert_eq!(dec.ticks(), 4 * n);
        for _ in 0..n {
            for (a, b) in FORWARD.iter().rev().skip(1).chain([(false, false)].iter()) {
                dec.update(*a, *b);
            }
        }
        assert_eq!(dec.ticks(), 0);
        assert_eq!(dec.decode_errors(), 0);
    }

    #[test]
    fn double_edge_is_discarded_and_counted() {
        let mut dec = QuadratureDecoder::new(false, false);
        dec.update(true, false); // valid, +1
        let delta = dec.update(false, true); // both channels flipped
        assert_eq!(delta, 0);
        assert_eq!(dec.ticks(), 1);
        assert_eq!(dec.decode_errors(), 1);
    }

    #[test]
    fn same_state_is_a_noop() {
        let mut dec = QuadratureDecoder::new(true, true);
        assert_eq!(dec.update(true, true), 0);
        assert_eq!(dec.ticks(), 0);
        assert_eq!(dec.decode_errors(), 0);
    }

    #[test]
    fn homing_keeps_counting_until_explicit_reset() {
        let mut dec = QuadratureDecoder::new(false, false);
        dec.set_homing(true);
        dec.update(true, false);
        dec.update(true, true);
        assert!(dec.is_homing());
        assert_eq!(dec.ticks(), 2); // not frozen by the flag
        dec.reset();
        assert_eq!(dec.ticks(), 0);
    }
}
