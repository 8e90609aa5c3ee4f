use crate::angle_tracking::velocity_estimator::VelocityEstimator;
use crate::angle_tracking::AngleTracker;
use crate::mode::ControlMode;
use crate::snapshot::{CommandState, ControlSnapshot, FaultCounters};

/// Everything the interrupt context gathered for one sample period.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInputs {
    /// Raw absolute angle in [0, 360) degrees.
    pub raw_angle: f32,
    /// Monotonically incrementing tick sequence number.
    pub stamp: u32,
    /// Auxiliary quadrature position at this period.
    pub quad_ticks: i32,
    /// Decode-error count as reported by the quadrature decoder.
    pub decode_errors: u32,
    /// Net external step/dir count at this period.
    pub step_count: i32,
    /// The sensor read failed this period and `raw_angle` is a reused
    /// sample, not a fresh measurement.
    pub sensor_fault: bool,
}

/// Seam to the external control law. The core hands over the mode-specific
/// error and the velocity estimate; gains, filtering and effort shaping
/// live entirely on the other side.
pub trait ControlLaw {
    fn effort(&mut self, mode: ControlMode, error: f32, velocity: f32) -> f32;
}

/// ControlCore runs the per-tick state pipeline: unwrap the shaft angle,
/// estimate velocities, branch on the commanded mode for the error source,
/// obtain the effort from the control law and assemble the snapshot.
///
/// Deterministic per call: no allocation, no loops, never blocks, and never
/// halts on a fault condition. Faults are counted and the loop keeps
/// driving (spinning motors beat strict error reporting here).
pub struct ControlCore<L: ControlLaw> {
    tracker: AngleTracker,
    shaft_velocity: VelocityEstimator, // deg/s, angle-sample time base
    quad_velocity: VelocityEstimator,  // ticks/s, quadrature time base
    law: L,
    step_angle: f32, // Degrees of setpoint per external step
    missed_samples: u32,
    prev_stamp: u32,
    primed: bool, // First tick only baselines the history
}

impl<L: ControlLaw> ControlCore<L> {
    /// Creates the core.
    ///
    /// # Arguments
    /// * `law` - External control-law collaborator
    /// * `freq` - Sampling-tick frequency in Hz
    /// * `quad_freq` - Quadrature velocity time base in Hz
    /// * `step_angle` - Degrees per step/dir step (step/dir slave scaling)
    pub fn new(law: L, freq: u16, quad_freq: u16, step_angle: f32) -> Self {
        Self {
            tracker: AngleTracker::new(0.0),
            shaft_velocity: VelocityEstimator::new(0.0, freq),
            quad_velocity: VelocityEstimator::new(0.0, quad_freq),
            law,
            step_angle,
            missed_samples: 0,
            prev_stamp: 0,
            primed: false,
        }
    }

    /// One sample period. `cmd` is the command state read atomically at the
    /// start of the period.
    pub fn tick(&mut self, input: TickInputs, cmd: CommandState) -> ControlSnapshot {
        // The very first sample references the unwrap origin; without this a
        // boot position past half a turn would count as a wrap.
        if !self.primed {
            self.tracker = AngleTracker::new(input.raw_angle);
        }
        let measured = self.tracker.tick(input.raw_angle);

        // Velocity comes from adjacent fresh samples only. A stamp gap or a
        // failed sensor read means the data is stale: count the fault,
        // re-baseline, and report zero velocity for this period instead of
        // passing stale state off as a live measurement.
        let stale = self.primed
            && (input.sensor_fault || input.stamp.wrapping_sub(self.prev_stamp) != 1);
        let velocity = if !self.primed || stale {
            if stale {
                self.missed_samples = self.missed_samples.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "stale sample tick: stamp {} follows {}",
                    input.stamp,
                    self.prev_stamp
                );
            }
            self.primed = true;
            self.shaft_velocity.resync(measured);
            self.quad_velocity.resync(input.quad_ticks as f32);
            0.0
        } else {
            self.quad_velocity.tick(input.quad_ticks as f32);
            self.shaft_velocity.tick(measured)
        };
        self.prev_stamp = input.stamp;

        // In step/dir slave mode the setpoint is generated from the step
        // counter; every other mode takes the commanded one.
        let setpoint = match cmd.mode {
            ControlMode::OpenLoopStep => input.step_count as f32 * self.step_angle,
            _ => cmd.setpoint,
        };

        let error = match cmd.mode {
            ControlMode::ClosedLoopVelocity => setpoint - velocity,
            _ => setpoint - measured,
        };

        let effort = self.law.effort(cmd.mode, error, velocity);
        let effort_abs = if effort < 0.0 { -effort } else { effort };

        ControlSnapshot {
            setpoint,
            measured,
            error,
            effort,
            effort_abs,
            velocity,
            mode: cmd.mode,
            wrap_count: self.tracker.wrap_count(),
            step_count: input.step_count,
            quad_ticks: input.quad_ticks,
            quad_velocity: self.quad_velocity.velocity(),
            faults: FaultCounters {
                missed_samples: self.missed_samples,
                decode_errors: input.decode_errors,
            },
        }
    }

    /// Re-references the shaft origin to the current position. Explicit
    /// external call at the end of a homing routine, never automatic.
    pub fn rebase_origin(&mut self) {
        self.tracker.rebase();
    }

    /// Getter for the missed-sample fault counter
    pub fn missed_samples(&self) -> u32 {
        self.missed_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plain proportional stand-in for the external law.
    struct PLaw {
        kp: f32,
    }

    impl ControlLaw for PLaw {
        fn effort(&mut self, _mode: ControlMode, error: f32, _velocity: f32) -> f32 {
            self.kp * error
        }
    }

    fn core() -> ControlCore<PLaw> {
        ControlCore::new(PLaw { kp: 2.0 }, 1000, 1000, 1.8)
    }

    fn position_cmd(setpoint: f32) -> CommandState {
        CommandState {
            setpoint,
            mode: ControlMode::ClosedLoopPosition,
            quad_homing: false,
        }
    }

    fn input(raw: f32, stamp: u32) -> TickInputs {
        TickInputs {
            raw_angle: raw,
            stamp,
            ..Default::default()
        }
    }

    #[test]
    fn snapshot_is_consistent_per_tick() {
        let mut core = core();
        core.tick(input(350.0, 1), position_cmd(90.0));
        let snap = core.tick(input(2.0, 2), position_cmd(90.0));
        assert_eq!(snap.wrap_count, 1);
        assert!((snap.measured - 362.0).abs() < 1e-3);
        assert!((snap.velocity - 12_000.0).abs() < 1e-1);
        assert_eq!(snap.error, snap.setpoint - snap.measured);
        assert_eq!(snap.effort, 2.0 * snap.error);
        assert_eq!(snap.effort_abs, snap.effort.abs());
    }

    #[test]
    fn first_tick_baselines_without_fault() {
        let mut core = core();
        let snap = core.tick(input(10.0, 1), position_cmd(0.0));
        assert_eq!(snap.velocity, 0.0);
        assert_eq!(snap.faults.missed_samples, 0);
    }

    #[test]
    fn stamp_gap_counts_fault_and_rebaselines() {
        let mut core = core();
        core.tick(input(0.0, 1), position_cmd(0.0));
        core.tick(input(1.0, 2), position_cmd(0.0));
        // Stamp jumps from 2 to 5: deadline missed twice over.
        let snap = core.tick(input(30.0, 5), position_cmd(0.0));
        assert_eq!(snap.faults.missed_samples, 1);
        assert_eq!(snap.velocity, 0.0); // stale history not differenced
        let snap = core.tick(input(31.0, 6), position_cmd(0.0));
        assert!((snap.velocity - 1000.0).abs() < 1e-1);
        assert_eq!(snap.faults.missed_samples, 1);
    }

    #[test]
    fn velocity_mode_takes_error_from_velocity() {
        let mut core = core();
        let cmd = CommandState {
            setpoint: 500.0,
            mode: ControlMode::ClosedLoopVelocity,
            quad_homing: false,
        };
        core.tick(input(0.0, 1), cmd);
        let snap = core.tick(input(1.0, 2), cmd); // 1000 deg/s
        assert_eq!(snap.error, 500.0 - snap.velocity);
    }

    #[test]
    fn step_slave_mode_derives_setpoint_from_step_count() {
        let mut core = core();
        let cmd = CommandState {
            setpoint: 0.0,
            mode: ControlMode::OpenLoopStep,
            quad_homing: false,
        };
        let mut inp = input(0.0, 1);
        inp.step_count = 100;
        let snap = core.tick(inp, cmd);
        assert!((snap.setpoint - 180.0).abs() < 1e-3); // 100 steps * 1.8 deg
        assert_eq!(snap.error, snap.setpoint - snap.measured);
    }

    #[test]
    fn sensor_fault_counts_and_rebaselines() {
        let mut core = core();
        core.tick(input(0.0, 1), position_cmd(0.0));
        core.tick(input(1.0, 2), position_cmd(0.0));
        // Read failed this period; the caller reused the last sample but
        // flagged it. The stamp still advances by exactly 1.
        let mut inp = input(1.0, 3);
        inp.sensor_fault = true;
        let snap = core.tick(inp, position_cmd(0.0));
        assert_eq!(snap.faults.missed_samples, 1);
        assert_eq!(snap.velocity, 0.0); // reused sample not passed off as live
        let snap = core.tick(input(2.0, 4), position_cmd(0.0));
        assert!((snap.velocity - 1000.0).abs() < 1e-1);
        assert_eq!(snap.faults.missed_samples, 1);
    }

    #[test]
    fn decode_errors_pass_through_to_faults() {
        let mut core = core();
        let mut inp = input(0.0, 1);
        inp.decode_errors = 7;
        let snap = core.tick(inp, position_cmd(0.0));
        assert_eq!(snap.faults.decode_errors, 7);
    }

    #[test]
    fn rebase_is_explicit_only() {
        let mut core = core();
        core.tick(input(350.0, 1), position_cmd(0.0));
        core.tick(input(2.0, 2), position_cmd(0.0));
        assert_eq!(core.tick(input(2.0, 3), position_cmd(0.0)).wrap_count, 1);
        core.rebase_origin();
        let snap = core.tick(input(2.0, 4), position_cmd(0.0));
        assert_eq!(snap.wrap_count, 0);
        assert!((snap.measured - 2.0).abs() < 1e-3);
    }
}
