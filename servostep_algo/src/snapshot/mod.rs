// Shared state crossing the interrupt/foreground boundary. Everything here
// is Copy and published as a whole through SnapshotCell; no field is ever
// written or read individually across contexts.

pub mod cell;

pub use cell::SnapshotCell;

use crate::mode::ControlMode;

/// Non-fatal fault counters, surfaced in every snapshot for the foreground
/// diagnostics to inspect. Wrapping; these are rate signals, not totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultCounters {
    /// Ticks that ran on stale data: a missed deadline or a failed
    /// sensor read.
    pub missed_samples: u32,
    /// Invalid quadrature transitions discarded by the decoder.
    pub decode_errors: u32,
}

/// One consistent unit of control-loop state, written by the sampling tick
/// every period and read whole by the foreground for telemetry. Field
/// naming follows the classic servo convention: r setpoint, y measured,
/// e error, u effort.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlSnapshot {
    /// Setpoint `r` (degrees, or deg/s in velocity mode).
    pub setpoint: f32,
    /// Measured unwrapped shaft angle `y` in degrees.
    pub measured: f32,
    /// Error `e` for the active mode at this tick.
    pub error: f32,
    /// Signed control effort `u`.
    pub effort: f32,
    /// Effort magnitude `U`.
    pub effort_abs: f32,
    /// Estimated shaft velocity in deg/s.
    pub velocity: f32,
    /// Mode the tick actually ran in.
    pub mode: ControlMode,
    /// Completed revolutions of the shaft.
    pub wrap_count: i32,
    /// Net external step/dir count.
    pub step_count: i32,
    /// Auxiliary quadrature position in ticks.
    pub quad_ticks: i32,
    /// Auxiliary quadrature velocity in ticks/s.
    pub quad_velocity: f32,
    /// Fault counters as of this tick.
    pub faults: FaultCounters,
}

impl ControlSnapshot {
    /// Pre-boot value, published before the first tick runs.
    pub const INIT: Self = Self {
        setpoint: 0.0,
        measured: 0.0,
        error: 0.0,
        effort: 0.0,
        effort_abs: 0.0,
        velocity: 0.0,
        mode: ControlMode::ClosedLoopPosition,
        wrap_count: 0,
        step_count: 0,
        quad_ticks: 0,
        quad_velocity: 0.0,
        faults: FaultCounters {
            missed_samples: 0,
            decode_errors: 0,
        },
    };
}

/// Command-side state written by the foreground handler and read atomically
/// by the tick context at the start of each period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandState {
    /// Commanded setpoint for the active mode.
    pub setpoint: f32,
    /// Requested operating mode.
    pub mode: ControlMode,
    /// Foreground is homing the quadrature reference.
    pub quad_homing: bool,
}

impl CommandState {
    /// Boot command: hold position zero, no homing.
    pub const INIT: Self = Self {
        setpoint: 0.0,
        mode: ControlMode::ClosedLoopPosition,
        quad_homing: false,
    };
}
