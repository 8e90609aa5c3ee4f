/// Operating mode of the control loop. Closed enumeration; the command
/// boundary converts from its wire encoding through `from_u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlMode {
    /// Follow the external step/dir stream without feedback correction.
    OpenLoopStep = 0,
    /// Servo the shaft angle to the commanded setpoint.
    ClosedLoopPosition = 1,
    /// Servo the shaft velocity to the commanded setpoint.
    ClosedLoopVelocity = 2,
    /// Drive toward the home reference; the quadrature origin is being
    /// re-established by the foreground routine.
    Homing = 3,
}

impl ControlMode {
    /// Convert from the raw command encoding. Returns `None` for values
    /// outside the closed set.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::OpenLoopStep),
            1 => Some(Self::ClosedLoopPosition),
            2 => Some(Self::ClosedLoopVelocity),
            3 => Some(Self::Homing),
            _ => None,
        }
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        Self::ClosedLoopPosition
    }
}
