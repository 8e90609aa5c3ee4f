#![cfg_attr(not(feature = "std"), no_std)]

pub mod angle_tracking;
pub mod control_core;
pub mod mode;
pub mod quadrature;
pub mod snapshot;
pub mod step_dir;

pub use angle_tracking::velocity_estimator::VelocityEstimator;
pub use angle_tracking::AngleTracker;
pub use control_core::{ControlCore, ControlLaw, TickInputs};
pub use mode::ControlMode;
pub use quadrature::QuadratureDecoder;
pub use snapshot::{CommandState, ControlSnapshot, FaultCounters, SnapshotCell};
pub use step_dir::StepDirCounter;
