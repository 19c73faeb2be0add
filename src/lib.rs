//! PWM generation and current feedback for field oriented control.
//!
//! The crate turns a stationary frame voltage command into compare values
//! for a centre aligned three phase timer, reads the phase currents back
//! through one of several shunt topologies and keeps the integer
//! trigonometry used to move between the stationary and rotating frames.
//!
//! A typical high frequency task looks like
//!
//! ```ignore
//! let iab = pwmc.get_phase_currents();
//! let trig = TrigTriplet::new(electrical_angle);
//! let idq = park(iab.complete(), &trig).descaled();
//! let vdq = current_controller.update(idq);
//! pwmc.set_phase_voltage(inverse_park(vdq, &trig))?;
//! ```
#![no_std]
#![forbid(unsafe_code)]

#[macro_use]
mod fmt;

pub mod calibration;
pub mod config;
pub mod error;
pub mod estimator;
pub mod fault;
pub mod filter;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod park_clarke;
pub mod power_stage;
pub mod pwm;
pub mod pwmc;
pub mod svpwm;
pub mod topology;
pub mod trig;

pub use calibration::CalibrationAction;
pub use config::PwmConfig;
pub use error::{ConfigError, Fault};
pub use fault::FaultFlags;
pub use pwmc::{PwmCurrentFeedback, PwmState};
pub use topology::{InsulatedSensors, PhaseOffsets, SensingTopology, SingleShunt, ThreeShunt};
pub use trig::TrigTriplet;

/// `sqrt(3)` in Q15, `0xDDB4 / 32768 ≈ 1.7320`.
pub const SQRT3FACTOR: u16 = 0xDDB4;

/// Clamps to `-i16::MAX..=i16::MAX`, keeping the range symmetric.
pub(crate) fn saturate_i16(value: i32) -> i16 {
    value.clamp(-(i16::MAX as i32), i16::MAX as i32) as i16
}
