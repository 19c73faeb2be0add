//! Fault and configuration error types.

use core::fmt;

/// Faults reported upward by the PWM & current feedback core.
///
/// None of these stop the inverter on their own. The fault management layer
/// decides whether the motor has to be stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Duty cycles were written after the timer latched the next period.
    DurationExceeded,
    /// The power stage reported an over-current (break input) condition.
    OverCurrent,
}

impl Fault {
    /// Bit used for this fault in a fault word.
    pub const fn code(self) -> u16 {
        match self {
            Fault::DurationExceeded => 0x0001,
            Fault::OverCurrent => 0x0040,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::DurationExceeded => write!(f, "FOC duration exceeded"),
            Fault::OverCurrent => write!(f, "over-current on power stage"),
        }
    }
}

/// Reasons a [`PwmConfig`](crate::config::PwmConfig) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// PWM period is zero or odd.
    InvalidPeriod,
    /// A sampling margin does not fit in half a PWM period.
    MarginTooLarge,
    /// Dead-time compensation count does not fit in half a PWM period.
    CompensationTooLarge,
    /// Low-pass filter time constant outside `0..=32767`.
    InvalidFilterConstant,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPeriod => write!(f, "PWM period must be non-zero and even"),
            ConfigError::MarginTooLarge => {
                write!(f, "sampling margin exceeds half the PWM period")
            }
            ConfigError::CompensationTooLarge => {
                write!(f, "dead-time compensation exceeds half the PWM period")
            }
            ConfigError::InvalidFilterConstant => {
                write!(f, "filter time constant must be within 0..=32767")
            }
        }
    }
}
