//! Space vector modulation.
//!
//! Turns a stationary frame voltage command into three compare values for a
//! centre aligned timer, together with the sector the vector lies in.

use crate::park_clarke::TwoPhaseStationaryOrthogonalReferenceFrame;
use crate::pwm::{Phase, PhaseCounters};

/// One of the six 60° regions of the voltage hexagon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Sector {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
}

impl Sector {
    /// Classifies the auxiliary projections of the voltage vector.
    pub const fn classify(x: i64, y: i64, z: i64) -> Self {
        if y < 0 {
            if z < 0 {
                Sector::Five
            } else if x <= 0 {
                Sector::Four
            } else {
                Sector::Three
            }
        } else if z >= 0 {
            Sector::Two
        } else if x <= 0 {
            Sector::Six
        } else {
            Sector::One
        }
    }

    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Phases owning the low, mid and high duty slots in this sector.
    ///
    /// The low slot holds the largest compare value.
    pub const fn duty_order(self) -> [Phase; 3] {
        match self {
            Sector::One => [Phase::A, Phase::B, Phase::C],
            Sector::Two => [Phase::B, Phase::A, Phase::C],
            Sector::Three => [Phase::B, Phase::C, Phase::A],
            Sector::Four => [Phase::C, Phase::B, Phase::A],
            Sector::Five => [Phase::C, Phase::A, Phase::B],
            Sector::Six => [Phase::A, Phase::C, Phase::B],
        }
    }
}

/// Result of modulating one voltage command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Modulation {
    pub sector: Sector,
    pub low_duty: u16,
    pub mid_duty: u16,
    pub high_duty: u16,
    pub counters: PhaseCounters,
}

/// Space vector modulation of `voltage`.
///
/// `voltage` is in the power stage orientation, where a positive beta
/// leads phase C. That is the mirror image of
/// [`clarke`](crate::park_clarke::clarke); the handle flips
/// beta before calling this (see
/// [`PwmCurrentFeedback::set_phase_voltage`](crate::pwmc::PwmCurrentFeedback::set_phase_voltage)).
///
/// `pwm_period` is the full timer period and `sqrt3_period` its product with
/// `2·sqrt(3)` (see [`PwmConfig::sqrt3_period`](crate::config::PwmConfig::sqrt3_period)).
/// Voltage components are expected within the `i16` range where `32768`
/// reaches half a period on one phase. Counters are clamped into
/// `0..=pwm_period / 2`.
pub fn space_vector(
    voltage: TwoPhaseStationaryOrthogonalReferenceFrame,
    pwm_period: u16,
    sqrt3_period: i32,
) -> Modulation {
    let period = pwm_period as i64;
    let u_alpha = voltage.alpha as i64 * sqrt3_period as i64;
    let u_beta = -(voltage.beta as i64 * period) * 2;

    let x = u_beta;
    let y = (u_beta + u_alpha) / 2;
    let z = (u_beta - u_alpha) / 2;

    let sector = Sector::classify(x, y, z);
    let quarter = period / 4;

    let (time_a, time_b, time_c) = match sector {
        Sector::Five => {
            let a = quarter + (y - z) / 262144;
            (a, a + z / 131072, a - y / 131072)
        }
        Sector::Four => {
            let a = quarter + (x - z) / 262144;
            let b = a + z / 131072;
            (a, b, b - x / 131072)
        }
        Sector::Three => {
            let a = quarter + (y - x) / 262144;
            let c = a - y / 131072;
            (a, c + x / 131072, c)
        }
        Sector::Two => {
            let a = quarter + (y - z) / 262144;
            (a, a + z / 131072, a - y / 131072)
        }
        Sector::Six => {
            let a = quarter + (y - x) / 262144;
            let c = a - y / 131072;
            (a, c + x / 131072, c)
        }
        Sector::One => {
            let a = quarter + (x - z) / 262144;
            let b = a + z / 131072;
            (a, b, b - x / 131072)
        }
    };

    let half = period / 2;
    let clamp = |time: i64| time.clamp(0, half) as u16;
    let counters = PhaseCounters {
        a: clamp(time_a),
        b: clamp(time_b),
        c: clamp(time_c),
    };

    let [low, mid, high] = sector.duty_order();
    Modulation {
        sector,
        low_duty: counters.get(low),
        mid_duty: counters.get(mid),
        high_duty: counters.get(high),
        counters,
    }
}
