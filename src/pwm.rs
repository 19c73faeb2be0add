//! Timer compare values for the three inverter legs.

use fixed::types::U1F15;

use crate::park_clarke::ThreePhaseStationaryReferenceFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    A,
    B,
    C,
}

/// Compare register values, one per phase.
///
/// A larger value keeps the high side switch on for longer. Values are in
/// `0..=half_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseCounters {
    pub a: u16,
    pub b: u16,
    pub c: u16,
}

impl PhaseCounters {
    pub const fn splat(value: u16) -> Self {
        Self {
            a: value,
            b: value,
            c: value,
        }
    }

    pub const fn get(&self, phase: Phase) -> u16 {
        match phase {
            Phase::A => self.a,
            Phase::B => self.b,
            Phase::C => self.c,
        }
    }

    /// Duty cycle of each phase relative to the reload value.
    pub fn duty_cycles(&self, half_period: u16) -> [U1F15; 3] {
        let fraction = |counter: u16| {
            let bits = ((counter.min(half_period) as u32) << 15) / half_period.max(1) as u32;
            U1F15::from_bits(bits as u16)
        };
        [fraction(self.a), fraction(self.b), fraction(self.c)]
    }
}

/// Shifts each counter by `amount` in the direction of its phase current.
///
/// A phase with a positive current gets `amount` added, any other phase gets
/// it removed. Results stay within `0..=ceiling`.
pub fn compensate_dead_time(
    counters: PhaseCounters,
    currents: &ThreePhaseStationaryReferenceFrame,
    amount: u16,
    ceiling: u16,
) -> PhaseCounters {
    let shift = |counter: u16, current: i16| {
        let shifted = if current > 0 {
            counter as i32 + amount as i32
        } else {
            counter as i32 - amount as i32
        };
        shifted.clamp(0, ceiling as i32) as u16
    };
    PhaseCounters {
        a: shift(counters.a, currents.a),
        b: shift(counters.b, currents.b),
        c: shift(counters.c, currents.c),
    }
}
