//! Park and Clarke transformations (along with their inverses).
//!
//! Everything is integer arithmetic. The rotating transforms take a
//! [`TrigTriplet`] computed once per control cycle instead of evaluating
//! sine and cosine again.

use crate::trig::{TrigTriplet, TRIG_FULL_SCALE};
use crate::{saturate_i16, SQRT3FACTOR};

/// Gain of [`park`]: `d` and `q` come out 1000 times larger than the phase
/// quantities to keep the fractional part of the `2/3` scaling.
pub const PARK_SCALE: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotatingReferenceFrame {
    pub d: i32,
    pub q: i32,
}

impl RotatingReferenceFrame {
    /// Removes the [`PARK_SCALE`] gain, bringing `d` and `q` back to the
    /// units of the phase quantities.
    pub const fn descaled(self) -> Self {
        Self {
            d: self.d / PARK_SCALE,
            q: self.q / PARK_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwoPhaseStationaryOrthogonalReferenceFrame {
    pub alpha: i32,
    pub beta: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThreePhaseStationaryReferenceFrame {
    pub a: i16,
    pub b: i16,
    pub c: i16,
}

/// Two measured phases of a set whose sum is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThreePhaseBalancedStationaryReferenceFrame {
    pub a: i16,
    pub b: i16,
}

impl ThreePhaseBalancedStationaryReferenceFrame {
    /// Completes the set with `c = -a - b`.
    pub fn complete(self) -> ThreePhaseStationaryReferenceFrame {
        ThreePhaseStationaryReferenceFrame {
            a: self.a,
            b: self.b,
            c: saturate_i16(-(self.a as i32) - self.b as i32),
        }
    }
}

/// Clarke transform
///
/// `alpha = 2a/3 - (b + c)/3`, `beta = (b - c) * 250/433` where `250/433`
/// approximates `1/sqrt(3)`.
pub fn clarke(inputs: ThreePhaseStationaryReferenceFrame) -> TwoPhaseStationaryOrthogonalReferenceFrame {
    let (a, b, c) = (inputs.a as i32, inputs.b as i32, inputs.c as i32);
    TwoPhaseStationaryOrthogonalReferenceFrame {
        alpha: (a * 2 / 3) - ((b + c) / 3),
        beta: (b - c) * 250 / 433,
    }
}

/// Inverse Clarke transform
///
/// Phases saturate at `±i16::MAX`.
pub fn inverse_clarke(
    inputs: TwoPhaseStationaryOrthogonalReferenceFrame,
) -> ThreePhaseStationaryReferenceFrame {
    let alpha = inputs.alpha as i64;
    let sqrt3_beta = inputs.beta as i64 * SQRT3FACTOR as i64 / 32768;
    ThreePhaseStationaryReferenceFrame {
        a: saturate_i16(inputs.alpha),
        b: saturate_i16(((-alpha + sqrt3_beta) / 2) as i32),
        c: saturate_i16(((-alpha - sqrt3_beta) / 2) as i32),
    }
}

/// Park transform
///
/// Projects the three phases directly on the rotating axes:
/// `d = (sin0·a + sin240·b + sin120·c)·1000/768` and likewise for `q` with
/// the cosines. `768 = 512 · 3/2` folds the table full scale with the
/// amplitude invariant `2/3` factor.
pub fn park(inputs: ThreePhaseStationaryReferenceFrame, trig: &TrigTriplet) -> RotatingReferenceFrame {
    let (a, b, c) = (inputs.a as i64, inputs.b as i64, inputs.c as i64);
    let d = trig.sin_0 as i64 * a + trig.sin_240 as i64 * b + trig.sin_120 as i64 * c;
    let q = trig.cos_0 as i64 * a + trig.cos_240 as i64 * b + trig.cos_120 as i64 * c;
    RotatingReferenceFrame {
        d: (d * PARK_SCALE as i64 / 768) as i32,
        q: (q * PARK_SCALE as i64 / 768) as i32,
    }
}

/// Inverse Park transform
///
/// Rotates `d`/`q` back onto the stationary axes without changing units:
/// feed it [`RotatingReferenceFrame::descaled`] values to undo [`park`].
pub fn inverse_park(
    inputs: RotatingReferenceFrame,
    trig: &TrigTriplet,
) -> TwoPhaseStationaryOrthogonalReferenceFrame {
    let (d, q) = (inputs.d as i64, inputs.q as i64);
    let (sin, cos) = (trig.sin_0 as i64, trig.cos_0 as i64);
    let full_scale = TRIG_FULL_SCALE as i64;
    TwoPhaseStationaryOrthogonalReferenceFrame {
        alpha: ((d * sin + q * cos) / full_scale) as i32,
        beta: ((q * sin - d * cos) / full_scale) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_phase(a: i16, b: i16, c: i16) -> ThreePhaseStationaryReferenceFrame {
        ThreePhaseStationaryReferenceFrame { a, b, c }
    }

    #[track_caller]
    fn clarke_round_trip(a: i16, b: i16) {
        let input = ThreePhaseBalancedStationaryReferenceFrame { a, b }.complete();
        let two_phase = clarke(input);
        let result = inverse_clarke(two_phase);

        assert!((result.a - input.a).abs() <= 2, "{result:?} vs {input:?}");
        assert!((result.b - input.b).abs() <= 2, "{result:?} vs {input:?}");
        assert!((result.c - input.c).abs() <= 2, "{result:?} vs {input:?}");
    }

    #[test]
    fn clarke_round_trip_zero() {
        clarke_round_trip(0, 0);
    }

    #[test]
    fn clarke_round_trip_two_inputs() {
        clarke_round_trip(0, 1000);
        clarke_round_trip(1000, 0);
        clarke_round_trip(-500, -500);
        clarke_round_trip(-100, -200);
        clarke_round_trip(13000, -21000);
    }

    #[test]
    fn clarke_known_values() {
        let ab = clarke(three_phase(1000, -500, -500));
        assert_eq!(ab, TwoPhaseStationaryOrthogonalReferenceFrame { alpha: 999, beta: 0 });

        let ab = clarke(three_phase(0, 866, -866));
        assert_eq!(ab, TwoPhaseStationaryOrthogonalReferenceFrame { alpha: 0, beta: 1000 });
    }

    #[test]
    fn inverse_clarke_known_values() {
        let abc = inverse_clarke(TwoPhaseStationaryOrthogonalReferenceFrame { alpha: 0, beta: 1000 });
        assert_eq!(abc, three_phase(0, 866, -866));
    }

    #[test]
    fn park_aligns_d_with_phase_a_at_zero() {
        let trig = TrigTriplet::new(0);
        let dq = park(three_phase(768, -384, -384), &trig);
        // (512·768 + 256·384·2)·1000/768
        assert_eq!(dq.d, 768_000);
        assert_eq!(dq.q, 0);
    }

    #[test]
    fn park_inverse_park_round_trip() {
        let currents = [
            three_phase(1000, -500, -500),
            three_phase(0, 866, -866),
            three_phase(12000, -7000, -5000),
            three_phase(-300, 100, 200),
            three_phase(-20000, 9000, 11000),
        ];
        for theta in [0, 37, 90, 179, 271, 359] {
            let trig = TrigTriplet::new(theta);
            for abc in currents {
                let expected = clarke(abc);
                let dq = park(abc, &trig).descaled();
                let result = inverse_park(dq, &trig);

                let magnitude = (abc.a as i32).abs().max((abc.b as i32).abs());
                let tolerance = magnitude / 100 + 3;
                assert!(
                    (result.alpha - expected.alpha).abs() <= tolerance,
                    "theta {theta}: {result:?} vs {expected:?}"
                );
                assert!(
                    (result.beta - expected.beta).abs() <= tolerance,
                    "theta {theta}: {result:?} vs {expected:?}"
                );
            }
        }
    }

    #[test]
    fn park_does_not_overflow_at_full_scale() {
        let trig = TrigTriplet::new(45);
        let dq = park(three_phase(i16::MAX, i16::MIN, i16::MAX), &trig);
        assert!(dq.d.abs() < 100_000_000);
        assert!(dq.q.abs() < 100_000_000);
    }
}
