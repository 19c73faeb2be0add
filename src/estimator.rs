//! Phase current reconstruction from the rotating frame.
//!
//! Topologies that cannot measure every phase in every PWM cycle rely on
//! these estimates to fill in what the ADC missed.

use crate::filter::LowPassFilter;
use crate::park_clarke::{
    inverse_clarke, inverse_park, RotatingReferenceFrame, ThreePhaseStationaryReferenceFrame,
};
use crate::saturate_i16;
use crate::trig::TrigTriplet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentEstimator {
    id: LowPassFilter,
    iq: LowPassFilter,
}

impl CurrentEstimator {
    pub fn new(time_constant: i32) -> Self {
        Self {
            id: LowPassFilter::new(0, time_constant),
            iq: LowPassFilter::new(0, time_constant),
        }
    }

    /// Filters `current` and rotates it back into the three phases.
    ///
    /// `current` is in phase units (a [`descaled`] Park output) and
    /// `electrical_angle` in degrees.
    ///
    /// [`descaled`]: RotatingReferenceFrame::descaled
    pub fn estimate(
        &mut self,
        current: RotatingReferenceFrame,
        electrical_angle: i32,
    ) -> ThreePhaseStationaryReferenceFrame {
        let averaged = RotatingReferenceFrame {
            q: saturate_i16(self.iq.filter(current.q)) as i32,
            d: saturate_i16(self.id.filter(current.d)) as i32,
        };
        let alpha_beta = inverse_park(averaged, &TrigTriplet::new(electrical_angle));
        inverse_clarke(alpha_beta)
    }

    /// Filtered `(d, q)` from the last call to [`Self::estimate`].
    pub fn filtered(&self) -> RotatingReferenceFrame {
        RotatingReferenceFrame {
            d: self.id.output(),
            q: self.iq.output(),
        }
    }

    pub fn set_time_constant(&mut self, time_constant: i32) {
        self.id.set_time_constant(time_constant);
        self.iq.set_time_constant(time_constant);
    }

    pub fn reset(&mut self) {
        self.id.reset();
        self.iq.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::park_clarke::{clarke, park};

    #[test]
    fn reconstructs_balanced_currents() {
        let mut estimator = CurrentEstimator::new(LowPassFilter::MAX_TIME_CONSTANT);
        let measured = ThreePhaseStationaryReferenceFrame { a: 3000, b: -1000, c: -2000 };
        for theta in [0, 37, 90, 179, 271, 359] {
            estimator.reset();
            let dq = park(measured, &TrigTriplet::new(theta)).descaled();
            let mut estimate = estimator.estimate(dq, theta);
            for _ in 0..4 {
                estimate = estimator.estimate(dq, theta);
            }
            for (est, real) in [
                (estimate.a, measured.a),
                (estimate.b, measured.b),
                (estimate.c, measured.c),
            ] {
                assert!((est - real).abs() <= 60, "theta {theta}: {estimate:?}");
            }
        }
    }

    #[test]
    fn pure_d_current_at_zero_angle_lands_on_phase_a() {
        let mut estimator = CurrentEstimator::new(LowPassFilter::MAX_TIME_CONSTANT);
        let mut estimate = ThreePhaseStationaryReferenceFrame::default();
        for _ in 0..4 {
            estimate = estimator.estimate(RotatingReferenceFrame { d: 1000, q: 0 }, 0);
        }
        assert_eq!(estimate, ThreePhaseStationaryReferenceFrame { a: 1000, b: -500, c: -500 });
        let ab = clarke(estimate);
        assert!((ab.alpha - 1000).abs() <= 1);
    }

    #[test]
    fn full_scale_pair_keeps_its_sign() {
        let mut estimator = CurrentEstimator::new(LowPassFilter::MAX_TIME_CONSTANT);
        let measured = ThreePhaseStationaryReferenceFrame { a: 30000, b: -30000, c: 0 };
        let theta = 330;
        let dq = park(measured, &TrigTriplet::new(theta)).descaled();
        assert!(dq.d > i16::MAX as i32, "{dq:?}");

        let mut estimate = ThreePhaseStationaryReferenceFrame::default();
        for _ in 0..4 {
            estimate = estimator.estimate(dq, theta);
        }
        assert!(estimate.a > 25_000, "{estimate:?}");
        assert!(estimate.b < -25_000, "{estimate:?}");
        assert!(estimate.c.abs() < 1_000, "{estimate:?}");
    }

    #[test]
    fn slow_filter_lags_the_input() {
        let mut estimator = CurrentEstimator::new(1024);
        let estimate = estimator.estimate(RotatingReferenceFrame { d: 1000, q: 0 }, 0);
        assert!(estimate.a < 100);
        assert!(estimator.filtered().d < 100);
    }
}
