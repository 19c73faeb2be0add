//! Current sensing topologies.
//!
//! A [`PwmCurrentFeedback`](crate::pwmc::PwmCurrentFeedback) handle is bound
//! to exactly one [`SensingTopology`] for its whole life. Topologies see the
//! shared control state through a shared reference only.

use crate::error::Fault;
use crate::park_clarke::ThreePhaseBalancedStationaryReferenceFrame;
use crate::power_stage::{InjectedChannels, PowerStage};
use crate::pwmc::PwmState;
use crate::saturate_i16;

mod insulated;
mod single_shunt;
mod three_shunt;

pub use insulated::InsulatedSensors;
pub use single_shunt::SingleShunt;
pub use three_shunt::ThreeShunt;

/// Conversions averaged when measuring offsets.
pub const OFFSET_SAMPLES: u32 = 16;

/// ADC reading of each amplifier with no current flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseOffsets {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

/// Hardware specific half of the PWM & current feedback component.
///
/// Every required method has to be provided by the topology. The optional
/// ones default to a neutral result and log a warning, since reaching them
/// means the application asked for something the power stage cannot do.
pub trait SensingTopology {
    /// Phase A and B currents measured during the previous PWM period.
    fn get_phase_currents(&mut self, state: &PwmState) -> ThreePhaseBalancedStationaryReferenceFrame;

    fn switch_on_pwm(&mut self, state: &PwmState);

    fn switch_off_pwm(&mut self, state: &PwmState);

    /// Measures the amplifier offsets. Outputs are off when this runs.
    fn calibrate_offsets(&mut self, state: &PwmState);

    /// Closes all low side switches, typically to charge bootstrap
    /// capacitors.
    fn turn_on_low_sides(&mut self, state: &PwmState);

    /// Whether an over-current was latched since the last call.
    fn is_over_current(&mut self) -> bool;

    /// Writes the counters in `state` to the timer and programs the
    /// sampling instant of the next period.
    ///
    /// Fails with [`Fault::DurationExceeded`] when the timer already moved
    /// on to the next period, in which case the counters land one period
    /// late.
    fn set_sampling_point(&mut self, state: &PwmState) -> Result<(), Fault>;

    fn offsets(&self) -> PhaseOffsets;

    fn set_offsets(&mut self, offsets: PhaseOffsets);

    fn enable_rl_detection(&mut self, _state: &PwmState) {
        warn!("R/L detection is not supported by this topology");
    }

    fn disable_rl_detection(&mut self, _state: &PwmState) {
        warn!("R/L detection is not supported by this topology");
    }

    /// Applies `duty` to phase A with B and C held low.
    fn set_rl_detection_duty(&mut self, _state: &PwmState, _duty: u16) -> Result<(), Fault> {
        warn!("R/L detection is not supported by this topology");
        Ok(())
    }

    fn set_ocp_reference_voltage(&mut self, _vref: u16) {
        warn!("over-current threshold is not adjustable on this topology");
    }

    /// Timer update interrupt: the counters written last period are live.
    fn timer_update(&mut self, _state: &PwmState) {}

    /// Break input interrupt.
    fn break_input(&mut self) {}
}

/// `offset - raw` saturated to the symmetric `i16` range.
pub(crate) fn phase_current(offset: i32, raw: u16) -> i16 {
    saturate_i16(offset - raw as i32)
}

/// Averages [`OFFSET_SAMPLES`] software triggered conversions of `channels`.
pub(crate) fn average_conversions<P: PowerStage>(stage: &mut P, channels: InjectedChannels) -> [i32; 2] {
    stage.select_injected(channels);
    let mut sums = [0u32; 2];
    for _ in 0..OFFSET_SAMPLES {
        let [first, second] = stage.convert_injected();
        sums[0] += first as u32;
        sums[1] += second as u32;
    }
    [
        (sums[0] / OFFSET_SAMPLES) as i32,
        (sums[1] / OFFSET_SAMPLES) as i32,
    ]
}

/// Raises [`Fault::DurationExceeded`] if the timer latched a period while
/// the registers were being written.
pub(crate) fn check_deadline<P: PowerStage>(stage: &P) -> Result<(), Fault> {
    if stage.update_pending() {
        Err(Fault::DurationExceeded)
    } else {
        Ok(())
    }
}
