use crate::error::Fault;
use crate::park_clarke::ThreePhaseBalancedStationaryReferenceFrame;
use crate::power_stage::{InjectedChannels, PowerStage, SamplingPoint};
use crate::pwm::{Phase, PhaseCounters};
use crate::pwmc::PwmState;

use super::{average_conversions, check_deadline, phase_current, PhaseOffsets, SensingTopology};

/// Isolated (hall or flux-gate) sensors on phases A and B.
///
/// The sensors do not care about the switching state so both are sampled on
/// the timer update event, whatever the duty cycles.
pub struct InsulatedSensors<P> {
    stage: P,
    offsets: PhaseOffsets,
    over_current: bool,
}

impl<P: PowerStage> InsulatedSensors<P> {
    pub fn new(stage: P) -> Self {
        Self {
            stage,
            offsets: PhaseOffsets::default(),
            over_current: false,
        }
    }

    pub fn stage(&self) -> &P {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut P {
        &mut self.stage
    }
}

impl<P: PowerStage> SensingTopology for InsulatedSensors<P> {
    fn get_phase_currents(&mut self, _state: &PwmState) -> ThreePhaseBalancedStationaryReferenceFrame {
        let [a, b] = self.stage.injected_results();
        ThreePhaseBalancedStationaryReferenceFrame {
            a: phase_current(self.offsets.a, a),
            b: phase_current(self.offsets.b, b),
        }
    }

    fn switch_on_pwm(&mut self, state: &PwmState) {
        self.stage.set_duty_counters(PhaseCounters::splat(state.half_period() / 2));
        self.stage.set_sampling_point(SamplingPoint::UpdateEvent);
        self.stage.select_injected(InjectedChannels::Phases(Phase::A, Phase::B));
        self.stage.enable_outputs();
    }

    fn switch_off_pwm(&mut self, _state: &PwmState) {
        self.stage.disable_outputs();
    }

    fn calibrate_offsets(&mut self, _state: &PwmState) {
        let [a, b] = average_conversions(&mut self.stage, InjectedChannels::Phases(Phase::A, Phase::B));
        self.offsets = PhaseOffsets { a, b, c: 0 };
    }

    fn turn_on_low_sides(&mut self, _state: &PwmState) {
        self.stage.set_duty_counters(PhaseCounters::splat(0));
        self.stage.enable_outputs();
    }

    fn is_over_current(&mut self) -> bool {
        core::mem::take(&mut self.over_current)
    }

    fn set_sampling_point(&mut self, state: &PwmState) -> Result<(), Fault> {
        self.stage.set_duty_counters(state.counters());
        check_deadline(&self.stage)
    }

    fn offsets(&self) -> PhaseOffsets {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: PhaseOffsets) {
        self.offsets = offsets;
    }

    fn break_input(&mut self) {
        self.stage.disable_outputs();
        self.over_current = true;
    }
}
