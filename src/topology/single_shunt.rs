use crate::error::Fault;
use crate::park_clarke::ThreePhaseBalancedStationaryReferenceFrame;
use crate::power_stage::{InjectedChannels, PowerStage, SamplingPoint};
use crate::pwm::{Phase, PhaseCounters};
use crate::pwmc::PwmState;
use crate::saturate_i16;

use super::{average_conversions, check_deadline, phase_current, PhaseOffsets, SensingTopology};

/// Phases read by the two samples of a period, `None` when the active
/// vector was too short to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Plan {
    /// Sampled after the high duty edge, reads the opposite of this phase.
    first: Option<Phase>,
    /// Sampled after the mid duty edge, reads this phase.
    second: Option<Phase>,
}

/// A single shunt in the DC link.
///
/// The DC link only carries a phase current while an active vector is
/// applied, so the shunt is sampled once in each of the two active vectors
/// of the period. Short vectors cannot be sampled and the missing phases
/// come from [`PwmState::estimated_currents`].
///
/// The shunt has one amplifier: [`PhaseOffsets::a`] holds its offset.
pub struct SingleShunt<P> {
    stage: P,
    offsets: PhaseOffsets,
    next: Plan,
    sampled: Plan,
    over_current: bool,
}

impl<P: PowerStage> SingleShunt<P> {
    pub fn new(stage: P) -> Self {
        Self {
            stage,
            offsets: PhaseOffsets::default(),
            next: Plan::default(),
            sampled: Plan::default(),
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

impl<P: PowerStage> SensingTopology for SingleShunt<P> {
    fn get_phase_currents(&mut self, state: &PwmState) -> ThreePhaseBalancedStationaryReferenceFrame {
        let [first_raw, second_raw] = self.stage.injected_results();
        let shunt = self.offsets.a;

        let mut currents: [Option<i16>; 3] = [None; 3];
        if let Some(phase) = self.sampled.first {
            currents[phase as usize] = Some(-phase_current(shunt, first_raw));
        }
        if let Some(phase) = self.sampled.second {
            currents[phase as usize] = Some(phase_current(shunt, second_raw));
        }

        // Fill all but one of the gaps from the estimate, the last one
        // closes the balanced set.
        let estimated = state.estimated_currents();
        let mut gaps = currents.iter().filter(|current| current.is_none()).count();
        for (current, estimate) in currents.iter_mut().zip([estimated.a, estimated.b, estimated.c]) {
            if current.is_none() && gaps > 1 {
                *current = Some(estimate);
                gaps -= 1;
            }
        }
        let known: i32 = currents.iter().flatten().map(|&current| current as i32).sum();
        if let Some(gap) = currents.iter_mut().find(|current| current.is_none()) {
            *gap = Some(saturate_i16(-known));
        }

        ThreePhaseBalancedStationaryReferenceFrame {
            a: currents[0].unwrap_or_default(),
            b: currents[1].unwrap_or_default(),
        }
    }

    fn switch_on_pwm(&mut self, state: &PwmState) {
        let half = state.half_period();
        self.stage.set_duty_counters(PhaseCounters::splat(half / 2));
        self.stage.set_sampling_point(SamplingPoint::Dual {
            first: half.saturating_sub(1),
            second: half.saturating_sub(1),
        });
        self.next = Plan::default();
        self.sampled = Plan::default();
        self.stage.select_injected(InjectedChannels::Shunt);
        self.stage.enable_outputs();
    }

    fn switch_off_pwm(&mut self, _state: &PwmState) {
        self.stage.disable_outputs();
    }

    fn calibrate_offsets(&mut self, _state: &PwmState) {
        let [shunt, _] = average_conversions(&mut self.stage, InjectedChannels::Shunt);
        self.offsets = PhaseOffsets {
            a: shunt,
            b: shunt,
            c: shunt,
        };
    }

    fn turn_on_low_sides(&mut self, _state: &PwmState) {
        self.stage.set_duty_counters(PhaseCounters::splat(0));
        self.stage.enable_outputs();
    }

    fn is_over_current(&mut self) -> bool {
        core::mem::take(&mut self.over_current)
    }

    fn set_sampling_point(&mut self, state: &PwmState) -> Result<(), Fault> {
        let config = state.config();
        let modulation = state.modulation();
        let [low_phase, _, high_phase] = modulation.sector.duty_order();
        let min_window = config.min_sampling_window;

        self.next = Plan {
            first: (modulation.mid_duty.saturating_sub(modulation.high_duty) >= min_window)
                .then_some(high_phase),
            second: (modulation.low_duty.saturating_sub(modulation.mid_duty) >= min_window)
                .then_some(low_phase),
        };

        let last = state.half_period().saturating_sub(1);
        self.stage.set_sampling_point(SamplingPoint::Dual {
            first: modulation.high_duty.saturating_add(config.t_after).min(last),
            second: modulation.mid_duty.saturating_add(config.t_after).min(last),
        });
        self.stage.set_duty_counters(state.counters());
        check_deadline(&self.stage)
    }

    fn offsets(&self) -> PhaseOffsets {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: PhaseOffsets) {
        self.offsets = offsets;
    }

    fn timer_update(&mut self, _state: &PwmState) {
        self.sampled = self.next;
    }

    fn break_input(&mut self) {
        self.stage.disable_outputs();
        self.over_current = true;
    }
}
