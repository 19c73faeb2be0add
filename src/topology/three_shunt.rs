use crate::error::Fault;
use crate::park_clarke::ThreePhaseBalancedStationaryReferenceFrame;
use crate::power_stage::{InjectedChannels, PowerStage, SamplingPoint, TriggerEdge};
use crate::pwm::{Phase, PhaseCounters};
use crate::pwmc::PwmState;
use crate::saturate_i16;
use crate::svpwm::Sector;

use super::{average_conversions, check_deadline, phase_current, PhaseOffsets, SensingTopology};

/// One shunt per leg, two of them converted each period.
///
/// When the duty cycles leave enough room around the centre of the period
/// every leg is measurable and phases A and B are sampled there. Otherwise
/// the phase with the widest duty cycle has too short a low side pulse and
/// the other two are sampled on an edge chosen to stay clear of the
/// switching noise.
pub struct ThreeShunt<P> {
    stage: P,
    offsets: PhaseOffsets,
    /// Pair programmed for the next period.
    next: (Phase, Phase),
    /// Pair whose results are in the injected registers.
    sampled: (Phase, Phase),
    over_current: bool,
}

impl<P: PowerStage> ThreeShunt<P> {
    pub fn new(stage: P) -> Self {
        Self {
            stage,
            offsets: PhaseOffsets::default(),
            next: (Phase::A, Phase::B),
            sampled: (Phase::A, Phase::B),
            over_current: false,
        }
    }

    pub fn stage(&self) -> &P {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut P {
        &mut self.stage
    }

    fn offset(&self, phase: Phase) -> i32 {
        match phase {
            Phase::A => self.offsets.a,
            Phase::B => self.offsets.b,
            Phase::C => self.offsets.c,
        }
    }

    fn write(&mut self, counters: PhaseCounters, point: SamplingPoint) -> Result<(), Fault> {
        self.stage.set_sampling_point(point);
        self.stage.set_duty_counters(counters);
        check_deadline(&self.stage)
    }
}

/// Sampling instant and measured pair for the modulation in `state`.
fn sampling_plan(state: &PwmState) -> (SamplingPoint, (Phase, Phase)) {
    let config = state.config();
    let half = state.half_period() as i32;
    let modulation = state.modulation();
    let low = modulation.low_duty as i32;
    let mid = modulation.mid_duty as i32;

    if half - low > config.t_after as i32 {
        let point = SamplingPoint::Single {
            count: (half - 1).max(0) as u16,
            edge: TriggerEdge::Rising,
        };
        return (point, (Phase::A, Phase::B));
    }

    let pair = match modulation.sector {
        Sector::Four | Sector::Five => (Phase::A, Phase::B),
        Sector::Six | Sector::One => (Phase::B, Phase::C),
        Sector::Two | Sector::Three => (Phase::A, Phase::C),
    };

    let point = if low - mid > 2 * (half - low) {
        SamplingPoint::Single {
            count: (low - config.t_before as i32).clamp(0, half) as u16,
            edge: TriggerEdge::Rising,
        }
    } else {
        let count = low + config.t_after as i32;
        if count >= half {
            SamplingPoint::Single {
                count: (2 * half - count - 1).clamp(0, half) as u16,
                edge: TriggerEdge::Falling,
            }
        } else {
            SamplingPoint::Single {
                count: count as u16,
                edge: TriggerEdge::Rising,
            }
        }
    };
    (point, pair)
}

impl<P: PowerStage> SensingTopology for ThreeShunt<P> {
    fn get_phase_currents(&mut self, _state: &PwmState) -> ThreePhaseBalancedStationaryReferenceFrame {
        let [first_raw, second_raw] = self.stage.injected_results();
        let (first, second) = self.sampled;
        let first_current = phase_current(self.offset(first), first_raw);
        let second_current = phase_current(self.offset(second), second_raw);
        let missing = saturate_i16(-(first_current as i32) - second_current as i32);

        let mut currents = [0i16; 3];
        currents[first as usize] = first_current;
        currents[second as usize] = second_current;
        for phase in [Phase::A, Phase::B, Phase::C] {
            if phase != first && phase != second {
                currents[phase as usize] = missing;
            }
        }
        ThreePhaseBalancedStationaryReferenceFrame {
            a: currents[0],
            b: currents[1],
        }
    }

    fn switch_on_pwm(&mut self, state: &PwmState) {
        let half = state.half_period();
        self.stage.set_duty_counters(PhaseCounters::splat(half / 2));
        self.stage.set_sampling_point(SamplingPoint::Single {
            count: half.saturating_sub(5),
            edge: TriggerEdge::Rising,
        });
        self.next = (Phase::A, Phase::B);
        self.sampled = self.next;
        self.stage.select_injected(InjectedChannels::Phases(Phase::A, Phase::B));
        self.stage.enable_outputs();
    }

    fn switch_off_pwm(&mut self, _state: &PwmState) {
        self.stage.disable_outputs();
    }

    fn calibrate_offsets(&mut self, _state: &PwmState) {
        let [a, b] = average_conversions(&mut self.stage, InjectedChannels::Phases(Phase::A, Phase::B));
        let [c, _] = average_conversions(&mut self.stage, InjectedChannels::Phases(Phase::C, Phase::A));
        self.offsets = PhaseOffsets { a, b, c };
        self.stage.select_injected(InjectedChannels::Phases(Phase::A, Phase::B));
    }

    fn turn_on_low_sides(&mut self, _state: &PwmState) {
        self.stage.set_duty_counters(PhaseCounters::splat(0));
        self.stage.enable_outputs();
    }

    fn is_over_current(&mut self) -> bool {
        core::mem::take(&mut self.over_current)
    }

    fn set_sampling_point(&mut self, state: &PwmState) -> Result<(), Fault> {
        let (point, pair) = sampling_plan(state);
        self.next = pair;
        self.write(state.counters(), point)
    }

    fn offsets(&self) -> PhaseOffsets {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: PhaseOffsets) {
        self.offsets = offsets;
    }

    fn enable_rl_detection(&mut self, _state: &PwmState) {
        self.stage.set_rl_detection(true);
    }

    fn disable_rl_detection(&mut self, _state: &PwmState) {
        self.stage.set_rl_detection(false);
    }

    fn set_rl_detection_duty(&mut self, state: &PwmState, duty: u16) -> Result<(), Fault> {
        let counters = PhaseCounters {
            a: duty.min(state.half_period()),
            b: 0,
            c: 0,
        };
        self.next = (Phase::A, Phase::B);
        let point = SamplingPoint::Single {
            count: counters.a / 2,
            edge: TriggerEdge::Rising,
        };
        self.write(counters, point)
    }

    fn set_ocp_reference_voltage(&mut self, vref: u16) {
        self.stage.set_ocp_reference(vref);
    }

    fn timer_update(&mut self, _state: &PwmState) {
        if self.next != self.sampled {
            self.stage.select_injected(InjectedChannels::Phases(self.next.0, self.next.1));
        }
        self.sampled = self.next;
    }

    fn break_input(&mut self) {
        self.stage.disable_outputs();
        self.over_current = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PwmConfig;
    use crate::mock::MockPowerStage;
    use crate::svpwm::Modulation;

    fn state_with(sector: Sector, low: u16, mid: u16, high: u16) -> PwmState {
        let mut state = PwmState::new(PwmConfig::default());
        state.modulation = Modulation {
            sector,
            low_duty: low,
            mid_duty: mid,
            high_duty: high,
            counters: PhaseCounters { a: low, b: mid, c: high },
        };
        state
    }

    #[test]
    fn small_duty_samples_at_centre() {
        let state = state_with(Sector::One, 1200, 1000, 800);
        let (point, pair) = sampling_plan(&state);
        assert_eq!(
            point,
            SamplingPoint::Single { count: 2099, edge: TriggerEdge::Rising }
        );
        assert_eq!(pair, (Phase::A, Phase::B));
    }

    #[test]
    fn wide_duty_drops_the_low_phase() {
        let cases = [
            (Sector::One, (Phase::B, Phase::C)),
            (Sector::Two, (Phase::A, Phase::C)),
            (Sector::Three, (Phase::A, Phase::C)),
            (Sector::Four, (Phase::A, Phase::B)),
            (Sector::Five, (Phase::A, Phase::B)),
            (Sector::Six, (Phase::B, Phase::C)),
        ];
        for (sector, expected) in cases {
            let (_, pair) = sampling_plan(&state_with(sector, 2000, 1000, 500));
            assert_eq!(pair, expected, "{sector:?}");
        }
    }

    #[test]
    fn wide_gap_samples_before_the_low_edge() {
        // low - mid = 1000 > 2 * (2100 - 2000)
        let (point, _) = sampling_plan(&state_with(Sector::One, 2000, 1000, 500));
        assert_eq!(
            point,
            SamplingPoint::Single { count: 2000 - 130, edge: TriggerEdge::Rising }
        );
    }

    #[test]
    fn narrow_gap_samples_after_the_low_edge_on_the_way_down() {
        // low - mid = 100 <= 2 * (2100 - 2000), 2000 + 302 passes the reload
        let (point, _) = sampling_plan(&state_with(Sector::One, 2000, 1900, 1800));
        assert_eq!(
            point,
            SamplingPoint::Single { count: 2 * 2100 - 2302 - 1, edge: TriggerEdge::Falling }
        );
    }

    #[test]
    fn degenerate_period_stays_in_range() {
        let state = PwmState::new(PwmConfig {
            pwm_period: 0,
            t_after: 0,
            ..PwmConfig::default()
        });
        let (point, _) = sampling_plan(&state);
        assert_eq!(point, SamplingPoint::Single { count: 0, edge: TriggerEdge::Falling });
    }

    #[test]
    fn late_write_is_reported() {
        let state = state_with(Sector::One, 1200, 1000, 800);
        let mut shunts = ThreeShunt::new(MockPowerStage::new());
        assert_eq!(shunts.set_sampling_point(&state), Ok(()));
        assert_eq!(shunts.stage().counters, PhaseCounters { a: 1200, b: 1000, c: 800 });

        shunts.stage_mut().update_pending = true;
        assert_eq!(shunts.set_sampling_point(&state), Err(Fault::DurationExceeded));
    }

    #[test]
    fn pair_switches_at_the_next_update() {
        let state = state_with(Sector::Six, 2000, 1000, 500);
        let mut shunts = ThreeShunt::new(MockPowerStage::new());
        shunts.set_offsets(PhaseOffsets { a: 32000, b: 32000, c: 32000 });
        shunts.set_sampling_point(&state).unwrap();

        // Still reading A and B from the running period.
        shunts.stage_mut().results = [31000, 32500];
        let currents = shunts.get_phase_currents(&state);
        assert_eq!(currents, ThreePhaseBalancedStationaryReferenceFrame { a: 1000, b: -500 });

        shunts.timer_update(&state);
        assert_eq!(
            shunts.stage().channels,
            Some(InjectedChannels::Phases(Phase::B, Phase::C))
        );
        // B = -500, C = -700, A rebuilt from the other two.
        shunts.stage_mut().results = [32500, 32700];
        let currents = shunts.get_phase_currents(&state);
        assert_eq!(currents, ThreePhaseBalancedStationaryReferenceFrame { a: 1200, b: -500 });
    }

    #[test]
    fn calibration_averages_each_leg() {
        let state = PwmState::new(PwmConfig::default());
        let mut shunts = ThreeShunt::new(MockPowerStage::new());
        shunts.stage_mut().conversion = [32010, 32020];
        shunts.calibrate_offsets(&state);
        assert_eq!(shunts.offsets(), PhaseOffsets { a: 32010, b: 32020, c: 32010 });
        assert_eq!(shunts.stage().conversions, 32);
    }

    #[test]
    fn break_latches_until_read() {
        let state = PwmState::new(PwmConfig::default());
        let mut shunts = ThreeShunt::new(MockPowerStage::new());
        shunts.switch_on_pwm(&state);
        assert!(shunts.stage().outputs_enabled);
        assert_eq!(shunts.stage().counters, PhaseCounters::splat(1050));

        shunts.break_input();
        assert!(!shunts.stage().outputs_enabled);
        assert!(shunts.is_over_current());
        assert!(!shunts.is_over_current());
    }

    #[test]
    fn low_sides_and_rl_detection() {
        let state = PwmState::new(PwmConfig::default());
        let mut shunts = ThreeShunt::new(MockPowerStage::new());
        shunts.turn_on_low_sides(&state);
        assert_eq!(shunts.stage().counters, PhaseCounters::splat(0));
        assert!(shunts.stage().outputs_enabled);

        shunts.enable_rl_detection(&state);
        assert!(shunts.stage().rl_detection);
        assert_eq!(shunts.set_rl_detection_duty(&state, 5000), Ok(()));
        assert_eq!(shunts.stage().counters, PhaseCounters { a: 2100, b: 0, c: 0 });
        assert_eq!(
            shunts.stage().sampling_point,
            Some(SamplingPoint::Single { count: 1050, edge: TriggerEdge::Rising })
        );
        shunts.disable_rl_detection(&state);
        assert!(!shunts.stage().rl_detection);

        shunts.set_ocp_reference_voltage(30000);
        assert_eq!(shunts.stage().ocp_reference, Some(30000));
    }
}
