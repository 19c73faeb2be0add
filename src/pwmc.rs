//! PWM & current feedback handle.
//!
//! [`PwmCurrentFeedback`] owns the control state of one inverter and the
//! [`SensingTopology`] bound to it. It is driven from three contexts:
//!
//! * the high frequency task, once per PWM period, calling
//!   [`get_phase_currents`](PwmCurrentFeedback::get_phase_currents) then
//!   [`set_phase_voltage`](PwmCurrentFeedback::set_phase_voltage);
//! * the timer update and break interrupts,
//!   [`timer_update`](PwmCurrentFeedback::timer_update) and
//!   [`break_input`](PwmCurrentFeedback::break_input);
//! * the slow task for start/stop, calibration and fault polling.
//!
//! The application serialises these, usually by keeping the handle behind a
//! critical section. Faults that have to be seen from another context go
//! through a shared [`FaultFlags`].

use crate::calibration::{CalibrationAction, CalibrationStep, OffsetCalibration};
use crate::config::PwmConfig;
use crate::error::{ConfigError, Fault};
use crate::estimator::CurrentEstimator;
use crate::fault::FaultFlags;
use crate::park_clarke::{
    RotatingReferenceFrame, ThreePhaseBalancedStationaryReferenceFrame,
    ThreePhaseStationaryReferenceFrame, TwoPhaseStationaryOrthogonalReferenceFrame,
};
use crate::pwm::{compensate_dead_time, PhaseCounters};
use crate::svpwm::{space_vector, Modulation, Sector};
use crate::topology::{PhaseOffsets, SensingTopology};

/// Control state shared with the sensing topology.
///
/// Topologies get a shared reference and read the timing, the last
/// modulation and the current estimates from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwmState {
    pub(crate) config: PwmConfig,
    pub(crate) sqrt3_period: i32,
    pub(crate) modulation: Modulation,
    pub(crate) dead_time_compensation: bool,
    pub(crate) dead_time_compensation_count: u16,
    pub(crate) dpwm: bool,
    pub(crate) currents: ThreePhaseStationaryReferenceFrame,
    pub(crate) estimated: ThreePhaseStationaryReferenceFrame,
    pub(crate) low_sides_on: bool,
}

impl PwmState {
    /// State for an already validated `config`, holding the zero vector.
    pub fn new(config: PwmConfig) -> Self {
        let sqrt3_period = config.sqrt3_period();
        Self {
            modulation: space_vector(
                TwoPhaseStationaryOrthogonalReferenceFrame::default(),
                config.pwm_period,
                sqrt3_period,
            ),
            sqrt3_period,
            dead_time_compensation: config.dead_time_compensation,
            dead_time_compensation_count: config.dead_time_compensation_count,
            dpwm: false,
            currents: ThreePhaseStationaryReferenceFrame::default(),
            estimated: ThreePhaseStationaryReferenceFrame::default(),
            low_sides_on: false,
            config,
        }
    }

    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    pub fn half_period(&self) -> u16 {
        self.config.half_period()
    }

    pub fn modulation(&self) -> &Modulation {
        &self.modulation
    }

    pub fn sector(&self) -> Sector {
        self.modulation.sector
    }

    /// Counters of the last modulation, dead-time compensation included.
    pub fn counters(&self) -> PhaseCounters {
        self.modulation.counters
    }

    /// Phase currents from the last [`PwmCurrentFeedback::get_phase_currents`].
    pub fn currents(&self) -> ThreePhaseStationaryReferenceFrame {
        self.currents
    }

    /// Phase currents from the last [`PwmCurrentFeedback::estimate_phase_currents`].
    pub fn estimated_currents(&self) -> ThreePhaseStationaryReferenceFrame {
        self.estimated
    }

    pub fn dpwm_mode(&self) -> bool {
        self.dpwm
    }

    pub fn dead_time_compensation(&self) -> Option<u16> {
        self.dead_time_compensation
            .then_some(self.dead_time_compensation_count)
    }

    pub fn turn_on_low_sides_action(&self) -> bool {
        self.low_sides_on
    }
}

pub struct PwmCurrentFeedback<S> {
    state: PwmState,
    sensing: S,
    estimator: CurrentEstimator,
    calibration: OffsetCalibration,
    faults: Option<&'static FaultFlags>,
}

impl<S: SensingTopology> PwmCurrentFeedback<S> {
    pub fn new(config: PwmConfig, sensing: S) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            error!("rejected PWM configuration: {}", e);
            return Err(e);
        }
        debug!(
            "PWM period {} ticks, dead time {} ticks",
            config.pwm_period,
            config.dead_time
        );
        Ok(Self {
            estimator: CurrentEstimator::new(config.lpf_time_constant),
            calibration: OffsetCalibration::new(config.offset_calibration_wait_ticks),
            state: PwmState::new(config),
            sensing,
            faults: None,
        })
    }

    /// Mirrors every reported fault into `flags`, for tasks that do not own
    /// the handle.
    pub fn with_fault_flags(mut self, flags: &'static FaultFlags) -> Self {
        self.faults = Some(flags);
        self
    }

    pub fn state(&self) -> &PwmState {
        &self.state
    }

    pub fn sensing(&self) -> &S {
        &self.sensing
    }

    pub fn sensing_mut(&mut self) -> &mut S {
        &mut self.sensing
    }

    /// Forgets measured and estimated currents.
    pub fn clear(&mut self) {
        self.state.currents = ThreePhaseStationaryReferenceFrame::default();
        self.state.estimated = ThreePhaseStationaryReferenceFrame::default();
        self.estimator.reset();
    }

    /// Modulates `voltage` and hands the counters to the power stage.
    ///
    /// `voltage` is oriented like [`clarke`](crate::park_clarke::clarke) and
    /// [`inverse_park`](crate::park_clarke::inverse_park) outputs, a positive
    /// beta leading phase B. Beta is mirrored into the orientation of
    /// [`space_vector`] before modulation.
    ///
    /// Dead-time compensation, when enabled, uses the currents measured by
    /// the previous [`Self::get_phase_currents`].
    pub fn set_phase_voltage(
        &mut self,
        voltage: TwoPhaseStationaryOrthogonalReferenceFrame,
    ) -> Result<(), Fault> {
        let state = &mut self.state;
        let stage_voltage = TwoPhaseStationaryOrthogonalReferenceFrame {
            alpha: voltage.alpha,
            beta: voltage.beta.saturating_neg(),
        };
        let mut modulation =
            space_vector(stage_voltage, state.config.pwm_period, state.sqrt3_period);
        if state.dead_time_compensation {
            modulation.counters = compensate_dead_time(
                modulation.counters,
                &state.currents,
                state.dead_time_compensation_count,
                state.config.half_period(),
            );
        }
        trace!(
            "sector {} counters {} {} {}",
            modulation.sector.number(),
            modulation.counters.a,
            modulation.counters.b,
            modulation.counters.c
        );
        state.modulation = modulation;

        self.sensing
            .set_sampling_point(&self.state)
            .map_err(|fault| self.report(fault))
    }

    /// Reads the phase currents sampled during the last PWM period.
    pub fn get_phase_currents(&mut self) -> ThreePhaseBalancedStationaryReferenceFrame {
        let currents = self.sensing.get_phase_currents(&self.state);
        self.state.currents = currents.complete();
        currents
    }

    /// Rebuilds the phase currents from a `d`/`q` pair in phase units.
    ///
    /// The result also becomes [`PwmState::estimated_currents`] for the
    /// topologies that fill in unmeasured phases.
    pub fn estimate_phase_currents(
        &mut self,
        current: RotatingReferenceFrame,
        electrical_angle: i32,
    ) -> ThreePhaseStationaryReferenceFrame {
        let estimated = self.estimator.estimate(current, electrical_angle);
        self.state.estimated = estimated;
        estimated
    }

    pub fn switch_on_pwm(&mut self) {
        debug!("PWM on");
        self.state.low_sides_on = false;
        self.sensing.switch_on_pwm(&self.state);
    }

    pub fn switch_off_pwm(&mut self) {
        debug!("PWM off");
        self.state.low_sides_on = false;
        self.sensing.switch_off_pwm(&self.state);
    }

    /// Advances the offset calibration.
    ///
    /// [`CalibrationAction::Start`] switches the PWM off first. Returns
    /// `true` once the offsets have been measured.
    pub fn current_reading_calibration(&mut self, action: CalibrationAction) -> bool {
        if action == CalibrationAction::Start {
            info!(
                "offset calibration started, waiting {} ticks",
                self.calibration.wait_ticks()
            );
            self.switch_off_pwm();
        }
        let step = self.calibration.step(action);
        if step == CalibrationStep::ReadOffsets {
            self.sensing.calibrate_offsets(&self.state);
            let offsets = self.sensing.offsets();
            info!(
                "offset calibration done: {} {} {}",
                offsets.a,
                offsets.b,
                offsets.c
            );
        }
        step.is_complete()
    }

    pub fn turn_on_low_sides(&mut self) {
        debug!("low sides on");
        self.sensing.turn_on_low_sides(&self.state);
        self.state.low_sides_on = true;
    }

    pub fn turn_on_low_sides_action(&self) -> bool {
        self.state.low_sides_on
    }

    /// Whether an over-current happened since the last call.
    pub fn over_current_occurred(&mut self) -> bool {
        self.sensing.is_over_current()
    }

    pub fn check_over_current(&mut self) -> Result<(), Fault> {
        if self.over_current_occurred() {
            Err(Fault::OverCurrent)
        } else {
            Ok(())
        }
    }

    pub fn enable_dpwm(&mut self) {
        self.state.dpwm = true;
    }

    pub fn disable_dpwm(&mut self) {
        self.state.dpwm = false;
    }

    pub fn dpwm_mode(&self) -> bool {
        self.state.dpwm
    }

    pub fn enable_dead_time_compensation(&mut self) {
        self.state.dead_time_compensation = true;
    }

    pub fn disable_dead_time_compensation(&mut self) {
        self.state.dead_time_compensation = false;
    }

    /// Counts added to or removed from each phase counter, at most one
    /// below half a period.
    pub fn set_dead_time_compensation_count(&mut self, count: u16) {
        let ceiling = self.state.config.half_period().saturating_sub(1);
        self.state.dead_time_compensation_count = count.min(ceiling);
    }

    pub fn enable_rl_detection(&mut self) {
        self.sensing.enable_rl_detection(&self.state);
    }

    pub fn disable_rl_detection(&mut self) {
        self.sensing.disable_rl_detection(&self.state);
    }

    pub fn set_rl_detection_duty(&mut self, duty: u16) -> Result<(), Fault> {
        self.sensing
            .set_rl_detection_duty(&self.state, duty)
            .map_err(|fault| self.report(fault))
    }

    pub fn set_ocp_reference_voltage(&mut self, vref: u16) {
        self.sensing.set_ocp_reference_voltage(vref);
    }

    pub fn offsets(&self) -> PhaseOffsets {
        self.sensing.offsets()
    }

    pub fn set_offsets(&mut self, offsets: PhaseOffsets) {
        self.sensing.set_offsets(offsets);
    }

    /// Timer update interrupt entry point.
    pub fn timer_update(&mut self) {
        self.sensing.timer_update(&self.state);
    }

    /// Break (over-current) interrupt entry point.
    pub fn break_input(&mut self) {
        self.sensing.break_input();
        self.report(Fault::OverCurrent);
    }

    fn report(&self, fault: Fault) -> Fault {
        warn!("{}", fault);
        if let Some(flags) = self.faults {
            flags.raise(fault);
        }
        fault
    }
}
