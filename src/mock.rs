//! Recording [`PowerStage`] for host tests.

use crate::power_stage::{InjectedChannels, PowerStage, SamplingPoint};
use crate::pwm::PhaseCounters;

/// Records everything written to it and replays queued conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPowerStage {
    pub counters: PhaseCounters,
    pub counter_writes: usize,
    pub sampling_point: Option<SamplingPoint>,
    pub outputs_enabled: bool,
    pub channels: Option<InjectedChannels>,
    pub rl_detection: bool,
    pub ocp_reference: Option<u16>,
    /// Returned by [`PowerStage::update_pending`].
    pub update_pending: bool,
    /// Returned by [`PowerStage::injected_results`].
    pub results: [u16; 2],
    /// Returned by every [`PowerStage::convert_injected`].
    pub conversion: [u16; 2],
    pub conversions: usize,
}

impl MockPowerStage {
    pub const fn new() -> Self {
        Self {
            counters: PhaseCounters::splat(0),
            counter_writes: 0,
            sampling_point: None,
            outputs_enabled: false,
            channels: None,
            rl_detection: false,
            ocp_reference: None,
            update_pending: false,
            results: [0; 2],
            conversion: [0; 2],
            conversions: 0,
        }
    }
}

impl Default for MockPowerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerStage for MockPowerStage {
    fn set_duty_counters(&mut self, counters: PhaseCounters) {
        self.counters = counters;
        self.counter_writes += 1;
    }

    fn set_sampling_point(&mut self, point: SamplingPoint) {
        self.sampling_point = Some(point);
    }

    fn update_pending(&self) -> bool {
        self.update_pending
    }

    fn enable_outputs(&mut self) {
        self.outputs_enabled = true;
    }

    fn disable_outputs(&mut self) {
        self.outputs_enabled = false;
    }

    fn select_injected(&mut self, channels: InjectedChannels) {
        self.channels = Some(channels);
    }

    fn injected_results(&self) -> [u16; 2] {
        self.results
    }

    fn convert_injected(&mut self) -> [u16; 2] {
        self.conversions += 1;
        self.conversion
    }

    fn set_rl_detection(&mut self, enable: bool) {
        self.rl_detection = enable;
    }

    fn set_ocp_reference(&mut self, vref: u16) {
        self.ocp_reference = Some(vref);
    }
}
