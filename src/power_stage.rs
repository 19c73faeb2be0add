//! Hardware seam between the sensing topologies and the timer/ADC pair.
//!
//! Implementations wrap the advanced control timer driving the three
//! inverter legs and the ADC(s) measuring the shunt amplifiers. Nothing here
//! blocks except [`PowerStage::convert_injected`], which is only used while
//! the outputs are off.

use crate::pwm::{Phase, PhaseCounters};

/// Edge of the centre aligned count a compare trigger fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerEdge {
    /// Counting up, before the reload.
    Rising,
    /// Counting down, after the reload.
    Falling,
}

/// Where the injected conversions of the next period are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingPoint {
    /// One trigger on the sampling compare channel.
    Single { count: u16, edge: TriggerEdge },
    /// Two triggers in the same period, both on the rising edge.
    Dual { first: u16, second: u16 },
    /// The timer update event itself.
    UpdateEvent,
}

/// Injected channel sequence for the next conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InjectedChannels {
    /// Two phase amplifiers, converted in this order.
    Phases(Phase, Phase),
    /// The DC link shunt amplifier, converted twice.
    Shunt,
}

pub trait PowerStage {
    /// Preloads the compare registers, applied at the next update event.
    fn set_duty_counters(&mut self, counters: PhaseCounters);

    fn set_sampling_point(&mut self, point: SamplingPoint);

    /// Whether the timer latched a new period since the last update
    /// interrupt was serviced.
    fn update_pending(&self) -> bool;

    fn enable_outputs(&mut self);

    fn disable_outputs(&mut self);

    fn select_injected(&mut self, channels: InjectedChannels);

    /// Raw results of the last triggered injected conversion, left aligned.
    fn injected_results(&self) -> [u16; 2];

    /// Software triggered conversion of the selected channels.
    fn convert_injected(&mut self) -> [u16; 2];

    fn set_rl_detection(&mut self, enable: bool);

    /// Threshold of the over-current comparators, `0..=u16::MAX` spanning
    /// the DAC reference. Stages with a fixed threshold ignore it.
    fn set_ocp_reference(&mut self, _vref: u16) {}
}
