//! Power stage and current sampling parameters.

use crate::error::ConfigError;
use crate::filter::LowPassFilter;
use crate::SQRT3FACTOR;

/// Timing and tuning constants of one inverter leg set.
///
/// All durations are expressed in advanced-timer ticks. The timer counts up
/// and down, so the compare registers live in `0..=pwm_period / 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PwmConfig {
    /// Full PWM period.
    pub pwm_period: u16,
    /// Dead time inserted between complementary switches.
    pub dead_time: u16,
    /// Rise time of the current sensing amplifier.
    pub t_rise: u16,
    /// Ringing that follows a commutation.
    pub t_noise: u16,
    /// ADC sampling time.
    pub t_sampling: u16,
    /// Delay between a commutation and a safe sampling instant.
    pub t_after: u16,
    /// Lead needed to finish sampling before a commutation.
    pub t_before: u16,
    /// Shortest active vector a single shunt can be sampled in.
    pub min_sampling_window: u16,
    pub dead_time_compensation: bool,
    /// Counts added to or removed from a phase counter by the compensation.
    pub dead_time_compensation_count: u16,
    /// Time constant of the Id/Iq low-pass filters used by the estimator.
    pub lpf_time_constant: i32,
    /// Ticks to wait for the amplifiers to settle before reading offsets.
    pub offset_calibration_wait_ticks: u16,
}

impl PwmConfig {
    /// Compare register value matching the top of the up/down count.
    pub const fn half_period(&self) -> u16 {
        self.pwm_period / 2
    }

    /// `period * sqrt(3) * 2` in the scale used by the alpha projection of
    /// the space vector modulation.
    pub const fn sqrt3_period(&self) -> i32 {
        ((self.pwm_period as u32 * SQRT3FACTOR as u32) / 16384) as i32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pwm_period == 0 || self.pwm_period % 2 != 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        let half = self.half_period();
        let margins = [
            self.t_after,
            self.t_before,
            self.min_sampling_window,
            self.dead_time,
        ];
        if margins.iter().any(|&m| m >= half) {
            return Err(ConfigError::MarginTooLarge);
        }
        if self.dead_time_compensation_count >= half {
            return Err(ConfigError::CompensationTooLarge);
        }
        if !(0..=LowPassFilter::MAX_TIME_CONSTANT).contains(&self.lpf_time_constant) {
            return Err(ConfigError::InvalidFilterConstant);
        }
        Ok(())
    }
}

impl Default for PwmConfig {
    /// 20 kHz switching from an 84 MHz timer clock.
    fn default() -> Self {
        let dead_time = 84;
        let t_rise = 218;
        let t_noise = 84;
        let t_sampling = 60;
        Self {
            pwm_period: 4200,
            dead_time,
            t_rise,
            t_noise,
            t_sampling,
            t_after: dead_time + if t_rise > t_noise { t_rise } else { t_noise },
            t_before: 2 * t_sampling + 10,
            min_sampling_window: t_sampling + dead_time + t_rise,
            dead_time_compensation: false,
            dead_time_compensation_count: dead_time / 2,
            lpf_time_constant: 16383,
            offset_calibration_wait_ticks: 40,
        }
    }
}
