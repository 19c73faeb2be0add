use fixed::types::I17F15;

/// First order low-pass filter on a Q15 accumulator.
///
/// Each tick moves the accumulator by `(input - output) * time_constant`,
/// so `time_constant` is the fraction of the error removed per tick in units
/// of `1/32768`. Zero freezes the output, [`Self::MAX_TIME_CONSTANT`] tracks
/// the input almost immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowPassFilter {
    accumulator: I17F15,
    time_constant: i32,
}

impl LowPassFilter {
    pub const MAX_TIME_CONSTANT: i32 = i16::MAX as i32;

    pub fn new(initial: i16, time_constant: i32) -> Self {
        Self {
            accumulator: I17F15::from_num(initial),
            time_constant: time_constant.clamp(0, Self::MAX_TIME_CONSTANT),
        }
    }

    /// Steps the filter towards `input`. The accumulator saturates at the
    /// `I17F15` range instead of wrapping.
    pub fn filter(&mut self, input: i32) -> i32 {
        let error = input.saturating_sub(self.output());
        self.accumulator = self
            .accumulator
            .saturating_add(I17F15::from_bits(error.saturating_mul(self.time_constant)));
        self.output()
    }

    /// Integer part of the accumulator, rounded towards negative infinity.
    pub fn output(&self) -> i32 {
        self.accumulator.to_bits() >> I17F15::FRAC_NBITS
    }

    pub fn time_constant(&self) -> i32 {
        self.time_constant
    }

    pub fn set_time_constant(&mut self, time_constant: i32) {
        self.time_constant = time_constant.clamp(0, Self::MAX_TIME_CONSTANT);
    }

    pub fn reset(&mut self) {
        self.accumulator = I17F15::ZERO;
    }
}
