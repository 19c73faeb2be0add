//! Current sensor offset calibration sequencing.

/// Request passed to [`OffsetCalibration::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationAction {
    /// Arm the wait counter. Reads the offsets right away when no wait is
    /// configured.
    Start,
    /// Advance the wait by one tick.
    Exec,
}

/// What the caller has to do after a [`OffsetCalibration::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationStep {
    /// Still settling.
    Waiting,
    /// The wait just ran out: measure the offsets now. The sequence is
    /// complete afterwards.
    ReadOffsets,
    /// Nothing left to do.
    Done,
}

impl CalibrationStep {
    /// Whether the calibration is finished once this step has been handled.
    pub const fn is_complete(self) -> bool {
        !matches!(self, CalibrationStep::Waiting)
    }
}

/// Counts down the settling time before offsets are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetCalibration {
    wait_ticks: u16,
    remaining: u16,
}

impl OffsetCalibration {
    pub const fn new(wait_ticks: u16) -> Self {
        Self {
            wait_ticks,
            remaining: 0,
        }
    }

    pub fn step(&mut self, action: CalibrationAction) -> CalibrationStep {
        match action {
            CalibrationAction::Start => {
                self.remaining = self.wait_ticks;
                if self.remaining == 0 {
                    CalibrationStep::ReadOffsets
                } else {
                    CalibrationStep::Waiting
                }
            }
            CalibrationAction::Exec => match self.remaining {
                0 => CalibrationStep::Done,
                1 => {
                    self.remaining = 0;
                    CalibrationStep::ReadOffsets
                }
                _ => {
                    self.remaining -= 1;
                    CalibrationStep::Waiting
                }
            },
        }
    }

    pub const fn remaining(&self) -> u16 {
        self.remaining
    }

    pub const fn wait_ticks(&self) -> u16 {
        self.wait_ticks
    }
}
