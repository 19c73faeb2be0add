//! Fault latch shared between interrupt contexts.

use core::cell::Cell;

use critical_section::Mutex;

use crate::error::Fault;

/// Latched fault bits, see [`Fault::code`].
///
/// The high frequency task and the break interrupt raise faults while the
/// slow task collects them. Every access goes through a critical section,
/// so a single instance can live in a `static`.
pub struct FaultFlags {
    bits: Mutex<Cell<u16>>,
}

impl FaultFlags {
    pub const fn new() -> Self {
        Self {
            bits: Mutex::new(Cell::new(0)),
        }
    }

    pub fn raise(&self, fault: Fault) {
        critical_section::with(|cs| {
            let bits = self.bits.borrow(cs);
            bits.set(bits.get() | fault.code());
        });
    }

    /// Returns the latched bits and clears them.
    pub fn take(&self) -> u16 {
        critical_section::with(|cs| self.bits.borrow(cs).replace(0))
    }

    pub fn peek(&self) -> u16 {
        critical_section::with(|cs| self.bits.borrow(cs).get())
    }

    pub fn is_set(&self, fault: Fault) -> bool {
        self.peek() & fault.code() != 0
    }

    /// Clears one fault, leaving the others latched.
    pub fn clear(&self, fault: Fault) {
        critical_section::with(|cs| {
            let bits = self.bits.borrow(cs);
            bits.set(bits.get() & !fault.code());
        });
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FaultFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FaultFlags({:#06x})", self.peek())
    }
}
