use std::sync::atomic::{AtomicU32, Ordering};

/// Tracks which pins currently keep their requested output level in the
/// output-enable register instead of the output-value register.
///
/// Bit `p` is set iff pin `p` is in an open-drain or quasi-bidirectional
/// mode. Only the mode-transition engine changes the mask; the output driver
/// takes a snapshot to partition its masked register writes. Callers pass
/// valid pin numbers; validation happens one layer up.
#[derive(Debug)]
pub(crate) struct DrainMask {
    bits: AtomicU32,
}

impl DrainMask {
    pub(crate) const fn new() -> DrainMask {
        DrainMask {
            bits: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(crate) fn is_virtual(&self, pin: u8) -> bool {
        self.bits.load(Ordering::SeqCst) & (1 << pin) != 0
    }

    #[inline]
    pub(crate) fn set_virtual(&self, pin: u8) {
        self.bits.fetch_or(1 << pin, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn clear_virtual(&self, pin: u8) {
        self.bits.fetch_and(!(1 << pin), Ordering::SeqCst);
    }

    /// Returns the whole mask in one load, for mask-partitioned writes.
    #[inline]
    pub(crate) fn mask(&self) -> u32 {
        self.bits.load(Ordering::SeqCst)
    }
}
