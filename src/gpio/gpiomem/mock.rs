//! In-memory register bank for tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::gpio::{Bias, Level, Mode};

use super::SioRegisters;

// Width of the OUT/OE/IN bit groups.
const BANK_WIDTH: usize = 32;

const FSEL_SIO: u32 = 5;
const FSEL_NULL: u32 = 0x1f;

const PADS_IN_ENABLE_MASK: u32 = 0x40;
const PADS_OUT_DISABLE_MASK: u32 = 0x80;
const PADS_BIAS_MASK: u32 = 0x0c;
const PADS_BIAS_LSB: u32 = 2;
const PADS_BIAS_DOWN: u32 = 1;
const PADS_BIAS_UP: u32 = 2;

#[derive(Debug)]
struct Inner {
    out: AtomicU32,
    oe: AtomicU32,
    // Externally driven levels, overriding the pulls on undriven pins.
    ext_mask: AtomicU32,
    ext_levels: AtomicU32,
    pads: [AtomicU32; BANK_WIDTH],
    funcsel: [AtomicU32; BANK_WIDTH],
    writes: AtomicUsize,
    unsupported: Vec<Mode>,
}

/// Register-accurate stand-in for the SIO bank.
///
/// Clones share the same registers, so a test can hand one clone to
/// [`Gpio`] and keep another to inspect register state or simulate the
/// world outside the pad.
///
/// [`Gpio`]: ../../struct.Gpio.html
#[derive(Debug, Clone)]
pub(crate) struct MockRegisters {
    inner: Arc<Inner>,
}

impl MockRegisters {
    pub(crate) fn new() -> MockRegisters {
        Self::with_unsupported(&[])
    }

    /// A variant that refuses the given modes, like a hardware target
    /// without them would.
    pub(crate) fn with_unsupported(modes: &[Mode]) -> MockRegisters {
        MockRegisters {
            inner: Arc::new(Inner {
                out: AtomicU32::new(0),
                oe: AtomicU32::new(0),
                ext_mask: AtomicU32::new(0),
                ext_levels: AtomicU32::new(0),
                pads: init_array!(AtomicU32::new(0), BANK_WIDTH),
                funcsel: init_array!(AtomicU32::new(FSEL_NULL), BANK_WIDTH),
                writes: AtomicUsize::new(0),
                unsupported: modes.to_vec(),
            }),
        }
    }

    /// Drives the line from outside the pad. Only visible on pins whose
    /// output driver is disabled.
    pub(crate) fn set_level(&self, pin: u8, level: Level) {
        self.inner.ext_mask.fetch_or(1 << pin, Ordering::SeqCst);
        match level {
            Level::High => self.inner.ext_levels.fetch_or(1 << pin, Ordering::SeqCst),
            Level::Low => self.inner.ext_levels.fetch_and(!(1 << pin), Ordering::SeqCst),
        };
    }

    /// Number of mutating register accesses since construction.
    pub(crate) fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn out(&self) -> u32 {
        self.inner.out.load(Ordering::SeqCst)
    }

    pub(crate) fn oe(&self) -> u32 {
        self.inner.oe.load(Ordering::SeqCst)
    }

    fn count_write(&self) {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn pad_bias(&self, pin: u8) -> Bias {
        let pad = self.inner.pads[pin as usize].load(Ordering::SeqCst);

        match (pad & PADS_BIAS_MASK) >> PADS_BIAS_LSB {
            PADS_BIAS_DOWN => Bias::PullDown,
            PADS_BIAS_UP => Bias::PullUp,
            _ => Bias::Off,
        }
    }
}

impl SioRegisters for MockRegisters {
    fn supports(&self, mode: Mode) -> bool {
        !self.inner.unsupported.contains(&mode)
    }

    fn out(&self) -> u32 {
        MockRegisters::out(self)
    }

    fn set_out(&self, mask: u32) {
        self.count_write();
        self.inner.out.fetch_or(mask, Ordering::SeqCst);
    }

    fn clr_out(&self, mask: u32) {
        self.count_write();
        self.inner.out.fetch_and(!mask, Ordering::SeqCst);
    }

    fn xor_out(&self, mask: u32) {
        self.count_write();
        self.inner.out.fetch_xor(mask, Ordering::SeqCst);
    }

    fn oe(&self) -> u32 {
        MockRegisters::oe(self)
    }

    fn set_oe(&self, mask: u32) {
        self.count_write();
        self.inner.oe.fetch_or(mask, Ordering::SeqCst);
    }

    fn clr_oe(&self, mask: u32) {
        self.count_write();
        self.inner.oe.fetch_and(!mask, Ordering::SeqCst);
    }

    fn xor_oe(&self, mask: u32) {
        self.count_write();
        self.inner.oe.fetch_xor(mask, Ordering::SeqCst);
    }

    fn levels(&self) -> u32 {
        let out = self.inner.out.load(Ordering::SeqCst);
        let oe = self.inner.oe.load(Ordering::SeqCst);
        let ext_mask = self.inner.ext_mask.load(Ordering::SeqCst);
        let ext_levels = self.inner.ext_levels.load(Ordering::SeqCst);

        let mut levels = 0;

        for pin in 0..BANK_WIDTH as u8 {
            let bit = 1u32 << pin;

            // A driven pin wins over the external level; an undriven pin
            // follows the external level, or its pull when nothing drives
            // the line.
            let high = if oe & bit != 0 {
                out & bit != 0
            } else if ext_mask & bit != 0 {
                ext_levels & bit != 0
            } else {
                self.pad_bias(pin) == Bias::PullUp
            };

            if high {
                levels |= bit;
            }
        }

        levels
    }

    fn bias(&self, pin: u8) -> Bias {
        self.pad_bias(pin)
    }

    fn set_bias(&self, pin: u8, bias: Bias) {
        self.count_write();

        let bits = match bias {
            Bias::Off => 0,
            Bias::PullDown => PADS_BIAS_DOWN,
            Bias::PullUp => PADS_BIAS_UP,
        };

        let pad = &self.inner.pads[pin as usize];
        let value = pad.load(Ordering::SeqCst);
        pad.store(
            (value & !PADS_BIAS_MASK) | (bits << PADS_BIAS_LSB),
            Ordering::SeqCst,
        );
    }

    fn enable_io(&self, pin: u8) {
        self.count_write();

        let pad = &self.inner.pads[pin as usize];
        let value = pad.load(Ordering::SeqCst);
        pad.store(
            (value | PADS_IN_ENABLE_MASK) & !PADS_OUT_DISABLE_MASK,
            Ordering::SeqCst,
        );
    }

    fn select_sio(&self, pin: u8) {
        self.count_write();
        self.inner.funcsel[pin as usize].store(FSEL_SIO, Ordering::SeqCst);
    }

    fn deselect_sio(&self, pin: u8) {
        self.count_write();
        self.inner.funcsel[pin as usize].store(FSEL_NULL, Ordering::SeqCst);
    }

    fn is_sio(&self, pin: u8) -> bool {
        self.inner.funcsel[pin as usize].load(Ordering::SeqCst) == FSEL_SIO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_writes_only_touch_masked_bits() {
        let mock = MockRegisters::new();

        mock.set_out(0b0110);
        mock.set_out(0);
        assert_eq!(mock.out(), 0b0110);

        mock.clr_out(0b0010);
        assert_eq!(mock.out(), 0b0100);

        mock.xor_out(0b0101);
        assert_eq!(mock.out(), 0b0001);

        mock.set_oe(0b1000);
        mock.xor_oe(0b1001);
        assert_eq!(mock.oe(), 0b0001);
    }

    #[test]
    fn line_follows_driver_external_level_and_pull() {
        let mock = MockRegisters::new();

        // Undriven, no external level, no pull.
        assert_eq!(mock.levels() & 1, 0);

        mock.set_bias(0, Bias::PullUp);
        assert_eq!(mock.levels() & 1, 1);

        mock.set_level(0, Level::Low);
        assert_eq!(mock.levels() & 1, 0);

        // The output driver wins once enabled.
        mock.set_out(1);
        mock.set_oe(1);
        assert_eq!(mock.levels() & 1, 1);
    }

    #[test]
    fn counts_mutating_accesses() {
        let mock = MockRegisters::new();
        assert_eq!(mock.writes(), 0);

        mock.set_out(1);
        mock.clr_oe(1);
        mock.set_bias(1, Bias::PullDown);
        MockRegisters::out(&mock);
        mock.levels();

        assert_eq!(mock.writes(), 3);
    }
}
