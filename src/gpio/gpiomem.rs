use crate::gpio::{Bias, Mode};

#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod rio;

/// Register-level access to a SIO GPIO bank.
///
/// The output-value and output-enable groups are mask-addressed so a single
/// alias write can update several pins at once; each alias write is atomic at
/// the hardware level. The pad and function-select words are per pin.
pub(crate) trait SioRegisters: std::fmt::Debug + Sync + Send {
    /// Reports whether this hardware variant implements the mode. Refusing a
    /// mode here keeps the mode-transition engine from touching any register.
    fn supports(&self, mode: Mode) -> bool {
        let _ = mode;
        true
    }

    // Output-value register group.
    fn out(&self) -> u32;
    fn set_out(&self, mask: u32);
    fn clr_out(&self, mask: u32);
    fn xor_out(&self, mask: u32);

    // Output-enable register group.
    fn oe(&self) -> u32;
    fn set_oe(&self, mask: u32);
    fn clr_oe(&self, mask: u32);
    fn xor_oe(&self, mask: u32);

    /// Input-state register; bit `p` is the physical level of pin `p`.
    fn levels(&self) -> u32;

    // Per-pin pad control word.
    fn bias(&self, pin: u8) -> Bias;
    fn set_bias(&self, pin: u8, bias: Bias);
    fn enable_io(&self, pin: u8);

    // Per-pin function-select word.
    fn select_sio(&self, pin: u8);
    fn deselect_sio(&self, pin: u8);
    fn is_sio(&self, pin: u8) -> bool;
}
