use std::sync::Arc;

use crate::gpio::{GpioState, Level, Mode, Result};

/// Maximum number of pins exposed by the GPIO bank's software-IO block.
pub const MAX: u8 = 30;

macro_rules! impl_pin {
    () => {
        /// Returns the GPIO pin number.
        #[inline]
        pub fn pin(&self) -> u8 {
            self.pin.pin
        }
    };
}

macro_rules! impl_input {
    () => {
        /// Reads the pin's logic level.
        #[inline]
        pub fn read(&self) -> Level {
            self.pin.read()
        }

        /// Reads the pin's logic level, and returns `true` if it's set to [`Low`].
        ///
        /// [`Low`]: enum.Level.html#variant.Low
        #[inline]
        pub fn is_low(&self) -> bool {
            self.pin.read() == Level::Low
        }

        /// Reads the pin's logic level, and returns `true` if it's set to [`High`].
        ///
        /// [`High`]: enum.Level.html#variant.High
        #[inline]
        pub fn is_high(&self) -> bool {
            self.pin.read() == Level::High
        }
    };
}

macro_rules! impl_output {
    () => {
        /// Sets the pin's output state.
        #[inline]
        pub fn write(&mut self, level: Level) {
            self.pin.write(level)
        }

        /// Sets the pin's output state to [`Low`].
        ///
        /// In the open-drain and quasi-bidirectional modes this actively
        /// drives the line low.
        ///
        /// [`Low`]: enum.Level.html#variant.Low
        #[inline]
        pub fn set_low(&mut self) {
            self.pin.write(Level::Low)
        }

        /// Sets the pin's output state to [`High`].
        ///
        /// In the open-drain and quasi-bidirectional modes this releases the
        /// line rather than driving it.
        ///
        /// [`High`]: enum.Level.html#variant.High
        #[inline]
        pub fn set_high(&mut self) {
            self.pin.write(Level::High)
        }

        /// Toggles the pin's output state between [`Low`] and [`High`].
        ///
        /// Unlike reading the line back and writing its inverse, this uses a
        /// single xor-alias register write.
        ///
        /// [`Low`]: enum.Level.html#variant.Low
        /// [`High`]: enum.Level.html#variant.High
        #[inline]
        pub fn toggle(&mut self) {
            self.pin.toggle()
        }

        /// Returns `true` if the pin's output state is set to [`Low`].
        ///
        /// This reads back the requested output state, not the physical line,
        /// so an open-drain pin held low externally while released still
        /// reports `false`.
        ///
        /// [`Low`]: enum.Level.html#variant.Low
        #[inline]
        pub fn is_set_low(&self) -> bool {
            self.pin.read_back() == Level::Low
        }

        /// Returns `true` if the pin's output state is set to [`High`].
        ///
        /// [`High`]: enum.Level.html#variant.High
        #[inline]
        pub fn is_set_high(&self) -> bool {
            self.pin.read_back() == Level::High
        }
    };
}

macro_rules! impl_reset_on_drop {
    () => {
        /// Returns the value of `reset_on_drop`.
        pub fn reset_on_drop(&self) -> bool {
            self.reset_on_drop
        }

        /// When enabled, resets the pin's mode to its original state when the
        /// pin goes out of scope. The pull resistors follow from the restored
        /// mode. By default, this is set to `true`.
        ///
        /// ## Note
        ///
        /// Drop methods aren't called when a process is abnormally terminated,
        /// for instance when a user presses <kbd>Ctrl</kbd> + <kbd>C</kbd>, and
        /// the `SIGINT` signal isn't caught. You can catch those using crates
        /// such as [`simple_signal`].
        ///
        /// [`simple_signal`]: https://crates.io/crates/simple-signal
        pub fn set_reset_on_drop(&mut self, reset_on_drop: bool) {
            self.reset_on_drop = reset_on_drop;
        }
    };
}

macro_rules! impl_drop {
    ($struct:ident) => {
        impl Drop for $struct {
            /// Resets the pin's mode if `reset_on_drop` is set to `true`
            /// (default).
            fn drop(&mut self) {
                if !self.reset_on_drop {
                    return;
                }

                if let Some(prev_mode) = self.prev_mode {
                    let _ = self.pin.set_mode(prev_mode);
                }
            }
        }
    };
}

macro_rules! impl_eq {
    ($struct:ident) => {
        impl PartialEq for $struct {
            fn eq(&self, other: &$struct) -> bool {
                self.pin == other.pin
            }
        }

        impl<'a> PartialEq<&'a $struct> for $struct {
            fn eq(&self, other: &&'a $struct) -> bool {
                self.pin == other.pin
            }
        }

        impl<'a> PartialEq<$struct> for &'a $struct {
            fn eq(&self, other: &$struct) -> bool {
                self.pin == other.pin
            }
        }

        impl Eq for $struct {}
    };
}

/// Unconfigured GPIO pin.
///
/// `Pin`s are constructed by retrieving them using [`Gpio::get`].
///
/// An unconfigured `Pin` can be used to read the pin's mode and logic level.
/// Converting the `Pin` to an [`InputPin`], [`OutputPin`] or [`IoPin`] through
/// the various `into_` methods available on `Pin` configures the appropriate
/// mode, and provides access to additional methods relevant to the selected
/// pin mode.
///
/// [`Gpio::get`]: struct.Gpio.html#method.get
/// [`InputPin`]: struct.InputPin.html
/// [`OutputPin`]: struct.OutputPin.html
/// [`IoPin`]: struct.IoPin.html
#[derive(Debug)]
pub struct Pin {
    pub(crate) pin: u8,
    gpio_state: Arc<GpioState>,
}

impl Pin {
    #[inline]
    pub(crate) fn new(pin: u8, gpio_state: Arc<GpioState>) -> Pin {
        Pin { pin, gpio_state }
    }

    /// Returns the GPIO pin number.
    #[inline]
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Returns the pin's mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.gpio_state.mode(self.pin)
    }

    /// Reads the pin's logic level.
    #[inline]
    pub fn read(&self) -> Level {
        self.gpio_state.level(self.pin)
    }

    /// Consumes the `Pin`, returns an [`InputPin`] and sets its mode to
    /// [`Input`].
    ///
    /// [`InputPin`]: struct.InputPin.html
    /// [`Input`]: enum.Mode.html#variant.Input
    #[inline]
    pub fn into_input(self) -> Result<InputPin> {
        InputPin::new(self, Mode::Input)
    }

    /// Consumes the `Pin`, returns an [`InputPin`] and sets its mode to
    /// [`InputPullDown`].
    ///
    /// The pull-down resistor is disabled when `InputPin` goes out of scope if
    /// [`reset_on_drop`] is set to `true` (default).
    ///
    /// [`InputPin`]: struct.InputPin.html
    /// [`InputPullDown`]: enum.Mode.html#variant.InputPullDown
    /// [`reset_on_drop`]: struct.InputPin.html#method.set_reset_on_drop
    #[inline]
    pub fn into_input_pulldown(self) -> Result<InputPin> {
        InputPin::new(self, Mode::InputPullDown)
    }

    /// Consumes the `Pin`, returns an [`InputPin`] and sets its mode to
    /// [`InputPullUp`].
    ///
    /// The pull-up resistor is disabled when `InputPin` goes out of scope if
    /// [`reset_on_drop`] is set to `true` (default).
    ///
    /// [`InputPin`]: struct.InputPin.html
    /// [`InputPullUp`]: enum.Mode.html#variant.InputPullUp
    /// [`reset_on_drop`]: struct.InputPin.html#method.set_reset_on_drop
    #[inline]
    pub fn into_input_pullup(self) -> Result<InputPin> {
        InputPin::new(self, Mode::InputPullUp)
    }

    /// Consumes the `Pin`, returns an [`OutputPin`] and sets its mode to
    /// [`PushPull`].
    ///
    /// [`OutputPin`]: struct.OutputPin.html
    /// [`PushPull`]: enum.Mode.html#variant.PushPull
    #[inline]
    pub fn into_output(self) -> Result<OutputPin> {
        OutputPin::new(self)
    }

    /// Consumes the `Pin`, returns an [`IoPin`] and sets its mode to the
    /// specified mode.
    ///
    /// [`Hold`] keeps whatever mode the pin is currently in.
    ///
    /// [`IoPin`]: struct.IoPin.html
    /// [`Hold`]: enum.Mode.html#variant.Hold
    #[inline]
    pub fn into_io(self, mode: Mode) -> Result<IoPin> {
        IoPin::new(self, mode)
    }

    #[inline]
    pub(crate) fn set_mode(&mut self, mode: Mode) -> Result<Mode> {
        self.gpio_state.set_mode(self.pin, mode)
    }

    #[inline]
    pub(crate) fn write(&mut self, level: Level) {
        self.gpio_state.write(self.pin, level);
    }

    #[inline]
    pub(crate) fn toggle(&mut self) {
        self.gpio_state.toggle(self.pin);
    }

    #[inline]
    pub(crate) fn read_back(&self) -> Level {
        self.gpio_state.read_back(self.pin)
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        // Release taken pin
        self.gpio_state.release(self.pin);
    }
}

impl_eq!(Pin);

/// GPIO pin configured as input.
///
/// `InputPin`s are constructed by converting a [`Pin`] using
/// [`Pin::into_input`], [`Pin::into_input_pullup`] or
/// [`Pin::into_input_pulldown`]. The pin's mode is automatically set to the
/// matching input mode.
///
/// [`Pin`]: struct.Pin.html
/// [`Pin::into_input`]: struct.Pin.html#method.into_input
/// [`Pin::into_input_pullup`]: struct.Pin.html#method.into_input_pullup
/// [`Pin::into_input_pulldown`]: struct.Pin.html#method.into_input_pulldown
#[derive(Debug)]
pub struct InputPin {
    pub(crate) pin: Pin,
    prev_mode: Option<Mode>,
    reset_on_drop: bool,
}

impl InputPin {
    pub(crate) fn new(mut pin: Pin, mode: Mode) -> Result<InputPin> {
        let prev_mode = pin.mode();
        pin.set_mode(mode)?;

        let prev_mode = if prev_mode == mode {
            None
        } else {
            Some(prev_mode)
        };

        Ok(InputPin {
            pin,
            prev_mode,
            reset_on_drop: true,
        })
    }

    impl_pin!();
    impl_input!();
    impl_reset_on_drop!();
}

impl_drop!(InputPin);
impl_eq!(InputPin);

/// GPIO pin configured as push-pull output.
///
/// `OutputPin`s are constructed by converting a [`Pin`] using
/// [`Pin::into_output`]. The pin's mode is automatically set to [`PushPull`].
///
/// Use [`Pin::into_io`] instead for an open-drain or quasi-bidirectional
/// output.
///
/// [`Pin`]: struct.Pin.html
/// [`PushPull`]: enum.Mode.html#variant.PushPull
/// [`Pin::into_output`]: struct.Pin.html#method.into_output
/// [`Pin::into_io`]: struct.Pin.html#method.into_io
#[derive(Debug)]
pub struct OutputPin {
    pin: Pin,
    prev_mode: Option<Mode>,
    reset_on_drop: bool,
}

impl OutputPin {
    pub(crate) fn new(mut pin: Pin) -> Result<OutputPin> {
        let prev_mode = pin.mode();
        pin.set_mode(Mode::PushPull)?;

        let prev_mode = if prev_mode == Mode::PushPull {
            None
        } else {
            Some(prev_mode)
        };

        Ok(OutputPin {
            pin,
            prev_mode,
            reset_on_drop: true,
        })
    }

    impl_pin!();
    impl_output!();
    impl_reset_on_drop!();
}

impl_drop!(OutputPin);
impl_eq!(OutputPin);

/// GPIO pin that can be (re)configured for any mode.
///
/// `IoPin`s are constructed by converting a [`Pin`] using [`Pin::into_io`].
/// The pin's mode is automatically set to the specified mode, and can be
/// changed at any time through [`set_mode`] without losing the pin's
/// requested output level.
///
/// Depending on the mode, some methods may not have any effect. For instance,
/// calling a method that alters the pin's output state won't cause any
/// changes when the pin's mode is set to [`Input`].
///
/// [`Pin`]: struct.Pin.html
/// [`Input`]: enum.Mode.html#variant.Input
/// [`Pin::into_io`]: struct.Pin.html#method.into_io
/// [`set_mode`]: #method.set_mode
#[derive(Debug)]
pub struct IoPin {
    pin: Pin,
    mode: Mode,
    prev_mode: Option<Mode>,
    reset_on_drop: bool,
}

impl IoPin {
    pub(crate) fn new(mut pin: Pin, mode: Mode) -> Result<IoPin> {
        let prev_mode = pin.mode();
        // Hold resolves to whatever mode the pin is currently in.
        let mode = pin.set_mode(mode)?;

        let prev_mode = if prev_mode == mode {
            None
        } else {
            Some(prev_mode)
        };

        Ok(IoPin {
            pin,
            mode,
            prev_mode,
            reset_on_drop: true,
        })
    }

    impl_pin!();

    /// Returns the pin's mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.pin.mode()
    }

    /// Sets the pin's mode, and returns the mode that was applied.
    ///
    /// The pin's requested output level is carried over to the new mode, so
    /// switching between push-pull, open-drain and input modes never loses or
    /// glitches the level. [`Hold`] leaves the current mode as-is and returns
    /// it.
    ///
    /// [`Hold`]: enum.Mode.html#variant.Hold
    pub fn set_mode(&mut self, mode: Mode) -> Result<Mode> {
        let applied = self.pin.set_mode(mode)?;

        if applied != self.mode {
            // If self.prev_mode is set to None, the mode requested during
            // construction was the same as the pin's mode at the time. Save
            // that mode now that it's changing, so we can reset it on drop.
            if self.prev_mode.is_none() {
                self.prev_mode = Some(self.mode);
            }

            self.mode = applied;
        }

        Ok(applied)
    }

    /// Reads back the output level last requested through `write` or
    /// `toggle`, regardless of which register currently carries it.
    #[inline]
    pub fn read_back(&self) -> Level {
        self.pin.read_back()
    }

    impl_input!();
    impl_output!();
    impl_reset_on_drop!();
}

impl_drop!(IoPin);
impl_eq!(IoPin);
