//! Interface for the SIO-driven GPIO bank.
//!
//! To ensure fast performance, rpsio controls the GPIO bank by directly
//! accessing its registers through a memory-mapped `/dev/gpiomem0`.
//!
//! ## Pins
//!
//! GPIO pins are retrieved from a [`Gpio`] instance by their pin number by
//! calling [`Gpio::get`]. The returned unconfigured [`Pin`] can be used to
//! read the pin's mode and logic level. Converting the [`Pin`] to an
//! [`InputPin`], [`OutputPin`] or [`IoPin`] through the various `into_`
//! methods available on [`Pin`] configures the appropriate mode, and provides
//! access to additional methods relevant to the selected pin mode.
//!
//! Retrieving a GPIO pin with [`Gpio::get`] grants access to the pin through
//! an owned [`Pin`] instance. If the pin is already in use, or the GPIO bank
//! doesn't expose a pin with the specified number, [`Gpio::get`] returns an
//! error. After a [`Pin`] (or a derived [`InputPin`], [`OutputPin`] or
//! [`IoPin`]) goes out of scope, it can be retrieved again through another
//! [`Gpio::get`] call.
//!
//! By default, pins are reset to their original mode when they go out of
//! scope. Use [`InputPin::set_reset_on_drop(false)`],
//! [`OutputPin::set_reset_on_drop(false)`] or
//! [`IoPin::set_reset_on_drop(false)`], respectively, to disable this
//! behavior. Note that `drop` methods aren't called when a process is
//! abnormally terminated (for instance when a `SIGINT` signal isn't caught).
//!
//! ## Examples
//!
//! Basic open-drain usage, driving a shared active-low line:
//!
//! ```no_run
//! use rpsio::gpio::{Gpio, Level, Mode};
//!
//! # fn main() -> rpsio::gpio::Result<()> {
//! let gpio = Gpio::new()?;
//! let mut pin = gpio.get(5)?.into_io(Mode::OpenDrain)?;
//!
//! pin.set_low();
//! pin.set_high();
//!
//! // Released by the last write, so this reads the external driver.
//! let level = pin.read();
//! # let _ = level;
//! # Ok(())
//! # }
//! ```
//!
//! ## Output modes
//!
//! The hardware offers two writable bit groups per pin: the output-value
//! register and the output-enable register. A push-pull output keeps the
//! requested logic level in the output-value register, with the output-enable
//! register acting as the true tri-state control. The hardware has no native
//! open-drain mode, so [`OpenDrain`] and [`QuasiBidirectional`] are emulated
//! by inverting those roles: the output-enable register is repurposed to
//! carry the logic level (driving low when enabled, released when disabled),
//! while the output-value register is held cleared. Which interpretation is
//! active for each pin is tracked in a process-wide bitmask, and the pin's
//! requested level is carried over losslessly whenever a mode change moves it
//! from one register to the other.
//!
//! ## Thread safety
//!
//! Operations on the same pin are serialized by pin ownership: a pin can only
//! be retrieved once, so a single owner drives its mode changes and writes.
//! Operations on different pins can run concurrently from multiple threads,
//! since all register updates go through the hardware's atomic set/clear/xor
//! alias registers and the role bitmask uses atomic bit operations.
//!
//! ## Troubleshooting
//!
//! ### Permission denied
//!
//! If constructing a new [`Gpio`] instance returns a permission-denied error,
//! the current user likely isn't a member of the `gpio` group, or your
//! distribution doesn't configure access permissions for `/dev/gpiomem0`.
//! Alternatively, although not recommended, you can run your application with
//! superuser privileges by using `sudo`.
//!
//! [`OpenDrain`]: enum.Mode.html#variant.OpenDrain
//! [`QuasiBidirectional`]: enum.Mode.html#variant.QuasiBidirectional
//! [`Gpio`]: struct.Gpio.html
//! [`Gpio::get`]: struct.Gpio.html#method.get
//! [`Pin`]: struct.Pin.html
//! [`InputPin`]: struct.InputPin.html
//! [`InputPin::set_reset_on_drop(false)`]: struct.InputPin.html#method.set_reset_on_drop
//! [`OutputPin`]: struct.OutputPin.html
//! [`OutputPin::set_reset_on_drop(false)`]: struct.OutputPin.html#method.set_reset_on_drop
//! [`IoPin`]: struct.IoPin.html
//! [`IoPin::set_reset_on_drop(false)`]: struct.IoPin.html#method.set_reset_on_drop

use std::error;
use std::fmt;
use std::io;
use std::ops::Not;
use std::result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

mod drain;
mod gpiomem;
#[cfg(feature = "hal")]
mod hal;
mod pin;

use self::drain::DrainMask;

pub use self::pin::{InputPin, IoPin, OutputPin, Pin, MAX};

/// Errors that can occur when accessing the GPIO bank.
#[derive(Debug)]
pub enum Error {
    /// Pin is not available.
    ///
    /// The GPIO bank doesn't expose a pin with the specified number.
    PinNotAvailable(u8),
    /// Pin is already in use.
    ///
    /// The pin is already in use elsewhere in your application. If the pin is
    /// currently in use, you may retrieve it again after the [`Pin`] (or a
    /// derived [`InputPin`], [`OutputPin`] or [`IoPin`]) instance goes out of
    /// scope.
    ///
    /// [`Pin`]: struct.Pin.html
    /// [`InputPin`]: struct.InputPin.html
    /// [`OutputPin`]: struct.OutputPin.html
    /// [`IoPin`]: struct.IoPin.html
    PinUsed(u8),
    /// Invalid mode value.
    ///
    /// The value doesn't encode any of the modes defined by [`Mode`].
    ///
    /// [`Mode`]: enum.Mode.html
    InvalidMode(u8),
    /// Unsupported mode.
    ///
    /// The mode is valid, but not implemented by the register backend for
    /// this hardware variant.
    UnsupportedMode(Mode),
    /// Permission denied when opening `/dev/gpiomem0` for read/write access.
    ///
    /// More information on possible causes for this error can be found
    /// [here].
    ///
    /// [here]: index.html#permission-denied
    PermissionDenied(String),
    /// I/O error.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::PinNotAvailable(pin) => write!(f, "Pin {} is not available", pin),
            Error::PinUsed(pin) => write!(f, "Pin {} is already in use", pin),
            Error::InvalidMode(mode) => write!(f, "Invalid mode value {}", mode),
            Error::UnsupportedMode(mode) => write!(f, "Mode {} is not supported", mode),
            Error::PermissionDenied(ref path) => write!(f, "Permission denied: {}", path),
            Error::Io(ref err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Result type returned from methods that can have `rpsio::gpio::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Pin modes.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Mode {
    /// Pin isn't muxed to the software-IO function.
    Uninitialized = 0,
    /// Floating input.
    Input = 1,
    /// Input with the built-in pull-up resistor enabled.
    InputPullUp = 2,
    /// Input with the built-in pull-down resistor enabled.
    InputPullDown = 3,
    /// Output that actively drives both high and low levels.
    PushPull = 4,
    /// Emulated output that only drives low; high releases the line.
    OpenDrain = 5,
    /// Open-drain output with the pull-up resistor enabled, so the line can
    /// be read back as an input while weakly driven high.
    QuasiBidirectional = 6,
    /// Keep the current mode. Only meaningful as a `set_mode` argument;
    /// queries never return it.
    Hold = 7,
}

impl Mode {
    /// Returns `true` if the mode keeps the pin's requested output level in
    /// the output-enable register rather than the output-value register.
    pub(crate) fn is_drain(self) -> bool {
        matches!(self, Mode::OpenDrain | Mode::QuasiBidirectional)
    }
}

impl TryFrom<u8> for Mode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Mode> {
        match value {
            0 => Ok(Mode::Uninitialized),
            1 => Ok(Mode::Input),
            2 => Ok(Mode::InputPullUp),
            3 => Ok(Mode::InputPullDown),
            4 => Ok(Mode::PushPull),
            5 => Ok(Mode::OpenDrain),
            6 => Ok(Mode::QuasiBidirectional),
            7 => Ok(Mode::Hold),
            _ => Err(Error::InvalidMode(value)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Mode::Uninitialized => write!(f, "Uninitialized"),
            Mode::Input => write!(f, "In"),
            Mode::InputPullUp => write!(f, "InPullUp"),
            Mode::InputPullDown => write!(f, "InPullDown"),
            Mode::PushPull => write!(f, "PushPull"),
            Mode::OpenDrain => write!(f, "OpenDrain"),
            Mode::QuasiBidirectional => write!(f, "QuasiBidir"),
            Mode::Hold => write!(f, "Hold"),
        }
    }
}

/// Pin logic levels.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl From<bool> for Level {
    fn from(e: bool) -> Level {
        if e {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        if value == 0 {
            Level::Low
        } else {
            Level::High
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::Low => write!(f, "Low"),
            Level::High => write!(f, "High"),
        }
    }
}

/// Built-in pull-up/pull-down resistor states.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Bias {
    Off,
    PullDown,
    PullUp,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Bias::Off => write!(f, "Off"),
            Bias::PullDown => write!(f, "PullDown"),
            Bias::PullUp => write!(f, "PullUp"),
        }
    }
}

// Store Gpio's state separately, so we can conveniently share it through
// a cloned Arc.
pub(crate) struct GpioState {
    gpio_mem: Box<dyn gpiomem::SioRegisters>,
    drain: DrainMask,
    pins_taken: [AtomicBool; MAX as usize],
}

impl fmt::Debug for GpioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioState")
            .field("gpio_mem", &self.gpio_mem)
            .field("drain", &self.drain)
            .field("pins_taken", &format_args!("{{ .. }}"))
            .finish()
    }
}

impl GpioState {
    fn new(gpio_mem: Box<dyn gpiomem::SioRegisters>) -> GpioState {
        GpioState {
            gpio_mem,
            drain: DrainMask::new(),
            pins_taken: init_array!(AtomicBool::new(false), MAX as usize),
        }
    }

    /// Reconstructs the pin's symbolic mode from the function-select word,
    /// the drain mask and the pad/output-enable bits.
    ///
    /// This is the exact structural inverse of [`set_mode`], so every mode
    /// reachable through it round-trips.
    ///
    /// [`set_mode`]: #method.set_mode
    pub(crate) fn mode(&self, pin: u8) -> Mode {
        if !self.gpio_mem.is_sio(pin) {
            return Mode::Uninitialized;
        }

        if self.drain.is_virtual(pin) {
            if self.gpio_mem.bias(pin) == Bias::PullUp {
                Mode::QuasiBidirectional
            } else {
                Mode::OpenDrain
            }
        } else if self.gpio_mem.oe() & (1 << pin) != 0 {
            Mode::PushPull
        } else {
            match self.gpio_mem.bias(pin) {
                Bias::PullUp => Mode::InputPullUp,
                Bias::PullDown => Mode::InputPullDown,
                Bias::Off => Mode::Input,
            }
        }
    }

    /// Applies the requested mode and migrates the pin's requested output
    /// level between the output-value and output-enable registers as needed.
    ///
    /// The level is always read from its old register and written to its new
    /// one before the drain mask flips meaning, so it survives any sequence
    /// of mode changes without glitching the line.
    pub(crate) fn set_mode(&self, pin: u8, mode: Mode) -> Result<Mode> {
        if mode == Mode::Hold {
            return Ok(self.mode(pin));
        }

        // Checked before anything is written, so a refused mode leaves the
        // registers and the drain mask untouched.
        if !self.gpio_mem.supports(mode) {
            return Err(Error::UnsupportedMode(mode));
        }

        let mask = 1u32 << pin;

        match mode {
            Mode::Uninitialized | Mode::Input | Mode::PushPull | Mode::OpenDrain => {
                self.gpio_mem.set_bias(pin, Bias::Off)
            }
            Mode::InputPullUp | Mode::QuasiBidirectional => {
                self.gpio_mem.set_bias(pin, Bias::PullUp)
            }
            Mode::InputPullDown => self.gpio_mem.set_bias(pin, Bias::PullDown),
            Mode::Hold => unreachable!(),
        }

        if mode.is_drain() {
            if !self.drain.is_virtual(pin) {
                // Encode the level from the output-value register into the
                // output-enable register's asserted-low convention.
                if self.gpio_mem.out() & mask != 0 {
                    self.gpio_mem.clr_oe(mask);
                } else {
                    self.gpio_mem.set_oe(mask);
                }
                self.drain.set_virtual(pin);
            }

            // Keep the output-value register cleared while its role is taken
            // over, so the line releases instead of driving high whenever the
            // output driver is enabled again.
            self.gpio_mem.clr_out(mask);
        } else {
            if self.drain.is_virtual(pin) {
                // The level lives in the output-enable register, asserted
                // low: enabled means driving low. Move it to the output-value
                // register before the mask flips meaning.
                if self.gpio_mem.oe() & mask == 0 {
                    self.gpio_mem.set_out(mask);
                } else {
                    self.gpio_mem.clr_out(mask);
                }
                self.drain.clear_virtual(pin);
            }

            if mode == Mode::PushPull {
                self.gpio_mem.set_oe(mask);
            } else {
                self.gpio_mem.clr_oe(mask);
            }
        }

        if mode == Mode::Uninitialized {
            self.gpio_mem.deselect_sio(pin);
        } else {
            self.gpio_mem.enable_io(pin);
            self.gpio_mem.select_sio(pin);
        }

        Ok(mode)
    }

    /// Sets the pin's requested output level, routed to whichever register
    /// currently carries it.
    ///
    /// Both alias writes happen unconditionally with complementary masks:
    /// only drain pins reach the output-enable register and only non-drain
    /// pins reach the output-value register.
    pub(crate) fn write(&self, pin: u8, level: Level) {
        let mask = 1u32 << pin;
        let virt = self.drain.mask();

        match level {
            Level::High => {
                self.gpio_mem.set_out(mask & !virt);
                self.gpio_mem.clr_oe(mask & virt);
            }
            Level::Low => {
                self.gpio_mem.clr_out(mask & !virt);
                self.gpio_mem.set_oe(mask & virt);
            }
        }
    }

    /// Inverts the pin's requested output level with a single xor-alias write
    /// on the register that currently carries it.
    pub(crate) fn toggle(&self, pin: u8) {
        let mask = 1u32 << pin;
        let virt = self.drain.mask();

        self.gpio_mem.xor_out(mask & !virt);
        self.gpio_mem.xor_oe(mask & virt);
    }

    /// Reads the physical level of the line. Unaffected by the register role
    /// duality; this is the electrical state, not the requested level.
    pub(crate) fn level(&self, pin: u8) -> Level {
        Level::from((self.gpio_mem.levels() >> pin) as u8 & 0b1)
    }

    /// Recovers the output level last requested through [`write`] or
    /// [`toggle`], regardless of which register carries it.
    ///
    /// [`write`]: #method.write
    /// [`toggle`]: #method.toggle
    pub(crate) fn read_back(&self, pin: u8) -> Level {
        let mask = 1u32 << pin;

        if self.drain.is_virtual(pin) {
            // Asserted low: enabled-and-driving-low is a requested Low.
            Level::from(self.gpio_mem.oe() & mask == 0)
        } else {
            Level::from(self.gpio_mem.out() & mask != 0)
        }
    }

    pub(crate) fn release(&self, pin: u8) {
        self.pins_taken[pin as usize].store(false, Ordering::SeqCst);
    }
}

/// Provides access to the SIO GPIO bank.
#[derive(Clone, Debug)]
pub struct Gpio {
    inner: Arc<GpioState>,
}

impl Gpio {
    /// Constructs a new `Gpio`.
    ///
    /// The underlying state is shared between all `Gpio` and [`Pin`]
    /// instances, and dropped after the last of them goes out of scope.
    ///
    /// [`Pin`]: struct.Pin.html
    pub fn new() -> Result<Gpio> {
        // Shared state between Gpio and Pin instances. GpioState is dropped
        // after all Gpio and Pin instances go out of scope, guaranteeing we
        // won't have any pins simultaneously using different GpioMem
        // instances.
        static GPIO_STATE: OnceLock<Mutex<Weak<GpioState>>> = OnceLock::new();

        let mut weak_state = GPIO_STATE
            .get_or_init(|| Mutex::new(Weak::new()))
            .lock()
            .unwrap();

        // Clone a strong reference if a GpioState instance already exists,
        // otherwise initialize it here so we can return any relevant errors.
        if let Some(state) = weak_state.upgrade() {
            Ok(Gpio { inner: state })
        } else {
            let gpio_mem: Box<dyn gpiomem::SioRegisters> = Box::new(gpiomem::rio::GpioMem::open()?);
            let gpio_state = Arc::new(GpioState::new(gpio_mem));

            // Store a weak reference to our state. This gets dropped when
            // all Gpio and Pin instances go out of scope.
            *weak_state = Arc::downgrade(&gpio_state);

            Ok(Gpio { inner: gpio_state })
        }
    }

    // Constructs an unshared instance on top of an arbitrary register
    // backend, bypassing the process-wide state.
    #[cfg(test)]
    pub(crate) fn from_registers(gpio_mem: Box<dyn gpiomem::SioRegisters>) -> Gpio {
        Gpio {
            inner: Arc::new(GpioState::new(gpio_mem)),
        }
    }

    /// Returns a [`Pin`] for the specified pin number.
    ///
    /// Retrieving a GPIO pin grants access to the pin through an owned
    /// [`Pin`] instance. If the pin is already in use, `get` returns
    /// `Err(`[`Error::PinUsed`]`)`. After a [`Pin`] (or a derived
    /// [`InputPin`], [`OutputPin`] or [`IoPin`]) goes out of scope, it can be
    /// retrieved again through another `get` call.
    ///
    /// [`Pin`]: struct.Pin.html
    /// [`InputPin`]: struct.InputPin.html
    /// [`OutputPin`]: struct.OutputPin.html
    /// [`IoPin`]: struct.IoPin.html
    /// [`Error::PinUsed`]: enum.Error.html#variant.PinUsed
    pub fn get(&self, pin: u8) -> Result<Pin> {
        if pin >= MAX {
            return Err(Error::PinNotAvailable(pin));
        }

        // Returns an error if the pin is already taken, otherwise atomically
        // marks it as taken here
        if self.inner.pins_taken[pin as usize]
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            Err(Error::PinUsed(pin))
        } else {
            Ok(Pin::new(pin, self.inner.clone()))
        }
    }
}
