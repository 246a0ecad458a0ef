//! General Purpose Input/Output
//!
//! 54 pins in one bank. Each pin's mode lives in a 3-bit field of a `GPFSELn` register (10 pins per
//! register). Levels are driven through the write-only `GPSETn`/`GPCLRn` pairs (32 pins per register),
//! so driving a pin never needs a read. Input levels come from the read-only `GPLEVn` registers.
use core::convert::Infallible;
use core::fmt;

use crate::pac::{self, RegisterBlock};

/// Pin function, the 3-bit `FSEL` encoding.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Function {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl Function {
    #[inline]
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

/// How the function-select field is written.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FselWrite {
    /// OR the encoding into the register without clearing the field first.
    ///
    /// Only correct when the field still holds its reset value (0, input). Bits already set in the
    /// field survive, so `Alt0` OR `Output` ends up as `Alt1`.
    Or,
    /// Clear the 3-bit field, then set it.
    Masked,
}

impl FselWrite {
    /// Policy used by [`Gpio::set_output_mode`], selected by the `masked-fsel` feature.
    #[cfg(not(feature = "masked-fsel"))]
    pub const DEFAULT: Self = Self::Or;
    #[cfg(feature = "masked-fsel")]
    pub const DEFAULT: Self = Self::Masked;

    #[inline]
    pub const fn apply(self, current: u32, shift: u32, function: Function) -> u32 {
        match self {
            Self::Or => current | (function.bits() << shift),
            Self::Masked => (current & !(FSEL_FIELD_MASK << shift)) | (function.bits() << shift),
        }
    }
}

const FSEL_FIELD_MASK: u32 = 0b111;
const FSEL_FIELD_WIDTH: u8 = 3;
const PINS_PER_FSEL: u8 = 10;
const PINS_PER_BANK: u8 = 32;

/// GPIO error.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Pin number past the end of the bank.
    InvalidPin(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(n) => write!(f, "GPIO {} exceeds maximum of {}", n, Pin::MAX),
        }
    }
}

/// A validated GPIO number.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin(u8);

impl Pin {
    pub const MAX: u8 = 53;

    /// Usable in `const` items, so a bad pin number fails the build instead of the firmware.
    #[inline]
    pub const fn new(n: u8) -> Result<Self, Error> {
        if n > Self::MAX {
            Err(Error::InvalidPin(n))
        } else {
            Ok(Self(n))
        }
    }

    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Index of the `GPFSELn` register holding this pin's field.
    #[inline]
    pub const fn fsel_index(self) -> usize {
        (self.0 / PINS_PER_FSEL) as usize
    }

    /// Bit offset of this pin's field within its `GPFSELn` register.
    #[inline]
    pub const fn fsel_shift(self) -> u32 {
        ((self.0 % PINS_PER_FSEL) * FSEL_FIELD_WIDTH) as u32
    }

    /// Index of the `GPSETn`/`GPCLRn`/`GPLEVn` register for this pin.
    #[inline]
    pub const fn bank(self) -> usize {
        (self.0 / PINS_PER_BANK) as usize
    }

    #[inline]
    pub const fn mask(self) -> u32 {
        1 << (self.0 % PINS_PER_BANK)
    }
}

impl TryFrom<u8> for Pin {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self, Error> {
        Self::new(n)
    }
}

/// Digital input or output level.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Low
    Low,
    /// High
    High,
}

impl From<bool> for Level {
    fn from(val: bool) -> Self {
        match val {
            true => Self::High,
            false => Self::Low,
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        match level {
            Level::Low => false,
            Level::High => true,
        }
    }
}

/// The GPIO bank.
pub struct Gpio<R> {
    regs: R,
}

impl<R: RegisterBlock> Gpio<R> {
    #[inline]
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Give back the register block.
    #[inline]
    pub fn free(self) -> R {
        self.regs
    }

    /// Select `function` for `pin` with a read-modify-write of its `GPFSELn` register.
    pub fn set_function(&mut self, pin: Pin, function: Function, write: FselWrite) {
        let offset = pac::gpio::gpfsel(pin.fsel_index());
        let shift = pin.fsel_shift();

        critical_section::with(|_| {
            self.regs.modify(offset, |v| write.apply(v, shift, function));
        });

        debug!("gpio{}: function {} ({})", pin.number(), function, write);
    }

    /// Configure `pin` as a digital output, using [`FselWrite::DEFAULT`].
    #[inline]
    pub fn set_output_mode(&mut self, pin: Pin) {
        self.set_function(pin, Function::Output, FselWrite::DEFAULT);
    }

    /// Drive `pin` high.
    #[inline]
    pub fn assert(&mut self, pin: Pin) {
        self.regs.write(pac::gpio::gpset(pin.bank()), pin.mask());
    }

    /// Drive `pin` low.
    #[inline]
    pub fn deassert(&mut self, pin: Pin) {
        self.regs.write(pac::gpio::gpclr(pin.bank()), pin.mask());
    }

    #[inline]
    pub fn set_level(&mut self, pin: Pin, level: Level) {
        match level {
            Level::High => self.assert(pin),
            Level::Low => self.deassert(pin),
        }
    }

    /// Current level of `pin`, from its `GPLEVn` register.
    #[inline]
    pub fn level(&mut self, pin: Pin) -> Level {
        let lev = self.regs.read(pac::gpio::gplev(pin.bank()));
        (lev & pin.mask() != 0).into()
    }

    /// Configure `pin` as an output and borrow it as an [`Output`] driver.
    pub fn into_output(&mut self, pin: Pin) -> Output<'_, R> {
        self.set_output_mode(pin);
        Output { gpio: self, pin }
    }

    /// Configure `pin` as an input and borrow it as an [`Input`] driver.
    ///
    /// The input encoding is all zeroes, which an OR can't produce, so this always uses
    /// [`FselWrite::Masked`].
    pub fn into_input(&mut self, pin: Pin) -> Input<'_, R> {
        self.set_function(pin, Function::Input, FselWrite::Masked);
        Input { gpio: self, pin }
    }
}

/// GPIO input driver.
pub struct Input<'d, R: RegisterBlock> {
    gpio: &'d mut Gpio<R>,
    pin: Pin,
}

impl<'d, R: RegisterBlock> Input<'d, R> {
    #[inline]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Get whether the pin input level is high.
    #[inline]
    pub fn is_high(&mut self) -> bool {
        self.get_level() == Level::High
    }

    /// Get whether the pin input level is low.
    #[inline]
    pub fn is_low(&mut self) -> bool {
        !self.is_high()
    }

    /// Get the current pin input level.
    #[inline]
    pub fn get_level(&mut self) -> Level {
        self.gpio.level(self.pin)
    }
}

/// GPIO output driver.
///
/// Dropping it leaves the pin configured and at its last level.
pub struct Output<'d, R: RegisterBlock> {
    gpio: &'d mut Gpio<R>,
    pin: Pin,
}

impl<'d, R: RegisterBlock> Output<'d, R> {
    #[inline]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Set the output as high.
    #[inline]
    pub fn set_high(&mut self) {
        trace!("gpio{}: set", self.pin.number());
        self.gpio.assert(self.pin);
    }

    /// Set the output as low.
    #[inline]
    pub fn set_low(&mut self) {
        trace!("gpio{}: clear", self.pin.number());
        self.gpio.deassert(self.pin);
    }

    /// Set the output level.
    #[inline]
    pub fn set_level(&mut self, level: Level) {
        match level {
            Level::Low => self.set_low(),
            Level::High => self.set_high(),
        }
    }
}

// ====================
// Implement embedded-hal traits

impl<'d, R: RegisterBlock> embedded_hal::digital::ErrorType for Input<'d, R> {
    type Error = Infallible;
}

impl<'d, R: RegisterBlock> embedded_hal::digital::InputPin for Input<'d, R> {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Input::is_high(self))
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Input::is_low(self))
    }
}

impl<'d, R: RegisterBlock> embedded_hal::digital::ErrorType for Output<'d, R> {
    type Error = Infallible;
}

impl<'d, R: RegisterBlock> embedded_hal::digital::OutputPin for Output<'d, R> {
    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(self.set_high())
    }

    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(self.set_low())
    }
}
