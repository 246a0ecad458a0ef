//! Peripheral access for the BCM2837 GPIO bank.
//!
//! Addresses are the ARM physical view of the peripheral bus (`0x7E00_0000` on the VideoCore side).
//! Every register is a 32-bit word at a 4-byte aligned offset.

use core::ptr::{read_volatile, write_volatile};

use static_assertions::{const_assert, const_assert_eq};

/// Start of the peripheral window as seen by the ARM cores.
pub const PERIPHERAL_BASE: usize = 0x3F00_0000;

/// Base address of the GPIO register block.
pub const GPIO_BASE: usize = PERIPHERAL_BASE + 0x20_0000;

/// GPIO register offsets, relative to [`GPIO_BASE`].
pub mod gpio {
    /// Function select 0, pins 0..=9. `GPFSEL1` (pins 10..=19) follows at `0x04`.
    pub const GPFSEL0: usize = 0x00;
    /// Output set 0, pins 0..=31.
    pub const GPSET0: usize = 0x1C;
    /// Output clear 0, pins 0..=31.
    pub const GPCLR0: usize = 0x28;
    /// Pin level 0, pins 0..=31. Read-only.
    pub const GPLEV0: usize = 0x34;

    pub const GPFSEL_COUNT: usize = 6;
    pub const GPSET_COUNT: usize = 2;
    pub const GPCLR_COUNT: usize = 2;
    pub const GPLEV_COUNT: usize = 2;

    #[inline]
    pub const fn gpfsel(n: usize) -> usize {
        GPFSEL0 + n * 4
    }

    #[inline]
    pub const fn gpset(n: usize) -> usize {
        GPSET0 + n * 4
    }

    #[inline]
    pub const fn gpclr(n: usize) -> usize {
        GPCLR0 + n * 4
    }

    #[inline]
    pub const fn gplev(n: usize) -> usize {
        GPLEV0 + n * 4
    }
}

const_assert_eq!(GPIO_BASE, 0x3F20_0000);
const_assert_eq!(gpio::gpfsel(1), 0x04);
const_assert_eq!(GPIO_BASE % 4, 0);
const_assert_eq!(gpio::GPSET0 % 4, 0);
const_assert_eq!(gpio::GPCLR0 % 4, 0);
// the bank tables must not overlap
const_assert!(gpio::gpfsel(gpio::GPFSEL_COUNT - 1) < gpio::GPSET0);
const_assert!(gpio::gpset(gpio::GPSET_COUNT - 1) < gpio::GPCLR0);
const_assert!(gpio::gpclr(gpio::GPCLR_COUNT - 1) < gpio::GPLEV0);

/// Word access to a register block.
///
/// Offsets are byte offsets from the start of the block. The hardware implementation is [`Mmio`];
/// anything else (a recorder, a simulator) can stand in for it.
pub trait RegisterBlock {
    fn read(&mut self, offset: usize) -> u32;

    fn write(&mut self, offset: usize, value: u32);

    #[inline]
    fn modify(&mut self, offset: usize, f: impl FnOnce(u32) -> u32) {
        let value = self.read(offset);
        self.write(offset, f(value));
    }
}

impl<R: RegisterBlock + ?Sized> RegisterBlock for &mut R {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Volatile memory-mapped register block.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a device register block that is mapped uncached (or with the
    /// MMU off), and nothing else may access it while this value is alive.
    #[inline]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    fn ptr(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset % 4 == 0);
        (self.base + offset) as *mut u32
    }
}

impl RegisterBlock for Mmio {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        unsafe { read_volatile(self.ptr(offset)) }
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        unsafe { write_volatile(self.ptr(offset), value) }
    }
}
