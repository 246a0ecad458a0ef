#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

// This must go FIRST so that all the other modules see its macros.
mod fmt;

pub mod blinky;
pub mod delay;
pub mod gpio;
pub mod pac;

#[cfg(all(feature = "rt", target_arch = "aarch64", target_os = "none"))]
pub mod rt;

use gpio::Gpio;
use pac::Mmio;

static mut TAKEN: bool = false;

/// The peripherals this crate drives.
#[allow(non_snake_case)]
pub struct Peripherals {
    pub GPIO: Gpio<Mmio>,
}

impl Peripherals {
    /// Returns the peripherals once; `None` on every later call.
    pub fn take() -> Option<Self> {
        critical_section::with(|_| unsafe {
            if TAKEN {
                return None;
            }
            TAKEN = true;
            Some(Self::steal())
        })
    }

    /// # Safety
    ///
    /// Bypasses the ownership check in [`Peripherals::take`]. Two live copies drive the same
    /// registers.
    pub unsafe fn steal() -> Self {
        Self {
            GPIO: Gpio::new(Mmio::new(pac::GPIO_BASE)),
        }
    }
}

/// Hand out the peripherals. Panics if called more than once.
pub fn init() -> Peripherals {
    match Peripherals::take() {
        Some(p) => {
            debug!("peripherals taken, gpio @ {=usize:#x}", pac::GPIO_BASE);
            p
        }
        None => panic!("init called more than once"),
    }
}
