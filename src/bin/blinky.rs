#![no_main]
#![no_std]

use hal::delay::SpinDelay;
use {panic_halt as _, pi_blinky as hal};

/// Called once by `_start` on core 0.
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    let mut p = hal::init();

    hal::blinky::start(&mut p.GPIO, SpinDelay::new())
}
