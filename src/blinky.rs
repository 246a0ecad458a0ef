//! The blink loop.
//!
//! Configure the LED pin as an output once, then assert and clear it forever with a busy-wait
//! in between.

use embedded_hal::delay::DelayNs;
use static_assertions::const_assert_eq;

use crate::gpio::{Gpio, Output, Pin};
use crate::pac::RegisterBlock;

/// GPIO 16, the first pin of `GPFSEL1`.
pub const LED_PIN: Pin = match Pin::new(16) {
    Ok(pin) => pin,
    Err(_) => panic!("LED pin out of range"),
};

/// Time spent in each half of the cycle.
pub const BLINK_PERIOD_MS: u32 = 1000;

const_assert_eq!(LED_PIN.fsel_index(), 1);
const_assert_eq!(LED_PIN.fsel_shift(), 18);

/// Toggles one output with a fixed delay between edges.
pub struct Blinker<'d, R: RegisterBlock, D> {
    led: Output<'d, R>,
    delay: D,
    period_ms: u32,
}

impl<'d, R: RegisterBlock, D: DelayNs> Blinker<'d, R, D> {
    pub fn new(led: Output<'d, R>, delay: D, period_ms: u32) -> Self {
        Self { led, delay, period_ms }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// One full on/off cycle: set, wait, clear, wait.
    pub fn cycle(&mut self) {
        self.led.set_high();
        self.delay.delay_ms(self.period_ms);

        self.led.set_low();
        self.delay.delay_ms(self.period_ms);
    }

    pub fn run(mut self) -> ! {
        loop {
            self.cycle();
        }
    }

    pub fn release(self) -> (Output<'d, R>, D) {
        (self.led, self.delay)
    }
}

/// Configure [`LED_PIN`] and blink it every [`BLINK_PERIOD_MS`], forever.
pub fn start<R: RegisterBlock, D: DelayNs>(gpio: &mut Gpio<R>, delay: D) -> ! {
    info!("blinking gpio{} every {} ms", LED_PIN.number(), BLINK_PERIOD_MS);

    let led = gpio.into_output(LED_PIN);
    Blinker::new(led, delay, BLINK_PERIOD_MS).run()
}
