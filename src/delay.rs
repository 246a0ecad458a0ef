use embedded_hal::delay::DelayNs;

/// Spin iterations per requested microsecond.
///
/// Empirical, for the default ARM clock of a Pi 3 with this loop body. Nothing checks it against
/// wall-clock time; the real delay moves with clock frequency and optimization level.
pub const ITERATIONS_PER_US: u32 = 6;

/// One iteration of the delay loop.
pub trait Spin {
    fn spin(&mut self);
}

/// A single `nop`, kept by the compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nop;

impl Spin for Nop {
    #[inline(always)]
    fn spin(&mut self) {
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!("nop", options(nomem, nostack, preserves_flags));
        }
        #[cfg(not(target_arch = "aarch64"))]
        core::hint::spin_loop();
    }
}

/// Busy-wait delay counting loop iterations.
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay<S = Nop> {
    iterations_per_us: u32,
    body: S,
}

impl SpinDelay<Nop> {
    pub const fn new() -> Self {
        Self::with_calibration(ITERATIONS_PER_US, Nop)
    }
}

impl Default for SpinDelay<Nop> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Spin> SpinDelay<S> {
    pub const fn with_calibration(iterations_per_us: u32, body: S) -> Self {
        Self { iterations_per_us, body }
    }

    pub fn iterations_per_us(&self) -> u32 {
        self.iterations_per_us
    }

    pub fn body(&self) -> &S {
        &self.body
    }

    /// Number of loop iterations `spin_sleep_us(us)` runs.
    #[inline]
    pub fn iterations_for_us(&self, us: u64) -> u64 {
        us.saturating_mul(self.iterations_per_us as u64)
    }

    /// Spin for roughly `us` microseconds.
    #[inline(never)]
    pub fn spin_sleep_us(&mut self, us: u64) {
        for _ in 0..self.iterations_for_us(us) {
            self.body.spin();
        }
    }

    /// Spin for roughly `ms` milliseconds, exactly `spin_sleep_us(ms * 1000)`.
    #[inline]
    pub fn spin_sleep_ms(&mut self, ms: u32) {
        self.spin_sleep_us(ms as u64 * 1_000);
    }
}

impl<S: Spin> DelayNs for SpinDelay<S> {
    fn delay_ns(&mut self, ns: u32) {
        // Microseconds are the finest step the calibration knows about.
        self.spin_sleep_us(ns.div_ceil(1_000) as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.spin_sleep_us(us as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.spin_sleep_ms(ms);
    }
}
