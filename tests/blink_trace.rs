use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use pi_blinky::blinky::{self, Blinker, BLINK_PERIOD_MS, LED_PIN};
use pi_blinky::gpio::{FselWrite, Function, Gpio, Pin};
use pi_blinky::pac::gpio::{gpclr, gpfsel, gpset, GPCLR0, GPSET0};
use pi_blinky::pac::RegisterBlock;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Read(usize),
    Write(usize, u32),
    Delay(u32),
}

type Trace = Rc<RefCell<Vec<Event>>>;

/// Word-backed register block that records every access.
struct Bus {
    words: [u32; 16],
    trace: Trace,
}

impl Bus {
    fn new(trace: &Trace) -> Self {
        Self {
            words: [0; 16],
            trace: trace.clone(),
        }
    }
}

impl RegisterBlock for Bus {
    fn read(&mut self, offset: usize) -> u32 {
        self.trace.borrow_mut().push(Event::Read(offset));
        self.words[offset / 4]
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.trace.borrow_mut().push(Event::Write(offset, value));
        self.words[offset / 4] = value;
    }
}

struct RecordingDelay(Trace);

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        panic!("unexpected delay_ns({ns})");
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(Event::Delay(ms));
    }
}

/// Records delays until `left` runs out, then unwinds out of the endless loop.
struct BoundedDelay {
    trace: Trace,
    left: usize,
}

impl DelayNs for BoundedDelay {
    fn delay_ns(&mut self, ns: u32) {
        panic!("unexpected delay_ns({ns})");
    }

    fn delay_ms(&mut self, ms: u32) {
        if self.left == 0 {
            panic!("delay budget spent");
        }
        self.left -= 1;
        self.trace.borrow_mut().push(Event::Delay(ms));
    }
}

fn three_cycle_trace() -> Vec<Event> {
    let set = Event::Write(GPSET0, 1 << 16);
    let clr = Event::Write(GPCLR0, 1 << 16);
    let wait = Event::Delay(1000);

    let mut expected = vec![Event::Read(0x04), Event::Write(0x04, 1 << 18)];
    for _ in 0..3 {
        expected.extend([set, wait, clr, wait]);
    }
    expected
}

fn run_cycles(cycles: usize) -> Vec<Event> {
    let trace = Trace::default();
    let mut gpio = Gpio::new(Bus::new(&trace));

    let led = gpio.into_output(LED_PIN);
    let mut blinker = Blinker::new(led, RecordingDelay(trace.clone()), BLINK_PERIOD_MS);
    for _ in 0..cycles {
        blinker.cycle();
    }

    let events = trace.borrow().clone();
    events
}

#[test]
fn three_cycles_produce_the_expected_trace() {
    assert_eq!(run_cycles(3), three_cycle_trace());
}

#[test]
fn start_configures_gpio16_and_blinks_every_second() {
    let trace = Trace::default();
    let mut gpio = Gpio::new(Bus::new(&trace));
    let delay = BoundedDelay {
        trace: trace.clone(),
        left: 6,
    };

    let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
        blinky::start(&mut gpio, delay);
    }));
    assert!(unwound.is_err());

    // The seventh delay unwinds; the SET before it is part of the fourth cycle.
    let mut expected = three_cycle_trace();
    expected.push(Event::Write(GPSET0, 1 << 16));
    let events = trace.borrow().clone();
    assert_eq!(events, expected);
}

#[test]
fn run_loops_until_interrupted() {
    let trace = Trace::default();
    let mut gpio = Gpio::new(Bus::new(&trace));
    let delay = BoundedDelay {
        trace: trace.clone(),
        left: 40,
    };

    let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
        let led = gpio.into_output(LED_PIN);
        Blinker::new(led, delay, 250).run();
    }));
    assert!(unwound.is_err());

    let events = trace.borrow().clone();
    let delays = events.iter().filter(|e| **e == Event::Delay(250)).count();
    let sets = events.iter().filter(|e| **e == Event::Write(GPSET0, 1 << 16)).count();
    let clears = events.iter().filter(|e| **e == Event::Write(GPCLR0, 1 << 16)).count();
    assert_eq!((delays, sets, clears), (40, 21, 20));
}

#[test]
fn set_and_clear_strictly_alternate_starting_with_set() {
    let edges: Vec<usize> = run_cycles(25)
        .into_iter()
        .filter_map(|e| match e {
            Event::Write(offset, _) if offset == GPSET0 || offset == GPCLR0 => Some(offset),
            _ => None,
        })
        .collect();

    assert_eq!(edges.len(), 50);
    for (i, offset) in edges.iter().enumerate() {
        let expected = if i % 2 == 0 { GPSET0 } else { GPCLR0 };
        assert_eq!(*offset, expected, "edge {i}");
    }
}

#[test]
fn exactly_one_delay_between_edges() {
    let events = run_cycles(10);
    let edges: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Event::Write(o, _) if *o == GPSET0 || *o == GPCLR0))
        .map(|(i, _)| i)
        .collect();

    for pair in edges.windows(2) {
        let between = &events[pair[0] + 1..pair[1]];
        assert_eq!(between, [Event::Delay(BLINK_PERIOD_MS)]);
    }
    assert_eq!(events.last(), Some(&Event::Delay(BLINK_PERIOD_MS)));
}

#[test]
fn set_and_clear_registers_are_never_read() {
    let events = run_cycles(5);
    let reads: Vec<&Event> = events.iter().filter(|e| matches!(e, Event::Read(_))).collect();

    assert_eq!(reads, [&Event::Read(gpfsel(1))]);
}

#[test]
fn function_select_is_written_once_before_the_loop() {
    let events = run_cycles(4);
    let fsel_writes: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Event::Write(o, _) if *o == gpfsel(1)))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(fsel_writes, [1]);
}

fn field(word: u32, shift: u32) -> u32 {
    (word >> shift) & 0b111
}

fn configure(pin: Pin, prior: u32, write: FselWrite) -> u32 {
    let trace = Trace::default();
    let mut bus = Bus::new(&trace);
    bus.words[pin.fsel_index()] = prior;

    let mut gpio = Gpio::new(bus);
    gpio.set_function(pin, Function::Output, write);
    gpio.free().words[pin.fsel_index()]
}

proptest! {
    #[test]
    fn or_write_leaves_other_fields_alone(n in 0u8..=Pin::MAX, prior in any::<u32>()) {
        let pin = Pin::new(n).unwrap();
        let shift = pin.fsel_shift();
        let prior = prior & !(0b111 << shift);

        let after = configure(pin, prior, FselWrite::Or);

        prop_assert_eq!(field(after, shift), 1);
        prop_assert_eq!(after & !(0b111 << shift), prior);
    }

    #[test]
    fn masked_write_leaves_other_fields_alone(n in 0u8..=Pin::MAX, prior in any::<u32>()) {
        let pin = Pin::new(n).unwrap();
        let shift = pin.fsel_shift();

        let after = configure(pin, prior, FselWrite::Masked);

        prop_assert_eq!(field(after, shift), 1);
        prop_assert_eq!(after & !(0b111 << shift), prior & !(0b111 << shift));
    }

    #[test]
    fn edges_hit_only_the_pin_bit(n in 0u8..=Pin::MAX) {
        let pin = Pin::new(n).unwrap();
        let trace = Trace::default();
        let mut gpio = Gpio::new(Bus::new(&trace));

        gpio.assert(pin);
        gpio.deassert(pin);

        let bank = usize::from(n / 32);
        prop_assert_eq!(
            trace.borrow().clone(),
            vec![
                Event::Write(gpset(bank), 1 << (n % 32)),
                Event::Write(gpclr(bank), 1 << (n % 32)),
            ]
        );
    }
}
