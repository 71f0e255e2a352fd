//! Interrupt-driven analog acquisition.
//!
//! One converter is multiplexed over a fixed round robin of ten slots. Each completed conversion
//! is processed in interrupt context by [`Acquisition::on_conversion`], which also programs the
//! next slot. Everything the main loop needs is published into [`SharedReadings`].

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicU8, Ordering};

use crate::hal::{Converter, Input};
use crate::min_tracker::WindowedMin;
use crate::state::{Debouncer, OperatingState, Thresholds};
use crate::{ADC_FULL_SCALE, AVERAGING_WINDOW, TEMP_ADD, TEMP_BASE, TEMP_MUL, VOLTAGE_REFERENCE};

/// Conversion order. The voltage input is converted seven times in a row to raise its sampling
/// rate; only the last of the run is used, the others let the input settle after switching.
pub const SLOTS: [Input; 10] = [
    Input::H0,
    Input::H1,
    Input::Temperature,
    Input::Voltage,
    Input::Voltage,
    Input::Voltage,
    Input::Voltage,
    Input::Voltage,
    Input::Voltage,
    Input::Voltage,
];

const H0_SLOT: usize = 0;
const H1_SLOT: usize = 1;
const TEMPERATURE_SLOT: usize = 2;
const LAST_VOLTAGE_SLOT: usize = SLOTS.len() - 1;

/// Temperature in tenths of a degree Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub i16);

impl Temperature {
    pub fn from_raw(raw: u16) -> Self {
        let tenths = (raw as i32 * TEMP_MUL + TEMP_ADD) / TEMP_BASE;
        Self(tenths.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

/// Supply voltage in tenths of a volt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Voltage(pub u16);

impl Voltage {
    /// Nothing measured yet (or a reading of zero).
    pub const UNKNOWN: Self = Self(u16::MAX);

    /// The voltage slots measure a fixed reference against the supply, so the supply is
    /// `reference * full_scale / raw`.
    pub fn from_raw(raw: u16) -> Self {
        if raw == 0 {
            return Self::UNKNOWN;
        }
        let tenths = VOLTAGE_REFERENCE * ADC_FULL_SCALE / raw as u32;
        Self(tenths.min(u16::MAX as u32 - 1) as u16)
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::UNKNOWN {
            f.write_str("-")
        } else {
            write!(f, "{}.{}", self.0 / 10, self.0 % 10)
        }
    }
}

/// Values published by the interrupt handler, copied out as one consistent unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub h0: u16,
    pub h1: u16,
    pub temperature_raw: u16,
    pub v_min: Voltage,
}

impl Snapshot {
    const INIT: Self = Self {
        h0: 0,
        h1: 0,
        temperature_raw: 0,
        v_min: Voltage::UNKNOWN,
    };

    pub fn temperature(&self) -> Temperature {
        Temperature::from_raw(self.temperature_raw)
    }
}

/// Cross-context readings: written only by the interrupt handler, read by the main loop.
///
/// Multi-field values sit behind a critical section so a read can never observe half of an
/// update; the committed state is a single byte.
pub struct SharedReadings {
    snapshot: Mutex<CriticalSectionRawMutex, Cell<Snapshot>>,
    state: AtomicU8,
}

impl Default for SharedReadings {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedReadings {
    pub const fn new() -> Self {
        Self {
            snapshot: Mutex::new(Cell::new(Snapshot::INIT)),
            state: AtomicU8::new(OperatingState::Off as u8),
        }
    }

    /// Debounced physical state.
    pub fn state(&self) -> OperatingState {
        OperatingState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock(|cell| cell.get())
    }

    pub fn temperature(&self) -> Temperature {
        self.snapshot().temperature()
    }

    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        self.snapshot.lock(|cell| {
            let mut snapshot = cell.get();
            f(&mut snapshot);
            cell.set(snapshot);
        });
    }

    fn commit_state(&self, state: OperatingState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Running sum of one current-sense channel.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: u32,
    count: u16,
}

impl Accumulator {
    /// Add a sample, returns the average when the window is complete.
    fn push(&mut self, raw: u16) -> Option<u16> {
        self.sum += raw as u32;
        self.count += 1;
        if self.count < AVERAGING_WINDOW {
            return None;
        }
        let average = (self.sum / self.count as u32) as u16;
        *self = Self::default();
        Some(average)
    }
}

/// State owned by the conversion-complete interrupt.
pub struct Acquisition {
    slot: usize,
    h0: Accumulator,
    h1: Accumulator,
    h0_avg: u16,
    tracker: WindowedMin,
    debouncer: Debouncer,
    thresholds: Thresholds,
}

impl Acquisition {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            slot: 0,
            h0: Accumulator::default(),
            h1: Accumulator::default(),
            h0_avg: 0,
            tracker: WindowedMin::new(),
            debouncer: Debouncer::new(),
            thresholds,
        }
    }

    /// Program the first slots and start converting.
    pub fn start<C: Converter>(&mut self, converter: &mut C) {
        self.slot = 0;
        for input in SLOTS.iter().cycle().take(C::LOOKAHEAD) {
            converter.begin_conversion(*input);
        }
        debug!("acquisition started, {} slots", SLOTS.len());
    }

    /// Conversion-complete handler. Never blocks.
    pub fn on_conversion<C: Converter>(&mut self, converter: &mut C, shared: &SharedReadings) {
        let raw = converter.read_last_conversion();
        match self.slot {
            H0_SLOT => {
                if let Some(average) = self.h0.push(raw) {
                    self.h0_avg = average;
                }
            }
            H1_SLOT => {
                if let Some(h1_avg) = self.h1.push(raw) {
                    let h0_avg = self.h0_avg;
                    shared.update(|s| {
                        s.h0 = h0_avg;
                        s.h1 = h1_avg;
                    });
                    self.classify(h0_avg, h1_avg, shared);
                }
            }
            TEMPERATURE_SLOT => shared.update(|s| s.temperature_raw = raw),
            LAST_VOLTAGE_SLOT => {
                self.tracker.insert(Voltage::from_raw(raw).0);
                let v_min = Voltage(self.tracker.current_minimum());
                shared.update(|s| s.v_min = v_min);
            }
            _ => {}
        }

        // Selections made now apply LOOKAHEAD conversions after the one just completed
        let next = (self.slot + C::LOOKAHEAD) % SLOTS.len();
        self.slot = (self.slot + 1) % SLOTS.len();
        converter.begin_conversion(SLOTS[next]);
    }

    fn classify(&mut self, h0: u16, h1: u16, shared: &SharedReadings) {
        let raw = self.thresholds.classify(h0, h1);
        let before = self.debouncer.current();
        let committed = self.debouncer.update(raw);
        if committed != before {
            trace!("state {} -> {} (a{} b{})", before, committed, h0, h1);
        }
        shared.commit_state(committed);
    }
}
