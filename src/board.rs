//! Raspberry Pi Pico implementation of the hardware seams.
//!
//! | Signal            | Pin            |
//! |-------------------|----------------|
//! | H0 current sense  | GPIO26 / ADC0  |
//! | H1 current sense  | GPIO27 / ADC1  |
//! | Temperature       | GPIO28 / ADC2  |
//! | Voltage reference | GPIO29 / ADC3  |
//! | ON_OFF button     | GPIO10         |
//! | POWER button      | GPIO11         |
//! | Serial            | GPIO0 / GPIO1  |
//! | Heartbeat LED     | GPIO25         |

use embassy_rp::flash::{self, Blocking, Flash, ERASE_SIZE};
use embassy_rp::gpio::Flex;
use embassy_rp::pac;
use embassy_rp::peripherals::{FLASH, UART0};
use embassy_rp::uart::{Async, UartTx};
use embassy_time::{block_for, Duration, Instant};
use embedded_hal::delay::DelayNs;

use crate::config::ByteStore;
use crate::hal::{Board, Button, Converter, Input};
use crate::status::{render, Status, StatusSink};

pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Last sector, kept out of the program image by memory.x
const CONFIG_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;
const CONFIG_LEN: usize = 16;

/// 48 MHz / (1 + 4999) = 9600 conversions per second
const ADC_DIV_INT: u16 = 4999;

/// Button outputs. Released pins float so the appliance's own buttons keep working.
pub struct RpBoard<'d> {
    on_off: Flex<'d>,
    power: Flex<'d>,
}

impl<'d> RpBoard<'d> {
    pub fn new(mut on_off: Flex<'d>, mut power: Flex<'d>) -> Self {
        for pin in [&mut on_off, &mut power] {
            pin.set_low();
            pin.set_as_input();
        }
        Self { on_off, power }
    }

    fn pin(&mut self, button: Button) -> &mut Flex<'d> {
        match button {
            Button::OnOff => &mut self.on_off,
            Button::Power => &mut self.power,
        }
    }
}

impl DelayNs for RpBoard<'_> {
    fn delay_ns(&mut self, ns: u32) {
        block_for(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(ms as u64));
    }
}

impl Board for RpBoard<'_> {
    fn set_output_active(&mut self, button: Button) {
        // The output latch is low, so this pulls the button line to ground
        self.pin(button).set_as_output();
    }

    fn release_output(&mut self, button: Button) {
        self.pin(button).set_as_input();
    }

    fn read_clock_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// ADC in paced free-running mode, one FIFO interrupt per conversion.
///
/// The ADC block must already be reset and enabled (`embassy_rp::adc::Adc::new_blocking`) and the
/// pins switched to analog.
pub struct RpConverter {
    running: bool,
}

impl RpConverter {
    pub fn new() -> Self {
        let adc = pac::ADC;
        adc.div().write(|w| {
            w.set_int(ADC_DIV_INT);
            w.set_frac(0);
        });
        adc.fcs().write(|w| {
            w.set_en(true);
            w.set_thresh(1);
        });
        adc.inte().write(|w| w.set_fifo(true));
        Self { running: false }
    }
}

impl Default for RpConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for RpConverter {
    // AINSEL is sampled when the next paced conversion starts, well after the FIFO interrupt
    const LOOKAHEAD: usize = 1;

    fn begin_conversion(&mut self, input: Input) {
        let ainsel = match input {
            Input::H0 => 0,
            Input::H1 => 1,
            Input::Temperature => 2,
            Input::Voltage => 3,
        };
        let start = !self.running;
        pac::ADC.cs().modify(|w| {
            w.set_ainsel(ainsel);
            if start {
                w.set_start_many(true);
            }
        });
        self.running = true;
    }

    fn read_last_conversion(&mut self) -> u16 {
        let adc = pac::ADC;
        // After interrupts were masked for long (flash erase) several results of the same input
        // are queued; keep the newest
        let mut value = adc.fifo().read().val();
        while adc.fcs().read().level() > 0 {
            value = adc.fifo().read().val();
        }
        if adc.fcs().read().over() {
            adc.fcs().modify(|w| w.set_over(true));
        }
        // 12-bit results, calibration is in 10-bit units
        value >> 2
    }
}

/// Configuration bytes in the last flash sector.
pub struct FlashStore<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> FlashStore<'d> {
    pub fn new(flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>) -> Self {
        Self { flash }
    }
}

impl ByteStore for FlashStore<'_> {
    type Error = flash::Error;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Self::Error> {
        if addr as usize >= CONFIG_LEN {
            return Err(flash::Error::OutOfBounds);
        }
        let mut byte = [0u8; 1];
        self.flash.blocking_read(CONFIG_OFFSET + addr as u32, &mut byte)?;
        Ok(byte[0])
    }

    /// Rewrites the whole sector; callers only write on change.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        if addr as usize >= CONFIG_LEN {
            return Err(flash::Error::OutOfBounds);
        }
        let mut image = [0xFFu8; CONFIG_LEN];
        self.flash.blocking_read(CONFIG_OFFSET, &mut image)?;
        image[addr as usize] = value;
        self.flash
            .blocking_erase(CONFIG_OFFSET, CONFIG_OFFSET + ERASE_SIZE as u32)?;
        self.flash.blocking_write(CONFIG_OFFSET, &image)
    }
}

/// Status lines on UART0.
pub struct SerialSink<'d> {
    tx: UartTx<'d, UART0, Async>,
}

impl<'d> SerialSink<'d> {
    pub fn new(tx: UartTx<'d, UART0, Async>) -> Self {
        Self { tx }
    }

    pub fn write_line(&mut self, line: &str) {
        if self.tx.blocking_write(line.as_bytes()).is_err() || self.tx.blocking_write(b"\r\n").is_err() {
            warn!("uart tx failed");
        }
    }
}

impl StatusSink for SerialSink<'_> {
    fn emit(&mut self, status: &Status) {
        let line = render(status);
        self.write_line(line.as_str());
    }
}
