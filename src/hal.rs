//! Narrow hardware seams the core logic is written against.
//!
//! The firmware implements them on top of the RP2040 peripherals (see `board`), the unit tests
//! implement them with a simulated plant.

use embedded_hal::delay::DelayNs;

/// Outputs wired in parallel with the appliance's own push buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Flips OFF and the last remembered power level.
    OnOff,
    /// Flips single and double power, only while not OFF.
    Power,
}

/// Analog inputs multiplexed onto the single converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Input {
    H0,
    H1,
    Temperature,
    Voltage,
}

/// Main-loop side of the hardware: button outputs, the clock and blocking delays.
///
/// Delays block the main loop only; conversions keep completing in interrupt context while the
/// board waits.
pub trait Board: DelayNs {
    /// Drive the button output active (pressed).
    fn set_output_active(&mut self, button: Button);

    /// Return the output to high impedance so the real button keeps control.
    fn release_output(&mut self, button: Button);

    /// Monotonic milliseconds since boot.
    fn read_clock_ms(&self) -> u64;
}

/// Interrupt side of the hardware: the analog converter.
pub trait Converter {
    /// How many conversions ahead a selection takes effect. 1 when the selection applies to the
    /// next conversion, 2 when the input latch is captured as the running conversion starts.
    const LOOKAHEAD: usize = 1;

    /// Select `input` for the next conversion and make sure the converter is running.
    fn begin_conversion(&mut self, input: Input);

    /// Result of the conversion that just completed, in 10-bit units.
    fn read_last_conversion(&mut self) -> u16;
}
