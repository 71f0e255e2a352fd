//! Status lines for the serial link.
//!
//! ```text
//! [B:1 t24.9 c1;u00013042](v5.0a0812b0100)r*
//!    |    |   |  | | | |    |   |     |   |
//!    |    |   |  | | | |    |   |     |   reason tag, '*' terminated (absent when periodic)
//!    |    |   |  | | | |    |   |     H1 average
//!    |    |   |  | | | |    |   H0 average
//!    |    |   |  | | | |    minimum supply voltage over the last minute
//!    |    |   |  days hours minutes seconds of uptime
//!    |    |   desired (persisted) state
//!    |    temperature
//!    physical state
//! ```

use core::fmt;

use crate::acquisition::{Temperature, Voltage};
use crate::command::Command;
use crate::state::OperatingState;

/// Printed once at boot.
pub const BANNER: &str = "{B:Boiler started}*";

pub const HIGHLIGHT: char = '*';

/// Why a status line was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusReason {
    Periodic,
    FirstBoot,
    /// The physical state changed on its own (e.g. a manual button press)
    Changed,
    /// The persisted state was restored after boot
    Restored,
    /// Acknowledges an operator command
    Command(Command),
}

impl StatusReason {
    /// Tag character, `None` for unsolicited periodic lines.
    pub fn tag(self) -> Option<char> {
        match self {
            Self::Periodic => None,
            Self::FirstBoot => Some(HIGHLIGHT),
            Self::Changed => Some('c'),
            Self::Restored => Some('r'),
            Self::Command(Command::Query) => Some('?'),
            Self::Command(Command::OnOff) => Some('o'),
            Self::Command(Command::Power) => Some('p'),
            Self::Command(Command::Off) => Some('0'),
            Self::Command(Command::Sp) => Some('1'),
            Self::Command(Command::Dp) => Some('2'),
        }
    }
}

/// Uptime split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uptime {
    pub days: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Uptime {
    pub fn from_millis(ms: u64) -> Self {
        let secs = ms / 1000;
        Self {
            days: (secs / 86_400) as u32,
            hours: ((secs / 3600) % 24) as u8,
            minutes: ((secs / 60) % 60) as u8,
            seconds: (secs % 60) as u8,
        }
    }
}

/// Everything reported in one status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub reason: StatusReason,
    pub state: OperatingState,
    pub temperature: Temperature,
    pub desired: OperatingState,
    pub v_min: Voltage,
    pub h0: u16,
    pub h1: u16,
    pub uptime: Uptime,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[B:{} t{} c{};u{:02}{:02}{:02}{:02}](v{}a{:04}b{:04})",
            self.state.as_u8(),
            self.temperature,
            self.desired.as_u8(),
            self.uptime.days % 100,
            self.uptime.hours,
            self.uptime.minutes,
            self.uptime.seconds,
            self.v_min,
            self.h0,
            self.h1,
        )?;
        match self.reason.tag() {
            None => Ok(()),
            Some(HIGHLIGHT) => write!(f, "{}", HIGHLIGHT),
            Some(tag) => write!(f, "{}{}", tag, HIGHLIGHT),
        }
    }
}

/// Consumer of status lines (the serial port on the board).
pub trait StatusSink {
    fn emit(&mut self, status: &Status);
}

impl<T: StatusSink + ?Sized> StatusSink for &mut T {
    fn emit(&mut self, status: &Status) {
        (**self).emit(status)
    }
}

/// Render into a fixed buffer, for sinks that write raw bytes.
pub fn render(status: &Status) -> heapless::String<64> {
    use core::fmt::Write;

    let mut line = heapless::String::new();
    if write!(line, "{}", status).is_err() {
        warn!("status line truncated");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(reason: StatusReason) -> Status {
        Status {
            reason,
            state: OperatingState::Sp,
            temperature: Temperature(249),
            desired: OperatingState::Sp,
            v_min: Voltage(50),
            h0: 812,
            h1: 100,
            uptime: Uptime::from_millis(((1 * 24 + 3) * 3600 + 4 * 60 + 5) * 1000 + 999),
        }
    }

    #[test]
    fn test_uptime_split() {
        let uptime = Uptime::from_millis(((1 * 24 + 3) * 3600 + 4 * 60 + 5) * 1000 + 999);
        assert_eq!(
            uptime,
            Uptime {
                days: 1,
                hours: 3,
                minutes: 4,
                seconds: 5
            }
        );
    }

    #[test]
    fn test_render_tags() {
        assert_eq!(
            render(&sample(StatusReason::Periodic)).as_str(),
            "[B:1 t24.9 c1;u01030405](v5.0a0812b0100)"
        );
        assert_eq!(
            render(&sample(StatusReason::FirstBoot)).as_str(),
            "[B:1 t24.9 c1;u01030405](v5.0a0812b0100)*"
        );
        assert_eq!(
            render(&sample(StatusReason::Restored)).as_str(),
            "[B:1 t24.9 c1;u01030405](v5.0a0812b0100)r*"
        );
        assert_eq!(
            render(&sample(StatusReason::Command(Command::Dp))).as_str(),
            "[B:1 t24.9 c1;u01030405](v5.0a0812b0100)2*"
        );
    }

    #[test]
    fn test_render_before_first_voltage() {
        let mut status = sample(StatusReason::Command(Command::Query));
        status.v_min = Voltage::UNKNOWN;
        status.state = OperatingState::Keep;
        assert_eq!(
            render(&status).as_str(),
            "[B:3 t24.9 c1;u01030405](v-a0812b0100)?*"
        );
    }
}
