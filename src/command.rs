//! Serial command protocol: `!B` followed by one command character.

/// Operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Status request
    Query,
    /// Push the on/off button
    OnOff,
    /// Push the power button
    Power,
    /// Switch to (and remember) OFF
    Off,
    /// Switch to (and remember) single power
    Sp,
    /// Switch to (and remember) double power
    Dp,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'?' => Some(Self::Query),
            b'O' => Some(Self::OnOff),
            b'P' => Some(Self::Power),
            b'0' => Some(Self::Off),
            b'1' => Some(Self::Sp),
            b'2' => Some(Self::Dp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParseState {
    #[default]
    Any,
    /// `!` was read, waiting for `B`
    Attention,
    /// `!B` was read, waiting for the command character
    Command,
}

/// Byte-at-a-time parser. Garbage is skipped until the next `!`.
#[derive(Debug, Default)]
pub struct Parser {
    state: ParseState,
}

impl Parser {
    pub const fn new() -> Self {
        Self {
            state: ParseState::Any,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<Command> {
        match self.state {
            ParseState::Any => {
                if byte == b'!' {
                    self.state = ParseState::Attention;
                }
                None
            }
            ParseState::Attention => {
                self.state = if byte == b'B' {
                    ParseState::Command
                } else {
                    ParseState::Any
                };
                None
            }
            ParseState::Command => {
                self.state = ParseState::Any;
                Command::from_byte(byte)
            }
        }
    }
}
