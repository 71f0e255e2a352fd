use crate::{KEEP_THRESHOLD, SP_THRESHOLD};

/// Operating state of the heating element as inferred from the current-sense channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OperatingState {
    #[default]
    Off = 0,
    /// Single power
    Sp = 1,
    /// Double power
    Dp = 2,
    /// Both channels read too low to tell SP from DP, but the unit is not off.
    Keep = 3,
}

impl OperatingState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Sp),
            2 => Some(Self::Dp),
            3 => Some(Self::Keep),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// SP or DP.
    pub fn is_power(self) -> bool {
        matches!(self, Self::Sp | Self::Dp)
    }
}

/// Calibration of the classifier in raw 10-bit converter units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    pub keep: u16,
    pub sp: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            keep: KEEP_THRESHOLD,
            sp: SP_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Map one pair of channel averages to a state. Rules are evaluated in order.
    pub fn classify(&self, h0: u16, h1: u16) -> OperatingState {
        if h0 == 0 && h1 == 0 {
            OperatingState::Off
        } else if h0 < self.keep && h1 < self.keep {
            OperatingState::Keep
        } else if h0 > self.sp || h0 < self.keep {
            OperatingState::Sp
        } else {
            OperatingState::Dp
        }
    }
}

/// Commits a classification only after it was seen twice in a row.
///
/// Relays mid-toggle produce one misclassified averaging window; the second reading absorbs it.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    pending: OperatingState,
    current: OperatingState,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            pending: OperatingState::Off,
            current: OperatingState::Off,
        }
    }

    /// Feed one raw classification, returns the committed state.
    pub fn update(&mut self, raw: OperatingState) -> OperatingState {
        if raw == self.pending {
            self.current = raw;
        } else {
            self.pending = raw;
        }
        self.current
    }

    pub fn current(&self) -> OperatingState {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperatingState::*;

    #[test]
    fn test_classify_rules_in_order() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0, 0), Off);
        assert_eq!(t.classify(0, 29), Keep);
        assert_eq!(t.classify(29, 29), Keep);
        // h0 low but h1 drawing current
        assert_eq!(t.classify(10, 400), Sp);
        assert_eq!(t.classify(751, 0), Sp);
        assert_eq!(t.classify(750, 0), Dp);
        assert_eq!(t.classify(30, 30), Dp);
        assert_eq!(t.classify(400, 400), Dp);
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(OperatingState::from_u8(2), Some(Dp));
        assert_eq!(OperatingState::from_u8(3), Some(Keep));
        assert_eq!(OperatingState::from_u8(0xFF), None);
        assert_eq!(Sp.as_u8(), 1);
    }

    #[test]
    fn test_debounce_needs_two_in_a_row() {
        let mut d = Debouncer::new();
        assert_eq!(d.update(Sp), Off);
        assert_eq!(d.update(Sp), Sp);
        assert_eq!(d.current(), Sp);
    }

    #[test]
    fn test_debounce_ignores_sandwiched_transient() {
        let mut d = Debouncer::new();
        d.update(Dp);
        d.update(Dp);
        assert_eq!(d.update(Keep), Dp);
        assert_eq!(d.update(Dp), Dp);
        assert_eq!(d.update(Sp), Dp);
        assert_eq!(d.update(Dp), Dp);
        assert_eq!(d.update(Off), Dp);
        assert_eq!(d.update(Sp), Dp);
        assert_eq!(d.update(Sp), Sp);
    }

    #[test]
    fn test_debounce_changes_only_on_consecutive_pairs() {
        // Deterministic pseudo-random sequence over the four states
        let mut x: u32 = 0x1234_5678;
        let mut d = Debouncer::new();
        let mut prev: Option<OperatingState> = None;
        let mut committed = d.current();
        for _ in 0..10_000 {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            let raw = OperatingState::from_u8((x % 4) as u8).unwrap();
            let now = d.update(raw);
            if now != committed {
                assert_eq!(prev, Some(raw));
                assert_eq!(now, raw);
            }
            committed = now;
            prev = Some(raw);
        }
    }
}
