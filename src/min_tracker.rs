//! Approximate sliding minimum over the last `2^LEVELS` samples.
//!
//! Every level keeps two candidates, each the minimum of one half of a power-of-two block of
//! samples. An insertion overwrites one slot per level (picked by the matching bit of the
//! insertion counter) and carries the minimum of the pair upwards, so updates are O(LEVELS) and
//! the query is O(1) with `2 * LEVELS` values of memory.
//!
//! The result is exact over aligned blocks. A sample stays visible for at least `2^(LEVELS - 1)`
//! further insertions and may linger for up to one extra window after it left.

use crate::MIN_TRACKER_LEVELS;

pub struct WindowedMin<const LEVELS: usize = MIN_TRACKER_LEVELS> {
    slots: [[u16; 2]; LEVELS],
    counter: u32,
    minimum: u16,
}

impl<const LEVELS: usize> Default for WindowedMin<LEVELS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LEVELS: usize> WindowedMin<LEVELS> {
    /// Slots start above any legitimate sample, so an empty window reports "no dip".
    pub const EMPTY: u16 = u16::MAX;

    pub const fn new() -> Self {
        Self {
            slots: [[Self::EMPTY; 2]; LEVELS],
            counter: 0,
            minimum: Self::EMPTY,
        }
    }

    /// Number of samples covered by the window.
    pub const fn window() -> u32 {
        1 << LEVELS
    }

    pub fn insert(&mut self, value: u16) {
        let mut carry = value;
        for (level, pair) in self.slots.iter_mut().enumerate() {
            pair[((self.counter >> level) & 1) as usize] = carry;
            carry = pair[0].min(pair[1]);
        }
        self.minimum = carry;
        self.counter = (self.counter + 1) & (Self::window() - 1);
    }

    pub fn current_minimum(&self) -> u16 {
        self.minimum
    }
}
