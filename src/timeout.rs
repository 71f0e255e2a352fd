use rand_core::RngCore;

/// One-shot expiring timer on the millisecond clock.
///
/// `check` reports expiry once and disarms the timer; it has to be reset to fire again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    deadline: Option<u64>,
}

impl Timeout {
    pub const fn disabled() -> Self {
        Self { deadline: None }
    }

    pub fn new(now: u64, interval: u64) -> Self {
        Self {
            deadline: Some(now.saturating_add(interval)),
        }
    }

    pub fn reset(&mut self, now: u64, interval: u64) {
        self.deadline = Some(now.saturating_add(interval));
    }

    /// Re-arm at `interval` +/- `skew`, chosen uniformly.
    pub fn reset_skewed<R: RngCore>(&mut self, now: u64, interval: u64, skew: u64, rng: &mut R) {
        let jitter = if skew == 0 {
            0
        } else {
            rng.next_u64() % (2 * skew)
        };
        self.reset(now, interval.saturating_sub(skew) + jitter);
    }

    pub fn disable(&mut self) {
        self.deadline = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn check(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
