use embedded_hal::digital::OutputPin;

/// Blinks an LED from the main loop so a hung loop is visible.
pub struct Heartbeat<P> {
    led: P,
    period_ms: u64,
    last_switch: u64,
    lit: bool,
}

impl<P: OutputPin> Heartbeat<P> {
    pub fn new(led: P, period_ms: u64) -> Self {
        Self {
            led,
            period_ms,
            last_switch: 0,
            lit: false,
        }
    }

    /// Toggle the LED when a period has passed since the last toggle.
    pub fn blink(&mut self, now: u64) {
        if now.saturating_sub(self.last_switch) < self.period_ms {
            return;
        }
        self.lit = !self.lit;
        self.last_switch = now;
        let result = if self.lit {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        if result.is_err() {
            warn!("heartbeat led write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    #[derive(Default)]
    struct Led {
        level: bool,
        toggles: usize,
    }

    impl ErrorType for Led {
        type Error = Infallible;
    }

    impl OutputPin for Led {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.level = false;
            self.toggles += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.level = true;
            self.toggles += 1;
            Ok(())
        }
    }

    /// Output whose writes always fail.
    #[derive(Default)]
    struct BrokenLed {
        attempts: usize,
    }

    impl ErrorType for BrokenLed {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenLed {
        fn set_low(&mut self) -> Result<(), ErrorKind> {
            self.attempts += 1;
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), ErrorKind> {
            self.attempts += 1;
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn test_failed_writes_keep_blinking() {
        let mut heartbeat = Heartbeat::new(BrokenLed::default(), 1000);
        for now in 0..=2500 {
            heartbeat.blink(now);
        }
        assert_eq!(heartbeat.led.attempts, 2);
        assert!(!heartbeat.lit);
    }

    #[test]
    fn test_toggles_once_per_period() {
        let mut heartbeat = Heartbeat::new(Led::default(), 1000);
        for now in 0..=3500 {
            heartbeat.blink(now);
        }
        assert_eq!(heartbeat.led.toggles, 3);
        assert!(heartbeat.led.level);
    }
}
