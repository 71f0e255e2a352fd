//! Reconciles the debounced physical state, operator commands and the persisted desired state.
//!
//! The hardware only offers two indirect actions: ON_OFF flips between OFF and whatever power
//! level the appliance remembers, POWER flips between SP and DP while on. Reaching an arbitrary
//! target therefore takes up to two button pulses with the state re-read in between.

use rand_core::RngCore;

use crate::acquisition::{SharedReadings, Temperature};
use crate::command::Command;
use crate::config::{ByteStore, Config};
use crate::hal::{Board, Button};
use crate::state::OperatingState;
use crate::status::{Status, StatusReason, StatusSink, Uptime};
use crate::timeout::Timeout;
use crate::{
    CMD_SETTLE_MS, CMD_TIMEOUT_MS, INITIAL_DUMP_INTERVAL_MS, PERIODIC_DUMP_INTERVAL_MS,
    PERIODIC_DUMP_SKEW_MS, RESTORE_RECHECK_INTERVAL_MS, RESTORE_STATE_INTERVAL_MS,
    RESTORE_TEMP_LIMIT,
};

pub struct Controller<'a, B, S, W, R> {
    board: B,
    config: Config<S>,
    sink: W,
    rng: R,
    readings: &'a SharedReadings,
    /// Last physical state seen by `check_update_state`
    prev_state: OperatingState,
    restore: Timeout,
    dump: Timeout,
    first_dump: bool,
}

impl<'a, B, S, W, R> Controller<'a, B, S, W, R>
where
    B: Board,
    S: ByteStore,
    W: StatusSink,
    R: RngCore,
{
    pub fn new(board: B, store: S, sink: W, rng: R, readings: &'a SharedReadings) -> Self {
        let now = board.read_clock_ms();
        Self {
            board,
            config: Config::new(store),
            sink,
            rng,
            readings,
            prev_state: OperatingState::Off,
            restore: Timeout::new(now, RESTORE_STATE_INTERVAL_MS),
            dump: Timeout::new(now, INITIAL_DUMP_INTERVAL_MS),
            first_dump: true,
        }
    }

    /// One main-loop iteration.
    pub fn poll(&mut self, command: Option<Command>) {
        self.dump_state();
        if let Some(command) = command {
            self.execute_command(command);
        }
        self.check_update_state(false);
        self.check_restore_state();
    }

    pub fn physical_state(&self) -> OperatingState {
        self.readings.state()
    }

    pub fn desired_state(&mut self) -> OperatingState {
        self.config.state()
    }

    pub fn temperature(&self) -> Temperature {
        self.readings.temperature()
    }

    /// A restore attempt (or recheck) is still scheduled.
    pub fn restore_pending(&self) -> bool {
        self.restore.is_enabled()
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Emit a status line. Every emission pushes the next periodic one out by a jittered minute.
    pub fn report(&mut self, reason: StatusReason) {
        let snapshot = self.readings.snapshot();
        let now = self.board.read_clock_ms();
        let status = Status {
            reason,
            state: self.readings.state(),
            temperature: snapshot.temperature(),
            desired: self.config.state(),
            v_min: snapshot.v_min,
            h0: snapshot.h0,
            h1: snapshot.h1,
            uptime: Uptime::from_millis(now),
        };
        self.sink.emit(&status);
        self.dump.reset_skewed(
            now,
            PERIODIC_DUMP_INTERVAL_MS,
            PERIODIC_DUMP_SKEW_MS,
            &mut self.rng,
        );
        self.first_dump = false;
    }

    /// Periodic (and first) status line.
    pub fn dump_state(&mut self) {
        if self.dump.check(self.board.read_clock_ms()) {
            let reason = if self.first_dump {
                StatusReason::FirstBoot
            } else {
                StatusReason::Periodic
            };
            self.report(reason);
        }
    }

    /// Operator entry point.
    pub fn execute_command(&mut self, command: Command) {
        info!("command {}", command);
        match command {
            Command::Query => {}
            Command::OnOff => self.execute_hardware_command(Button::OnOff),
            Command::Power => self.execute_hardware_command(Button::Power),
            Command::Off => self.command_state(OperatingState::Off),
            Command::Sp => self.command_state(OperatingState::Sp),
            Command::Dp => self.command_state(OperatingState::Dp),
        }
        self.report(StatusReason::Command(command));
    }

    fn command_state(&mut self, target: OperatingState) {
        self.config.set_state(target);
        self.change_state(target);
    }

    /// Press a button for `CMD_TIMEOUT_MS`, release it and wait for the sensed state to settle.
    ///
    /// Blocks the main loop; acquisition keeps running in interrupt context.
    pub fn execute_hardware_command(&mut self, button: Button) {
        debug!("press {}", button);
        self.board.set_output_active(button);
        self.board.delay_ms(CMD_TIMEOUT_MS);
        self.board.release_output(button);
        self.board.delay_ms(CMD_SETTLE_MS);
        self.check_update_state(true);
    }

    /// Drive the hardware towards `target`. Returns false when it is already there.
    pub fn change_state(&mut self, target: OperatingState) -> bool {
        let current = self.physical_state();
        if current == target {
            return false;
        }
        info!("change state {} -> {}", current, target);
        if (current == OperatingState::Off) != (target == OperatingState::Off) {
            self.execute_hardware_command(Button::OnOff);
        }
        let current = self.physical_state();
        if current.is_power() && target.is_power() && current != target {
            self.execute_hardware_command(Button::Power);
        }
        true
    }

    /// Follow the physical state into the persisted state.
    ///
    /// `force` is set after firmware-initiated presses, which report on their own.
    pub fn check_update_state(&mut self, force: bool) {
        let state = self.physical_state();
        if state == self.prev_state {
            return;
        }
        info!("physical state {} -> {}", self.prev_state, state);
        self.prev_state = state;
        self.restore.disable();

        let desired = self.config.state();
        let state = if state == OperatingState::Keep {
            if desired != OperatingState::Off {
                // Some power level is configured, an ambiguous reading must not overwrite it
                return;
            }
            OperatingState::Dp
        } else {
            state
        };
        if state != desired {
            self.config.set_state(state);
            if !force {
                self.report(StatusReason::Changed);
            }
        }
    }

    /// Restore once the restore timer expires, but never actuate while hot.
    pub fn check_restore_state(&mut self) {
        let now = self.board.read_clock_ms();
        if !self.restore.check(now) {
            return;
        }
        let temperature = self.readings.temperature();
        if temperature < Temperature(RESTORE_TEMP_LIMIT) {
            self.restore_state();
        } else {
            info!("restore deferred, temperature {}", temperature);
            self.restore.reset(now, RESTORE_RECHECK_INTERVAL_MS);
        }
    }

    pub fn restore_state(&mut self) {
        let desired = self.config.state();
        if desired.is_power() && self.change_state(desired) {
            info!("restored {}", desired);
            self.report(StatusReason::Restored);
        }
    }
}
