#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod command;
pub mod config;
pub mod control;
pub mod hal;
pub mod heartbeat;
pub mod min_tracker;
pub mod state;
pub mod status;
pub mod timeout;

#[cfg(feature = "rp2040")]
pub mod board;

pub const KEEP_THRESHOLD: u16 = 30; // Both channels below this: element draws negligible current
pub const SP_THRESHOLD: u16 = 750; // H0 above this: single power

pub const AVERAGING_WINDOW: u16 = 480; // Samples per H0/H1 average (~0.5 s)
pub const MIN_TRACKER_LEVELS: usize = 16; // Voltage window is 2^16 samples (~1 min)

pub const TEMP_MUL: i32 = 107; // Raw temperature to tenths of a degree: (raw * MUL + ADD) / BASE
pub const TEMP_ADD: i32 = 780;
pub const TEMP_BASE: i32 = 100;

pub const VOLTAGE_REFERENCE: u32 = 11; // Reference measured on the voltage slots (tenths of a volt)
pub const ADC_FULL_SCALE: u32 = 1024; // 10-bit converter

pub const CMD_TIMEOUT_MS: u32 = 300; // How long to push a button
pub const CMD_SETTLE_MS: u32 = 1600; // State updates ~2 times per second, plus one change is skipped

pub const RESTORE_STATE_INTERVAL_MS: u64 = 60_000; // Restore after 1 min
pub const RESTORE_RECHECK_INTERVAL_MS: u64 = 10_000; // Recheck every 10 s while too hot
pub const RESTORE_TEMP_LIMIT: i16 = 600; // Restore only below 60.0 degrees C (tenths)

pub const INITIAL_DUMP_INTERVAL_MS: u64 = 2_000; // First status line after boot
pub const PERIODIC_DUMP_INTERVAL_MS: u64 = 60_000; // Status line every minute
pub const PERIODIC_DUMP_SKEW_MS: u64 = 5_000; // +/- jitter so units on a shared bus drift apart

pub const HEARTBEAT_INTERVAL_MS: u64 = 1_000; // LED toggle period
