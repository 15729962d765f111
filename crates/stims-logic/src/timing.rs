//! Tick arithmetic.
//!
//! All world time is counted in integer ticks. Conversions never round.

/// Convert whole seconds to ticks at the given tick rate.
pub fn seconds_to_ticks(seconds: u32, ticks_per_second: u64) -> u64 {
    u64::from(seconds).saturating_mul(ticks_per_second)
}

/// Ticks elapsed since `start_tick`. A clock that runs backwards reads as 0.
pub fn elapsed_ticks(start_tick: u64, current_tick: u64) -> u64 {
    current_tick.saturating_sub(start_tick)
}

/// Whether a delay of `delay_ticks` started at `start_tick` has run out.
pub fn delay_elapsed(start_tick: u64, current_tick: u64, delay_ticks: u64) -> bool {
    elapsed_ticks(start_tick, current_tick) >= delay_ticks
}
