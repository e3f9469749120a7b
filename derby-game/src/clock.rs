//! Race clock: tick cadence and running-time display.
use std::time::Duration;

/// Real-time period between two ticks while a race is running.
pub const TICK_PERIOD: Duration = Duration::from_millis(50);

/// Simulated seconds represented by a single tick, whatever the real period.
pub const SIM_SECONDS_PER_TICK: u32 = 1;

/// Format simulated seconds as `HH:MM:SS`.
#[must_use]
pub fn format_running_time(total_seconds: u32) -> String {
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
