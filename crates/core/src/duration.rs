use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Render a duration as `HH:MM:SS`, or `D HH:MM:SS` once it spans a day.
///
/// This is the `time_limit_delta` format the leasing service accepts.
/// Sub-second precision is dropped.
pub fn format_time_delta(delta: Duration) -> String {
    let mut seconds = delta.as_secs();
    let days = seconds / SECONDS_PER_DAY;
    seconds %= SECONDS_PER_DAY;
    let hours = seconds / SECONDS_PER_HOUR;
    seconds %= SECONDS_PER_HOUR;
    let minutes = seconds / SECONDS_PER_MINUTE;
    seconds %= SECONDS_PER_MINUTE;

    if days == 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{days} {hours:02}:{minutes:02}:{seconds:02}")
    }
}
