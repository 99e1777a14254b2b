//! Text rendering of nights for the terminal view.

use chrono::{DateTime, Duration, Local, Utc};

use crate::models::SleepNight;

/// Render a duration as `7h 05m`.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Render a timestamp in the local time zone.
pub fn format_time(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%a %b %d %Y %H:%M").to_string()
}

/// Quality label, or `-` when the night has not been rated.
pub fn quality_label(night: &SleepNight) -> &'static str {
    night.quality.map_or("-", |q| q.label())
}

/// One-line description of tonight's state.
pub fn describe_tonight(tonight: Option<&SleepNight>, now: DateTime<Utc>) -> String {
    tonight.map_or_else(
        || "Not tracking.".to_string(),
        |night| {
            format!(
                "Tracking night {} since {} ({} so far)",
                night.night_id,
                format_time(&night.start_time),
                format_duration(now - night.start_time)
            )
        },
    )
}

/// Tabular history, newest first.
pub fn format_nights(nights: &[SleepNight]) -> String {
    let mut out = format!(
        "{:<6} {:<22} {:<22} {:<10} {}\n",
        "ID", "START", "END", "SLEPT", "QUALITY"
    );
    out.push_str(&"-".repeat(74));
    out.push('\n');

    for night in nights {
        let (end, slept) = if night.in_progress() {
            ("in progress".to_string(), "-".to_string())
        } else {
            (
                format_time(&night.end_time),
                format_duration(night.duration()),
            )
        };
        out.push_str(&format!(
            "{:<6} {:<22} {:<22} {:<10} {}\n",
            night.night_id,
            format_time(&night.start_time),
            end,
            slept,
            quality_label(night),
        ));
    }
    out
}
