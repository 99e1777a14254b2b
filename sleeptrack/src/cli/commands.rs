//! CLI command execution.
//!
//! Each invocation opens the store, refreshes a tracker over it, runs one
//! action and closes the tracker again.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::debug;

use crate::config::Config;
use crate::format::{describe_tonight, format_duration, format_nights, format_time};
use crate::models::SleepQuality;
use crate::store::SqliteStore;
use crate::tracker::{SleepTracker, TrackerEvent};

use super::args::{Cli, Commands};

// === Command Execution ===

pub async fn execute(cli: Cli, config: &Config) -> Result<()> {
    let db_path = config.database_path(cli.db.as_deref())?;
    debug!(path = %db_path.display(), "using database");

    let store = SqliteStore::open(&db_path)?;
    let tracker = SleepTracker::new(Arc::new(store));

    let mut stdout = std::io::stdout().lock();
    let result = run(&tracker, cli.command, &mut stdout).await;
    tracker.close();
    result
}

/// Refresh the tracker and run one command against it.
pub async fn run(
    tracker: &SleepTracker,
    command: Option<Commands>,
    out: &mut impl Write,
) -> Result<()> {
    tracker.refresh().await?;

    match command {
        Some(Commands::Start) => start(tracker, out).await,
        Some(Commands::Stop) => stop(tracker, out).await,
        Some(Commands::Status) | None => status(tracker, out),
        Some(Commands::List { json }) => list(tracker, json, out),
        Some(Commands::Rate { quality, night }) => rate(tracker, &quality, night, out).await,
        Some(Commands::Clear) => clear(tracker, out).await,
    }
}

async fn start(tracker: &SleepTracker, out: &mut impl Write) -> Result<()> {
    if let Some(night) = tracker.tracking() {
        bail!(
            "Already tracking night {} since {}. Run `sleeptrack stop` first.",
            night.night_id,
            format_time(&night.start_time)
        );
    }

    let night = tracker.start().await?;
    writeln!(
        out,
        "Started night {} at {}",
        night.night_id,
        format_time(&night.start_time)
    )?;
    Ok(())
}

async fn stop(tracker: &SleepTracker, out: &mut impl Write) -> Result<()> {
    let mut events = tracker.take_events();

    let Some(night) = tracker.stop().await? else {
        writeln!(out, "Not tracking; nothing to stop.")?;
        return Ok(());
    };

    writeln!(
        out,
        "Stopped night {} after {}",
        night.night_id,
        format_duration(night.duration())
    )?;

    if let Some(Ok(TrackerEvent::NightStopped { night_id })) =
        events.as_mut().map(tokio::sync::mpsc::UnboundedReceiver::try_recv)
    {
        writeln!(
            out,
            "How did you sleep? Rate it with `sleeptrack rate <0-5> --night {night_id}`"
        )?;
    }
    Ok(())
}

fn status(tracker: &SleepTracker, out: &mut impl Write) -> Result<()> {
    let tonight = tracker.tracking();
    writeln!(out, "{}", describe_tonight(tonight.as_ref(), Utc::now()))?;

    let controls = tracker.controls();
    let available: Vec<&str> = [
        (controls.start, "start"),
        (controls.stop, "stop"),
        (controls.clear, "clear"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();
    writeln!(out, "Available: {}", available.join(", "))?;
    Ok(())
}

fn list(tracker: &SleepTracker, json: bool, out: &mut impl Write) -> Result<()> {
    let nights = tracker.nights();

    if json {
        serde_json::to_writer_pretty(&mut *out, &nights).context("Failed to write JSON")?;
        writeln!(out)?;
        return Ok(());
    }

    if nights.is_empty() {
        writeln!(out, "No nights recorded.")?;
        return Ok(());
    }

    write!(out, "{}", format_nights(&nights))?;
    Ok(())
}

async fn rate(
    tracker: &SleepTracker,
    quality: &str,
    night_id: Option<i64>,
    out: &mut impl Write,
) -> Result<()> {
    let Some(quality) = SleepQuality::parse(quality) else {
        bail!("Invalid quality '{quality}': use 0-5 or very-bad, poor, so-so, ok, good, excellent");
    };

    let night_id = match night_id {
        Some(id) => id,
        None => tracker
            .latest_finished()
            .map(|n| n.night_id)
            .context("No finished night to rate")?,
    };

    let night = tracker.rate(night_id, quality).await?;
    writeln!(out, "Rated night {}: {}", night.night_id, quality)?;
    Ok(())
}

async fn clear(tracker: &SleepTracker, out: &mut impl Write) -> Result<()> {
    let count = tracker.clear().await?;
    writeln!(out, "Cleared {count} night(s).")?;
    Ok(())
}
