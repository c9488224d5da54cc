//! Streak command: evaluate yesterday and show the counters.
//!
//! The day being evaluated is always yesterday (local), so its event data is
//! complete; the cutoff-hour gate in the evaluator protects callers that feed
//! it the current day.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};

use ut_core::{
    FallbackUsage, UsageEventSource, UsageWindow, WindowPreset, evaluate_day, format_duration,
    local_midnight_to_utc, summarize,
};
use ut_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config) -> Result<()> {
    let now = Utc::now();
    let now_local = Local::now().naive_local();
    let today = now_local.date();
    let Some(yesterday) = today.pred_opt() else {
        bail!("calendar underflow computing yesterday");
    };

    let start = local_midnight_to_utc(yesterday);
    let end = local_midnight_to_utc(today);
    let window = UsageWindow::new(start, end).context("invalid day window")?;

    let (from, to) = config.aggregator().slice_bounds(&window);
    let events = db
        .events_between(from, to)
        .context("failed to read the event log")?;

    // Daily evaluation always works from the authoritative event-derived
    // numbers; the coarse fallback never feeds the streak.
    let summary = summarize(
        &events,
        &FallbackUsage::new(),
        &window,
        WindowPreset::CalendarDay,
        now,
        &*db,
    );

    let state = db.load_streak_state()?;
    let next = evaluate_day(
        state,
        yesterday,
        summary.social_ms,
        now_local,
        &config.streak(),
    );

    if next == state {
        writeln!(writer, "Nothing to evaluate for {yesterday}.")?;
    } else {
        db.save_streak_state(&next)?;
        writeln!(
            writer,
            "Evaluated {yesterday}: social {}",
            format_duration(summary.social_ms)
        )?;
    }

    writeln!(
        writer,
        "Streak: current {}, best {}",
        next.current_streak, next.best_streak
    )?;
    Ok(())
}
