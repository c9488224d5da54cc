//! Status command for showing store health.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use ut_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    writeln!(writer, "Usage tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    let transitions = db.transition_count()?;
    if transitions == 0 {
        writeln!(writer, "No transitions recorded.")?;
    } else {
        let last = db
            .last_transition_at()?
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(writer, "Transitions: {transitions} (last at {last})")?;
    }

    writeln!(writer, "Apps in directory: {}", db.app_count()?)?;

    let streak = db.load_streak_state()?;
    writeln!(
        writer,
        "Streak: current {}, best {}",
        streak.current_streak, streak.best_streak
    )?;

    Ok(())
}
