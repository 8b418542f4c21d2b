use std::io::Write;
use std::time::Duration;

use super::SnapshotStatus;

/// Clear the current terminal line (wipes progress indicator).
pub fn clear_line() {
    print!("\r\x1b[2K");
}

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// First line of a multi-line mismatch message, for one-line output.
fn headline(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}

/// Print a single snapshot result line.
pub fn print_line(name: &str, status: &SnapshotStatus, elapsed: Duration) {
    clear_line();
    let time_suffix = format!("  \x1b[2m{}\x1b[0m", format_duration(elapsed));

    match status {
        SnapshotStatus::Pass => {
            println!("  \x1b[32mPASS\x1b[0m  {name}{time_suffix}");
        }
        SnapshotStatus::Fail(message) => {
            println!(
                "  \x1b[31mFAIL\x1b[0m  {name}  ({}){time_suffix}",
                headline(message)
            );
            for extra in message.lines().skip(1) {
                println!("        {extra}");
            }
        }
        SnapshotStatus::New => {
            println!("  \x1b[33m NEW\x1b[0m  {name}  (no reference){time_suffix}");
        }
        SnapshotStatus::Error(msg) => {
            println!("  \x1b[31m ERR\x1b[0m  {name}  ({msg}){time_suffix}");
        }
    }
}

/// Show comparison progress indicator.
pub fn show_progress(done: usize, total: usize) {
    if done < total {
        print!("  Comparing  [{done}/{total}]");
        let _ = std::io::stdout().flush();
    }
}

/// Print an actionable summary listing snapshot names grouped by status.
/// Only prints sections with at least one entry.
pub fn print_actionable_summary(failed: &[String], new: &[String], errored: &[String]) {
    if failed.is_empty() && new.is_empty() && errored.is_empty() {
        return;
    }

    clear_line();
    println!();
    println!("Actionable snapshots:");

    for (label, names) in [("Failed", failed), ("New", new), ("Errored", errored)] {
        if !names.is_empty() {
            println!();
            println!("  {label} ({}):", names.len());
            for name in names {
                println!("    {name}");
            }
        }
    }
}

/// Print the final summary.
pub fn print_summary(
    total: usize,
    passed: usize,
    failed: usize,
    new: usize,
    errored: usize,
    elapsed: Duration,
) {
    clear_line();
    println!();
    print!(
        "Snapshots:  {total} total, \x1b[32m{passed} passed\x1b[0m, \x1b[31m{failed} failed\x1b[0m, \x1b[33m{new} new\x1b[0m"
    );
    if errored > 0 {
        print!(", \x1b[31m{errored} errored\x1b[0m");
    }
    println!();
    println!("Time:       {}", format_duration(elapsed));

    if failed > 0 || new > 0 || errored > 0 {
        println!();
        if failed > 0 {
            println!("{failed} snapshot(s) have visual differences.");
        }
        if new > 0 {
            println!("{new} snapshot(s) have no reference.");
        }
        if errored > 0 {
            println!("{errored} snapshot(s) could not be compared.");
        }
        println!("Run `snapdiff approve` to accept the current snapshots.");
    }
}
