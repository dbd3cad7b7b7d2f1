//! Service statistics and per-task watchdog reports.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One watchdog observation of a task.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TaskReport {
    pub task_id: String,
    pub client_id: String,
    pub status: String,
    pub nbr_running_threads: usize,
    pub nbr_queued_threads: usize,
    pub nbr_total_threads: usize,
    pub nbr_panels: usize,
    pub percentage_done: u8,
    pub elapsed_time: String,
}

/// Service-wide snapshot returned by `get_stats`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Stats {
    pub nbr_idle_tasks: u64,
    pub nbr_running_tasks: u64,
    pub nbr_finished_tasks: u64,
    pub nbr_stopped_tasks: u64,
    pub nbr_terminated_tasks: u64,
    pub nbr_error_tasks: u64,
    pub nbr_running_threads: usize,
    pub nbr_queued_threads: usize,
    pub nbr_finished_threads: u64,
    pub task_reports: Vec<TaskReport>,
}

/// Renders a duration in milliseconds as a compact `1h2m3s` string. Durations
/// under one second render as the empty string.
pub fn format_elapsed(millis: u64) -> String {
    let seconds = (millis / 1000) % 60;
    let minutes = (millis / 60_000) % 60;
    let hours = (millis / 3_600_000) % 24;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "");
        assert_eq!(format_elapsed(500), "");
        assert_eq!(format_elapsed(3_000), "3s");
        assert_eq!(format_elapsed(62_000), "1m2s");
        assert_eq!(format_elapsed(3_723_000), "1h2m3s");
    }
}
