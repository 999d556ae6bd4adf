//! Sinks for per-tick monitoring rows.
use std::cell::RefCell;
use std::fs::File;
use std::rc::Rc;

use serde::Serialize;

use crate::context::NetworkContext;
use crate::log_info;

/// Receives monitoring rows (e.g. CSV lines with channel throughput) grouped by category.
///
/// Failing to store a row must never affect the simulation, so the sink reports nothing back.
pub trait LogSink {
    fn append_line(&mut self, ctx: &NetworkContext, category: &str, line: String);

    fn save_log(&self, path: &str) -> Result<(), std::io::Error>;
}

impl<S: LogSink> LogSink for Rc<RefCell<S>> {
    fn append_line(&mut self, ctx: &NetworkContext, category: &str, line: String) {
        self.borrow_mut().append_line(ctx, category, line);
    }

    fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        self.borrow().save_log(path)
    }
}

/// Forwards rows to the log at the info level.
#[derive(Default)]
pub struct StdoutLogSink {}

impl StdoutLogSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogSink for StdoutLogSink {
    fn append_line(&mut self, ctx: &NetworkContext, category: &str, line: String) {
        log_info!(ctx, "{}: {}", category, line);
    }

    fn save_log(&self, _path: &str) -> Result<(), std::io::Error> {
        Ok(())
    }
}

#[derive(Serialize)]
struct SinkEntry {
    timestamp: f64,
    category: String,
    line: String,
}

/// Keeps rows in memory and writes them to a CSV file on [`LogSink::save_log`].
#[derive(Default)]
pub struct CsvLogSink {
    entries: Vec<SinkEntry>,
    categories: Option<Vec<String>>,
}

impl CsvLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink which keeps only rows of the listed categories.
    pub fn with_categories(categories: &[&str]) -> Self {
        Self {
            entries: Vec::new(),
            categories: Some(categories.iter().map(|c| c.to_string()).collect()),
        }
    }

    /// Returns stored rows of the category in order of arrival.
    pub fn lines(&self, category: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.line.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LogSink for CsvLogSink {
    fn append_line(&mut self, ctx: &NetworkContext, category: &str, line: String) {
        if let Some(categories) = &self.categories {
            if !categories.iter().any(|c| c == category) {
                return;
            }
        }
        self.entries.push(SinkEntry {
            timestamp: ctx.time(),
            category: category.to_string(),
            line,
        });
    }

    fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for entry in &self.entries {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ManualClock;

    #[test]
    fn rows_are_kept_per_category() {
        let clock = ManualClock::new();
        let ctx = NetworkContext::new("net", Rc::new(clock.clone()));
        let mut sink = CsvLogSink::with_categories(&["channel_throughput"]);
        sink.append_line(&ctx, "channel_throughput", "0,1,2,10.000".to_string());
        clock.set_time(5.);
        sink.append_line(&ctx, "link_utilization", "0,0,1,0.500".to_string());
        sink.append_line(&ctx, "channel_throughput", "0,1,2,20.000".to_string());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.lines("channel_throughput"), vec!["0,1,2,10.000", "0,1,2,20.000"]);
        assert!(sink.lines("link_utilization").is_empty());
    }

    #[test]
    fn save_to_csv() {
        let ctx = NetworkContext::new("net", Rc::new(ManualClock::new()));
        let mut sink = CsvLogSink::new();
        sink.append_line(&ctx, "link_utilization", "0,0,1,0.5".to_string());
        let path = std::env::temp_dir().join(format!("dslab-vnet-sink-{}.csv", std::process::id()));
        let path = path.to_str().unwrap();
        sink.save_log(path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        std::fs::remove_file(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("timestamp,category,line"));
        assert_eq!(lines.next(), Some("0.0,link_utilization,\"0,0,1,0.5\""));
    }
}
