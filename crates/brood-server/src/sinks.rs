//! Log and trace sinks
//!
//! Workers stream log entries and trace spans to the supervisor, which
//! forwards them to pluggable sinks. Sink failures are reported to the
//! caller but never take the supervisor down.

use brood_api::telemetry::{LogEntry, TraceSpan};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Consumer of worker log entries. Called concurrently from many tasks.
pub type LogSink = Arc<dyn Fn(LogEntry) + Send + Sync>;

/// A sink that re-emits worker log entries through the supervisor's own
/// tracing subscriber, tagged with their origin.
pub fn tracing_log_sink() -> LogSink {
    Arc::new(|entry: LogEntry| {
        match entry.level.as_str() {
            "error" => tracing::error!(
                target: "brood::worker",
                component = %entry.component,
                worker_id = %entry.worker_id,
                "{}",
                entry.msg
            ),
            "warn" => tracing::warn!(
                target: "brood::worker",
                component = %entry.component,
                worker_id = %entry.worker_id,
                "{}",
                entry.msg
            ),
            "debug" => tracing::debug!(
                target: "brood::worker",
                component = %entry.component,
                worker_id = %entry.worker_id,
                "{}",
                entry.msg
            ),
            _ => tracing::info!(
                target: "brood::worker",
                component = %entry.component,
                worker_id = %entry.worker_id,
                "{}",
                entry.msg
            ),
        }
    })
}

/// Append-only persistence for worker trace spans.
pub trait TraceSink: Send + Sync {
    fn store(&self, app: &str, deployment_id: &str, spans: &[TraceSpan]) -> anyhow::Result<()>;
}

/// Discards all spans.
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn store(&self, _app: &str, _deployment_id: &str, _spans: &[TraceSpan]) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct SpanRecord<'a> {
    app: &'a str,
    deployment_id: &'a str,
    #[serde(flatten)]
    span: &'a TraceSpan,
}

/// Appends spans to a file, one JSON record per line.
pub struct JsonFileTraceSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonFileTraceSink {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonFileTraceSink {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonFileTraceSink {
    fn store(&self, app: &str, deployment_id: &str, spans: &[TraceSpan]) -> anyhow::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        for span in spans {
            let record = SpanRecord {
                app,
                deployment_id,
                span,
            };
            serde_json::to_writer(&mut *file, &record)?;
            file.write_all(b"\n")?;
        }
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(name: &str) -> TraceSpan {
        TraceSpan {
            name: name.to_string(),
            trace_id: "t1".to_string(),
            span_id: "s1".to_string(),
            start_micros: 1,
            end_micros: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_json_file_sink_appends_one_record_per_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans.jsonl");
        let sink = JsonFileTraceSink::create(&path).unwrap();

        sink.store("app", "dep", &[span("a"), span("b")]).unwrap();
        sink.store("app", "dep", &[span("c")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["app"], "app");
        assert_eq!(first["deployment_id"], "dep");
        assert_eq!(first["name"], "a");
    }

    #[test]
    fn test_null_sink_accepts_anything() {
        NullTraceSink.store("app", "dep", &[span("x")]).unwrap();
    }
}
