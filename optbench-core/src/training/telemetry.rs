//! Scalar telemetry sinks for per-step training losses.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::training::lossless;

/// Receives scalar points tagged with a global training step.
pub trait TelemetrySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct ScalarEvent<'a> {
    tag: &'a str,
    #[serde(serialize_with = "lossless::serialize_value")]
    value: f64,
    step: u64,
    wall_time: f64,
}

/// Appends one JSON object per scalar to `events.jsonl` in a log directory.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub const FILE_NAME: &'static str = "events.jsonl";

    pub fn create(log_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(Self::FILE_NAME);
        let file = File::options().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for JsonLinesSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()> {
        let event = ScalarEvent {
            tag,
            value,
            step,
            wall_time: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        };
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_sink_writes_one_line_per_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::create(&dir.path().join("tb")).unwrap();
        sink.add_scalar("loss", 0.5, 0).unwrap();
        sink.add_scalar("loss", 0.25, 10).unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["step"], 10);
        assert_eq!(lines[1]["value"], 0.25);
        assert_eq!(lines[0]["tag"], "loss");
    }
}
