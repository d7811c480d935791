//! FileSink - appends captures to disk as JSON lines

use contracts::{CaptureError, CaptureSink, StreamPacket, SyncedCapture};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file path
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./captures.jsonl"));

        Self { path }
    }
}

/// Sink that appends one JSON line per capture
pub struct FileSink {
    name: String,
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            writer: BufWriter::new(file),
            path: config.path,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    fn append_line(&mut self, capture: &SyncedCapture<StreamPacket>) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, capture)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn persist_capture(&mut self, capture: &SyncedCapture<StreamPacket>) -> Result<(), CaptureError> {
        let name = self.name.clone();
        self.append_line(capture).map_err(|e| {
            error!(sink = %name, seq = capture.seq, error = %e, "Write failed");
            CaptureError::sink_write(name, e.to_string())
        })
    }
}

impl CaptureSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, capture),
        fields(sink = %self.name, seq = capture.seq)
    )]
    async fn write(&mut self, capture: &SyncedCapture<StreamPacket>) -> Result<(), CaptureError> {
        self.persist_capture(capture)?;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), CaptureError> {
        self.writer
            .flush()
            .map_err(|e| CaptureError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), CaptureError> {
        self.writer
            .flush()
            .map_err(|e| CaptureError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{CaptureMeta, CaptureRange};
    use tempfile::tempdir;

    fn sample_capture(seq: u64) -> SyncedCapture<StreamPacket> {
        let mut streams = HashMap::new();
        streams.insert(
            "odom".into(),
            vec![StreamPacket::new("odom", 5_000_000, Bytes::from_static(b"x"))],
        );
        SyncedCapture {
            seq,
            range: CaptureRange::new(5_000_000, 5_000_000),
            streams,
            meta: CaptureMeta::default(),
        }
    }

    #[tokio::test]
    async fn test_file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("captures.jsonl");
        let config = FileSinkConfig { path: path.clone() };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.write(&sample_capture(1)).await.unwrap();
        sink.write(&sample_capture(2)).await.unwrap();
        sink.flush().await.unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: SyncedCapture<StreamPacket> = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.seq, 1);
        assert_eq!(parsed.streams["odom"].len(), 1);
    }

    #[tokio::test]
    async fn test_file_sink_default_path_from_params() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.path, PathBuf::from("./captures.jsonl"));
    }
}
