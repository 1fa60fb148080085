//! Per-node event log persistence
//!
//! Logs are written once, after every round has finished. Each node gets its
//! own `node<id>.log` file so that one failing write never affects another.

use crate::node::Node;
use rumor_core::{EventRecord, NodeId};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk record format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// One human-readable event per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Destination for a node's event log
pub trait LogSink {
    fn persist(&self, node: NodeId, records: &[EventRecord]) -> Result<(), SinkError>;
}

/// Writes `node<id>.log` files into a directory
pub struct FileLogSink {
    dir: PathBuf,
    format: LogFormat,
}

impl FileLogSink {
    pub fn new(dir: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for a node
    pub fn path_for(&self, node: NodeId) -> PathBuf {
        self.dir.join(format!("node{}.log", node))
    }
}

impl LogSink for FileLogSink {
    fn persist(&self, node: NodeId, records: &[EventRecord]) -> Result<(), SinkError> {
        let mut out = BufWriter::new(File::create(self.path_for(node))?);
        for record in records {
            match self.format {
                LogFormat::Text => writeln!(out, "{}", record)?,
                LogFormat::Json => {
                    serde_json::to_writer(&mut out, record)?;
                    writeln!(out)?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Outcome of persisting every node's log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub written: usize,
    /// Nodes whose log could not be persisted
    pub failed: Vec<NodeId>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Persist every node's log, isolating failures per node
pub fn persist_all(sink: &dyn LogSink, nodes: &[Arc<Node>]) -> PersistReport {
    let mut report = PersistReport::default();

    for node in nodes {
        let records = node.log();
        match sink.persist(node.id(), &records) {
            Ok(()) => report.written += 1,
            Err(e) => {
                error!("Error writing log for Node {}: {}", node.id(), e);
                report.failed.push(node.id());
            }
        }
    }

    info!(
        "Persisted {} node logs ({} failed)",
        report.written,
        report.failed.len()
    );
    report
}
