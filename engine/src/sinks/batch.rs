// Batched delivery to a remote store. The store itself sits behind
// BatchWriter; the sink only handles chunking and progress.
use std::io::Write;

use shared::models::CanonicalRecord;
use tracing::{error, info};

use super::RecordSink;
use crate::error::EngineError;

pub const DEFAULT_BATCH_SIZE: usize = 100;

pub trait BatchWriter {
    fn write_batch(&mut self, batch: &[CanonicalRecord]) -> Result<(), EngineError>;
}

/// Buffers records and hands them to the writer `batch_size` at a time.
/// The first failing batch aborts the sink; later emits are refused.
pub struct BatchSink<B: BatchWriter> {
    name: String,
    writer: B,
    batch_size: usize,
    pending: Vec<CanonicalRecord>,
    delivered: usize,
    batches: usize,
    aborted: bool,
}

impl<B: BatchWriter> BatchSink<B> {
    pub fn new(name: impl Into<String>, writer: B, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        BatchSink {
            name: name.into(),
            writer,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            delivered: 0,
            batches: 0,
            aborted: false,
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn into_inner(self) -> B {
        self.writer
    }

    fn flush_pending(&mut self) -> Result<(), EngineError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        match self.writer.write_batch(&self.pending) {
            Ok(()) => {
                self.delivered += self.pending.len();
                self.batches += 1;
                info!(
                    sink = %self.name,
                    batch = self.batches,
                    size = self.pending.len(),
                    delivered = self.delivered,
                    "batch delivered"
                );
                self.pending.clear();
                Ok(())
            }
            Err(e) => {
                self.aborted = true;
                error!(sink = %self.name, batch = self.batches + 1, error = %e, "batch failed");
                Err(EngineError::SinkError(format!(
                    "Batch {} of sink '{}' failed after {} records delivered: {}",
                    self.batches + 1,
                    self.name,
                    self.delivered,
                    e
                )))
            }
        }
    }
}

impl<B: BatchWriter> RecordSink for BatchSink<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&mut self, record: &CanonicalRecord) -> Result<(), EngineError> {
        if self.aborted {
            return Err(EngineError::SinkError(format!(
                "Sink '{}' aborted after a failed batch",
                self.name
            )));
        }
        self.pending.push(record.clone());
        if self.pending.len() >= self.batch_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, EngineError> {
        if !self.aborted {
            self.flush_pending()?;
        }
        Ok(self.delivered)
    }
}

/// Writes each batch as one JSON array line. Stands in for a remote table
/// insert when records are shipped as files.
pub struct JsonBatchWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonBatchWriter<W> {
    pub fn new(writer: W) -> Self {
        JsonBatchWriter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BatchWriter for JsonBatchWriter<W> {
    fn write_batch(&mut self, batch: &[CanonicalRecord]) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.writer, batch)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
