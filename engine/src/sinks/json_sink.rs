use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use shared::models::CanonicalRecord;

use super::RecordSink;
use crate::error::EngineError;

/// One JSON object per line, keys in canonical field order.
pub struct JsonLinesSink<W: Write> {
    name: String,
    writer: W,
    written: usize,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut sink = JsonLinesSink::from_writer(BufWriter::new(file));
        sink.name = path.display().to_string();
        Ok(sink)
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn from_writer(writer: W) -> Self {
        JsonLinesSink {
            name: "jsonl".to_string(),
            writer,
            written: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&mut self, record: &CanonicalRecord) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, EngineError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}
