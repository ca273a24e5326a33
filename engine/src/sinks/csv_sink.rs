use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};
use shared::models::{CanonicalRecord, FieldValue};

use super::RecordSink;
use crate::error::EngineError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes the cleaned "<kind>_limpo.csv" files: one header row with the
/// canonical field names, nulls as empty fields.
pub struct CsvSink<W: Write> {
    name: String,
    writer: Writer<W>,
    columns: Vec<String>,
    header_written: bool,
    written: usize,
}

impl CsvSink<File> {
    /// `write_bom` prepends a UTF-8 BOM so spreadsheet tools pick the right encoding.
    pub fn create<P: AsRef<Path>, S: AsRef<str>>(
        path: P,
        columns: &[S],
        write_bom: bool,
    ) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut file = File::create(path)?;
        if write_bom {
            file.write_all(UTF8_BOM)?;
        }
        let mut sink = CsvSink::from_writer(file, columns);
        sink.name = path.display().to_string();
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer<S: AsRef<str>>(writer: W, columns: &[S]) -> Self {
        CsvSink {
            name: "csv".to_string(),
            writer: WriterBuilder::new().from_writer(writer),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            header_written: false,
            written: 0,
        }
    }

    fn ensure_header(&mut self) -> Result<(), EngineError> {
        if !self.header_written {
            self.writer.write_record(&self.columns)?;
            self.header_written = true;
        }
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W, EngineError> {
        self.ensure_header()?;
        self.writer
            .into_inner()
            .map_err(|e| EngineError::SinkError(format!("Failed to flush CSV writer: {}", e)))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&mut self, record: &CanonicalRecord) -> Result<(), EngineError> {
        self.ensure_header()?;
        let row: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .map(FieldValue::to_field_string)
                    .unwrap_or_default()
            })
            .collect();
        self.writer.write_record(&row)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, EngineError> {
        self.ensure_header()?;
        self.writer.flush()?;
        Ok(self.written)
    }
}
