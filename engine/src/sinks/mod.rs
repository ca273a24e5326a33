// Record sinks: where canonical records go once a source is normalized.
pub mod batch;
pub mod csv_sink;
pub mod json_sink;

pub use batch::{BatchSink, BatchWriter, JsonBatchWriter, DEFAULT_BATCH_SIZE};
pub use csv_sink::CsvSink;
pub use json_sink::JsonLinesSink;

use shared::models::CanonicalRecord;

use crate::error::EngineError;

// Common trait for all sinks. No transactional semantics: records emitted
// before a failure stay wherever the sink already put them.
pub trait RecordSink {
    fn name(&self) -> &str;
    fn emit(&mut self, record: &CanonicalRecord) -> Result<(), EngineError>;
    /// Flushes whatever is pending and returns the number of records delivered.
    fn finish(&mut self) -> Result<usize, EngineError>;
}

/// Emits every record in order, then finishes the sink.
pub fn drain_into<S: RecordSink + ?Sized>(
    sink: &mut S,
    records: &[CanonicalRecord],
) -> Result<usize, EngineError> {
    for record in records {
        sink.emit(record)?;
    }
    sink.finish()
}
