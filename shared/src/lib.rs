pub mod models;
pub mod utils;

// Raw cells, canonical records and the Brazilian number helpers used by the engine.

pub use models::{CanonicalRecord, CellValue, FieldValue, RawSheet, SourceKind};
