// Operations exposed by the binary: normalize configured sources, inspect a
// single file and search the cleaned outputs.
pub mod reference_service;
pub mod search;

pub use reference_service::{InspectReport, KindHits, ReferenceService, SourceOutcome, SourceSummary};
pub use search::{default_search_fields, read_cleaned_csv, search, SearchHits};
