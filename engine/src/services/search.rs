// Free-text lookup over cleaned reference files.
use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use shared::models::{CanonicalRecord, FieldValue, SourceKind};
use tracing::debug;

use crate::error::EngineError;
use crate::models::{ColumnSpec, FieldKind};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Every matching record, not only the ones returned.
    pub total: usize,
    pub hits: Vec<CanonicalRecord>,
}

impl SearchHits {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.hits.len())
    }
}

pub fn default_search_fields(kind: SourceKind) -> &'static [&'static str] {
    match kind {
        SourceKind::Catalog | SourceKind::LaborCost => &["descricao"],
        SourceKind::Pharma => &["produto", "substancia"],
    }
}

/// Case-insensitive substring match against any of `fields`. An empty or
/// blank term matches nothing.
pub fn search<S: AsRef<str>>(
    records: &[CanonicalRecord],
    fields: &[S],
    term: &str,
    limit: usize,
) -> SearchHits {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return SearchHits::default();
    }

    let mut result = SearchHits::default();
    for record in records {
        let matched = fields.iter().any(|field| {
            record
                .text(field.as_ref())
                .map(|text| text.to_lowercase().contains(&needle))
                .unwrap_or(false)
        });
        if matched {
            result.total += 1;
            if result.hits.len() < limit {
                result.hits.push(record.clone());
            }
        }
    }
    debug!(term, total = result.total, "search finished");
    result
}

/// Loads a file written by `CsvSink` back into records. Columns are matched
/// by name; missing columns and empty fields become null.
pub fn read_cleaned_csv<P: AsRef<Path>>(
    path: P,
    spec: &ColumnSpec,
) -> Result<Vec<CanonicalRecord>, EngineError> {
    let bytes = fs::read(path.as_ref())?;
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());

    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(content);
    let headers = rdr.headers()?.clone();
    let positions: Vec<Option<usize>> = spec
        .fields
        .iter()
        .map(|field| headers.iter().position(|h| h.trim() == field.name))
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let mut record = CanonicalRecord::with_capacity(spec.fields.len());
        for (field, position) in spec.fields.iter().zip(&positions) {
            let raw = position.and_then(|i| row.get(i)).unwrap_or("");
            record.set(&field.name, cleaned_value(raw, field.kind));
        }
        records.push(record);
    }
    Ok(records)
}

fn cleaned_value(raw: &str, kind: FieldKind) -> FieldValue {
    if raw.is_empty() {
        return FieldValue::Null;
    }
    match kind {
        FieldKind::Numeric => raw
            .parse::<f64>()
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null),
        FieldKind::Text | FieldKind::Code => FieldValue::Text(raw.to_string()),
    }
}
