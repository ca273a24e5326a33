// Turns one RawSheet into canonical records for one column spec:
// header detection -> column mapping -> compound split -> coercion -> filter.
use shared::models::{CanonicalRecord, CellValue, FieldValue, RawSheet, SourceKind};
use shared::utils::brazilian_format::{clean_code, clean_text, coerce_decimal_traced, CoercionStats};
use tracing::{debug, info, warn};

use super::column_mapper::{apply_positional_fallbacks, map_columns, ColumnMapping};
use super::compound::split_compound;
use super::header_detector::{detect_header, DetectOptions, HeaderLocation};
use crate::error::EngineError;
use crate::models::{ColumnSpec, FieldKind, FieldSpec};

static EMPTY_CELL: CellValue = CellValue::Empty;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    pub detect: DetectOptions,
}

/// Non-fatal conditions met while normalizing a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    HeaderNotFound { scanned: usize },
    FieldUnmapped { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub field: String,
    pub column: usize,
    pub header: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport {
    pub kind: SourceKind,
    pub header: HeaderLocation,
    pub mapping: Vec<MappedColumn>,
    pub diagnostics: Vec<Diagnostic>,
    pub rows_scanned: usize,
    pub rows_retained: usize,
    pub rows_rejected: usize,
    pub coercion: CoercionStats,
    /// Unmapped fields that the compound rule still fills from its source column.
    pub compound_filled: Vec<String>,
}

impl NormalizeReport {
    pub fn unmapped_fields(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::FieldUnmapped { field } => Some(field.as_str()),
                Diagnostic::HeaderNotFound { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub records: Vec<CanonicalRecord>,
    pub report: NormalizeReport,
}

/// Normalizes `sheet` with `spec`. Fails only when the source as a whole is
/// unusable: no column matched at all, or a required field cannot be filled.
#[tracing::instrument(level = "info", skip_all, fields(kind = %spec.kind, sheet = %sheet.name))]
pub fn assemble(
    sheet: &RawSheet,
    spec: &ColumnSpec,
    options: &AssembleOptions,
) -> Result<Assembly, EngineError> {
    let mut diagnostics = Vec::new();

    let header = detect_header(&sheet.rows, spec.markers.as_slice(), &options.detect);
    if let HeaderLocation::NotFound { scanned } = header {
        warn!(scanned, markers = ?spec.markers, "header row not found, using first row");
        diagnostics.push(Diagnostic::HeaderNotFound { scanned });
    }
    let header_index = header.row_index();

    let header_cells: Vec<String> = sheet
        .rows
        .get(header_index)
        .map(|row| row.iter().map(CellValue::to_text).collect())
        .unwrap_or_default();

    let mut mapping = map_columns(&header_cells, spec);
    let width = sheet
        .rows
        .iter()
        .skip(header_index)
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    apply_positional_fallbacks(&mut mapping, spec, width);

    if mapping.is_empty() {
        return Err(EngineError::NoUsableMapping { kind: spec.kind });
    }

    let mut compound_filled = Vec::new();
    for field in &spec.fields {
        if mapping.get(&field.name).is_some() {
            continue;
        }
        if filled_by_compound(spec, &mapping, &field.name) {
            debug!(field = %field.name, "field has no own column, filled by compound rule");
            compound_filled.push(field.name.clone());
        } else {
            warn!(field = %field.name, "field has no matching column");
        }
        diagnostics.push(Diagnostic::FieldUnmapped {
            field: field.name.clone(),
        });
    }
    ensure_required_reachable(spec, &mapping)?;

    let mut records = Vec::new();
    let mut coercion = CoercionStats::default();
    let mut rows_scanned = 0;
    let mut rows_rejected = 0;

    for row in sheet.rows.iter().skip(header_index + 1) {
        rows_scanned += 1;
        match build_record(row, spec, &mapping, &mut coercion) {
            Some(record) => records.push(record),
            None => rows_rejected += 1,
        }
    }

    if coercion.failed > 0 {
        debug!(failed = coercion.failed, "numeric cells could not be parsed and were nulled");
    }
    info!(
        retained = records.len(),
        rejected = rows_rejected,
        header_row = header_index,
        "source normalized"
    );

    let report = NormalizeReport {
        kind: spec.kind,
        header,
        mapping: mapping
            .iter()
            .map(|(field, column)| MappedColumn {
                field: field.to_string(),
                column,
                header: header_cells.get(column).cloned().unwrap_or_default(),
            })
            .collect(),
        diagnostics,
        rows_scanned,
        rows_retained: records.len(),
        rows_rejected,
        coercion,
        compound_filled,
    };

    Ok(Assembly { records, report })
}

/// A required field is reachable when it is mapped, or when the compound
/// rule can produce it from a mapped source column.
fn ensure_required_reachable(spec: &ColumnSpec, mapping: &ColumnMapping) -> Result<(), EngineError> {
    for field in &spec.required {
        if mapping.get(field).is_some() {
            continue;
        }
        if !filled_by_compound(spec, mapping, field) {
            return Err(EngineError::RequiredFieldUnmapped {
                kind: spec.kind,
                field: field.clone(),
            });
        }
    }
    Ok(())
}

fn filled_by_compound(spec: &ColumnSpec, mapping: &ColumnMapping, field: &str) -> bool {
    spec.compound
        .as_ref()
        .is_some_and(|rule| rule.produces(field) && mapping.get(&rule.source).is_some())
}

fn coerce_field(field: &FieldSpec, cell: &CellValue, stats: &mut CoercionStats) -> FieldValue {
    match field.kind {
        FieldKind::Text => clean_text(cell).into(),
        FieldKind::Code => clean_code(cell).into(),
        FieldKind::Numeric => coerce_decimal_traced(cell, stats).into(),
    }
}

fn cell_at<'a>(row: &'a [CellValue], mapping: &ColumnMapping, field: &str) -> &'a CellValue {
    mapping
        .get(field)
        .and_then(|column| row.get(column))
        .unwrap_or(&EMPTY_CELL)
}

fn build_record(
    row: &[CellValue],
    spec: &ColumnSpec,
    mapping: &ColumnMapping,
    stats: &mut CoercionStats,
) -> Option<CanonicalRecord> {
    let mut values: Vec<FieldValue> = spec
        .fields
        .iter()
        .map(|field| coerce_field(field, cell_at(row, mapping, &field.name), stats))
        .collect();

    if let Some(rule) = &spec.compound {
        if let (Some(code_pos), Some(text_pos)) =
            (spec.position(&rule.code_field), spec.position(&rule.text_field))
        {
            if values[text_pos].is_blank() && mapping.get(&rule.source).is_some() {
                let (code, text) = split_compound(cell_at(row, mapping, &rule.source));
                values[code_pos] = code.into();
                values[text_pos] = text.into();
            }
        }
    }

    let rejected = spec.required.iter().any(|name| {
        spec.position(name)
            .map_or(true, |pos| values[pos].is_blank())
    });
    if rejected {
        return None;
    }

    let mut record = CanonicalRecord::with_capacity(spec.fields.len());
    for (field, value) in spec.fields.iter().zip(values) {
        record.set(&field.name, value);
    }
    Some(record)
}
