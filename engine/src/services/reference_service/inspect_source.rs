// Handler for the inspect operation: shows how a file would be normalized
// without writing anything.
use std::path::Path;

use shared::models::SourceKind;

use super::InspectReport;
use crate::config::{EngineSettings, SourceSettings};
use crate::data::{assemble, read_sheet, AssembleOptions};
use crate::error::EngineError;

pub fn handle_inspect_source(
    settings: &EngineSettings,
    path: &Path,
    kind: SourceKind,
    rows: usize,
) -> Result<InspectReport, EngineError> {
    // Reuse skip_rows, sheet and required fields of a configured source of the same kind.
    let source = settings
        .source(kind)
        .map(|configured| SourceSettings {
            file: path.to_path_buf(),
            ..configured.clone()
        })
        .unwrap_or_else(|| SourceSettings::new(kind, path));

    let spec = settings.column_spec(&source)?;
    let sheet = read_sheet(path, &settings.read_options(&source))?;
    let assembly = assemble(
        &sheet,
        &spec,
        &AssembleOptions {
            detect: settings.detect_options(),
        },
    )?;

    Ok(InspectReport {
        sheet: sheet.name.clone(),
        total_rows: sheet.len(),
        report: assembly.report,
        preview: assembly.records.into_iter().take(rows).collect(),
    })
}
