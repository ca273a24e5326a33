// Helper functions shared by the reference_service handlers and the binary.
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use shared::models::{CanonicalRecord, SourceKind};
use shared::utils::brazilian_format::format_decimal;

use super::{KindHits, SourceSummary};
use crate::data::{DetectionMethod, HeaderLocation, NormalizeReport};
use crate::error::EngineError;

pub fn ensure_output_dir(dir: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(dir).map_err(|e| {
        EngineError::ConfigError(format!("Cannot create output dir {}: {}", dir.display(), e))
    })
}

pub fn describe_header(header: &HeaderLocation) -> String {
    match header {
        HeaderLocation::Found { index, method: DetectionMethod::Markers } => {
            format!("linha {} (marcadores)", index)
        }
        HeaderLocation::Found { index, method: DetectionMethod::Density } => {
            format!("linha {} (densidade)", index)
        }
        HeaderLocation::NotFound { scanned } => {
            format!("não encontrado em {} linhas, usando linha 0", scanned)
        }
    }
}

/// Multi-line description of a report: header row, mapping, unmapped
/// fields and row counts.
pub fn describe_report(report: &NormalizeReport) -> String {
    let mut lines = vec![format!("Cabeçalho: {}", describe_header(&report.header))];
    for mapped in &report.mapping {
        lines.push(format!(
            "  {:<12} <- coluna {} '{}'",
            mapped.field, mapped.column, mapped.header
        ));
    }
    let (filled, missing): (Vec<&str>, Vec<&str>) = report
        .unmapped_fields()
        .into_iter()
        .partition(|field| report.compound_filled.iter().any(|f| f == field));
    if !missing.is_empty() {
        lines.push(format!("Campos sem coluna: {}", missing.join(", ")));
    }
    if !filled.is_empty() {
        lines.push(format!("Preenchidos pela coluna composta: {}", filled.join(", ")));
    }
    lines.push(format!(
        "Linhas: {} lidas, {} mantidas, {} descartadas; valores numéricos: {} ok, {} vazios, {} inválidos",
        report.rows_scanned,
        report.rows_retained,
        report.rows_rejected,
        report.coercion.parsed,
        report.coercion.blank,
        report.coercion.failed
    ));
    lines.join("\n")
}

pub fn summary_line(summary: &SourceSummary) -> String {
    let outputs: Vec<String> = summary
        .outputs
        .iter()
        .map(|(path, _)| path.display().to_string())
        .collect();
    format!(
        "{}: {} itens salvos, {} descartados -> {}",
        summary.kind.slug(),
        summary.report.rows_retained,
        summary.report.rows_rejected,
        outputs.join(", ")
    )
}

fn money(record: &CanonicalRecord, field: &str) -> String {
    record
        .number(field)
        .map(|value| format!("R$ {}", format_decimal(value, 2)))
        .unwrap_or_else(|| "-".to_string())
}

/// One display line per search hit.
pub fn hit_line(kind: SourceKind, record: &CanonicalRecord) -> String {
    let text = |field: &str| record.text(field).unwrap_or("-").to_string();
    match kind {
        SourceKind::Catalog => format!("[{}] {}", text("codigo"), text("descricao")),
        SourceKind::LaborCost => format!(
            "[{}] {} ({}) {}",
            text("codigo"),
            text("descricao"),
            text("unidade"),
            money(record, "preco_base")
        ),
        SourceKind::Pharma => format!(
            "[{}] {} - {} | PF {} | PMVG {}",
            text("ean"),
            text("produto"),
            text("substancia"),
            money(record, "pf"),
            money(record, "pmvg")
        ),
    }
}

/// Search results grouped by kind, at most `limit` lines each plus a
/// "... e mais K itens" tail.
pub fn write_hits<W: Write>(out: &mut W, term: &str, results: &[KindHits]) -> io::Result<()> {
    for result in results {
        writeln!(out, "== {} ==", result.kind.label())?;
        let Some(hits) = &result.hits else {
            writeln!(out, "  (arquivo limpo não encontrado, rode 'normalize')")?;
            continue;
        };
        if hits.total == 0 {
            writeln!(out, "  nenhum item para '{}'", term)?;
            continue;
        }
        for record in &hits.hits {
            writeln!(out, "  {}", hit_line(result.kind, record))?;
        }
        if hits.remaining() > 0 {
            writeln!(out, "  ... e mais {} itens", hits.remaining())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::FieldValue;

    #[test]
    fn test_hit_line_formats_prices() {
        let mut record = CanonicalRecord::new();
        record.set("ean", FieldValue::Text("789".into()));
        record.set("produto", FieldValue::Text("NOVALGINA".into()));
        record.set("substancia", FieldValue::Text("DIPIRONA".into()));
        record.set("pf", FieldValue::Number(1234.5));
        record.set("pmvg", FieldValue::Null);
        assert_eq!(
            hit_line(SourceKind::Pharma, &record),
            "[789] NOVALGINA - DIPIRONA | PF R$ 1.234,50 | PMVG -"
        );
    }

    #[test]
    fn test_hit_line_missing_fields() {
        let record = CanonicalRecord::new();
        assert_eq!(hit_line(SourceKind::Catalog, &record), "[-] -");
    }

    #[test]
    fn test_describe_header() {
        assert_eq!(
            describe_header(&HeaderLocation::Found { index: 3, method: DetectionMethod::Markers }),
            "linha 3 (marcadores)"
        );
        assert!(describe_header(&HeaderLocation::NotFound { scanned: 100 }).contains("100"));
    }

    #[test]
    fn test_describe_report_labels_compound_fields() {
        use crate::data::{assemble, AssembleOptions};
        use crate::models::ColumnSpec;
        use shared::models::RawSheet;

        let sheet = RawSheet::from_text_rows(
            "catser",
            &[&["GRUPO", "CLASSE", "CODIGO DESCRICAO"], &["1", "11", "15377 ABC"]],
        );
        let assembly = assemble(&sheet, &ColumnSpec::catalog(), &AssembleOptions::default()).unwrap();
        assert_eq!(assembly.records[0].text("descricao"), Some("ABC"));

        let text = describe_report(&assembly.report);
        assert!(text.contains("Preenchidos pela coluna composta: descricao"));
        assert!(!text.contains("Campos sem coluna"));
    }

    #[test]
    fn test_ensure_output_dir_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
