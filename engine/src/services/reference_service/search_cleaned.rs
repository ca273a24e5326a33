// Handler for the search operation over the cleaned CSV of every kind.
use std::io::{self, BufRead, Write};

use shared::models::{CanonicalRecord, SourceKind};
use tracing::{info, warn};

use super::helpers::write_hits;
use super::KindHits;
use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::models::ColumnSpec;
use crate::services::search::{default_search_fields, read_cleaned_csv, search};

/// Words that end an interactive session.
const QUIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];

/// Cleaned records of every kind, loaded once. `None` marks a kind whose
/// cleaned file does not exist yet.
pub struct CleanedIndex {
    entries: Vec<(SourceKind, Option<Vec<CanonicalRecord>>)>,
}

impl CleanedIndex {
    pub fn load(settings: &EngineSettings) -> Result<Self, EngineError> {
        let mut entries = Vec::with_capacity(SourceKind::ALL.len());
        for kind in SourceKind::ALL {
            let path = settings.output_path(kind, "csv");
            if !path.exists() {
                warn!(kind = %kind, path = %path.display(), "cleaned file missing, run normalize first");
                entries.push((kind, None));
                continue;
            }
            let records = read_cleaned_csv(&path, &ColumnSpec::for_kind(kind))?;
            info!(kind = %kind, records = records.len(), "cleaned file loaded");
            entries.push((kind, Some(records)));
        }
        Ok(CleanedIndex { entries })
    }

    pub fn search(&self, term: &str, limit: usize) -> Vec<KindHits> {
        self.entries
            .iter()
            .map(|(kind, records)| KindHits {
                kind: *kind,
                hits: records
                    .as_ref()
                    .map(|records| search(records, default_search_fields(*kind), term, limit)),
            })
            .collect()
    }
}

pub fn handle_search_cleaned(
    settings: &EngineSettings,
    term: &str,
    limit: usize,
) -> Result<Vec<KindHits>, EngineError> {
    Ok(CleanedIndex::load(settings)?.search(term, limit))
}

/// Prompts for terms until a quit word or end of input. Returns how many
/// searches ran.
pub fn run_search_prompt<R: BufRead, W: Write>(
    index: &CleanedIndex,
    limit: usize,
    input: R,
    mut output: W,
) -> io::Result<usize> {
    let mut searches = 0;
    write!(output, "Termo de busca (ou 'sair'): ")?;
    output.flush()?;
    for line in input.lines() {
        let term = line?;
        let term = term.trim();
        if QUIT_WORDS.iter().any(|q| term.eq_ignore_ascii_case(q)) {
            break;
        }
        if !term.is_empty() {
            write_hits(&mut output, term, &index.search(term, limit))?;
            searches += 1;
        }
        write!(output, "Termo de busca (ou 'sair'): ")?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(searches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::FieldValue;

    fn index() -> CleanedIndex {
        let mut record = CanonicalRecord::new();
        record.set("codigo", FieldValue::Text("15377".into()));
        record.set("descricao", FieldValue::Text("INFRA-ESTRUTURA AEROPORTUARIA".into()));
        CleanedIndex {
            entries: vec![
                (SourceKind::Catalog, Some(vec![record.clone(), record])),
                (SourceKind::LaborCost, None),
            ],
        }
    }

    #[test]
    fn test_index_search_marks_missing_kinds() {
        let results = index().search("aeroporto", 5);
        assert_eq!(results[0].hits.as_ref().map(|h| h.total), Some(0));
        assert!(results[1].hits.is_none());
    }

    #[test]
    fn test_prompt_loops_until_quit_word() {
        let input = io::Cursor::new("infra\n\n  \nSAIR\ninfra\n");
        let mut output = Vec::new();
        let searches = run_search_prompt(&index(), 1, input, &mut output).unwrap();
        assert_eq!(searches, 1);

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("[15377] INFRA-ESTRUTURA AEROPORTUARIA"));
        assert!(text.contains("... e mais 1 itens"));
        assert!(text.contains("arquivo limpo não encontrado"));
    }

    #[test]
    fn test_prompt_stops_at_end_of_input() {
        let input = io::Cursor::new("infra\ninfra\n");
        let searches = run_search_prompt(&index(), 5, input, io::sink()).unwrap();
        assert_eq!(searches, 2);
    }
}
