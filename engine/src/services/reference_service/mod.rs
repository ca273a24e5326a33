// engine/src/services/reference_service/mod.rs
// ReferenceService owns the settings and dispatches each operation to its
// handler module.
use std::path::{Path, PathBuf};

use shared::models::{CanonicalRecord, SourceKind};
use tracing::{error, info};

use crate::config::{EngineSettings, SourceSettings};
use crate::data::NormalizeReport;
use crate::error::EngineError;
use crate::services::search::SearchHits;

pub mod helpers;
pub mod inspect_source;
pub mod normalize_source;
pub mod search_cleaned;

/// Result of normalizing one configured source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub kind: SourceKind,
    pub input: PathBuf,
    /// Each file written with the number of records it received.
    pub outputs: Vec<(PathBuf, usize)>,
    pub report: NormalizeReport,
}

#[derive(Debug)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub result: Result<SourceSummary, EngineError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub sheet: String,
    pub total_rows: usize,
    pub report: NormalizeReport,
    pub preview: Vec<CanonicalRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KindHits {
    pub kind: SourceKind,
    /// `None` when the cleaned file for this kind does not exist yet.
    pub hits: Option<SearchHits>,
}

pub struct ReferenceService {
    settings: EngineSettings,
}

impl ReferenceService {
    pub fn new(settings: EngineSettings) -> Self {
        ReferenceService { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Normalizes every configured source, or only the kinds in `only` when it
    /// is not empty. A failing source is logged and reported; the rest still run.
    pub fn normalize_all(&self, only: &[SourceKind]) -> Vec<SourceOutcome> {
        self.settings
            .sources
            .iter()
            .filter(|source| only.is_empty() || only.contains(&source.kind))
            .map(|source| {
                let result = self.normalize(source);
                if let Err(e) = &result {
                    error!(kind = %source.kind, file = %source.file.display(), error = %e, "source failed");
                }
                SourceOutcome { kind: source.kind, result }
            })
            .collect()
    }

    pub fn normalize(&self, source: &SourceSettings) -> Result<SourceSummary, EngineError> {
        info!(
            kind = %source.kind,
            file = %source.file.display(),
            "Received normalize request, dispatching to handler."
        );
        normalize_source::handle_normalize_source(&self.settings, source)
    }

    pub fn inspect(&self, path: &Path, kind: SourceKind, rows: usize) -> Result<InspectReport, EngineError> {
        info!(kind = %kind, path = %path.display(), rows, "Received inspect request, dispatching to handler.");
        inspect_source::handle_inspect_source(&self.settings, path, kind, rows)
    }

    pub fn search(&self, term: &str, limit: usize) -> Result<Vec<KindHits>, EngineError> {
        info!(term, limit, "Received search request, dispatching to handler.");
        search_cleaned::handle_search_cleaned(&self.settings, term, limit)
    }

    /// Loads every cleaned file once for repeated searches.
    pub fn search_index(&self) -> Result<search_cleaned::CleanedIndex, EngineError> {
        info!("Loading cleaned files for interactive search.");
        search_cleaned::CleanedIndex::load(&self.settings)
    }
}
