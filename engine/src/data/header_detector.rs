// Locates the header row of a sheet whose header position is not fixed.
use shared::models::CellValue;

pub const DEFAULT_SCAN_WINDOW: usize = 100;
pub const DEFAULT_DENSITY_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// Rows inspected from the top of the sheet; nothing below is read.
    pub scan_window: usize,
    /// Non-empty cell count a row must exceed to count as a header when no
    /// markers are given.
    pub density_threshold: usize,
}

impl Default for DetectOptions {
    fn default() -> Self {
        DetectOptions {
            scan_window: DEFAULT_SCAN_WINDOW,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    Markers,
    Density,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLocation {
    Found { index: usize, method: DetectionMethod },
    NotFound { scanned: usize },
}

impl HeaderLocation {
    /// Index to use as the header row; row 0 when detection failed.
    pub fn row_index(&self) -> usize {
        match self {
            HeaderLocation::Found { index, .. } => *index,
            HeaderLocation::NotFound { .. } => 0,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, HeaderLocation::Found { .. })
    }
}

fn row_signature(row: &[CellValue]) -> String {
    row.iter()
        .map(|cell| cell.to_text().to_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the first row within the scan window containing every marker
/// (case-insensitive substring of the row's joined text). With no markers the
/// weaker density heuristic is used instead.
pub fn detect_header<S: AsRef<str>>(
    rows: &[Vec<CellValue>],
    markers: &[S],
    options: &DetectOptions,
) -> HeaderLocation {
    let window = &rows[..rows.len().min(options.scan_window)];

    if markers.is_empty() {
        return detect_by_density(window, options.density_threshold);
    }

    let markers: Vec<String> = markers.iter().map(|m| m.as_ref().to_uppercase()).collect();
    for (index, row) in window.iter().enumerate() {
        let signature = row_signature(row);
        if markers.iter().all(|m| signature.contains(m.as_str())) {
            tracing::debug!(index, ?markers, "header row located by markers");
            return HeaderLocation::Found {
                index,
                method: DetectionMethod::Markers,
            };
        }
    }

    HeaderLocation::NotFound {
        scanned: window.len(),
    }
}

fn detect_by_density(window: &[Vec<CellValue>], threshold: usize) -> HeaderLocation {
    for (index, row) in window.iter().enumerate() {
        let filled = row.iter().filter(|cell| !cell.is_missing()).count();
        if filled > threshold {
            tracing::debug!(index, filled, "header row located by cell density");
            return HeaderLocation::Found {
                index,
                method: DetectionMethod::Density,
            };
        }
    }
    HeaderLocation::NotFound {
        scanned: window.len(),
    }
}
