// Engine settings, loaded from a JSON file or taken from defaults.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared::models::SourceKind;

use crate::data::header_detector::{DEFAULT_DENSITY_THRESHOLD, DEFAULT_SCAN_WINDOW};
use crate::data::{DetectOptions, ReadOptions};
use crate::error::EngineError;
use crate::models::ColumnSpec;
use crate::sinks::DEFAULT_BATCH_SIZE;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scan_window: usize,
    pub density_threshold: usize,
    pub batch_size: usize,
    pub csv_delimiter: char,
    pub write_bom: bool,
    pub emit_jsonl: bool,
    /// Also writes `<slug>_lotes.json`: one JSON array per `batch_size` records.
    pub emit_batches: bool,
    pub sources: Vec<SourceSettings>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// Relative paths resolve against `input_dir`.
    pub file: PathBuf,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub sheet: Option<String>,
    /// Replaces the built-in required set when present.
    #[serde(default)]
    pub required_fields: Option<Vec<String>>,
}

impl SourceSettings {
    pub fn new(kind: SourceKind, file: impl Into<PathBuf>) -> Self {
        SourceSettings {
            kind,
            file: file.into(),
            skip_rows: 0,
            sheet: None,
            required_fields: None,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            input_dir: PathBuf::from("Planilhas_Itens"),
            output_dir: PathBuf::from("Planilhas_Limpas"),
            scan_window: DEFAULT_SCAN_WINDOW,
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            csv_delimiter: ';',
            write_bom: true,
            emit_jsonl: false,
            emit_batches: false,
            sources: vec![
                SourceSettings::new(SourceKind::Catalog, "Lista CATSER.xlsx"),
                SourceSettings::new(SourceKind::LaborCost, "SINAPI_mao_de_obra_2025_12.xlsx"),
                SourceSettings::new(SourceKind::Pharma, "Média Facil - CMED.xlsx"),
            ],
        }
    }
}

impl EngineSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let settings: EngineSettings = serde_json::from_str(&content).map_err(|e| {
            EngineError::ConfigError(format!("Invalid config {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.csv_delimiter.is_ascii() {
            return Err(EngineError::ConfigError(format!(
                "csv_delimiter must be a single ASCII character, got '{}'",
                self.csv_delimiter
            )));
        }
        if self.scan_window == 0 {
            return Err(EngineError::ConfigError("scan_window must be at least 1".into()));
        }
        for source in &self.sources {
            self.column_spec(source)?;
        }
        Ok(())
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceSettings> {
        self.sources.iter().find(|s| s.kind == kind)
    }

    pub fn input_path(&self, source: &SourceSettings) -> PathBuf {
        if source.file.is_absolute() {
            source.file.clone()
        } else {
            self.input_dir.join(&source.file)
        }
    }

    /// `<output_dir>/<slug>_limpo.<extension>`
    pub fn output_path(&self, kind: SourceKind, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_limpo.{}", kind.slug(), extension))
    }

    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            scan_window: self.scan_window,
            density_threshold: self.density_threshold,
        }
    }

    pub fn read_options(&self, source: &SourceSettings) -> ReadOptions {
        ReadOptions {
            skip_rows: source.skip_rows,
            sheet: source.sheet.clone(),
            // validate() guarantees ASCII
            delimiter: self.csv_delimiter as u8,
        }
    }

    pub fn column_spec(&self, source: &SourceSettings) -> Result<ColumnSpec, EngineError> {
        let spec = ColumnSpec::for_kind(source.kind);
        match &source.required_fields {
            Some(required) => spec.with_required(required.as_slice()),
            None => Ok(spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.scan_window, 100);
        assert_eq!(settings.density_threshold, 2);
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.sources.len(), 3);
        assert_eq!(
            settings.output_path(SourceKind::Pharma, "csv"),
            PathBuf::from("Planilhas_Limpas").join("cmed_limpo.csv")
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"{
                "output_dir": "saida",
                "emit_jsonl": true,
                "sources": [
                    { "kind": "cmed", "file": "cmed.csv", "skip_rows": 2,
                      "required_fields": ["ean"] }
                ]
            }"#,
        );
        let settings = EngineSettings::load(file.path()).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("saida"));
        assert!(settings.emit_jsonl);
        assert_eq!(settings.scan_window, 100);
        assert_eq!(settings.csv_delimiter, ';');

        let source = settings.source(SourceKind::Pharma).unwrap();
        assert_eq!(source.skip_rows, 2);
        assert_eq!(settings.read_options(source).delimiter, b';');
        let spec = settings.column_spec(source).unwrap();
        assert_eq!(spec.required, vec!["ean".to_string()]);
        assert!(settings.source(SourceKind::Catalog).is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = EngineSettings::load("no/such/config.json").unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_unknown_required_field_rejected() {
        let file = write_config(
            r#"{ "sources": [ { "kind": "catser", "file": "a.xlsx",
                 "required_fields": ["preco"] } ] }"#,
        );
        let err = EngineSettings::load(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let file = write_config(r#"{ "csv_delimiter": "§" }"#);
        assert!(EngineSettings::load(file.path()).is_err());
    }

    #[test]
    fn test_input_path_resolution() {
        let settings = EngineSettings::default();
        let relative = SourceSettings::new(SourceKind::Catalog, "x.xlsx");
        assert_eq!(
            settings.input_path(&relative),
            PathBuf::from("Planilhas_Itens").join("x.xlsx")
        );
    }
}
