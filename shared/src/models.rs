use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One untyped cell as it comes out of a spreadsheet or a delimited file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// True for empty cells, whitespace-only text and the `nan` sentinel that
    /// spreadsheet exports leave behind for blank numeric cells.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
            }
            CellValue::Number(n) => n.is_nan(),
            CellValue::Bool(_) => false,
        }
    }

    /// Textual form of the cell. Integral numbers are rendered without a
    /// fractional part, so an EAN stored as a float keeps its digits only.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// A sheet read with header detection disabled: rows in file order, ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        RawSheet {
            name: name.into(),
            rows,
        }
    }

    /// Convenience for tests and CSV-backed sheets where every cell is text.
    pub fn from_text_rows(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| CellValue::from(*cell)).collect())
            .collect();
        RawSheet::new(name, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drops the first `count` rows, the equivalent of a reader's skip-rows option.
    pub fn skip_rows(mut self, count: usize) -> Self {
        let count = count.min(self.rows.len());
        self.rows.drain(..count);
        self
    }
}

/// A cleaned value inside a canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendering used by delimited writers: null becomes an empty field.
    pub fn to_field_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map(FieldValue::Number).unwrap_or(FieldValue::Null)
    }
}

/// A schema-conformant row of one source kind. Keys keep the order of the
/// column spec that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRecord {
    fields: Vec<(String, FieldValue)>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CanonicalRecord {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Sets `name`, replacing an existing value in place so key order is stable.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The three reference catalogs handled by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// CATSER service/material catalog.
    #[serde(rename = "catser", alias = "catalog")]
    Catalog,
    /// SINAPI labor-cost table.
    #[serde(rename = "sinapi", alias = "labor-cost")]
    LaborCost,
    /// CMED pharmaceutical price table.
    #[serde(rename = "cmed", alias = "pharma")]
    Pharma,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Catalog, SourceKind::LaborCost, SourceKind::Pharma];

    pub fn slug(&self) -> &'static str {
        match self {
            SourceKind::Catalog => "catser",
            SourceKind::LaborCost => "sinapi",
            SourceKind::Pharma => "cmed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Catalog => "CATSER - Catálogo de Serviços/Materiais",
            SourceKind::LaborCost => "SINAPI - Construção Civil",
            SourceKind::Pharma => "CMED - Medicamentos ANVISA",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "catser" | "catalog" => Ok(SourceKind::Catalog),
            "sinapi" | "labor-cost" | "labor" => Ok(SourceKind::LaborCost),
            "cmed" | "pharma" => Ok(SourceKind::Pharma),
            other => Err(format!(
                "Unknown source kind '{}'. Use 'catser', 'sinapi' or 'cmed'.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_missing_sentinels() {
        assert!(CellValue::Empty.is_missing());
        assert!(CellValue::from("   ").is_missing());
        assert!(CellValue::from("NaN").is_missing());
        assert!(CellValue::Number(f64::NAN).is_missing());
        assert!(!CellValue::from("0").is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
    }

    #[test]
    fn test_cell_to_text_drops_integral_fraction() {
        assert_eq!(CellValue::Number(7891234567890.0).to_text(), "7891234567890");
        assert_eq!(CellValue::Number(12.5).to_text(), "12.5");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn test_skip_rows_clamps() {
        let sheet = RawSheet::from_text_rows("s", &[&["a"], &["b"]]);
        assert_eq!(sheet.clone().skip_rows(1).rows, vec![vec![CellValue::from("b")]]);
        assert!(sheet.skip_rows(5).is_empty());
    }

    #[test]
    fn test_record_set_keeps_order() {
        let mut record = CanonicalRecord::new();
        record.set("codigo", FieldValue::Null);
        record.set("descricao", FieldValue::Text("X".into()));
        record.set("codigo", FieldValue::Text("1".into()));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["codigo", "descricao"]);
        assert_eq!(record.text("codigo"), Some("1"));
    }

    #[test]
    fn test_record_serializes_as_object() {
        let mut record = CanonicalRecord::new();
        record.set("ean", FieldValue::Text("789".into()));
        record.set("pf", FieldValue::Number(45.0));
        record.set("pmvg", FieldValue::Null);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"ean":"789","pf":45.0,"pmvg":null}"#);
    }

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!("CMED".parse::<SourceKind>().unwrap(), SourceKind::Pharma);
        assert_eq!("labor-cost".parse::<SourceKind>().unwrap(), SourceKind::LaborCost);
        assert!("foo".parse::<SourceKind>().is_err());
        let kind: SourceKind = serde_json::from_str("\"catser\"").unwrap();
        assert_eq!(kind, SourceKind::Catalog);
    }
}
