// Declarative description of one source kind: which header markers locate the
// header row, which keywords identify each canonical column, how each field is
// coerced and which fields a record cannot live without.
use serde::{Deserialize, Serialize};
use shared::models::SourceKind;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Trimmed free text.
    Text,
    /// Identifier text; a trailing ".0" left by float cells is removed.
    Code,
    /// Brazilian-formatted number, coerced to f64 or null.
    Numeric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    /// Upper-cased substrings; any one of them identifies the column.
    pub keywords: Vec<String>,
    pub kind: FieldKind,
    /// Column used when no header cell matches and the column is still free.
    pub fallback_position: Option<usize>,
}

impl FieldSpec {
    pub fn new(name: &str, keywords: &[&str], kind: FieldKind) -> Self {
        FieldSpec {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_uppercase()).collect(),
            kind,
            fallback_position: None,
        }
    }

    pub fn text(name: &str, keywords: &[&str]) -> Self {
        Self::new(name, keywords, FieldKind::Text)
    }

    pub fn code(name: &str, keywords: &[&str]) -> Self {
        Self::new(name, keywords, FieldKind::Code)
    }

    pub fn numeric(name: &str, keywords: &[&str]) -> Self {
        Self::new(name, keywords, FieldKind::Numeric)
    }

    pub fn with_fallback(mut self, position: usize) -> Self {
        self.fallback_position = Some(position);
        self
    }

    /// `normalized_header` must already be upper-cased and whitespace-collapsed.
    pub fn matches(&self, normalized_header: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| normalized_header.contains(keyword.as_str()))
    }
}

/// A single raw column carrying "code   description" for two canonical fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundRule {
    /// Field whose raw cell holds the combined text.
    pub source: String,
    pub code_field: String,
    pub text_field: String,
}

impl CompoundRule {
    pub fn produces(&self, field: &str) -> bool {
        self.code_field == field || self.text_field == field
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub kind: SourceKind,
    /// Every marker must appear in the header row.
    pub markers: Vec<String>,
    /// Mapping priority and output key order.
    pub fields: Vec<FieldSpec>,
    pub required: Vec<String>,
    pub compound: Option<CompoundRule>,
}

impl ColumnSpec {
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Catalog => Self::catalog(),
            SourceKind::LaborCost => Self::labor_cost(),
            SourceKind::Pharma => Self::pharma(),
        }
    }

    /// CATSER. Group and class come first so "DESCRICAO DA CLASSE"-style
    /// headers are claimed before `descricao` is resolved.
    pub fn catalog() -> Self {
        ColumnSpec {
            kind: SourceKind::Catalog,
            markers: vec!["GRUPO".into(), "CLASSE".into()],
            fields: vec![
                FieldSpec::text("grupo", &["GRUPO"]),
                FieldSpec::text("classe", &["CLASSE"]),
                FieldSpec::code("codigo", &["CODIGO", "CÓDIGO"]),
                FieldSpec::text("descricao", &["DESCRI"]),
            ],
            required: vec!["descricao".into()],
            compound: Some(CompoundRule {
                source: "codigo".into(),
                code_field: "codigo".into(),
                text_field: "descricao".into(),
            }),
        }
    }

    /// SINAPI labor costs. The fallback positions follow the sheet's fixed
    /// layout: class, code, description, unit, then the first price column.
    pub fn labor_cost() -> Self {
        ColumnSpec {
            kind: SourceKind::LaborCost,
            markers: vec!["DESCRI".into(), "UNIDADE".into()],
            fields: vec![
                FieldSpec::text("classe", &["CLASSE"]).with_fallback(0),
                FieldSpec::code("codigo", &["CODIGO", "CÓDIGO"]).with_fallback(1),
                FieldSpec::text("descricao", &["DESCRI"]).with_fallback(2),
                FieldSpec::text("unidade", &["UNIDADE"]).with_fallback(3),
                FieldSpec::numeric("preco_base", &["PRECO", "PREÇO", "CUSTO", "VALOR"])
                    .with_fallback(4),
            ],
            required: vec!["descricao".into()],
            compound: None,
        }
    }

    /// CMED. Several "EAN n" columns exist; the first one wins.
    pub fn pharma() -> Self {
        ColumnSpec {
            kind: SourceKind::Pharma,
            markers: vec!["EAN".into(), "PRODUTO".into()],
            fields: vec![
                FieldSpec::code("ean", &["EAN"]),
                FieldSpec::text("produto", &["PRODUTO"]),
                FieldSpec::text("substancia", &["SUBST"]),
                FieldSpec::numeric("pf", &["FÁBRICA", "FABRICA", "PF"]),
                FieldSpec::numeric("pmvg", &["PMVG"]),
            ],
            required: vec!["ean".into(), "produto".into()],
            compound: None,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Replaces the required-field set. Every name must be a field of the spec.
    pub fn with_required<S: AsRef<str>>(mut self, required: &[S]) -> Result<Self, EngineError> {
        let mut names = Vec::with_capacity(required.len());
        for name in required {
            let name = name.as_ref();
            if self.field(name).is_none() {
                return Err(EngineError::ConfigError(format!(
                    "Required field '{}' is not part of the {} schema ({})",
                    name,
                    self.kind,
                    self.field_names().join(", ")
                )));
            }
            names.push(name.to_string());
        }
        self.required = names;
        Ok(self)
    }
}
