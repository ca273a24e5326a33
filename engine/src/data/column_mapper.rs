// Keyword-driven assignment of canonical fields to raw column positions.
use crate::models::ColumnSpec;

/// Uppercase, trim and collapse whitespace runs (newlines included) to one space.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Canonical field → source column, kept in column-spec field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    assignments: Vec<(String, usize)>,
}

impl ColumnMapping {
    pub fn get(&self, field: &str) -> Option<usize> {
        self.assignments
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, column)| *column)
    }

    pub fn is_column_assigned(&self, column: usize) -> bool {
        self.assignments.iter().any(|(_, c)| *c == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.assignments.iter().map(|(name, column)| (name.as_str(), *column))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    fn sort_by_spec(&mut self, spec: &ColumnSpec) {
        self.assignments
            .sort_by_key(|(name, _)| spec.position(name).unwrap_or(usize::MAX));
    }
}

/// For each field in spec order, claims the first still-unclaimed header cell
/// whose normalized text contains one of the field's keywords.
pub fn map_columns<S: AsRef<str>>(header: &[S], spec: &ColumnSpec) -> ColumnMapping {
    let normalized: Vec<String> = header.iter().map(|h| normalize_header(h.as_ref())).collect();
    let mut mapping = ColumnMapping::default();

    for field in &spec.fields {
        let hit = normalized
            .iter()
            .enumerate()
            .find(|(column, text)| !mapping.is_column_assigned(*column) && field.matches(text));
        match hit {
            Some((column, text)) => {
                tracing::debug!(field = %field.name, column, header = %text, "column mapped");
                mapping.assignments.push((field.name.clone(), column));
            }
            None => tracing::debug!(field = %field.name, "no header cell matched"),
        }
    }

    mapping
}

/// Assigns still-unmapped fields to their declared fallback position when
/// that column exists in the data and nobody claimed it.
pub fn apply_positional_fallbacks(mapping: &mut ColumnMapping, spec: &ColumnSpec, width: usize) {
    let mut changed = false;
    for field in &spec.fields {
        let Some(position) = field.fallback_position else {
            continue;
        };
        if mapping.get(&field.name).is_some()
            || position >= width
            || mapping.is_column_assigned(position)
        {
            continue;
        }
        tracing::debug!(field = %field.name, column = position, "column mapped by position");
        mapping.assignments.push((field.name.clone(), position));
        changed = true;
    }
    if changed {
        mapping.sort_by_spec(spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Preço\nFábrica   (PF) "), "PREÇO FÁBRICA (PF)");
        assert_eq!(normalize_header(""), "");
    }

    #[test]
    fn test_pharma_mapping_first_cell_wins() {
        let header = [
            "SUBSTÂNCIA",
            "CNPJ",
            "LABORATÓRIO",
            "EAN 1",
            "EAN 2",
            "PRODUTO",
            "APRESENTAÇÃO",
            "PF Sem Impostos",
            "PF 0%",
            "PMVG Sem Impostos",
        ];
        let mapping = map_columns(&header, &ColumnSpec::pharma());
        assert_eq!(mapping.get("ean"), Some(3));
        assert_eq!(mapping.get("produto"), Some(5));
        assert_eq!(mapping.get("substancia"), Some(0));
        assert_eq!(mapping.get("pf"), Some(7));
        assert_eq!(mapping.get("pmvg"), Some(9));
        assert_eq!(
            mapping.iter().map(|(f, _)| f).collect::<Vec<_>>(),
            vec!["ean", "produto", "substancia", "pf", "pmvg"]
        );
    }

    #[test]
    fn test_earlier_field_keeps_its_cell() {
        let header = ["DESCRICAO DA CLASSE", "CODIGO", "DESCRICAO", "UNIDADE"];
        let mapping = map_columns(&header, &ColumnSpec::labor_cost());
        assert_eq!(mapping.get("classe"), Some(0));
        assert_eq!(mapping.get("codigo"), Some(1));
        assert_eq!(mapping.get("descricao"), Some(2));
        assert_eq!(mapping.get("unidade"), Some(3));
        assert_eq!(mapping.get("preco_base"), None);
    }

    #[test]
    fn test_cell_is_not_reassigned() {
        let header = ["GRUPO", "CLASSE", "CODIGO DESCRICAO"];
        let mapping = map_columns(&header, &ColumnSpec::catalog());
        assert_eq!(mapping.get("codigo"), Some(2));
        assert_eq!(mapping.get("descricao"), None);
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_output_bounded_by_header_cells() {
        let header = ["CODIGO / DESCRICAO / UNIDADE"];
        let mapping = map_columns(&header, &ColumnSpec::labor_cost());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_positional_fallbacks_fill_free_columns() {
        let header = ["Classe", "Cód.", "Descrição", "Unid.", "SP"];
        let spec = ColumnSpec::labor_cost();
        let mut mapping = map_columns(&header, &spec);
        assert_eq!(mapping.get("codigo"), None);
        assert_eq!(mapping.get("preco_base"), None);

        apply_positional_fallbacks(&mut mapping, &spec, 5);
        assert_eq!(mapping.get("codigo"), Some(1));
        assert_eq!(mapping.get("unidade"), Some(3));
        assert_eq!(mapping.get("preco_base"), Some(4));
        assert_eq!(
            mapping.iter().map(|(f, _)| f).collect::<Vec<_>>(),
            vec!["classe", "codigo", "descricao", "unidade", "preco_base"]
        );
    }

    #[test]
    fn test_positional_fallback_respects_width_and_claims() {
        let header = ["UNIDADE", "DESCRICAO"];
        let spec = ColumnSpec::labor_cost();
        let mut mapping = map_columns(&header, &spec);
        apply_positional_fallbacks(&mut mapping, &spec, 2);
        // columns 0 and 1 are already claimed, 2.. do not exist
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("classe"), None);
    }
}
