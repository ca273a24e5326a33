// Field coercion shared by the engine's record assembler and by anything that
// reads cleaned output back (search, loaders).

pub mod brazilian_format {
    use std::str::FromStr;

    use anyhow::{anyhow, Result};

    use crate::models::CellValue;

    const CURRENCY_MARKER: &str = "R$";

    /// Parses decimals like "1.234,56", "123,45" or "R$ 45,00" into f64.
    /// Non-finite results ("nan", "inf") are errors.
    pub fn parse_decimal(s: &str) -> Result<f64> {
        let normalized = s
            .replace(CURRENCY_MARKER, "")
            .trim()
            .replace('.', "") // Remove thousand separators
            .replace(',', "."); // Replace decimal separator

        let value = f64::from_str(&normalized)
            .map_err(|e| anyhow!("Failed to parse decimal '{}': {}", s, e))?;
        if !value.is_finite() {
            return Err(anyhow!("Decimal '{}' is not a finite number", s));
        }
        Ok(value)
    }

    /// Result of coercing one cell, keeping apart the two causes of a null.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum DecimalOutcome {
        Blank,
        Parsed(f64),
        Unparseable,
    }

    impl DecimalOutcome {
        pub fn value(self) -> Option<f64> {
            match self {
                DecimalOutcome::Parsed(v) => Some(v),
                DecimalOutcome::Blank | DecimalOutcome::Unparseable => None,
            }
        }
    }

    /// Optional diagnostic channel for numeric coercion. Does not change what
    /// `coerce_decimal` returns.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct CoercionStats {
        pub parsed: usize,
        pub blank: usize,
        pub failed: usize,
    }

    impl CoercionStats {
        pub fn record(&mut self, outcome: DecimalOutcome) {
            match outcome {
                DecimalOutcome::Parsed(_) => self.parsed += 1,
                DecimalOutcome::Blank => self.blank += 1,
                DecimalOutcome::Unparseable => self.failed += 1,
            }
        }
    }

    pub fn classify_decimal(cell: &CellValue) -> DecimalOutcome {
        if cell.is_missing() {
            return DecimalOutcome::Blank;
        }
        match cell {
            // Already numeric: never re-stringified, "." would be read as a thousands separator.
            CellValue::Number(n) if n.is_finite() => DecimalOutcome::Parsed(*n),
            CellValue::Number(_) | CellValue::Bool(_) | CellValue::Empty => {
                DecimalOutcome::Unparseable
            }
            CellValue::Text(s) => match parse_decimal(s) {
                Ok(v) => DecimalOutcome::Parsed(v),
                Err(_) => DecimalOutcome::Unparseable,
            },
        }
    }

    /// Lossy coercion: blank and unparseable input both become `None`.
    pub fn coerce_decimal(cell: &CellValue) -> Option<f64> {
        classify_decimal(cell).value()
    }

    pub fn coerce_decimal_traced(cell: &CellValue, stats: &mut CoercionStats) -> Option<f64> {
        let outcome = classify_decimal(cell);
        stats.record(outcome);
        outcome.value()
    }

    /// Trimmed text, or `None` for blank cells and `nan` sentinels.
    pub fn clean_text(cell: &CellValue) -> Option<String> {
        if cell.is_missing() {
            return None;
        }
        let text = cell.to_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Like `clean_text`, but drops the ".0" a float round-trip leaves on codes.
    pub fn clean_code(cell: &CellValue) -> Option<String> {
        clean_text(cell).map(|code| match code.strip_suffix(".0") {
            Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                digits.to_string()
            }
            _ => code,
        })
    }

    /// Renders `value` as "1.234,56".
    pub fn format_decimal(value: f64, decimals: usize) -> String {
        let formatted = format!("{:.decimals$}", value.abs(), decimals = decimals);
        let (int_part, frac_part) = match formatted.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (formatted.as_str(), None),
        };

        let digits: Vec<char> = int_part.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(*c);
        }

        let mut out = String::new();
        let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
        if value.is_sign_negative() && !is_zero {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(frac) = frac_part {
            out.push(',');
            out.push_str(frac);
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_decimal_simple() {
            assert_eq!(parse_decimal("123,45").unwrap(), 123.45);
        }

        #[test]
        fn test_parse_decimal_with_thousands() {
            assert_eq!(parse_decimal("1.234,56").unwrap(), 1234.56);
        }

        #[test]
        fn test_parse_decimal_large_number() {
            assert_eq!(parse_decimal("600.822.115,84").unwrap(), 600822115.84);
        }

        #[test]
        fn test_parse_decimal_currency_prefix() {
            assert_eq!(parse_decimal("R$ 45,00").unwrap(), 45.0);
            assert_eq!(parse_decimal("  R$1.000  ").unwrap(), 1000.0);
        }

        #[test]
        fn test_parse_decimal_rejects_garbage_and_nan() {
            assert!(parse_decimal("abc").is_err());
            assert!(parse_decimal("nan").is_err());
            assert!(parse_decimal("inf").is_err());
            let err = parse_decimal("abc").unwrap_err().to_string();
            assert!(err.contains("Failed to parse decimal 'abc'"));
        }

        #[test]
        fn test_coerce_decimal_cases() {
            assert_eq!(coerce_decimal(&CellValue::from("1.234,56")), Some(1234.56));
            assert_eq!(coerce_decimal(&CellValue::from("R$ 45,00")), Some(45.0));
            assert_eq!(coerce_decimal(&CellValue::from("")), None);
            assert_eq!(coerce_decimal(&CellValue::from("   ")), None);
            assert_eq!(coerce_decimal(&CellValue::from("abc")), None);
            assert_eq!(coerce_decimal(&CellValue::Number(10.0)), Some(10.0));
            assert_eq!(coerce_decimal(&CellValue::Empty), None);
        }

        #[test]
        fn test_coerce_decimal_keeps_native_numbers() {
            assert_eq!(coerce_decimal(&CellValue::Number(1234.56)), Some(1234.56));
            assert_eq!(coerce_decimal(&CellValue::Number(f64::NAN)), None);
            assert_eq!(coerce_decimal(&CellValue::Number(f64::INFINITY)), None);
        }

        #[test]
        fn test_traced_coercion_counts_causes() {
            let mut stats = CoercionStats::default();
            let cells = [
                CellValue::from("10,5"),
                CellValue::from(""),
                CellValue::from("n/d"),
                CellValue::Number(3.0),
            ];
            let values: Vec<_> = cells.iter().map(|c| coerce_decimal_traced(c, &mut stats)).collect();
            assert_eq!(values, vec![Some(10.5), None, None, Some(3.0)]);
            assert_eq!(stats, CoercionStats { parsed: 2, blank: 1, failed: 1 });
        }

        #[test]
        fn test_clean_text_and_code() {
            assert_eq!(clean_text(&CellValue::from("  DIPIRONA  ")), Some("DIPIRONA".to_string()));
            assert_eq!(clean_text(&CellValue::from("nan")), None);
            assert_eq!(clean_code(&CellValue::from("7891234567890.0")), Some("7891234567890".to_string()));
            assert_eq!(clean_code(&CellValue::Number(7891234567890.0)), Some("7891234567890".to_string()));
            assert_eq!(clean_code(&CellValue::from("AB.0")), Some("AB.0".to_string()));
        }

        #[test]
        fn test_format_decimal() {
            assert_eq!(format_decimal(1234.56, 2), "1.234,56");
            assert_eq!(format_decimal(600822115.84, 2), "600.822.115,84");
            assert_eq!(format_decimal(45.0, 2), "45,00");
            assert_eq!(format_decimal(-1000.0, 0), "-1.000");
            assert_eq!(format_decimal(-0.001, 2), "0,00");
        }
    }
}
