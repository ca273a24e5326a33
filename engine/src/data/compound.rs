// Splits cells such as "15377                   INFRA-ESTRUTURA AEROPORTUARIA"
// into a numeric code and its description.
use once_cell::sync::Lazy;
use regex::Regex;
use shared::models::CellValue;
use shared::utils::brazilian_format::clean_text;

static CODE_AND_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(\d+)\s+(.*)$").expect("static pattern compiles"));

/// Returns `(code, description)`.
///
/// - leading digit run followed by whitespace: `(digits, rest)`
/// - anything else: `(None, whole text)`
/// - missing cell: `(None, None)`
pub fn split_compound(cell: &CellValue) -> (Option<String>, Option<String>) {
    let Some(text) = clean_text(cell) else {
        return (None, None);
    };

    match CODE_AND_TEXT.captures(&text) {
        Some(caps) => {
            let code = caps[1].to_string();
            let rest = caps[2].trim();
            let description = (!rest.is_empty()).then(|| rest.to_string());
            (Some(code), description)
        }
        None => (None, Some(text)),
    }
}
