//! Comparison keys for brand and model names.
//!
//! These keys are only ever used to compare names. Display always uses the
//! original strings.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Remove diacritics by NFD decomposition and dropping combining marks.
#[must_use]
pub fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison key: lowercase, diacritics stripped, alphanumerics only.
///
/// `"Citroën"` and `"citroen"` share the key `"citroen"`; `"Mercedes-Benz"`
/// becomes `"mercedesbenz"`.
#[must_use]
pub fn name_key(input: &str) -> String {
    strip_diacritics(input)
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Lowercase and strip diacritics, keeping spacing and punctuation.
#[must_use]
pub fn fold(input: &str) -> String {
    strip_diacritics(input).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_is_case_and_diacritic_insensitive() {
        assert_eq!(name_key("Citroën"), "citroen");
        assert_eq!(name_key("citroen"), "citroen");
        assert_eq!(name_key("CITROËN"), name_key("Citroen"));
    }

    #[test]
    fn name_key_drops_punctuation_and_spaces() {
        assert_eq!(name_key("Mercedes-Benz"), "mercedesbenz");
        assert_eq!(name_key("Civic 2.0 16V EXL"), "civic2016vexl");
        assert_eq!(name_key("Série 3"), "serie3");
    }

    #[test]
    fn name_key_of_symbols_is_empty() {
        assert_eq!(name_key(" - / "), "");
    }

    #[test]
    fn fold_keeps_structure() {
        assert_eq!(fold("Álcool / Gasolina"), "alcool / gasolina");
        assert_eq!(fold("Elétrico"), "eletrico");
    }
}
