//! Amount and text normalization helpers shared by all issuer pipelines.
//!
//! Everything here is a pure function. Malformed input degrades to `0.0`
//! or an empty string, never to an error, so one bad token cannot abort a
//! whole statement.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Amount tokens are matched whole (after whitespace splitting) so that
// dates like 01.03.24 or 01/03/24 never count as amounts.
static RE_AMOUNT_DOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?\(?[-+]?\$?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}\)?-?(?i:CR)?$").unwrap()
});
static RE_AMOUNT_COMMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?\(?[-+]?\$?(?:\d{1,3}(?:\.\d{3})+|\d+),\d{2}\)?-?(?i:CR)?$").unwrap()
});
static RE_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{6,}").unwrap());
static RE_CLABE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{18})\b").unwrap());
static RE_ACCOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:CUENTA|CTA)\.?\s*(?:NO\.?\s*)?:?\s*(\d{10,11})\b").unwrap()
});

/// Currency markers stripped before parsing an amount.
const CURRENCY_MARKERS: &[&str] = &["M.N.", "MXN", "USD", "MN", "$"];

/// Decimal convention of an issuer's amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmountLocale {
    /// `1,234.56`
    #[default]
    DotDecimal,
    /// `1.234,56`
    CommaDecimal,
}

impl AmountLocale {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::DotDecimal => &RE_AMOUNT_DOT,
            Self::CommaDecimal => &RE_AMOUNT_COMMA,
        }
    }

    /// True if the whole token is amount-shaped in this convention.
    pub fn is_amount(self, token: &str) -> bool {
        self.pattern().is_match(token.trim())
    }

    /// Parse an amount token; parenthesized, minus-marked or `CR`-suffixed
    /// values are negative, empty or malformed input yields `0.0`.
    pub fn clean(self, token: &str) -> f64 {
        let mut s = token.trim().to_uppercase();
        if s.is_empty() {
            return 0.0;
        }

        for marker in CURRENCY_MARKERS {
            s = s.replace(marker, "");
        }
        s.retain(|c| !c.is_whitespace());

        let mut negative = false;
        if let Some(rest) = s.strip_suffix("CR") {
            negative = true;
            s = rest.to_string();
        }
        if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
            negative = true;
            s = s[1..s.len() - 1].to_string();
        }
        loop {
            if let Some(rest) = s.strip_prefix('-') {
                negative = !negative;
                s = rest.to_string();
            } else if let Some(rest) = s.strip_suffix('-') {
                negative = !negative;
                s = rest.to_string();
            } else if let Some(rest) = s.strip_prefix('+') {
                s = rest.to_string();
            } else {
                break;
            }
        }

        let digits = match self {
            Self::DotDecimal => s.replace(',', ""),
            Self::CommaDecimal => s.replace('.', "").replace(',', "."),
        };

        let well_formed = !digits.is_empty()
            && digits.chars().any(|c| c.is_ascii_digit())
            && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
            && digits.matches('.').count() <= 1;
        if !well_formed {
            log::trace!("Normalize: unparseable amount token '{}'", token);
            return 0.0;
        }

        match digits.parse::<f64>() {
            Ok(value) if negative => -value,
            Ok(value) => value,
            Err(_) => 0.0,
        }
    }
}

/// An amount-shaped token found in a line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountToken {
    pub raw: String,
    pub value: f64,
}

/// Collapse whitespace runs and trim.
pub fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an amount written as `1,234.56`.
///
/// ```ignore
/// assert_eq!(clean_amount("$1,234.56"), 1234.56);
/// assert_eq!(clean_amount("(500.00)"), -500.0);
/// assert_eq!(clean_amount(""), 0.0);
/// ```
pub fn clean_amount(token: &str) -> f64 {
    AmountLocale::DotDecimal.clean(token)
}

/// All amount tokens of `text`, in reading order.
pub fn find_amounts(text: &str, locale: AmountLocale) -> Vec<AmountToken> {
    text.split_whitespace()
        .filter(|token| locale.is_amount(token))
        .map(|token| AmountToken {
            raw: token.to_string(),
            value: locale.clean(token),
        })
        .collect()
}

/// Number of amount tokens in `text`.
pub fn count_amounts(text: &str, locale: AmountLocale) -> usize {
    text.split_whitespace()
        .filter(|token| locale.is_amount(token))
        .count()
}

/// Remove amount-shaped tokens (and stray `$` signs), leaving descriptive text.
pub fn strip_amounts(text: &str) -> String {
    strip_amounts_with(text, AmountLocale::DotDecimal)
}

pub fn strip_amounts_with(text: &str, locale: AmountLocale) -> String {
    text.split_whitespace()
        .filter(|token| !locale.is_amount(token) && *token != "$")
        .collect::<Vec<_>>()
        .join(" ")
}

/// First run of 6 or more digits, or an empty string.
pub fn extract_reference(text: &str) -> String {
    RE_REFERENCE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// 18-digit CLABE interbank account number.
pub fn extract_clabe(text: &str) -> Option<String> {
    RE_CLABE.captures(text).map(|c| c[1].to_string())
}

/// CLABE if present, otherwise an account number introduced by CUENTA/CTA.
pub fn extract_account(text: &str) -> Option<String> {
    extract_clabe(text).or_else(|| RE_ACCOUNT.captures(text).map(|c| c[1].to_string()))
}

/// Uppercase and drop Spanish accents so keyword lists can stay ASCII.
pub fn fold_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'Á' | 'à' | 'À' => 'A',
            'é' | 'É' | 'è' | 'È' => 'E',
            'í' | 'Í' | 'ì' | 'Ì' => 'I',
            'ó' | 'Ó' | 'ò' | 'Ò' => 'O',
            'ú' | 'Ú' | 'ü' | 'Ü' | 'ù' | 'Ù' => 'U',
            'ñ' => 'Ñ',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Whole-word occurrence of `needle` in already folded `haystack`.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    find_word(haystack, needle).is_some()
}

/// Byte position of the first whole-word occurrence of `needle`.
pub fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before_ok = haystack[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[pos + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_amount() {
        assert_eq!(clean_amount("$1,234.56"), 1234.56);
        assert_eq!(clean_amount("(500.00)"), -500.0);
        assert_eq!(clean_amount("(1,200.50)"), -1200.50);
        assert_eq!(clean_amount(""), 0.0);
        assert_eq!(clean_amount("   "), 0.0);
        assert_eq!(clean_amount("-123.45"), -123.45);
        assert_eq!(clean_amount("1,000.00-"), -1000.0);
        assert_eq!(clean_amount("$ 2,500.00 MXN"), 2500.0);
        assert_eq!(clean_amount("+15.00"), 15.0);
    }

    #[test]
    fn test_attached_credit_marker() {
        assert!(AmountLocale::DotDecimal.is_amount("5,000.00CR"));
        assert_eq!(clean_amount("5,000.00CR"), -5000.0);
        assert_eq!(clean_amount("80.00cr"), -80.0);
        assert_eq!(AmountLocale::CommaDecimal.clean("1.250,00CR"), -1250.0);
        assert!(!AmountLocale::DotDecimal.is_amount("CR"));
        assert_eq!(strip_amounts("GRACIAS POR SU PAGO 5,000.00CR"), "GRACIAS POR SU PAGO");
    }

    #[test]
    fn test_clean_amount_malformed_degrades_to_zero() {
        assert_eq!(clean_amount("ABC"), 0.0);
        assert_eq!(clean_amount("1.2.3"), 0.0);
        assert_eq!(clean_amount("$"), 0.0);
        assert_eq!(clean_amount("()"), 0.0);
    }

    #[test]
    fn test_clean_amount_round_trip() {
        for value in [0.0, 1.5, 1234.56, -500.0, 987654.32, -0.01] {
            assert_eq!(clean_amount(&value.to_string()), value);
        }
    }

    #[test]
    fn test_comma_decimal_locale() {
        let locale = AmountLocale::CommaDecimal;
        assert_eq!(locale.clean("1.234,56"), 1234.56);
        assert_eq!(locale.clean("(1.234,56)"), -1234.56);
        assert!(locale.is_amount("1.234,56"));
        assert!(!locale.is_amount("1,234.56"));
    }

    #[test]
    fn test_find_amounts_skips_dates_and_references() {
        let amounts = find_amounts(
            "01/03/24 DEPOSITO SPEI 1234567 1,000.00 5,000.00",
            AmountLocale::DotDecimal,
        );
        let values: Vec<f64> = amounts.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![1000.0, 5000.0]);
        assert_eq!(count_amounts("01.03.24 SIN MONTO", AmountLocale::DotDecimal), 0);
    }

    #[test]
    fn test_strip_amounts() {
        assert_eq!(strip_amounts("ABONO 1,000.00 SALDO 5,000.00"), "ABONO SALDO");
        assert_eq!(strip_amounts("  PAGO   $ 15.00  "), "PAGO");
    }

    #[test]
    fn test_normalize_spaces() {
        assert_eq!(normalize_spaces("  COMISION \t MANEJO\n CTA "), "COMISION MANEJO CTA");
        assert_eq!(normalize_spaces(""), "");
    }

    #[test]
    fn test_extract_reference() {
        assert_eq!(extract_reference("SPEI REF 0098123 BANAMEX"), "0098123");
        assert_eq!(extract_reference("REF 12345"), "");
        assert_eq!(extract_reference(""), "");
    }

    #[test]
    fn test_extract_account() {
        assert_eq!(
            extract_account("TRASPASO A 012180001234567891 JUAN"),
            Some("012180001234567891".to_string())
        );
        assert_eq!(
            extract_account("PAGO CTA. 0123456789 TERCEROS"),
            Some("0123456789".to_string())
        );
        assert_eq!(extract_account("SIN CUENTA"), None);
    }

    #[test]
    fn test_fold_text_and_words() {
        assert_eq!(fold_text("Depósito Página"), "DEPOSITO PAGINA");
        assert!(contains_word("IVA COMISION", "IVA"));
        assert!(!contains_word("PRIVADA", "IVA"));
        assert_eq!(find_word("PAGO IVA", "IVA"), Some(5));
    }
}
