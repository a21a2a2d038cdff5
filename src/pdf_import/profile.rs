//! Per-issuer configuration consumed by the generic pipeline.

use super::classify::{AmountOrder, ClassifyRules, KeywordSet};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::{fold_text, AmountLocale};
use super::spei::SpeiSections;
use serde::{Deserialize, Serialize};

/// Optional output columns beyond the common six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraColumn {
    Detail,
    Account,
    Code,
}

impl ExtraColumn {
    pub fn header(self) -> &'static str {
        match self {
            Self::Detail => "Detalle",
            Self::Account => "Cuenta",
            Self::Code => "Código",
        }
    }
}

/// Everything that differs between issuers.
#[derive(Debug, Clone, Copy)]
pub struct IssuerProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Folded substrings; any one of them identifies the issuer.
    pub detect_patterns: &'static [&'static str],
    pub locale: AmountLocale,
    pub date_patterns: &'static [DatePattern],
    pub months: MonthTable,
    pub boilerplate: Boilerplate,
    /// Movements start after a line containing one of these. Empty: from the top.
    pub table_start: &'static [&'static str],
    /// Movements stop at a line containing one of these.
    pub table_end: &'static [&'static str],
    pub spei: Option<SpeiSections>,
    pub columns: ColumnStrategy,
    pub amount_order: AmountOrder,
    /// Balance amounts printed at the end of a row (BBVA prints two).
    pub balance_columns: usize,
    pub keywords: KeywordSet,
    pub extra_columns: &'static [ExtraColumn],
    /// Operation date is followed by a settlement date on the same line.
    pub skip_settlement_date: bool,
    /// A dated line with an amount is a whole record; the lines after it
    /// are its `Detalle`.
    pub trailing_detail: bool,
    /// Regex for an operation code right after the date (group 1 is kept).
    pub code_pattern: Option<&'static str>,
    /// One movement per record and no running balance.
    pub card_statement: bool,
}

impl IssuerProfile {
    /// Amount tokens that complete a record without waiting for the next date.
    pub fn finalize_at(&self) -> usize {
        if self.card_statement {
            1
        } else {
            2
        }
    }

    pub fn classify_rules(&self) -> ClassifyRules {
        ClassifyRules {
            order: self.amount_order,
            keywords: self.keywords,
            card: self.card_statement,
            balance_columns: self.balance_columns,
        }
    }

    pub fn has_column(&self, column: ExtraColumn) -> bool {
        self.extra_columns.contains(&column)
    }

    /// True if the (unfolded) document text carries one of the issuer's markers.
    pub fn detect(&self, content: &str) -> bool {
        let folded = fold_text(content);
        self.detect_patterns.iter().any(|p| folded.contains(p))
    }

    fn any_marker(markers: &[&str], folded_line: &str) -> bool {
        markers.iter().any(|m| folded_line.contains(m))
    }

    pub fn starts_table(&self, folded_line: &str) -> bool {
        Self::any_marker(self.table_start, folded_line)
    }

    pub fn ends_table(&self, folded_line: &str) -> bool {
        Self::any_marker(self.table_end, folded_line)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::pdf_import::classify::DEFAULT_KEYWORDS;

    /// Minimal numeric-date ledger used by stage tests.
    pub const LEDGER: IssuerProfile = IssuerProfile {
        id: "test",
        name: "Banco de Prueba",
        description: "Perfil de pruebas",
        detect_patterns: &["BANCO DE PRUEBA"],
        locale: AmountLocale::DotDecimal,
        date_patterns: &[DatePattern::NumericDmy],
        months: MonthTable::Spanish,
        boilerplate: Boilerplate {
            contains: &["BANCO DE PRUEBA, S.A."],
            prefixes: &[],
        },
        table_start: &[],
        table_end: &[],
        spei: None,
        columns: ColumnStrategy::Heuristic,
        amount_order: AmountOrder::ChargeCreditBalance,
        balance_columns: 1,
        keywords: DEFAULT_KEYWORDS,
        extra_columns: &[],
        skip_settlement_date: false,
        trailing_detail: false,
        code_pattern: None,
        card_statement: false,
    };
}

#[cfg(test)]
mod tests {
    use super::fixtures::LEDGER;
    use super::*;

    #[test]
    fn test_finalize_threshold() {
        assert_eq!(LEDGER.finalize_at(), 2);
        let card = IssuerProfile {
            card_statement: true,
            ..LEDGER
        };
        assert_eq!(card.finalize_at(), 1);
        assert!(card.classify_rules().card);
    }

    #[test]
    fn test_detect_is_accent_and_case_insensitive() {
        assert!(LEDGER.detect("Estado de cuenta\nBanco de Prueba, S.A."));
        assert!(!LEDGER.detect("Otro banco"));
    }

    #[test]
    fn test_extra_column_headers() {
        assert_eq!(ExtraColumn::Code.header(), "Código");
        assert!(!LEDGER.has_column(ExtraColumn::Detail));
    }
}
