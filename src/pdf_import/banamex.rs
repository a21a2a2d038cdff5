//! Banamex PDF Parser
//!
//! Parses checking account statements from Banco Nacional de México
//! (Citibanamex). Rows are dated "DD MON"; reference and authorization
//! numbers are printed on the lines below each row.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "banamex",
    name: "Banamex",
    description: "Citibanamex: cuenta Perfiles y Priority",
    detect_patterns: &["BANCO NACIONAL DE MEXICO", "CITIBANAMEX", "BANAMEX"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayMonthName],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &["BANCO NACIONAL DE MEXICO, S.A.", "INTEGRANTE DEL GRUPO FINANCIERO"],
        prefixes: &["CLIENTE:", "SUCURSAL:"],
    },
    table_start: &["DETALLE DE OPERACIONES"],
    table_end: &["TOTAL DE OPERACIONES", "SALDO PROMEDIO"],
    spei: None,
    columns: ColumnStrategy::HeaderPositions,
    amount_order: AmountOrder::ChargeCreditBalance,
    balance_columns: 1,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[ExtraColumn::Detail],
    skip_settlement_date: false,
    trailing_detail: true,
    code_pattern: None,
    card_statement: false,
};

pub struct BanamexParser;

impl BanamexParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BanamexParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for BanamexParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_import::{parse_text, Issuer};
    use chrono::NaiveDate;

    #[test]
    fn test_detect() {
        let parser = BanamexParser::new();
        assert!(parser.detect("Banco Nacional de México, S.A."));
        assert!(parser.detect("CITIBANAMEX"));
        assert!(!parser.detect("Scotiabank Inverlat"));
    }

    #[test]
    fn test_parse_statement() {
        let text = "BANCO NACIONAL DE MEXICO, S.A.\n\
            ESTADO DE CUENTA AL 31 DE MARZO DE 2024\n\
            PERIODO DEL 01/MAR/2024 AL 31/MAR/2024\n\
            DETALLE DE OPERACIONES\n\
            FECHA CONCEPTO RETIROS DEPOSITOS SALDO\n\
            01 MAR SALDO ANTERIOR 7,500.00\n\
            05 MAR PAGO INTERBANCARIO A SANTANDER 1,200.00 6,300.00\n\
            REF. 4455667 AUT. 123456\n\
            12 MAR DEPOSITO SUC. 870 2,000.00 8,300.00\n\
            TOTAL DE OPERACIONES 1,200.00 2,000.00";
        let table = parse_text(Issuer::Banamex, text);
        assert_eq!(table.period.as_deref(), Some("2024-03-01 al 2024-03-31"));
        assert_eq!(table.transactions.len(), 3);

        let payment = &table.transactions[1];
        assert_eq!(payment.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(payment.concept, "PAGO INTERBANCARIO A SANTANDER");
        assert_eq!(payment.charge, 1200.0);
        assert_eq!(payment.reference, "4455667");
        assert_eq!(payment.detail.as_deref(), Some("REF. 4455667 AUT. 123456"));

        let deposit = &table.transactions[2];
        assert_eq!(deposit.concept, "DEPOSITO SUC. 870");
        assert_eq!(deposit.credit, 2000.0);
        assert_eq!(deposit.balance, Some(8300.0));
        assert_eq!(deposit.detail, None);
    }
}
