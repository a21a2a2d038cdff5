//! Banco BASE PDF Parser
//!
//! Parses statements from Banco BASE. Rows carry a full DD/MM/YYYY date
//! followed by a numeric operation code, which is kept in its own column.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "base",
    name: "BASE",
    description: "Banco BASE: cuentas en pesos y divisas",
    detect_patterns: &["BANCO BASE"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::NumericDmy],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &["BANCO BASE, S.A.", "GRUPO FINANCIERO BASE"],
        prefixes: &["CONTRATO:"],
    },
    table_start: &["MOVIMIENTOS DEL PERIODO", "DETALLE DE MOVIMIENTOS"],
    table_end: &["TOTALES DEL PERIODO"],
    spei: None,
    columns: ColumnStrategy::HeaderPositions,
    amount_order: AmountOrder::ChargeCreditBalance,
    balance_columns: 1,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[ExtraColumn::Code],
    skip_settlement_date: false,
    trailing_detail: false,
    code_pattern: Some(r"^(\d{3,4})\s+"),
    card_statement: false,
};

pub struct BaseParser;

impl BaseParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BaseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for BaseParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_import::{parse_text, Issuer};
    use chrono::NaiveDate;

    const STATEMENT: &str = "BANCO BASE, S.A., INSTITUCION DE BANCA MULTIPLE\n\
        PERIODO DEL 01/03/2024 AL 31/03/2024\n\
        MOVIMIENTOS DEL PERIODO\n\
        FECHA CODIGO CONCEPTO REFERENCIA CARGOS ABONOS SALDO\n\
        01/03/2024 SALDO INICIAL 50,000.00\n\
        04/03/2024 0120 DEPOSITO SPEI 7788990 20,000.00 70,000.00\n\
        11/03/2024 0345 PAGO DIVISAS USD 5512340 15,300.00 54,700.00\n\
        TOTALES DEL PERIODO 15,300.00 20,000.00";

    #[test]
    fn test_detect() {
        let parser = BaseParser::new();
        assert!(parser.detect("Banco Base, S.A."));
        assert!(!parser.detect("Base de datos"));
    }

    #[test]
    fn test_operation_codes() {
        let table = parse_text(Issuer::Base, STATEMENT);
        assert_eq!(table.extra_columns, vec![ExtraColumn::Code]);
        assert_eq!(table.transactions.len(), 3);

        let opening = &table.transactions[0];
        assert_eq!(opening.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(opening.code, None);
        assert_eq!(opening.balance, Some(50000.0));

        let deposit = &table.transactions[1];
        assert_eq!(deposit.code.as_deref(), Some("0120"));
        assert_eq!(deposit.concept, "DEPOSITO SPEI 7788990");
        assert_eq!(deposit.reference, "7788990");
        assert_eq!(deposit.credit, 20000.0);

        let fx = &table.transactions[2];
        assert_eq!(fx.code.as_deref(), Some("0345"));
        assert_eq!(fx.concept, "PAGO DIVISAS USD 5512340");
        assert_eq!(fx.charge, 15300.0);
        assert_eq!(fx.balance, Some(54700.0));
    }

    #[test]
    fn test_rows_end_with_code() {
        let table = parse_text(Issuer::Base, STATEMENT);
        let rows = table.rows();
        assert_eq!(rows[1].last().map(String::as_str), Some("0120"));
        assert_eq!(rows[0].last().map(String::as_str), Some(""));
    }
}
