//! HSBC México PDF Parser
//!
//! Parses checking account statements from HSBC México. Movement rows
//! print only the day of the month; month and year come from the period.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "hsbc",
    name: "HSBC",
    description: "HSBC México: cuenta Flexible y cuentas de cheques",
    detect_patterns: &["HSBC MEXICO", "GRUPO FINANCIERO HSBC", "HSBC"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayOnly],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &[
            "HSBC MEXICO, S.A.",
            "GAT NOMINAL",
            "PASEO DE LA REFORMA 347",
        ],
        prefixes: &["NUMERO DE CLIENTE", "RFC"],
    },
    table_start: &["DETALLE DE MOVIMIENTOS"],
    table_end: &["INFORMACION SPEI", "GLOSARIO DE ABREVIATURAS"],
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

pub struct HsbcParser;

impl HsbcParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HsbcParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for HsbcParser {
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
        let parser = HsbcParser::new();
        assert!(parser.detect("HSBC México, S.A., Institución de Banca Múltiple"));
        assert!(!parser.detect("Banco Inbursa, S.A."));
    }

    #[test]
    fn test_parse_day_only_rows() {
        let text = "HSBC MEXICO, S.A., INSTITUCION DE BANCA MULTIPLE, GRUPO FINANCIERO HSBC\n\
            CUENTA FLEXIBLE\n\
            PERIODO DEL 01/03/2024 AL 31/03/2024\n\
            DETALLE DE MOVIMIENTOS\n\
            DIA DESCRIPCION REFERENCIA RETIRO DEPOSITO SALDO\n\
            01 SALDO INICIAL 9,000.00\n\
            04 DEPOSITO EN EFECTIVO 1,000.00 10,000.00\n\
            SUC 0123 CAJA 2\n\
            07 PAGO SERVICIO CFE 450.00 9,550.00\n\
            GLOSARIO DE ABREVIATURAS\n\
            12 MESES SIN INTERESES 1.00 2.00";
        let table = parse_text(Issuer::Hsbc, text);
        assert_eq!(table.transactions.len(), 3);

        let opening = &table.transactions[0];
        assert_eq!(opening.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(opening.balance, Some(9000.0));
        assert_eq!(opening.charge + opening.credit, 0.0);

        let deposit = &table.transactions[1];
        assert_eq!(deposit.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(deposit.credit, 1000.0);
        assert_eq!(deposit.detail.as_deref(), Some("SUC 0123 CAJA 2"));

        let payment = &table.transactions[2];
        assert_eq!(payment.concept, "PAGO SERVICIO CFE");
        assert_eq!(payment.charge, 450.0);
        assert_eq!(payment.balance, Some(9550.0));
    }
}
