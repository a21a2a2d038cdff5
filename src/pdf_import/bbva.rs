//! BBVA México PDF Parser
//!
//! Parses checking account statements from BBVA México (formerly Bancomer).
//! Rows carry an operation and a settlement date, an operation code, the
//! movement amount and two balances (operación / liquidación). The lines
//! below a row are its detail, and SPEI transfers are repeated in an
//! appendix that names the counterparty.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::spei::SpeiSections;
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "bbva",
    name: "BBVA",
    description: "BBVA México: cuenta de cheques y Libretón",
    detect_patterns: &["BBVA MEXICO", "BBVA BANCOMER", "BANCOMER"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayMonthName],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &[
            "BBVA MEXICO, S.A.",
            "ESTIMADO CLIENTE",
            "LA GAT REAL",
            "AVENIDA PASEO DE LA REFORMA",
        ],
        prefixes: &["NO. DE CLIENTE", "R.F.C."],
    },
    table_start: &["DETALLE DE MOVIMIENTOS REALIZADOS"],
    table_end: &["TOTAL DE MOVIMIENTOS", "TOTAL IMPORTE CARGOS"],
    spei: Some(SpeiSections {
        sent: &["TRANSFERENCIAS SPEI ENVIADAS"],
        received: &["TRANSFERENCIAS SPEI RECIBIDAS"],
        end: &["TOTAL DE TRANSFERENCIAS"],
    }),
    columns: ColumnStrategy::HeaderPositions,
    amount_order: AmountOrder::ChargeCreditBalance,
    balance_columns: 2,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[ExtraColumn::Detail],
    skip_settlement_date: true,
    trailing_detail: true,
    code_pattern: Some(r"^([A-Z]\d{2})\s+"),
    card_statement: false,
};

pub struct BbvaParser;

impl BbvaParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BbvaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for BbvaParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_import::{parse_text, Issuer};
    use chrono::NaiveDate;

    const STATEMENT: &str = "BBVA MEXICO, S.A., INSTITUCION DE BANCA MULTIPLE, GRUPO FINANCIERO BBVA MEXICO\n\
        Periodo DEL 01/03/2024 AL 31/03/2024\n\
        No. de Cliente B1234567\n\
        Detalle de Movimientos Realizados\n\
        FECHA OPER LIQ COD. DESCRIPCIÓN REFERENCIA CARGOS ABONOS OPERACIÓN LIQUIDACIÓN\n\
        05/MAR 05/MAR T17 SPEI ENVIADO BANAMEX 1,500.00 8,500.00 8,500.00\n\
        0051234567 PAGO RENTA\n\
        Ref. 0098765432\n\
        06/MAR 06/MAR W02 DEPOSITO DE TERCERO 2,000.00 10,500.00 10,500.00\n\
        REF 1234567890 BNET\n\
        Total de Movimientos\n\
        TRANSFERENCIAS SPEI ENVIADAS\n\
        05/MAR MBAN01002403050012345 JUAN PEREZ LOPEZ 1,500.00\n\
        Total de transferencias 1";

    #[test]
    fn test_detect() {
        let parser = BbvaParser::new();
        assert!(parser.detect("BBVA MEXICO, S.A., INSTITUCION DE BANCA MULTIPLE"));
        assert!(parser.detect("BBVA Bancomer\nLibretón Básico"));
        assert!(!parser.detect("HSBC MEXICO, S.A."));
    }

    #[test]
    fn test_parse_statement() {
        let table = parse_text(Issuer::Bbva, STATEMENT);
        assert_eq!(table.bank, "BBVA");
        assert_eq!(table.period.as_deref(), Some("2024-03-01 al 2024-03-31"));
        assert_eq!(table.transactions.len(), 2);

        let sent = &table.transactions[0];
        assert_eq!(sent.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(sent.concept, "SPEI ENVIADO A JUAN PEREZ LOPEZ");
        assert_eq!(sent.charge, 1500.0);
        assert_eq!(sent.credit, 0.0);
        assert_eq!(sent.balance, Some(8500.0));
        assert_eq!(sent.reference, "0051234567");
        assert_eq!(sent.detail.as_deref(), Some("0051234567 PAGO RENTA Ref. 0098765432"));
        assert_eq!(sent.code, None);

        let deposit = &table.transactions[1];
        assert_eq!(deposit.concept, "DEPOSITO DE TERCERO");
        assert_eq!(deposit.credit, 2000.0);
        assert_eq!(deposit.balance, Some(10500.0));
        assert_eq!(deposit.reference, "1234567890");
        assert_eq!(deposit.detail.as_deref(), Some("REF 1234567890 BNET"));
    }

    #[test]
    fn test_columns_include_detail() {
        let table = parse_text(Issuer::Bbva, STATEMENT);
        assert_eq!(table.columns().last(), Some(&"Detalle"));
        assert!(table.warnings.is_empty());
    }
}
