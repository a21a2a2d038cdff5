//! American Express PDF Parser
//!
//! Parses card statements from American Express México. Every row is a
//! single movement without running balance; payments and refunds are
//! marked with a trailing "CR" or a minus sign. Dates appear both as
//! "DD MON" and as "Mon DD", with English month names on some cards.

use super::classify::{AmountOrder, KeywordSet};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::IssuerProfile;
use super::{BankParser, StatementTable};

const CARD_KEYWORDS: KeywordSet = KeywordSet {
    credit: &[
        "GRACIAS POR SU PAGO",
        "PAGO RECIBIDO",
        "BONIFICACION",
        "DEVOLUCION",
        "CANCELACION",
    ],
    charge: &["CUOTA ANUAL", "INTERESES", "COMISION", "IVA"],
};

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "amex",
    name: "American Express",
    description: "American Express México: tarjetas de crédito y de servicio",
    detect_patterns: &["AMERICAN EXPRESS"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayMonthName, DatePattern::MonthNameDay],
    months: MonthTable::SpanishWithEnglish,
    boilerplate: Boilerplate {
        contains: &["AMERICAN EXPRESS COMPANY (MEXICO)", "AMERICANEXPRESS.COM.MX"],
        prefixes: &["NUMERO DE CUENTA", "TARJETAHABIENTE"],
    },
    table_start: &["DETALLE DE TRANSACCIONES", "DETALLE DE CARGOS"],
    table_end: &["TOTAL DE CARGOS DEL PERIODO", "INFORMACION DE INTERESES"],
    spei: None,
    columns: ColumnStrategy::Heuristic,
    amount_order: AmountOrder::ChargeCreditBalance,
    balance_columns: 1,
    keywords: CARD_KEYWORDS,
    extra_columns: &[],
    skip_settlement_date: false,
    trailing_detail: false,
    code_pattern: None,
    card_statement: true,
};

pub struct AmexParser;

impl AmexParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmexParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for AmexParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }

    /// Drop the credit marker left in the concept once the amount is stripped.
    fn refine(&self, table: &mut StatementTable) {
        for tx in &mut table.transactions {
            let mut words: Vec<&str> = tx.concept.split_whitespace().collect();
            if words.last().is_some_and(|w| w.eq_ignore_ascii_case("CR")) {
                words.pop();
                tx.concept = words.join(" ");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_import::{parse_text, Issuer};
    use chrono::NaiveDate;

    const STATEMENT: &str = "American Express Company (Mexico), S.A. de C.V.\n\
        Periodo: 15-Feb-2024 al 14-Mar-2024\n\
        DETALLE DE TRANSACCIONES\n\
        20 FEB AMAZON MX MEXICO DF 1,299.00\n\
        Mar 02 UBER EATS CIUDAD DE MEXICO 250.50\n\
        05 MAR GRACIAS POR SU PAGO 5,000.00 CR\n\
        08 MAR BONIFICACION CASHBACK -80.00\n\
        Total de cargos del periodo 1,549.50";

    #[test]
    fn test_detect() {
        let parser = AmexParser::new();
        assert!(parser.detect("American Express Company (México), S.A. de C.V."));
        assert!(!parser.detect("BBVA MEXICO"));
    }

    #[test]
    fn test_parse_card_statement() {
        let table = parse_text(Issuer::Amex, STATEMENT);
        assert_eq!(table.bank, "American Express");
        assert_eq!(table.period.as_deref(), Some("2024-02-15 al 2024-03-14"));
        assert_eq!(table.transactions.len(), 4);
        assert!(table.transactions.iter().all(|tx| tx.balance.is_none()));

        let purchase = &table.transactions[0];
        assert_eq!(purchase.date, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap());
        assert_eq!(purchase.concept, "AMAZON MX MEXICO DF");
        assert_eq!(purchase.charge, 1299.0);

        let uber = &table.transactions[1];
        assert_eq!(uber.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(uber.charge, 250.5);

        let payment = &table.transactions[2];
        assert_eq!(payment.concept, "GRACIAS POR SU PAGO");
        assert_eq!(payment.credit, 5000.0);
        assert_eq!(payment.charge, 0.0);

        let refund = &table.transactions[3];
        assert_eq!(refund.credit, 80.0);

        assert_eq!(table.total_charges(), 1549.5);
        assert_eq!(table.total_credits(), 5080.0);
    }

    #[test]
    fn test_merchant_with_web_address_is_kept() {
        let text = "AMERICAN EXPRESS\n\
            Periodo: 15-Feb-2024 al 14-Mar-2024\n\
            DETALLE DE TRANSACCIONES\n\
            20 FEB WWW.AMAZON.COM.MX 1,299.00\n\
            21 FEB UBER EATS 250.50\n\
            Consulte su estado de cuenta en www.americanexpress.com.mx";
        let table = parse_text(Issuer::Amex, text);
        assert_eq!(table.transactions.len(), 2);
        assert_eq!(table.transactions[0].concept, "WWW.AMAZON.COM.MX");
        assert_eq!(table.transactions[0].charge, 1299.0);
        assert_eq!(table.transactions[1].concept, "UBER EATS");
    }

    #[test]
    fn test_attached_credit_marker() {
        let text = "AMERICAN EXPRESS\n\
            Periodo: 15-Feb-2024 al 14-Mar-2024\n\
            DETALLE DE TRANSACCIONES\n\
            05 MAR GRACIAS POR SU PAGO 5,000.00CR\n\
            06 MAR LIVERPOOL INSURGENTES 899.00";
        let table = parse_text(Issuer::Amex, text);
        assert_eq!(table.transactions.len(), 2);
        let payment = &table.transactions[0];
        assert_eq!(payment.concept, "GRACIAS POR SU PAGO");
        assert_eq!(payment.credit, 5000.0);
        assert_eq!(payment.charge, 0.0);
        assert_eq!(table.transactions[1].charge, 899.0);
    }

    #[test]
    fn test_english_month_names() {
        let text = "AMERICAN EXPRESS\n\
            Periodo: 15-Nov-2023 al 14-Dec-2023\n\
            DETALLE DE TRANSACCIONES\n\
            Dec 03 NETFLIX.COM 219.00";
        let table = parse_text(Issuer::Amex, text);
        assert_eq!(table.transactions.len(), 1);
        assert_eq!(table.transactions[0].date, NaiveDate::from_ymd_opt(2023, 12, 3).unwrap());
    }
}
