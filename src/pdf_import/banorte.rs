//! Banorte PDF Parser
//!
//! Parses statements from Banco Mercantil del Norte (Banorte). Dates are
//! printed as DD-MON-YY, the counterparty account number is kept in its own
//! column and SPEI transfers are listed again at the end of the statement.
//! The deposit column comes before the withdrawal column.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::spei::SpeiSections;
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "banorte",
    name: "Banorte",
    description: "Banorte: cuentas Enlace y Suma",
    detect_patterns: &["BANCO MERCANTIL DEL NORTE", "BANORTE"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayMonthName],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &["BANCO MERCANTIL DEL NORTE, S.A.", "GRUPO FINANCIERO BANORTE"],
        prefixes: &["NO. DE CUENTA", "CLABE:"],
    },
    table_start: &["DETALLE DE MOVIMIENTOS"],
    table_end: &["RESUMEN DE COMISIONES"],
    spei: Some(SpeiSections {
        sent: &["SPEI EMITIDOS", "TRANSFERENCIAS ENVIADAS"],
        received: &["SPEI RECIBIDOS", "TRANSFERENCIAS RECIBIDAS"],
        end: &["TOTAL DE TRANSFERENCIAS"],
    }),
    columns: ColumnStrategy::Heuristic,
    amount_order: AmountOrder::CreditChargeBalance,
    balance_columns: 1,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[ExtraColumn::Account],
    skip_settlement_date: false,
    trailing_detail: false,
    code_pattern: None,
    card_statement: false,
};

pub struct BanorteParser;

impl BanorteParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BanorteParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for BanorteParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}
