//! Inbursa PDF Parser
//!
//! Parses statements from Banco Inbursa. Rows start with the month name
//! followed by the day ("MAR. 05"), then the operation reference.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::spei::SpeiSections;
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "inbursa",
    name: "Inbursa",
    description: "Banco Inbursa: CT Inbursa y cuentas Efe",
    detect_patterns: &["BANCO INBURSA", "INBURSA"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::MonthNameDay],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &["BANCO INBURSA, S.A.", "GRUPO FINANCIERO INBURSA"],
        prefixes: &["CLIENTE INBURSA"],
    },
    table_start: &["DETALLE DE MOVIMIENTOS"],
    table_end: &["SI DESEA RECIBIR PAGOS"],
    spei: Some(SpeiSections {
        sent: &["TRANSFERENCIAS SPEI ENVIADAS"],
        received: &["TRANSFERENCIAS SPEI RECIBIDAS"],
        end: &["TOTAL SPEI"],
    }),
    columns: ColumnStrategy::Heuristic,
    amount_order: AmountOrder::ChargeCreditBalance,
    balance_columns: 1,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[ExtraColumn::Account],
    skip_settlement_date: false,
    trailing_detail: false,
    code_pattern: None,
    card_statement: false,
};

pub struct InbursaParser;

impl InbursaParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InbursaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for InbursaParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}
