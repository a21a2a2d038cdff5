//! Scotiabank PDF Parser
//!
//! Parses checking account statements from Scotiabank Inverlat. Transfer
//! rows are followed by beneficiary and tracking key lines. Deposits are
//! printed before withdrawals.

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::{ExtraColumn, IssuerProfile};
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "scotiabank",
    name: "Scotiabank",
    description: "Scotiabank México: cuenta Única y cuentas de cheques",
    detect_patterns: &["SCOTIABANK INVERLAT", "SCOTIABANK"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayMonthName],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &["SCOTIABANK INVERLAT, S.A.", "GRUPO FINANCIERO SCOTIABANK"],
        prefixes: &["NO. DE CUENTA", "CLIENTE:"],
    },
    table_start: &["DETALLE DE TUS MOVIMIENTOS", "DETALLE DE MOVIMIENTOS"],
    table_end: &["LAS TASAS DE INTERES", "CARGOS OBJETADOS"],
    spei: None,
    columns: ColumnStrategy::HeaderPositions,
    amount_order: AmountOrder::CreditChargeBalance,
    balance_columns: 1,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[ExtraColumn::Detail],
    skip_settlement_date: false,
    trailing_detail: true,
    code_pattern: None,
    card_statement: false,
};

pub struct ScotiabankParser;

impl ScotiabankParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScotiabankParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for ScotiabankParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}
