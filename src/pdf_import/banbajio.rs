//! BanBajío PDF Parser
//!
//! Parses statements from Banco del Bajío. Deposits are printed before
//! withdrawals, and both columns carry an amount (0.00 when empty).

use super::classify::{AmountOrder, DEFAULT_KEYWORDS};
use super::dates::{DatePattern, MonthTable};
use super::layout::{Boilerplate, ColumnStrategy};
use super::normalize::AmountLocale;
use super::profile::IssuerProfile;
use super::BankParser;

pub static PROFILE: IssuerProfile = IssuerProfile {
    id: "banbajio",
    name: "BanBajío",
    description: "Banco del Bajío: cuentas de cheques personas físicas y morales",
    detect_patterns: &["BANCO DEL BAJIO", "BANBAJIO"],
    locale: AmountLocale::DotDecimal,
    date_patterns: &[DatePattern::DayMonthName],
    months: MonthTable::Spanish,
    boilerplate: Boilerplate {
        contains: &["BANCO DEL BAJIO, S.A.", "BANBAJIO.COM.MX"],
        prefixes: &["PAG."],
    },
    table_start: &["DETALLE DE LA CUENTA", "DETALLE DE MOVIMIENTOS"],
    table_end: &["SALDO TOTAL", "RESUMEN DE COMISIONES"],
    spei: None,
    columns: ColumnStrategy::HeaderPositions,
    amount_order: AmountOrder::CreditChargeBalance,
    balance_columns: 1,
    keywords: DEFAULT_KEYWORDS,
    extra_columns: &[],
    skip_settlement_date: false,
    trailing_detail: false,
    code_pattern: None,
    card_statement: false,
};

pub struct BanbajioParser;

impl BanbajioParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BanbajioParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for BanbajioParser {
    fn profile(&self) -> &'static IssuerProfile {
        &PROFILE
    }
}
