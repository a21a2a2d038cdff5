//! Amount classification: which of a record's amounts is the charge, the
//! credit and the running balance.
//!
//! Rules are tried in order and the first one that applies wins:
//! column hints, positional (3+ amounts), balance delta (2 amounts with a
//! known previous balance), keywords, and finally the sign of the amount.

use super::layout::ColumnRole;
use super::normalize::{find_word, fold_text};
use serde::{Deserialize, Serialize};

/// Direction of money for a single movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Charge,
    Credit,
}

/// Column order of the two movement amounts when a row prints 3+ amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmountOrder {
    /// `... charge credit balance`
    #[default]
    ChargeCreditBalance,
    /// `... credit charge balance` (deposits printed before withdrawals)
    CreditChargeBalance,
}

/// Keyword vocabulary for direction guesses.
#[derive(Debug, Clone, Copy)]
pub struct KeywordSet {
    pub credit: &'static [&'static str],
    pub charge: &'static [&'static str],
}

pub const DEFAULT_KEYWORDS: KeywordSet = KeywordSet {
    credit: &[
        "ABONO",
        "DEPOSITO",
        "PAGO RECIBIDO",
        "SPEI RECIBIDO",
        "INTERESES",
        "DEVOLUCION",
    ],
    charge: &[
        "CARGO",
        "COMPRA",
        "RETIRO",
        "SPEI ENVIADO",
        "COMISION",
        "IVA",
        "DOMICILIACION",
    ],
};

impl KeywordSet {
    /// Direction of the earliest keyword in `text`; longer keywords win ties.
    pub fn classify(&self, text: &str) -> Option<Direction> {
        let folded = fold_text(text);
        let credit = self
            .credit
            .iter()
            .filter_map(|k| find_word(&folded, k).map(|pos| (pos, k.len(), Direction::Credit)));
        let charge = self
            .charge
            .iter()
            .filter_map(|k| find_word(&folded, k).map(|pos| (pos, k.len(), Direction::Charge)));
        credit
            .chain(charge)
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, _, direction)| direction)
    }
}

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    ColumnHints,
    Positional,
    BalanceDelta,
    Keyword,
    SignDefault,
    OpeningBalance,
    CardMovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub charge: f64,
    pub credit: f64,
    pub balance: Option<f64>,
    pub rule: Rule,
}

impl Classification {
    fn movement(direction: Direction, amount: f64, balance: Option<f64>, rule: Rule) -> Self {
        let amount = amount.abs();
        match direction {
            Direction::Charge => Self {
                charge: amount,
                credit: 0.0,
                balance,
                rule,
            },
            Direction::Credit => Self {
                charge: 0.0,
                credit: amount,
                balance,
                rule,
            },
        }
    }

    /// Balance to carry into the next record.
    pub fn next_balance(&self, prev_balance: Option<f64>) -> Option<f64> {
        self.balance
            .or_else(|| prev_balance.map(|prev| prev + self.credit - self.charge))
    }
}

/// Per-issuer knobs of the rule chain.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRules {
    pub order: AmountOrder,
    pub keywords: KeywordSet,
    /// Card statements: one movement per record, no running balance.
    pub card: bool,
    /// Trailing balance amounts per row; only the first one is kept.
    pub balance_columns: usize,
}

impl Default for ClassifyRules {
    fn default() -> Self {
        Self {
            order: AmountOrder::default(),
            keywords: DEFAULT_KEYWORDS,
            card: false,
            balance_columns: 1,
        }
    }
}

fn by_keyword(text: &str, raw: f64, keywords: &KeywordSet) -> (Direction, Rule) {
    match keywords.classify(text) {
        Some(direction) => (direction, Rule::Keyword),
        None if raw < 0.0 => (Direction::Charge, Rule::SignDefault),
        None => (Direction::Credit, Rule::SignDefault),
    }
}

fn by_hints(amounts: &[f64], hints: &[Option<ColumnRole>]) -> Option<Classification> {
    if hints.is_empty() || hints.len() != amounts.len() {
        return None;
    }
    let mut charge = None;
    let mut credit = None;
    let mut balance = None;
    for (amount, hint) in amounts.iter().zip(hints) {
        match (*hint)? {
            ColumnRole::Charge if charge.is_none() => charge = Some(amount.abs()),
            ColumnRole::Credit if credit.is_none() => credit = Some(amount.abs()),
            ColumnRole::Balance => {
                if balance.is_none() {
                    balance = Some(*amount);
                }
            }
            _ => return None,
        }
    }
    if charge.is_none() && credit.is_none() {
        return None;
    }
    Some(Classification {
        charge: charge.unwrap_or(0.0),
        credit: credit.unwrap_or(0.0),
        balance,
        rule: Rule::ColumnHints,
    })
}

fn card_movement(amounts: &[f64], text: &str, keywords: &KeywordSet) -> Option<Classification> {
    let raw = *amounts.last()?;
    let folded = fold_text(text);
    let direction = if raw < 0.0 || find_word(&folded, "CR").is_some() {
        Direction::Credit
    } else if keywords.classify(text) == Some(Direction::Credit) {
        Direction::Credit
    } else {
        Direction::Charge
    };
    Some(Classification::movement(direction, raw, None, Rule::CardMovement))
}

/// Classify the signed amounts of one record.
///
/// `amounts` are in reading order, `hints` holds the column of each amount
/// when the page had a calibrated header (empty otherwise). Returns `None`
/// when the record has no amounts and must be discarded.
pub fn classify(
    amounts: &[f64],
    hints: &[Option<ColumnRole>],
    text: &str,
    is_balance: bool,
    prev_balance: Option<f64>,
    rules: &ClassifyRules,
) -> Option<Classification> {
    if amounts.is_empty() {
        return None;
    }

    if rules.card {
        return card_movement(amounts, text, &rules.keywords);
    }

    if let Some(hinted) = by_hints(amounts, hints) {
        return Some(hinted);
    }

    let amounts = if rules.balance_columns > 1 && amounts.len() > rules.balance_columns {
        &amounts[..amounts.len() - (rules.balance_columns - 1)]
    } else {
        amounts
    };
    let n = amounts.len();
    if n >= 3 {
        let (first, second, balance) = (amounts[n - 3], amounts[n - 2], amounts[n - 1]);
        let (charge, credit) = match rules.order {
            AmountOrder::ChargeCreditBalance => (first, second),
            AmountOrder::CreditChargeBalance => (second, first),
        };
        return Some(Classification {
            charge: charge.abs(),
            credit: credit.abs(),
            balance: Some(balance),
            rule: Rule::Positional,
        });
    }

    if n == 2 {
        let (movement, balance) = (amounts[0], amounts[1]);
        let (direction, rule) = match prev_balance {
            Some(prev) if balance > prev => (Direction::Credit, Rule::BalanceDelta),
            Some(prev) if balance < prev => (Direction::Charge, Rule::BalanceDelta),
            _ => by_keyword(text, movement, &rules.keywords),
        };
        return Some(Classification::movement(direction, movement, Some(balance), rule));
    }

    let amount = amounts[0];
    if is_balance {
        return Some(Classification {
            charge: 0.0,
            credit: 0.0,
            balance: Some(amount),
            rule: Rule::OpeningBalance,
        });
    }
    let (direction, rule) = by_keyword(text, amount, &rules.keywords);
    Some(Classification::movement(direction, amount, None, rule))
}
