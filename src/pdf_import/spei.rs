//! SPEI counterparty enrichment.
//!
//! Some issuers list SPEI transfers a second time in an appendix that names
//! the beneficiary or payer. The appendix is parsed into an index first and
//! ledger rows mentioning SPEI are then matched against it by date and
//! amount, or by tracking key when the amounts disagree.

use super::classify::Direction;
use super::dates::{match_leading_date, DateContext};
use super::normalize::{find_amounts, fold_text, normalize_spaces, strip_amounts_with};
use super::profile::IssuerProfile;
use super::Transaction;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

// Tracking keys mix letters and digits (MBAN01002403010012345) or are long numbers.
static RE_TRACKING_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Z0-9]*\d{6,}[A-Z0-9]*)$").unwrap());
static RE_CLABE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10,18}$").unwrap());

/// Appendix markers of an issuer.
#[derive(Debug, Clone, Copy)]
pub struct SpeiSections {
    pub sent: &'static [&'static str],
    pub received: &'static [&'static str],
    /// Appendix ends at a line containing one of these.
    pub end: &'static [&'static str],
}

impl SpeiSections {
    /// Direction announced by an appendix heading.
    pub fn heading(&self, folded_line: &str) -> Option<Direction> {
        if self.sent.iter().any(|m| folded_line.contains(m)) {
            Some(Direction::Charge)
        } else if self.received.iter().any(|m| folded_line.contains(m)) {
            Some(Direction::Credit)
        } else {
            None
        }
    }

    pub fn ends(&self, folded_line: &str) -> bool {
        self.end.iter().any(|m| folded_line.contains(m))
    }
}

/// One appendix transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeiEntry {
    pub date: NaiveDate,
    pub amount: f64,
    pub direction: Direction,
    pub counterparty: String,
    /// Tracking key or numeric reference, folded.
    pub key: String,
}

impl SpeiEntry {
    /// Concept replacing the ledger's terse SPEI text.
    pub fn concept(&self) -> String {
        match self.direction {
            Direction::Charge => format!("SPEI ENVIADO A {}", self.counterparty),
            Direction::Credit => format!("SPEI RECIBIDO DE {}", self.counterparty),
        }
    }
}

fn cents(amount: f64) -> i64 {
    (amount.abs() * 100.0).round() as i64
}

/// Parse one appendix line: date, counterparty, optional key, amount last.
pub fn parse_entry(
    line: &str,
    direction: Direction,
    profile: &IssuerProfile,
    dates: &DateContext,
) -> Option<SpeiEntry> {
    let found = match_leading_date(line, profile.date_patterns, profile.months, dates)?;
    let rest = &line[found.consumed..];
    let amount = find_amounts(rest, profile.locale).last()?.value.abs();

    let stripped = strip_amounts_with(rest, profile.locale);
    let mut keys = Vec::new();
    let mut words = Vec::new();
    for token in stripped.split_whitespace() {
        let folded = fold_text(token);
        if RE_TRACKING_KEY.is_match(&folded) {
            keys.push(folded);
        } else {
            words.push(token);
        }
    }
    // Prefer a tracking key over a bare account number.
    let key = keys
        .iter()
        .find(|k| !RE_CLABE_LIKE.is_match(k))
        .or(keys.first())
        .cloned()
        .unwrap_or_default();
    let counterparty = normalize_spaces(&words.join(" "));
    if counterparty.is_empty() {
        return None;
    }
    Some(SpeiEntry {
        date: found.date,
        amount,
        direction,
        counterparty,
        key,
    })
}

/// Lookup table built from the appendix.
#[derive(Debug, Default)]
pub struct SpeiIndex {
    entries: Vec<SpeiEntry>,
    by_date_amount: HashMap<(NaiveDate, i64, Direction), Vec<usize>>,
    by_key: HashMap<String, usize>,
}

impl SpeiIndex {
    pub fn build(entries: Vec<SpeiEntry>) -> Self {
        let mut by_date_amount: HashMap<_, Vec<usize>> = HashMap::new();
        let mut by_key = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_date_amount
                .entry((entry.date, cents(entry.amount), entry.direction))
                .or_default()
                .push(i);
            if !entry.key.is_empty() {
                by_key.entry(entry.key.clone()).or_insert(i);
            }
        }
        Self {
            entries,
            by_date_amount,
            by_key,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn find(&self, tx: &Transaction, used: &HashSet<usize>) -> Option<usize> {
        let direction = if tx.charge > 0.0 {
            Direction::Charge
        } else if tx.credit > 0.0 {
            Direction::Credit
        } else {
            return None;
        };
        let amount = tx.charge.max(tx.credit);
        if let Some(candidates) = self.by_date_amount.get(&(tx.date, cents(amount), direction)) {
            if let Some(&i) = candidates.iter().find(|&&i| !used.contains(&i)) {
                return Some(i);
            }
        }
        let folded = fold_text(&format!("{} {}", tx.concept, tx.reference));
        self.by_key
            .iter()
            .filter(|&(key, &i)| !used.contains(&i) && folded.contains(key.as_str()))
            .map(|(_, &i)| i)
            .min()
    }

    pub fn get(&self, i: usize) -> Option<&SpeiEntry> {
        self.entries.get(i)
    }
}

/// Replace SPEI concepts with the appendix counterparty. Returns the number
/// of enriched transactions.
pub fn enrich(transactions: &mut [Transaction], index: &SpeiIndex) -> usize {
    if index.is_empty() {
        return 0;
    }
    let mut used = HashSet::new();
    let mut matched = 0;
    for tx in transactions.iter_mut() {
        if !fold_text(&tx.concept).contains("SPEI") {
            continue;
        }
        let Some(i) = index.find(tx, &used) else {
            continue;
        };
        let Some(entry) = index.get(i) else {
            continue;
        };
        used.insert(i);
        log::debug!(
            "PDF Import: SPEI {} {:.2} matched to '{}'",
            tx.date,
            entry.amount,
            entry.counterparty
        );
        tx.concept = entry.concept();
        if tx.reference.is_empty() {
            tx.reference = entry.key.clone();
        }
        matched += 1;
    }
    matched
}
