//! Record segmentation: turns reconstructed lines into transactions.
//!
//! A date at the start of a line opens a record. Following lines are
//! appended until the record has enough amounts to be complete, or the
//! next date arrives.

use super::classify::classify;
use super::dates::{match_leading_date, DateContext, DateMatch, DatePattern};
use super::layout::{ColumnRole, Line};
use super::normalize::{
    count_amounts, extract_account, extract_reference, find_amounts, fold_text, normalize_spaces,
    strip_amounts_with,
};
use super::profile::{ExtraColumn, IssuerProfile};
use super::Transaction;
use chrono::NaiveDate;
use regex::Regex;

/// A record whose amounts are not complete yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub date: NaiveDate,
    pub text: String,
    pub is_balance: bool,
    pub source_lines: Vec<String>,
    pub amount_roles: Vec<Option<ColumnRole>>,
    pub page: usize,
    pub code: Option<String>,
}

impl PendingRecord {
    fn new(date: NaiveDate, text: &str, line: &Line, page: usize, code: Option<String>) -> Self {
        let mut record = Self {
            date,
            text: String::new(),
            is_balance: false,
            source_lines: Vec::new(),
            amount_roles: Vec::new(),
            page,
            code,
        };
        record.append(text, line);
        record
    }

    fn append(&mut self, text: &str, line: &Line) {
        let text = text.trim();
        if !text.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(text);
        }
        let folded = fold_text(text);
        if folded.contains("SALDO") || folded.contains("BALANCE") {
            self.is_balance = true;
        }
        self.source_lines.push(line.text.clone());
        self.amount_roles.extend(line.amount_roles.iter().copied());
    }
}

enum SegmentState {
    NoPending,
    Pending(PendingRecord),
}

/// What segmentation produced for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentOutcome {
    pub transactions: Vec<Transaction>,
    /// Date-anchored records without any amount.
    pub discarded: usize,
    pub final_balance: Option<f64>,
}

pub struct Segmenter<'p> {
    profile: &'p IssuerProfile,
    dates: DateContext,
    code_pattern: Option<Regex>,
    state: SegmentState,
    prev_balance: Option<f64>,
    transactions: Vec<Transaction>,
    discarded: usize,
    detail_open: bool,
    last_date: Option<NaiveDate>,
}

impl<'p> Segmenter<'p> {
    pub fn new(profile: &'p IssuerProfile, dates: DateContext) -> Self {
        let code_pattern = profile.code_pattern.and_then(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("PDF Import: invalid code pattern for {}: {}", profile.name, e);
                None
            }
        });
        Self {
            profile,
            dates,
            code_pattern,
            state: SegmentState::NoPending,
            prev_balance: None,
            transactions: Vec::new(),
            discarded: 0,
            detail_open: false,
            last_date: None,
        }
    }

    /// Start from a known running balance.
    pub fn with_balance(mut self, balance: Option<f64>) -> Self {
        self.prev_balance = balance;
        self
    }

    pub fn prev_balance(&self) -> Option<f64> {
        self.prev_balance
    }

    pub fn dates(&self) -> &DateContext {
        &self.dates
    }

    /// True if `text` starts with a date that would open a new record.
    pub fn opens_record(&self, text: &str) -> bool {
        self.leading_date(text).is_some()
    }

    fn leading_date(&self, text: &str) -> Option<DateMatch> {
        match_leading_date(
            text,
            self.profile.date_patterns,
            self.profile.months,
            &self.dates,
        )
        .filter(|found| self.accepts_date(found, text))
    }

    /// A bare day number inside an open record or detail block is often
    /// just text ("3 MESES SIN INTERESES"). It only opens a row when the
    /// line carries an amount or the date does not go backwards.
    fn accepts_date(&self, found: &DateMatch, text: &str) -> bool {
        if found.pattern != DatePattern::DayOnly {
            return true;
        }
        let open = matches!(self.state, SegmentState::Pending(_)) || self.detail_open;
        if !open {
            return true;
        }
        count_amounts(&text[found.consumed..], self.profile.locale) > 0
            || self.last_date.map_or(true, |last| found.date >= last)
    }

    /// Feed one already filtered line.
    pub fn push_line(&mut self, line: &Line, page: usize) {
        let text = line.text.as_str();
        let leading = self.leading_date(text);

        if let Some(found) = leading {
            self.finalize_pending();
            self.last_date = Some(found.date);
            let mut rest = &text[found.consumed..];
            if self.profile.skip_settlement_date {
                if let Some(settlement) = match_leading_date(
                    rest.trim_start(),
                    self.profile.date_patterns,
                    self.profile.months,
                    &self.dates,
                ) {
                    let trimmed = rest.trim_start();
                    rest = &trimmed[settlement.consumed..];
                }
            }
            let (code, rest) = self.take_code(rest);
            let single_line =
                self.profile.trailing_detail && count_amounts(rest, self.profile.locale) > 0;
            self.state = SegmentState::Pending(PendingRecord::new(found.date, rest, line, page, code));
            if single_line {
                self.finalize_pending();
                self.detail_open = true;
            } else {
                self.detail_open = false;
                self.finalize_if_complete();
            }
            return;
        }

        match &mut self.state {
            SegmentState::Pending(record) => {
                record.append(text, line);
                self.finalize_if_complete();
            }
            SegmentState::NoPending => {
                if self.detail_open {
                    if let Some(last) = self.transactions.last_mut() {
                        let detail = last.detail.get_or_insert_with(String::new);
                        if !detail.is_empty() {
                            detail.push(' ');
                        }
                        detail.push_str(text);
                        if last.reference.is_empty() {
                            last.reference = extract_reference(detail);
                        }
                    }
                } else {
                    log::trace!("PDF Import: ignoring line outside a record: '{}'", text);
                }
            }
        }
    }

    fn take_code<'t>(&self, rest: &'t str) -> (Option<String>, &'t str) {
        let Some(re) = &self.code_pattern else {
            return (None, rest);
        };
        let trimmed = rest.trim_start();
        match re.captures(trimmed) {
            Some(caps) => {
                let whole = caps.get(0).map_or(0, |m| m.end());
                let code = caps.get(1).map(|m| m.as_str().to_string());
                (code, &trimmed[whole..])
            }
            None => (None, rest),
        }
    }

    fn finalize_if_complete(&mut self) {
        let complete = match &self.state {
            SegmentState::Pending(record) => {
                let amounts = count_amounts(&record.text, self.profile.locale);
                amounts >= self.profile.finalize_at() || (amounts == 1 && record.is_balance)
            }
            SegmentState::NoPending => false,
        };
        if complete {
            self.finalize_pending();
            self.detail_open = self.profile.trailing_detail;
        }
    }

    fn finalize_pending(&mut self) {
        let SegmentState::Pending(record) = std::mem::replace(&mut self.state, SegmentState::NoPending)
        else {
            return;
        };
        self.detail_open = false;

        let amounts: Vec<f64> = find_amounts(&record.text, self.profile.locale)
            .into_iter()
            .map(|a| a.value)
            .collect();
        let Some(classification) = classify(
            &amounts,
            &record.amount_roles,
            &record.text,
            record.is_balance,
            self.prev_balance,
            &self.profile.classify_rules(),
        ) else {
            log::debug!(
                "PDF Import: discarding record without amounts on page {}: '{}'",
                record.page + 1,
                record.text
            );
            self.discarded += 1;
            return;
        };
        log::trace!(
            "PDF Import: {} classified by {:?}",
            record.date,
            classification.rule
        );

        let concept = normalize_spaces(&strip_amounts_with(&record.text, self.profile.locale));
        let reference = extract_reference(&concept);
        let account = if self.profile.has_column(ExtraColumn::Account) {
            extract_account(&record.text)
        } else {
            None
        };
        let code = if self.profile.has_column(ExtraColumn::Code) {
            record.code
        } else {
            None
        };

        self.prev_balance = classification.next_balance(self.prev_balance);
        self.transactions.push(Transaction {
            date: record.date,
            reference,
            concept,
            charge: classification.charge,
            credit: classification.credit,
            balance: classification.balance,
            detail: None,
            account,
            code,
        });
    }

    /// Close the current record, e.g. at the end of a section.
    pub fn flush(&mut self) {
        self.finalize_pending();
        self.detail_open = false;
    }

    pub fn finish(mut self) -> SegmentOutcome {
        self.flush();
        SegmentOutcome {
            transactions: self.transactions,
            discarded: self.discarded,
            final_balance: self.prev_balance,
        }
    }
}
