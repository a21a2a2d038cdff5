//! Statement date grammar: leading transaction dates, month tables and
//! statement period detection.

use super::normalize::fold_text;
use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static RE_NUMERIC_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})\b").unwrap());
static RE_DAY_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2})(?:[/\-]|\s+)([A-Za-z]{3,10})\.?(?:[/\-](\d{4}|\d{2})|\s(\d{4}))?\b")
        .unwrap()
});
static RE_MONTH_NAME_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z]{3,10})\.?[\s/\-](\d{1,2})(?:,?\s(\d{4}))?\b").unwrap()
});
static RE_DAY_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})\s+[A-Za-zÁÉÍÓÚÑáéíóúñ*]").unwrap());

static RE_PERIOD_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{1,2})[/\-]([A-Z]{3}|\d{1,2})[/\-](\d{4}|\d{2})\s+(?:AL|A)\s+(\d{1,2})[/\-]([A-Z]{3}|\d{1,2})[/\-](\d{4}|\d{2})",
    )
    .unwrap()
});
static RE_PERIOD_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"DEL\s+(\d{1,2})(?:\s+DE\s+([A-Z]+))?(?:\s+(?:DEL?\s+)?(\d{4}))?\s+AL\s+(\d{1,2})\s+DE\s+([A-Z]+)\s+(?:DEL?\s+)?(\d{4})",
    )
    .unwrap()
});
static RE_CUTOFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"FECHA\s+DE\s+CORTE:?\s*(\d{1,2})[/\-\s]([A-Z]{3}|\d{1,2})[/\-\s](\d{4}|\d{2})")
        .unwrap()
});
static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

static SPANISH_MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let table: [(&[&str], u32); 12] = [
        (&["ENE", "ENERO"], 1),
        (&["FEB", "FEBRERO"], 2),
        (&["MAR", "MARZO"], 3),
        (&["ABR", "ABRIL"], 4),
        (&["MAY", "MAYO"], 5),
        (&["JUN", "JUNIO"], 6),
        (&["JUL", "JULIO"], 7),
        (&["AGO", "AGOSTO"], 8),
        (&["SEP", "SEPT", "SET", "SEPTIEMBRE", "SETIEMBRE"], 9),
        (&["OCT", "OCTUBRE"], 10),
        (&["NOV", "NOVIEMBRE"], 11),
        (&["DIC", "DICIEMBRE"], 12),
    ];
    for (names, month) in table {
        for name in names {
            map.insert(*name, month);
        }
    }
    map
});

static ENGLISH_MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let table: [(&[&str], u32); 12] = [
        (&["JAN", "JANUARY"], 1),
        (&["FEB", "FEBRUARY"], 2),
        (&["MAR", "MARCH"], 3),
        (&["APR", "APRIL"], 4),
        (&["MAY"], 5),
        (&["JUN", "JUNE"], 6),
        (&["JUL", "JULY"], 7),
        (&["AUG", "AUGUST"], 8),
        (&["SEP", "SEPT", "SEPTEMBER"], 9),
        (&["OCT", "OCTOBER"], 10),
        (&["NOV", "NOVEMBER"], 11),
        (&["DEC", "DECEMBER"], 12),
    ];
    for (names, month) in table {
        for name in names {
            map.insert(*name, month);
        }
    }
    map
});

/// Shape of the date that opens a transaction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePattern {
    /// `01/03/24`, `01-03-2024`
    NumericDmy,
    /// `01-MAR-24`, `05/ENE`, `5 MAR`
    DayMonthName,
    /// `MAR 05`, `MAR. 5`
    MonthNameDay,
    /// `05` alone, month taken from the statement period
    DayOnly,
}

/// Month name vocabulary of an issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MonthTable {
    #[default]
    Spanish,
    /// Spanish first, English names as fallback.
    SpanishWithEnglish,
}

impl MonthTable {
    pub fn month(self, name: &str) -> Option<u32> {
        let folded = fold_text(name.trim().trim_end_matches('.'));
        let spanish = SPANISH_MONTHS.get(folded.as_str()).copied();
        match self {
            Self::Spanish => spanish,
            Self::SpanishWithEnglish => {
                spanish.or_else(|| ENGLISH_MONTHS.get(folded.as_str()).copied())
            }
        }
    }
}

/// First and last day covered by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StatementPeriod {
    pub fn label(&self) -> String {
        format!("{} al {}", self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// What a statement header tells us about its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateContext {
    pub period: Option<StatementPeriod>,
    pub year: Option<i32>,
}

impl DateContext {
    pub fn new(period: Option<StatementPeriod>, year: Option<i32>) -> Self {
        let year = year.or(period.map(|p| p.end.year()));
        Self { period, year }
    }

    /// Year for a month/day printed without one.
    pub fn resolve_year(&self, month: u32) -> Option<i32> {
        if let Some(period) = self.period {
            if period.start.year() == period.end.year() {
                return Some(period.end.year());
            }
            // Period spans new year: late months belong to the start year.
            return Some(if month >= period.start.month() {
                period.start.year()
            } else {
                period.end.year()
            });
        }
        self.year
    }

    /// Year and month for a bare day number.
    pub fn resolve_day(&self, day: u32) -> Option<(i32, u32)> {
        let period = self.period?;
        if period.start.year() == period.end.year() && period.start.month() == period.end.month() {
            return Some((period.start.year(), period.start.month()));
        }
        if day >= period.start.day() {
            Some((period.start.year(), period.start.month()))
        } else {
            Some((period.end.year(), period.end.month()))
        }
    }
}

/// A date recognized at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch {
    pub date: NaiveDate,
    /// Byte length of the line prefix holding the date.
    pub consumed: usize,
    pub pattern: DatePattern,
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn month_token(raw: &str, months: MonthTable) -> Option<u32> {
    if raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().ok().filter(|m| (1..=12).contains(m))
    } else {
        months.month(raw)
    }
}

/// Match one date pattern at the start of `line`.
pub fn match_date(
    line: &str,
    pattern: DatePattern,
    months: MonthTable,
    ctx: &DateContext,
) -> Option<DateMatch> {
    match pattern {
        DatePattern::NumericDmy => {
            let caps = RE_NUMERIC_DMY.captures(line)?;
            let day: u32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let year = expand_year(&caps[3])?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some(DateMatch {
                date,
                consumed: caps.get(0)?.end(),
                pattern,
            })
        }
        DatePattern::DayMonthName => {
            let caps = RE_DAY_MONTH_NAME.captures(line)?;
            let day: u32 = caps[1].parse().ok()?;
            let month = months.month(&caps[2])?;
            let year = match caps.get(3).or_else(|| caps.get(4)) {
                Some(y) => expand_year(y.as_str())?,
                None => ctx.resolve_year(month)?,
            };
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some(DateMatch {
                date,
                consumed: caps.get(0)?.end(),
                pattern,
            })
        }
        DatePattern::MonthNameDay => {
            let caps = RE_MONTH_NAME_DAY.captures(line)?;
            let month = months.month(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            let year = match caps.get(3) {
                Some(y) => expand_year(y.as_str())?,
                None => ctx.resolve_year(month)?,
            };
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some(DateMatch {
                date,
                consumed: caps.get(0)?.end(),
                pattern,
            })
        }
        DatePattern::DayOnly => {
            let caps = RE_DAY_ONLY.captures(line)?;
            let day_match = caps.get(1)?;
            let day: u32 = day_match.as_str().parse().ok()?;
            let (year, month) = ctx.resolve_day(day)?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some(DateMatch {
                date,
                consumed: day_match.end(),
                pattern,
            })
        }
    }
}

/// First of `patterns` that matches at the start of `line`.
pub fn match_leading_date(
    line: &str,
    patterns: &[DatePattern],
    months: MonthTable,
    ctx: &DateContext,
) -> Option<DateMatch> {
    patterns
        .iter()
        .find_map(|pattern| match_date(line, *pattern, months, ctx))
}

fn period_date(day: &str, month: &str, year: &str, months: MonthTable) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        expand_year(year)?,
        month_token(month, months)?,
        day.parse().ok()?,
    )
}

/// Find the statement period (and year) in header text.
pub fn detect_period(text: &str, months: MonthTable) -> DateContext {
    let folded = fold_text(text);

    if let Some(caps) = RE_PERIOD_RANGE.captures(&folded) {
        let start = period_date(&caps[1], &caps[2], &caps[3], months);
        let end = period_date(&caps[4], &caps[5], &caps[6], months);
        if let (Some(start), Some(end)) = (start, end) {
            if start <= end {
                return DateContext::new(Some(StatementPeriod { start, end }), None);
            }
        }
    }

    if let Some(caps) = RE_PERIOD_WORDS.captures(&folded) {
        let end_month = months.month(&caps[5]);
        let end_year = expand_year(&caps[6]);
        if let (Some(end_month), Some(end_year)) = (end_month, end_year) {
            let start_month = caps
                .get(2)
                .and_then(|m| months.month(m.as_str()))
                .unwrap_or(end_month);
            let start_year = caps
                .get(3)
                .and_then(|y| expand_year(y.as_str()))
                .unwrap_or(if start_month > end_month { end_year - 1 } else { end_year });
            let start = caps[1]
                .parse()
                .ok()
                .and_then(|d| NaiveDate::from_ymd_opt(start_year, start_month, d));
            let end = caps[4]
                .parse()
                .ok()
                .and_then(|d| NaiveDate::from_ymd_opt(end_year, end_month, d));
            if let (Some(start), Some(end)) = (start, end) {
                if start <= end {
                    return DateContext::new(Some(StatementPeriod { start, end }), None);
                }
            }
        }
    }

    if let Some(caps) = RE_CUTOFF.captures(&folded) {
        if let Some(end) = period_date(&caps[1], &caps[2], &caps[3], months) {
            let start = end
                .checked_sub_months(Months::new(1))
                .and_then(|d| d.succ_opt())
                .unwrap_or(end);
            return DateContext::new(Some(StatementPeriod { start, end }), None);
        }
    }

    let year = RE_YEAR
        .captures(&folded)
        .and_then(|c| c[1].parse::<i32>().ok());
    DateContext::new(None, year)
}
