//! Generic statement pipeline, parameterized by an [`IssuerProfile`].
//!
//! Pages are walked in document order. Boilerplate is dropped, table
//! headers and section markers switch between the movements ledger and the
//! SPEI appendix, and ledger lines go through the segmenter.

use super::classify::Direction;
use super::dates::{detect_period, DateContext};
use super::layout::is_table_header;
use super::normalize::fold_text;
use super::profile::IssuerProfile;
use super::segment::Segmenter;
use super::spei::{enrich, parse_entry, SpeiEntry, SpeiIndex};
use super::text_layer::PageText;
use super::StatementTable;

/// Lines of the first pages used to find the statement period.
const HEADER_LINES: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Ledger,
    Spei(Direction),
}

/// Header text used for period and issuer detection.
pub fn header_text(pages: &[PageText]) -> String {
    pages
        .iter()
        .flat_map(|page| page.lines.iter())
        .take(HEADER_LINES)
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the whole pipeline over already acquired pages.
pub fn run(profile: &IssuerProfile, pages: &[PageText]) -> StatementTable {
    let dates = detect_period(&header_text(pages), profile.months);
    run_with_dates(profile, pages, dates)
}

pub fn run_with_dates(profile: &IssuerProfile, pages: &[PageText], dates: DateContext) -> StatementTable {
    let mut table = StatementTable::empty(profile);
    table.year = dates.year;
    table.period = dates.period.map(|p| p.label());

    let mut segmenter = Segmenter::new(profile, dates);
    let mut spei_entries: Vec<SpeiEntry> = Vec::new();
    let mut section = if profile.table_start.is_empty() {
        Section::Ledger
    } else {
        Section::Outside
    };

    for page in pages {
        if page.is_empty() {
            log::debug!("PDF Import: page {} has no lines", page.index + 1);
            continue;
        }
        for line in &page.lines {
            // Dated ledger lines are never footers, even with a web address
            // in the merchant name.
            if profile.boilerplate.is_boilerplate(&line.text)
                && !(section == Section::Ledger && segmenter.opens_record(&line.text))
            {
                continue;
            }
            let folded = fold_text(&line.text);

            if let Some(spei) = &profile.spei {
                if let Some(direction) = spei.heading(&folded) {
                    segmenter.flush();
                    section = Section::Spei(direction);
                    continue;
                }
            }

            match section {
                Section::Outside => {
                    if profile.starts_table(&folded) {
                        section = Section::Ledger;
                    }
                }
                Section::Ledger => {
                    if profile.ends_table(&folded) {
                        segmenter.flush();
                        section = Section::Outside;
                        continue;
                    }
                    if profile.starts_table(&folded) || is_table_header(&line.text, profile.locale) {
                        continue;
                    }
                    segmenter.push_line(line, page.index);
                }
                Section::Spei(direction) => {
                    let ends = profile.spei.map(|s| s.ends(&folded)).unwrap_or(true);
                    if ends {
                        section = Section::Outside;
                    } else if profile.starts_table(&folded) {
                        section = Section::Ledger;
                    } else if let Some(entry) =
                        parse_entry(&line.text, direction, profile, segmenter.dates())
                    {
                        spei_entries.push(entry);
                    }
                }
            }
        }
    }

    let outcome = segmenter.finish();
    if outcome.discarded > 0 {
        log::debug!(
            "PDF Import: {} dated lines without amounts were discarded",
            outcome.discarded
        );
    }
    table.transactions = outcome.transactions;

    if !spei_entries.is_empty() {
        let index = SpeiIndex::build(spei_entries);
        let matched = enrich(&mut table.transactions, &index);
        log::info!(
            "PDF Import: {} of {} SPEI appendix entries matched",
            matched,
            index.len()
        );
    }

    if table.transactions.is_empty() {
        table
            .warnings
            .push("No se encontraron movimientos en el estado de cuenta".to_string());
    }
    log::info!(
        "PDF Import: {} produced {} transactions",
        profile.name,
        table.transactions.len()
    );
    table
}
