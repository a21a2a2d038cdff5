//! PDF Bank Statement Import Module
//!
//! Extracts the movements table of Mexican bank and card statements into
//! a normalized ledger (Fecha, Referencia, Concepto, Cargo, Abono, Saldo).

pub mod amex;
pub mod banamex;
pub mod banbajio;
pub mod banorte;
pub mod base;
pub mod bbva;
pub mod classify;
pub mod dates;
pub mod hsbc;
pub mod inbursa;
pub mod layout;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod profile;
pub mod scotiabank;
pub mod segment;
pub mod spei;
pub mod text_layer;

use crate::error::{ExtractError, Result};
use chrono::NaiveDate;
use normalize::fold_text;
use ocr::{should_use_ocr_fallback, OcrEngine, OcrSettings, TesseractOcr};
use profile::{ExtraColumn, IssuerProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use text_layer::{assemble_pages, read_text_layer, validate_pdf, AcquiredPages, PageText, RawPage, TextOrigin};

pub use text_layer::StatementSource;

/// Minimum non-whitespace characters for a page to count as having text.
pub const DEFAULT_MIN_PAGE_CHARS: usize = 10;

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "Fecha")]
    pub date: NaiveDate,
    #[serde(rename = "Referencia")]
    pub reference: String,
    #[serde(rename = "Concepto")]
    pub concept: String,
    #[serde(rename = "Cargo")]
    pub charge: f64,
    #[serde(rename = "Abono")]
    pub credit: f64,
    #[serde(rename = "Saldo")]
    pub balance: Option<f64>,
    #[serde(rename = "Detalle", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "Cuenta", default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(rename = "Código", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Transaction {
    fn extra(&self, column: ExtraColumn) -> String {
        match column {
            ExtraColumn::Detail => self.detail.clone(),
            ExtraColumn::Account => self.account.clone(),
            ExtraColumn::Code => self.code.clone(),
        }
        .unwrap_or_default()
    }
}

/// All transactions of one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementTable {
    pub issuer: Issuer,
    pub bank: String,
    pub transactions: Vec<Transaction>,
    pub year: Option<i32>,
    pub period: Option<String>,
    pub extra_columns: Vec<ExtraColumn>,
    pub warnings: Vec<String>,
}

pub const BASE_COLUMNS: [&str; 6] = ["Fecha", "Referencia", "Concepto", "Cargo", "Abono", "Saldo"];

impl StatementTable {
    pub fn empty(profile: &IssuerProfile) -> Self {
        Self {
            issuer: Issuer::from_id(profile.id).unwrap_or_default(),
            bank: profile.name.to_string(),
            transactions: Vec::new(),
            year: None,
            period: None,
            extra_columns: profile.extra_columns.to_vec(),
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Header row for a spreadsheet writer.
    pub fn columns(&self) -> Vec<&'static str> {
        BASE_COLUMNS
            .iter()
            .copied()
            .chain(self.extra_columns.iter().map(|c| c.header()))
            .collect()
    }

    /// Cells as strings, in [`columns`](Self::columns) order.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.transactions
            .iter()
            .map(|tx| {
                let mut row = vec![
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.reference.clone(),
                    tx.concept.clone(),
                    format!("{:.2}", tx.charge),
                    format!("{:.2}", tx.credit),
                    tx.balance.map(|b| format!("{:.2}", b)).unwrap_or_default(),
                ];
                row.extend(self.extra_columns.iter().map(|c| tx.extra(*c)));
                row
            })
            .collect()
    }

    pub fn total_charges(&self) -> f64 {
        self.transactions.iter().map(|tx| tx.charge).sum()
    }

    pub fn total_credits(&self) -> f64 {
        self.transactions.iter().map(|tx| tx.credit).sum()
    }
}

/// Supported issuers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issuer {
    #[default]
    Bbva,
    Hsbc,
    Banorte,
    Banamex,
    Inbursa,
    Banbajio,
    Amex,
    Scotiabank,
    Base,
}

impl Issuer {
    pub const ALL: [Issuer; 9] = [
        Self::Bbva,
        Self::Hsbc,
        Self::Banorte,
        Self::Banamex,
        Self::Inbursa,
        Self::Banbajio,
        Self::Amex,
        Self::Scotiabank,
        Self::Base,
    ];

    pub fn parser(self) -> Box<dyn BankParser> {
        match self {
            Self::Bbva => Box::new(bbva::BbvaParser::new()),
            Self::Hsbc => Box::new(hsbc::HsbcParser::new()),
            Self::Banorte => Box::new(banorte::BanorteParser::new()),
            Self::Banamex => Box::new(banamex::BanamexParser::new()),
            Self::Inbursa => Box::new(inbursa::InbursaParser::new()),
            Self::Banbajio => Box::new(banbajio::BanbajioParser::new()),
            Self::Amex => Box::new(amex::AmexParser::new()),
            Self::Scotiabank => Box::new(scotiabank::ScotiabankParser::new()),
            Self::Base => Box::new(base::BaseParser::new()),
        }
    }

    pub fn profile(self) -> &'static IssuerProfile {
        match self {
            Self::Bbva => &bbva::PROFILE,
            Self::Hsbc => &hsbc::PROFILE,
            Self::Banorte => &banorte::PROFILE,
            Self::Banamex => &banamex::PROFILE,
            Self::Inbursa => &inbursa::PROFILE,
            Self::Banbajio => &banbajio::PROFILE,
            Self::Amex => &amex::PROFILE,
            Self::Scotiabank => &scotiabank::PROFILE,
            Self::Base => &base::PROFILE,
        }
    }

    pub fn id(self) -> &'static str {
        self.profile().id
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let wanted = fold_text(id.trim()).replace(|c: char| c == ' ' || c == '-', "_");
        Self::ALL.into_iter().find(|issuer| {
            let profile = issuer.profile();
            fold_text(profile.id) == wanted || fold_text(profile.name).replace(' ', "_") == wanted
        })
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

impl FromStr for Issuer {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s).ok_or(ExtractError::UnknownIssuer)
    }
}

/// Issuer entry for pickers in calling UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedIssuer {
    pub id: String,
    pub name: String,
    pub description: String,
}

pub fn supported_issuers() -> Vec<SupportedIssuer> {
    Issuer::ALL
        .iter()
        .map(|issuer| {
            let profile = issuer.profile();
            SupportedIssuer {
                id: profile.id.to_string(),
                name: profile.name.to_string(),
                description: profile.description.to_string(),
            }
        })
        .collect()
}

/// Bank parser trait
pub trait BankParser: Send + Sync {
    fn profile(&self) -> &'static IssuerProfile;

    /// Check if this parser can handle the given PDF content
    fn detect(&self, content: &str) -> bool {
        self.profile().detect(content)
    }

    /// Get the bank name
    fn bank_name(&self) -> &'static str {
        self.profile().name
    }

    /// Parse reconstructed pages into a table
    fn parse(&self, pages: &[PageText]) -> StatementTable {
        let mut table = pipeline::run(self.profile(), pages);
        self.refine(&mut table);
        table
    }

    /// Issuer-specific cleanup after the generic pipeline
    fn refine(&self, _table: &mut StatementTable) {}
}

/// All available bank parsers
pub fn get_parsers() -> Vec<Box<dyn BankParser>> {
    Issuer::ALL.iter().map(|issuer| issuer.parser()).collect()
}

/// Issuer whose marker appears first in `content`.
pub fn detect_issuer(content: &str) -> Option<Issuer> {
    let folded = fold_text(content);
    Issuer::ALL
        .iter()
        .filter_map(|issuer| {
            issuer
                .profile()
                .detect_patterns
                .iter()
                .filter_map(|p| folded.find(p))
                .min()
                .map(|pos| (pos, *issuer))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, issuer)| issuer)
}

/// Per call options.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub ocr: OcrSettings,
    pub min_page_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ocr: OcrSettings::from_env(),
            min_page_chars: DEFAULT_MIN_PAGE_CHARS,
        }
    }
}

fn finish(parser: &dyn BankParser, acquired: AcquiredPages) -> StatementTable {
    let mut table = parser.parse(&acquired.pages);
    let mut warnings = acquired.warnings;
    warnings.append(&mut table.warnings);
    table.warnings = warnings;
    table
}

/// Extract the statement of a known issuer, OCR configured from the environment.
pub fn extract(source: impl Into<StatementSource>, issuer: Issuer) -> Result<StatementTable> {
    let options = ExtractOptions::default();
    let ocr = TesseractOcr::new(options.ocr.clone());
    extract_with(source, issuer, &options, &ocr)
}

pub fn extract_with(
    source: impl Into<StatementSource>,
    issuer: Issuer,
    options: &ExtractOptions,
    ocr: &dyn OcrEngine,
) -> Result<StatementTable> {
    let bytes = source.into().into_bytes()?;
    let parser = issuer.parser();
    log::info!("PDF Import: extracting {} statement ({} bytes)", parser.bank_name(), bytes.len());
    let acquired =
        text_layer::acquire_pages(&bytes, parser.profile(), options.min_page_chars, ocr)?;
    Ok(finish(parser.as_ref(), acquired))
}

/// Extract a statement whose issuer is detected from its text.
pub fn extract_auto(source: impl Into<StatementSource>) -> Result<StatementTable> {
    let options = ExtractOptions::default();
    let ocr = TesseractOcr::new(options.ocr.clone());
    extract_auto_with(source, &options, &ocr)
}

pub fn extract_auto_with(
    source: impl Into<StatementSource>,
    options: &ExtractOptions,
    ocr: &dyn OcrEngine,
) -> Result<StatementTable> {
    let bytes = source.into().into_bytes()?;
    validate_pdf(&bytes)?;
    let raw = read_text_layer(&bytes)?;
    let text = raw.iter().map(RawPage::plain_text).collect::<Vec<_>>().join("\n");

    let issuer = match detect_issuer(&text) {
        Some(issuer) => issuer,
        None if !raw.is_empty() && should_use_ocr_fallback(&text, options.min_page_chars) => {
            // Scanned statement: identify it from the first page image.
            ocr.check_available()?;
            let first = ocr.recognize_page(&bytes, 0)?;
            detect_issuer(&first).ok_or(ExtractError::UnknownIssuer)?
        }
        None => return Err(ExtractError::UnknownIssuer),
    };
    log::info!("PDF Import: detected issuer {}", issuer);

    let parser = issuer.parser();
    let acquired = assemble_pages(raw, &bytes, parser.profile(), options.min_page_chars, ocr)?;
    Ok(finish(parser.as_ref(), acquired))
}

/// Parse text that was already extracted; pages separated by form feeds.
pub fn parse_text(issuer: Issuer, content: &str) -> StatementTable {
    let pages: Vec<PageText> = content
        .split('\x0c')
        .enumerate()
        .map(|(index, text)| PageText::from_text(index, text, TextOrigin::TextLayer))
        .collect();
    issuer.parser().parse(&pages)
}
