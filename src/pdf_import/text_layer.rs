//! Page text acquisition.
//!
//! Reads the embedded text layer page by page, with glyph positions when
//! pdf-extract can provide them and plain text otherwise. Pages without a
//! usable text layer go through the OCR engine.

use super::layout::{lines_from_text, reconstruct_words, ColumnLayout, Line, PositionedWord};
use super::ocr::{should_use_ocr_fallback, OcrEngine};
use super::profile::IssuerProfile;
use crate::error::{ExtractError, Result};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// PDF magic bytes
const PDF_MAGIC: &[u8] = b"%PDF";
/// Maximum PDF file size (100 MB)
pub const MAX_PDF_SIZE: usize = 100 * 1024 * 1024;

/// Where the statement comes from. Consumed once.
#[derive(Debug, Clone)]
pub enum StatementSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl StatementSource {
    /// Drain an open handle.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::Bytes(bytes))
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => Ok(std::fs::read(path)?),
            Self::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<&Path> for StatementSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for StatementSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for StatementSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for StatementSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOrigin {
    TextLayer,
    Ocr,
}

/// Reconstructed lines of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub index: usize,
    pub lines: Vec<Line>,
    pub layout: Option<ColumnLayout>,
    pub origin: TextOrigin,
}

impl PageText {
    pub fn from_text(index: usize, text: &str, origin: TextOrigin) -> Self {
        Self {
            index,
            lines: lines_from_text(text),
            layout: None,
            origin,
        }
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Raw content of a page before reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPage {
    Words(Vec<PositionedWord>),
    Text(String),
}

impl RawPage {
    pub fn plain_text(&self) -> String {
        match self {
            Self::Words(words) => words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Pages plus non-fatal problems met while reading them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquiredPages {
    pub pages: Vec<PageText>,
    pub warnings: Vec<String>,
}

impl AcquiredPages {
    /// All page text, one page per form feed.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(PageText::text)
            .collect::<Vec<_>>()
            .join("\n\x0c")
    }
}

/// Reject anything that is not a PDF of sane size.
pub fn validate_pdf(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(ExtractError::InvalidPdf(
            "Archivo demasiado pequeño para ser un PDF".to_string(),
        ));
    }

    if bytes.len() > MAX_PDF_SIZE {
        return Err(ExtractError::InvalidPdf(format!(
            "PDF demasiado grande ({} MB). Máximo: {} MB",
            bytes.len() / (1024 * 1024),
            MAX_PDF_SIZE / (1024 * 1024)
        )));
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractError::InvalidPdf(
            "Archivo PDF inválido: falta el encabezado %PDF".to_string(),
        ));
    }

    Ok(())
}

struct PendingWord {
    text: String,
    x0: f64,
    x1: f64,
    baseline: f64,
    size: f64,
}

/// pdf-extract sink that keeps glyph positions, grouped into words.
#[derive(Default)]
struct WordCollector {
    pages: Vec<Vec<PositionedWord>>,
    page_height: f64,
    current: Option<PendingWord>,
}

impl WordCollector {
    fn flush_word(&mut self) {
        let Some(word) = self.current.take() else {
            return;
        };
        if word.text.trim().is_empty() {
            return;
        }
        let top = self.page_height - word.baseline - word.size;
        let bottom = self.page_height - word.baseline;
        if let Some(page) = self.pages.last_mut() {
            page.push(PositionedWord::new(word.text, word.x0, word.x1, top, bottom));
        }
    }
}

impl OutputDev for WordCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        self.page_height = media_box.ury - media_box.lly;
        self.pages.push(Vec::new());
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        self.flush_word();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> std::result::Result<(), OutputError> {
        let sx = font_size * trm.m11 + font_size * trm.m21;
        let sy = font_size * trm.m12 + font_size * trm.m22;
        let size = (sx * sy).abs().sqrt().max(1.0);
        let (x, baseline) = (trm.m31, trm.m32);

        if char.trim().is_empty() {
            self.flush_word();
            return Ok(());
        }

        let breaks = match &self.current {
            Some(word) => {
                (word.baseline - baseline).abs() > size * 0.5
                    || x > word.x1 + size * 0.25
                    || x + size < word.x0
            }
            None => false,
        };
        if breaks {
            self.flush_word();
        }

        let advance = width * size;
        match &mut self.current {
            Some(word) => {
                word.text.push_str(char);
                word.x1 = word.x1.max(x + advance);
            }
            None => {
                self.current = Some(PendingWord {
                    text: char.to_string(),
                    x0: x,
                    x1: x + advance,
                    baseline,
                    size,
                });
            }
        }
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        self.flush_word();
        Ok(())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "pánico en pdf-extract".to_string())
}

/// Positioned words per page.
pub fn extract_positioned_pages(bytes: &[u8]) -> Result<Vec<Vec<PositionedWord>>> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let doc = pdf_extract::Document::load_mem(bytes).map_err(|e| e.to_string())?;
        let mut collector = WordCollector::default();
        pdf_extract::output_doc(&doc, &mut collector).map_err(|e| e.to_string())?;
        Ok::<_, String>(collector.pages)
    }));
    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::PdfUnreadable(e)),
        Err(payload) => Err(ExtractError::PdfUnreadable(panic_message(payload))),
    }
}

/// Plain text per page.
pub fn extract_plain_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())
    }));
    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::PdfUnreadable(e)),
        Err(payload) => Err(ExtractError::PdfUnreadable(panic_message(payload))),
    }
}

/// Read the text layer, preferring glyph positions.
pub fn read_text_layer(bytes: &[u8]) -> Result<Vec<RawPage>> {
    match extract_positioned_pages(bytes) {
        Ok(pages) if !pages.is_empty() => {
            return Ok(pages.into_iter().map(RawPage::Words).collect());
        }
        Ok(_) => log::debug!("PDF Import: no pages with positioned text, trying plain text"),
        Err(e) => log::warn!("PDF Import: positioned extraction failed ({}), trying plain text", e),
    }
    let pages = extract_plain_pages(bytes)?;
    Ok(pages.into_iter().map(RawPage::Text).collect())
}

/// Turn raw pages into lines, running OCR on pages without text.
///
/// If every page needs OCR, OCR problems are returned as errors. Otherwise
/// the affected pages are skipped with a warning.
pub fn assemble_pages(
    raw: Vec<RawPage>,
    pdf: &[u8],
    profile: &IssuerProfile,
    min_page_chars: usize,
    ocr: &dyn OcrEngine,
) -> Result<AcquiredPages> {
    let needs_ocr: Vec<bool> = raw
        .iter()
        .map(|page| should_use_ocr_fallback(&page.plain_text(), min_page_chars))
        .collect();
    let ocr_count = needs_ocr.iter().filter(|n| **n).count();
    let all_need_ocr = !raw.is_empty() && ocr_count == raw.len();

    let mut acquired = AcquiredPages::default();
    let mut ocr_ready = false;
    if ocr_count > 0 {
        log::info!("PDF Import: {} of {} pages have no text layer", ocr_count, raw.len());
        match ocr.check_available() {
            Ok(()) => ocr_ready = true,
            Err(e) if all_need_ocr => return Err(e),
            Err(e) => {
                log::warn!("OCR: {}", e);
                acquired.warnings.push(e.to_string());
            }
        }
    }

    let mut inherited: Option<ColumnLayout> = None;
    for (index, (page, needs)) in raw.into_iter().zip(needs_ocr).enumerate() {
        if needs {
            if !ocr_ready {
                acquired
                    .warnings
                    .push(format!("Página {} sin texto; se omitió", index + 1));
                acquired.pages.push(PageText::from_text(index, "", TextOrigin::Ocr));
                continue;
            }
            match ocr.recognize_page(pdf, index) {
                Ok(text) => {
                    log::info!("OCR: page {} recognized ({} chars)", index + 1, text.len());
                    acquired.pages.push(PageText::from_text(index, &text, TextOrigin::Ocr));
                }
                Err(e) if all_need_ocr => return Err(e),
                Err(e) => {
                    log::warn!("OCR: page {} skipped: {}", index + 1, e);
                    acquired
                        .warnings
                        .push(format!("Página {}: {}", index + 1, e));
                    acquired.pages.push(PageText::from_text(index, "", TextOrigin::Ocr));
                }
            }
            continue;
        }

        let page = match page {
            RawPage::Words(words) => {
                let (lines, layout) =
                    reconstruct_words(&words, profile.columns, inherited.as_ref(), profile.locale);
                if layout.is_some() {
                    inherited = layout.clone();
                }
                PageText {
                    index,
                    lines,
                    layout,
                    origin: TextOrigin::TextLayer,
                }
            }
            RawPage::Text(text) => PageText::from_text(index, &text, TextOrigin::TextLayer),
        };
        log::debug!("PDF Import: page {} has {} lines", index + 1, page.lines.len());
        acquired.pages.push(page);
    }
    Ok(acquired)
}

/// Validate, read and reconstruct every page of a PDF.
pub fn acquire_pages(
    bytes: &[u8],
    profile: &IssuerProfile,
    min_page_chars: usize,
    ocr: &dyn OcrEngine,
) -> Result<AcquiredPages> {
    validate_pdf(bytes)?;
    let raw = read_text_layer(bytes)?;
    log::info!("PDF Import: {} pages in document", raw.len());
    assemble_pages(raw, bytes, profile, min_page_chars, ocr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_import::layout::ColumnRole;
    use crate::pdf_import::layout::ColumnStrategy;
    use crate::pdf_import::profile::fixtures::LEDGER;
    use std::cell::Cell;

    struct MissingOcr;

    impl OcrEngine for MissingOcr {
        fn check_available(&self) -> Result<()> {
            Err(ExtractError::ocr_unavailable(["poppler-utils (pdftoppm)", "tesseract"]))
        }

        fn recognize_page(&self, _pdf: &[u8], _page_index: usize) -> Result<String> {
            Err(ExtractError::OcrFailed("no disponible".to_string()))
        }
    }

    struct FixedOcr {
        calls: Cell<usize>,
    }

    impl OcrEngine for FixedOcr {
        fn check_available(&self) -> Result<()> {
            Ok(())
        }

        fn recognize_page(&self, _pdf: &[u8], page_index: usize) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("0{}/03/24 DEPOSITO 100.00 200.00", page_index + 1))
        }
    }

    #[test]
    fn test_validate_pdf() {
        assert!(validate_pdf(b"%PDF-1.7\n%...").is_ok());
        assert!(matches!(validate_pdf(b"%PDF"), Err(ExtractError::InvalidPdf(_))));
        assert!(matches!(validate_pdf(b"GIF89a......"), Err(ExtractError::InvalidPdf(_))));
    }

    #[test]
    fn test_source_conversions() {
        let source = StatementSource::from(&b"%PDF-1.4"[..]);
        assert_eq!(source.into_bytes().unwrap(), b"%PDF-1.4".to_vec());
        let source = StatementSource::from_reader(std::io::Cursor::new(vec![1u8, 2, 3])).unwrap();
        assert_eq!(source.into_bytes().unwrap(), vec![1, 2, 3]);
        let missing = StatementSource::from(PathBuf::from("/no/existe/estado.pdf"));
        assert!(matches!(missing.into_bytes(), Err(ExtractError::Io(_))));
    }

    #[test]
    fn test_empty_text_layer_without_ocr_is_an_error() {
        let raw = vec![RawPage::Text(String::new()), RawPage::Text("  \n ".to_string())];
        let err = assemble_pages(raw, b"%PDF-1.4", &LEDGER, 10, &MissingOcr).unwrap_err();
        assert!(err.is_ocr_unavailable());
        assert!(err.to_string().contains("tesseract"));
    }

    #[test]
    fn test_partial_text_layer_skips_pages_without_ocr() {
        let raw = vec![
            RawPage::Text("01/03/24 DEPOSITO SPEI 1,000.00 5,000.00".to_string()),
            RawPage::Text(String::new()),
        ];
        let acquired = assemble_pages(raw, b"%PDF-1.4", &LEDGER, 10, &MissingOcr).unwrap();
        assert_eq!(acquired.pages.len(), 2);
        assert_eq!(acquired.pages[0].lines.len(), 1);
        assert!(acquired.pages[1].is_empty());
        assert_eq!(acquired.warnings.len(), 2);
    }

    #[test]
    fn test_ocr_pages_are_recognized() {
        let ocr = FixedOcr { calls: Cell::new(0) };
        let raw = vec![RawPage::Text(String::new()), RawPage::Text(String::new())];
        let acquired = assemble_pages(raw, b"%PDF-1.4", &LEDGER, 10, &ocr).unwrap();
        assert_eq!(ocr.calls.get(), 2);
        assert_eq!(acquired.pages[1].origin, TextOrigin::Ocr);
        assert_eq!(acquired.pages[1].lines[0].text, "02/03/24 DEPOSITO 100.00 200.00");
        assert!(acquired.warnings.is_empty());
    }

    #[test]
    fn test_layout_is_inherited_across_pages() {
        let profile = IssuerProfile {
            columns: ColumnStrategy::HeaderPositions,
            ..LEDGER
        };
        let word = |text: &str, x0: f64, top: f64| {
            PositionedWord::new(text, x0, x0 + 30.0, top, top + 8.0)
        };
        let first = vec![
            word("FECHA", 20.0, 50.0),
            word("CONCEPTO", 80.0, 50.0),
            word("CARGOS", 300.0, 50.0),
            word("ABONOS", 380.0, 50.0),
            word("SALDO", 460.0, 50.0),
            word("01/03/24", 20.0, 70.0),
            word("DEPOSITO", 80.0, 70.0),
            word("500.00", 380.0, 70.0),
        ];
        let second = vec![word("02/03/24", 20.0, 50.0), word("RETIRO", 80.0, 50.0), word("80.00", 300.0, 50.0)];
        let raw = vec![RawPage::Words(first), RawPage::Words(second)];
        let acquired = assemble_pages(raw, b"%PDF-1.4", &profile, 10, &MissingOcr).unwrap();
        assert!(acquired.pages[0].layout.is_some());
        assert_eq!(acquired.pages[1].layout, acquired.pages[0].layout);
        assert_eq!(acquired.pages[1].lines[0].amount_roles, vec![Some(ColumnRole::Charge)]);
    }
}
