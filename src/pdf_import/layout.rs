//! Line and row reconstruction.
//!
//! Turns positioned words (or plain text) into ordered logical lines. When
//! a table header is found on a page, its x-centers become a
//! [`ColumnLayout`] that tags every amount token with the column it sits
//! under, so single-amount rows can be told apart as charge or credit.

use super::normalize::{fold_text, normalize_spaces, AmountLocale};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Max vertical delta (pt) between words of the same line.
pub const LINE_TOLERANCE: f64 = 2.5;
/// Min horizontal gap (pt) that separates two cells.
pub const COLUMN_GAP: f64 = 20.0;

static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:PAGINA|PAG\.|HOJA|PAGE)\s*:?\s*\d+(?:\s*(?:DE|/|OF)\s*\d+)?\b").unwrap()
});
static RE_BARE_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}(?:\s*/\s*\d{1,3})?$").unwrap());

/// Boilerplate printed by every Mexican bank (fiscal stamps, regulator notices).
const COMMON_BOILERPLATE: &[&str] = &[
    "CONDUSEF",
    "UNIDAD ESPECIALIZADA",
    "REPRESENTACION IMPRESA",
    "TIMBRE FISCAL",
    "SELLO DIGITAL",
    "CADENA ORIGINAL",
    "FOLIO FISCAL",
    "CERTIFICADO DEL SAT",
    "LADA SIN COSTO",
    "WWW.",
    "HTTP",
];

/// Word bounding box on a page, y growing downwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedWord {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PositionedWord {
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, top: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn center(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Date,
    Description,
    Charge,
    Credit,
    Balance,
}

impl ColumnRole {
    pub fn is_amount(self) -> bool {
        matches!(self, Self::Charge | Self::Credit | Self::Balance)
    }
}

/// How an issuer's amount columns are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnStrategy {
    /// Calibrate from header x-positions when coordinates are available.
    HeaderPositions,
    /// Count-based and balance-delta rules only.
    #[default]
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Amount,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub kind: CellKind,
}

impl Cell {
    pub fn center(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

/// Header x-centers of a page's columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    columns: Vec<(ColumnRole, f64)>,
}

impl ColumnLayout {
    pub fn new(columns: Vec<(ColumnRole, f64)>) -> Self {
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn center(&self, role: ColumnRole) -> Option<f64> {
        self.columns
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, x)| *x)
    }

    /// Amount column whose header is nearest to `x`.
    pub fn nearest_amount_role(&self, x: f64) -> Option<ColumnRole> {
        self.columns
            .iter()
            .filter(|(role, _)| role.is_amount())
            .min_by(|a, b| (a.1 - x).abs().total_cmp(&(b.1 - x).abs()))
            .map(|(role, _)| *role)
    }

    /// Usable for disambiguation only with both movement columns present.
    pub fn has_movement_columns(&self) -> bool {
        self.center(ColumnRole::Charge).is_some() && self.center(ColumnRole::Credit).is_some()
    }
}

/// One logical line of a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    /// Column of each amount token in `text`, in order; empty without coordinates.
    pub amount_roles: Vec<Option<ColumnRole>>,
    pub cells: Vec<Cell>,
}

impl Line {
    pub fn plain(text: &str) -> Self {
        Self {
            text: normalize_spaces(text),
            ..Self::default()
        }
    }
}

/// Issuer-specific header/footer vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boilerplate {
    /// Lines containing any of these (folded) are dropped.
    pub contains: &'static [&'static str],
    /// Lines starting with any of these (folded) are dropped.
    pub prefixes: &'static [&'static str],
}

impl Boilerplate {
    pub fn is_boilerplate(&self, line: &str) -> bool {
        let folded = fold_text(line.trim());
        if folded.is_empty() {
            return true;
        }
        if RE_PAGE_NUMBER.is_match(&folded) || RE_BARE_PAGE.is_match(&folded) {
            return true;
        }
        COMMON_BOILERPLATE
            .iter()
            .chain(self.contains.iter())
            .any(|token| folded.contains(token))
            || self.prefixes.iter().any(|prefix| folded.starts_with(prefix))
    }
}

/// Column role announced by a header word.
pub fn header_role(word: &str) -> Option<ColumnRole> {
    let folded = fold_text(word.trim_matches(|c: char| !c.is_alphanumeric()));
    let role = match folded.as_str() {
        "FECHA" | "DIA" | "OPER" | "LIQ" | "DATE" => ColumnRole::Date,
        "DESCRIPCION" | "CONCEPTO" | "DETALLE" | "DESCRIPTION" => ColumnRole::Description,
        "CARGOS" | "CARGO" | "RETIROS" | "RETIRO" | "DEBITOS" | "CHARGES" | "DEBITS"
        | "WITHDRAWALS" => ColumnRole::Charge,
        "ABONOS" | "ABONO" | "DEPOSITOS" | "DEPOSITO" | "CREDITOS" | "CREDITS" | "DEPOSITS"
        | "PAYMENTS" => ColumnRole::Credit,
        "SALDO" | "BALANCE" | "OPERACION" | "LIQUIDACION" => ColumnRole::Balance,
        _ => return None,
    };
    Some(role)
}

/// Table header row: mostly header words spanning at least two roles, no amounts.
pub fn is_table_header(text: &str, locale: AmountLocale) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || words.iter().any(|w| locale.is_amount(w)) {
        return false;
    }
    let roles: Vec<ColumnRole> = words.iter().filter_map(|w| header_role(w)).collect();
    let mut distinct = roles.clone();
    distinct.sort_by_key(|r| *r as u8);
    distinct.dedup();
    distinct.len() >= 3 || (distinct.len() >= 2 && roles.len() * 2 >= words.len())
}

/// Group words into lines by vertical position, each line sorted left to right.
pub fn group_lines(words: &[PositionedWord], tolerance: f64) -> Vec<Vec<PositionedWord>> {
    let mut sorted: Vec<PositionedWord> = words
        .iter()
        .filter(|w| !w.text.trim().is_empty())
        .cloned()
        .collect();
    sorted.sort_by(|a, b| {
        a.top
            .round()
            .total_cmp(&b.top.round())
            .then(a.x0.total_cmp(&b.x0))
    });

    let mut lines: Vec<Vec<PositionedWord>> = Vec::new();
    let mut line_top = f64::NEG_INFINITY;
    for word in sorted {
        match lines.last_mut() {
            Some(line) if (word.top - line_top).abs() <= tolerance => line.push(word),
            _ => {
                line_top = word.top;
                lines.push(vec![word]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    lines
}

/// Merge a line's words into cells; a gap wider than `gap` starts a new cell.
pub fn merge_cells(words: &[PositionedWord], gap: f64, locale: AmountLocale) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for word in words {
        match cells.last_mut() {
            Some(cell) if word.x0 - cell.x1 <= gap => {
                cell.text.push(' ');
                cell.text.push_str(word.text.trim());
                cell.x1 = cell.x1.max(word.x1);
            }
            _ => cells.push(Cell {
                text: word.text.trim().to_string(),
                x0: word.x0,
                x1: word.x1,
                kind: CellKind::Text,
            }),
        }
    }
    for cell in &mut cells {
        if locale.is_amount(&cell.text) {
            cell.kind = CellKind::Amount;
        }
    }
    cells
}

/// Calibrate column centers from the first header row found in `lines`.
pub fn detect_header_layout(lines: &[Vec<PositionedWord>], locale: AmountLocale) -> Option<ColumnLayout> {
    for line in lines {
        let text = line.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
        if !is_table_header(&text, locale) {
            continue;
        }
        let columns: Vec<(ColumnRole, f64)> = line
            .iter()
            .filter_map(|w| header_role(&w.text).map(|role| (role, w.center())))
            .collect();
        let layout = ColumnLayout::new(columns);
        if layout.has_movement_columns() {
            log::debug!("Layout: header calibrated from '{}'", text);
            return Some(layout);
        }
    }
    None
}

/// Build a [`Line`] from one row of words, tagging amounts by column.
pub fn build_line(
    words: &[PositionedWord],
    layout: Option<&ColumnLayout>,
    locale: AmountLocale,
) -> Line {
    let cells = merge_cells(words, COLUMN_GAP, locale);
    let text = normalize_spaces(
        &cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    );
    let amount_roles = match layout {
        Some(layout) => words
            .iter()
            .filter(|w| locale.is_amount(&w.text))
            .map(|w| layout.nearest_amount_role(w.center()))
            .collect(),
        None => Vec::new(),
    };
    Line {
        text,
        amount_roles,
        cells,
    }
}

/// Reconstruct a page from positioned words.
///
/// Returns the lines and the layout that was applied (detected on this
/// page, or `inherited` from an earlier one).
pub fn reconstruct_words(
    words: &[PositionedWord],
    strategy: ColumnStrategy,
    inherited: Option<&ColumnLayout>,
    locale: AmountLocale,
) -> (Vec<Line>, Option<ColumnLayout>) {
    let rows = group_lines(words, LINE_TOLERANCE);
    let layout = match strategy {
        ColumnStrategy::HeaderPositions => {
            detect_header_layout(&rows, locale).or_else(|| inherited.cloned())
        }
        ColumnStrategy::Heuristic => None,
    };
    let lines = rows
        .iter()
        .map(|row| build_line(row, layout.as_ref(), locale))
        .filter(|line| !line.text.is_empty())
        .collect();
    (lines, layout)
}

/// Lines of a plain text page.
pub fn lines_from_text(text: &str) -> Vec<Line> {
    text.lines()
        .map(Line::plain)
        .filter(|line| !line.text.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f64, top: f64) -> PositionedWord {
        let width = text.len() as f64 * 5.0;
        PositionedWord::new(text, x0, x0 + width, top, top + 8.0)
    }

    #[test]
    fn test_group_lines_by_vertical_position() {
        let words = vec![
            word("SALDO", 300.0, 100.4),
            word("01/03/24", 20.0, 100.0),
            word("COMISION", 20.0, 112.0),
            word("DEPOSITO", 80.0, 101.2),
        ];
        let lines = group_lines(&words, LINE_TOLERANCE);
        assert_eq!(lines.len(), 2);
        let first: Vec<&str> = lines[0].iter().map(|w| w.text.as_str()).collect();
        assert_eq!(first, vec!["01/03/24", "DEPOSITO", "SALDO"]);
        assert_eq!(lines[1][0].text, "COMISION");
    }

    #[test]
    fn test_merge_cells_splits_on_wide_gaps() {
        let words = vec![
            word("PAGO", 20.0, 0.0),
            word("TARJETA", 45.0, 0.0),
            word("1,000.00", 300.0, 0.0),
        ];
        let cells = merge_cells(&words, COLUMN_GAP, AmountLocale::DotDecimal);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].text, "PAGO TARJETA");
        assert_eq!(cells[0].kind, CellKind::Text);
        assert_eq!(cells[1].kind, CellKind::Amount);
    }

    #[test]
    fn test_header_layout_tags_single_amount_rows() {
        let words = vec![
            word("FECHA", 20.0, 50.0),
            word("CONCEPTO", 80.0, 50.0),
            word("CARGOS", 300.0, 50.0),
            word("ABONOS", 380.0, 50.0),
            word("SALDO", 460.0, 50.0),
            word("02/03/24", 20.0, 70.0),
            word("DEPOSITO", 80.0, 70.0),
            word("500.00", 380.0, 70.0),
            word("03/03/24", 20.0, 90.0),
            word("RETIRO", 80.0, 90.0),
            word("200.00", 300.0, 90.0),
        ];
        let (lines, layout) = reconstruct_words(
            &words,
            ColumnStrategy::HeaderPositions,
            None,
            AmountLocale::DotDecimal,
        );
        assert!(layout.is_some());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "02/03/24 DEPOSITO 500.00");
        assert_eq!(lines[1].amount_roles, vec![Some(ColumnRole::Credit)]);
        assert_eq!(lines[2].amount_roles, vec![Some(ColumnRole::Charge)]);
    }

    #[test]
    fn test_heuristic_strategy_ignores_headers() {
        let words = vec![
            word("CARGOS", 300.0, 50.0),
            word("ABONOS", 380.0, 50.0),
            word("SALDO", 460.0, 50.0),
            word("500.00", 380.0, 70.0),
        ];
        let (lines, layout) =
            reconstruct_words(&words, ColumnStrategy::Heuristic, None, AmountLocale::DotDecimal);
        assert!(layout.is_none());
        assert!(lines[1].amount_roles.is_empty());
    }

    #[test]
    fn test_inherited_layout_applies_to_later_pages() {
        let layout = ColumnLayout::new(vec![
            (ColumnRole::Charge, 300.0),
            (ColumnRole::Credit, 400.0),
        ]);
        let words = vec![word("04/03/24", 20.0, 10.0), word("75.00", 395.0, 10.0)];
        let (lines, applied) = reconstruct_words(
            &words,
            ColumnStrategy::HeaderPositions,
            Some(&layout),
            AmountLocale::DotDecimal,
        );
        assert_eq!(applied, Some(layout));
        assert_eq!(lines[0].amount_roles, vec![Some(ColumnRole::Credit)]);
    }

    #[test]
    fn test_boilerplate_filter() {
        let filter = Boilerplate {
            contains: &["BBVA MEXICO, S.A."],
            prefixes: &["NO. DE CLIENTE"],
        };
        assert!(filter.is_boilerplate("PAGINA 3"));
        assert!(filter.is_boilerplate("Página 2 de 7"));
        assert!(filter.is_boilerplate("  12 "));
        assert!(filter.is_boilerplate("BBVA México, S.A. Institución de Banca Múltiple"));
        assert!(filter.is_boilerplate("No. de Cliente 12345"));
        assert!(filter.is_boilerplate("Quejas: CONDUSEF 55 5340 0999"));
        assert!(!filter.is_boilerplate("01/03/24 DEPOSITO SPEI 1,000.00"));
    }

    #[test]
    fn test_is_table_header() {
        let locale = AmountLocale::DotDecimal;
        assert!(is_table_header("FECHA CONCEPTO CARGOS ABONOS SALDO", locale));
        assert!(is_table_header("Fecha Descripción Retiros Depósitos", locale));
        assert!(!is_table_header("DEPOSITO EN EFECTIVO", locale));
        assert!(!is_table_header("SALDO ANTERIOR 1,000.00", locale));
    }

    #[test]
    fn test_lines_from_text() {
        let lines = lines_from_text("  uno   dos \n\n tres ");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "uno dos");
        assert!(lines[0].amount_roles.is_empty());
    }
}
