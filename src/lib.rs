//! Extraction engine for Mexican bank and card statement PDFs.
//!
//! A statement goes through text acquisition (text layer, OCR for scanned
//! pages), layout reconstruction, record segmentation and amount
//! classification, and comes out as a [`StatementTable`] with the columns
//! Fecha, Referencia, Concepto, Cargo, Abono and Saldo plus per-issuer
//! extras.
//!
//! ```no_run
//! use estado_cuenta::{extract, Issuer};
//!
//! let table = extract(std::path::Path::new("estado.pdf"), Issuer::Bbva)?;
//! for tx in &table.transactions {
//!     println!("{} {} {:.2} {:.2}", tx.date, tx.concept, tx.charge, tx.credit);
//! }
//! # Ok::<(), estado_cuenta::ExtractError>(())
//! ```

pub mod error;
pub mod pdf_import;

pub use error::{ExtractError, Result};
pub use pdf_import::{
    detect_issuer, extract, extract_auto, extract_auto_with, extract_with, parse_text,
    supported_issuers, ExtractOptions, Issuer, StatementSource, StatementTable, SupportedIssuer,
    Transaction,
};
