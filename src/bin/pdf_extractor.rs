//! Command line front end for the statement extractor.
//!
//! Usage: pdf_extractor <issuer|auto> <path_to_pdf>
//! Output: the statement table as JSON on stdout, errors on stderr
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments
//!   2 - PDF read error
//!   3 - PDF extraction error
//!   4 - PDF validation failed
//!   5 - OCR tooling not installed

use anyhow::Context;
use estado_cuenta::{extract, extract_auto, supported_issuers, ExtractError, Issuer, StatementTable};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

fn usage() {
    let ids: Vec<String> = supported_issuers().into_iter().map(|i| i.id).collect();
    eprintln!("Usage: pdf_extractor <issuer|auto> <path_to_pdf>");
    eprintln!("Issuers: {}", ids.join(", "));
}

fn exit_code(err: &ExtractError) -> u8 {
    match err {
        ExtractError::Io(_) => 2,
        ExtractError::InvalidPdf(_) => 4,
        ExtractError::OcrUnavailable { .. } => 5,
        ExtractError::PdfUnreadable(_) | ExtractError::OcrFailed(_) | ExtractError::UnknownIssuer => 3,
    }
}

fn write_json(table: &StatementTable) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, table).context("serializing statement table")?;
    writeln!(handle).context("writing to stdout")?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        usage();
        return ExitCode::from(1);
    }

    let issuer = match args[1].as_str() {
        "auto" => None,
        id => match id.parse::<Issuer>() {
            Ok(issuer) => Some(issuer),
            Err(e) => {
                eprintln!("USAGE_ERROR:{} ({})", e, id);
                usage();
                return ExitCode::from(1);
            }
        },
    };
    let pdf_path = &args[2];

    let bytes = match fs::read(pdf_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("READ_ERROR:{}", e);
            return ExitCode::from(2);
        }
    };

    let result = match issuer {
        Some(issuer) => extract(bytes, issuer),
        None => extract_auto(bytes),
    };

    match result {
        Ok(table) => {
            for warning in &table.warnings {
                log::warn!("{}: {}", pdf_path, warning);
            }
            log::info!(
                "{}: {} movimientos de {}",
                pdf_path,
                table.transactions.len(),
                table.bank
            );
            if let Err(e) = write_json(&table) {
                eprintln!("WRITE_ERROR:{:#}", e);
                return ExitCode::from(3);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = exit_code(&e);
            let tag = match code {
                4 => "VALIDATE_ERROR",
                5 => "OCR_UNAVAILABLE",
                _ => "EXTRACT_ERROR",
            };
            eprintln!("{}:{}", tag, e);
            ExitCode::from(code)
        }
    }
}
