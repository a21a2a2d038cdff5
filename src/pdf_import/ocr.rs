//! Tesseract-based OCR for pages without a text layer.
//!
//! A page is rasterized with pdftoppm (poppler-utils), cleaned up with the
//! `image` crate and handed to the tesseract binary.

use crate::error::{ExtractError, Result};
use image::imageops;
use image::{GrayImage, Luma};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const DEFAULT_TESSERACT_CMD: &str = "tesseract";
const DEFAULT_PDFTOPPM_CMD: &str = "pdftoppm";
const DEFAULT_LANG: &str = "spa+eng";
const DEFAULT_CONFIG: &str = "--psm 6";
const DEFAULT_THRESHOLD: u8 = 150;
const DEFAULT_DPI: u32 = 300;

/// Letters OCR commonly reads instead of digits.
static DIGIT_CONFUSABLES: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [('O', '0'), ('o', '0'), ('I', '1'), ('l', '1'), ('S', '5'), ('B', '8')]
        .into_iter()
        .collect()
});

/// OCR tuning, usually read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSettings {
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    pub lang: String,
    pub config: Vec<String>,
    pub threshold: u8,
    pub dpi: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_cmd: DEFAULT_TESSERACT_CMD.to_string(),
            pdftoppm_cmd: DEFAULT_PDFTOPPM_CMD.to_string(),
            lang: DEFAULT_LANG.to_string(),
            config: DEFAULT_CONFIG.split_whitespace().map(String::from).collect(),
            threshold: DEFAULT_THRESHOLD,
            dpi: DEFAULT_DPI,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("OCR: ignoring invalid {}='{}'", key, value);
                default
            }
        },
        None => default,
    }
}

impl OcrSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            tesseract_cmd: text("TESSERACT_CMD", DEFAULT_TESSERACT_CMD),
            pdftoppm_cmd: text("PDFTOPPM_CMD", DEFAULT_PDFTOPPM_CMD),
            lang: text("TESSERACT_LANG", DEFAULT_LANG),
            config: text("TESSERACT_CONFIG", DEFAULT_CONFIG)
                .split_whitespace()
                .map(String::from)
                .collect(),
            threshold: parse_or("OCR_THRESHOLD", lookup("OCR_THRESHOLD"), DEFAULT_THRESHOLD),
            dpi: parse_or("OCR_DPI", lookup("OCR_DPI"), DEFAULT_DPI),
        }
    }
}

/// Something that can turn a PDF page into text.
pub trait OcrEngine {
    /// Fails with [`ExtractError::OcrUnavailable`] naming what is missing.
    fn check_available(&self) -> Result<()>;

    /// Recognize page `page_index` (0-based) of `pdf`.
    fn recognize_page(&self, pdf: &[u8], page_index: usize) -> Result<String>;
}

/// Check if text extraction yielded too little content
/// Returns true if OCR fallback should be used
pub fn should_use_ocr_fallback(extracted_text: &str, min_chars: usize) -> bool {
    let cleaned: String = extracted_text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{0}')
        .collect();

    cleaned.chars().count() < min_chars
}

fn command_available(cmd: &str, version_arg: &str) -> bool {
    // pdftoppm -v exits non-zero on some poppler builds, so only spawning counts
    Command::new(cmd).arg(version_arg).output().is_ok()
}

/// OCR through the pdftoppm and tesseract binaries.
#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    settings: OcrSettings,
}

impl TesseractOcr {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    fn rasterize(&self, pdf_path: &Path, page_index: usize, out_dir: &Path) -> Result<PathBuf> {
        let page = (page_index + 1).to_string();
        let prefix = out_dir.join("pagina");
        let output = Command::new(&self.settings.pdftoppm_cmd)
            .arg("-r")
            .arg(self.settings.dpi.to_string())
            .args(["-f", page.as_str(), "-l", page.as_str(), "-gray", "-png"])
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| ExtractError::OcrFailed(format!("pdftoppm no se pudo ejecutar: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::OcrFailed(format!(
                "conversión de la página {} falló: {}",
                page_index + 1,
                stderr.trim()
            )));
        }

        let mut images: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "png").unwrap_or(false))
            .collect();
        images.sort();
        images
            .into_iter()
            .next()
            .ok_or_else(|| ExtractError::OcrFailed("pdftoppm no generó imágenes".to_string()))
    }

    /// Rotation (degrees clockwise) reported by tesseract's orientation detection.
    fn detect_rotation(&self, image_path: &Path) -> Option<u32> {
        let output = Command::new(&self.settings.tesseract_cmd)
            .arg(image_path)
            .arg("stdout")
            .args(["--psm", "0"])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_osd_rotation(&String::from_utf8_lossy(&output.stdout))
    }

    fn run_tesseract(&self, image_path: &Path, with_lang: bool) -> std::result::Result<String, String> {
        let mut command = Command::new(&self.settings.tesseract_cmd);
        command.arg(image_path).arg("stdout");
        if with_lang {
            command.args(["-l", self.settings.lang.as_str()]);
        }
        command.args(&self.settings.config);
        let output = command.output().map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn check_available(&self) -> Result<()> {
        let mut missing = Vec::new();
        if !command_available(&self.settings.pdftoppm_cmd, "-v") {
            missing.push("poppler-utils (pdftoppm)".to_string());
        }
        if !command_available(&self.settings.tesseract_cmd, "--version") {
            missing.push("tesseract".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExtractError::ocr_unavailable(missing))
        }
    }

    fn recognize_page(&self, pdf: &[u8], page_index: usize) -> Result<String> {
        let temp_dir = TempDir::new()?;
        let pdf_path = temp_dir.path().join("estado.pdf");
        std::fs::write(&pdf_path, pdf)?;

        let raster = self.rasterize(&pdf_path, page_index, temp_dir.path())?;
        let image = image::open(&raster)
            .map_err(|e| ExtractError::OcrFailed(format!("imagen ilegible: {}", e)))?;
        let mut cleaned = preprocess(&image.to_luma8(), self.settings.threshold);

        let prepared = temp_dir.path().join("preparada.png");
        save_png(&cleaned, &prepared)?;
        if let Some(rotation) = self.detect_rotation(&prepared) {
            if rotation != 0 {
                log::debug!("OCR: page {} rotated {} degrees", page_index + 1, rotation);
                cleaned = rotate(&cleaned, rotation);
                save_png(&cleaned, &prepared)?;
            }
        }

        let text = match self.run_tesseract(&prepared, true) {
            Ok(text) => text,
            Err(first) => {
                log::warn!(
                    "OCR: tesseract failed with -l {} ({}), retrying without language",
                    self.settings.lang,
                    first
                );
                self.run_tesseract(&prepared, false).map_err(|second| {
                    ExtractError::OcrFailed(format!("página {}: {}", page_index + 1, second))
                })?
            }
        };
        Ok(remap_digit_confusables(&text))
    }
}

fn save_png(image: &GrayImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .map_err(|e| ExtractError::OcrFailed(format!("no se pudo guardar la imagen: {}", e)))
}

fn parse_osd_rotation(osd: &str) -> Option<u32> {
    osd.lines()
        .find_map(|line| line.trim().strip_prefix("Rotate:"))
        .and_then(|value| value.trim().parse().ok())
        .filter(|degrees| matches!(degrees, 0 | 90 | 180 | 270))
}

fn rotate(image: &GrayImage, degrees: u32) -> GrayImage {
    match degrees {
        90 => imageops::rotate90(image),
        180 => imageops::rotate180(image),
        270 => imageops::rotate270(image),
        _ => image.clone(),
    }
}

/// Stretch the histogram so the darkest pixel is 0 and the lightest 255.
pub fn autocontrast(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return image.clone();
    }
    let range = (max - min) as f32;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y)[0];
        Luma([(((v - min) as f32 / range) * 255.0).round() as u8])
    })
}

/// 3x3 median filter; edge pixels use the available neighbours.
pub fn median3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut window = Vec::with_capacity(9);
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                window.push(image.get_pixel(nx, ny)[0]);
            }
        }
        window.sort_unstable();
        Luma([window[window.len() / 2]])
    })
}

pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] >= threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Grayscale page cleanup before recognition.
pub fn preprocess(image: &GrayImage, threshold: u8) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let stretched = autocontrast(image);
    let denoised = median3(&stretched);
    let sharpened = imageops::unsharpen(&denoised, 1.0, 2);
    binarize(&sharpened, threshold)
}

fn is_numeric_like(token: &str) -> bool {
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    let confusables = token
        .chars()
        .filter(|c| DIGIT_CONFUSABLES.contains_key(c))
        .count();
    digits > 0
        && confusables < digits
        && token.chars().all(|c| {
            c.is_ascii_digit() || DIGIT_CONFUSABLES.contains_key(&c) || matches!(c, '.' | ',' | '$' | '(' | ')' | '-' | '/')
        })
}

/// Replace letters misread for digits inside number-like tokens.
pub fn remap_digit_confusables(text: &str) -> String {
    text.lines()
        .map(|line| {
            line.split(' ')
                .map(|token| {
                    if is_numeric_like(token) {
                        token
                            .chars()
                            .map(|c| DIGIT_CONFUSABLES.get(&c).copied().unwrap_or(c))
                            .collect()
                    } else {
                        token.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_ocr_fallback() {
        assert!(should_use_ocr_fallback("", 10));
        assert!(should_use_ocr_fallback("   \n\n\t  ", 10));
        assert!(should_use_ocr_fallback("ABC", 10));
        assert!(!should_use_ocr_fallback("A".repeat(10).as_str(), 10));
        assert!(should_use_ocr_fallback("A".repeat(9).as_str(), 10));
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = OcrSettings::from_lookup(|key| match key {
            "TESSERACT_LANG" => Some("spa".to_string()),
            "TESSERACT_CONFIG" => Some("--psm 4 --oem 1".to_string()),
            "OCR_THRESHOLD" => Some("170".to_string()),
            "OCR_DPI" => Some("muchos".to_string()),
            _ => None,
        });
        assert_eq!(settings.lang, "spa");
        assert_eq!(settings.config, vec!["--psm", "4", "--oem", "1"]);
        assert_eq!(settings.threshold, 170);
        assert_eq!(settings.dpi, DEFAULT_DPI);
        assert_eq!(settings.tesseract_cmd, "tesseract");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = OcrSettings::from_lookup(|_| None);
        assert_eq!(settings, OcrSettings::default());
        assert_eq!(settings.config, vec!["--psm", "6"]);
        assert_eq!(settings.threshold, 150);
    }

    #[test]
    fn test_missing_binaries_are_named() {
        let ocr = TesseractOcr::new(OcrSettings {
            tesseract_cmd: "/nonexistent/tesseract-x".to_string(),
            pdftoppm_cmd: "/nonexistent/pdftoppm-x".to_string(),
            ..OcrSettings::default()
        });
        let err = ocr.check_available().unwrap_err();
        let msg = err.to_string();
        assert!(err.is_ocr_unavailable());
        assert!(msg.contains("pdftoppm"));
        assert!(msg.contains("tesseract"));
    }

    #[test]
    fn test_remap_digit_confusables() {
        assert_eq!(remap_digit_confusables("SALDO 1,O00.5O"), "SALDO 1,000.50");
        assert_eq!(remap_digit_confusables("0l/03/24 DEPOSITO"), "01/03/24 DEPOSITO");
        assert_eq!(remap_digit_confusables("SOBRE BOLSA"), "SOBRE BOLSA");
        assert_eq!(remap_digit_confusables("ABONO 25O.00\nl5.00"), "ABONO 250.00\n15.00");
    }

    #[test]
    fn test_preprocess_binarizes() {
        let image = GrayImage::from_fn(12, 12, |x, _| Luma([(60 + x * 10) as u8]));
        let out = preprocess(&image, 128);
        assert_eq!(out.dimensions(), (12, 12));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(0, 6)[0], 0);
        assert_eq!(out.get_pixel(11, 6)[0], 255);
    }

    #[test]
    fn test_autocontrast_and_median() {
        let image = GrayImage::from_fn(3, 1, |x, _| Luma([100 + x as u8 * 20]));
        let stretched = autocontrast(&image);
        assert_eq!(stretched.get_pixel(0, 0)[0], 0);
        assert_eq!(stretched.get_pixel(2, 0)[0], 255);

        let mut noisy = GrayImage::from_pixel(5, 5, Luma([200]));
        noisy.put_pixel(2, 2, Luma([0]));
        assert_eq!(median3(&noisy).get_pixel(2, 2)[0], 200);
    }

    #[test]
    fn test_parse_osd_rotation() {
        let osd = "Page number: 0\nOrientation in degrees: 270\nRotate: 90\nOrientation confidence: 5.2";
        assert_eq!(parse_osd_rotation(osd), Some(90));
        assert_eq!(parse_osd_rotation("Rotate: 45"), None);
        assert_eq!(parse_osd_rotation(""), None);
    }
}
