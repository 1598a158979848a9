//! # CAS Registry Number Validation
//!
//! Checksum validation and plausibility filtering for CAS Registry Numbers
//! (`XXXXXXX-YY-Z`). The check digit is the weighted sum of the body digits
//! read right to left, each multiplied by its 1-based position, modulo 10.
//!
//! Validation failures are never surfaced as resolution errors; an invalid
//! CAS simply produces no CAS signal. The typed error exists for callers
//! (cleaning pipelines, tests) that want to know why a value was rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// CAS pattern anchored to a full string: 2-7 digits, 2 digits, check digit.
static STRICT_CAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2,7}-\d{2}-\d$").expect("valid CAS regex"));

/// CAS pattern for scanning free text (field-swap detection).
static CAS_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2,7}-\d{2}-\d)\b").expect("valid CAS scan regex"));

/// Numeric prefixes common in ERP product codes. An 8-10 digit string
/// starting with one of these is a product code even if it would pass the
/// CAS checksum after reconstruction.
const PRODUCT_CODE_PREFIXES: [&str; 6] = ["111", "112", "110", "100", "200", "300"];

/// Why a string was rejected as a CAS number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CasError {
    #[error("empty CAS value")]
    Empty,
    #[error("invalid CAS format: {0}")]
    Format(String),
    #[error("CAS checksum failed: {0}")]
    Checksum(String),
    #[error("implausible CAS length: {0}")]
    ImplausibleLength(String),
    #[error("likely product code, not a CAS number: {0}")]
    ProductCode(String),
}

/// A checksum-validated CAS number in canonical dashed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedCas(String);

impl NormalizedCas {
    /// Canonical dashed representation, e.g. `67-64-1`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, the key form used by the reference index.
    pub fn stripped(&self) -> String {
        strip_cas(&self.0)
    }
}

impl fmt::Display for NormalizedCas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip dashes and whitespace for loose comparison and index keys.
pub fn strip_cas(cas: &str) -> String {
    cas.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Validate a CAS Registry Number: format, then checksum.
pub fn validate_cas(raw: &str) -> Result<NormalizedCas, CasError> {
    let trimmed: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.is_empty() {
        return Err(CasError::Empty);
    }
    if !STRICT_CAS.is_match(&trimmed) {
        return Err(CasError::Format(raw.trim().to_string()));
    }

    let digits: Vec<u32> = trimmed.chars().filter_map(|c| c.to_digit(10)).collect();
    let check = *digits.last().expect("format guarantees digits");
    let body = &digits[..digits.len() - 1];

    let total: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| (i as u32 + 1) * d)
        .sum();

    if total % 10 == check {
        Ok(NormalizedCas(trimmed))
    } else {
        Err(CasError::Checksum(trimmed))
    }
}

/// Strict plausibility: format, total length 7-12 characters, checksum.
///
/// The length bound rejects reconstructed product codes that pass the
/// checksum by accident.
pub fn is_plausible_cas(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !STRICT_CAS.is_match(trimmed) {
        return false;
    }
    if trimmed.len() < 7 || trimmed.len() > 12 {
        return false;
    }
    validate_cas(trimmed).is_ok()
}

/// Detect numeric strings that are ERP/inventory product codes rather than
/// CAS numbers: anything over 10 digits, or 8-10 digits with a known
/// sequential prefix.
pub fn is_likely_product_code(raw: &str) -> bool {
    let digits = strip_cas(raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if digits.len() > 10 {
        return true;
    }
    if digits.len() >= 8 {
        let prefix = &digits[..3];
        if PRODUCT_CODE_PREFIXES.contains(&prefix) {
            return true;
        }
    }
    false
}

/// Scan free text for the first checksum-valid, plausible CAS pattern.
/// Used for field-swap detection when a CAS lands in the name column.
pub fn find_cas_in_text(text: &str) -> Option<NormalizedCas> {
    for found in CAS_IN_TEXT.find_iter(text) {
        let candidate = found.as_str();
        if is_likely_product_code(candidate) {
            continue;
        }
        if is_plausible_cas(candidate) {
            if let Ok(cas) = validate_cas(candidate) {
                return Some(cas);
            }
        }
    }
    None
}
