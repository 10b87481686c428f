//! Input normalization for the search kinds.
//!
//! Every function either returns the canonical form used in queries or a
//! `Validation` error; none of them touch a dataset.

use super::types::SearchError;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub const CPF_DIGITS: usize = 11;
pub const CEP_DIGITS: usize = 8;
pub const MIN_PHONE_DIGITS: usize = 8;

/// A phone number split the way the carrier datasets store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    /// All digits, DDD included.
    pub full: String,
    pub ddd: String,
    pub number: String,
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Removes diacritics and upper-cases: `"Conceição"` becomes `"CONCEICAO"`.
pub fn strip_accents(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// True when the input carries exactly eleven digits, whatever else surrounds them.
pub fn is_cpf(raw: &str) -> bool {
    digits_only(raw).len() == CPF_DIGITS
}

pub fn normalize_cpf(raw: &str) -> Result<String, SearchError> {
    let digits = digits_only(raw);
    if digits.len() != CPF_DIGITS {
        return Err(SearchError::validation(format!(
            "CPF must have {} digits, got {}",
            CPF_DIGITS,
            digits.len()
        )));
    }
    Ok(digits)
}

pub fn normalize_cep(raw: &str) -> Result<String, SearchError> {
    let digits = digits_only(raw);
    if digits.len() != CEP_DIGITS {
        return Err(SearchError::validation(format!(
            "CEP must have {} digits, got {}",
            CEP_DIGITS,
            digits.len()
        )));
    }
    Ok(digits)
}

/// The first two digits are taken as the DDD.
pub fn normalize_phone(raw: &str) -> Result<PhoneNumber, SearchError> {
    let full = digits_only(raw);
    if full.len() < MIN_PHONE_DIGITS {
        return Err(SearchError::validation(format!(
            "phone must have at least {} digits, got {}",
            MIN_PHONE_DIGITS,
            full.len()
        )));
    }
    let (ddd, number) = full.split_at(2);
    Ok(PhoneNumber {
        ddd: ddd.to_string(),
        number: number.to_string(),
        full: full.clone(),
    })
}

/// Accent-free, upper-case, single-spaced person name.
pub fn normalize_name(raw: &str) -> Result<String, SearchError> {
    let name = strip_accents(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if !name.chars().any(char::is_alphanumeric) {
        return Err(SearchError::validation("name must not be empty"));
    }
    Ok(name)
}

/// Plates and chassis: upper-case letters and digits only.
pub fn normalize_plate(raw: &str) -> Result<String, SearchError> {
    let plate: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_uppercase();
    if plate.is_empty() {
        return Err(SearchError::validation("plate must not be empty"));
    }
    Ok(plate)
}

pub fn normalize_rg(raw: &str) -> Result<String, SearchError> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return Err(SearchError::validation("RG must contain digits"));
    }
    Ok(digits)
}
