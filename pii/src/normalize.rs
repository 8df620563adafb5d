use crate::error::{IdentityField, PiiError};
use regex::Regex;
use std::sync::LazyLock;

static US_ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("US ZIP pattern compiles"));

static US_ZIP_PLUS_FOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{5})-?[0-9]{4}$").expect("ZIP+4 pattern compiles"));

// Outward code (A9, A9A, A99, AA9, AA9A, AA99), optional separator, inward code (9AA).
static UK_POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z]{1,2}[0-9][a-z0-9]?[\s-]*[0-9][a-z]{2}$")
        .expect("UK postcode pattern compiles")
});

/// Strips everything but digits and makes sure a country code is present.
///
/// Ten digits are assumed to be a US number and get a leading `1`. Longer
/// numbers must already start with `1`.
pub fn normalize_phone(raw: &str) -> Result<String, PiiError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match digits.len() {
        10 => Ok(format!("1{digits}")),
        len if len > 10 && digits.starts_with('1') => Ok(digits),
        _ => Err(PiiError::invalid(
            IdentityField::Phone,
            "phone number must include country code",
        )),
    }
}

/// Accepts US ZIP codes (ZIP+4 is cut down to five digits) and UK postcodes.
pub fn normalize_zip(raw: &str) -> Result<String, PiiError> {
    let trimmed = raw.trim();

    if US_ZIP.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    if let Some(captures) = US_ZIP_PLUS_FOUR.captures(trimmed) {
        return Ok(captures[1].to_string());
    }

    if UK_POSTCODE.is_match(trimmed) {
        return Ok(trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
            .to_lowercase());
    }

    Err(PiiError::invalid(IdentityField::Zip, "invalid ZIP code format"))
}

/// Lowercases and keeps only `a-z`.
pub fn normalize_city(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(char::is_ascii_lowercase)
        .collect()
}
