//! ISO 6346 container numbers and seal numbers.

use serde::Serialize;
use std::fmt;

/// A validated, normalized ISO 6346 container number such as `CSQU3054383`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerNumber(String);

impl ContainerNumber {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = normalize_container_number(raw);
        if normalized.is_empty() {
            return Err("container number is required".into());
        }
        if normalized.len() != 11 || !normalized.is_ascii() {
            return Err(format!(
                "container number must be 11 characters, got {:?}",
                normalized
            ));
        }
        let bytes = normalized.as_bytes();
        if !bytes[..4].iter().all(u8::is_ascii_uppercase) {
            return Err("container number must start with 4 letters".into());
        }
        if !matches!(bytes[3], b'U' | b'J' | b'Z') {
            return Err("equipment category must be U, J or Z".into());
        }
        if !bytes[4..].iter().all(u8::is_ascii_digit) {
            return Err("container number must end with 7 digits".into());
        }
        let expected = check_digit(&bytes[..10]);
        let actual = u32::from(bytes[10] - b'0');
        if expected != actual {
            return Err(format!(
                "check digit mismatch: expected {}, got {}",
                expected, actual
            ));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContainerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Uppercase and strip the separators people type between the parts.
pub fn normalize_container_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '/')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Letter values skip multiples of 11: A=10, B=12 .. K=21, L=23 .. Z=38.
fn letter_value(letter: u8) -> u32 {
    let mut value = 10;
    for _ in b'A'..letter {
        value += 1;
        if value % 11 == 0 {
            value += 1;
        }
    }
    value
}

/// Check digit over owner code, category and serial (first 10 characters).
pub fn check_digit(prefix: &[u8]) -> u32 {
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let value = if b.is_ascii_digit() {
                u32::from(b - b'0')
            } else {
                letter_value(*b)
            };
            value << i
        })
        .sum();
    sum % 11 % 10
}

/// Trimmed, uppercased seal number: 1-32 chars of ASCII alphanumerics and '-'.
pub fn normalize_seal_number(raw: &str) -> Result<String, String> {
    let seal = raw.trim().to_ascii_uppercase();
    if seal.is_empty() {
        return Err("seal number is required".into());
    }
    if seal.len() > 32 {
        return Err("seal number must be at most 32 characters".into());
    }
    if !seal.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("seal number may only contain letters, digits and '-'".into());
    }
    Ok(seal)
}
