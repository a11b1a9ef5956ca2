use serde::{Deserialize, Serialize};
use std::fmt;

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15; // E.164

/// Fictional 555-55xx range reserved for test sign-ins.
const TEST_IDENTIFIER_PREFIX: &str = "+1555555";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("err invalid phone number")]
pub struct InvalidPhoneNumber;

/// A normalized phone number: `+` followed by 7 to 15 digits.
///
/// This is the natural key of an identity record, so every lookup and upsert
/// goes through [`PhoneNumber::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize user input. Whitespace and `-().` separators are dropped and
    /// an optional leading `+` is accepted.
    pub fn parse(raw: &str) -> Result<Self, InvalidPhoneNumber> {
        let trimmed = raw.trim();
        let digits_part = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let mut digits = String::with_capacity(digits_part.len());
        for c in digits_part.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' | '.' => {}
                _ => return Err(InvalidPhoneNumber),
            }
        }

        if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
            return Err(InvalidPhoneNumber);
        }

        Ok(Self(format!("+{}", digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this number belongs to the reserved test range.
    pub fn is_test_identifier(&self) -> bool {
        self.0.len() == TEST_IDENTIFIER_PREFIX.len() + 4 && self.0.starts_with(TEST_IDENTIFIER_PREFIX)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
