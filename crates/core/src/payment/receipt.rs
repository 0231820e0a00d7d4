//! Receipt numbers.
//!
//! Format: `{prefix}-{year}-{sequence:06}`, e.g. `RCT-2025-000042`. The
//! sequence comes from a per-tenant counter that only moves forward, so a
//! number is never handed out twice. Gaps are allowed.

use std::fmt;

use crate::error::FeeError;

const MAX_PREFIX_LEN: usize = 10;

/// A formatted receipt number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptNumber(String);

impl ReceiptNumber {
    /// Formats a receipt number.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` if the prefix is empty, too long or not
    /// ASCII alphanumeric, or if the sequence is zero.
    pub fn new(prefix: &str, year: i32, sequence: u64) -> Result<Self, FeeError> {
        if prefix.is_empty()
            || prefix.len() > MAX_PREFIX_LEN
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(FeeError::validation(
                "receipt_prefix",
                "must be 1-10 ASCII letters or digits",
                prefix,
            ));
        }
        if sequence == 0 {
            return Err(FeeError::validation("receipt_sequence", "must start at 1", sequence));
        }
        Ok(Self(format!("{prefix}-{year}-{sequence:06}")))
    }

    /// Returns the receipt number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the receipt number, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
