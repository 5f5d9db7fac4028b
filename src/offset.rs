use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OffsetError {
    #[error("offset is empty")]
    Empty,
    #[error("invalid digit '{digit}' for base {base}")]
    InvalidDigit { digit: char, base: u32 },
    #[error("offset does not fit in 32 bits")]
    TooLarge,
    #[error("address {address:#010x} moved by {offset} is out of range")]
    AddressOutOfRange { address: u32, offset: Offset },
}

/// Signed distance applied to every record address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    negative: bool,
    magnitude: u32,
}

impl Offset {
    pub fn forward(magnitude: u32) -> Self {
        Self {
            negative: false,
            magnitude,
        }
    }

    pub fn backward(magnitude: u32) -> Self {
        Self {
            negative: true,
            magnitude,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0
    }

    /// Moves `address` by this offset.
    ///
    /// # Errors
    /// Returns `OffsetError::AddressOutOfRange` when the result leaves
    /// `0..=u32::MAX`.
    pub fn apply(&self, address: u32) -> Result<u32, OffsetError> {
        let moved = if self.negative {
            address.checked_sub(self.magnitude)
        } else {
            address.checked_add(self.magnitude)
        };
        moved.ok_or(OffsetError::AddressOutOfRange {
            address,
            offset: *self,
        })
    }
}

impl FromStr for Offset {
    type Err = OffsetError;

    /// Accepts an optional leading `-` followed by a decimal number, an octal
    /// number with a leading `0`, or a hexadecimal number with `0x`/`0X`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (base, digits) = if body == "0" {
            (10, body)
        } else if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            (16, hex)
        } else if let Some(oct) = body.strip_prefix('0') {
            (8, oct)
        } else {
            (10, body)
        };
        if digits.is_empty() {
            return Err(OffsetError::Empty);
        }

        let magnitude = digits.chars().try_fold(0u32, |acc, c| {
            let digit = c
                .to_digit(base)
                .ok_or(OffsetError::InvalidDigit { digit: c, base })?;
            acc.checked_mul(base)
                .and_then(|v| v.checked_add(digit))
                .ok_or(OffsetError::TooLarge)
        })?;

        Ok(Self {
            negative,
            magnitude,
        })
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "+" };
        write!(f, "{sign}{:#x}", self.magnitude)
    }
}
