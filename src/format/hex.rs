use crate::format::FormatError;

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes up to eight upper-case hex digits as a big-endian unsigned value.
///
/// # Errors
/// Returns `FormatError::InvalidHex` with the index of the first character
/// that is not a hex digit.
pub fn decode(text: &[u8]) -> Result<u32, FormatError> {
    debug_assert!(text.len() <= 8);
    text.iter().enumerate().try_fold(0u32, |acc, (offset, &c)| {
        let digit = nibble(c).ok_or(FormatError::InvalidHex { offset })?;
        Ok((acc << 4) | u32::from(digit))
    })
}

/// Decodes one byte from exactly two hex digits.
///
/// # Errors
/// Same as [`decode`].
pub fn decode_byte(text: &[u8]) -> Result<u8, FormatError> {
    let [hi, lo] = text else {
        return Err(FormatError::Truncated);
    };
    let hi = nibble(*hi).ok_or(FormatError::InvalidHex { offset: 0 })?;
    let lo = nibble(*lo).ok_or(FormatError::InvalidHex { offset: 1 })?;
    Ok((hi << 4) | lo)
}

/// Writes `value` into `out` as upper-case hex digits, zero padded. Digits
/// that do not fit are dropped.
pub fn encode(mut value: u32, out: &mut [u8]) {
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(value & 0xf) as usize];
        value >>= 4;
    }
}
