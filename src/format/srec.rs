use thiserror::Error;

use crate::format::hex;
use crate::format::{FormatError, RecordType, MAX_ADDRESS_WIDTH};

/// Column of the first address character (`S`, type, two byte-count digits).
const ADDRESS_COLUMN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("record type {0} does not carry an address")]
    NotAddressBearing(RecordType),
    #[error("widened record needs {required} bytes, line capacity is {capacity}")]
    CapacityExceeded { required: usize, capacity: usize },
    #[error("widened byte count {0:#x} does not fit in one byte")]
    ByteCountOverflow(usize),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// How the rewriter chooses the address width of a rewritten record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WidthPolicy {
    /// Every rewritten data or termination record becomes S3/S7.
    #[default]
    Widen,
    /// Keep the original type unless the new address does not fit.
    Preserve,
}

/// Fields of a validated record needed to rewrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    pub byte_count: u8,
}

impl Record {
    /// Reads the address field back out of `line`.
    ///
    /// # Errors
    /// Returns `FormatError` when the field is missing or not hexadecimal.
    pub fn address(&self, line: &[u8]) -> Result<u32, FormatError> {
        let end = ADDRESS_COLUMN + self.record_type.address_width() * 2;
        let field = line.get(ADDRESS_COLUMN..end).ok_or(FormatError::Truncated)?;
        hex::decode(field).map_err(|err| at_column(err, ADDRESS_COLUMN))
    }

    /// Column just past the checksum digits.
    fn end_column(&self) -> usize {
        ADDRESS_COLUMN + usize::from(self.byte_count) * 2
    }
}

/// Checks that `line` is one well-formed S-Record, optionally followed by
/// `\r`, `\n` or both.
///
/// # Errors
/// Returns the first `FormatError` found; the line is not a record.
pub fn check_record(line: &[u8]) -> Result<Record, FormatError> {
    if line.len() < 6 {
        return Err(FormatError::TooShort);
    }
    if line[0] != b'S' {
        return Err(FormatError::MissingStartCode);
    }
    let record_type = match line[1] {
        b'4' => return Err(FormatError::ReservedType),
        c => RecordType::from_digit(c).ok_or(FormatError::InvalidType(c))?,
    };
    let byte_count =
        hex::decode_byte(&line[2..ADDRESS_COLUMN]).map_err(|_| FormatError::InvalidByteCount)?;
    if usize::from(byte_count) < record_type.address_width() + 1 {
        return Err(FormatError::ByteCountTooSmall {
            record_type,
            byte_count,
        });
    }

    let record = Record {
        record_type,
        byte_count,
    };
    let end = record.end_column();
    if line.len() < end {
        return Err(FormatError::Truncated);
    }

    let sum = sum_bytes(line, ADDRESS_COLUMN, end)?.wrapping_add(byte_count);
    if sum != 0xff {
        return Err(FormatError::ChecksumMismatch { sum });
    }

    let rest = &line[end..];
    let rest = rest.strip_prefix(b"\r").unwrap_or(rest);
    let rest = rest.strip_prefix(b"\n").unwrap_or(rest);
    if !rest.is_empty() {
        return Err(FormatError::TrailingCharacters);
    }

    Ok(record)
}

/// Rewrites the address of a record accepted by [`check_record`], widening it
/// to a 32-bit type when `policy` or the address requires it. `capacity`
/// bounds the length the line may grow to.
///
/// Returns the new line length. On error the line content is unspecified.
///
/// # Errors
/// Returns `RewriteError` when the record cannot be widened or re-encoded.
pub fn rewrite_address(
    line: &mut Vec<u8>,
    record: Record,
    address: u32,
    policy: WidthPolicy,
    capacity: usize,
) -> Result<usize, RewriteError> {
    let record_type = record.record_type;
    if !record_type.is_address_bearing() {
        return Err(RewriteError::NotAddressBearing(record_type));
    }
    if line.len() < record.end_column() {
        return Err(FormatError::Truncated.into());
    }

    let current = record_type.address_width();
    let target = match policy {
        WidthPolicy::Widen => MAX_ADDRESS_WIDTH,
        WidthPolicy::Preserve if fits_width(address, current) => current,
        WidthPolicy::Preserve => MAX_ADDRESS_WIDTH,
    };

    let move_n = (target - current) * 2;
    let byte_count = if move_n > 0 {
        let required = line.len() + move_n;
        if required > capacity {
            return Err(RewriteError::CapacityExceeded { required, capacity });
        }
        let widened = usize::from(record.byte_count) + move_n / 2;
        let widened = u8::try_from(widened).map_err(|_| RewriteError::ByteCountOverflow(widened))?;

        let at = ADDRESS_COLUMN + current * 2;
        line.splice(at..at, std::iter::repeat(b'0').take(move_n));
        hex::encode(u32::from(widened), &mut line[2..ADDRESS_COLUMN]);
        line[1] = record_type.widened().digit();
        widened
    } else {
        record.byte_count
    };

    hex::encode(address, &mut line[ADDRESS_COLUMN..ADDRESS_COLUMN + target * 2]);

    let checksum_column = ADDRESS_COLUMN + usize::from(byte_count) * 2 - 2;
    let sum = sum_bytes(line, ADDRESS_COLUMN, checksum_column)?.wrapping_add(byte_count);
    hex::encode(
        u32::from(0xff - sum),
        &mut line[checksum_column..checksum_column + 2],
    );

    Ok(line.len())
}

fn fits_width(address: u32, width: usize) -> bool {
    width >= MAX_ADDRESS_WIDTH || u64::from(address) < 1u64 << (width * 8)
}

/// Sum of the hex byte pairs in `line[begin..end]`, modulo 256.
fn sum_bytes(line: &[u8], begin: usize, end: usize) -> Result<u8, FormatError> {
    line[begin..end]
        .chunks_exact(2)
        .enumerate()
        .try_fold(0u8, |sum, (idx, pair)| {
            let byte = hex::decode_byte(pair).map_err(|err| at_column(err, begin + idx * 2))?;
            Ok(sum.wrapping_add(byte))
        })
}

fn at_column(err: FormatError, column: usize) -> FormatError {
    match err {
        FormatError::InvalidHex { offset } => FormatError::InvalidHex {
            offset: column + offset,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{check_record, rewrite_address, Record, RewriteError, WidthPolicy};
    use crate::format::{FormatError, RecordType};
    use pretty_assertions::assert_eq;

    const DATA_S1: &[u8] = b"S1130000AABBCCDDEEFF00112233445566778899F4";

    fn rewrite(line: &[u8], address: u32, policy: WidthPolicy) -> Result<Vec<u8>, RewriteError> {
        let mut buf = line.to_vec();
        let record = check_record(&buf).expect("valid input record");
        let len = rewrite_address(&mut buf, record, address, policy, 2048)?;
        assert_eq!(len, buf.len());
        Ok(buf)
    }

    fn text(line: &[u8]) -> &str {
        std::str::from_utf8(line).expect("ascii")
    }

    #[test]
    fn accepts_well_formed_records() {
        assert_eq!(
            check_record(DATA_S1),
            Ok(Record {
                record_type: RecordType::S1,
                byte_count: 0x13,
            })
        );
        assert!(check_record(b"S9030000FC").is_ok());
        assert!(check_record(b"S9030000FC\n").is_ok());
        assert!(check_record(b"S9030000FC\r\n").is_ok());
        assert!(check_record(b"S00600004844521B\r\n").is_ok());
        assert!(check_record(b"S5030003F9").is_ok());
        assert!(check_record(b"s9030000fc").is_err());
    }

    #[test]
    fn rejects_lower_case_hex_digits() {
        assert_eq!(
            check_record(b"S9030000fc"),
            Err(FormatError::InvalidHex { offset: 8 })
        );
        assert_eq!(
            check_record(b"S1130000aabbccddeeff00112233445566778899f4\n"),
            Err(FormatError::InvalidHex { offset: 8 })
        );
    }

    #[test]
    fn reports_structural_failures_in_order() {
        assert_eq!(check_record(b"S903"), Err(FormatError::TooShort));
        assert_eq!(check_record(b":00000001FF"), Err(FormatError::MissingStartCode));
        assert_eq!(check_record(b"SX030000FC"), Err(FormatError::InvalidType(b'X')));
        assert_eq!(check_record(b"S4030000FC"), Err(FormatError::ReservedType));
        assert_eq!(check_record(b"S1XYZZZZ"), Err(FormatError::InvalidByteCount));
        assert_eq!(
            check_record(b"S2030000FC"),
            Err(FormatError::ByteCountTooSmall {
                record_type: RecordType::S2,
                byte_count: 3,
            })
        );
        assert_eq!(check_record(b"S9040000FC"), Err(FormatError::Truncated));
        assert_eq!(check_record(b"S90300G0FC"), Err(FormatError::InvalidHex { offset: 6 }));
        assert_eq!(
            check_record(b"S9030000FD"),
            Err(FormatError::ChecksumMismatch { sum: 0x00 })
        );
        assert_eq!(check_record(b"S9030000FC\n\r"), Err(FormatError::TrailingCharacters));
        assert_eq!(check_record(b"S9030000FC "), Err(FormatError::TrailingCharacters));
    }

    #[test]
    fn rejects_record_shorter_than_declared_count() {
        assert_eq!(
            check_record(b"S1130000AABBCCDDEEFF00112233445566CA"),
            Err(FormatError::Truncated)
        );
    }

    #[test]
    fn reads_address_field() {
        let record = check_record(b"S20801000001020304EC").expect("valid");
        assert_eq!(record.address(b"S20801000001020304EC"), Ok(0x010000));
    }

    #[test]
    fn widens_data_record_beyond_sixteen_bits() {
        let out = rewrite(DATA_S1, 0x0001_0000, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S31500010000AABBCCDDEEFF00112233445566778899F1");
        assert!(check_record(&out).is_ok());
    }

    #[test]
    fn widen_policy_promotes_even_when_address_fits() {
        let out = rewrite(DATA_S1, 0x10, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S31500000010AABBCCDDEEFF00112233445566778899E2");
    }

    #[test]
    fn preserve_policy_keeps_width_when_address_fits() {
        let out = rewrite(DATA_S1, 0x0100, WidthPolicy::Preserve).expect("rewrite");
        assert_eq!(text(&out), "S1130100AABBCCDDEEFF00112233445566778899F3");

        let out = rewrite(b"S20801000001020304EC", 0x020000, WidthPolicy::Preserve)
            .expect("rewrite");
        assert_eq!(text(&out), "S20802000001020304EB");

        let out = rewrite(b"S804012000DA", 0x012100, WidthPolicy::Preserve).expect("rewrite");
        assert_eq!(text(&out), "S804012100D9");
    }

    #[test]
    fn preserve_policy_widens_when_address_overflows_field() {
        let out = rewrite(DATA_S1, 0x0001_0000, WidthPolicy::Preserve).expect("rewrite");
        assert_eq!(text(&out), "S31500010000AABBCCDDEEFF00112233445566778899F1");
    }

    #[test]
    fn widens_termination_records_to_s7() {
        let out = rewrite(b"S9030000FC", 0x0001_0000, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S70500010000F9");

        let out = rewrite(b"S804012000DA", 0x012100, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S70500012100D8");
    }

    #[test]
    fn rewrites_32_bit_records_in_place() {
        let out = rewrite(b"S30900001000DEADBEEFAE", 0, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S30900000000DEADBEEFBE");

        let out = rewrite(b"S70500001000EA", u32::MAX, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S705FFFFFFFFFE");
    }

    #[test]
    fn keeps_line_terminator_after_widening() {
        let out = rewrite(b"S9030000FC\r\n", 0x8000, WidthPolicy::Widen).expect("rewrite");
        assert_eq!(text(&out), "S705000080007A\r\n");
    }

    #[test]
    fn rejects_growth_past_capacity() {
        let mut line = b"S9030000FC\n".to_vec();
        let record = check_record(&line).expect("valid");
        assert_eq!(
            rewrite_address(&mut line, record, 1, WidthPolicy::Widen, 14),
            Err(RewriteError::CapacityExceeded {
                required: 15,
                capacity: 14,
            })
        );

        let mut line = b"S9030000FC\n".to_vec();
        assert_eq!(
            rewrite_address(&mut line, record, 1, WidthPolicy::Widen, 15),
            Ok(15)
        );
    }

    #[test]
    fn rejects_widened_byte_count_above_255() {
        let mut line = b"S1FE0000".to_vec();
        line.extend(std::iter::repeat(b'0').take((0xfe - 3) * 2));
        line.extend_from_slice(b"01");
        let record = check_record(&line).expect("valid");
        assert_eq!(
            rewrite_address(&mut line, record, 0x10, WidthPolicy::Widen, 2048),
            Err(RewriteError::ByteCountOverflow(0x100))
        );
    }

    #[test]
    fn accepts_widened_byte_count_of_255() {
        let mut line = b"S1FD0000".to_vec();
        line.extend(std::iter::repeat(b'0').take((0xfd - 3) * 2));
        line.extend_from_slice(b"02");
        let record = check_record(&line).expect("valid");
        let len = rewrite_address(&mut line, record, 0, WidthPolicy::Widen, 2048)
            .expect("rewrite");
        assert_eq!(len, 4 + 0xff * 2);
        assert_eq!(&line[..4], b"S3FF");
        assert!(check_record(&line).is_ok());
    }

    #[test]
    fn refuses_count_and_header_records() {
        for line in [&b"S5030003F9"[..], &b"S00600004844521B"[..]] {
            let mut buf = line.to_vec();
            let record = check_record(&buf).expect("valid");
            assert!(matches!(
                rewrite_address(&mut buf, record, 0x10, WidthPolicy::Widen, 2048),
                Err(RewriteError::NotAddressBearing(_))
            ));
        }
    }
}
