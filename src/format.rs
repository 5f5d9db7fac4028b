use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("record is shorter than the smallest valid record")]
    TooShort,
    #[error("record does not begin with 'S'")]
    MissingStartCode,
    #[error("invalid record type character {0:#04x}")]
    InvalidType(u8),
    #[error("record type S4 is reserved")]
    ReservedType,
    #[error("byte count is not a hexadecimal value")]
    InvalidByteCount,
    #[error("byte count {byte_count:#04x} is too small for record type {record_type}")]
    ByteCountTooSmall {
        record_type: RecordType,
        byte_count: u8,
    },
    #[error("record is shorter than its byte count declares")]
    Truncated,
    #[error("non-hexadecimal character at column {offset}")]
    InvalidHex { offset: usize },
    #[error("checksum mismatch (sum is {sum:#04x}, expected 0xff)")]
    ChecksumMismatch { sum: u8 },
    #[error("unexpected characters after checksum")]
    TrailingCharacters,
}

/// Motorola S-Record types. S4 is reserved and has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    S0,
    S1,
    S2,
    S3,
    S5,
    S6,
    S7,
    S8,
    S9,
}

/// Width of the widest address field, in bytes.
pub const MAX_ADDRESS_WIDTH: usize = 4;

impl RecordType {
    /// Maps the type digit (`b'0'..=b'9'`) to a record type. S4 yields `None`.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(Self::S0),
            b'1' => Some(Self::S1),
            b'2' => Some(Self::S2),
            b'3' => Some(Self::S3),
            b'5' => Some(Self::S5),
            b'6' => Some(Self::S6),
            b'7' => Some(Self::S7),
            b'8' => Some(Self::S8),
            b'9' => Some(Self::S9),
            _ => None,
        }
    }

    pub fn digit(self) -> u8 {
        match self {
            Self::S0 => b'0',
            Self::S1 => b'1',
            Self::S2 => b'2',
            Self::S3 => b'3',
            Self::S5 => b'5',
            Self::S6 => b'6',
            Self::S7 => b'7',
            Self::S8 => b'8',
            Self::S9 => b'9',
        }
    }

    /// Address field width in bytes.
    pub fn address_width(self) -> usize {
        match self {
            Self::S0 | Self::S1 | Self::S5 | Self::S9 => 2,
            Self::S2 | Self::S6 | Self::S8 => 3,
            Self::S3 | Self::S7 => 4,
        }
    }

    /// Data and termination records carry a memory address. S0 is a header
    /// and S5/S6 hold a record count, so they are never offset.
    pub fn is_address_bearing(self) -> bool {
        matches!(
            self,
            Self::S1 | Self::S2 | Self::S3 | Self::S7 | Self::S8 | Self::S9
        )
    }

    /// The 32-bit type of the same family.
    pub fn widened(self) -> Self {
        match self {
            Self::S1 | Self::S2 => Self::S3,
            Self::S8 | Self::S9 => Self::S7,
            other => other,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", char::from(self.digit()))
    }
}

pub mod hex;
pub mod srec;
