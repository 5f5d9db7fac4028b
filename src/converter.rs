use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cli::Args;
use crate::format::srec::{check_record, rewrite_address, RewriteError, WidthPolicy};
use crate::format::{FormatError, RecordType};
use crate::offset::{Offset, OffsetError};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot open {path}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot create {path}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("file read error at line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("line {line} is longer than {limit} bytes")]
    LineTooLong { line: usize, limit: usize },
    #[error("address out of range at line {line}")]
    AddressOutOfRange {
        line: usize,
        #[source]
        source: OffsetError,
    },
    #[error("S-Record conversion failure at line {line}")]
    Conversion {
        line: usize,
        #[source]
        source: RewriteError,
    },
    #[error("output error")]
    Write(#[source] io::Error),
}

impl ConvertError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Open { .. } | Self::Create { .. } => 3,
            Self::Read { .. } | Self::LineTooLong { .. } => 4,
            Self::AddressOutOfRange { .. } => 5,
            Self::Conversion { .. } => 6,
            Self::Write(_) => 7,
        }
    }
}

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Valid record left as is.
    Unchanged,
    /// Not an S-Record; passed through.
    NotRecord(FormatError),
    Rewritten {
        from: u32,
        to: u32,
        record_type: RecordType,
        widened: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub lines: usize,
    pub rewritten: usize,
    pub widened: usize,
    pub not_records: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Converter {
    offset: Offset,
    policy: WidthPolicy,
    max_line_length: usize,
}

impl Converter {
    pub fn new(offset: Offset, policy: WidthPolicy, max_line_length: usize) -> Self {
        Self {
            offset,
            policy,
            max_line_length,
        }
    }

    /// Validates `line` and, for address-bearing records, moves its address
    /// by the offset. `number` is the 1-based line number used in errors.
    ///
    /// # Errors
    /// Returns `ConvertError` when the shifted address is out of range or the
    /// record cannot be rewritten. The line must then be discarded.
    pub fn convert_line(
        &self,
        number: usize,
        line: &mut Vec<u8>,
    ) -> Result<LineOutcome, ConvertError> {
        let record = match check_record(line) {
            Ok(record) => record,
            Err(reason) => return Ok(LineOutcome::NotRecord(reason)),
        };
        if !record.record_type.is_address_bearing() || self.offset.is_zero() {
            return Ok(LineOutcome::Unchanged);
        }

        let conversion = |source: RewriteError| ConvertError::Conversion {
            line: number,
            source,
        };
        let from = record
            .address(line)
            .map_err(|err| conversion(err.into()))?;
        let to = self
            .offset
            .apply(from)
            .map_err(|source| ConvertError::AddressOutOfRange {
                line: number,
                source,
            })?;

        let before = line.len();
        let after = rewrite_address(line, record, to, self.policy, self.max_line_length)
            .map_err(conversion)?;
        let widened = after > before;
        let record_type = if widened {
            record.record_type.widened()
        } else {
            record.record_type
        };

        Ok(LineOutcome::Rewritten {
            from,
            to,
            record_type,
            widened,
        })
    }

    /// Converts every line of `reader` into `writer`. Lines that are not
    /// S-Records are logged and copied unchanged.
    ///
    /// # Errors
    /// Stops at the first fatal `ConvertError`; `writer` then holds the lines
    /// converted so far.
    pub fn convert_stream<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<ConvertSummary, ConvertError> {
        let limit = self.max_line_length;
        let mut summary = ConvertSummary::default();
        let mut line = Vec::with_capacity(limit);

        loop {
            let number = summary.lines + 1;
            line.clear();
            let read = (&mut reader)
                .take(limit as u64 + 1)
                .read_until(b'\n', &mut line)
                .map_err(|source| ConvertError::Read {
                    line: number,
                    source,
                })?;
            if read == 0 {
                break;
            }
            if read > limit {
                return Err(ConvertError::LineTooLong {
                    line: number,
                    limit,
                });
            }
            summary.lines = number;

            match self.convert_line(number, &mut line)? {
                LineOutcome::Unchanged => {}
                LineOutcome::NotRecord(reason) => {
                    warn!("non S-Record line found at line {number}: {reason}");
                    summary.not_records += 1;
                }
                LineOutcome::Rewritten {
                    from,
                    to,
                    record_type,
                    widened,
                } => {
                    debug!("line {number}: {from:#010x} -> {to:#010x} as {record_type}");
                    summary.rewritten += 1;
                    if widened {
                        summary.widened += 1;
                    }
                }
            }

            writer.write_all(&line).map_err(ConvertError::Write)?;
        }

        writer.flush().map_err(ConvertError::Write)?;
        Ok(summary)
    }
}

/// Runs one conversion as configured by `args`. The output is only written
/// once the whole input has been converted.
pub fn run(args: Args) -> anyhow::Result<ConvertSummary> {
    let converter = Converter::new(args.offset, args.width_policy(), args.max_line_length);

    let input: Box<dyn BufRead> = match args.input_path() {
        Some(path) => {
            let file = File::open(path).map_err(|source| ConvertError::Open {
                path: path.to_string(),
                source,
            })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    debug!(
        "offset {} with {:?} width policy, max line length {}",
        args.offset,
        args.width_policy(),
        args.max_line_length
    );

    let mut converted = Vec::new();
    let summary = converter.convert_stream(input, &mut converted)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|source| ConvertError::Create {
                path: path.clone(),
                source,
            })?;
            write_all(BufWriter::new(file), &converted)?;
        }
        None => write_all(io::stdout().lock(), &converted)?,
    }

    info!(
        "{} line(s): {} rewritten, {} widened, {} not S-Record",
        summary.lines, summary.rewritten, summary.widened, summary.not_records
    );
    Ok(summary)
}

fn write_all<W: Write>(mut writer: W, bytes: &[u8]) -> Result<(), ConvertError> {
    writer.write_all(bytes).map_err(ConvertError::Write)?;
    writer.flush().map_err(ConvertError::Write)
}
