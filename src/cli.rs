use clap::Parser;

use crate::format::srec::WidthPolicy;
use crate::offset::Offset;

/// Line length limit of the original tool, terminator included.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 2048;

fn parse_offset(input: &str) -> Result<Offset, String> {
    input
        .parse::<Offset>()
        .map_err(|e| format!("invalid offset '{input}': {e}"))
}

fn parse_line_length(input: &str) -> Result<usize, String> {
    let value = input
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid line length '{input}': {e}"))?;
    if value < 6 {
        return Err(format!("line length {value} is too small for any record"));
    }
    Ok(value)
}

#[derive(Debug, Parser)]
#[command(
    name = "srec-addr",
    version,
    about = "Shift the addresses of Motorola S-Record data"
)]
pub struct Args {
    /// Signed offset: decimal, 0-prefixed octal or 0x-prefixed hex.
    #[arg(value_name = "OFFSET", allow_hyphen_values = true, value_parser = parse_offset)]
    pub offset: Offset,

    /// Input file; `-` or nothing reads standard input.
    #[arg(value_name = "INPUT")]
    pub input: Option<String>,

    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Only widen records whose new address does not fit.
    #[arg(long = "keep-width")]
    pub keep_width: bool,

    #[arg(
        long = "max-line-length",
        default_value_t = DEFAULT_MAX_LINE_LENGTH,
        value_parser = parse_line_length
    )]
    pub max_line_length: usize,

    #[arg(long = "verbose", short = 'v', conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(long = "quiet", short = 'q')]
    pub quiet: bool,
}

impl Args {
    pub fn width_policy(&self) -> WidthPolicy {
        if self.keep_width {
            WidthPolicy::Preserve
        } else {
            WidthPolicy::Widen
        }
    }

    /// `None` means standard input.
    pub fn input_path(&self) -> Option<&str> {
        self.input.as_deref().filter(|path| *path != "-")
    }
}
