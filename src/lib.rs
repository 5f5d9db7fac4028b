pub mod cli;
pub mod converter;
pub mod format;
pub mod offset;

pub use converter::run;
