use clap::error::ErrorKind;
use std::fmt::Display;

mod ir;
pub use ir::{MethodRefValueParser, TypeValueParser};

mod replacement;
pub use replacement::ReplacementValueParser;

pub fn simple_error(err: impl Display) -> clap::Error {
    clap::Error::raw(ErrorKind::InvalidValue, format!("{}\n", err.to_string()))
}
