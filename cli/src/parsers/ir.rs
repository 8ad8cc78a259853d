use crate::parsers::simple_error;
use clap::builder::{NonEmptyStringValueParser, TypedValueParser};
use droidinject::ir::{MethodRef, Type};

/// Full method reference such as `<a.B: void run(int)>`
#[derive(Clone)]
pub struct MethodRefValueParser;

impl TypedValueParser for MethodRefValueParser {
    type Value = MethodRef;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let parser = NonEmptyStringValueParser::new();
        let val = parser.parse_ref(cmd, arg, value)?;
        MethodRef::parse(val.trim()).map_err(simple_error)
    }
}

#[derive(Clone)]
pub struct TypeValueParser;

impl TypedValueParser for TypeValueParser {
    type Value = Type;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let parser = NonEmptyStringValueParser::new();
        let val = parser.parse_ref(cmd, arg, value)?;
        Type::parse(val.trim()).ok_or_else(|| simple_error(format!("invalid type {}", val)))
    }
}
