use crate::parsers::simple_error;
use clap::builder::{NonEmptyStringValueParser, TypedValueParser};

/// `PATTERN=REPLACEMENT`, split at the first unescaped `=`
///
/// A literal `=` in the pattern is written `\=`.
#[derive(Clone)]
pub struct ReplacementValueParser;

impl TypedValueParser for ReplacementValueParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let parser = NonEmptyStringValueParser::new();
        let val = parser.parse_ref(cmd, arg, value)?;
        parse_replacement(&val)
    }
}

fn parse_replacement(val: &str) -> Result<(String, String), clap::Error> {
    let mut key = String::new();
    let mut chars = val.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '='))) => {
                key.push('=');
                chars.next();
            }
            '=' => {
                if key.is_empty() {
                    return Err(simple_error(format!("empty pattern in {}", val)));
                }
                return Ok((key, val[idx + 1..].to_string()));
            }
            _ => key.push(c),
        }
    }
    Err(simple_error(format!(
        "expected PATTERN=REPLACEMENT, got {}",
        val
    )))
}
