use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::process::{Command, ExitStatus, Output};

use blanket::blanket;
use log::Level::Debug;
use log::{debug, log_enabled};

pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    /// Converts to a `Result` object that is `Ok` only if the [ExitStatus] is
    /// success.
    pub fn err_on_status(self) -> crate::Result<Self> {
        if self.status.success() {
            return Ok(self);
        }

        // Killed by a signal, there is no code to report
        let code = self.status.code().unwrap_or(-1);

        Err(crate::Error::CommandError(
            code,
            self.stderr_utf8_lossy().trim().to_string(),
        ))
    }

    #[inline]
    pub fn ok(&self) -> bool {
        self.status.success()
    }

    #[inline]
    pub fn stdout_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[inline]
    pub fn stderr_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

impl From<Output> for CmdOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Runs external programs, see [SystemRunner]
#[blanket(derive(Ref, Box))]
pub trait CommandRunner {
    fn run(&self, cmd: &str, args: &[String]) -> io::Result<CmdOutput>;
}

/// [CommandRunner] that spawns real processes
#[derive(Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str, args: &[String]) -> io::Result<CmdOutput> {
        run_cmd(cmd, args)
    }
}

/// Splits a string for use as a shell command
pub fn split(s: &str) -> Option<Vec<String>> {
    let mut escaped = false;
    let mut single_quote = false;
    let mut double_quote = false;

    let mut into = String::new();

    let mut sp = Vec::new();

    macro_rules! finish {
        () => {
            sp.push(into.clone());
            into.clear();
        };
    }

    for c in s.chars() {
        if escaped {
            escaped = false;
            into.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
            }

            '\'' if single_quote => {
                single_quote = false;
                finish!();
            }

            '\'' if !double_quote => {
                single_quote = true;
            }

            '"' if double_quote => {
                double_quote = false;
                finish!();
            }

            '"' if !single_quote => {
                double_quote = true;
            }

            _ => {
                if single_quote || double_quote || !c.is_whitespace() {
                    into.push(c);
                } else if !into.is_empty() {
                    finish!();
                }
            }
        }
    }

    if escaped | single_quote | double_quote {
        return None;
    }

    if !into.is_empty() {
        sp.push(into);
    }

    Some(sp)
}

/// Quotes a string with single quotes
pub fn quote(s: &str) -> String {
    let mut new = String::with_capacity(s.len() + 2);
    new.push('\'');
    for c in s.chars() {
        if c == '\'' {
            new.push_str("'\"'\"'");
        } else {
            new.push(c);
        }
    }
    new.push('\'');
    new
}

pub fn run_cmd<C, S>(cmd: C, args: &[S]) -> io::Result<CmdOutput>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if log_enabled!(Debug) {
        log_cmd(&cmd, args);
    }
    Command::new(cmd)
        .args(args)
        .output()
        .map(|output| output.into())
}

pub fn log_cmd<C, S>(cmd: &C, args: &[S])
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let line = std::iter::once(cmd.as_ref())
        .chain(args.iter().map(|it| it.as_ref()))
        .map(|it| {
            let arg = it.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                quote(&arg)
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<String>>()
        .join(" ");
    debug!("Running command: `{}`", line);
}
