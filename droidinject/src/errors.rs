use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::result::ZipError;

use crate::ir::IrError;
use crate::layout::LayoutError;
use crate::utils::path_must_str;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("required binary `{0}` not available to context")]
    MissingBin(String),
    #[error("missing required env var: {0}")]
    MissingEnv(String),
    #[error("failed to get base dirs")]
    NoBaseDirs,

    #[error("{0}")]
    IO(io::Error),

    #[error("command failed with status {0}: {1}")]
    CommandError(i32, String),

    #[error("bad path {0:?}")]
    BadPath(PathBuf),

    #[error("generic error: {0}")]
    Generic(String),

    #[error("invalid config {0}: {1}")]
    InvalidConfig(String, String),

    #[error("file {0} doesn't exist")]
    MissingFile(String),

    #[error("no {0} method found among entry points or their callees, is the call graph built?")]
    NoCreationMethod(String),

    #[error("method {0} has no void return statement to anchor on")]
    NoTerminalReturn(String),

    #[error("method {0} has no `this` local")]
    NoThisLocal(String),

    #[error("{0}")]
    Ir(IrError),

    #[error("{0}")]
    Layout(LayoutError),

    #[error("zip error: {0}")]
    Zip(ZipError),

    #[error("invalid pattern: {0}")]
    Regex(regex::Error),

    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),
}

impl Error {
    pub fn new_generic<S: ToString + ?Sized>(s: &S) -> Self {
        Self::Generic(s.to_string())
    }

    pub fn new_cfg<S: ToString + ?Sized>(path: &Path, s: &S) -> Self {
        let as_str = path_must_str(path.as_ref());
        Self::InvalidConfig(as_str.into(), s.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<IrError> for Error {
    fn from(err: IrError) -> Self {
        Self::Ir(err)
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<ZipError> for Error {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(io) => Self::from(io),
            _ => Self::Zip(err),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Self::Regex(err)
    }
}
