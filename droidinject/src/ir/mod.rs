//! Minimal Jimple-like intermediate representation
//!
//! The model holds just enough of a program to rewrite method bodies:
//! classes with their fields and methods, typed locals and a statement chain
//! with stable handles. Classes are read from and written back to a textual
//! form so that an external tool can turn them back into bytecode.

use thiserror::Error;

mod types;
pub use types::*;

mod value;
pub use value::{Constant, InvokeExpr, InvokeKind, Value};

mod stmt;
pub use stmt::*;

mod body;
pub use body::*;

mod scene;
pub use scene::*;

mod parse;
pub use parse::{parse_body, parse_class};

mod print;

pub type IrResult<T> = std::result::Result<T, IrError>;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("invalid type `{0}`")]
    BadType(String),

    #[error("invalid signature `{0}`")]
    BadSignature(String),

    #[error("statement {0} is not part of the body")]
    UnknownStmt(StmtId),

    #[error("local `{0}` is already declared")]
    DuplicateLocal(String),

    #[error("no local named `{0}`")]
    UnknownLocal(String),

    #[error("class {0} is not in the scene")]
    UnknownClass(String),

    #[error("method {0} is not in the scene")]
    UnknownMethod(String),

    #[error("method {0} has no body")]
    NoBody(String),
}

impl IrError {
    pub(crate) fn parse<S: ToString + ?Sized>(line: usize, msg: &S) -> Self {
        Self::Parse {
            line,
            msg: msg.to_string(),
        }
    }
}
