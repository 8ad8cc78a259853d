use std::fmt::{Display, Formatter};

use super::value::rename_in_text;
use super::{InvokeExpr, Type, Value};

/// Right hand side of an identity statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    This(Type),
    Parameter(usize, Type),
    CaughtException,
}

impl Display for IdentityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::This(ty) => write!(f, "@this: {}", ty),
            Self::Parameter(idx, ty) => write!(f, "@parameter{}: {}", idx, ty),
            Self::CaughtException => f.write_str("@caughtexception"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Identity,
    Assign,
    Invoke,
    Return,
    Label,
    Other,
}

/// A single IR statement
///
/// The `Display` implementation produces the canonical text form (Jimple
/// without the trailing `;`) that text patterns are matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Identity { local: String, rhs: IdentityRef },
    Assign { lhs: Value, rhs: Value },
    Invoke(InvokeExpr),
    Return(Option<Value>),
    Label(String),
    /// Branches, switches, monitors, throws, ... kept verbatim
    Other(String),
}

impl Stmt {
    pub fn assign<L: Into<String>>(lhs: L, rhs: Value) -> Self {
        Self::Assign {
            lhs: Value::Local(lhs.into()),
            rhs,
        }
    }

    pub fn return_void() -> Self {
        Self::Return(None)
    }

    pub fn kind(&self) -> StmtKind {
        match self {
            Self::Identity { .. } => StmtKind::Identity,
            Self::Assign { .. } => StmtKind::Assign,
            Self::Invoke(_) => StmtKind::Invoke,
            Self::Return(_) => StmtKind::Return,
            Self::Label(_) => StmtKind::Label,
            Self::Other(_) => StmtKind::Other,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity { .. })
    }

    pub fn is_void_return(&self) -> bool {
        matches!(self, Self::Return(None))
    }

    /// The invocation performed by this statement, either as an invoke
    /// statement or as the right hand side of an assignment
    pub fn invoke_expr(&self) -> Option<&InvokeExpr> {
        match self {
            Self::Invoke(expr) => Some(expr),
            Self::Assign {
                rhs: Value::Invoke(expr),
                ..
            } => Some(expr),
            _ => None,
        }
    }

    /// Whether the canonical text form mentions `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.to_string().contains(needle)
    }

    pub(crate) fn rename_local(&mut self, from: &str, to: &str) {
        match self {
            Self::Identity { local, .. } => {
                if local == from {
                    *local = to.into();
                }
            }
            Self::Assign { lhs, rhs } => {
                lhs.rename_local(from, to);
                rhs.rename_local(from, to);
            }
            Self::Invoke(expr) => expr.rename_local(from, to),
            Self::Return(Some(v)) => v.rename_local(from, to),
            Self::Other(raw) => *raw = rename_in_text(raw, from, to),
            Self::Return(None) | Self::Label(_) => {}
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity { local, rhs } => write!(f, "{} := {}", local, rhs),
            Self::Assign { lhs, rhs } => write!(f, "{} = {}", lhs, rhs),
            Self::Invoke(expr) => write!(f, "{}", expr),
            Self::Return(None) => f.write_str("return"),
            Self::Return(Some(v)) => write!(f, "return {}", v),
            Self::Label(name) => write!(f, "{}:", name),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}
