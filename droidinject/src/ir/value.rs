use std::fmt::{Display, Formatter};

use super::{Body, FieldRef, MethodRef, Type};
use crate::utils::ClassName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    /// Float and double constants keep their rendered text, e.g. `1.5F`
    Float(String),
    Double(String),
    Str(String),
    Null,
    Class(String),
}

impl Constant {
    /// Zero value for a primitive type, `null` for everything else
    pub fn default_for(ty: &Type) -> Self {
        match ty {
            Type::Boolean | Type::Byte | Type::Char | Type::Short | Type::Int => Self::Int(0),
            Type::Long => Self::Long(0),
            Type::Float => Self::Float("0.0F".into()),
            Type::Double => Self::Double("0.0".into()),
            _ => Self::Null,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Self::Int(_) => Type::Int,
            Self::Long(_) => Type::Long,
            Self::Float(_) => Type::Float,
            Self::Double(_) => Type::Double,
            Self::Str(_) => Type::class("java.lang.String"),
            Self::Null => Type::Null,
            Self::Class(_) => Type::class("java.lang.Class"),
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}L", v),
            Self::Float(v) | Self::Double(v) => f.write_str(v),
            Self::Str(v) => write!(f, "\"{}\"", escape_string(v)),
            Self::Null => f.write_str("null"),
            Self::Class(v) => write!(f, "class \"{}\"", v),
        }
    }
}

pub(crate) fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn unescape_string(s: &str) -> String {
    let mut unescaped = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Interface,
    Static,
}

impl InvokeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Virtual => "virtualinvoke",
            Self::Special => "specialinvoke",
            Self::Interface => "interfaceinvoke",
            Self::Static => "staticinvoke",
        }
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "virtualinvoke" => Self::Virtual,
            "specialinvoke" => Self::Special,
            "interfaceinvoke" => Self::Interface,
            "staticinvoke" => Self::Static,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    /// Receiver local, `None` only for static invocations
    pub base: Option<String>,
    pub method: MethodRef,
    pub args: Vec<Value>,
}

impl InvokeExpr {
    pub fn new_virtual<S: Into<String>>(base: S, method: MethodRef, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Virtual,
            base: Some(base.into()),
            method,
            args,
        }
    }

    pub fn new_interface<S: Into<String>>(base: S, method: MethodRef, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Interface,
            base: Some(base.into()),
            method,
            args,
        }
    }

    pub fn new_special<S: Into<String>>(base: S, method: MethodRef, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Special,
            base: Some(base.into()),
            method,
            args,
        }
    }

    pub fn new_static(method: MethodRef, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Static,
            base: None,
            method,
            args,
        }
    }

    pub(crate) fn rename_local(&mut self, from: &str, to: &str) {
        if let Some(base) = self.base.as_mut() {
            if base == from {
                *base = to.into();
            }
        }
        for arg in self.args.iter_mut() {
            arg.rename_local(from, to);
        }
    }
}

impl Display for InvokeExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.base {
            Some(base) => write!(f, "{} {}.{}(", self.kind.keyword(), base, self.method)?,
            None => write!(f, "{} {}(", self.kind.keyword(), self.method)?,
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

/// Operand or right hand side of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Local(String),
    Const(Constant),
    New(ClassName),
    InstanceField { base: String, field: FieldRef },
    StaticField(FieldRef),
    Invoke(InvokeExpr),
    /// Any other expression, kept in rendered form
    Expr(String),
}

impl Value {
    pub fn local<S: Into<String>>(name: S) -> Self {
        Self::Local(name.into())
    }

    pub fn as_local(&self) -> Option<&str> {
        match self {
            Self::Local(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Static type of the value in the context of `body`, if known
    pub fn ty(&self, body: &Body) -> Option<Type> {
        match self {
            Self::Local(name) => body.local(name).map(|it| it.ty.clone()),
            Self::Const(c) => Some(c.ty()),
            Self::New(cn) => Some(Type::Ref(cn.clone())),
            Self::InstanceField { field, .. } | Self::StaticField(field) => Some(field.ty.clone()),
            Self::Invoke(expr) => Some(expr.method.sig.ret.clone()),
            Self::Expr(_) => None,
        }
    }

    pub(crate) fn rename_local(&mut self, from: &str, to: &str) {
        match self {
            Self::Local(name) => {
                if name == from {
                    *name = to.into();
                }
            }
            Self::InstanceField { base, .. } => {
                if base == from {
                    *base = to.into();
                }
            }
            Self::Invoke(expr) => expr.rename_local(from, to),
            Self::Expr(raw) => *raw = rename_in_text(raw, from, to),
            Self::Const(_) | Self::New(_) | Self::StaticField(_) => {}
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(name) => f.write_str(name),
            Self::Const(c) => write!(f, "{}", c),
            Self::New(cn) => write!(f, "new {}", cn),
            Self::InstanceField { base, field } => write!(f, "{}.{}", base, field),
            Self::StaticField(field) => write!(f, "{}", field),
            Self::Invoke(expr) => write!(f, "{}", expr),
            Self::Expr(raw) => f.write_str(raw),
        }
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Self::Const(c)
    }
}

impl From<InvokeExpr> for Value {
    fn from(expr: InvokeExpr) -> Self {
        Self::Invoke(expr)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether a `<` followed by `next` starts a `<a.B: ...>` member reference
/// rather than a comparison or a shift
pub(crate) fn opens_member_ref(next: Option<char>) -> bool {
    next.map_or(false, |n| is_ident_char(n) && !n.is_ascii_digit())
}

/// Replace whole-identifier occurrences of `from` in rendered text, leaving
/// string literals and `<...>` member references alone
pub(crate) fn rename_in_text(text: &str, from: &str, to: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut ident = String::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut ref_depth = 0usize;

    let flush = |ident: &mut String, out: &mut String| {
        if ident == from {
            out.push_str(to);
        } else {
            out.push_str(ident);
        }
        ident.clear();
    };

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if ref_depth > 0 {
            out.push(c);
            match c {
                '<' => ref_depth += 1,
                '>' => ref_depth -= 1,
                _ => {}
            }
            continue;
        }
        if is_ident_char(c) {
            ident.push(c);
            continue;
        }
        flush(&mut ident, &mut out);
        match c {
            '"' => in_string = true,
            '<' if opens_member_ref(chars.get(i + 1).copied()) => ref_depth = 1,
            _ => {}
        }
        out.push(c);
    }
    flush(&mut ident, &mut out);
    out
}
