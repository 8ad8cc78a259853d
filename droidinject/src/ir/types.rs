use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::{IrError, IrResult};
use crate::utils::ClassName;

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// Type of a local, field, parameter or expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Type of the `null` constant
    Null,
    Ref(ClassName),
    Array(Box<Type>),
}

impl Type {
    pub fn class<S: Into<String>>(name: S) -> Self {
        Self::Ref(ClassName::from(name))
    }

    pub fn array_of(elem: Type) -> Self {
        Self::Array(Box::new(elem))
    }

    /// Parse a Java style type name like `int`, `char[]` or
    /// `android.view.View$OnClickListener`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Some(elem) = s.strip_suffix("[]") {
            return Some(Self::array_of(Self::parse(elem)?));
        }
        Some(match s {
            "void" => Self::Void,
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "null_type" => Self::Null,
            _ => {
                if !s.chars().all(is_class_name_char) {
                    return None;
                }
                Self::class(s)
            }
        })
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Void | Self::Null | Self::Ref(_) | Self::Array(_))
    }

    pub fn is_ref_like(&self) -> bool {
        matches!(self, Self::Null | Self::Ref(_) | Self::Array(_))
    }

    pub fn class_name(&self) -> Option<&ClassName> {
        match self {
            Self::Ref(cn) => Some(cn),
            _ => None,
        }
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.class_name().map_or(false, |it| it == name)
    }

    /// Prefix character used when generating local names for this type
    pub fn local_prefix(&self) -> char {
        match self {
            Self::Boolean => 'z',
            Self::Byte => 'b',
            Self::Char => 'c',
            Self::Short => 's',
            Self::Int => 'i',
            Self::Long => 'l',
            Self::Float => 'f',
            Self::Double => 'd',
            Self::Void => 'v',
            Self::Null | Self::Ref(_) | Self::Array(_) => 'r',
        }
    }
}

fn is_class_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '$' || c == '_'
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Boolean => f.write_str("boolean"),
            Self::Byte => f.write_str("byte"),
            Self::Char => f.write_str("char"),
            Self::Short => f.write_str("short"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Null => f.write_str("null_type"),
            Self::Ref(cn) => write!(f, "{}", cn),
            Self::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

impl FromStr for Type {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| IrError::BadType(s.into()))
    }
}

/// Method subsignature: return type, name and parameter types, rendered as
/// `void onCreate(android.os.Bundle)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSig {
    pub ret: Type,
    pub name: String,
    pub params: Vec<Type>,
}

impl MethodSig {
    pub fn new<S: Into<String>>(ret: Type, name: S, params: Vec<Type>) -> Self {
        Self {
            ret,
            name: name.into(),
            params,
        }
    }

    pub fn parse(s: &str) -> IrResult<Self> {
        let bad = || IrError::BadSignature(s.into());
        let s = s.trim();
        let (ret, rest) = s.split_once(' ').ok_or_else(bad)?;
        let open = rest.rfind('(').ok_or_else(bad)?;
        let (name, params) = rest.split_at(open);
        let params = params
            .strip_prefix('(')
            .and_then(|it| it.strip_suffix(')'))
            .ok_or_else(bad)?;
        let params = if params.trim().is_empty() {
            Vec::new()
        } else {
            params
                .split(',')
                .map(|it| Type::parse(it).ok_or_else(bad))
                .collect::<IrResult<Vec<Type>>>()?
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            ret: Type::parse(ret).ok_or_else(bad)?,
            name: name.into(),
            params,
        })
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl Display for MethodSig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}(", self.ret, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", p)?;
        }
        f.write_str(")")
    }
}

impl FromStr for MethodSig {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MethodSig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reference to a method on a class: `<com.example.Main: void onCreate(android.os.Bundle)>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub class: ClassName,
    pub sig: MethodSig,
}

impl MethodRef {
    pub fn new<C: Into<ClassName>>(class: C, sig: MethodSig) -> Self {
        Self {
            class: class.into(),
            sig,
        }
    }

    pub fn parse(s: &str) -> IrResult<Self> {
        let (class, sig) = split_member_ref(s).ok_or_else(|| IrError::BadSignature(s.into()))?;
        Ok(Self {
            class: ClassName::from(class),
            sig: MethodSig::parse(sig)?,
        })
    }
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}: {}>", self.class, self.sig)
    }
}

impl FromStr for MethodRef {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MethodRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reference to a field: `<com.example.Main: android.view.View$OnClickListener listener>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub class: ClassName,
    pub ty: Type,
    pub name: String,
}

impl FieldRef {
    pub fn parse(s: &str) -> IrResult<Self> {
        let bad = || IrError::BadSignature(s.into());
        let (class, rest) = split_member_ref(s).ok_or_else(bad)?;
        let (ty, name) = rest.trim().rsplit_once(' ').ok_or_else(bad)?;
        Ok(Self {
            class: ClassName::from(class),
            ty: Type::parse(ty).ok_or_else(bad)?,
            name: name.into(),
        })
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}: {} {}>", self.class, self.ty, self.name)
    }
}

/// Splits `<Class: rest>` into `("Class", "rest")`
fn split_member_ref(s: &str) -> Option<(&str, &str)> {
    let inner = s.trim().strip_prefix('<')?.strip_suffix('>')?;
    let (class, rest) = inner.split_once(": ")?;
    Some((class.trim(), rest))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_types() {
        assert_eq!(Type::parse("int"), Some(Type::Int));
        assert_eq!(Type::parse("char[]"), Some(Type::array_of(Type::Char)));
        assert_eq!(
            Type::parse("java.lang.String[][]"),
            Some(Type::array_of(Type::array_of(Type::class("java.lang.String"))))
        );
        assert_eq!(
            Type::parse("android.view.View$OnClickListener"),
            Some(Type::class("android.view.View$OnClickListener"))
        );
        assert_eq!(Type::parse("r0 + 1"), None);
        assert_eq!(Type::parse(""), None);
    }

    #[test]
    fn test_type_display() {
        let t = Type::array_of(Type::class("java.lang.String"));
        assert_eq!(t.to_string(), "java.lang.String[]");
        assert_eq!(Type::Boolean.to_string(), "boolean");
    }

    #[test]
    fn test_method_sig() {
        let sig = MethodSig::parse("void onCreate(android.os.Bundle)").unwrap();
        assert_eq!(sig.ret, Type::Void);
        assert_eq!(sig.name, "onCreate");
        assert_eq!(sig.params, vec![Type::class("android.os.Bundle")]);
        assert_eq!(sig.to_string(), "void onCreate(android.os.Bundle)");

        let sig = MethodSig::parse("boolean onKey(android.view.View, int,android.view.KeyEvent)")
            .unwrap();
        assert_eq!(sig.params.len(), 3);
        assert_eq!(
            sig.to_string(),
            "boolean onKey(android.view.View,int,android.view.KeyEvent)"
        );

        let ctor = MethodSig::parse("void <init>()").unwrap();
        assert!(ctor.is_constructor());
        assert!(ctor.params.is_empty());

        assert!(MethodSig::parse("onCreate").is_err());
        assert!(MethodSig::parse("void (int)").is_err());
    }

    #[test]
    fn test_member_refs() {
        let m = MethodRef::parse("<com.example.Main: void <init>(int,char[])>").unwrap();
        assert_eq!(m.class, "com.example.Main");
        assert!(m.sig.is_constructor());
        assert_eq!(m.to_string(), "<com.example.Main: void <init>(int,char[])>");

        let f = FieldRef::parse("<com.example.Main: android.view.View$OnClickListener listener>")
            .unwrap();
        assert_eq!(f.name, "listener");
        assert_eq!(f.ty, Type::class("android.view.View$OnClickListener"));
        assert_eq!(
            f.to_string(),
            "<com.example.Main: android.view.View$OnClickListener listener>"
        );
    }
}
