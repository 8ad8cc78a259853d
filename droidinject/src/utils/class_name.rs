use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Borrow;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Fully qualified Java class name as it appears in the IR, e.g.
/// `android.view.View$OnClickListener`
#[derive(Eq, PartialEq, Hash, Debug, Clone, Ord, PartialOrd)]
pub struct ClassName {
    name: String,
}

impl<T: Into<String>> From<T> for ClassName {
    fn from(value: T) -> Self {
        Self::new(value.into())
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        self.name.as_str()
    }
}

impl Borrow<str> for ClassName {
    fn borrow(&self) -> &str {
        self.name.as_str()
    }
}

impl AsRef<ClassName> for ClassName {
    fn as_ref(&self) -> &ClassName {
        self
    }
}

impl ClassName {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    /// Get a ClassName from a Manifest entry of the form pkg/class
    /// after it's been split.
    ///
    /// There are two scenarios for Manifest entries like this:
    ///
    /// - com.foo.bar/foo.bar.Baz
    /// - com.foo.bar/.Baz
    ///
    /// These entries would represent classes named foo.bar.Baz and
    /// com.foo.bar.Baz respectively.
    pub fn from_split_manifest(pkg: &str, name: &str) -> Self {
        if name.starts_with('.') {
            Self::new(format!("{}{}", pkg, name))
        } else {
            Self::new(String::from(name))
        }
    }

    /// Checks to see if the class has a package
    pub fn has_pkg(&self) -> bool {
        self.name.trim_start_matches('.').contains('.')
    }

    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }

    /// Get the simple class name, inner class separators are kept
    pub fn get_simple_class_name(&self) -> &str {
        let idx = match self.name.rfind('.') {
            Some(i) => i + 1,
            None => 0,
        };
        let (_, name) = self.name.as_str().split_at(idx);
        name
    }

    /// Gets the class package, empty for the default package
    pub fn package(&self) -> &str {
        let end = self.name.rfind('.').unwrap_or(0);
        let (pkg, _) = self.name.as_str().split_at(end);
        pkg
    }

    /// The outer class if this is a nested class (`Outer$Inner`)
    pub fn outer_class(&self) -> Option<ClassName> {
        let idx = self.name.rfind('$')?;
        let (outer, _) = self.name.split_at(idx);
        Some(ClassName::from(outer))
    }
}

impl Serialize for ClassName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.name.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClassName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(ClassName::new(String::deserialize(deserializer)?))
    }
}

impl FromStr for ClassName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ClassName::from(s))
    }
}

impl PartialEq<str> for ClassName {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for ClassName {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl Display for ClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
