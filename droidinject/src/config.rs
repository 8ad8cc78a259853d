use std::borrow::Cow;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::command::split;
use crate::instrument::creation_signature;
use crate::ir::MethodSig;
use crate::utils::{path_must_str, read_file};

#[derive(Debug)]
pub enum Error {
    InvalidType,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::InvalidType => "InvalidType",
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct ConfigMap<'c> {
    path: &'c Path,
    name: Option<Cow<'c, str>>,
    table: &'c Table,
}

/// Parsed `droidinject.toml`
#[derive(Clone, Debug)]
pub struct Config {
    path: PathBuf,
    base: Table,
}

impl Config {
    pub fn parse(source: &Path) -> crate::Result<Self> {
        let as_str = read_file(source)?;
        Self::parse_str(source, &as_str)
    }

    pub fn parse_str(source: &Path, content: &str) -> crate::Result<Self> {
        let base: Table = match toml::from_str(content) {
            Ok(v) => v,
            Err(e) => return Err(crate::Error::new_cfg(source, &e)),
        };
        Ok(Self {
            base,
            path: PathBuf::from(source),
        })
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_map(&self) -> ConfigMap {
        ConfigMap {
            name: None,
            path: &self.path,
            table: &self.base,
        }
    }
}

impl<'c> ConfigMap<'c> {
    fn key_path<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self.name.as_deref() {
            None => Cow::Borrowed(key),
            Some(v) => Cow::Owned(format!("{}.{}", v, key)),
        }
    }

    /// Helper to create a crate::Error for an invalid key
    pub fn invalid_key(&self, key: &str, expected: &str) -> crate::Error {
        let path = self.key_path(key);
        crate::Error::InvalidConfig(
            path_must_str(self.path).into(),
            format!(
                "invalid value for key: {} (expected type: {})",
                path, expected
            ),
        )
    }

    pub fn has(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&'c Value> {
        self.table.get(key)
    }

    pub fn maybe_get_str(&self, key: &str) -> Result<Option<&'c str>> {
        match self.get(key) {
            Some(v) => match v.as_str() {
                Some(v) => Ok(Some(v)),
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn maybe_get_str_typecheck(&self, key: &str) -> crate::Result<Option<&'c str>> {
        self.maybe_get_str(key)
            .map_err(|_| self.invalid_key(key, "string"))
    }

    pub fn maybe_get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            Some(v) => v.as_bool().map(Some).ok_or(Error::InvalidType),
            None => Ok(None),
        }
    }

    pub fn maybe_get_map(&self, key: &'c str) -> Result<Option<ConfigMap<'c>>> {
        match self.get(key) {
            Some(v) => match v.as_table() {
                Some(table) => {
                    let name = match self.name.as_deref() {
                        Some(parents) => Cow::Owned(format!("{parents}.{key}")),
                        None => Cow::Borrowed(key),
                    };
                    Ok(Some(Self {
                        name: Some(name),
                        path: self.path,
                        table,
                    }))
                }
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn maybe_get_map_typecheck(&self, key: &'c str) -> crate::Result<Option<ConfigMap<'c>>> {
        self.maybe_get_map(key)
            .map_err(|_| self.invalid_key(key, "table"))
    }
}

pub const DEFAULT_DECOMPILER: &str = "apktool";

/// Settings for an instrumentation run
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    /// Decoder/recompiler command line, the first element is the program
    pub decompiler: Vec<String>,
    /// Where archives are decoded, a temporary directory when unset
    pub workdir: Option<PathBuf>,
    /// Remove the decode directory once the archive has been rebuilt
    pub cleanup: bool,
    pub creation_signature: MethodSig,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            decompiler: vec![DEFAULT_DECOMPILER.into()],
            workdir: None,
            cleanup: true,
            creation_signature: creation_signature(),
        }
    }
}

impl InstrumentConfig {
    /// Read the recognised keys from a config map, anything missing keeps
    /// its default
    pub fn from_map(map: &ConfigMap) -> crate::Result<Self> {
        let mut cfg = Self::default();

        if let Some(cmd) = map.maybe_get_str_typecheck("decompiler")? {
            cfg.decompiler = match split(cmd) {
                Some(v) if !v.is_empty() => v,
                _ => return Err(map.invalid_key("decompiler", "command line")),
            };
        }

        if let Some(dir) = map.maybe_get_str_typecheck("workdir")? {
            cfg.workdir = Some(PathBuf::from(dir));
        }

        if map.has("cleanup") {
            cfg.cleanup = map
                .maybe_get_bool("cleanup")
                .map_err(|_| map.invalid_key("cleanup", "bool"))?
                .unwrap_or(true);
        }

        if let Some(instrument) = map.maybe_get_map_typecheck("instrument")? {
            if let Some(sig) = instrument.maybe_get_str_typecheck("creation_signature")? {
                cfg.creation_signature = MethodSig::parse(sig)
                    .map_err(|_| instrument.invalid_key("creation_signature", "method signature"))?;
            }
        }

        Ok(cfg)
    }

    pub fn from_config(config: Option<&Config>) -> crate::Result<Self> {
        match config {
            Some(cfg) => Self::from_map(&cfg.get_map()),
            None => Ok(Self::default()),
        }
    }

    pub fn decompiler_program(&self) -> &str {
        self.decompiler
            .first()
            .map_or(DEFAULT_DECOMPILER, |it| it.as_str())
    }

    pub fn decompiler_args(&self) -> &[String] {
        self.decompiler.get(1..).unwrap_or(&[])
    }
}
