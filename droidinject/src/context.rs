use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

use blanket::blanket;
use directories::BaseDirs;
use once_cell::sync::OnceCell;
use which::{which, which_in};

use crate::config::{Config, InstrumentConfig};
use crate::Error;

pub const CONFIG_FILE_NAME: &str = "droidinject.toml";
pub const CONFIG_ENV: &str = "DROIDINJECT_CONFIG";
pub const PATH_ENV: &str = "DROIDINJECT_PATH";

#[derive(Clone)]
struct CachedBin {
    name: String,
    path: String,
}

fn wrapped_which(bin: &str) -> Option<PathBuf> {
    if let Ok(search_path) = env::var(PATH_ENV) {
        let cwd = env::current_dir().ok()?;
        return which_in(bin, Some(&search_path), &cwd).ok();
    }
    which(bin).ok()
}

fn find_program(prog: &str) -> Option<String> {
    wrapped_which(prog).map(|it| it.to_string_lossy().into())
}

/// Context is a trait for an object that can find binaries, lookup env vars
/// and locate the project configuration.
///
/// Most methods on this trait have a default implementation that is perfectly
/// safe to leave unchanged.
#[blanket(derive(Ref, Box))]
pub trait Context: Send + Sync {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        find_program(bin)
    }

    fn has_bin(&self, bin: &str) -> bool {
        self.maybe_get_bin(bin).is_some()
    }

    fn get_bin(&self, bin: &str) -> crate::Result<String> {
        self.maybe_get_bin(bin)
            .ok_or_else(|| Error::MissingBin(bin.into()))
    }

    fn get_env(&self, key: &str) -> crate::Result<String> {
        self.maybe_get_env(key)
            .ok_or_else(|| Error::MissingEnv(key.into()))
    }

    fn get_user_config_dir(&self) -> crate::Result<PathBuf> {
        let bd = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(bd.config_dir().join("droidinject"))
    }

    /// Locate the configuration file
    ///
    /// `DROIDINJECT_CONFIG` wins and must point to an existing file,
    /// otherwise `./droidinject.toml` and then the user config directory
    /// are tried.
    fn get_project_config_file(&self) -> crate::Result<Option<PathBuf>> {
        if let Some(path) = self.maybe_get_env(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(Error::MissingFile(path.to_string_lossy().into()));
            }
            return Ok(Some(path));
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(Some(local));
        }
        let user = self.get_user_config_dir()?.join(CONFIG_FILE_NAME);
        Ok(if user.exists() { Some(user) } else { None })
    }

    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>>;

    fn get_instrument_config(&self) -> crate::Result<InstrumentConfig> {
        InstrumentConfig::from_config(self.get_project_config()?)
    }
}

pub struct DefaultContext {
    bin_cache: Mutex<Vec<CachedBin>>,
    project_config: OnceCell<Option<Config>>,
}

impl Clone for DefaultContext {
    fn clone(&self) -> Self {
        let cache = match self.bin_cache.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            bin_cache: Mutex::new(cache),
            project_config: self.project_config.clone(),
        }
    }
}

impl DefaultContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self {
            bin_cache: Mutex::new(Vec::new()),
            project_config: OnceCell::new(),
        }
    }
}

impl Context for DefaultContext {
    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>> {
        let cfg = self
            .project_config
            .get_or_try_init(|| -> crate::Result<Option<Config>> {
                match self.get_project_config_file()? {
                    Some(path) => {
                        log::debug!("using config file {}", path.to_string_lossy());
                        Ok(Some(Config::parse(&path)?))
                    }
                    None => Ok(None),
                }
            })?;
        Ok(cfg.as_ref())
    }

    fn maybe_get_bin(&self, prog: &str) -> Option<String> {
        let mut cache = match self.bin_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = cache.iter().find(|it| it.name == prog) {
            return Some(hit.path.clone());
        }

        let found = find_program(prog)?;

        cache.push(CachedBin {
            name: prog.into(),
            path: found.clone(),
        });

        Some(found)
    }
}
