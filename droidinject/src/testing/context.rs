use std::collections::HashMap;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::env;

use anyhow::Context as AnyhowContext;
use mockall::mock;
use once_cell::sync::OnceCell;
use rand::Rng;
use rstest::fixture;

use crate::config::Config;
use crate::utils::ensure_dir_exists;
use crate::Context;

#[fixture]
pub fn tmp_context() -> TestContext {
    TestContext::default()
}

#[fixture]
pub fn mock_context() -> MockContext {
    MockContext::new()
}

pub struct TestContext {
    base_dir: PathBuf,
    env: HashMap<String, String>,
    bins: HashMap<String, String>,
    project_config: OnceCell<Option<Config>>,
}

pub enum TreeEntry<'a> {
    Dir,
    TxtFile(&'a str),
}

impl TestContext {
    pub fn set_env<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self {
        self.env.insert(key.as_ref().into(), value.as_ref().into());
        self
    }

    pub fn set_bin<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, bin: V) -> &mut Self {
        self.bins.insert(key.as_ref().into(), bin.as_ref().into());
        self
    }

    /// Create a collection of files with the given names and contents
    ///
    /// The tree is rooted at the base directory
    pub fn create_tree(&self, tree: &[(&str, TreeEntry)]) -> anyhow::Result<()> {
        for (relative, content) in tree {
            let file = self.base_dir.join(relative);
            if let Some(parent) = file.parent() {
                if !parent.exists() {
                    create_dir_all(parent)
                        .with_context(|| format!("creating parent dirs for {relative}"))?;
                }
            }

            match content {
                TreeEntry::Dir => {
                    create_dir_all(&file).with_context(|| format!("creating dir {relative}"))?
                }
                TreeEntry::TxtFile(content) => fs::write(&file, content)
                    .with_context(|| format!("writing content to {relative}"))?,
            }
        }
        Ok(())
    }

    pub fn to_abs<P: AsRef<Path> + ?Sized>(&self, path: &P) -> PathBuf {
        self.base_dir.join(path)
    }

    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let td = &self.base_dir;
        if td.exists() {
            _ = fs::remove_dir_all(td);
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        let mut rng = rand::thread_rng();
        let rand_name: u64 = rng.gen();
        let td = env::temp_dir().join(format!("droidinject_test_base_{}", rand_name));

        if td.exists() {
            fs::remove_dir_all(&td).expect("failed to clear test dir");
        }

        ensure_dir_exists(&td).expect("failed to create default test dir");

        Self {
            base_dir: td,
            env: HashMap::new(),
            bins: HashMap::new(),
            project_config: OnceCell::new(),
        }
    }
}

impl Context for TestContext {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        self.env.get(key).map(String::from)
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        self.bins.get(bin).map(String::from)
    }

    fn get_user_config_dir(&self) -> crate::Result<PathBuf> {
        Ok(self.base_dir.join("config"))
    }

    fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>> {
        let cfg = self
            .project_config
            .get_or_try_init(|| -> crate::Result<Option<Config>> {
                match self.get_project_config_file()? {
                    Some(path) => Ok(Some(Config::parse(&path)?)),
                    None => Ok(None),
                }
            })?;
        Ok(cfg.as_ref())
    }
}

mock! {
    pub Context {}

    impl crate::Context for Context {
        fn maybe_get_env(&self, key: &str) -> Option<String>;
        fn maybe_get_bin(&self, bin: &str) -> Option<String>;
        fn get_project_config<'a>(&'a self) -> crate::Result<Option<&'a Config>>;
    }
}
