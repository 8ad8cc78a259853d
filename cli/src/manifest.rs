use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context as AnyhowContext};
use clap::{self, Args};

use crate::parsers::ReplacementValueParser;
use droidinject::command::SystemRunner;
use droidinject::package::{add_file_to_zip, Packager};
use droidinject::Context;

#[derive(Args)]
pub struct AdaptManifest {
    /// Archive to rebuild
    #[arg()]
    apk: PathBuf,

    /// `PATTERN=REPLACEMENT`, only the first match of each pattern is
    /// replaced and replacements apply in the given order
    #[arg(short, long = "replace", value_parser = ReplacementValueParser)]
    replacements: Vec<(String, String)>,
}

impl AdaptManifest {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        if self.replacements.is_empty() {
            bail!("no replacements given");
        }
        let cfg = ctx.get_instrument_config()?;
        let runner = SystemRunner;
        let packager = Packager::new(ctx, &cfg, &runner)?;
        let out = packager.adapt_manifest(&self.apk, &self.replacements)?;
        println!("{}", out.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct ReplaceManifest {
    /// Archive to rebuild
    #[arg()]
    apk: PathBuf,

    /// The new `AndroidManifest.xml`
    #[arg()]
    manifest: PathBuf,
}

impl ReplaceManifest {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let text = fs::read_to_string(&self.manifest)
            .with_context(|| format!("reading {}", self.manifest.display()))?;
        let cfg = ctx.get_instrument_config()?;
        let runner = SystemRunner;
        let packager = Packager::new(ctx, &cfg, &runner)?;
        let out = packager.replace_manifest(&self.apk, &text)?;
        println!("{}", out.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct AddFile {
    /// Archive to copy
    #[arg()]
    apk: PathBuf,

    /// Entry name inside the archive, such as `assets/config.json`
    #[arg()]
    name: String,

    /// File providing the entry's contents
    #[arg()]
    file: PathBuf,
}

impl AddFile {
    pub fn run(&self) -> anyhow::Result<()> {
        let contents =
            fs::read(&self.file).with_context(|| format!("reading {}", self.file.display()))?;
        let out = add_file_to_zip(&self.apk, &self.name, &contents)?;
        println!("{}", out.display());
        Ok(())
    }
}
