use std::path::PathBuf;

use clap::{self, Args};

use droidinject::command::SystemRunner;
use droidinject::package::Packager;
use droidinject::Context;

#[derive(Args)]
pub struct Decode {
    /// Archive to decode
    #[arg()]
    apk: PathBuf,

    /// Output directory, replaced if it exists
    #[arg()]
    workdir: PathBuf,
}

impl Decode {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let cfg = ctx.get_instrument_config()?;
        let runner = SystemRunner;
        let manifest = Packager::new(ctx, &cfg, &runner)?.decode(&self.apk, &self.workdir)?;
        println!("{}", manifest.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct Build {
    /// Decoded archive directory
    #[arg()]
    workdir: PathBuf,

    /// Archive to write
    #[arg()]
    apk: PathBuf,
}

impl Build {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let cfg = ctx.get_instrument_config()?;
        let runner = SystemRunner;
        Packager::new(ctx, &cfg, &runner)?.build(&self.workdir, &self.apk)?;
        Ok(())
    }
}
