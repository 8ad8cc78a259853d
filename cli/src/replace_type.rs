use std::path::PathBuf;

use clap::{self, Args};

use crate::parsers::MethodRefValueParser;
use crate::printer::Report;
use droidinject::instrument::replace_type;
use droidinject::ir::{MethodRef, Scene};

#[derive(Args)]
pub struct ReplaceType {
    /// Directory containing the `.jimple` classes
    #[arg(short, long)]
    classes: PathBuf,

    /// Directory the rewritten classes are written to
    #[arg(short, long)]
    out: PathBuf,

    /// Method whose body is rewritten
    #[arg(short, long, value_parser = MethodRefValueParser)]
    method: MethodRef,

    /// Fully qualified class being replaced
    #[arg(long)]
    old: String,

    /// Fully qualified subclass used instead
    #[arg(long)]
    new: String,

    /// Print the report as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

impl ReplaceType {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut scene = Scene::load_dir(&self.classes)?;
        let report = scene.rewrite_body(&self.method, |body, scene| {
            replace_type(body, scene, &self.old, &self.new)
        })?;
        scene.dump_dir(&self.out)?;
        report.print(self.json)
    }
}
