use std::path::PathBuf;

use clap::{self, Args};

use crate::parsers::MethodRefValueParser;
use crate::printer::Report;
use droidinject::ir::MethodRef;
use droidinject::package::{inject_classes, InjectJob};
use droidinject::{Context, ListenerRegistry};

#[derive(Args)]
pub struct Inject {
    /// Directory containing the `.jimple` classes
    #[arg(short, long)]
    classes: PathBuf,

    /// Directory the instrumented classes are written to
    #[arg(short, long)]
    out: PathBuf,

    /// Decoded archive providing the manifest and the layouts
    ///
    /// Without it no click handlers are called and the entry points must be
    /// given with `--entry`.
    #[arg(long)]
    decoded: Option<PathBuf>,

    /// Entry point such as `<a.Main: void onCreate(android.os.Bundle)>`,
    /// replaces the main activities from the manifest
    #[arg(short, long = "entry", value_parser = MethodRefValueParser)]
    entries: Vec<MethodRef>,

    /// Print the outcome as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

impl Inject {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let cfg = ctx.get_instrument_config()?;
        let registry = ListenerRegistry::android_view();
        let job = InjectJob {
            classes: &self.classes,
            out: &self.out,
            decoded: self.decoded.as_deref(),
            entry_points: self.entries.clone(),
        };
        let outcome = inject_classes(&job, &cfg, &registry)?;
        outcome.print(self.json)
    }
}
