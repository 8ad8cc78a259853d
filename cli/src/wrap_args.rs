use std::path::PathBuf;

use clap::{self, Args};

use crate::parsers::{MethodRefValueParser, TypeValueParser};
use droidinject::instrument::wrap_first_argument;
use droidinject::ir::{MethodRef, Scene, Type};

#[derive(Args)]
pub struct WrapArgs {
    /// Directory containing the `.jimple` classes
    #[arg(short, long)]
    classes: PathBuf,

    /// Directory the rewritten classes are written to
    #[arg(short, long)]
    out: PathBuf,

    /// Method whose calls are rewritten
    #[arg(short, long, value_parser = MethodRefValueParser)]
    method: MethodRef,

    /// Static method taking and returning the argument type
    #[arg(long, value_parser = MethodRefValueParser)]
    helper: MethodRef,

    /// Only first arguments of this type are wrapped, `char[]` for example
    #[arg(short = 'a', long, value_parser = TypeValueParser)]
    arg_type: Type,
}

impl WrapArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        if !self.helper.sig.params.contains(&self.arg_type) {
            log::warn!("{} does not take a {}", self.helper, self.arg_type);
        }
        let mut scene = Scene::load_dir(&self.classes)?;
        let wrapped = scene.rewrite_body(&self.method, |body, _| {
            wrap_first_argument(body, &self.helper, |ty| *ty == self.arg_type)
        })?;
        scene.dump_dir(&self.out)?;
        println!("wrapped {} arguments in {}", wrapped, self.method);
        Ok(())
    }
}
