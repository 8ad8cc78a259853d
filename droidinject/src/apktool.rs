use std::path::{Path, PathBuf};

use log::info;

use crate::command::CommandRunner;
use crate::config::InstrumentConfig;
use crate::utils::{ensure_dir_exists, path_must_str};
use crate::Context;

/// The external decoder/recompiler
pub struct Apktool<'a> {
    program: String,
    prefix_args: Vec<String>,
    runner: &'a dyn CommandRunner,
}

impl<'a> Apktool<'a> {
    /// Resolve the configured decompiler command, bare program names are
    /// looked up through the context
    pub fn new(
        ctx: &dyn Context,
        cfg: &InstrumentConfig,
        runner: &'a dyn CommandRunner,
    ) -> crate::Result<Self> {
        let configured = cfg.decompiler_program();
        let program = if configured.contains(std::path::MAIN_SEPARATOR) {
            configured.to_string()
        } else {
            ctx.get_bin(configured)?
        };
        Ok(Self {
            program,
            prefix_args: cfg.decompiler_args().to_vec(),
            runner,
        })
    }

    fn run(&self, args: &[&str]) -> crate::Result<()> {
        let mut full = self.prefix_args.clone();
        full.extend(args.iter().map(|it| it.to_string()));
        self.runner.run(&self.program, &full)?.err_on_status()?;
        Ok(())
    }

    /// Decode `archive` into `workdir` without disassembling the code
    pub fn decode(&self, archive: &Path, workdir: &Path) -> crate::Result<PathBuf> {
        if let Some(parent) = workdir.parent() {
            ensure_dir_exists(parent)?;
        }
        info!(
            "decoding {} into {}",
            path_must_str(archive),
            path_must_str(workdir)
        );
        self.run(&["d", "-s", "-f", path_must_str(archive), path_must_str(workdir)])?;
        Ok(workdir.join("AndroidManifest.xml"))
    }

    /// Rebuild the decoded tree at `workdir` into `out`
    pub fn build(&self, workdir: &Path, out: &Path) -> crate::Result<()> {
        info!("building {} from {}", path_must_str(out), path_must_str(workdir));
        self.run(&["b", path_must_str(workdir), path_must_str(out)])
    }
}
