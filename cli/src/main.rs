use anyhow::Context as AnyhowContext;
use clap::{Parser, Subcommand};
use flexi_logger::{LevelFilter, LogSpecification, Logger, LoggerHandle};

use droidinject::DefaultContext;

mod parsers;
mod printer;

mod inject;
use inject::Inject;

mod replace_type;
use replace_type::ReplaceType;

mod wrap_args;
use wrap_args::WrapArgs;

mod manifest;
use manifest::{AddFile, AdaptManifest, ReplaceManifest};

mod apktool;
use apktool::{Build, Decode};

const SIMPLE_VERSION_STRING: &'static str =
    include!(concat!(env!("OUT_DIR"), "/simple_version_string"));
const VERSION_STRING: &'static str = include!(concat!(env!("OUT_DIR"), "/version_string"));

#[derive(Parser)]
#[command(name = "droidinject")]
#[command(version(SIMPLE_VERSION_STRING))]
#[command(long_version(VERSION_STRING))]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    debug: bool,

    /// Enable trace logging, wins over `--debug`
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    trace: bool,

    /// Log spec for flexi_logger, overrides `--debug` and `--trace`
    #[arg(short = 's', long)]
    log_spec: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the full version string and exit
    #[command()]
    Version,

    /// Make the main activity's creation method call every listener
    ///
    /// Listener fields of the activity get their callbacks invoked and the
    /// `android:onClick` handlers found in the decoded layouts are called
    /// before the method returns.
    #[command()]
    Inject(Inject),

    /// Replace a class by one of its subclasses in a single method
    #[command()]
    ReplaceType(ReplaceType),

    /// Route the first argument of calls through a static helper
    #[command()]
    WrapArgs(WrapArgs),

    /// Apply regex replacements to an archive's manifest and rebuild it
    #[command()]
    AdaptManifest(AdaptManifest),

    /// Rebuild an archive with a different manifest
    #[command()]
    ReplaceManifest(ReplaceManifest),

    /// Copy an archive, adding or replacing a single entry
    #[command()]
    AddFile(AddFile),

    /// Decode an archive with the configured decompiler
    #[command()]
    Decode(Decode),

    /// Rebuild a decoded archive
    #[command()]
    Build(Build),
}

impl Cli {
    fn log_spec(&self) -> anyhow::Result<LogSpecification> {
        if let Some(s) = &self.log_spec {
            return LogSpecification::parse(s).with_context(|| format!("parsing log spec {}", s));
        }
        let lvl = if self.trace {
            LevelFilter::Trace
        } else if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        Ok(LogSpecification::builder()
            .default(LevelFilter::Warn)
            .module("droidinject", lvl)
            .build())
    }

    fn configure_loggers(&self) -> anyhow::Result<LoggerHandle> {
        Logger::with(self.log_spec()?)
            .start()
            .with_context(|| "starting logger")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = &cli.command {
        println!("{}", VERSION_STRING);
        return Ok(());
    }

    let log_handle = cli.configure_loggers()?;
    let ctx = DefaultContext::new();

    let res = match &cli.command {
        Commands::Inject(c) => c.run(&ctx),
        Commands::ReplaceType(c) => c.run(),
        Commands::WrapArgs(c) => c.run(),
        Commands::AdaptManifest(c) => c.run(&ctx),
        Commands::ReplaceManifest(c) => c.run(&ctx),
        Commands::AddFile(c) => c.run(),
        Commands::Decode(c) => c.run(&ctx),
        Commands::Build(c) => c.run(&ctx),

        Commands::Version => unreachable!(),
    };

    log_handle.flush();
    res
}
