//! Panc CLI, the command-line front end of the pan configuration compiler.
//!
//! Provides `panc build` to compile object templates into machine profiles,
//! `panc check` to verify template syntax without building anything, and
//! `panc outdated` to list object templates whose profiles must be rebuilt.

#![warn(missing_docs)]

mod build;
mod check;
mod outdated;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use panc_config::OutputFormat;

/// Panc, a parallel compiler for pan configuration templates.
#[derive(Parser, Debug)]
#[command(name = "panc", version, about = "Pan Configuration Compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `panc.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile object templates and write their profiles.
    Build(BuildArgs),
    /// Check template syntax only.
    Check(CheckArgs),
    /// List object templates whose profiles are out of date.
    Outdated(OutdatedArgs),
}

/// Search path and output overrides shared by every command.
#[derive(Parser, Debug, Default)]
pub struct PathArgs {
    /// Include directory; replaces `paths.include` from `panc.toml`. May be
    /// given several times, searched in order.
    #[arg(short = 'I', long = "include")]
    pub include: Vec<String>,

    /// Session directory consulted before the include directories.
    #[arg(long)]
    pub session: Option<String>,

    /// Directory receiving profiles and dependency files.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Profile formats to write; replaces `output.formats`.
    #[arg(short, long, num_args = 1..)]
    pub format: Vec<OutputFormat>,
}

/// Arguments for the `panc build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Template files to compile. Without files or `--object` names every
    /// object template under the include directories is built.
    pub files: Vec<String>,

    /// Object template to build by name, looked up on the include path.
    #[arg(long = "object", num_args = 1..)]
    pub objects: Vec<String>,

    /// Skip objects whose profiles are newer than every dependency.
    #[arg(long)]
    pub incremental: bool,

    /// Worker threads per stage; 0 uses every available CPU.
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Regular expression of dependency names ignored by `--incremental`.
    #[arg(long)]
    pub ignore_dependencies: Option<String>,

    /// Gzip profile files.
    #[arg(long)]
    pub gzip: bool,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub paths: PathArgs,
}

/// Arguments for the `panc check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Template files to check. Defaults to every template under the include
    /// directories.
    pub files: Vec<String>,

    /// Worker threads; 0 uses every available CPU.
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub paths: PathArgs,
}

/// Arguments for the `panc outdated` subcommand.
#[derive(Parser, Debug)]
pub struct OutdatedArgs {
    /// Object template files to check. Defaults to every object template
    /// under the include directories.
    pub files: Vec<String>,

    /// Regular expression of dependency names to ignore.
    #[arg(long)]
    pub ignore_dependencies: Option<String>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub paths: PathArgs,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::Outdated(ref args) => outdated::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(global: &GlobalArgs) {
    let fallback = default_log_filter(global);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(global.color)
        .with_writer(std::io::stderr)
        .init();
}

fn default_log_filter(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "warn"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    }
}

/// Rough terminal detection: checks the TERM env var.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok()
}
