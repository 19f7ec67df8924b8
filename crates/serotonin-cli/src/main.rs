//! Serotonin compiler CLI.
//!
//! Command-line interface for compiling `.sero` programs to Brainfuck,
//! grounded on the teacher's `clap`-derive `Cli`/`Commands` split in
//! `compiler/src/main.rs`.

mod config;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use tracing::debug;

use config::CompilerConfig;
use error::Result;
use serotonin_core::{Budgets, Name, Term};
use serotonin_syntax::Loader;

#[derive(ClapParser)]
#[command(name = "serotonin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile Serotonin programs to Brainfuck", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Shorthand for `serotonin build <path>` when no subcommand is given.
    path: Option<PathBuf>,

    #[command(flatten)]
    compile: CompileFlags,

    /// Increase log verbosity (-v for info, -vv for debug/trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a `serotonin.toml` config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Args, Clone, Default)]
struct CompileFlags {
    /// Additional library search directory, searched after the default path.
    #[arg(long = "lib-dir", value_name = "DIR")]
    lib_dir: Vec<PathBuf>,

    /// Override the reduction step budget.
    #[arg(long = "max-steps")]
    max_steps: Option<u64>,

    /// Override the staged-evaluation instruction budget.
    #[arg(long = "max-instrs")]
    max_instrs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a program and write its BF output to standard out.
    Build {
        path: PathBuf,
        #[command(flatten)]
        compile: CompileFlags,
    },
    /// Parse and reduce a program, reporting errors, without emitting BF.
    Check {
        path: PathBuf,
        #[command(flatten)]
        compile: CompileFlags,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let outcome = match cli.command {
        Some(Commands::Build { path, compile }) => run_build(&path, &compile, config),
        Some(Commands::Check { path, compile }) => run_check(&path, &compile, config),
        None => match cli.path {
            Some(path) => run_build(&path, &cli.compile, config),
            None => {
                eprintln!("error: no path given; usage: serotonin <build|check> <path>");
                process::exit(2);
            }
        },
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<CompilerConfig> {
    match path {
        Some(path) => CompilerConfig::from_file(path),
        None => Ok(CompilerConfig::new()),
    }
}

fn compile_path(path: &PathBuf, flags: &CompileFlags, file_config: CompilerConfig) -> Result<String> {
    let config = file_config.overlay(flags.lib_dir.clone(), flags.max_steps, flags.max_instrs);
    let entry_dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut loader = Loader::new(entry_dir, &config.lib_dirs);
    let rules = loader.load_entry(path)?;
    debug!(rule_count = rules.len(), "loaded rule set");
    let entry = vec![Term::Call(Name::new("main"))];
    let bf = serotonin_core::compile(rules, entry, config.budgets())?;
    Ok(bf)
}

fn run_build(path: &PathBuf, flags: &CompileFlags, config: CompilerConfig) -> Result<()> {
    let bf = compile_path(path, flags, config)?;
    println!("{bf}");
    Ok(())
}

fn run_check(path: &PathBuf, flags: &CompileFlags, config: CompilerConfig) -> Result<()> {
    compile_path(path, flags, config)?;
    eprintln!("ok: {} compiles cleanly", path.display());
    Ok(())
}
