//! Quill CLI

use clap::{Parser, Subcommand};
use quill::config::{BreakPolicy, Config, NativeFaultPolicy};
use quill::error::report_error;
use quill::interp::OutputSink;
use quill::repl::Repl;
use quill::{CompileError, Session};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quill", version, about = "Quill - a small scripting language")]
struct Cli {
    /// Configuration file (default: quill.toml beside the script, then in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Quill script
    Run {
        /// Source file to run
        file: PathBuf,
        /// How far `break` unwinds
        #[arg(long, value_enum)]
        break_policy: Option<BreakPolicy>,
        /// What a failing native call produces
        #[arg(long, value_enum)]
        native_faults: Option<NativeFaultPolicy>,
    },
    /// Lex, parse and resolve a source file without running it
    Check {
        /// Source file to check
        file: PathBuf,
    },
    /// Parse and dump AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Start an interactive session
    Repl,
}

fn main() {
    let cli = Cli::parse();

    let script = match &cli.command {
        Command::Run { file, .. }
        | Command::Check { file }
        | Command::Parse { file }
        | Command::Tokens { file } => Some(file.as_path()),
        Command::Repl => None,
    };

    let mut config = match Config::resolve(cli.config.as_deref(), script) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.log.level);

    let result = match cli.command {
        Command::Run {
            file,
            break_policy,
            native_faults,
        } => {
            if let Some(policy) = break_policy {
                config.runtime.break_policy = policy;
            }
            if let Some(policy) = native_faults {
                config.runtime.native_faults = policy;
            }
            run_file(&file, &config)
        }
        Command::Check { file } => check_file(&file, &config),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Repl => start_repl(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_source(path: &Path) -> Result<(String, String), CompileError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| CompileError::io_error(format!("{}: {e}", path.display())))?;
    Ok((source, path.display().to_string()))
}

/// Report with source context, then exit non-zero
fn fail(filename: &str, source: &str, error: &CompileError) -> ! {
    if report_error(filename, source, error).is_err() {
        eprintln!("{error}");
    }
    std::process::exit(1);
}

fn run_file(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (source, filename) = read_source(path)?;
    let mut session = Session::new(config, OutputSink::Stdout)?;
    if let Err(e) = session.run(&filename, &source) {
        fail(&filename, &source, &e);
    }
    Ok(())
}

fn check_file(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (source, filename) = read_source(path)?;
    let natives = config.natives.registry()?;
    match quill::driver::check_source(&filename, &source, &natives) {
        Ok(_) => {
            println!("✓ {filename} checks successfully");
            Ok(())
        }
        Err(e) => fail(&filename, &source, &e),
    }
}

fn parse_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (source, filename) = read_source(path)?;

    let tokens = quill::lexer::tokenize(&source)?;
    let ast = quill::parser::parse(&filename, &source, tokens)?;

    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(())
}

fn tokenize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (source, _) = read_source(path)?;

    let tokens = quill::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(())
}

fn start_repl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config, OutputSink::Stdout)?;
    Repl::new(session)?.run()?;
    Ok(())
}
