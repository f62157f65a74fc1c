//! The `mf` command-line interface for the Mellifera language.

use clap::Parser;
use mellifera_cli::stdlib;
use mellifera_eval::{dump, CombEncoder, Context, Environment, SourceError, Value};
use mellifera_syntax::{Lexer, ParseError, SourceLocation};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mf", version)]
#[command(about = "The Mellifera programming language", long_about = None)]
struct Cli {
    /// Execute the provided command
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    command: Option<String>,

    /// Dump a comb-encoded vector of lexed tokens to stdout
    #[arg(long)]
    dump_tokens: bool,

    /// Dump the comb-encoded AST to stdout
    #[arg(long)]
    dump_ast: bool,

    /// Source file, followed by arguments exposed to the program as `argv`
    #[arg(value_name = "FILE", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Failure reported by the CLI. Parse and runtime errors carry their own
/// rendering rules.
#[derive(Debug, Error)]
enum CliError {
    #[error("error: failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("error: {0}")]
    Usage(String),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Runtime(mellifera_eval::Error),

    #[error("error: {0}")]
    Comb(#[from] mellifera_eval::CombError),
}

impl From<SourceError> for CliError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Parse(error) => CliError::Parse(error),
            SourceError::Runtime(error) => CliError::Runtime(error),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Runtime(error)) => {
            render_runtime_error(&error);
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

/// Render a runtime error with its call trace.
fn render_runtime_error(error: &mellifera_eval::Error) {
    match &error.location {
        Some(location) => eprintln!("[{location}] error: {error}"),
        None => eprintln!("error: {error}"),
    }
    for frame in &error.trace {
        let function = frame.function.to_string();
        match &frame.location {
            Some(location) => eprintln!("...within {function} called from {location}"),
            None => eprintln!("...within {function}"),
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let (source, location, argv) = if let Some(command) = &cli.command {
        let mut argv = vec!["mf".to_string()];
        argv.extend(cli.args.iter().cloned());
        (
            command.clone(),
            SourceLocation::file("<command>"),
            argv,
        )
    } else if let Some(file) = cli.args.first() {
        let source = std::fs::read_to_string(file).map_err(|error| CliError::Io {
            path: file.clone(),
            message: error.to_string(),
        })?;
        (source, SourceLocation::file(file), cli.args.clone())
    } else if cli.dump_tokens || cli.dump_ast {
        return Err(CliError::Usage(
            "requested token dump without a command or file path".to_string(),
        ));
    } else {
        return Err(CliError::Usage("REPL not implemented".to_string()));
    };

    if cli.dump_tokens {
        let tokens = Lexer::new(&source, Some(location)).tokenize()?;
        return print_comb(&dump::tokens_into_value(&tokens));
    }

    let program = mellifera_syntax::parse(&source, Some(location))?;
    if cli.dump_ast {
        return print_comb(&dump::program_into_value(&program));
    }

    let ctx = Context::new();
    stdlib::install(&ctx)?;
    let env = Environment::with_outer(ctx.base_environment().clone());
    env.declare(
        "argv",
        Value::vector(argv.iter().map(Value::string).collect()),
    );
    mellifera_eval::eval_program(&ctx, &program, &env).map_err(CliError::Runtime)?;
    Ok(())
}

/// Comb-encode a value at four-space indent and print it.
fn print_comb(value: &Value) -> Result<(), CliError> {
    let mut buffer = Vec::new();
    let mut encoder = CombEncoder::new(&mut buffer, Some("    "));
    value.comb_encode(&mut encoder)?;
    println!("{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
