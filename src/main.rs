use clap::Parser as ClapParser;
use jqlite::cli::{self, CliError, RunOptions};
use std::{io, path::PathBuf, process};

#[derive(ClapParser)]
#[command(name = "jqlite")]
#[command(about = "jqlite - filter and reshape streams of JSON documents")]
#[command(version)]
struct Cli {
    /// The filter to apply, e.g. '.[] | select(.age >= 18) | {name}'
    filter: String,

    /// Input files, read in order (reads stdin if none are given)
    files: Vec<PathBuf>,

    /// Read every input document into one array and filter that once
    #[arg(short, long)]
    slurp: bool,

    /// Compact output, one document per line
    #[arg(short, long)]
    compact: bool,

    /// Indentation width for pretty output
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=7))]
    indent: u8,

    /// Use `null` as the single input instead of reading any
    #[arg(short, long)]
    null_input: bool,

    /// Stop at the first malformed document or failed evaluation
    #[arg(long)]
    fail_fast: bool,

    /// JSON input given inline instead of files or stdin
    #[arg(short = 'e', long, conflicts_with = "files")]
    input: Option<String>,

    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    let options = RunOptions {
        filter: args.filter,
        files: args.files,
        input: args.input,
        slurp: args.slurp,
        null_input: args.null_input,
        compact: args.compact,
        indent: args.indent as usize,
        fail_fast: args.fail_fast,
    };

    match run(&options) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run(options: &RunOptions) -> Result<i32, CliError> {
    let source = cli::open_input(options, atty::is(atty::Stream::Stdin))?;
    let stdout = io::stdout();
    let summary = cli::execute(options, source, stdout.lock(), &mut io::stderr())?;
    Ok(summary.exit_code())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}
