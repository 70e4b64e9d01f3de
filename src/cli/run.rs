//! Run a filter over the configured inputs

use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read, Write},
    iter,
    path::PathBuf,
};

use tracing::{debug, info};

use super::CliError;
use crate::{
    CancelToken, Documents, Emitter, Engine, Error, JsonPrinter, OnError, ReadError,
    ReaderOptions, Source, Value, compile,
};

/// Options for a single invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// The filter expression
    pub filter: String,
    /// Input files, read in order as one stream
    pub files: Vec<PathBuf>,
    /// Inline JSON input, used instead of files/stdin
    pub input: Option<String>,
    /// Collect every input document into one array
    pub slurp: bool,
    /// Run the filter once against `null`
    pub null_input: bool,
    /// Compact instead of pretty output
    pub compact: bool,
    /// Indentation width for pretty output
    pub indent: usize,
    /// Stop at the first malformed document or failed evaluation
    pub fail_fast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            filter: ".".to_string(),
            files: vec![],
            input: None,
            slurp: false,
            null_input: false,
            compact: false,
            indent: 2,
            fail_fast: false,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Values written to the output sink
    pub emitted: usize,
    /// Malformed documents and failed evaluations reported on stderr
    pub errors: usize,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        if self.errors > 0 { 3 } else { 0 }
    }
}

/// Choose the byte source for `options`.
///
/// `stdin_is_tty` decides whether stdin may be used when nothing else is
/// given.
pub fn open_input(options: &RunOptions, stdin_is_tty: bool) -> Result<Box<dyn Read>, CliError> {
    if options.null_input {
        return Ok(Box::new(io::empty()));
    }
    if let Some(input) = &options.input {
        return Ok(Box::new(Cursor::new(input.clone().into_bytes())));
    }
    if !options.files.is_empty() {
        let mut reader: Box<dyn Read> = Box::new(io::empty());
        for path in &options.files {
            let file = File::open(path).map_err(|source| CliError::Open {
                path: path.clone(),
                source,
            })?;
            reader = Box::new(reader.chain(file));
        }
        return Ok(reader);
    }
    if stdin_is_tty {
        return Err(CliError::NoInput);
    }
    Ok(Box::new(io::stdin()))
}

/// Execute a filter over `source`, writing results to `out` and per-document
/// errors to `err`.
pub fn execute<W: Write, E: Write>(
    options: &RunOptions,
    source: Box<dyn Read>,
    out: W,
    err: &mut E,
) -> Result<RunSummary, CliError> {
    let filter = compile(&options.filter)?;

    let reader_options = ReaderOptions {
        on_error: if options.fail_fast { OnError::Stop } else { OnError::Resync },
        ..ReaderOptions::default()
    };
    let cancel = CancelToken::new();
    let documents =
        Documents::with_options(BufReader::new(source), reader_options).with_cancel(cancel.clone());

    let printer = JsonPrinter::new(!options.compact).with_indent(options.indent);
    let mut emitter = Emitter::new(out, printer);

    let summary = if options.null_input {
        let engine = Engine::new(&filter, iter::once(Ok::<_, ReadError>(Value::Null))).with_cancel(cancel.clone());
        drain(engine, &mut emitter, err, &cancel, options.fail_fast)?
    } else if options.slurp {
        let engine = Engine::new(&filter, iter::once(documents.slurp())).with_cancel(cancel.clone());
        drain(engine, &mut emitter, err, &cancel, options.fail_fast)?
    } else {
        let engine = Engine::streaming(&filter, documents).with_cancel(cancel.clone());
        drain(engine, &mut emitter, err, &cancel, options.fail_fast)?
    };

    info!(emitted = summary.emitted, errors = summary.errors, "run finished");
    Ok(summary)
}

fn drain<S: Source, W: Write, E: Write>(
    engine: Engine<'_, S>,
    emitter: &mut Emitter<W>,
    err: &mut E,
    cancel: &CancelToken,
    fail_fast: bool,
) -> Result<RunSummary, CliError> {
    let mut summary = RunSummary::default();

    for item in engine {
        match item {
            Ok(value) => match emitter.emit(&value) {
                Ok(()) => summary.emitted += 1,
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("output closed, stopping");
                    cancel.cancel();
                }
                Err(e) => return Err(CliError::Io(e)),
            },
            Err(Error::Read(ReadError::Io(e))) => return Err(CliError::Io(e)),
            Err(e) => {
                summary.errors += 1;
                writeln!(err, "jqlite: error: {}", e)?;
                if fail_fast {
                    break;
                }
            }
        }
    }
    Ok(summary)
}
