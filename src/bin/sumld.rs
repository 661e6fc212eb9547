// Summary linker
//
//  Copyright (C) 2014-2023 Ryan Specialty Group, LLC.
//
//  This file is part of modsum.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! This is the summary linker,
//!   so named after the traditional `ld` Unix utility.
//! Its job is to take the module summaries emitted for each compilation
//!   unit,
//!     merge them into one combined index,
//!     mark every function reachable from the preserved root set,
//!   and write the annotated index back out for the code-generation
//!   step that elides dead definitions.
//!
//! See [`modsum::ld`] for details on the linking process.

extern crate modsum;

use getopts::{Fail, Options};
use log::{debug, info};
use modsum::ld::liveness::{mark_live, preserved_guids};
use modsum::obj::modsum::{
    read_summary_index, write_summary_index, ModsumError,
};
use modsum::summary::{MergeError, ModuleSummaryIndex};
use std::fmt::{self, Display};
use std::{env, fs, io};

/// Types of commands
enum Command {
    Link(LinkRequest),
    Usage,
}

/// A fully parsed linker invocation.
struct LinkRequest {
    inputs: Vec<String>,
    output: String,

    /// Symbol whose liveness provenance should be printed after
    ///   marking.
    trace_symbol: Option<String>,
}

/// Entrypoint for the linker
pub fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage =
        opts.usage(&format!("Usage: {} -o OUTPUT FILE...", program));

    match parse_options(opts, args) {
        Ok(Command::Link(request)) => match link(&request) {
            Ok(()) => std::process::exit(exitcode::OK),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(e.exit_code());
            }
        },
        Ok(Command::Usage) => {
            println!("{usage}");
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{e}");
            println!("{usage}");
            std::process::exit(exitcode::USAGE);
        }
    }
}

/// Load every input summary,
///   mark the live set,
///   and write the combined annotated index.
fn link(request: &LinkRequest) -> Result<(), LinkError> {
    let mut combined = ModuleSummaryIndex::new("");

    for path in &request.inputs {
        debug!("loading module summary {path}");

        let buf = fs::read(path)
            .map_err(|e| LinkError::InputIo(path.clone(), e))?;

        let index = read_summary_index(&buf)
            .map_err(|e| LinkError::InvalidSummary(path.clone(), e))?;

        info!(
            "loaded module summary {} ({} functions)",
            index.name(),
            index.len(),
        );

        combined.merge(index)?;
    }

    combined.set_name("combined");

    let roots = preserved_guids(&combined);
    let result =
        mark_live(&mut combined, &roots, request.trace_symbol.as_deref());

    info!("marked {} live symbols", result.live_count);

    if let Some(report) = result.trace {
        print!("{report}");
    }

    fs::write(&request.output, write_summary_index(&combined))
        .map_err(|e| LinkError::OutputIo(request.output.clone(), e))?;

    Ok(())
}

/// Get 'Options'
fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("o", "output", "set output summary file name", "OUTPUT");
    opts.optopt(
        "",
        "lto-print-live-trace",
        "print the liveness trace for the named symbol",
        "SYMBOL",
    );
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Option parser
fn parse_options(
    opts: Options,
    args: Vec<String>,
) -> Result<Command, Fail> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    if matches.free.is_empty() {
        return Err(Fail::OptionMissing(String::from("FILE")));
    }

    let output = match matches.opt_str("o") {
        Some(output) => output,
        None => {
            return Err(Fail::OptionMissing(String::from("-o OUTPUT")))
        }
    };

    Ok(Command::Link(LinkRequest {
        trace_symbol: matches.opt_str("lto-print-live-trace"),
        inputs: matches.free,
        output,
    }))
}

/// Toplevel `sumld` error representing a failure to complete the
///   requested link.
#[derive(Debug)]
enum LinkError {
    /// An input summary could not be read.
    InputIo(String, io::Error),

    /// An input was not a well-formed module summary.
    InvalidSummary(String, ModsumError),

    /// Summaries could not be combined.
    Merge(MergeError),

    /// The annotated output could not be written.
    OutputIo(String, io::Error),
}

impl LinkError {
    /// Process exit code for this failure.
    ///
    /// Missing or malformed inputs exit with `1`;
    ///   everything else is an internal failure.
    fn exit_code(&self) -> i32 {
        match self {
            Self::InputIo(_, _) | Self::InvalidSummary(_, _) => 1,
            Self::Merge(_) => exitcode::SOFTWARE,
            Self::OutputIo(_, _) => exitcode::IOERR,
        }
    }
}

impl From<MergeError> for LinkError {
    fn from(e: MergeError) -> Self {
        Self::Merge(e)
    }
}

impl Display for LinkError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InputIo(path, e) => write!(fmt, "{path}: {e}"),
            Self::InvalidSummary(path, e) => {
                write!(fmt, "{path}: Invalid module summary: {e}")
            }
            Self::Merge(e) => Display::fmt(e, fmt),
            Self::OutputIo(path, e) => write!(fmt, "{path}: {e}"),
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InputIo(_, e) | Self::OutputIo(_, e) => Some(e),
            Self::InvalidSummary(_, e) => Some(e),
            Self::Merge(e) => Some(e),
        }
    }
}
