//! # Sail
//!
//! This binary is the interpreter of Sail. Without arguments it starts an
//! interactive prompt; given a script path it runs the file and exits
//! non-zero on any error.

mod cli;

use cli::*;

use std::{error::Error, process};

use sail_lang::session::Session;

/// Exit code for command line misuse (per BSD sysexits).
const EXIT_USAGE: i32 = 64;
/// Exit code for any failure while running a script.
const EXIT_FAILURE: i32 = 65;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::init();

    simple_logger::init_with_level(args.verbosity.into())?;

    if args.scripts.len() > 1 {
        eprintln!("Usage: sail [script]");
        process::exit(EXIT_USAGE);
    }

    let mut session = Session::new().with_dumps(args.dump_tokens, args.dump_ast);

    match args.scripts.first() {
        Some(script) => {
            if let Err(error) = session.run_file(script) {
                eprintln!("{error}");
                process::exit(EXIT_FAILURE);
            }
        }
        None => session.run_prompt()?,
    }

    Ok(())
}
