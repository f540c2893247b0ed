//! # Cli
//!
//! This module contains everything needed for parsing the CLI arguments for
//! the Sail interpreter.

use clap::{Parser, ValueEnum};

/// Struct containing the CLI configuration for Sail.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The Sail script to interpret. The REPL is started when omitted.
    pub scripts: Vec<std::path::PathBuf>,

    /// Specify the log level of the interpreter.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,

    /// Whether to dump the lexed token stream (for debugging).
    #[arg(long)]
    pub dump_tokens: bool,

    /// Whether to dump the parsed AST (for debugging).
    #[arg(long)]
    pub dump_ast: bool,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of Sail.
#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// A log level, where also warnings are logged.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the interpreter,
    /// e.g., the dumps requested via the --dump-* flags.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the pipeline.
    #[value(alias("3"))]
    Debug,

    /// Log extra information, e.g., every function call the interpreter
    /// dispatches.
    #[value(alias("4"))]
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
