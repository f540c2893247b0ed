use std::{error::Error, fmt::Display, io, path::PathBuf};

use crate::interpreter::RuntimeError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::resolver::ResolveError;

/// Any failure a single program run can produce, from reading the file to
/// evaluating the last statement. Each stage keeps its own error type; this
/// enum only exists so the drivers can hold one `Result`.
#[derive(Debug)]
pub enum SailError {
    Io { path: PathBuf, source: io::Error },
    Lex(LexError),
    /// The parser recovers at statement boundaries, so one run can carry
    /// several parse errors.
    Parse(Vec<ParseError>),
    Resolve(ResolveError),
    Runtime(RuntimeError),
}

impl Display for SailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SailError::Io { path, source } => {
                write!(f, "Could not read '{}': {source}", path.display())
            }
            SailError::Lex(error) => write!(f, "{error}"),
            SailError::Parse(errors) => {
                let mut first = true;
                for error in errors {
                    if !first {
                        writeln!(f)?;
                    }
                    write!(f, "{error}")?;
                    first = false;
                }
                Ok(())
            }
            SailError::Resolve(error) => write!(f, "{error}"),
            SailError::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl Error for SailError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SailError::Io { source, .. } => Some(source),
            SailError::Lex(error) => Some(error),
            SailError::Parse(errors) => errors
                .first()
                .map(|error| error as &(dyn Error + 'static)),
            SailError::Resolve(error) => Some(error),
            SailError::Runtime(error) => Some(error),
        }
    }
}

impl From<LexError> for SailError {
    fn from(error: LexError) -> Self {
        SailError::Lex(error)
    }
}

impl From<Vec<ParseError>> for SailError {
    fn from(errors: Vec<ParseError>) -> Self {
        SailError::Parse(errors)
    }
}

impl From<ResolveError> for SailError {
    fn from(error: ResolveError) -> Self {
        SailError::Resolve(error)
    }
}

impl From<RuntimeError> for SailError {
    fn from(error: RuntimeError) -> Self {
        SailError::Runtime(error)
    }
}
