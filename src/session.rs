//! # Session
//!
//! The driver shared by the file runner and the REPL. A session owns one
//! interpreter, so globals (and resolved node ids) survive across every
//! program fed to it. Both entry points funnel into [`Session::run`], which
//! walks the full pipeline: lex, parse, resolve, interpret.

use std::{
    fs,
    io::{self, BufRead, Write},
    path::Path,
};

use log::{debug, info};

use crate::error::SailError;
use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::resolver::Resolver;

#[derive(Default)]
pub struct Session {
    interpreter: Interpreter,
    /// First node id handed to the next parse; keeps ids unique across
    /// REPL lines.
    next_expr_id: u32,
    dump_tokens: bool,
    dump_ast: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable dumping of intermediate pipeline stages (for debugging).
    /// Dumps go to the logger at info level.
    pub fn with_dumps(mut self, dump_tokens: bool, dump_ast: bool) -> Self {
        self.dump_tokens = dump_tokens;
        self.dump_ast = dump_ast;
        self
    }

    /// Interpret a whole script file as one program.
    pub fn run_file(&mut self, path: &Path) -> Result<(), SailError> {
        let source = fs::read_to_string(path).map_err(|source| SailError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.run(&source)
    }

    /// Read-eval-print loop. Each line is a full program; errors are printed
    /// and the loop keeps going. The line `exit` (or end of input) leaves
    /// the loop.
    pub fn run_prompt(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            let line = line.trim_end_matches(['\n', '\r']);
            if line == "exit" {
                break;
            }

            if let Err(error) = self.run(line) {
                eprintln!("{error}");
            }
        }

        Ok(())
    }

    /// Run one program through the whole pipeline.
    pub fn run(&mut self, source: &str) -> Result<(), SailError> {
        let tokens = Lexer::new(source).lex()?;
        debug!("lexed {count} tokens", count = tokens.len());
        if self.dump_tokens {
            if let Ok(json) = serde_json::to_string_pretty(&tokens) {
                info!("Tokens:\n{json}");
            }
        }

        let mut parser = Parser::continuing_from(&tokens, self.next_expr_id);
        let parsed = parser.parse();
        self.next_expr_id = parser.next_id();
        let statements = parsed?;
        debug!(
            "parsed {count} top-level statements",
            count = statements.len()
        );
        if self.dump_ast {
            info!("Parsed AST:\n{statements:#?}");
        }

        Resolver::new(&mut self.interpreter).resolve_program(&statements)?;

        self.interpreter.interpret(&statements)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Value;

    #[test]
    fn test_globals_persist_across_runs() {
        let mut session = Session::new();
        session.run("let a = 1;").expect("first line should run");
        session.run("let b = a + 1;").expect("second line should run");

        let globals = session.interpreter.globals();
        let b = globals.borrow().get_at(0, "b");
        assert_eq!(b, Some(Value::Num(2.0)));
    }

    #[test]
    fn test_closures_keep_working_across_runs() {
        // node ids must stay unique between runs, or the second call would
        // read a stale resolution entry
        let mut session = Session::new();
        session
            .run("fn make() { let i = 0; fn tick() { i = i + 1; return i; } return tick; } let t = make();")
            .expect("definition line should run");
        session.run("let first = t();").expect("call line should run");
        session.run("let second = t();").expect("call line should run");

        let globals = session.interpreter.globals();
        let second = globals.borrow().get_at(0, "second");
        assert_eq!(second, Some(Value::Num(2.0)));
    }

    #[test]
    fn test_an_error_does_not_poison_the_session() {
        let mut session = Session::new();
        session.run("let a = 1;").expect("first line should run");
        assert!(session.run("a +;").is_err());
        assert!(session.run("missing;").is_err());
        session.run("let b = a;").expect("session should still work");
    }

    #[test]
    fn test_run_file_reports_missing_files() {
        let mut session = Session::new();
        let error = session
            .run_file(Path::new("./does-not-exist.sail"))
            .expect_err("missing file should fail");

        assert!(matches!(error, SailError::Io { .. }));
    }
}
