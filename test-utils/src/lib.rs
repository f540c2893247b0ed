use std::{
    error::Error,
    io::{self, Write},
    path::Path,
    process::{Command, Output, Stdio},
    str,
};

const SAIL_PATH: &str = "./target/debug/sail";

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?, self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

fn run_interpreter(src_path: &Path) -> Result<Output, io::Error> {
    Command::new(SAIL_PATH).arg(src_path).output()
}

/// Run a script and assert that it succeeds with exactly the expected
/// stdout/stderr.
pub fn check_run(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(src_path)?;

    expected.assert_matches(&output)?;
    assert!(
        output.status.success(),
        "sail exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Run a script that is expected to fail: the exit status must be non-zero
/// and stderr must mention `needle`.
pub fn check_failing_run(src_path: &Path, needle: &str) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(src_path)?;
    let stderr = str::from_utf8(&output.stderr)?;

    assert!(
        !output.status.success(),
        "sail should exit with a failure status"
    );
    assert!(
        stderr.contains(needle),
        "stderr {stderr:?} should mention {needle:?}"
    );

    Ok(())
}

/// Start the REPL, feed it `input` on stdin, and hand back the process
/// output once it exits.
pub fn run_repl(input: &str) -> Result<Output, Box<dyn Error>> {
    let mut child = Command::new(SAIL_PATH)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    child
        .stdin
        .as_mut()
        .ok_or("failed to open the REPL's stdin")?
        .write_all(input.as_bytes())?;

    Ok(child.wait_with_output()?)
}
