use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./demos/inheritance.sail";
const EXPECTED: Expected = Expected {
    stdout: "A\nB\n",
    stderr: "",
};

#[test]
fn interpret_inheritance_with_super() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
