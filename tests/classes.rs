use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./demos/greeter.sail";
const EXPECTED: Expected = Expected {
    stdout: "hello world\n",
    stderr: "",
};

#[test]
fn interpret_class_with_initializer_and_this() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
