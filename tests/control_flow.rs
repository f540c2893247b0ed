use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

#[test]
fn interpret_for_loop() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/count_to_three.sail"),
        Expected {
            stdout: "0\n1\n2\n",
            stderr: "",
        },
    )
}

#[test]
fn interpret_fib() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/fib.sail"),
        Expected {
            stdout: "6765\n",
            stderr: "",
        },
    )
}
