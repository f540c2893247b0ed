//! Host-provided globals. These are installed into the global environment
//! before any user code runs.

use std::{
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use super::{Callable, Environment, NativeFunction, RuntimeError, Value};

fn native_print(arguments: &[Value]) -> Result<Value, RuntimeError> {
    for argument in arguments {
        println!("{argument}");
    }
    Ok(Value::Null)
}

fn epoch() -> std::time::Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

fn native_millis(_arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Num(epoch().as_millis() as f64))
}

fn native_seconds(_arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Num(epoch().as_secs() as f64))
}

pub fn install_native_functions(globals: &mut Environment) {
    let natives = [
        NativeFunction {
            name: "print",
            arity: None,
            function: native_print,
        },
        NativeFunction {
            name: "millis",
            arity: Some(0),
            function: native_millis,
        },
        NativeFunction {
            name: "seconds",
            arity: Some(0),
            function: native_seconds,
        },
    ];

    for native in natives {
        globals.define(native.name, Value::Callable(Callable::Native(Rc::new(native))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_functions_are_installed() {
        let globals = Environment::new();
        install_native_functions(&mut globals.borrow_mut());

        for name in ["print", "millis", "seconds"] {
            assert!(globals.borrow().get_at(0, name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_print_is_variadic_and_returns_null() {
        let globals = Environment::new();
        install_native_functions(&mut globals.borrow_mut());

        let Some(Value::Callable(print)) = globals.borrow().get_at(0, "print") else {
            panic!("print should be a callable");
        };
        assert_eq!(print.arity(), None);
    }

    #[test]
    fn test_clock_natives_return_numbers() {
        let result = native_millis(&[]).expect("millis should not fail");
        assert!(matches!(result, Value::Num(n) if n > 0.0));

        let result = native_seconds(&[]).expect("seconds should not fail");
        assert!(matches!(result, Value::Num(n) if n > 0.0));
    }
}
