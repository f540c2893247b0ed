use std::{cell::RefCell, collections::HashMap, fmt::Display, rc::Rc};

use crate::lexer::Token;
use crate::parser::ast::FunctionDecl;

use super::{Environment, EnvironmentRef, Interpreter, RuntimeError, Signal, Value};

/// Everything that can sit on the left of a call expression.
#[derive(Debug, Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Method(Rc<BoundMethod>),
    Native(Rc<NativeFunction>),
}

impl Callable {
    pub fn name(&self) -> String {
        match self {
            Callable::Function(function) => function.name().to_string(),
            Callable::Class(class) => class.name.clone(),
            Callable::Method(method) => method.function.name().to_string(),
            Callable::Native(native) => native.name.to_string(),
        }
    }

    /// `None` means variadic: any argument count is accepted.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Callable::Function(function) => Some(function.arity()),
            Callable::Class(class) => Some(class.arity()),
            Callable::Method(method) => Some(method.function.arity()),
            Callable::Native(native) => native.arity,
        }
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments, None),
            Callable::Method(method) => method.function.call(
                interpreter,
                arguments,
                Some(Rc::clone(&method.instance)),
            ),
            Callable::Class(class) => {
                let instance = Instance::new(Rc::clone(class));
                if let Some(initializer) = class.find_method("init") {
                    initializer.call(interpreter, arguments, Some(Rc::clone(&instance)))?;
                }
                Ok(Value::Instance(instance))
            }
            Callable::Native(native) => (native.function)(&arguments),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Method(a), Callable::Method(b)) => {
                Rc::ptr_eq(&a.instance, &b.instance) && Rc::ptr_eq(&a.function, &b.function)
            }
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Class(class) => write!(f, "<class {}>", class.name),
            _ => write!(f, "<fn {}>", self.name()),
        }
    }
}

/// A user function together with the environment it closed over.
#[derive(Debug)]
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvironmentRef,
    pub is_initializer: bool,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.parameters.len()
    }

    /// Run the body in a fresh environment over the closure. When `instance`
    /// is present, `this` is injected into a one-deep environment between
    /// the closure and the parameter environment, mirroring the synthetic
    /// scope the resolver pushed around method bodies.
    /// Initializers always evaluate to their `this`, even on a bare return.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        instance: Option<Rc<RefCell<Instance>>>,
    ) -> Result<Value, RuntimeError> {
        let environment = match &instance {
            Some(instance) => {
                let bound = Environment::with_enclosing(Rc::clone(&self.closure));
                bound
                    .borrow_mut()
                    .define("this", Value::Instance(Rc::clone(instance)));
                Environment::with_enclosing(bound)
            }
            None => Environment::with_enclosing(Rc::clone(&self.closure)),
        };

        for (parameter, argument) in self.declaration.parameters.iter().zip(arguments) {
            environment
                .borrow_mut()
                .define(parameter.lexeme.clone(), argument);
        }

        let signal = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Ok(match instance {
                Some(instance) => Value::Instance(instance),
                None => Value::Null,
            });
        }

        match signal {
            Signal::Return(value) => Ok(value),
            Signal::Normal => Ok(Value::Null),
        }
    }
}

/// A runtime class: name, optional superclass, and its method table.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    /// Look up a method by name, walking the superclass chain on a miss.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Calling a class constructs an instance, so the class arity is the
    /// arity of its initializer (or zero without one).
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|initializer| initializer.arity())
            .unwrap_or(0)
    }
}

/// A method plucked off an instance; calling it injects the receiver.
#[derive(Debug)]
pub struct BoundMethod {
    pub instance: Rc<RefCell<Instance>>,
    pub function: Rc<Function>,
}

/// An object: a class reference plus a mutable field map.
#[derive(Debug)]
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<RefCell<Instance>> {
        Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        }))
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Fields shadow methods; a method hit comes back bound to `instance`.
    pub fn get(instance: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method = instance.borrow().class.find_method(&name.lexeme);
        if let Some(function) = method {
            return Ok(Value::Callable(Callable::Method(Rc::new(BoundMethod {
                instance: Rc::clone(instance),
                function,
            }))));
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined property '{}'", name.lexeme),
        ))
    }

    /// Unconditional field write; creates the field on first assignment.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

/// A host-provided function exposed to scripts as a global.
pub struct NativeFunction {
    pub name: &'static str,
    /// `None` accepts any argument count.
    pub arity: Option<usize>,
    pub function: fn(&[Value]) -> Result<Value, RuntimeError>,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}
