//! # Interpreter Module
//!
//! Tree-walking evaluator for Sail. The interpreter owns the global
//! environment, the current environment, and the resolution map produced by
//! the resolver. Statement execution threads a [`Signal`] back up so that
//! `return` can unwind to the enclosing function call without unwinding the
//! interpreter itself.

mod callable;
mod environment;
mod native;
mod value;

pub use callable::*;
pub use environment::*;
pub use value::*;

use std::{collections::HashMap, error::Error, fmt::Display, rc::Rc};

use log::trace;

use crate::lexer::{Token, TokenKind};
use crate::parser::ast::{ExprId, Expression, FunctionDecl, Statement};

use self::native::install_native_functions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            line: token.line,
            message: message.into(),
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error at line {}: {}", self.line, self.message)
    }
}

impl Error for RuntimeError {}

/// Outcome of executing a statement. `Return` carries the value of a
/// `return` statement up to the nearest function call.
#[derive(Debug)]
pub enum Signal {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvironmentRef,
    environment: EnvironmentRef,
    /// Lexical distances written by the resolver, keyed by node id.
    /// A missing entry means the variable is global.
    locals: HashMap<ExprId, usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        install_native_functions(&mut globals.borrow_mut());

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    pub fn globals(&self) -> EnvironmentRef {
        Rc::clone(&self.globals)
    }

    /// Entry point for the resolver: record that `id` lives `depth` scopes
    /// above its use site.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub(crate) fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    pub fn interpret(&mut self, statements: &[Statement]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement)? {
                Signal::Normal => {}
                // the resolver rejects top-level returns, so nothing is
                // left to do with a stray one
                Signal::Return(_) => break,
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<Signal, RuntimeError> {
        match statement {
            Statement::Expression { expression } => {
                self.evaluate(expression)?;
                Ok(Signal::Normal)
            }
            Statement::Block { statements } => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, environment)
            }
            Statement::Variable { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Null,
                };
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.clone(), value);
                Ok(Signal::Normal)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Signal::Normal => {}
                        signal => return Ok(signal),
                    }
                }
                Ok(Signal::Normal)
            }
            Statement::Function { declaration } => {
                let function = Function {
                    declaration: Rc::clone(declaration),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };
                self.environment.borrow_mut().define(
                    declaration.name.lexeme.clone(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Signal::Normal)
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Null,
                };
                Ok(Signal::Return(value))
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<Signal, RuntimeError> {
        let superclass_value = match superclass {
            Some(expression) => {
                let value = self.evaluate(expression)?;
                match value {
                    Value::Callable(Callable::Class(class)) => Some(class),
                    _ => {
                        let token = match expression {
                            Expression::Variable { name, .. } => name,
                            _ => name,
                        };
                        return Err(RuntimeError::new(token, "Superclass must be a class"));
                    }
                }
            }
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(name.lexeme.clone(), Value::Null);

        // methods of a subclass close over a one-deep environment that
        // binds `super`
        let defining_environment = match &superclass_value {
            Some(superclass) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                environment.borrow_mut().define(
                    "super",
                    Value::Callable(Callable::Class(Rc::clone(superclass))),
                );
                environment
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_map = HashMap::new();
        for declaration in methods {
            let function = Function {
                declaration: Rc::clone(declaration),
                closure: Rc::clone(&defining_environment),
                is_initializer: declaration.is_initializer,
            };
            method_map.insert(declaration.name.lexeme.clone(), Rc::new(function));
        }

        let class = Class {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: method_map,
        };

        self.environment
            .borrow_mut()
            .assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;
        Ok(Signal::Normal)
    }

    /// Execute `statements` with `environment` as the current environment.
    /// The previous environment is restored on every exit path, including
    /// errors and return signals.
    pub fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: EnvironmentRef,
    ) -> Result<Signal, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(Signal::Normal);
        for statement in statements {
            match self.execute(statement) {
                Ok(Signal::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    pub fn evaluate(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Literal { value } => Ok(Value::from(value.clone())),
            Expression::Grouping { expression } => self.evaluate(expression),
            Expression::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.kind {
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    TokenKind::Minus => match right.as_number() {
                        Some(value) => Ok(Value::Num(-value)),
                        None => Err(RuntimeError::new(operator, "Operand must be a number")),
                    },
                    _ => Err(RuntimeError::new(operator, "Unsupported unary operator")),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(&left, operator, &right)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = match operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expression::Variable { id, name } => self.look_up_variable(name, *id),
            Expression::This { id, keyword } => self.look_up_variable(keyword, *id),
            Expression::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.resolved_depth(*id) {
                    Some(distance) => {
                        if !self.environment.borrow_mut().assign_at(
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(RuntimeError::new(
                                name,
                                format!("Undefined variable '{}'", name.lexeme),
                            ));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut evaluated = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(RuntimeError::new(
                        paren,
                        "Can only call functions and classes",
                    ));
                };

                if let Some(arity) = callable.arity() {
                    if evaluated.len() != arity {
                        return Err(RuntimeError::new(
                            paren,
                            format!("Expected {arity} arguments but got {}", evaluated.len()),
                        ));
                    }
                }

                trace!("calling '{name}'", name = callable.name());
                callable.call(self, evaluated)
            }
            Expression::Get { object, name } => {
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(instance) => Instance::get(&instance, name),
                    _ => Err(RuntimeError::new(name, "Only instances have properties")),
                }
            }
            Expression::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(name, "Only instances have fields"));
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
            Expression::Super {
                id,
                keyword,
                method,
            } => {
                let Some(distance) = self.resolved_depth(*id) else {
                    return Err(RuntimeError::new(
                        keyword,
                        "Cannot use 'super' outside of a class",
                    ));
                };

                let superclass = self.environment.borrow().get_at(distance, "super");
                let Some(Value::Callable(Callable::Class(superclass))) = superclass else {
                    return Err(RuntimeError::new(keyword, "Superclass is not a class"));
                };

                // `this` sits in the synthetic scope directly below `super`
                let object = self.environment.borrow().get_at(distance - 1, "this");
                let Some(Value::Instance(instance)) = object else {
                    return Err(RuntimeError::new(
                        keyword,
                        "Cannot use 'super' without an instance",
                    ));
                };

                let Some(function) = superclass.find_method(&method.lexeme) else {
                    return Err(RuntimeError::new(
                        method,
                        format!("Undefined property '{}'", method.lexeme),
                    ));
                };

                Ok(Value::Callable(Callable::Method(Rc::new(BoundMethod {
                    instance,
                    function,
                }))))
            }
        }
    }

    fn evaluate_binary(
        &self,
        left: &Value,
        operator: &Token,
        right: &Value,
    ) -> Result<Value, RuntimeError> {
        match operator.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                _ => match (left.as_number(), right.as_number()) {
                    (Some(a), Some(b)) => Ok(Value::Num(a + b)),
                    _ => Err(RuntimeError::new(
                        operator,
                        "Operands of '+' must be two numbers or two strings",
                    )),
                },
            },
            TokenKind::Minus => self.arithmetic(left, operator, right, |a, b| a - b),
            TokenKind::Star => self.arithmetic(left, operator, right, |a, b| a * b),
            // division by zero follows IEEE-754 and produces an infinity
            // or NaN rather than an error
            TokenKind::Slash => self.arithmetic(left, operator, right, |a, b| a / b),
            TokenKind::Greater => self.comparison(left, operator, right, |a, b| a > b),
            TokenKind::GreaterEqual => self.comparison(left, operator, right, |a, b| a >= b),
            TokenKind::Less => self.comparison(left, operator, right, |a, b| a < b),
            TokenKind::LessEqual => self.comparison(left, operator, right, |a, b| a <= b),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            _ => Err(RuntimeError::new(operator, "Unsupported binary operator")),
        }
    }

    fn arithmetic(
        &self,
        left: &Value,
        operator: &Token,
        right: &Value,
        apply: fn(f64, f64) -> f64,
    ) -> Result<Value, RuntimeError> {
        match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Num(apply(a, b))),
            _ => Err(RuntimeError::new(operator, "Operands must be numbers")),
        }
    }

    fn comparison(
        &self,
        left: &Value,
        operator: &Token,
        right: &Value,
        apply: fn(&f64, &f64) -> bool,
    ) -> Result<Value, RuntimeError> {
        match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Bool(apply(&a, &b))),
            _ => Err(RuntimeError::new(operator, "Operands must be numbers")),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, RuntimeError> {
        match self.resolved_depth(id) {
            Some(distance) => self
                .environment
                .borrow()
                .get_at(distance, &name.lexeme)
                .ok_or_else(|| {
                    RuntimeError::new(name, format!("Undefined variable '{}'", name.lexeme))
                }),
            None => self.globals.borrow().get(name),
        }
    }
}
