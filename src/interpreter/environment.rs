use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::lexer::Token;

use super::{RuntimeError, Value};

/// Reference counted mutable handle to an environment. Closures and child
/// scopes share their enclosing environments through this alias.
pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One link in the scope chain. Lookups walk the `enclosing` chain until a
/// binding is found; the root of the chain holds the globals.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvironmentRef>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn with_enclosing(enclosing: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Bind `name` in this environment, overwriting any previous binding.
    /// Redefinition is deliberate: globals may be redeclared, and class
    /// declarations patch their placeholder binding here.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined variable '{}'", name.lexeme),
        ))
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined variable '{}'", name.lexeme),
        ))
    }

    /// Read `name` from the environment exactly `distance` hops up the
    /// chain. No further chain walking happens at the destination; the
    /// resolver guarantees the binding lives exactly there.
    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        if distance == 0 {
            return self.values.get(name).cloned();
        }

        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.borrow().get_at(distance - 1, name))
    }

    /// Assign `name` exactly `distance` hops up the chain. Returns false if
    /// the binding does not exist there.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value) -> bool {
        if distance == 0 {
            return match self.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign_at(distance - 1, name, value),
            None => false,
        }
    }
}
