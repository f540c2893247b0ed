//! # Resolver Module
//!
//! Static pass between the parser and the interpreter. It walks the
//! statement list once, computing for every variable-like expression the
//! number of lexical scopes between the use and its binding, and writes the
//! result into the interpreter's resolution map. It never executes user
//! code. The same walk rejects the handful of constructs that are only
//! detectable statically: `return` outside a function, `this`/`super`
//! misuse, duplicate locals, and reading a local in its own initializer.

use std::{collections::HashMap, error::Error, fmt::Display, mem, rc::Rc};

use log::debug;

use crate::interpreter::Interpreter;
use crate::lexer::Token;
use crate::parser::ast::{ExprId, Expression, FunctionDecl, Statement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    pub line: usize,
    pub message: String,
}

impl ResolveError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            line: token.line,
            message: message.into(),
        }
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error at line {}: {}", self.line, self.message)
    }
}

impl Error for ResolveError {}

/// What kind of function body the resolver is currently inside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body the resolver is currently inside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    /// One map per open lexical scope; the value flips from false to true
    /// once the declaration's initializer has been resolved. The global
    /// scope is deliberately not tracked.
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionKind,
    current_class: ClassKind,
}

impl<'i> Resolver<'i> {
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: vec![],
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
        }
    }

    pub fn resolve_program(&mut self, statements: &[Statement]) -> Result<(), ResolveError> {
        self.resolve_statements(statements)
    }

    fn resolve_statements(&mut self, statements: &[Statement]) -> Result<(), ResolveError> {
        for statement in statements {
            self.resolve_statement(statement)?;
        }
        Ok(())
    }

    fn resolve_statement(&mut self, statement: &Statement) -> Result<(), ResolveError> {
        match statement {
            Statement::Block { statements } => {
                self.begin_scope();
                let result = self.resolve_statements(statements);
                self.end_scope();
                result
            }
            Statement::Variable { name, initializer } => {
                self.declare(name)?;
                if let Some(initializer) = initializer {
                    self.resolve_expression(initializer)?;
                }
                self.define(name);
                Ok(())
            }
            Statement::Function { declaration } => {
                // declared and defined eagerly so the body can recurse
                self.declare(&declaration.name)?;
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionKind::Function)
            }
            Statement::Expression { expression } => self.resolve_expression(expression),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expression(condition)?;
                self.resolve_statement(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_statement(else_branch)?;
                }
                Ok(())
            }
            Statement::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    return Err(ResolveError::new(
                        keyword,
                        "Cannot return from top-level code",
                    ));
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        return Err(ResolveError::new(
                            keyword,
                            "Cannot return a value from an initializer",
                        ));
                    }
                    self.resolve_expression(value)?;
                }
                Ok(())
            }
            Statement::While { condition, body } => {
                self.resolve_expression(condition)?;
                self.resolve_statement(body)
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), ResolveError> {
        let enclosing_class = mem::replace(&mut self.current_class, ClassKind::Class);
        let result = self.resolve_class_body(name, superclass, methods);
        self.current_class = enclosing_class;
        result
    }

    fn resolve_class_body(
        &mut self,
        name: &Token,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), ResolveError> {
        self.declare(name)?;
        self.define(name);

        if let Some(superclass_expression) = superclass {
            if let Expression::Variable {
                name: superclass_name,
                ..
            } = superclass_expression
            {
                if superclass_name.lexeme == name.lexeme {
                    return Err(ResolveError::new(
                        superclass_name,
                        "A class cannot inherit from itself",
                    ));
                }
            }

            self.current_class = ClassKind::Subclass;
            self.resolve_expression(superclass_expression)?;

            // synthetic scope binding `super`, one above the `this` scope
            self.begin_scope();
            self.scope_insert("super");
        }

        self.begin_scope();
        self.scope_insert("this");

        let mut result = Ok(());
        for method in methods {
            let kind = if method.is_initializer {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            result = self.resolve_function(method, kind);
            if result.is_err() {
                break;
            }
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }
        result
    }

    fn resolve_function(
        &mut self,
        declaration: &FunctionDecl,
        kind: FunctionKind,
    ) -> Result<(), ResolveError> {
        debug!(
            "resolving {kind:?} '{name}'",
            name = declaration.name.lexeme
        );
        let enclosing_function = mem::replace(&mut self.current_function, kind);

        self.begin_scope();
        let mut result = Ok(());
        for parameter in &declaration.parameters {
            result = self.declare(parameter).map(|()| self.define(parameter));
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() {
            result = self.resolve_statements(&declaration.body);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        result
    }

    fn resolve_expression(&mut self, expression: &Expression) -> Result<(), ResolveError> {
        match expression {
            Expression::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        return Err(ResolveError::new(
                            name,
                            "Cannot read local variable in its own initializer",
                        ));
                    }
                }
                self.resolve_local(*id, name);
                Ok(())
            }
            Expression::Assign { id, name, value } => {
                self.resolve_expression(value)?;
                self.resolve_local(*id, name);
                Ok(())
            }
            Expression::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    return Err(ResolveError::new(
                        keyword,
                        "Cannot use 'this' outside of a class",
                    ));
                }
                self.resolve_local(*id, keyword);
                Ok(())
            }
            Expression::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        return Err(ResolveError::new(
                            keyword,
                            "Cannot use 'super' outside of a class",
                        ));
                    }
                    ClassKind::Class => {
                        return Err(ResolveError::new(
                            keyword,
                            "Cannot use 'super' in a class with no superclass",
                        ));
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, keyword);
                Ok(())
            }
            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                self.resolve_expression(left)?;
                self.resolve_expression(right)
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                self.resolve_expression(callee)?;
                for argument in arguments {
                    self.resolve_expression(argument)?;
                }
                Ok(())
            }
            Expression::Get { object, .. } => self.resolve_expression(object),
            Expression::Set { object, value, .. } => {
                self.resolve_expression(value)?;
                self.resolve_expression(object)
            }
            Expression::Grouping { expression } => self.resolve_expression(expression),
            Expression::Unary { right, .. } => self.resolve_expression(right),
            Expression::Literal { .. } => Ok(()),
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn scope_insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    /// Add the name to the innermost scope, marked not-yet-usable. At global
    /// scope this is a no-op: globals may be redeclared freely.
    fn declare(&mut self, name: &Token) -> Result<(), ResolveError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };

        if scope.contains_key(&name.lexeme) {
            return Err(ResolveError::new(
                name,
                format!(
                    "Variable with name '{}' already declared in this scope",
                    name.lexeme
                ),
            ));
        }

        scope.insert(name.lexeme.clone(), false);
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Walk the scope stack from innermost out; on the first hit, record the
    /// distance for this node. No hit means the variable is global and no
    /// entry is written.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, distance);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve_into(interpreter: &mut Interpreter, source: &str) -> Result<(), ResolveError> {
        let tokens = Lexer::new(source).lex().expect("lexing should succeed");
        let statements = Parser::new(&tokens)
            .parse()
            .expect("parsing should succeed");
        Resolver::new(interpreter).resolve_program(&statements)
    }

    fn resolve(source: &str) -> Result<(), ResolveError> {
        resolve_into(&mut Interpreter::new(), source)
    }

    /// Collect the ids the parser assigned, in source order.
    fn parsed_ids(source: &str) -> (Interpreter, u32) {
        let tokens = Lexer::new(source).lex().expect("lexing should succeed");
        let mut parser = Parser::new(&tokens);
        let statements = parser.parse().expect("parsing should succeed");
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter)
            .resolve_program(&statements)
            .expect("resolving should succeed");
        (interpreter, parser.next_id())
    }

    #[test]
    fn test_depths_for_shadowed_global() {
        // `a` inside show() resolves past the not-yet-declared local
        let source = "
            let a = 1;
            {
                fn show() { a; }
                let a = 2;
                a;
            }
        ";
        let (interpreter, id_count) = parsed_ids(source);

        let depths = (0..id_count)
            .map(|id| interpreter.resolved_depth(ExprId(id)))
            .collect::<Vec<_>>();
        // ids in parse order: `a` in show (global, unresolved), `show` at the
        // call-free block level is absent, trailing `a` is the local
        assert_eq!(depths, vec![None, Some(0)]);
    }

    #[test]
    fn test_parameters_resolve_at_distance_zero() {
        let source = "fn f(x) { x; }";
        let (interpreter, id_count) = parsed_ids(source);

        assert_eq!(id_count, 1);
        assert_eq!(interpreter.resolved_depth(ExprId(0)), Some(0));
    }

    #[test]
    fn test_closure_variable_resolves_through_function_scope() {
        let source = "
            {
                let captured = 1;
                fn inner() { captured; }
            }
        ";
        let (interpreter, id_count) = parsed_ids(source);

        assert_eq!(id_count, 1);
        // one hop: out of inner's body scope into the block
        assert_eq!(interpreter.resolved_depth(ExprId(0)), Some(1));
    }

    #[test]
    fn test_resolving_twice_is_idempotent() {
        let source = "{ let a = 1; a; }";
        let tokens = Lexer::new(source).lex().expect("lexing should succeed");
        let statements = Parser::new(&tokens)
            .parse()
            .expect("parsing should succeed");

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter)
            .resolve_program(&statements)
            .expect("first pass should succeed");
        let first = interpreter.resolved_depth(ExprId(0));
        Resolver::new(&mut interpreter)
            .resolve_program(&statements)
            .expect("second pass should succeed");

        assert_eq!(interpreter.resolved_depth(ExprId(0)), first);
    }

    #[test]
    fn test_return_outside_function_is_an_error() {
        let error = resolve("return 1;").expect_err("should fail");
        assert_eq!(error.message, "Cannot return from top-level code");
    }

    #[test]
    fn test_returning_a_value_from_an_initializer_is_an_error() {
        let error =
            resolve("class C { init() { return 1; } }").expect_err("should fail");
        assert_eq!(error.message, "Cannot return a value from an initializer");

        // a bare return is allowed
        assert!(resolve("class C { init() { return; } }").is_ok());
    }

    #[test]
    fn test_reading_a_local_in_its_own_initializer_is_an_error() {
        let error = resolve("{ let a = a; }").expect_err("should fail");
        assert_eq!(
            error.message,
            "Cannot read local variable in its own initializer"
        );

        // at global scope the same shape is legal and reads the old binding
        assert!(resolve("let a = 1; let a = a;").is_ok());
    }

    #[test]
    fn test_duplicate_local_declaration_is_an_error() {
        let error = resolve("{ let a = 1; let a = 2; }").expect_err("should fail");
        assert!(error.message.contains("already declared"));

        assert!(resolve("let a = 1; let a = 2;").is_ok());
    }

    #[test]
    fn test_this_outside_a_class_is_an_error() {
        let error = resolve("this;").expect_err("should fail");
        assert_eq!(error.message, "Cannot use 'this' outside of a class");

        let error = resolve("fn f() { this; }").expect_err("should fail");
        assert_eq!(error.message, "Cannot use 'this' outside of a class");
    }

    #[test]
    fn test_super_misuse_is_an_error() {
        let error = resolve("fn f() { super.m; }").expect_err("should fail");
        assert_eq!(error.message, "Cannot use 'super' outside of a class");

        let error =
            resolve("class C { m() { super.m; } }").expect_err("should fail");
        assert_eq!(
            error.message,
            "Cannot use 'super' in a class with no superclass"
        );
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        let error = resolve("class C < C {}").expect_err("should fail");
        assert_eq!(error.message, "A class cannot inherit from itself");
    }

    #[test]
    fn test_this_and_super_depths_inside_a_method() {
        let source = "
            class A { m() {} }
            class B < A {
                m() { this; super.m; }
            }
        ";
        let (interpreter, id_count) = parsed_ids(source);

        // parse order: superclass reference, `this`, `super`
        assert_eq!(id_count, 3);
        assert_eq!(interpreter.resolved_depth(ExprId(0)), None); // A is global
        assert_eq!(interpreter.resolved_depth(ExprId(1)), Some(1)); // this
        assert_eq!(interpreter.resolved_depth(ExprId(2)), Some(2)); // super
    }

    #[test]
    fn test_duplicate_parameters_are_an_error() {
        let error = resolve("fn f(a, a) {}").expect_err("should fail");
        assert!(error.message.contains("already declared"));
    }
}
