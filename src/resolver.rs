//! Static resolver pass for the **Blu** interpreter.
//!
//! One walk over the program, between parsing and execution:
//! 1. Build lexical scopes (stack of `HashMap<String,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `return`, `this` or `super`, self‑inheritance).
//! 3. Tell the interpreter, for each variable, `this` and `super` occurrence,
//!    how many frames out its binding lives. Names found in no scope are
//!    globals and get no entry.
//!
//! Scopes mirror the frames the interpreter builds at run time: blocks,
//! function bodies, a `super` frame for subclasses and a `this` frame around
//! every method and field initializer.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::class::INITIALIZER;
use crate::error::{BluError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;

/// What kind of body are we in? Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
    Lambda,
}

/// What kind of class body are we in? Validates `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Tracks scopes, enforces static rules and records binding distances by
/// calling back into the interpreter.
pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'i> Resolver<'i> {
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements, stopping at the first error.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.scoped(|this| this.resolve_stmts(statements))?;
            }

            Stmt::Var { name, initializer } => {
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // Defined before the body so the function can recurse.
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Stmt::Class(decl) => self.resolve_class(decl)?,

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(BluError::resolve(
                        keyword,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(BluError::resolve(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }

                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_class(&mut self, decl: &ClassDecl) -> Result<()> {
        debug!("Resolving class '{}'", decl.name.lexeme);

        self.declare(&decl.name)?;
        self.define(&decl.name);

        let enclosing = self.current_class;
        self.current_class = ClassType::Class;

        let result = self.resolve_class_body(decl);

        self.current_class = enclosing;
        result
    }

    fn resolve_class_body(&mut self, decl: &ClassDecl) -> Result<()> {
        match &decl.superclass {
            Some(superclass) => {
                if let Expr::Variable { name, .. } = superclass {
                    if name.lexeme == decl.name.lexeme {
                        return Err(BluError::resolve(
                            name,
                            "A class can't inherit from itself.",
                        ));
                    }
                }

                self.current_class = ClassType::Subclass;
                self.resolve_expr(superclass)?;

                self.scoped(|this| {
                    this.bind_implicit("super");
                    this.resolve_members(decl)
                })
            }

            None => self.resolve_members(decl),
        }
    }

    /// Fields and methods, inside the scope that binds `this`.
    fn resolve_members(&mut self, decl: &ClassDecl) -> Result<()> {
        self.scoped(|this| {
            this.bind_implicit("this");

            for field in &decl.fields {
                if let Some(expr) = &field.initializer {
                    this.resolve_expr(expr)?;
                }
            }

            for method in &decl.methods {
                let kind = if method.name.lexeme == INITIALIZER {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };

                this.resolve_function(method, kind)?;
            }

            Ok(())
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        return Err(BluError::resolve(
                            name,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return Err(BluError::resolve(
                        keyword,
                        "Can't use 'this' outside of a class.",
                    ));
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => {
                    return Err(BluError::resolve(
                        keyword,
                        "Can't use 'super' outside of a class.",
                    ))
                }
                ClassType::Class => {
                    return Err(BluError::resolve(
                        keyword,
                        "Can't use 'super' in a class with no superclass.",
                    ))
                }
                ClassType::Subclass => self.resolve_local(*id, keyword),
            },

            Expr::Lambda(decl) => {
                self.resolve_body(&decl.params, &decl.body, FunctionType::Lambda)?;
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) -> Result<()> {
        debug!("Resolving {:?} '{}'", kind, decl.name.lexeme);

        self.resolve_body(&decl.params, &decl.body, kind)
    }

    /// Parameters and body share one fresh scope.
    fn resolve_body(&mut self, params: &[Token], body: &[Stmt], kind: FunctionType) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        let result = self.scoped(|this| {
            for param in params {
                this.declare(param)?;
                this.define(param);
            }

            this.resolve_stmts(body)
        });

        self.current_function = enclosing;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `f` inside a new scope; the scope is popped even if `f` fails.
    fn scoped<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Bind a keyword name (`this`, `super`) in the innermost scope.
    fn bind_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                return Err(BluError::resolve(
                    name,
                    "Already a variable with this name in this scope.",
                ));
            }
            scope.insert(name.lexeme.clone(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record the occurrence as a local at depth `d`, or leave it global if
    /// no scope declares the name.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
