//! Tree‑walking evaluator.
//!
//! Statements complete with a [`Flow`]: `Normal`, or `Return(value)` when a
//! `return` is unwinding to the nearest function boundary. Failures travel
//! separately as `Err(BluError)`, so loops and blocks never confuse a
//! `return` with a crash.
//!
//! The *current environment* moves into child frames on block and call entry
//! and is always restored on exit, including early exit by error or `return`.
//! The global frame never moves.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, LiteralValue, Stmt};
use crate::class::{Class, Instance, INITIALIZER};
use crate::environment::{EnvRef, Environment};
use crate::error::{BluError, Result};
use crate::function::{Function, Lambda};
use crate::token::{Token, TokenType};
use crate::value::{Callable, NativeFunction, Value};

/// How a statement finished when it did not fail.
#[derive(Debug, Clone)]
pub enum Flow {
    /// Fell off the end; continue with the next statement.
    Normal,

    /// A `return` is unwinding to the enclosing call.
    Return(Value),
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Deepest chain of nested script calls before `Stack overflow.` is raised.
pub const MAX_CALL_DEPTH: usize = 1000;

/// `time()`: seconds on a monotonic clock, counted from the first interpreter start.
fn native_time(_arguments: &[Value]) -> std::result::Result<Value, String> {
    let epoch: &Instant = EPOCH.get_or_init(Instant::now);

    Ok(Value::Number(epoch.elapsed().as_secs_f64()))
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Resolver output: expression id → number of frames to walk outward.
    /// Entries are never removed, so a long REPL session keeps one per
    /// resolved node it has ever run.
    locals: HashMap<ExprId, usize>,
    /// Script calls currently on the Rust stack.
    call_depth: usize,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to `output`; `time` is pre‑bound in the globals.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        EPOCH.get_or_init(Instant::now);

        let mut globals = Environment::new();

        debug!("Defining native function 'time'");

        globals.define_native(NativeFunction {
            name: "time",
            arity: 0,
            func: native_time,
        });

        let globals: EnvRef = globals.into_ref();

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            call_depth: 0,
            output,
        }
    }

    /// The global frame.
    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Record the resolver's distance for one expression node.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local #{} at depth {}", id.index(), depth);

        self.locals.insert(id, depth);
    }

    /// Distance recorded for `id`, `None` for globals.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Executes a program. Stops at the first failing statement.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(_) = self.execute(stmt)? {
                // The resolver rejects top-level returns.
                return Err(BluError::runtime(0, "Can't return from top-level code."));
            }
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ───────────────────────────── statements ──────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };

                debug!("Defining variable '{}' = {:?}", name.lexeme, value);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, value, name.line)?;

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, frame.into_ref())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };

                debug!("Returning value: {:?}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                    decl.name.line,
                )?;

                Ok(Flow::Normal)
            }

            Stmt::Class(decl) => {
                self.define_class(decl)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `environment` as the current frame, restoring
    /// the previous frame afterwards whatever the outcome.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let flow @ Flow::Return(_) = self.execute(stmt)? {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    fn define_class(&mut self, decl: &Rc<ClassDecl>) -> Result<()> {
        debug!("Defining class '{}'", decl.name.lexeme);

        let superclass: Option<Rc<Class>> = match &decl.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    return Err(BluError::runtime(
                        expr.line(),
                        "Superclass must be a class.",
                    ))
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&decl.name.lexeme, Value::Null, decl.name.line)?;

        let closure: EnvRef = match &superclass {
            Some(class) => {
                let mut frame = Environment::with_enclosing(Rc::clone(&self.environment));
                frame.define(
                    "super",
                    Value::Callable(Callable::Class(Rc::clone(class))),
                    decl.name.line,
                )?;
                frame.into_ref()
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = decl
            .methods
            .iter()
            .map(|method| {
                let is_initializer: bool = method.name.lexeme == INITIALIZER;
                let function = Function::new(Rc::clone(method), Rc::clone(&closure), is_initializer);
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(Rc::clone(decl), superclass, methods, closure);

        self.environment
            .borrow_mut()
            .assign(&decl.name, Value::Callable(Callable::Class(Rc::new(class))))?;

        info!("Class '{}' defined", decl.name.lexeme);

        Ok(())
    }

    // ───────────────────────────── expressions ─────────────────────────────

    /// Evaluate `expr` with `environment` as the current frame.
    pub fn evaluate_in(&mut self, expr: &Expr, environment: EnvRef) -> Result<Value> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let result = self.evaluate(expr);

        self.environment = previous;

        result
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Null => Value::Null,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        Environment::assign_at(&self.environment, *distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(BluError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(BluError::runtime(name.line, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;

                instance.borrow_mut().set(&name.lexeme, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Lambda(decl) => Ok(Value::Callable(Callable::Lambda(Rc::new(Lambda::new(
                Rc::clone(decl),
                Rc::clone(&self.environment),
            ))))),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(BluError::runtime(operator.line, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(BluError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    /// Both operands are evaluated, left first, before the operator is applied.
    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                (Value::String(a), other) => Ok(Value::String(format!("{}{}", a, other))),
                _ => Err(BluError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => {
                let (a, b) = number_operands(operator, &left, &right)?;

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    TokenType::SLASH => Ok(Value::Number(a / b)),
                    TokenType::GREATER => Ok(Value::Bool(a > b)),
                    TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                    TokenType::LESS => Ok(Value::Bool(a < b)),
                    TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                    _ => Err(BluError::runtime(
                        operator.line,
                        format!("Invalid binary operator '{}'.", operator.lexeme),
                    )),
                }
            }
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value> {
        let callee: Value = self.evaluate(callee)?;

        let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }

        let callable: Callable = match callee {
            Value::Callable(callable) => callable,
            other => {
                debug!("Attempted to call a value of type {}", other.type_name());

                return Err(BluError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                ));
            }
        };

        if values.len() != callable.arity() {
            return Err(BluError::runtime(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    values.len()
                ),
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(BluError::runtime(paren.line, "Stack overflow."));
        }

        debug!("Calling {} with {} argument(s)", callable, values.len());

        self.call_depth += 1;
        let result = callable.call(self, values, paren.line);
        self.call_depth -= 1;

        result
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = self.locals.get(&id).copied().ok_or_else(|| {
            BluError::runtime(keyword.line, "Can't use 'super' outside of a class.")
        })?;

        let superclass: Rc<Class> =
            match Environment::get_at(&self.environment, distance, "super", keyword.line)? {
                Value::Callable(Callable::Class(class)) => class,
                _ => return Err(BluError::runtime(keyword.line, "Superclass must be a class.")),
            };

        // `this` lives in the frame just inside the one binding `super`.
        let instance: Rc<RefCell<Instance>> = match Environment::get_at(
            &self.environment,
            distance.saturating_sub(1),
            "this",
            keyword.line,
        )? {
            Value::Instance(instance) => instance,
            _ => {
                return Err(BluError::runtime(
                    keyword.line,
                    "Can't use 'super' outside of a method.",
                ))
            }
        };

        let method: Rc<Function> = superclass.find_method(method)?;

        Ok(Value::Callable(Callable::Function(Rc::new(
            method.bind(&instance)?,
        ))))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => {
                Environment::get_at(&self.environment, *distance, &name.lexeme, name.line)
            }
            None => self.globals.borrow().get(name),
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(BluError::runtime(operator.line, "Operands must be numbers.")),
    }
}
