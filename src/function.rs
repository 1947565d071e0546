//! User‑defined callables: named functions (including methods and class
//! initializers) and anonymous lambdas.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::{FunctionDecl, LambdaDecl, Stmt};
use crate::class::Instance;
use crate::environment::{EnvRef, Environment};
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Run `body` in a fresh frame over `closure` with `params` bound to `arguments`.
fn invoke(
    interpreter: &mut Interpreter,
    closure: &EnvRef,
    params: &[Token],
    body: &[Stmt],
    arguments: Vec<Value>,
) -> Result<Flow> {
    let mut frame = Environment::with_enclosing(Rc::clone(closure));

    for (param, argument) in params.iter().zip(arguments) {
        frame.define(&param.lexeme, argument, param.line)?;
    }

    interpreter.execute_block(body, frame.into_ref())
}

/// A named function value: its declaration plus the frame it closed over.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Execute the body. Without an explicit `return` the result is `null`;
    /// initializers always yield their `this`.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling function '{}'", self.name());

        let flow = invoke(
            interpreter,
            &self.closure,
            &self.declaration.params,
            &self.declaration.body,
            arguments,
        )?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", self.declaration.name.line);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Null,
        })
    }

    /// A copy of this method whose closure additionally binds `this`.
    pub fn bind(&self, instance: &Rc<RefCell<Instance>>) -> Result<Function> {
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));
        frame.define(
            "this",
            Value::Instance(Rc::clone(instance)),
            self.declaration.name.line,
        )?;

        Ok(Function::new(
            Rc::clone(&self.declaration),
            frame.into_ref(),
            self.is_initializer,
        ))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// An anonymous function created by a `func (...) { ... }` expression.
pub struct Lambda {
    declaration: Rc<LambdaDecl>,
    closure: EnvRef,
}

impl Lambda {
    pub fn new(declaration: Rc<LambdaDecl>, closure: EnvRef) -> Self {
        Lambda {
            declaration,
            closure,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling lambda from line {}", self.declaration.keyword.line);

        let flow = invoke(
            interpreter,
            &self.closure,
            &self.declaration.params,
            &self.declaration.body,
            arguments,
        )?;

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Null,
        })
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<lambda fn>")
    }
}
