//! Runtime values.
//!
//! `Value` is a closed sum type; callables are a second closed sum type
//! dispatched by [`Callable::call`]. Functions, classes and instances are held
//! behind `Rc`, so copying a value never copies the object it names.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::{Class, Instance};
use crate::error::{BluError, Result};
use crate::function::{Function, Lambda};
use crate::interpreter::Interpreter;

/// Signature of host functions exposed to scripts.
pub type NativeFn = fn(&[Value]) -> std::result::Result<Value, String>;

/// A function implemented by the host, e.g. `time`.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

/// Anything that can appear in callee position.
#[derive(Clone)]
pub enum Callable {
    /// Named function, method or initializer.
    Function(Rc<Function>),

    Lambda(Rc<Lambda>),

    /// Calling a class constructs an instance.
    Class(Rc<Class>),

    Native(Rc<NativeFunction>),
}

impl Callable {
    /// Number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Lambda(lambda) => lambda.arity(),
            Callable::Class(class) => class.arity(),
            Callable::Native(native) => native.arity,
        }
    }

    /// Invoke with already evaluated arguments. The caller has checked the
    /// arity; `line` locates errors raised by native functions.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments),
            Callable::Lambda(lambda) => lambda.call(interpreter, arguments),
            Callable::Class(class) => Class::construct(class, interpreter, arguments),
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                (native.func)(&arguments).map_err(|msg| BluError::runtime(line, msg))
            }
        }
    }

    fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Lambda(a), Callable::Lambda(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
            Callable::Lambda(_) => write!(f, "<lambda fn>"),
            Callable::Class(class) => write!(f, "{}", class.name()),
            Callable::Native(_) => write!(f, "<native fn>"),
        }
    }
}

/// A dynamically typed runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// `null` and `false` are falsy; every other value (including `0` and `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Callable(Callable::Class(_)) => "class",
            Value::Callable(_) => "function",
            Value::Instance(_) => "instance",
        }
    }
}

impl PartialEq for Value {
    /// Value equality for primitives, identity for objects, no coercion.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Shortest round‑trippable decimal text, without a forced `.0`.
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => write!(f, "{}", format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(callable) => write!(f, "{}", callable),

            Value::Instance(instance) => write!(f, "{}", instance.borrow()),
        }
    }
}

// Closures reach back into environments that hold them, so a derived Debug
// could recurse forever; print the user-facing form instead.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}
