//! Classes and their instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::ClassDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::{BluError, Result};
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{Callable, Value};

/// Name of the method run on construction.
pub const INITIALIZER: &str = "init";

/// A class value. Instances share it through `Rc`, so it outlives all of them.
pub struct Class {
    declaration: Rc<ClassDecl>,
    superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
    /// Frame the methods and field initializers close over; binds `super`
    /// when there is a superclass.
    closure: EnvRef,
}

impl Class {
    pub fn new(
        declaration: Rc<ClassDecl>,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
        closure: EnvRef,
    ) -> Self {
        Class {
            declaration,
            superclass,
            methods,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Own methods first, then the superclass chain.
    fn lookup_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.lookup_method(name)),
        }
    }

    /// Resolve a method through the inheritance chain.
    pub fn find_method(&self, name: &Token) -> Result<Rc<Function>> {
        self.lookup_method(&name.lexeme).ok_or_else(|| {
            BluError::runtime(name.line, format!("Undefined property '{}'.", name.lexeme))
        })
    }

    /// Arity of the nearest `init` in the chain, 0 without one.
    pub fn arity(&self) -> usize {
        self.lookup_method(INITIALIZER)
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    /// `Class(args)`: allocate an instance and run the chain's field
    /// defaults and initializers root‑to‑leaf.
    pub fn construct(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Constructing instance of '{}'", class.name());

        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

        class.initialize(&instance, interpreter, &arguments)?;

        Ok(Value::Instance(instance))
    }

    fn initialize(
        &self,
        instance: &Rc<RefCell<Instance>>,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Result<()> {
        if let Some(superclass) = &self.superclass {
            superclass.initialize(instance, interpreter, arguments)?;
        }

        // Field initializers see the same frame shape as a bound method.
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));
        frame.define(
            "this",
            Value::Instance(Rc::clone(instance)),
            self.declaration.name.line,
        )?;
        let frame: EnvRef = frame.into_ref();

        for field in &self.declaration.fields {
            let value: Value = match &field.initializer {
                Some(expr) => interpreter.evaluate_in(expr, Rc::clone(&frame))?,
                None => Value::Null,
            };

            instance.borrow_mut().set(&field.name.lexeme, value);
        }

        if let Some(init) = self.methods.get(INITIALIZER) {
            let bound: Function = init.bind(instance)?;

            if init.arity() == arguments.len() {
                bound.call(interpreter, arguments.to_vec())?;
            } else if init.arity() == 0 {
                bound.call(interpreter, Vec::new())?;
            } else {
                debug!(
                    "Skipping '{}.init': arity {} does not match {} argument(s)",
                    self.name(),
                    init.arity(),
                    arguments.len()
                );
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name())
    }
}

/// An object: its class plus an open set of fields.
pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property read: a field if present, else a method bound to this instance.
    pub fn get(instance: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value> {
        let (field, class) = {
            let this = instance.borrow();
            (this.fields.get(&name.lexeme).cloned(), Rc::clone(&this.class))
        };

        if let Some(value) = field {
            return Ok(value);
        }

        let method: Rc<Function> = class.find_method(name)?;
        let bound: Function = method.bind(instance)?;

        Ok(Value::Callable(Callable::Function(Rc::new(bound))))
    }

    /// Unconditional upsert; instances accept new fields at any time.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name())
    }
}
