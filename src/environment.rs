use crate::error::{BluError, Result};
use crate::token::Token;
use crate::value::{Callable, NativeFunction, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a frame. A frame lives as long as the longest‑lived
/// closure, bound method or nested frame pointing at it.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical frame: name → value, plus the enclosing frame.
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Does *this* frame (not its ancestors) bind `name`?
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bind `name` in this frame. Rebinding a name already present in the
    /// same frame is an error; shadowing in a nested frame is not.
    pub fn define(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            return Err(BluError::runtime(
                line,
                format!("Variable '{}' already defined.", name),
            ));
        }

        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Bind a host function under its own name, replacing any earlier binding.
    pub fn define_native(&mut self, native: NativeFunction) {
        let name: String = native.name.to_string();

        self.values
            .insert(name, Value::Callable(Callable::Native(Rc::new(native))));
    }

    /// Look `name` up here, then outward through the chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(BluError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Overwrite the nearest binding of `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(BluError::runtime(
                name.line,
                format!("Cannot assign to undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Read `name` from the frame exactly `distance` hops out.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str, line: usize) -> Result<Value> {
        Self::ancestor(env, distance)
            .and_then(|frame| {
                let value = frame.borrow().values.get(name).cloned();
                value
            })
            .ok_or_else(|| BluError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    /// Write `name` in the frame exactly `distance` hops out.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        if let Some(frame) = Self::ancestor(env, distance) {
            if let Some(slot) = frame.borrow_mut().values.get_mut(&name.lexeme) {
                *slot = value;
                return Ok(());
            }
        }

        Err(BluError::runtime(
            name.line,
            format!("Cannot assign to undefined variable '{}'.", name.lexeme),
        ))
    }

    fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut frame: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next = frame.borrow().enclosing.clone()?;
            frame = next;
        }

        Some(frame)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();

        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_enclosing", &self.enclosing.is_some())
            .finish()
    }
}
