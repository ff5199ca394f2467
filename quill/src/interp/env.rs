//! Environment for variable bindings

use super::error::{InterpResult, RuntimeError};
use super::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to an environment
pub type EnvRef = Rc<RefCell<Environment>>;

/// Environment holding variable bindings.
///
/// Children keep their parent alive, so a closure's defining environment
/// lives as long as the closure does.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variable bindings in this scope
    bindings: HashMap<String, Value>,
    /// Parent environment for lexical scoping
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Create a new environment with a parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Define (or overwrite) a variable in this scope only
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Look up a variable in the scope chain
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            None
        }
    }

    /// Update the nearest binding of `name` in the scope chain
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = value;
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// Read `name` from the scope exactly `distance` parent links up
    pub fn get_at(&self, distance: usize, name: &str) -> InterpResult<Value> {
        if distance == 0 {
            return self
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::undefined_variable(name));
        }
        match &self.parent {
            Some(parent) => parent.borrow().get_at(distance - 1, name),
            None => Err(RuntimeError::missing_scope(name, distance)),
        }
    }

    /// Overwrite `name` in the scope exactly `distance` parent links up
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value) -> InterpResult<()> {
        if distance == 0 {
            return match self.bindings.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(RuntimeError::undefined_variable(name)),
            };
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign_at(distance - 1, name, value),
            None => Err(RuntimeError::missing_scope(name, distance)),
        }
    }

    /// Names visible from this scope, innermost first (for suggestions)
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        if let Some(parent) = &self.parent {
            names.extend(parent.borrow().visible_names());
        }
        names
    }

    /// Get all bindings (for debugging)
    pub fn bindings(&self) -> &HashMap<String, Value> {
        &self.bindings
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a child environment from a parent reference
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Rc::clone(parent)).into_ref()
}
