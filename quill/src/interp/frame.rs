//! Per-call binding tables
//!
//! Every call pushes one flat frame. Name lookups consult the top frame
//! before the lexical environment chain, so a frame binding shadows any
//! same-named lexical binding for the duration of the call. Frames never
//! chain to each other.

use super::Value;
use std::collections::HashMap;

/// Bindings created during one call
#[derive(Debug, Clone)]
pub struct StackFrame {
    /// Name of the call that created the frame
    pub name: String,
    variables: HashMap<String, Value>,
}

impl StackFrame {
    pub fn new(name: impl Into<String>) -> Self {
        StackFrame {
            name: name.into(),
            variables: HashMap::new(),
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn add_variables(&mut self, variables: impl IntoIterator<Item = (String, Value)>) {
        self.variables.extend(variables);
    }

    /// Overwrite `name` only if the frame already binds it
    pub fn update_variable(&mut self, name: &str, value: Value) -> bool {
        match self.variables.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn try_get(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.variables.len()
    }
}

/// Stack of call frames; operations act on the top frame
#[derive(Debug, Default)]
pub struct StackFrames {
    frames: Vec<StackFrame>,
}

impl StackFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.frames.push(StackFrame::new(name));
    }

    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    pub fn peek(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn add_variable(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.add_variable(name, value);
        }
    }

    pub fn add_variables(&mut self, variables: impl IntoIterator<Item = (String, Value)>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.add_variables(variables);
        }
    }

    pub fn update_variable(&mut self, name: &str, value: Value) -> bool {
        self.frames
            .last_mut()
            .is_some_and(|frame| frame.update_variable(name, value))
    }

    pub fn try_get(&self, name: &str) -> Option<Value> {
        self.frames.last().and_then(|frame| frame.try_get(name))
    }
}
