//! Call stack and global storage for the tree-walking interpreter
//!
//! This module provides:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single function's activation record with nested block scopes
//! - [`Variable`]: A named integer object with kind, constness and value
//! - [`Globals`]: Objects with static storage duration, in declaration order
//!
//! # Initialization Tracking
//!
//! A [`Variable`] holds `Option<Value>`. Locals declared without an
//! initializer start as `None`; globals are always zero-initialised.

use super::value::Value;
use crate::parser::ast::{IntKind, SourceLocation};
use rustc_hash::FxHashMap;

/// A named integer object
#[derive(Debug, Clone)]
pub struct Variable {
    pub value: Option<Value>,
    pub kind: IntKind,
    pub is_const: bool,
    pub declared_at: SourceLocation,
}

impl Variable {
    pub fn new(kind: IntKind, is_const: bool, declared_at: SourceLocation) -> Self {
        Variable {
            value: None,
            kind,
            is_const,
            declared_at,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value.convert(self.kind));
        self
    }
}

/// Stack frame for a function call
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub locals: FxHashMap<String, Variable>,
    pub call_location: Option<SourceLocation>, // Where the call happened
    pub insertion_order: Vec<String>,          // Track order of variable declarations
    scope_stack: Vec<ScopeData>,
}

#[derive(Debug, Clone, Default)]
struct ScopeData {
    shadowed: Vec<(String, Variable)>,
    declared: Vec<String>,
}

impl StackFrame {
    pub fn new(
        function_name: String,
        call_location: Option<SourceLocation>,
    ) -> Self {
        StackFrame {
            function_name,
            locals: FxHashMap::default(),
            call_location,
            insertion_order: Vec::new(),
            scope_stack: Vec::new(),
        }
    }

    /// Enter a new scope
    pub fn push_scope(&mut self) {
        self.scope_stack.push(ScopeData::default());
    }

    /// Exit the current scope, dropping its variables and restoring shadowed ones
    pub fn pop_scope(&mut self) {
        if let Some(scope) = self.scope_stack.pop() {
            for name in scope.declared {
                self.locals.remove(&name);
                if let Some(pos) = self.insertion_order.iter().rposition(|x| x == &name) {
                    self.insertion_order.remove(pos);
                }
            }

            for (name, var) in scope.shadowed {
                self.locals.insert(name, var);
            }
        }
    }

    /// Declare a new local variable in the innermost scope
    pub fn declare_var(&mut self, name: String, var: Variable) {
        if let Some(scope) = self.scope_stack.last_mut() {
            if let Some(old_var) = self.locals.insert(name.clone(), var) {
                // Shadowing an outer variable; insertion_order already has the name
                scope.shadowed.push((name, old_var));
            } else {
                scope.declared.push(name.clone());
                self.insertion_order.push(name);
            }
        } else {
            // Parameters live in the function scope
            if !self.locals.contains_key(&name) {
                self.insertion_order.push(name.clone());
            }
            self.locals.insert(name, var);
        }
    }

    pub fn get_var(&self, name: &str) -> Option<&Variable> {
        self.locals.get(name)
    }

    pub fn get_var_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.locals.get_mut(name)
    }

    /// Visible locals in declaration order
    pub fn visible_vars(&self) -> impl Iterator<Item = (&str, &Variable)> + '_ {
        self.insertion_order
            .iter()
            .filter_map(|name| self.locals.get(name).map(|var| (name.as_str(), var)))
    }
}

/// The call stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    frames: Vec<StackFrame>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { frames: Vec::new() }
    }

    /// Push a new stack frame
    pub fn push_frame(
        &mut self,
        function_name: String,
        call_location: Option<SourceLocation>,
    ) {
        self.frames
            .push(StackFrame::new(function_name, call_location));
    }

    /// Pop the top stack frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Get a mutable reference to the current frame
    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Get the depth of the call stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Global variables, alive for the whole run
#[derive(Debug, Clone, Default)]
pub struct Globals {
    vars: FxHashMap<String, Variable>,
    order: Vec<String>,
}

impl Globals {
    pub fn new() -> Self {
        Globals::default()
    }

    /// Define a global; a repeated definition replaces the earlier one in place
    pub fn declare(&mut self, name: String, var: Variable) {
        if self.vars.insert(name.clone(), var).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.vars.get_mut(name)
    }

    /// Globals in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.vars.get(name).map(|var| (name.as_str(), var)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(n: i32) -> Variable {
        Variable::new(IntKind::Int, false, SourceLocation::default()).with_value(Value::int(n))
    }

    #[test]
    fn test_shadowing_restores_outer_variable() {
        let mut frame = StackFrame::new("main".to_string(), None);
        frame.push_scope();
        frame.declare_var("x".to_string(), var(1));
        frame.push_scope();
        frame.declare_var("x".to_string(), var(2));
        frame.declare_var("y".to_string(), var(3));
        assert_eq!(frame.get_var("x").unwrap().value, Some(Value::int(2)));

        frame.pop_scope();
        assert_eq!(frame.get_var("x").unwrap().value, Some(Value::int(1)));
        assert!(frame.get_var("y").is_none());
        let names: Vec<&str> = frame.visible_vars().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x"]);
    }

    #[test]
    fn test_with_value_converts_to_declared_kind() {
        let v = Variable::new(IntKind::UChar, false, SourceLocation::default())
            .with_value(Value::int(-1));
        assert_eq!(v.value, Some(Value::new(IntKind::UChar, 255)));
    }

    #[test]
    fn test_globals_keep_declaration_order() {
        let mut globals = Globals::new();
        globals.declare("b".to_string(), var(2));
        globals.declare("a".to_string(), var(1));
        globals.declare("b".to_string(), var(5));
        let names: Vec<&str> = globals.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(globals.get("b").unwrap().value, Some(Value::int(5)));
    }
}
