// Snapshot history of interpreter state, one entry per executed statement

use crate::memory::stack::{Globals, Stack};
use crate::memory::value::Value;
use crate::parser::ast::{IntKind, SourceLocation};
use std::fmt;
use std::mem::size_of;

/// Where a variable in a snapshot lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Global,
    /// Frame index, 0 being `main`
    Local(usize),
}

/// One variable as seen in a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct VariableView {
    pub scope: VarScope,
    pub name: String,
    pub kind: IntKind,
    pub value: Option<Value>,
}

/// Snapshot of execution state after a statement
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub step: u64,
    pub source_location: SourceLocation,
    pub function: String,
    pub call_depth: usize,
    pub variables: Vec<VariableView>,
}

impl Snapshot {
    /// Capture globals and the visible locals of every frame
    pub fn capture(
        step: u64,
        source_location: SourceLocation,
        globals: &Globals,
        stack: &Stack,
    ) -> Self {
        let mut variables: Vec<VariableView> = globals
            .iter()
            .map(|(name, var)| VariableView {
                scope: VarScope::Global,
                name: name.to_string(),
                kind: var.kind,
                value: var.value,
            })
            .collect();

        for (index, frame) in stack.frames().iter().enumerate() {
            variables.extend(frame.visible_vars().map(|(name, var)| VariableView {
                scope: VarScope::Local(index),
                name: name.to_string(),
                kind: var.kind,
                value: var.value,
            }));
        }

        Snapshot {
            step,
            source_location,
            function: stack
                .current_frame()
                .map(|frame| frame.function_name.clone())
                .unwrap_or_default(),
            call_depth: stack.depth(),
            variables,
        }
    }

    /// Value of a variable in the innermost scope that defines it
    pub fn lookup(&self, name: &str) -> Option<&VariableView> {
        self.variables.iter().rev().find(|v| v.name == name)
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        let names: usize = self.variables.iter().map(|v| v.name.len()).sum();
        size_of::<Snapshot>()
            + self.function.len()
            + self.variables.len() * size_of::<VariableView>()
            + names
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<5} {:>4}:{:<3} {}",
            self.step, self.source_location.line, self.source_location.column, self.function
        )?;
        for var in &self.variables {
            let prefix = match var.scope {
                VarScope::Global => "",
                VarScope::Local(_) => "%",
            };
            match var.value {
                Some(value) => write!(f, " {}{}={}", prefix, var.name, value)?,
                None => write!(f, " {}{}=?", prefix, var.name)?,
            }
        }
        Ok(())
    }
}

/// Manages execution history under a memory budget
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), String> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(format!(
                "Snapshot memory limit exceeded: {} + {} > {}",
                self.current_memory, snapshot_size, self.max_memory
            ));
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get max memory limit
    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::stack::Variable;

    fn sample() -> Snapshot {
        let mut globals = Globals::new();
        globals.declare(
            "a".to_string(),
            Variable::new(IntKind::Int, false, SourceLocation::default()).with_value(Value::int(2)),
        );
        let mut stack = Stack::new();
        stack.push_frame("main".to_string(), None);
        if let Some(frame) = stack.current_frame_mut() {
            frame.push_scope();
            frame.declare_var(
                "t1".to_string(),
                Variable::new(IntKind::Int, false, SourceLocation::default()),
            );
        }
        Snapshot::capture(3, SourceLocation::new(6, 5), &globals, &stack)
    }

    #[test]
    fn test_capture_and_display() {
        let snap = sample();
        assert_eq!(snap.function, "main");
        assert_eq!(snap.lookup("a").unwrap().value, Some(Value::int(2)));
        assert_eq!(snap.lookup("t1").unwrap().scope, VarScope::Local(0));
        let line = snap.to_string();
        assert!(line.contains(" a=2"));
        assert!(line.contains(" %t1=?"));
    }

    #[test]
    fn test_memory_limit_enforced() {
        let snap = sample();
        let size = snap.estimated_size();
        let mut manager = SnapshotManager::new(size * 2);
        assert!(manager.push(snap.clone()).is_ok());
        assert!(manager.push(snap.clone()).is_ok());
        assert!(manager.push(snap).is_err());
        assert_eq!(manager.as_slice().len(), 2);
        assert_eq!(manager.memory_usage(), size * 2);
    }
}
