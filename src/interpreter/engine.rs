// Execution engine for the tree-walking interpreter

use crate::config::Limits;
use crate::interpreter::errors::RuntimeError;
use crate::memory::stack::{Globals, Stack, Variable};
use crate::memory::value::Value;
use crate::outcome::{Outcome, Termination};
use crate::parser::ast::*;
use crate::snapshot::{Snapshot, SnapshotManager};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// Host stack left when evaluation grows onto a new segment
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each new stack segment
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Pending non-local control transfer raised by a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return,
}

/// The main interpreter that executes a C program
pub struct Interpreter {
    /// Function definitions (name -> FunctionDef)
    pub(crate) function_defs: FxHashMap<String, FunctionDef>,

    /// Return types of every declared or defined function
    pub(crate) signatures: FxHashMap<String, Type>,

    /// Global declarations in source order, initialised before `main`
    global_decls: Vec<AstNode>,

    /// Call stack
    pub(crate) stack: Stack,

    /// Objects with static storage duration
    pub(crate) globals: Globals,

    pub(crate) limits: Limits,

    /// Current source location being executed
    pub(crate) current_location: SourceLocation,

    /// Snapshot history, only kept when tracing
    snapshot_manager: Option<SnapshotManager>,

    /// Statements executed so far
    steps: u64,

    pub(crate) control_flow: ControlFlow,

    /// Return value of the function currently returning
    pub(crate) return_value: Option<Value>,
}

impl Interpreter {
    /// Create a new interpreter for a parsed program
    pub fn new(program: &Program, limits: Limits) -> Self {
        let mut signatures = FxHashMap::default();
        let mut function_defs = FxHashMap::default();

        for node in &program.nodes {
            if let AstNode::FunctionDecl {
                name, return_type, ..
            } = node
            {
                signatures.insert(name.clone(), *return_type);
            }
        }
        for func in program.functions() {
            signatures.insert(func.name.clone(), func.return_type);
            function_defs.insert(func.name.clone(), func);
        }

        Interpreter {
            function_defs,
            signatures,
            global_decls: program.globals().cloned().collect(),
            stack: Stack::new(),
            globals: Globals::new(),
            limits,
            current_location: SourceLocation::new(1, 1),
            snapshot_manager: None,
            steps: 0,
            control_flow: ControlFlow::Normal,
            return_value: None,
        }
    }

    /// Record a snapshot after every executed statement
    pub fn with_snapshots(mut self) -> Self {
        self.snapshot_manager = Some(SnapshotManager::new(self.limits.snapshot_memory_limit));
        self
    }

    /// Run the program from start to finish
    pub fn run(&mut self) -> Result<Outcome, RuntimeError> {
        info!(functions = self.function_defs.len(), "interpreter: starting");

        let outcome = match self.run_main() {
            Ok(value) => Outcome::new(value, Termination::Return),
            Err(RuntimeError::ProgramExit {
                aborted: true, ..
            }) => Outcome::aborted(),
            Err(RuntimeError::ProgramExit { status, .. }) => {
                Outcome::new(status, Termination::Exit)
            }
            Err(e) => {
                debug!(error = %e, "interpreter: runtime error");
                return Err(e);
            }
        };

        info!(steps = self.steps, %outcome, "interpreter: finished");
        Ok(outcome)
    }

    fn run_main(&mut self) -> Result<i128, RuntimeError> {
        self.init_globals()?;

        let main_fn = self
            .function_defs
            .get("main")
            .cloned()
            .ok_or(RuntimeError::NoMainFunction)?;
        if !main_fn.params.is_empty() {
            return Err(RuntimeError::UnsupportedOperation {
                message: "main() must not take parameters".to_string(),
                location: main_fn.location,
            });
        }

        self.take_snapshot()?;

        // Falling off the end of main (or `void main`) returns 0
        let value = self.call_function(&main_fn, Vec::new(), main_fn.location)?;
        Ok(value.map(|v| v.convert(IntKind::Int).as_i128()).unwrap_or(0))
    }

    /// Create every global in declaration order, zero-initialised unless an
    /// initializer is given
    fn init_globals(&mut self) -> Result<(), RuntimeError> {
        let decls = std::mem::take(&mut self.global_decls);
        for decl in &decls {
            if let AstNode::VarDecl {
                var_type,
                declarators,
                location,
            } = decl
            {
                let kind = Self::declared_kind(var_type, *location)?;
                for declarator in declarators {
                    self.current_location = declarator.location;
                    let value = match &declarator.init {
                        Some(init) => self.evaluate_expr(init)?,
                        None => Value::zero(kind),
                    };
                    let var = Variable::new(kind, var_type.is_const, declarator.location)
                        .with_value(value);
                    debug!(name = %declarator.name, value = ?var.value, "global");
                    self.globals.declare(declarator.name.clone(), var);
                }
            }
        }
        self.global_decls = decls;
        Ok(())
    }

    /// Call a user function with already-evaluated arguments.
    ///
    /// Returns `None` for `void` functions and for functions that end
    /// without returning a value.
    pub(crate) fn call_function(
        &mut self,
        func: &FunctionDef,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        if self.stack.depth() >= self.limits.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.limits.max_call_depth,
                location,
            });
        }
        if args.len() != func.params.len() {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: func.name.clone(),
                expected: func.params.len(),
                got: args.len(),
                location,
            });
        }

        debug!(function = %func.name, depth = self.stack.depth() + 1, "call");
        self.stack.push_frame(func.name.clone(), Some(location));

        for (param, arg) in func.params.iter().zip(args) {
            let kind = Self::declared_kind(&param.param_type, func.location)?;
            let name = param.name.clone().unwrap_or_default();
            let var = Variable::new(kind, param.param_type.is_const, func.location).with_value(arg);
            if let Some(frame) = self.stack.current_frame_mut() {
                frame.declare_var(name, var);
            }
        }

        self.return_value = None;
        self.execute_block(&func.body)?;

        let returned = match self.control_flow {
            ControlFlow::Return => self.return_value.take(),
            ControlFlow::Normal => None,
            ControlFlow::Break | ControlFlow::Continue => {
                return Err(RuntimeError::UnsupportedOperation {
                    message: "'break' or 'continue' outside a loop".to_string(),
                    location: self.current_location,
                });
            }
        };
        self.control_flow = ControlFlow::Normal;
        self.stack.pop_frame();
        self.current_location = location;

        Ok(match func.return_type.int_kind() {
            Some(kind) => returned.map(|v| v.convert(kind)),
            None => None,
        })
    }

    /// Execute a single statement.
    /// Returns true if a snapshot should be taken after this statement
    pub(crate) fn execute_statement(
        &mut self,
        stmt: &AstNode,
    ) -> Result<bool, RuntimeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.execute_statement_inner(stmt)
        })
    }

    fn execute_statement_inner(
        &mut self,
        stmt: &AstNode,
    ) -> Result<bool, RuntimeError> {
        self.tick()?;
        self.current_location = stmt.location();
        debug!(line = self.current_location.line, "statement");

        match stmt {
            AstNode::VarDecl {
                var_type,
                declarators,
                location,
            } => {
                self.execute_var_decl(var_type, declarators, *location)?;
                Ok(true)
            }

            AstNode::ExpressionStatement { expr, .. } => {
                self.evaluate_discarded(expr)?;
                Ok(true)
            }

            AstNode::Return { expr, location } => {
                self.execute_return(expr.as_deref(), *location)?;
                Ok(false) // Return already takes a snapshot
            }

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => {
                self.execute_if(condition, then_branch, else_branch.as_deref(), *location)?;
                Ok(false)
            }

            AstNode::While {
                condition,
                body,
                location,
            } => {
                self.execute_while(condition, body, *location)?;
                Ok(false)
            }

            AstNode::DoWhile {
                body,
                condition,
                location,
            } => {
                self.execute_do_while(body, condition, *location)?;
                Ok(false)
            }

            AstNode::For {
                init,
                condition,
                increment,
                body,
                location,
            } => {
                self.execute_for(
                    init.as_deref(),
                    condition.as_deref(),
                    increment.as_deref(),
                    body,
                    *location,
                )?;
                Ok(false)
            }

            AstNode::Switch {
                expr,
                cases,
                location,
            } => {
                self.execute_switch(expr, cases, *location)?;
                Ok(false)
            }

            AstNode::Break { .. } => {
                self.control_flow = ControlFlow::Break;
                Ok(false)
            }

            AstNode::Continue { .. } => {
                self.control_flow = ControlFlow::Continue;
                Ok(false)
            }

            AstNode::Block { statements, .. } => {
                self.execute_block(statements)?;
                Ok(false)
            }

            AstNode::Empty { .. } => Ok(true),

            other => Err(RuntimeError::UnsupportedOperation {
                message: "declaration or expression in statement position".to_string(),
                location: other.location(),
            }),
        }
    }

    /// Execute statements in a fresh scope
    pub(crate) fn execute_block(
        &mut self,
        statements: &[AstNode]) -> Result<(), RuntimeError> {
        self.enter_scope();
        let result = self.execute_statements(statements);
        self.exit_scope();
        result
    }

    /// Execute statements in the current scope until one raises control flow
    pub(crate) fn execute_statements(
        &mut self,
        statements: &[AstNode]) -> Result<(), RuntimeError> {
        for stmt in statements {
            let needs_snapshot = self.execute_statement(stmt)?;
            if self.control_flow != ControlFlow::Normal {
                return Ok(());
            }
            if needs_snapshot {
                self.take_snapshot()?;
            }
        }
        Ok(())
    }

    /// Count one unit of work against the step budget
    pub(crate) fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(RuntimeError::StepLimitExceeded {
                limit: self.limits.max_steps,
            });
        }
        Ok(())
    }

    pub(crate) fn enter_scope(&mut self) {
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.push_scope();
        }
    }

    pub(crate) fn exit_scope(&mut self) {
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.pop_scope();
        }
    }

    pub(crate) fn declared_kind(
        ty: &Type,
        location: SourceLocation,
    ) -> Result<IntKind, RuntimeError> {
        ty.int_kind().ok_or(RuntimeError::UnsupportedOperation {
            message: "object of type void".to_string(),
            location,
        })
    }

    // ===== Variable access =====

    fn lookup_var(&self, name: &str) -> Option<&Variable> {
        self.stack
            .current_frame()
            .and_then(|frame| frame.get_var(name))
            .or_else(|| self.globals.get(name))
    }

    fn lookup_var_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let in_frame = self
            .stack
            .current_frame()
            .is_some_and(|frame| frame.get_var(name).is_some());
        if in_frame {
            self.stack
                .current_frame_mut()
                .and_then(|frame| frame.get_var_mut(name))
        } else {
            self.globals.get_mut(name)
        }
    }

    /// Kind of a visible variable, without reading it
    pub(crate) fn visible_kind(&self, name: &str) -> Option<IntKind> {
        self.lookup_var(name).map(|var| var.kind)
    }

    /// Read a variable's current value
    pub(crate) fn read_var(
        &self,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let var = self
            .lookup_var(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            })?;
        var.value.ok_or_else(|| RuntimeError::UninitializedRead {
            var: name.to_string(),
            location,
        })
    }

    /// Store into a variable, converting to its declared kind.
    /// Returns the value actually stored.
    pub(crate) fn write_var(
        &mut self,
        name: &str,
        value: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let var = self
            .lookup_var_mut(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            })?;
        if var.is_const {
            return Err(RuntimeError::ConstModification {
                var: name.to_string(),
                location,
            });
        }
        let stored = value.convert(var.kind);
        var.value = Some(stored);
        Ok(stored)
    }

    // ===== Snapshots =====

    pub(crate) fn take_snapshot(&mut self) -> Result<(), RuntimeError> {
        let Some(manager) = self.snapshot_manager.as_mut() else {
            return Ok(());
        };
        let snapshot = Snapshot::capture(
            self.steps,
            self.current_location,
            &self.globals,
            &self.stack,
        );
        manager
            .push(snapshot)
            .map_err(|_| RuntimeError::SnapshotLimitExceeded {
                current: manager.memory_usage(),
                limit: manager.memory_limit(),
            })
    }

    pub(crate) fn snapshot_at(
        &mut self,
        location: SourceLocation) -> Result<(), RuntimeError> {
        self.current_location = location;
        self.take_snapshot()
    }

    // ===== Inspection =====

    /// Snapshots recorded so far (empty unless created with [`Interpreter::with_snapshots`])
    pub fn snapshots(&self) -> &[Snapshot] {
        match &self.snapshot_manager {
            Some(manager) => manager.as_slice(),
            None => &[],
        }
    }

    /// Current value of a global, `None` if undefined
    pub fn global_value(&self, name: &str) -> Option<Value> {
        self.globals.get(name).and_then(|var| var.value)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}
