//! Virtual machine executing the block IR
//!
//! Frames live on an explicit stack rather than the host stack, so deep
//! recursion is bounded only by `Limits::max_call_depth`. Each frame owns
//! one `Option<Value>` slot per local; `None` is an indeterminate object.

use super::mir::*;
use crate::config::Limits;
use crate::interpreter::errors::RuntimeError;
use crate::memory::{arith, value::Value};
use crate::outcome::{Outcome, Termination, ABORT_STATUS};
use crate::parser::ast::{IntKind, SourceLocation};
use tracing::{debug, info, trace};

struct Frame<'m> {
    body: &'m Body,
    locals: Vec<Option<Value>>,
    block: BasicBlock,
    statement: usize,
    /// Nested user calls up to and including this frame
    depth: usize,
    /// Where the caller wants the return value
    destination: Option<Place>,
    /// Caller block to resume in
    resume: BasicBlock,
    call_location: SourceLocation,
}

impl<'m> Frame<'m> {
    fn new(body: &'m Body, depth: usize, call_location: SourceLocation) -> Self {
        Frame {
            body,
            locals: vec![None; body.locals.len()],
            block: BasicBlock::START,
            statement: 0,
            depth,
            destination: None,
            resume: BasicBlock::START,
            call_location,
        }
    }
}

pub struct Machine<'m> {
    module: &'m Module,
    limits: Limits,
    globals: Vec<Option<Value>>,
    frames: Vec<Frame<'m>>,
    steps: u64,
}

impl<'m> Machine<'m> {
    pub fn new(module: &'m Module, limits: Limits) -> Self {
        Machine {
            module,
            limits,
            globals: vec![None; module.globals.len()],
            frames: Vec::new(),
            steps: 0,
        }
    }

    /// Initialise globals, then run `main` to completion
    pub fn run(&mut self) -> Result<Outcome, RuntimeError> {
        info!(functions = self.module.bodies.len(), "vm: starting");

        let outcome = match self.run_main() {
            Ok(value) => Outcome::new(value, Termination::Return),
            Err(RuntimeError::ProgramExit {
                aborted: true, ..
            }) => Outcome::aborted(),
            Err(RuntimeError::ProgramExit { status, .. }) => {
                Outcome::new(status, Termination::Exit)
            }
            Err(e) => {
                debug!(error = %e, "vm: runtime error");
                return Err(e);
            }
        };

        info!(steps = self.steps, %outcome, "vm: finished");
        Ok(outcome)
    }

    fn run_main(&mut self) -> Result<i128, RuntimeError> {
        let module = self.module;
        self.execute(Frame::new(&module.global_init, 0, module.global_init.location))?;

        let main = module.body("main").ok_or(RuntimeError::NoMainFunction)?;
        if main.arg_count != 0 {
            return Err(RuntimeError::UnsupportedOperation {
                message: "main() must not take parameters".to_string(),
                location: main.location,
            });
        }
        self.check_depth(0, main.location)?;

        // Falling off the end of main returns 0
        let value = self.execute(Frame::new(main, 1, main.location))?;
        Ok(value.map(|v| v.convert(IntKind::Int).as_i128()).unwrap_or(0))
    }

    /// Global values in declaration order
    pub fn globals(&self) -> impl Iterator<Item = (&str, Option<Value>)> + '_ {
        self.module
            .globals
            .iter()
            .zip(&self.globals)
            .map(|(decl, value)| (decl.name.as_str(), *value))
    }

    pub fn global_value(&self, name: &str) -> Option<Value> {
        self.globals()
            .find(|(global, _)| *global == name)
            .and_then(|(_, value)| value)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run `entry` until it returns; calls it makes run on the same loop
    fn execute(&mut self, entry: Frame<'m>) -> Result<Option<Value>, RuntimeError> {
        let base = self.frames.len();
        self.frames.push(entry);

        loop {
            let (body, block, index) = match self.frames.last() {
                Some(frame) => (frame.body, frame.block, frame.statement),
                None => return Ok(None),
            };
            let data = body.block(block).ok_or_else(|| RuntimeError::UnsupportedOperation {
                message: format!("jump to missing block {} in {}", block, body.name),
                location: body.location,
            })?;

            if let Some(stmt) = data.statements.get(index) {
                self.tick()?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.statement += 1;
                }
                trace!(function = %body.name, %block, "{}", stmt);
                self.execute_statement(stmt)?;
                continue;
            }

            self.tick()?;
            trace!(function = %body.name, %block, "{}", data.terminator);
            if let Some(value) = self.execute_terminator(&data.terminator, base)? {
                return Ok(value);
            }
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(RuntimeError::StepLimitExceeded {
                limit: self.limits.max_steps,
            });
        }
        Ok(())
    }

    fn check_depth(
        &self,
        depth: usize,
        location: SourceLocation) -> Result<(), RuntimeError> {
        if depth >= self.limits.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.limits.max_call_depth,
                location,
            });
        }
        Ok(())
    }

    fn execute_statement(&mut self, stmt: &Statement) -> Result<(), RuntimeError> {
        match &stmt.kind {
            StatementKind::Assign(place, rvalue) => {
                if self.is_const(*place) {
                    return Err(RuntimeError::ConstModification {
                        var: self.place_name(*place),
                        location: stmt.location,
                    });
                }
                let value = self.evaluate_rvalue(rvalue, stmt.location)?;
                self.write(*place, value);
            }
            StatementKind::Init(place, rvalue) => {
                let value = self.evaluate_rvalue(rvalue, stmt.location)?;
                self.write(*place, value);
            }
            StatementKind::StorageLive(local) | StatementKind::StorageDead(local) => {
                if let Some(slot) = self.frame_mut()?.locals.get_mut(local.0) {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    /// Returns `Some` once the entry frame at `base` has returned
    fn execute_terminator(
        &mut self,
        terminator: &Terminator,
        base: usize,
    ) -> Result<Option<Option<Value>>, RuntimeError> {
        let location = terminator.location;
        match &terminator.kind {
            TerminatorKind::Goto { target } => self.jump(*target)?,

            TerminatorKind::SwitchInt {
                discr,
                targets,
                otherwise,
            } => {
                let value = self.evaluate_operand(discr, location)?.as_i128();
                let target = targets
                    .iter()
                    .find(|(v, _)| *v == value)
                    .map(|(_, target)| *target)
                    .unwrap_or(*otherwise);
                self.jump(target)?;
            }

            TerminatorKind::Call {
                func,
                args,
                destination,
                target,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate_operand(arg, location)?);
                }
                self.call(func, values, *destination, *target, location)?;
            }

            TerminatorKind::Return => {
                let frame = self.frames.pop().ok_or_else(no_frame)?;
                let returned = frame.locals.first().copied().flatten();
                let returned = frame.body.return_kind.and(returned);

                if self.frames.len() <= base {
                    return Ok(Some(returned));
                }

                if let Some(place) = frame.destination {
                    let value = returned.ok_or_else(|| RuntimeError::MissingReturnValue {
                        function: frame.body.name.clone(),
                        location: frame.call_location,
                    })?;
                    self.write(place, value);
                }
                let caller = self.frame_mut()?;
                caller.block = frame.resume;
                caller.statement = 0;
            }

            TerminatorKind::Exit(status) => {
                let status = self
                    .evaluate_operand(status, location)?
                    .convert(IntKind::Int)
                    .as_i128();
                info!(status, line = location.line, "exit() called");
                return Err(RuntimeError::ProgramExit {
                    status,
                    aborted: false,
                });
            }

            TerminatorKind::Abort => {
                info!(line = location.line, "abort() called");
                return Err(RuntimeError::ProgramExit {
                    status: ABORT_STATUS,
                    aborted: true,
                });
            }
        }
        Ok(None)
    }

    fn call(
        &mut self,
        func: &str,
        args: Vec<Value>,
        destination: Option<Place>,
        resume: BasicBlock,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let module = self.module;
        let depth = self.frame()?.depth;
        self.check_depth(depth, location)?;

        let body = module
            .body(func)
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: func.to_string(),
                location,
            })?;
        if args.len() != body.arg_count {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: func.to_string(),
                expected: body.arg_count,
                got: args.len(),
                location,
            });
        }

        debug!(function = %func, depth = depth + 1, "call");
        let mut frame = Frame::new(body, depth + 1, location);
        frame.destination = destination;
        frame.resume = resume;
        for (i, arg) in args.into_iter().enumerate() {
            let kind = body.locals.get(i + 1).map_or(IntKind::Int, |decl| decl.kind);
            frame.locals[i + 1] = Some(arg.convert(kind));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn jump(&mut self, target: BasicBlock) -> Result<(), RuntimeError> {
        let frame = self.frame_mut()?;
        frame.block = target;
        frame.statement = 0;
        Ok(())
    }

    // ===== Places and operands =====

    fn frame(&self) -> Result<&Frame<'m>, RuntimeError> {
        self.frames.last().ok_or_else(no_frame)
    }

    fn frame_mut(&mut self) -> Result<&mut Frame<'m>, RuntimeError> {
        self.frames.last_mut().ok_or_else(no_frame)
    }

    fn evaluate_rvalue(
        &self,
        rvalue: &Rvalue,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match rvalue {
            Rvalue::Use(operand) => self.evaluate_operand(operand, location),
            Rvalue::BinaryOp(op, lhs, rhs) => {
                let lhs = self.evaluate_operand(lhs, location)?;
                let rhs = self.evaluate_operand(rhs, location)?;
                arith::binary(*op, lhs, rhs).map_err(|e| RuntimeError::from_arith(e, location))
            }
            Rvalue::UnaryOp(op, operand) => {
                let value = self.evaluate_operand(operand, location)?;
                Ok(arith::unary(*op, value))
            }
            Rvalue::Cast(operand, kind) => {
                Ok(self.evaluate_operand(operand, location)?.convert(*kind))
            }
        }
    }

    fn evaluate_operand(
        &self,
        operand: &Operand,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Const(value) => Ok(*value),
            Operand::Copy(place) => self.read(*place, location),
        }
    }

    fn read(
        &self,
        place: Place,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let slot = match place {
            Place::Local(local) => self.frame()?.locals.get(local.0).copied().flatten(),
            Place::Global(index) => self.globals.get(index).copied().flatten(),
        };
        slot.ok_or_else(|| RuntimeError::UninitializedRead {
            var: self.place_name(place),
            location,
        })
    }

    /// Store, converting to the place's declared kind
    fn write(&mut self, place: Place, value: Value) {
        let kind = self.place_kind(place);
        let slot = match place {
            Place::Local(local) => self
                .frames
                .last_mut()
                .and_then(|frame| frame.locals.get_mut(local.0)),
            Place::Global(index) => self.globals.get_mut(index),
        };
        if let Some(slot) = slot {
            *slot = Some(value.convert(kind));
        }
    }

    fn place_kind(&self, place: Place) -> IntKind {
        match place {
            Place::Local(local) => self
                .frames
                .last()
                .and_then(|frame| frame.body.local_decl(local))
                .map_or(IntKind::Int, |decl| decl.kind),
            Place::Global(index) => self
                .module
                .globals
                .get(index)
                .map_or(IntKind::Int, |decl| decl.kind),
        }
    }

    fn is_const(&self, place: Place) -> bool {
        match place {
            Place::Local(local) => self
                .frames
                .last()
                .and_then(|frame| frame.body.local_decl(local))
                .is_some_and(|decl| decl.is_const),
            Place::Global(index) => self
                .module
                .globals
                .get(index)
                .is_some_and(|decl| decl.is_const),
        }
    }

    fn place_name(&self, place: Place) -> String {
        match place {
            Place::Local(local) => self
                .frames
                .last()
                .map_or_else(|| local.to_string(), |frame| frame.body.local_name(local)),
            Place::Global(index) => self
                .module
                .globals
                .get(index)
                .map_or_else(|| place.to_string(), |decl| decl.name.clone()),
        }
    }
}

fn no_frame() -> RuntimeError {
    RuntimeError::UnsupportedOperation {
        message: "no active frame".to_string(),
        location: SourceLocation::default(),
    }
}
