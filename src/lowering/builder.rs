//! AST to block IR lowering
//!
//! Every read of a variable is copied into a fresh temporary when it is
//! evaluated, so later stores cannot change an operand that was already
//! read. Assignments and prefix `++`/`--` store immediately. The store of a
//! postfix `++`/`--` is queued and emitted at the next sequence point:
//!
//! - the end of a full expression
//! - after the left operand of `&&`, `||` and `,`, and after the condition of `?:`
//! - at the end of each conditional branch of `&&`, `||` and `?:`
//! - after the arguments of a call, before the call itself
//!
//! Names are resolved here, so an undefined variable is reported when the
//! program is lowered rather than when the read executes.

use super::mir::*;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::BUILTINS;
use crate::memory::typing::{binary_kind, const_eval, expr_kind, unary_kind, KindLookup};
use crate::memory::{arith, sizeof_type, value::Value};
use crate::parser::ast::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Lower a parsed program into a [`Module`]
pub fn lower_program(program: &Program) -> Result<Module, RuntimeError> {
    let mut cx = LoweringContext::new(program);
    let global_init = lower_globals(&mut cx, program)?;

    let mut bodies = FxHashMap::default();
    let mut order = Vec::new();
    for func in program.functions() {
        let body = lower_function(&mut cx, &func)?;
        if bodies.insert(func.name.clone(), body).is_none() {
            order.push(func.name);
        }
    }

    Ok(Module {
        globals: cx.globals,
        global_init,
        bodies,
        order,
    })
}

/// Program-wide symbol tables
struct LoweringContext {
    globals: Vec<GlobalDecl>,
    /// Globals whose declaration has been lowered so far
    global_index: FxHashMap<String, usize>,
    signatures: FxHashMap<String, Type>,
    defined: FxHashSet<String>,
}

impl LoweringContext {
    fn new(program: &Program) -> Self {
        let mut signatures = FxHashMap::default();
        let mut defined = FxHashSet::default();
        for node in &program.nodes {
            match node {
                AstNode::FunctionDecl {
                    name, return_type, ..
                } => {
                    signatures.insert(name.clone(), *return_type);
                }
                AstNode::FunctionDef {
                    name, return_type, ..
                } => {
                    signatures.insert(name.clone(), *return_type);
                    defined.insert(name.clone());
                }
                _ => {}
            }
        }
        LoweringContext {
            globals: Vec::new(),
            global_index: FxHashMap::default(),
            signatures,
            defined,
        }
    }

    /// A repeated definition replaces the earlier one in place
    fn define_global(&mut self, decl: GlobalDecl) -> usize {
        if let Some(&index) = self.global_index.get(&decl.name) {
            self.globals[index] = decl;
            return index;
        }
        let index = self.globals.len();
        self.global_index.insert(decl.name.clone(), index);
        self.globals.push(decl);
        index
    }

    fn is_builtin(&self, name: &str) -> bool {
        !self.defined.contains(name) && BUILTINS.contains(&name)
    }
}

fn lower_globals(
    cx: &mut LoweringContext,
    program: &Program,
) -> Result<Body, RuntimeError> {
    let mut builder = BodyBuilder::new(
        cx,
        "<globals>".to_string(),
        None,
        SourceLocation::default(),
    );
    builder.push_scope();

    for node in program.globals() {
        let AstNode::VarDecl {
            var_type,
            declarators,
            location,
        } = node
        else {
            continue;
        };
        let kind = declared_kind(var_type, *location)?;
        for declarator in declarators {
            let init = match &declarator.init {
                Some(expr) => builder.lower_full(expr)?,
                None => Operand::Const(Value::zero(kind)),
            };
            // The name becomes visible only after its own initializer
            let index = builder.cx.define_global(GlobalDecl {
                name: declarator.name.clone(),
                kind,
                is_const: var_type.is_const,
                location: declarator.location,
            });
            builder.push(
                StatementKind::Init(Place::Global(index), Rvalue::Use(init)),
                declarator.location,
            );
        }
    }

    builder.terminate(TerminatorKind::Return, SourceLocation::default());
    Ok(builder.finish())
}

fn lower_function(
    cx: &mut LoweringContext,
    func: &FunctionDef,
) -> Result<Body, RuntimeError> {
    let mut builder = BodyBuilder::new(
        cx,
        func.name.clone(),
        func.return_type.int_kind(),
        func.location,
    );

    builder.push_scope();
    for param in &func.params {
        let kind = declared_kind(&param.param_type, func.location)?;
        let local = builder.new_local(
            param.name.clone(),
            kind,
            param.param_type.is_const,
            func.location,
        );
        if let Some(name) = &param.name {
            builder.bind(name, local);
        }
    }
    builder.arg_count = func.params.len();

    builder.lower_block(&func.body)?;
    builder.pop_scope(func.location);
    builder.terminate(TerminatorKind::Return, func.location);

    let body = builder.finish();
    debug!(
        function = %body.name,
        blocks = body.blocks.len(),
        locals = body.locals.len(),
        "lowered"
    );
    Ok(body)
}

fn declared_kind(
    ty: &Type,
    location: SourceLocation,
) -> Result<IntKind, RuntimeError> {
    ty.int_kind().ok_or(RuntimeError::UnsupportedOperation {
        message: "object of type void".to_string(),
        location,
    })
}

/// A block under construction; the terminator is set exactly once
struct PendingBlock {
    statements: Vec<Statement>,
    terminator: Option<Terminator>,
}

#[derive(Default)]
struct Scope {
    names: FxHashMap<String, Local>,
    declared: Vec<Local>,
}

/// Jump targets of the innermost loop or `switch`
struct Breakable {
    break_to: BasicBlock,
    /// `None` for `switch`, which only catches `break`
    continue_to: Option<BasicBlock>,
}

/// A postfix store waiting for the next sequence point
struct DeferredStore {
    place: Place,
    old: Operand,
    delta: i128,
    location: SourceLocation,
}

struct BodyBuilder<'cx> {
    cx: &'cx mut LoweringContext,
    name: String,
    return_kind: Option<IntKind>,
    arg_count: usize,
    location: SourceLocation,
    locals: Vec<LocalDecl>,
    blocks: Vec<PendingBlock>,
    current: BasicBlock,
    scopes: Vec<Scope>,
    breakables: Vec<Breakable>,
    deferred: Vec<DeferredStore>,
}

impl<'cx> BodyBuilder<'cx> {
    fn new(
        cx: &'cx mut LoweringContext,
        name: String,
        return_kind: Option<IntKind>,
        location: SourceLocation,
    ) -> Self {
        let return_slot = LocalDecl {
            name: None,
            kind: return_kind.unwrap_or(IntKind::Int),
            is_const: false,
            location,
        };
        let mut builder = BodyBuilder {
            cx,
            name,
            return_kind,
            arg_count: 0,
            location,
            locals: vec![return_slot],
            blocks: Vec::new(),
            current: BasicBlock::START,
            scopes: Vec::new(),
            breakables: Vec::new(),
            deferred: Vec::new(),
        };
        builder.current = builder.new_block();
        builder
    }

    fn finish(self) -> Body {
        let location = self.location;
        let blocks = self
            .blocks
            .into_iter()
            .map(|block| BasicBlockData {
                statements: block.statements,
                // Only unreachable blocks are left open
                terminator: block.terminator.unwrap_or(Terminator {
                    kind: TerminatorKind::Return,
                    location,
                }),
            })
            .collect();
        Body {
            name: self.name,
            arg_count: self.arg_count,
            return_kind: self.return_kind,
            locals: self.locals,
            blocks,
            location,
        }
    }

    // ===== Blocks, locals and scopes =====

    fn new_block(&mut self) -> BasicBlock {
        self.blocks.push(PendingBlock {
            statements: Vec::new(),
            terminator: None,
        });
        BasicBlock(self.blocks.len() - 1)
    }

    fn push(&mut self, kind: StatementKind, location: SourceLocation) {
        self.blocks[self.current.0]
            .statements
            .push(Statement { kind, location });
    }

    fn terminate(&mut self, kind: TerminatorKind, location: SourceLocation) {
        let block = &mut self.blocks[self.current.0];
        if block.terminator.is_none() {
            block.terminator = Some(Terminator { kind, location });
        }
    }

    fn goto(&mut self, target: BasicBlock, location: SourceLocation) {
        self.terminate(TerminatorKind::Goto { target }, location);
    }

    /// Continue lowering in a block nothing jumps to
    fn start_unreachable(&mut self) {
        self.current = self.new_block();
    }

    fn new_local(
        &mut self,
        name: Option<String>,
        kind: IntKind,
        is_const: bool,
        location: SourceLocation,
    ) -> Local {
        self.locals.push(LocalDecl {
            name,
            kind,
            is_const,
            location,
        });
        Local(self.locals.len() - 1)
    }

    fn temp(&mut self, kind: IntKind, location: SourceLocation) -> Local {
        self.new_local(None, kind, false, location)
    }

    /// Evaluate `rvalue` into a new temporary of `kind`
    fn assign_temp(
        &mut self,
        kind: IntKind,
        rvalue: Rvalue,
        location: SourceLocation,
    ) -> Operand {
        let temp = self.temp(kind, location);
        self.push(StatementKind::Assign(Place::Local(temp), rvalue), location);
        Operand::Copy(Place::Local(temp))
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self, location: SourceLocation) {
        if let Some(scope) = self.scopes.pop() {
            for local in scope.declared.into_iter().rev() {
                self.push(StatementKind::StorageDead(local), location);
            }
        }
    }

    fn bind(&mut self, name: &str, local: Local) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.insert(name.to_string(), local);
        }
    }

    /// Declare a block-scope variable; it starts indeterminate
    fn declare(
        &mut self,
        name: &str,
        kind: IntKind,
        is_const: bool,
        location: SourceLocation,
    ) -> Local {
        let local = self.new_local(Some(name.to_string()), kind, is_const, location);
        self.bind(name, local);
        if let Some(scope) = self.scopes.last_mut() {
            scope.declared.push(local);
        }
        self.push(StatementKind::StorageLive(local), location);
        local
    }

    fn lookup(&self, name: &str) -> Option<Place> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.names.get(name))
            .map(|&local| Place::Local(local))
            .or_else(|| self.cx.global_index.get(name).map(|&i| Place::Global(i)))
    }

    fn resolve(
        &self,
        name: &str,
        location: SourceLocation,
    ) -> Result<Place, RuntimeError> {
        self.lookup(name).ok_or_else(|| RuntimeError::UndefinedVariable {
            name: name.to_string(),
            location,
        })
    }

    fn place_kind(&self, place: Place) -> IntKind {
        match place {
            Place::Local(local) => self.locals[local.0].kind,
            Place::Global(index) => self.cx.globals[index].kind,
        }
    }

    fn operand_kind(&self, operand: &Operand) -> IntKind {
        match operand {
            Operand::Copy(place) => self.place_kind(*place),
            Operand::Const(value) => value.kind(),
        }
    }

    fn static_kind(
        &self,
        expr: &AstNode,
        location: SourceLocation,
    ) -> Result<IntKind, RuntimeError> {
        expr_kind(expr, self).map_err(|e| RuntimeError::from_typing(e, location))
    }

    /// Emit every queued postfix store
    fn flush(&mut self) {
        for store in std::mem::take(&mut self.deferred) {
            let rvalue = Rvalue::BinaryOp(
                BinOp::Add,
                store.old,
                Operand::Const(Value::new(IntKind::Int, store.delta)),
            );
            self.push(StatementKind::Assign(store.place, rvalue), store.location);
        }
    }

    // ===== Statements =====

    fn lower_block(&mut self, statements: &[AstNode]) -> Result<(), RuntimeError> {
        self.push_scope();
        let result = self.lower_statements(statements);
        let end = statements.last().map_or(self.location, |s| s.location());
        self.pop_scope(end);
        result
    }

    fn lower_statements(
        &mut self,
        statements: &[AstNode]) -> Result<(), RuntimeError> {
        for stmt in statements {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &AstNode) -> Result<(), RuntimeError> {
        match stmt {
            AstNode::VarDecl {
                var_type,
                declarators,
                location,
            } => {
                let kind = declared_kind(var_type, *location)?;
                for declarator in declarators {
                    // In scope, and indeterminate, within its own initializer
                    let local = self.declare(
                        &declarator.name,
                        kind,
                        var_type.is_const,
                        declarator.location,
                    );
                    if let Some(expr) = &declarator.init {
                        let value = self.lower_full(expr)?;
                        self.push(
                            StatementKind::Init(Place::Local(local), Rvalue::Use(value)),
                            declarator.location,
                        );
                    }
                }
                Ok(())
            }

            AstNode::ExpressionStatement { expr, .. } => {
                self.lower_discarded(expr)?;
                self.flush();
                Ok(())
            }

            AstNode::Return { expr, location } => {
                if let Some(expr) = expr {
                    let value = self.lower_full(expr)?;
                    if self.return_kind.is_some() {
                        self.push(
                            StatementKind::Assign(Place::Local(RETURN_PLACE), Rvalue::Use(value)),
                            *location,
                        );
                    }
                }
                self.terminate(TerminatorKind::Return, *location);
                self.start_unreachable();
                Ok(())
            }

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => {
                let cond = self.lower_full(condition)?;
                let then_bb = self.new_block();
                let join = self.new_block();
                let else_bb = match else_branch {
                    Some(_) => self.new_block(),
                    None => join,
                };
                self.branch_on_zero(cond, else_bb, then_bb, *location);

                self.current = then_bb;
                self.lower_block(then_branch)?;
                self.goto(join, *location);

                if let Some(else_stmts) = else_branch {
                    self.current = else_bb;
                    self.lower_block(else_stmts)?;
                    self.goto(join, *location);
                }
                self.current = join;
                Ok(())
            }

            AstNode::While {
                condition,
                body,
                location,
            } => {
                let cond_bb = self.new_block();
                let body_bb = self.new_block();
                let exit = self.new_block();
                self.goto(cond_bb, *location);

                self.current = cond_bb;
                let cond = self.lower_full(condition)?;
                self.branch_on_zero(cond, exit, body_bb, *location);

                self.current = body_bb;
                self.lower_loop_body(body, exit, cond_bb)?;
                self.goto(cond_bb, *location);

                self.current = exit;
                Ok(())
            }

            AstNode::DoWhile {
                body,
                condition,
                location,
            } => {
                let body_bb = self.new_block();
                let cond_bb = self.new_block();
                let exit = self.new_block();
                self.goto(body_bb, *location);

                self.current = body_bb;
                self.lower_loop_body(body, exit, cond_bb)?;
                self.goto(cond_bb, *location);

                self.current = cond_bb;
                let cond = self.lower_full(condition)?;
                self.branch_on_zero(cond, exit, body_bb, *location);

                self.current = exit;
                Ok(())
            }

            AstNode::For {
                init,
                condition,
                increment,
                body,
                location,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.lower_statement(init)?;
                }

                let cond_bb = self.new_block();
                let body_bb = self.new_block();
                let step_bb = self.new_block();
                let exit = self.new_block();
                self.goto(cond_bb, *location);

                self.current = cond_bb;
                match condition {
                    Some(condition) => {
                        let cond = self.lower_full(condition)?;
                        self.branch_on_zero(cond, exit, body_bb, *location);
                    }
                    None => self.goto(body_bb, *location),
                }

                self.current = body_bb;
                self.lower_loop_body(body, exit, step_bb)?;
                self.goto(step_bb, *location);

                self.current = step_bb;
                if let Some(increment) = increment {
                    self.lower_discarded(increment)?;
                    self.flush();
                }
                self.goto(cond_bb, *location);

                self.current = exit;
                self.pop_scope(*location);
                Ok(())
            }

            AstNode::Switch {
                expr,
                cases,
                location,
            } => self.lower_switch(expr, cases, *location),

            AstNode::Break { location } => {
                let target = self.breakables.last().map(|b| b.break_to);
                self.jump_out(target, *location)
            }

            AstNode::Continue { location } => {
                let target = self.breakables.iter().rev().find_map(|b| b.continue_to);
                self.jump_out(target, *location)
            }

            AstNode::Block { statements, .. } => self.lower_block(statements),

            AstNode::Empty { .. } => Ok(()),

            other => Err(RuntimeError::UnsupportedOperation {
                message: "declaration or expression in statement position".to_string(),
                location: other.location(),
            }),
        }
    }

    fn lower_loop_body(
        &mut self,
        body: &[AstNode],
        break_to: BasicBlock,
        continue_to: BasicBlock,
    ) -> Result<(), RuntimeError> {
        self.breakables.push(Breakable {
            break_to,
            continue_to: Some(continue_to),
        });
        let result = self.lower_block(body);
        self.breakables.pop();
        result
    }

    fn jump_out(
        &mut self,
        target: Option<BasicBlock>,
        location: SourceLocation) -> Result<(), RuntimeError> {
        let target = target.ok_or_else(|| RuntimeError::UnsupportedOperation {
            message: "'break' or 'continue' outside a loop".to_string(),
            location,
        })?;
        self.goto(target, location);
        self.start_unreachable();
        Ok(())
    }

    /// `if (cond == 0) goto on_zero; else goto otherwise;`
    fn branch_on_zero(
        &mut self,
        cond: Operand,
        on_zero: BasicBlock,
        otherwise: BasicBlock,
        location: SourceLocation,
    ) {
        self.terminate(
            TerminatorKind::SwitchInt {
                discr: cond,
                targets: vec![(0, on_zero)],
                otherwise,
            },
            location,
        );
    }

    fn lower_switch(
        &mut self,
        expr: &AstNode,
        cases: &[CaseNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let scrutinee = self.lower_full(expr)?;
        let kind = self.operand_kind(&scrutinee).promote();
        let discr = self.assign_temp(kind, Rvalue::Cast(scrutinee, kind), location);

        let case_blocks: Vec<BasicBlock> = cases.iter().map(|_| self.new_block()).collect();
        let exit = self.new_block();

        let mut targets: Vec<(i128, BasicBlock)> = Vec::new();
        let mut default = None;
        for (case, &block) in cases.iter().zip(&case_blocks) {
            match case {
                CaseNode::Case { value, location, .. } => {
                    let label = const_eval(value)
                        .map(|v| v.convert(kind).as_i128())
                        .ok_or_else(|| RuntimeError::UnsupportedOperation {
                            message: "case label is not an integer constant expression".to_string(),
                            location: *location,
                        })?;
                    // The first of two equal labels wins
                    if !targets.iter().any(|(v, _)| *v == label) {
                        targets.push((label, block));
                    }
                }
                CaseNode::Default { .. } => default = default.or(Some(block)),
            }
        }

        self.terminate(
            TerminatorKind::SwitchInt {
                discr,
                targets,
                otherwise: default.unwrap_or(exit),
            },
            location,
        );

        self.push_scope();
        self.breakables.push(Breakable {
            break_to: exit,
            continue_to: None,
        });
        for (i, case) in cases.iter().enumerate() {
            self.current = case_blocks[i];
            self.lower_statements(case.statements())?;
            let next = case_blocks.get(i + 1).copied().unwrap_or(exit);
            self.goto(next, location);
        }
        self.breakables.pop();

        self.current = exit;
        self.pop_scope(location);
        Ok(())
    }

    // ===== Expressions =====

    /// Lower a full expression, completing its deferred stores
    fn lower_full(&mut self, expr: &AstNode) -> Result<Operand, RuntimeError> {
        let value = self.lower_expr(expr)?;
        self.flush();
        Ok(value)
    }

    /// Lower an expression whose value is not used
    fn lower_discarded(&mut self, expr: &AstNode) -> Result<(), RuntimeError> {
        match expr {
            AstNode::FunctionCall {
                name,
                args,
                location,
            } => {
                self.lower_call(name, args, false, *location)?;
            }
            AstNode::Cast {
                target_type, expr, ..
            } if target_type.is_void() => self.lower_discarded(expr)?,
            AstNode::Comma { left, right, .. } => {
                self.lower_discarded(left)?;
                self.flush();
                self.lower_discarded(right)?;
            }
            other => {
                self.lower_expr(other)?;
            }
        }
        Ok(())
    }

    fn lower_expr(&mut self, expr: &AstNode) -> Result<Operand, RuntimeError> {
        match expr {
            AstNode::IntLiteral { value, kind, .. } => {
                Ok(Operand::Const(Value::new(*kind, *value)))
            }

            AstNode::Variable(name, location) => {
                let place = self.resolve(name, *location)?;
                let kind = self.place_kind(place);
                Ok(self.assign_temp(kind, Rvalue::Use(Operand::Copy(place)), *location))
            }

            AstNode::Assignment { lhs, rhs, location } => {
                let place = self.assignment_target(lhs, *location)?;
                let value = self.lower_expr(rhs)?;
                Ok(self.store(place, Rvalue::Use(value), *location))
            }

            AstNode::CompoundAssignment {
                lhs,
                op,
                rhs,
                location,
            } => {
                let place = self.assignment_target(lhs, *location)?;
                let kind = self.place_kind(place);
                let current = self.assign_temp(
                    kind,
                    Rvalue::Use(Operand::Copy(place)),
                    lhs.location(),
                );
                let operand = self.lower_expr(rhs)?;
                Ok(self.store(place, Rvalue::BinaryOp(*op, current, operand), *location))
            }

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } if op.is_short_circuit() => self.lower_logical(*op, left, right, *location),

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                let kind = binary_kind(*op, self.operand_kind(&lhs), self.operand_kind(&rhs));
                Ok(self.assign_temp(kind, Rvalue::BinaryOp(*op, lhs, rhs), *location))
            }

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } if op.is_inc_dec() => self.lower_inc_dec(*op, operand, *location),

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => {
                let value = self.lower_expr(operand)?;
                let kind = unary_kind(*op, self.operand_kind(&value));
                Ok(self.assign_temp(kind, Rvalue::UnaryOp(*op, value), *location))
            }

            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                location,
            } => self.lower_conditional(condition, true_expr, false_expr, *location),

            AstNode::Comma { left, right, .. } => {
                self.lower_discarded(left)?;
                self.flush();
                self.lower_expr(right)
            }

            AstNode::FunctionCall {
                name,
                args,
                location,
            } => {
                let result = self.lower_call(name, args, true, *location)?;
                // exit() and abort() never produce a value; the rest of the
                // expression is unreachable
                Ok(result.unwrap_or(Operand::Const(Value::int(0))))
            }

            AstNode::Cast {
                target_type,
                expr,
                location,
            } => {
                let value = self.lower_expr(expr)?;
                let kind = declared_kind(target_type, *location)?;
                Ok(self.assign_temp(kind, Rvalue::Cast(value, kind), *location))
            }

            AstNode::SizeofType { target_type, .. } => Ok(Operand::Const(Value::new(
                IntKind::ULong,
                sizeof_type(target_type) as i128,
            ))),

            AstNode::SizeofExpr { expr, location } => {
                Ok(Operand::Const(arith::size_of(self.static_kind(expr, *location)?)))
            }

            other => Err(RuntimeError::UnsupportedOperation {
                message: "statement in expression position".to_string(),
                location: other.location(),
            }),
        }
    }

    fn assignment_target(
        &self,
        lhs: &AstNode,
        location: SourceLocation,
    ) -> Result<Place, RuntimeError> {
        match lhs {
            AstNode::Variable(name, loc) => self.resolve(name, *loc),
            _ => Err(RuntimeError::UnsupportedOperation {
                message: "assignment target is not a variable".to_string(),
                location,
            }),
        }
    }

    /// Store `rvalue` into `place` now; the result is the converted value
    fn store(
        &mut self,
        place: Place,
        rvalue: Rvalue,
        location: SourceLocation,
    ) -> Operand {
        let kind = self.place_kind(place);
        let stored = self.assign_temp(kind, rvalue, location);
        self.push(StatementKind::Assign(place, Rvalue::Use(stored)), location);
        stored
    }

    fn lower_inc_dec(
        &mut self,
        op: UnOp,
        operand: &AstNode,
        location: SourceLocation,
    ) -> Result<Operand, RuntimeError> {
        let AstNode::Variable(name, var_loc) = operand else {
            return Err(RuntimeError::UnsupportedOperation {
                message: format!("operand of {:?} is not a variable", op),
                location,
            });
        };

        let place = self.resolve(name, *var_loc)?;
        let kind = self.place_kind(place);
        let old = self.assign_temp(kind, Rvalue::Use(Operand::Copy(place)), *var_loc);

        if op.is_postfix() {
            self.deferred.push(DeferredStore {
                place,
                old,
                delta: op.step(),
                location,
            });
            return Ok(old);
        }

        let delta = Operand::Const(Value::new(IntKind::Int, op.step()));
        Ok(self.store(place, Rvalue::BinaryOp(BinOp::Add, old, delta), location))
    }

    fn lower_logical(
        &mut self,
        op: BinOp,
        left: &AstNode,
        right: &AstNode,
        location: SourceLocation,
    ) -> Result<Operand, RuntimeError> {
        let lhs = self.lower_expr(left)?;
        self.flush();

        let result = Place::Local(self.temp(IntKind::Int, location));
        let rhs_bb = self.new_block();
        let short_bb = self.new_block();
        let join = self.new_block();

        let (on_zero, otherwise) = if op == BinOp::And {
            (short_bb, rhs_bb)
        } else {
            (rhs_bb, short_bb)
        };
        self.branch_on_zero(lhs, on_zero, otherwise, location);

        self.current = rhs_bb;
        let rhs = self.lower_expr(right)?;
        self.flush();
        let truth = Rvalue::BinaryOp(BinOp::Ne, rhs, Operand::Const(Value::int(0)));
        self.push(StatementKind::Assign(result, truth), location);
        self.goto(join, location);

        self.current = short_bb;
        let short = Operand::Const(Value::from_bool(op == BinOp::Or));
        self.push(StatementKind::Assign(result, Rvalue::Use(short)), location);
        self.goto(join, location);

        self.current = join;
        Ok(Operand::Copy(result))
    }

    fn lower_conditional(
        &mut self,
        condition: &AstNode,
        true_expr: &AstNode,
        false_expr: &AstNode,
        location: SourceLocation,
    ) -> Result<Operand, RuntimeError> {
        let kind = self
            .static_kind(true_expr, location)?
            .common(self.static_kind(false_expr, location)?);

        let cond = self.lower_expr(condition)?;
        self.flush();

        let result = Place::Local(self.temp(kind, location));
        let then_bb = self.new_block();
        let else_bb = self.new_block();
        let join = self.new_block();
        self.branch_on_zero(cond, else_bb, then_bb, location);

        for (block, arm) in [(then_bb, true_expr), (else_bb, false_expr)] {
            self.current = block;
            let value = self.lower_expr(arm)?;
            self.flush();
            self.push(StatementKind::Assign(result, Rvalue::Use(value)), location);
            self.goto(join, location);
        }

        self.current = join;
        Ok(Operand::Copy(result))
    }

    /// Lower a call. Returns the operand holding the result when
    /// `wants_value` is set and the callee can return.
    fn lower_call(
        &mut self,
        name: &str,
        args: &[AstNode],
        wants_value: bool,
        location: SourceLocation,
    ) -> Result<Option<Operand>, RuntimeError> {
        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            operands.push(self.lower_expr(arg)?);
        }
        self.flush();

        if self.cx.is_builtin(name) {
            self.lower_builtin(name, operands, location)?;
            return Ok(None);
        }

        let destination = if wants_value {
            let kind = self
                .cx
                .signatures
                .get(name)
                .and_then(|ty| ty.int_kind())
                .unwrap_or(IntKind::Int);
            Some(Place::Local(self.temp(kind, location)))
        } else {
            None
        };

        let target = self.new_block();
        self.terminate(
            TerminatorKind::Call {
                func: name.to_string(),
                args: operands,
                destination,
                target,
            },
            location,
        );
        self.current = target;
        Ok(destination.map(Operand::Copy))
    }

    fn lower_builtin(
        &mut self,
        name: &str,
        args: Vec<Operand>,
        location: SourceLocation) -> Result<(), RuntimeError> {
        let expected = if name == "exit" { 1 } else { 0 };
        if args.len() != expected {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: name.to_string(),
                expected,
                got: args.len(),
                location,
            });
        }
        let kind = match args.into_iter().next() {
            Some(status) => TerminatorKind::Exit(status),
            None => TerminatorKind::Abort,
        };
        self.terminate(kind, location);
        self.start_unreachable();
        Ok(())
    }
}

impl KindLookup for BodyBuilder<'_> {
    fn variable_kind(&self, name: &str) -> Option<IntKind> {
        self.lookup(name).map(|place| self.place_kind(place))
    }

    fn return_kind(&self, name: &str) -> Option<Option<IntKind>> {
        match self.cx.signatures.get(name) {
            Some(ty) => Some(ty.int_kind()),
            None if BUILTINS.contains(&name) => Some(None),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::parse_source;

    fn lower(src: &str) -> Module {
        lower_program(&parse_source(src).unwrap()).unwrap()
    }

    fn statements(body: &Body) -> Vec<String> {
        body.blocks
            .iter()
            .flat_map(|b| b.statements.iter().map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn test_postfix_store_follows_its_full_expression() {
        let module = lower("int main() { int i = 0; int j = i++ + 5; return j; }");
        let main = module.body("main").unwrap();
        let stmts = statements(main);
        let store = stmts.iter().position(|s| s.starts_with("_1 = Add(")).unwrap();
        let read = stmts.iter().position(|s| s.ends_with("= copy _1;")).unwrap();
        let sum = stmts.iter().position(|s| s.contains("const 5_i32")).unwrap();
        assert!(read < sum && sum < store, "{:?}", stmts);
    }

    #[test]
    fn test_prefix_store_is_immediate() {
        let module = lower("int a = 1; int main() { int t = ++a; return t; }");
        let stmts = statements(module.body("main").unwrap());
        let store = stmts.iter().position(|s| s.starts_with("@0 = ")).unwrap();
        let init = stmts.iter().position(|s| s.contains(":=")).unwrap();
        assert!(store < init, "{:?}", stmts);
    }

    #[test]
    fn test_globals_are_initialised_in_order() {
        let module = lower("int a = 1; int b = a + 1; const int c = 3; int main() { return b; }");
        assert_eq!(module.globals.len(), 3);
        assert_eq!(module.globals[1].name, "b");
        assert!(module.globals[2].is_const);
        let inits: Vec<String> = statements(&module.global_init)
            .into_iter()
            .filter(|s| s.contains(":="))
            .collect();
        assert_eq!(inits.len(), 3);
        assert!(inits[0].starts_with("@0 :="));
    }

    #[test]
    fn test_builtin_exit_becomes_terminator() {
        let module = lower("int main() { exit(3); }");
        let main = module.body("main").unwrap();
        assert!(main
            .blocks
            .iter()
            .any(|b| matches!(b.terminator.kind, TerminatorKind::Exit(_))));
    }

    #[test]
    fn test_user_defined_exit_is_a_call() {
        let module = lower("int exit(int n) { return n; } int main() { return exit(3); }");
        let main = module.body("main").unwrap();
        assert!(main.blocks.iter().any(|b| matches!(
            &b.terminator.kind,
            TerminatorKind::Call { func, destination: Some(_), .. } if func == "exit"
        )));
    }

    #[test]
    fn test_discarded_call_has_no_destination() {
        let module = lower("int f() { return 1; } int main() { f(); return 0; }");
        let main = module.body("main").unwrap();
        assert!(main.blocks.iter().any(|b| matches!(
            b.terminator.kind,
            TerminatorKind::Call { destination: None, .. }
        )));
    }

    #[test]
    fn test_lowering_errors() {
        let program = parse_source("int main() { return x; }").unwrap();
        assert!(matches!(
            lower_program(&program),
            Err(RuntimeError::UndefinedVariable { .. })
        ));

        let src = "int main() { int k = 1; switch (1) { case k: return 1; } return 0; }";
        let program = parse_source(src).unwrap();
        assert!(matches!(
            lower_program(&program),
            Err(RuntimeError::UnsupportedOperation { .. })
        ));

        let program = parse_source("int main() { break; }").unwrap();
        assert!(matches!(
            lower_program(&program),
            Err(RuntimeError::UnsupportedOperation { .. })
        ));

        let program = parse_source("int main() { abort(1); }").unwrap();
        assert!(matches!(
            lower_program(&program),
            Err(RuntimeError::ArgumentCountMismatch { expected: 0, got: 1, .. })
        ));
    }

    #[test]
    fn test_every_block_is_terminated_and_in_range() {
        let module = lower(
            r#"
            int f(int n) {
                int s = 0;
                for (int i = 0; i < n; i++) {
                    if (i % 2) continue;
                    s += i;
                }
                while (s > 100) s--;
                return s ? s : -1;
            }
            int main() { return f(10); }
            "#,
        );
        for body in module.functions() {
            for block in &body.blocks {
                let targets: Vec<BasicBlock> = match &block.terminator.kind {
                    TerminatorKind::Goto { target } => vec![*target],
                    TerminatorKind::SwitchInt { targets, otherwise, .. } => {
                        targets.iter().map(|(_, b)| *b).chain([*otherwise]).collect()
                    }
                    TerminatorKind::Call { target, .. } => vec![*target],
                    _ => Vec::new(),
                };
                for target in targets {
                    assert!(body.block(target).is_some());
                }
            }
        }
    }
}
