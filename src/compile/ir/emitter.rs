use std::{collections::HashSet, fmt::Write};

use log::debug;

use crate::{
    compile::{
        ast::{Expr, FunctionDecl, Item, Program, Stmt, StmtKind, Type, VarDecl},
        ir::{
            IrError,
            builder::FunctionBuilder,
            inst::{Instruction, IrType, Label, Operand},
        },
        semantic::symbol_table::{Storage, Symbol, SymbolTable, VarSymbol},
    },
    datstructures::scope_stack::ScopeId,
};

pub const INIT_GLOBALS: &str = "_init_globals";
pub const ENTRY_POINT: &str = "main";

/// Second pass over a checked tree.
///
/// Register numbers belong to the active [`FunctionBuilder`]; label and
/// stack-slot ids are counted across the whole program.
pub struct IrEmitter<'t> {
    pub(super) symbols: &'t mut SymbolTable,
    globals: Vec<String>,
    init: FunctionBuilder,
    current: Option<FunctionBuilder>,
    functions: Vec<String>,
    prototypes: Vec<String>,
    declared: HashSet<String>,
    next_label: u32,
    next_slot: u32,
    activations: ScopeId,
    break_targets: Vec<Label>,
    continue_targets: Vec<Label>,
}

impl<'t> IrEmitter<'t> {
    pub fn new(symbols: &'t mut SymbolTable) -> Self {
        let activations = symbols.current_id();

        let mut init = FunctionBuilder::new(format!("define void @{INIT_GLOBALS}()"));
        init.start_block("entry".into());

        IrEmitter {
            symbols,
            globals: Vec::new(),
            init,
            current: None,
            functions: Vec::new(),
            prototypes: Vec::new(),
            declared: HashSet::new(),
            next_label: 0,
            next_slot: 0,
            activations,
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
        }
    }

    /// The function being lowered, or the global initializer at file scope.
    pub(super) fn builder(&mut self) -> &mut FunctionBuilder {
        match &mut self.current {
            Some(builder) => builder,
            None => &mut self.init,
        }
    }

    pub(super) fn fresh_reg(&mut self) -> Operand {
        self.builder().fresh_reg()
    }

    pub(super) fn fresh_label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;

        id
    }

    /// Appends an instruction, opening an unreachable block first if the
    /// current one was already terminated.
    pub(super) fn push(&mut self, inst: Instruction) {
        if self.builder().is_terminated() {
            let label = format!("unreachable_{}", self.fresh_label_id());
            self.builder().start_block(label);
        }

        self.builder().push(inst);
    }

    fn jump(&mut self, label: Label) {
        if !self.builder().is_terminated() {
            self.builder().push(Instruction::BR(label));
        }
    }

    fn start_block(&mut self, label: Label) {
        self.builder().start_block(label);
    }

    pub fn emit_program(&mut self, program: &Program) -> Result<(), IrError> {
        for item in program.items.iter() {
            match item {
                Item::Global(decl) => self.emit_global(decl)?,
                Item::Function(func) => self.emit_function(func)?,
            }
        }

        Ok(())
    }

    pub fn finish(mut self) -> Result<String, IrError> {
        let mut ir = String::new();

        for global in self.globals.iter() {
            writeln!(&mut ir, "{global}")?;
        }
        if !self.globals.is_empty() {
            writeln!(&mut ir)?;
        }

        self.init.push(Instruction::RET(None));
        writeln!(&mut ir, "{}", self.init.finish()?)?;

        for function in self.functions.iter() {
            writeln!(&mut ir, "{function}")?;
        }

        for prototype in self.prototypes.iter() {
            writeln!(&mut ir, "{prototype}")?;
        }

        Ok(ir)
    }

    fn emit_global(&mut self, decl: &VarDecl) -> Result<(), IrError> {
        let ty = IrType::from(decl.ty);
        let zero = match decl.ty {
            Type::Float => Operand::Float(0.0),
            _ => Operand::Int(0),
        };

        for declarator in decl.declarators.iter() {
            let storage = Storage::Global(declarator.name.clone());

            let bound = self
                .symbols
                .lookup_global_mut(&declarator.name)
                .and_then(Symbol::as_var_mut)
                .ok_or_else(|| IrError::UnresolvedVariable(declarator.name.clone()))?
                .bind_storage(storage.clone());
            if !bound {
                return Err(IrError::StorageRebound(declarator.name.clone()));
            }

            self.globals.push(format!("{storage} = global {ty} {zero}"));

            if let Some(init) = declarator.init.as_ref() {
                let value = self.value(init)?;
                let value = self.coerce(value, decl.ty);
                self.push(Instruction::STORE(ty, value.operand, storage));
            }
        }

        Ok(())
    }

    fn emit_function(&mut self, func: &FunctionDecl) -> Result<(), IrError> {
        let Some(body) = func.body.as_ref() else {
            return self.emit_prototype(func);
        };

        let ret = IrType::from(func.ret);
        let params = func
            .params
            .iter()
            .map(|param| {
                let value = Operand::Param(param.name.clone());
                format!("{} {value}", IrType::from(param.ty))
            })
            .collect::<Vec<_>>()
            .join(", ");

        self.current = Some(FunctionBuilder::new(format!(
            "define {ret} @{}({params})",
            func.name
        )));
        self.declared.insert(func.name.clone());
        self.start_block("entry".into());

        if func.name == ENTRY_POINT {
            self.push(Instruction::CALL(
                None,
                IrType::Void,
                INIT_GLOBALS.into(),
                Vec::new(),
            ));
        }

        self.activations += 1;
        let depth = self.symbols.depth();
        self.symbols.enter_scope(self.activations);

        let result = self.emit_body(func, body);

        while self.symbols.depth() > depth {
            self.symbols.exit_scope();
        }
        result?;

        if !self.builder().is_terminated() {
            let last = match func.ret {
                Type::Void => Instruction::RET(None),
                _ => Instruction::UNREACHABLE,
            };
            self.push(last);
        }

        if let Some(builder) = self.current.take() {
            self.functions.push(builder.finish()?);
        }
        debug!("emitted function `{}`", func.name);

        Ok(())
    }

    fn emit_body(&mut self, func: &FunctionDecl, body: &[Stmt]) -> Result<(), IrError> {
        for param in func.params.iter() {
            let ty = IrType::from(param.ty);
            let slot = Storage::Stack(format!("{}.addr", param.name));

            self.push(Instruction::ALLOCA(slot.clone(), ty));
            self.push(Instruction::STORE(
                ty,
                Operand::Param(param.name.clone()),
                slot.clone(),
            ));
            self.bind_local(&param.name, param.ty, slot)?;
        }

        for stmt in body.iter() {
            self.emit_stmt(stmt)?;
        }

        Ok(())
    }

    /// Prototypes only reach the output when no definition exists.
    fn emit_prototype(&mut self, func: &FunctionDecl) -> Result<(), IrError> {
        let defined = self
            .symbols
            .lookup_global(&func.name)
            .and_then(Symbol::as_func)
            .ok_or_else(|| IrError::UnresolvedFunction(func.name.clone()))?
            .is_defined();

        if defined || !self.declared.insert(func.name.clone()) {
            return Ok(());
        }

        let params = func
            .params
            .iter()
            .map(|param| IrType::from(param.ty).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.prototypes.push(format!(
            "declare {} @{}({params})",
            IrType::from(func.ret),
            func.name
        ));

        Ok(())
    }

    fn bind_local(&mut self, name: &str, ty: Type, storage: Storage) -> Result<(), IrError> {
        let mut symbol = VarSymbol::new(name, ty);
        if !symbol.bind_storage(storage) || !self.symbols.insert(Symbol::Var(symbol)) {
            return Err(IrError::StorageRebound(name.to_string()));
        }

        Ok(())
    }

    fn emit_local(&mut self, decl: &VarDecl) -> Result<(), IrError> {
        let ty = IrType::from(decl.ty);

        for declarator in decl.declarators.iter() {
            let slot = Storage::Stack(format!("{}.addr.{}", declarator.name, self.next_slot));
            self.next_slot += 1;
            self.push(Instruction::ALLOCA(slot.clone(), ty));

            // the initializer still sees whatever the name meant before
            if let Some(init) = declarator.init.as_ref() {
                let value = self.value(init)?;
                let value = self.coerce(value, decl.ty);
                self.push(Instruction::STORE(ty, value.operand, slot.clone()));
            }

            self.bind_local(&declarator.name, decl.ty, slot)?;
        }

        Ok(())
    }

    fn emit_block(&mut self, stmts: &[Stmt]) -> Result<(), IrError> {
        self.symbols.enter_scope(self.symbols.current_id());
        for stmt in stmts.iter() {
            self.emit_stmt(stmt)?;
        }
        self.symbols.exit_scope();

        Ok(())
    }

    /// Converts a condition to `i1` and branches on it.
    fn branch_on(&mut self, cond: &Expr, then: Label, otherwise: Label) -> Result<(), IrError> {
        let value = self.value(cond)?;
        let truth = self.truth(value);
        self.push(Instruction::CBR(truth, then, otherwise));

        Ok(())
    }

    fn emit_loop_body(&mut self, body: &Stmt, exit: Label, next: Label) -> Result<(), IrError> {
        self.break_targets.push(exit);
        self.continue_targets.push(next);

        let result = self.emit_stmt(body);

        self.break_targets.pop();
        self.continue_targets.pop();

        result
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), IrError> {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.emit_block(stmts)?,
            StmtKind::Decl(decl) => self.emit_local(decl)?,
            StmtKind::Expr(expr) => {
                self.lower(expr)?;
            }
            StmtKind::Empty => {}
            StmtKind::If(cond, then, otherwise) => {
                let id = self.fresh_label_id();
                let then_label = format!("if_then_{id}");
                let else_label = format!("if_else_{id}");
                let end_label = format!("if_end_{id}");

                let false_target = match otherwise {
                    Some(_) => else_label.clone(),
                    None => end_label.clone(),
                };
                self.branch_on(cond, then_label.clone(), false_target)?;

                self.start_block(then_label);
                self.emit_stmt(then)?;
                self.jump(end_label.clone());

                if let Some(otherwise) = otherwise {
                    self.start_block(else_label);
                    self.emit_stmt(otherwise)?;
                    self.jump(end_label.clone());
                }

                self.start_block(end_label);
            }
            StmtKind::While(cond, body) => {
                let id = self.fresh_label_id();
                let cond_label = format!("while_cond_{id}");
                let body_label = format!("while_body_{id}");
                let end_label = format!("while_end_{id}");

                self.start_block(cond_label.clone());
                self.branch_on(cond, body_label.clone(), end_label.clone())?;

                self.start_block(body_label);
                self.emit_loop_body(body, end_label.clone(), cond_label.clone())?;
                self.jump(cond_label);

                self.start_block(end_label);
            }
            StmtKind::DoWhile(body, cond) => {
                let id = self.fresh_label_id();
                let body_label = format!("do_while_body_{id}");
                let cond_label = format!("do_while_cond_{id}");
                let end_label = format!("do_while_end_{id}");

                self.start_block(body_label.clone());
                self.emit_loop_body(body, end_label.clone(), cond_label.clone())?;

                self.start_block(cond_label);
                self.branch_on(cond, body_label, end_label.clone())?;

                self.start_block(end_label);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.symbols.enter_scope(self.symbols.current_id());
                if let Some(init) = init {
                    self.emit_stmt(init)?;
                }

                let id = self.fresh_label_id();
                let cond_label = format!("for_cond_{id}");
                let body_label = format!("for_body_{id}");
                let inc_label = format!("for_inc_{id}");
                let end_label = format!("for_end_{id}");

                self.start_block(cond_label.clone());
                match cond {
                    Some(cond) => self.branch_on(cond, body_label.clone(), end_label.clone())?,
                    None => self.jump(body_label.clone()),
                }

                let next = match step {
                    Some(_) => inc_label.clone(),
                    None => cond_label.clone(),
                };

                self.start_block(body_label);
                self.emit_loop_body(body, end_label.clone(), next)?;

                if let Some(step) = step {
                    self.start_block(inc_label);
                    self.lower(step)?;
                }
                self.jump(cond_label);

                self.start_block(end_label);
                self.symbols.exit_scope();
            }
            StmtKind::Return(value) => {
                let ret = stmt.ty.ok_or_else(|| IrError::Unannotated(stmt.span.clone()))?;

                match value {
                    Some(value) if ret != Type::Void => {
                        let value = self.value(value)?;
                        let value = self.coerce(value, ret);
                        self.push(Instruction::RET(Some((ret.into(), value.operand))));
                    }
                    Some(value) => {
                        self.lower(value)?;
                        self.push(Instruction::RET(None));
                    }
                    None => self.push(Instruction::RET(None)),
                }
            }
            StmtKind::Break => {
                let target = self
                    .break_targets
                    .last()
                    .cloned()
                    .ok_or(IrError::NoLoopTarget("break"))?;
                self.push(Instruction::BR(target));
            }
            StmtKind::Continue => {
                let target = self
                    .continue_targets
                    .last()
                    .cloned()
                    .ok_or(IrError::NoLoopTarget("continue"))?;
                self.push(Instruction::BR(target));
            }
        }

        Ok(())
    }
}
