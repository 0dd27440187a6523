use log::debug;

use crate::{
    compile::{
        ast::{
            AssignOp, BinaryOp, Expr, ExprKind, FunctionDecl, Item, Program, SourcePos, Stmt,
            StmtKind, Type, UnaryOp, VarDecl,
        },
        semantic::{
            SemanticError,
            symbol_table::{FuncSymbol, Symbol, SymbolTable, VarSymbol},
        },
    },
    datstructures::scope_stack::ScopeId,
};

/// Whether a value of type `source` may be stored into or bound to a
/// location of type `target`.
pub fn compatible(target: Type, source: Type) -> bool {
    matches!(
        (target, source),
        (Type::Int, Type::Int)
            | (Type::Float, Type::Float)
            | (Type::Void, Type::Void)
            | (Type::Float, Type::Int)
            | (Type::Int, Type::Float)
    )
}

pub trait TypeCheckableOperation<const N: usize> {
    /// Result type for the given operand types, `None` if ill-typed.
    fn synthesized_type(&self, operands: [Type; N]) -> Option<Type>;
}

impl TypeCheckableOperation<1> for UnaryOp {
    fn synthesized_type(&self, [operand]: [Type; 1]) -> Option<Type> {
        match self {
            Self::Neg if operand.is_numeric() => Some(operand),
            Self::LogicalNot if operand != Type::Void => Some(Type::Int),
            Self::BitwiseNot if operand == Type::Int => Some(Type::Int),
            _ => None,
        }
    }
}

impl TypeCheckableOperation<2> for BinaryOp {
    fn synthesized_type(&self, [lhs, rhs]: [Type; 2]) -> Option<Type> {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div => match (lhs, rhs) {
                (Type::Int, Type::Int) => Some(Type::Int),
                (Type::Float, Type::Int | Type::Float) | (Type::Int, Type::Float) => {
                    Some(Type::Float)
                }
                _ => None,
            },

            Self::Mod
            | Self::BitwiseAnd
            | Self::BitwiseOr
            | Self::BitwiseXor
            | Self::ShiftLeft
            | Self::ShiftRight => {
                (lhs == Type::Int && rhs == Type::Int).then_some(Type::Int)
            }

            Self::Less | Self::LessEq | Self::Greater | Self::GreaterEq => {
                (lhs.is_numeric() && rhs.is_numeric()).then_some(Type::Int)
            }

            Self::Eq | Self::NotEq | Self::LogicalAnd | Self::LogicalOr => {
                (lhs != Type::Void && rhs != Type::Void).then_some(Type::Int)
            }
        }
    }
}

/// Single post-order pass: resolves names, writes every node's type and
/// populates the global frame of the symbol table.
pub struct TypeChecker<'t> {
    symbols: &'t mut SymbolTable,
    function: String,
    expected_return: Type,
    found_return: bool,
    loop_depth: usize,
    activations: ScopeId,
}

impl<'t> TypeChecker<'t> {
    pub fn new(symbols: &'t mut SymbolTable) -> Self {
        let activations = symbols.current_id();

        TypeChecker {
            symbols,
            function: String::new(),
            expected_return: Type::Void,
            found_return: false,
            loop_depth: 0,
            activations,
        }
    }

    pub fn check_program(&mut self, program: &mut Program) -> Result<(), SemanticError> {
        for item in program.items.iter_mut() {
            match item {
                Item::Global(decl) => self.check_var_decl(decl, true)?,
                Item::Function(func) => self.check_function(func)?,
            }
        }

        Ok(())
    }

    fn check_function(&mut self, func: &mut FunctionDecl) -> Result<(), SemanticError> {
        for (i, param) in func.params.iter().enumerate() {
            if param.ty == Type::Void {
                return Err(SemanticError::VoidVariable {
                    name: param.name.clone(),
                    span: param.span.clone(),
                });
            }

            if func.params[..i].iter().any(|other| other.name == param.name) {
                return Err(SemanticError::Redeclared {
                    name: param.name.clone(),
                    span: param.span.clone(),
                });
            }
        }

        self.declare_function(func)?;

        if func.body.is_none() {
            return Ok(());
        }

        self.activations += 1;
        let depth = self.symbols.depth();
        self.symbols.enter_scope(self.activations);

        self.function = func.name.clone();
        self.expected_return = func.ret;
        self.found_return = false;
        self.loop_depth = 0;

        let result = self.check_body(func);

        while self.symbols.depth() > depth {
            self.symbols.exit_scope();
        }
        result?;

        if func.ret != Type::Void && !self.found_return {
            return Err(SemanticError::MissingReturn {
                name: func.name.clone(),
                span: func.span.clone(),
            });
        }

        debug!("checked function `{}`", func.name);
        Ok(())
    }

    fn check_body(&mut self, func: &mut FunctionDecl) -> Result<(), SemanticError> {
        for param in func.params.iter() {
            if !self.symbols.insert(Symbol::Var(VarSymbol::new(&param.name, param.ty))) {
                return Err(SemanticError::Redeclared {
                    name: param.name.clone(),
                    span: param.span.clone(),
                });
            }
        }

        if let Some(body) = func.body.as_mut() {
            for stmt in body.iter_mut() {
                self.check_stmt(stmt)?;
            }
        }

        Ok(())
    }

    fn declare_function(&mut self, func: &FunctionDecl) -> Result<(), SemanticError> {
        let params = func.signature();
        let body = func.body.as_ref().map(|_| func.span.clone());

        match self.symbols.lookup_global_mut(&func.name) {
            Some(Symbol::Var(_)) => Err(SemanticError::Redeclared {
                name: func.name.clone(),
                span: func.span.clone(),
            }),
            Some(Symbol::Func(existing)) => {
                if !existing.same_signature(func.ret, &params) {
                    return Err(SemanticError::ConflictingDeclaration {
                        name: func.name.clone(),
                        span: func.span.clone(),
                    });
                }

                if body.is_some() {
                    if existing.is_defined() {
                        return Err(SemanticError::Redefined {
                            name: func.name.clone(),
                            span: func.span.clone(),
                        });
                    }

                    existing.body = body;
                }

                Ok(())
            }
            None => {
                let symbol = Symbol::Func(FuncSymbol {
                    name: func.name.clone(),
                    ret: func.ret,
                    params,
                    body,
                });

                // lookup_global just came back empty
                let _ = self.symbols.insert_global(symbol);
                Ok(())
            }
        }
    }

    fn check_var_decl(&mut self, decl: &mut VarDecl, global: bool) -> Result<(), SemanticError> {
        for declarator in decl.declarators.iter_mut() {
            if decl.ty == Type::Void {
                return Err(SemanticError::VoidVariable {
                    name: declarator.name.clone(),
                    span: declarator.span.clone(),
                });
            }

            if let Some(init) = declarator.init.as_mut() {
                let got = self.check_expr(init)?;
                if !compatible(decl.ty, got) {
                    return Err(SemanticError::MismatchedTypes {
                        expected: decl.ty,
                        got,
                        span: init.span.clone(),
                    });
                }
            }

            let symbol = Symbol::Var(VarSymbol::new(&declarator.name, decl.ty));
            let inserted = if global {
                self.symbols.insert_global(symbol)
            } else {
                self.symbols.lookup_local(&declarator.name).is_none() && self.symbols.insert(symbol)
            };

            if !inserted {
                return Err(SemanticError::Redeclared {
                    name: declarator.name.clone(),
                    span: declarator.span.clone(),
                });
            }
        }

        Ok(())
    }

    fn check_block(&mut self, stmts: &mut [Stmt]) -> Result<(), SemanticError> {
        self.symbols.enter_scope(self.symbols.current_id());
        for stmt in stmts.iter_mut() {
            self.check_stmt(stmt)?;
        }
        self.symbols.exit_scope();

        Ok(())
    }

    fn check_condition(&mut self, cond: &mut Expr) -> Result<(), SemanticError> {
        if self.check_expr(cond)? == Type::Void {
            return Err(SemanticError::VoidCondition(cond.span.clone()));
        }

        Ok(())
    }

    fn check_loop_body(&mut self, body: &mut Stmt) -> Result<(), SemanticError> {
        self.loop_depth += 1;
        self.check_stmt(body)?;
        self.loop_depth -= 1;

        Ok(())
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<(), SemanticError> {
        let ty = match &mut stmt.kind {
            StmtKind::Block(stmts) => {
                self.check_block(stmts)?;
                Type::Void
            }
            StmtKind::Decl(decl) => {
                self.check_var_decl(decl, false)?;
                decl.ty
            }
            StmtKind::Expr(expr) => self.check_expr(expr)?,
            StmtKind::Empty => Type::Void,
            StmtKind::If(cond, then, otherwise) => {
                self.check_condition(cond)?;
                self.check_stmt(then)?;
                if let Some(otherwise) = otherwise {
                    self.check_stmt(otherwise)?;
                }

                Type::Void
            }
            StmtKind::While(cond, body) => {
                self.check_condition(cond)?;
                self.check_loop_body(body)?;
                Type::Void
            }
            StmtKind::DoWhile(body, cond) => {
                self.check_loop_body(body)?;
                self.check_condition(cond)?;
                Type::Void
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                // the init clause may declare, and those names die with the loop
                self.symbols.enter_scope(self.symbols.current_id());
                if let Some(init) = init {
                    self.check_stmt(init)?;
                }
                if let Some(cond) = cond {
                    self.check_condition(cond)?;
                }
                if let Some(step) = step {
                    self.check_expr(step)?;
                }
                self.check_loop_body(body)?;
                self.symbols.exit_scope();

                Type::Void
            }
            StmtKind::Return(None) => {
                if self.expected_return != Type::Void {
                    return Err(SemanticError::MissingReturnValue {
                        name: self.function.clone(),
                        span: stmt.span.clone(),
                    });
                }

                self.expected_return
            }
            StmtKind::Return(Some(value)) => {
                let got = self.check_expr(value)?;

                if self.expected_return == Type::Void && got != Type::Void {
                    return Err(SemanticError::UnexpectedReturnValue {
                        name: self.function.clone(),
                        span: stmt.span.clone(),
                    });
                }

                if !compatible(self.expected_return, got) {
                    return Err(SemanticError::MismatchedTypes {
                        expected: self.expected_return,
                        got,
                        span: value.span.clone(),
                    });
                }

                self.found_return = true;
                self.expected_return
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    return Err(SemanticError::InvalidBreak(stmt.span.clone()));
                }

                Type::Void
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(SemanticError::InvalidContinue(stmt.span.clone()));
                }

                Type::Void
            }
        };

        stmt.ty = Some(ty);
        Ok(())
    }

    fn lookup_var(&self, name: &str, span: &SourcePos) -> Result<Type, SemanticError> {
        match self.symbols.lookup(name) {
            Some(Symbol::Var(var)) => Ok(var.ty),
            Some(Symbol::Func(_)) => Err(SemanticError::NotAVariable {
                name: name.to_string(),
                span: span.clone(),
            }),
            None => Err(SemanticError::Undeclared {
                name: name.to_string(),
                span: span.clone(),
            }),
        }
    }

    pub fn check_expr(&mut self, expr: &mut Expr) -> Result<Type, SemanticError> {
        let span = expr.span.clone();

        let ty = match &mut expr.kind {
            ExprKind::Int(literal) => {
                literal.parse(&span)?;
                Type::Int
            }
            ExprKind::Float(value) => {
                if !value.is_finite() {
                    return Err(SemanticError::FloatLiteralOutOfBounds(span));
                }
                Type::Float
            }
            ExprKind::Ident(name) => self.lookup_var(name, &span)?,
            ExprKind::Call(name, args) => self.check_call(name, args, &span)?,
            ExprKind::Unary(op, operand) => {
                let operand = self.check_expr(operand)?;

                op.synthesized_type([operand])
                    .ok_or_else(|| SemanticError::InvalidOperand {
                        op: op.to_string(),
                        ty: operand,
                        span: span.clone(),
                    })?
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let lhs = self.check_expr(lhs)?;
                let rhs = self.check_expr(rhs)?;

                op.synthesized_type([lhs, rhs])
                    .ok_or_else(|| SemanticError::InvalidOperands {
                        op: op.to_string(),
                        lhs,
                        rhs,
                        span: span.clone(),
                    })?
            }
            ExprKind::Assign(name, op, value) => {
                let target = self.lookup_var(name, &span)?;
                let source = self.check_expr(value)?;

                let legal = match op {
                    AssignOp::Eq => compatible(target, source),
                    AssignOp::Op(op) => op
                        .synthesized_type([target, source])
                        .is_some_and(|result| compatible(target, result)),
                };

                if !legal {
                    return Err(SemanticError::InvalidOperands {
                        op: op.to_string(),
                        lhs: target,
                        rhs: source,
                        span,
                    });
                }

                target
            }
            ExprKind::Step { name, op, .. } => {
                let ty = self.lookup_var(name, &span)?;
                if !ty.is_numeric() {
                    return Err(SemanticError::InvalidOperand {
                        op: op.to_string(),
                        ty,
                        span,
                    });
                }

                ty
            }
        };

        expr.ty = Some(ty);
        Ok(ty)
    }

    fn check_call(
        &mut self,
        name: &str,
        args: &mut [Expr],
        span: &SourcePos,
    ) -> Result<Type, SemanticError> {
        let (ret, params): (Type, Vec<Type>) = match self.symbols.lookup_global(name) {
            Some(Symbol::Func(func)) => (func.ret, func.param_types().collect()),
            Some(Symbol::Var(_)) => {
                return Err(SemanticError::NotAFunction {
                    name: name.to_string(),
                    span: span.clone(),
                });
            }
            None => {
                return Err(SemanticError::Undeclared {
                    name: name.to_string(),
                    span: span.clone(),
                });
            }
        };

        if params.len() != args.len() {
            return Err(SemanticError::ArityMismatch {
                name: name.to_string(),
                expected: params.len(),
                got: args.len(),
                span: span.clone(),
            });
        }

        for (param, arg) in params.into_iter().zip(args.iter_mut()) {
            let got = self.check_expr(arg)?;
            if !compatible(param, got) {
                return Err(SemanticError::MismatchedTypes {
                    expected: param,
                    got,
                    span: arg.span.clone(),
                });
            }
        }

        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: [Type; 3] = [Type::Int, Type::Float, Type::Void];

    #[test]
    fn compatibility_is_reflexive() {
        for ty in TYPES {
            assert!(compatible(ty, ty));
        }
    }

    #[test]
    fn compatibility_never_involves_void_across_types() {
        for ty in [Type::Int, Type::Float] {
            assert!(!compatible(Type::Void, ty));
            assert!(!compatible(ty, Type::Void));
        }

        assert!(compatible(Type::Float, Type::Int));
        assert!(compatible(Type::Int, Type::Float));
    }

    #[test]
    fn arithmetic_promotes_to_float() {
        assert_eq!(
            BinaryOp::Add.synthesized_type([Type::Int, Type::Float]),
            Some(Type::Float)
        );
        assert_eq!(
            BinaryOp::Div.synthesized_type([Type::Int, Type::Int]),
            Some(Type::Int)
        );
        assert_eq!(BinaryOp::Mul.synthesized_type([Type::Void, Type::Int]), None);
    }

    #[test]
    fn integer_only_operators() {
        for op in [BinaryOp::Mod, BinaryOp::ShiftRight, BinaryOp::BitwiseXor] {
            assert_eq!(op.synthesized_type([Type::Int, Type::Int]), Some(Type::Int));
            assert_eq!(op.synthesized_type([Type::Float, Type::Int]), None);
        }

        assert_eq!(UnaryOp::BitwiseNot.synthesized_type([Type::Float]), None);
    }

    #[test]
    fn comparisons_and_logic_yield_int() {
        assert_eq!(
            BinaryOp::LessEq.synthesized_type([Type::Float, Type::Int]),
            Some(Type::Int)
        );
        assert_eq!(
            BinaryOp::LogicalOr.synthesized_type([Type::Float, Type::Float]),
            Some(Type::Int)
        );
        assert_eq!(
            BinaryOp::NotEq.synthesized_type([Type::Int, Type::Void]),
            None
        );
        assert_eq!(
            UnaryOp::LogicalNot.synthesized_type([Type::Float]),
            Some(Type::Int)
        );
    }
}
