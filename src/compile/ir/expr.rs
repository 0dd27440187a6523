use crate::compile::{
    ast::{AssignOp, BinaryOp, Expr, ExprKind, StepOp, Type, UnaryOp},
    ir::{
        IrError,
        emitter::IrEmitter,
        inst::{CastOp, Instruction, IrType, Opcode, Operand, Predicate},
    },
    semantic::symbol_table::{Storage, Symbol},
};

/// A register or literal together with the source type it represents.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub operand: Operand,
    pub ty: Type,
}

impl Value {
    fn new(operand: Operand, ty: Type) -> Self {
        Value { operand, ty }
    }
}

fn zero(ty: Type) -> Operand {
    match ty {
        Type::Float => Operand::Float(0.0),
        _ => Operand::Int(0),
    }
}

impl IrEmitter<'_> {
    /// Lowers an expression that must produce a value.
    pub fn value(&mut self, expr: &Expr) -> Result<Value, IrError> {
        self.lower(expr)?
            .ok_or_else(|| IrError::VoidValue(expr.span.clone()))
    }

    /// Lowers an expression. Calls to void functions yield `None`.
    pub fn lower(&mut self, expr: &Expr) -> Result<Option<Value>, IrError> {
        let ty = expr
            .ty
            .ok_or_else(|| IrError::Unannotated(expr.span.clone()))?;

        let operand = match &expr.kind {
            ExprKind::Int(literal) => {
                let value = literal
                    .parse(&expr.span)
                    .map_err(|_| IrError::InvalidLiteral(literal.to_string()))?;

                Operand::Int(value)
            }
            ExprKind::Float(value) => {
                let dest = self.fresh_reg();
                self.push(Instruction::CAST(
                    dest.clone(),
                    CastOp::FPTRUNC,
                    IrType::Double,
                    Operand::Float(*value),
                    IrType::Float,
                ));

                dest
            }
            ExprKind::Ident(name) => {
                let (storage, ty) = self.storage_of(name)?;
                self.load(storage, ty)
            }
            ExprKind::Call(name, args) => return self.lower_call(name, args),
            ExprKind::Unary(op, operand) => {
                let operand = self.value(operand)?;
                self.lower_unary(*op, operand)
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let lhs = self.value(lhs)?;
                let rhs = self.value(rhs)?;
                self.lower_binary(*op, lhs, rhs, ty)
            }
            ExprKind::Assign(name, op, value) => self.lower_assign(name, *op, value)?,
            ExprKind::Step { name, op, prefix } => self.lower_step(name, *op, *prefix)?,
        };

        Ok(Some(Value::new(operand, ty)))
    }

    fn storage_of(&self, name: &str) -> Result<(Storage, Type), IrError> {
        let var = self
            .symbols
            .lookup(name)
            .and_then(Symbol::as_var)
            .ok_or_else(|| IrError::UnresolvedVariable(name.to_string()))?;

        let storage = var
            .storage()
            .cloned()
            .ok_or_else(|| IrError::UnresolvedVariable(name.to_string()))?;

        Ok((storage, var.ty))
    }

    fn load(&mut self, storage: Storage, ty: Type) -> Operand {
        let dest = self.fresh_reg();
        self.push(Instruction::LOAD(dest.clone(), ty.into(), storage));

        dest
    }

    /// Converts `value` to `to` with `sitofp`/`fptosi` where the types differ.
    pub fn coerce(&mut self, value: Value, to: Type) -> Value {
        let op = match (value.ty, to) {
            (Type::Int, Type::Float) => CastOp::SITOFP,
            (Type::Float, Type::Int) => CastOp::FPTOSI,
            _ => return value,
        };

        let dest = self.fresh_reg();
        self.push(Instruction::CAST(
            dest.clone(),
            op,
            value.ty.into(),
            value.operand,
            to.into(),
        ));

        Value::new(dest, to)
    }

    /// Compares against zero, producing an `i1`.
    pub fn truth(&mut self, value: Value) -> Operand {
        let predicate = match value.ty {
            Type::Float => Predicate::ONE,
            _ => Predicate::NE,
        };

        let dest = self.fresh_reg();
        self.push(Instruction::CMP(
            dest.clone(),
            predicate,
            value.ty.into(),
            value.operand,
            zero(value.ty),
        ));

        dest
    }

    fn widen(&mut self, flag: Operand) -> Operand {
        let dest = self.fresh_reg();
        self.push(Instruction::CAST(
            dest.clone(),
            CastOp::ZEXT,
            IrType::I1,
            flag,
            IrType::I32,
        ));

        dest
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: Value) -> Operand {
        match op {
            UnaryOp::Neg => {
                let dest = self.fresh_reg();
                let inst = match operand.ty {
                    Type::Float => Instruction::FNEG(dest.clone(), operand.operand),
                    _ => Instruction::BINARY(
                        dest.clone(),
                        Opcode::SUB,
                        IrType::I32,
                        Operand::Int(0),
                        operand.operand,
                    ),
                };
                self.push(inst);

                dest
            }
            UnaryOp::LogicalNot => {
                let predicate = match operand.ty {
                    Type::Float => Predicate::OEQ,
                    _ => Predicate::EQ,
                };

                let flag = self.fresh_reg();
                self.push(Instruction::CMP(
                    flag.clone(),
                    predicate,
                    operand.ty.into(),
                    operand.operand,
                    zero(operand.ty),
                ));

                self.widen(flag)
            }
            UnaryOp::BitwiseNot => {
                let dest = self.fresh_reg();
                self.push(Instruction::BINARY(
                    dest.clone(),
                    Opcode::XOR,
                    IrType::I32,
                    operand.operand,
                    Operand::Int(-1),
                ));

                dest
            }
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value, ty: Type) -> Operand {
        let float = ty == Type::Float;

        let opcode = match op {
            BinaryOp::Add if float => Opcode::FADD,
            BinaryOp::Add => Opcode::ADD,
            BinaryOp::Sub if float => Opcode::FSUB,
            BinaryOp::Sub => Opcode::SUB,
            BinaryOp::Mul if float => Opcode::FMUL,
            BinaryOp::Mul => Opcode::MUL,
            BinaryOp::Div if float => Opcode::FDIV,
            BinaryOp::Div => Opcode::SDIV,
            BinaryOp::Mod => Opcode::SREM,
            BinaryOp::BitwiseAnd => Opcode::AND,
            BinaryOp::BitwiseOr => Opcode::OR,
            BinaryOp::BitwiseXor => Opcode::XOR,
            BinaryOp::ShiftLeft => Opcode::SHL,
            BinaryOp::ShiftRight => Opcode::ASHR,

            BinaryOp::Less => return self.compare(lhs, rhs, Predicate::SLT, Predicate::OLT),
            BinaryOp::LessEq => return self.compare(lhs, rhs, Predicate::SLE, Predicate::OLE),
            BinaryOp::Greater => return self.compare(lhs, rhs, Predicate::SGT, Predicate::OGT),
            BinaryOp::GreaterEq => {
                return self.compare(lhs, rhs, Predicate::SGE, Predicate::OGE);
            }
            BinaryOp::Eq => return self.compare(lhs, rhs, Predicate::EQ, Predicate::OEQ),
            BinaryOp::NotEq => return self.compare(lhs, rhs, Predicate::NE, Predicate::ONE),

            BinaryOp::LogicalAnd => return self.logical(Opcode::AND, lhs, rhs),
            BinaryOp::LogicalOr => return self.logical(Opcode::OR, lhs, rhs),
        };

        let lhs = self.coerce(lhs, ty);
        let rhs = self.coerce(rhs, ty);

        let dest = self.fresh_reg();
        self.push(Instruction::BINARY(
            dest.clone(),
            opcode,
            ty.into(),
            lhs.operand,
            rhs.operand,
        ));

        dest
    }

    fn compare(&mut self, lhs: Value, rhs: Value, int: Predicate, float: Predicate) -> Operand {
        let (ty, predicate) = if lhs.ty == Type::Float || rhs.ty == Type::Float {
            (Type::Float, float)
        } else {
            (Type::Int, int)
        };

        let lhs = self.coerce(lhs, ty);
        let rhs = self.coerce(rhs, ty);

        let flag = self.fresh_reg();
        self.push(Instruction::CMP(
            flag.clone(),
            predicate,
            ty.into(),
            lhs.operand,
            rhs.operand,
        ));

        self.widen(flag)
    }

    /// Both sides are always evaluated; each is tested with its own type.
    fn logical(&mut self, opcode: Opcode, lhs: Value, rhs: Value) -> Operand {
        let lhs = self.truth(lhs);
        let rhs = self.truth(rhs);

        let flag = self.fresh_reg();
        self.push(Instruction::BINARY(flag.clone(), opcode, IrType::I1, lhs, rhs));

        self.widen(flag)
    }

    fn lower_assign(&mut self, name: &str, op: AssignOp, value: &Expr) -> Result<Operand, IrError> {
        let (storage, target) = self.storage_of(name)?;

        let source = self.value(value)?;

        let result = match op {
            AssignOp::Eq => self.coerce(source, target),
            AssignOp::Op(op) => {
                let current = Value::new(self.load(storage.clone(), target), target);
                let ty = match (target, source.ty) {
                    (Type::Float, _) | (_, Type::Float) => Type::Float,
                    _ => Type::Int,
                };

                let combined = Value::new(self.lower_binary(op, current, source, ty), ty);
                self.coerce(combined, target)
            }
        };

        self.push(Instruction::STORE(
            target.into(),
            result.operand.clone(),
            storage,
        ));
        Ok(result.operand)
    }

    fn lower_step(&mut self, name: &str, op: StepOp, prefix: bool) -> Result<Operand, IrError> {
        let (storage, ty) = self.storage_of(name)?;
        let old = self.load(storage.clone(), ty);

        let (opcode, one) = match (op, ty) {
            (StepOp::Inc, Type::Float) => (Opcode::FADD, Operand::Float(1.0)),
            (StepOp::Dec, Type::Float) => (Opcode::FSUB, Operand::Float(1.0)),
            (StepOp::Inc, _) => (Opcode::ADD, Operand::Int(1)),
            (StepOp::Dec, _) => (Opcode::SUB, Operand::Int(1)),
        };

        let new = self.fresh_reg();
        self.push(Instruction::BINARY(new.clone(), opcode, ty.into(), old.clone(), one));
        self.push(Instruction::STORE(ty.into(), new.clone(), storage));

        Ok(if prefix { new } else { old })
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> Result<Option<Value>, IrError> {
        let (ret, params): (Type, Vec<Type>) = self
            .symbols
            .lookup_global(name)
            .and_then(Symbol::as_func)
            .map(|func| (func.ret, func.param_types().collect()))
            .ok_or_else(|| IrError::UnresolvedFunction(name.to_string()))?;

        let mut typed_args = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(params) {
            let value = self.value(arg)?;
            let value = self.coerce(value, param);
            typed_args.push((IrType::from(param), value.operand));
        }

        if ret == Type::Void {
            self.push(Instruction::CALL(
                None,
                IrType::Void,
                name.to_string(),
                typed_args,
            ));
            return Ok(None);
        }

        let dest = self.fresh_reg();
        self.push(Instruction::CALL(
            Some(dest.clone()),
            ret.into(),
            name.to_string(),
            typed_args,
        ));

        Ok(Some(Value::new(dest, ret)))
    }
}
