use std::fmt::Display;

use crate::compile::{ast::Type, semantic::symbol_table::Storage};

pub type Label = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrType {
    I1,
    I32,
    Float,
    Double,
    Void,
}

impl From<Type> for IrType {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Int => IrType::I32,
            Type::Float => IrType::Float,
            Type::Void => IrType::Void,
        }
    }
}

impl Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I1 => write!(f, "i1"),
            Self::I32 => write!(f, "i32"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Void => write!(f, "void"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(u32),
    Param(String),
    Int(i32),
    Float(f64),
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reg(n) => write!(f, "%{n}"),
            Self::Param(name) => write!(f, "%{name}.arg"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{}", float_literal(*value)),
        }
    }
}

/// Renders a floating point constant as `d.ddde[+-]XX`, which the IR parser
/// accepts for any finite value.
pub fn float_literal(value: f64) -> String {
    let formatted = format!("{value:e}");
    let (mantissa, exponent) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));

    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{mantissa}.0")
    };

    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };

    format!("{mantissa}e{sign}{digits:0>2}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    ADD,
    FADD,
    SUB,
    FSUB,
    MUL,
    FMUL,
    SDIV,
    FDIV,
    SREM,
    AND,
    OR,
    XOR,
    SHL,
    ASHR,
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opcode = match self {
            Self::ADD => "add",
            Self::FADD => "fadd",
            Self::SUB => "sub",
            Self::FSUB => "fsub",
            Self::MUL => "mul",
            Self::FMUL => "fmul",
            Self::SDIV => "sdiv",
            Self::FDIV => "fdiv",
            Self::SREM => "srem",
            Self::AND => "and",
            Self::OR => "or",
            Self::XOR => "xor",
            Self::SHL => "shl",
            Self::ASHR => "ashr",
        };

        write!(f, "{opcode}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    EQ,
    NE,
    SLT,
    SLE,
    SGT,
    SGE,
    OEQ,
    ONE,
    OLT,
    OLE,
    OGT,
    OGE,
}

impl Predicate {
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::OEQ | Self::ONE | Self::OLT | Self::OLE | Self::OGT | Self::OGE
        )
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let predicate = match self {
            Self::EQ => "eq",
            Self::NE => "ne",
            Self::SLT => "slt",
            Self::SLE => "sle",
            Self::SGT => "sgt",
            Self::SGE => "sge",
            Self::OEQ => "oeq",
            Self::ONE => "one",
            Self::OLT => "olt",
            Self::OLE => "ole",
            Self::OGT => "ogt",
            Self::OGE => "oge",
        };

        write!(f, "{predicate}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    SITOFP,
    FPTOSI,
    ZEXT,
    FPTRUNC,
}

impl Display for CastOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SITOFP => write!(f, "sitofp"),
            Self::FPTOSI => write!(f, "fptosi"),
            Self::ZEXT => write!(f, "zext"),
            Self::FPTRUNC => write!(f, "fptrunc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Label(Label),
    ALLOCA(Storage, IrType),
    LOAD(Operand, IrType, Storage),
    STORE(IrType, Operand, Storage),
    BINARY(Operand, Opcode, IrType, Operand, Operand),
    FNEG(Operand, Operand),
    CMP(Operand, Predicate, IrType, Operand, Operand),
    CAST(Operand, CastOp, IrType, Operand, IrType),
    BR(Label),
    CBR(Operand, Label, Label),
    CALL(Option<Operand>, IrType, String, Vec<(IrType, Operand)>),
    RET(Option<(IrType, Operand)>),
    UNREACHABLE,
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::BR(_) | Self::CBR(..) | Self::RET(_) | Self::UNREACHABLE
        )
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}:"),
            Self::ALLOCA(slot, ty) => write!(f, "  {slot} = alloca {ty}, align 4"),
            Self::LOAD(dest, ty, addr) => write!(f, "  {dest} = load {ty}, {ty}* {addr}"),
            Self::STORE(ty, value, addr) => write!(f, "  store {ty} {value}, {ty}* {addr}"),
            Self::BINARY(dest, op, ty, lhs, rhs) => {
                write!(f, "  {dest} = {op} {ty} {lhs}, {rhs}")
            }
            Self::FNEG(dest, value) => write!(f, "  {dest} = fneg float {value}"),
            Self::CMP(dest, predicate, ty, lhs, rhs) => {
                let cmp = if predicate.is_float() { "fcmp" } else { "icmp" };
                write!(f, "  {dest} = {cmp} {predicate} {ty} {lhs}, {rhs}")
            }
            Self::CAST(dest, op, from, value, to) => {
                write!(f, "  {dest} = {op} {from} {value} to {to}")
            }
            Self::BR(label) => write!(f, "  br label %{label}"),
            Self::CBR(cond, then, otherwise) => {
                write!(f, "  br i1 {cond}, label %{then}, label %{otherwise}")
            }
            Self::CALL(dest, ret, callee, args) => {
                let args = args
                    .iter()
                    .map(|(ty, value)| format!("{ty} {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");

                match dest {
                    Some(dest) => write!(f, "  {dest} = call {ret} @{callee}({args})"),
                    None => write!(f, "  call {ret} @{callee}({args})"),
                }
            }
            Self::RET(Some((ty, value))) => write!(f, "  ret {ty} {value}"),
            Self::RET(None) => write!(f, "  ret void"),
            Self::UNREACHABLE => write!(f, "  unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals_always_carry_a_point_and_signed_exponent() {
        assert_eq!(float_literal(0.0), "0.0e+00");
        assert_eq!(float_literal(1.0), "1.0e+00");
        assert_eq!(float_literal(0.5), "5.0e-01");
        assert_eq!(float_literal(1.25e20), "1.25e+20");
        assert_eq!(float_literal(3.14), "3.14e+00");
    }

    #[test]
    fn memory_instructions() {
        let slot = Storage::Stack("x.addr.0".into());

        assert_eq!(
            Instruction::ALLOCA(slot.clone(), IrType::I32).to_string(),
            "  %x.addr.0 = alloca i32, align 4"
        );
        assert_eq!(
            Instruction::LOAD(Operand::Reg(3), IrType::Float, Storage::Global("g".into()))
                .to_string(),
            "  %3 = load float, float* @g"
        );
        assert_eq!(
            Instruction::STORE(IrType::I32, Operand::Int(7), slot).to_string(),
            "  store i32 7, i32* %x.addr.0"
        );
    }

    #[test]
    fn comparisons_pick_icmp_or_fcmp() {
        let icmp = Instruction::CMP(
            Operand::Reg(2),
            Predicate::SLT,
            IrType::I32,
            Operand::Reg(0),
            Operand::Reg(1),
        );
        assert_eq!(icmp.to_string(), "  %2 = icmp slt i32 %0, %1");

        let fcmp = Instruction::CMP(
            Operand::Reg(1),
            Predicate::ONE,
            IrType::Float,
            Operand::Reg(0),
            Operand::Float(0.0),
        );
        assert_eq!(fcmp.to_string(), "  %1 = fcmp one float %0, 0.0e+00");
    }

    #[test]
    fn calls() {
        let call = Instruction::CALL(
            Some(Operand::Reg(4)),
            IrType::I32,
            "f".into(),
            vec![(IrType::I32, Operand::Int(1)), (IrType::Float, Operand::Reg(3))],
        );
        assert_eq!(call.to_string(), "  %4 = call i32 @f(i32 1, float %3)");

        let call = Instruction::CALL(None, IrType::Void, "_init_globals".into(), vec![]);
        assert_eq!(call.to_string(), "  call void @_init_globals()");
    }
}
