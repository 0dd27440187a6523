use std::fmt::Write;

use crate::compile::ir::inst::{Instruction, Label, Operand};

/// Instruction buffer of one function, with its own register numbering.
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    header: String,
    next_reg: u32,
    body: Vec<Instruction>,
    terminated: bool,
}

impl FunctionBuilder {
    pub fn new(header: String) -> Self {
        FunctionBuilder {
            header,
            next_reg: 0,
            body: Vec::new(),
            // nothing may fall through into the entry block
            terminated: true,
        }
    }

    pub fn fresh_reg(&mut self) -> Operand {
        let reg = self.next_reg;
        self.next_reg += 1;

        Operand::Reg(reg)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Appends to the current block. Returns `false` when the block is
    /// already closed and the caller must open a new one first.
    pub fn push(&mut self, inst: Instruction) -> bool {
        if self.terminated {
            return false;
        }

        self.terminated = inst.is_terminator();
        self.body.push(inst);
        true
    }

    /// Opens a new block, falling through from the current one if it is
    /// still open.
    pub fn start_block(&mut self, label: Label) {
        if !self.terminated {
            self.body.push(Instruction::BR(label.clone()));
        }

        self.body.push(Instruction::Label(label));
        self.terminated = false;
    }

    pub fn finish(self) -> Result<String, std::fmt::Error> {
        let mut ir = String::new();

        writeln!(&mut ir, "{} {{", self.header)?;
        for inst in self.body.iter() {
            writeln!(&mut ir, "{inst}")?;
        }
        writeln!(&mut ir, "}}")?;

        Ok(ir)
    }
}
