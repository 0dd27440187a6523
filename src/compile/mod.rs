use std::{fs, io::Write, path::PathBuf};

use log::info;

use crate::{
    compile::{ast::Program, semantic::symbol_table::SymbolTable},
    infra::CflatError,
};

pub mod ast;
pub mod ir;
pub mod parser;
pub mod semantic;

/// Output path that routes the emitted module to stdout.
pub const STDOUT: &str = "-";

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    src_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    dot_path: Option<PathBuf>,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn src(&mut self, src: PathBuf) -> &mut Self {
        self.src_path = Some(src);

        self
    }

    pub fn out(&mut self, out: PathBuf) -> &mut Self {
        self.out_path = Some(out);

        self
    }

    pub fn dot(&mut self, dot: PathBuf) -> &mut Self {
        self.dot_path = Some(dot);

        self
    }

    pub fn compile(&mut self) -> Result<&mut Self, CflatError> {
        let Some(ref src_path) = self.src_path else {
            return Err(CflatError::IOError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no source path provided",
            )));
        };

        let src = fs::read_to_string(src_path)?;
        info!("compiling {}", src_path.display());

        let (program, module) = translate(&src)?;

        if let Some(ref dot_path) = self.dot_path {
            fs::write(dot_path, ast::dot::export(&program)?)?;
            info!("wrote syntax tree to {}", dot_path.display());
        }

        let out_path = self
            .out_path
            .clone()
            .unwrap_or_else(|| src_path.with_extension("ll"));

        if out_path.as_os_str() == STDOUT {
            std::io::stdout().write_all(module.as_bytes())?;
        } else {
            fs::write(&out_path, module)?;
            info!("wrote module to {}", out_path.display());
        }

        Ok(self)
    }
}

/// Runs the whole pipeline on in-memory source and returns the IR text.
pub fn compile_source(src: &str) -> Result<String, CflatError> {
    translate(src).map(|(_, module)| module)
}

fn translate(src: &str) -> Result<(Program, String), CflatError> {
    let mut program = parser::parse_program(src)?;

    let mut symbols = SymbolTable::new();
    semantic::analyze(&mut program, &mut symbols)?;

    let module = ir::emit(&program, &mut symbols)?;

    Ok((program, module))
}
