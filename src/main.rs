use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;

use cflat::compile::Compiler;
use cflat::infra::{ExitCode, report};

#[derive(Parser, Debug)]
#[command(version, about = "Compiles a C-like source file to LLVM-style IR")]
struct Args {
    /// Source file to compile
    src: String,

    /// Output file, `-` for stdout. Defaults to the source path with `.ll`
    #[arg(short, long)]
    out: Option<String>,

    /// Also write the checked syntax tree as a Graphviz digraph
    #[arg(long)]
    dot: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut compiler = Compiler::new();
    compiler.src(PathBuf::from(args.src.as_str()));
    if let Some(out) = args.out.as_deref() {
        compiler.out(PathBuf::from(out));
    }
    if let Some(dot) = args.dot.as_deref() {
        compiler.dot(PathBuf::from(dot));
    }

    let Some(err) = compiler.compile().err() else {
        return ExitCode::SUCCESS;
    };

    let src = std::fs::read_to_string(&args.src).unwrap_or_default();
    if let Err(io_err) = report::eprint(&err, &args.src, &src) {
        eprintln!("error: {err} ({io_err})");
    }

    err.into()
}
