//! `olang` — whole-program compiler for the O language.
//!
//! Pipeline: source -> tokens -> AST -> checked AST -> optimised AST ->
//! stack-machine module. Each stage runs to completion before the next;
//! the first diagnostic aborts the compile with exit status 1.

mod output;

use anyhow::Context;
use clap::Parser;
use olang_compiler::CompileOptions;
use output::{resolve_color_choice, StyledOutput};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// File extension of emitted modules.
const MODULE_EXTENSION: &str = "obc";

#[derive(Parser)]
#[command(name = "olang")]
#[command(about = "Compiler for the O language", long_about = None)]
#[command(version)]
struct Cli {
    /// Source file to compile
    source: PathBuf,

    /// Skip the optimise pass (dead-code removal, constant branches)
    #[arg(long)]
    no_optimize: bool,

    /// Emit the binary module
    #[arg(long)]
    compile_net: bool,

    /// Output path (default: input basename with the module extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Entry class (default: the first declared class)
    #[arg(long)]
    start: Option<String>,

    /// Print the instruction listing after a successful compile
    #[arg(long)]
    emit_listing: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice());

    let status = match run(&cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    };
    out.flush();
    status
}

fn run(cli: &Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&cli.source)
        .with_context(|| format!("cannot read {}", cli.source.display()))?;
    let module_name = module_name(&cli.source);

    // Parse
    let mut program = olang_parser::parse_source(&source)?;
    out.info(&format!(
        "parsed {} class(es) from {}",
        program.classes.len(),
        cli.source.display()
    ));

    // Check
    let mut analysis = olang_parser::analyze(&program)?;
    for warning in &analysis.warnings {
        out.warning(&warning.to_string());
    }

    // Optimise
    if !cli.no_optimize {
        let rewrites = olang_parser::optimize(&mut program);
        for rewrite in &rewrites {
            out.info(&rewrite.to_string());
        }
        if !rewrites.is_empty() {
            // The registry must match the rewritten AST.
            analysis = olang_parser::analyze(&program)
                .context("re-analysis after optimisation failed")?;
        }
    }

    // Emit
    let options = CompileOptions {
        module_name,
        start_class: cli.start.clone(),
    };
    let compiled = olang_compiler::compile(&program, &analysis.info, &options)?;
    for warning in &compiled.warnings {
        out.warning(warning);
    }
    out.success(&format!(
        "compiled {} class(es) to module `{}`",
        compiled.module.classes.len(),
        compiled.module.name
    ));

    if cli.emit_listing {
        out.plain(&compiled.module.disassemble());
    }

    if cli.compile_net {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| cli.source.with_extension(MODULE_EXTENSION));
        let bytes = compiled.module.to_bytes();
        std::fs::write(&path, &bytes)
            .with_context(|| format!("cannot write {}", path.display()))?;
        out.success(&format!("wrote {} bytes to {}", bytes.len(), path.display()));
    }

    Ok(())
}

/// Module name from the source path: the file stem.
fn module_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string())
}
