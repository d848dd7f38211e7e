//! `slc`: compiler from the SL imperative language to instructions for a
//! fixed register-based virtual machine.
//!
//! The pipeline is a straight line, one module per stage: [`lexer`] and
//! [`parser`] build the typed [`ast`], [`analyzer`] walks it once to
//! build the symbol table (via [`memory`]) and reject ill-formed
//! programs, [`codegen`] lowers it to labeled VM code, [`label_resolver`]
//! turns labels into absolute instruction indices, and [`peephole`]
//! cleans up the local redundancies code generation leaves behind.
//! [`compile`] wires all of it together.

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod label_resolver;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod peephole;

use config::CompilerConfig;
use errors::CompileError;
use parser::Parser;

/// Compile SL source text to VM program text (one instruction per line),
/// using the default [`CompilerConfig`].
pub fn compile(source: &str) -> Result<String, CompileError> {
    compile_with_config(source, &CompilerConfig::default())
}

/// Compile SL source text to VM program text, honoring `config`'s
/// optimizer settings.
pub fn compile_with_config(source: &str, config: &CompilerConfig) -> Result<String, CompileError> {
    let program = Parser::new(source)?.parse()?;
    let mut analysis = analyzer::analyze(&program)?;
    let raw = codegen::generate(&program, &mut analysis.memory);
    let resolved = label_resolver::resolve(&raw);
    let lines = if config.optimize {
        peephole::optimize(&resolved, config.max_iterations)
    } else {
        resolved
    };
    Ok(lines.join("\n"))
}
