//! `minicc` compiles a small statement language of integers, variables,
//! arithmetic, comparisons and assignment into x86-64 assembly for `main`.
//!
//! Source flows through `tokenizer::tokenize`, then `parser::parse`, which
//! also lays out every variable in a `symbol::SymbolTable`, and finally
//! `codegen::generate`. Each stage returns a `CompileResult`, and the first
//! `CompileError` ends the compilation.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod symbol;
pub mod tokenizer;

pub use error::{CompileError, CompileResult};
pub use parser::Program;

/// Compile a source string into AT&T assembly.
///
/// ```
/// let asm = minicc::generate_assembly("x = 6; x * 7;").unwrap();
/// assert!(asm.starts_with(".global main\nmain:\n"));
/// assert!(asm.contains("    sub $16, %rsp\n"));
///
/// let err = minicc::generate_assembly("x = ;").unwrap_err();
/// assert_eq!(err.loc(), Some(4));
/// ```
pub fn generate_assembly(src: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(src)?;
  let program = parser::parse(tokens, src)?;
  codegen::generate(&program)
}
