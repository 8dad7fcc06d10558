//! Code generation: lower the parsed AST into AT&T x86-64 assembly.
//!
//! The emitter is a simple stack machine: every expression leaves a single
//! value on the stack and each statement pops its result into `%rax`, so the
//! last statement's value becomes the return value of `main`. Locals live in
//! one frame below `%rbp`, sized from the symbol table.

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::parser::{AstNode, BinaryOp, Program};

/// Emit assembly for a whole program.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut asm = Asm::default();
  asm.raw(".global main");
  asm.raw("main:");
  asm.emit("push %rbp");
  asm.emit("mov %rsp, %rbp");
  let stack_size = program.stack_size();
  if stack_size > 0 {
    asm.emit(format_args!("sub ${stack_size}, %rsp"));
  }

  for stmt in &program.body {
    emit_expr(stmt, &mut asm)?;
    asm.emit("pop %rax");
  }

  if program.body.is_empty() {
    // Nothing was evaluated; return 0 rather than whatever %rax held.
    asm.emit("mov $0, %rax");
  }

  asm.emit("mov %rbp, %rsp");
  asm.emit("pop %rbp");
  asm.emit("ret");

  debug!(
    stack_size,
    instructions = asm.instructions,
    "generated assembly"
  );
  Ok(asm.text)
}

/// Output buffer that counts the instructions it holds.
#[derive(Default)]
struct Asm {
  text: String,
  instructions: usize,
}

impl Asm {
  /// Append a directive or label verbatim.
  fn raw(&mut self, line: &str) {
    self.text.push_str(line);
    self.text.push('\n');
  }

  /// Append one indented instruction.
  fn emit(&mut self, insn: impl std::fmt::Display) {
    self.text.push_str(&format!("    {insn}\n"));
    self.instructions += 1;
  }
}

/// Emit stack-based code for a single expression node.
fn emit_expr(node: &AstNode, asm: &mut Asm) -> CompileResult<()> {
  match node {
    AstNode::Num { value } => {
      asm.emit(format_args!("mov ${value}, %rax"));
      asm.emit("push %rax");
    }
    AstNode::Var { .. } => {
      emit_addr(node, asm)?;
      load(asm);
    }
    AstNode::Assign { lhs, rhs } => {
      emit_addr(lhs, asm)?;
      emit_expr(rhs, asm)?;
      store(asm);
    }
    AstNode::Binary { op, lhs, rhs } => {
      emit_expr(lhs, asm)?;
      emit_expr(rhs, asm)?;
      asm.emit("pop %rdi");
      asm.emit("pop %rax");
      match op {
        BinaryOp::Add => asm.emit("add %rdi, %rax"),
        BinaryOp::Sub => asm.emit("sub %rdi, %rax"),
        BinaryOp::Mul => asm.emit("imul %rdi, %rax"),
        BinaryOp::Div => {
          asm.emit("cqo");
          asm.emit("idiv %rdi");
        }
        BinaryOp::Eq => compare(asm, "sete"),
        BinaryOp::Ne => compare(asm, "setne"),
        BinaryOp::Lt => compare(asm, "setl"),
        BinaryOp::Le => compare(asm, "setle"),
      }
      asm.emit("push %rax");
    }
  }
  Ok(())
}

/// Push the address of an lvalue.
fn emit_addr(node: &AstNode, asm: &mut Asm) -> CompileResult<()> {
  match node {
    AstNode::Var { offset } => {
      asm.emit(format_args!("lea -{offset}(%rbp), %rax"));
      asm.emit("push %rax");
      Ok(())
    }
    _ => Err(CompileError::NotLvalue),
  }
}

/// Replace the address on top of the stack with the value it points at.
fn load(asm: &mut Asm) {
  asm.emit("pop %rax");
  asm.emit("mov (%rax), %rax");
  asm.emit("push %rax");
}

/// Pop a value and an address, store the value, and push it back as the result.
fn store(asm: &mut Asm) {
  asm.emit("pop %rdi");
  asm.emit("pop %rax");
  asm.emit("mov %rdi, (%rax)");
  asm.emit("push %rdi");
}

fn compare(asm: &mut Asm, set: &str) {
  asm.emit("cmp %rdi, %rax");
  asm.emit(format_args!("{set} %al"));
  asm.emit("movzbl %al, %eax");
}
