//! Shared helpers for the integration tests.
//!
//! [`run`] interprets the exact instruction subset the code generator emits,
//! so tests can check what a compiled program evaluates to without an
//! assembler or linker on the host.

#![allow(dead_code)]

use std::collections::HashMap;

pub use minicc::generate_assembly;

/// Where `%rsp` points when `main` is entered.
const STACK_TOP: i64 = 0x10000;
const RETURN_ADDRESS: i64 = 0x4000;

/// Compile `src` and run it, returning the value `main` leaves in `%rax`.
pub fn eval(src: &str) -> i64 {
  let asm = generate_assembly(src).unwrap_or_else(|err| panic!("compile failed:\n{err}"));
  run(&asm).unwrap_or_else(|err| panic!("execution failed: {err}\n{asm}"))
}

#[derive(Debug, Clone, Copy)]
enum Operand<'a> {
  Imm(i64),
  Reg(&'a str),
  Mem { base: &'a str, disp: i64 },
}

fn operand(text: &str) -> Result<Operand<'_>, String> {
  if let Some(imm) = text.strip_prefix('$') {
    return imm
      .parse()
      .map(Operand::Imm)
      .map_err(|err| format!("bad immediate {text}: {err}"));
  }
  if text.starts_with('%') {
    return Ok(Operand::Reg(text));
  }
  let (disp, rest) = text
    .split_once('(')
    .ok_or_else(|| format!("bad operand {text}"))?;
  let base = rest
    .strip_suffix(')')
    .ok_or_else(|| format!("bad operand {text}"))?;
  let disp = if disp.is_empty() {
    0
  } else {
    disp
      .parse()
      .map_err(|err| format!("bad displacement {text}: {err}"))?
  };
  Ok(Operand::Mem { base, disp })
}

#[derive(Debug)]
struct Machine {
  rax: i64,
  rdi: i64,
  rbp: i64,
  rsp: i64,
  memory: HashMap<i64, i64>,
  flags: Option<(i64, i64)>,
}

impl Machine {
  fn new() -> Self {
    let mut memory = HashMap::new();
    memory.insert(STACK_TOP - 8, RETURN_ADDRESS);
    Self {
      rax: 0x5a5a,
      rdi: 0,
      rbp: 0x7777,
      rsp: STACK_TOP - 8,
      memory,
      flags: None,
    }
  }

  fn reg(&mut self, name: &str) -> Result<&mut i64, String> {
    match name {
      "%rax" => Ok(&mut self.rax),
      "%rdi" => Ok(&mut self.rdi),
      "%rbp" => Ok(&mut self.rbp),
      "%rsp" => Ok(&mut self.rsp),
      other => Err(format!("unsupported register {other}")),
    }
  }

  fn load(&self, addr: i64) -> Result<i64, String> {
    self
      .memory
      .get(&addr)
      .copied()
      .ok_or_else(|| format!("read of uninitialised memory at {addr:#x}"))
  }

  fn read(&mut self, op: Operand) -> Result<i64, String> {
    match op {
      Operand::Imm(value) => Ok(value),
      Operand::Reg(name) => Ok(*self.reg(name)?),
      Operand::Mem { base, disp } => {
        let addr = *self.reg(base)? + disp;
        self.load(addr)
      }
    }
  }

  fn write(&mut self, op: Operand, value: i64) -> Result<(), String> {
    match op {
      Operand::Imm(_) => Err("cannot write to an immediate".to_string()),
      Operand::Reg(name) => {
        *self.reg(name)? = value;
        Ok(())
      }
      Operand::Mem { base, disp } => {
        let addr = *self.reg(base)? + disp;
        self.memory.insert(addr, value);
        Ok(())
      }
    }
  }

  fn push(&mut self, value: i64) {
    self.rsp -= 8;
    self.memory.insert(self.rsp, value);
  }

  fn pop(&mut self) -> Result<i64, String> {
    let value = self.load(self.rsp)?;
    self.rsp += 8;
    Ok(value)
  }

  fn set_al(&mut self, condition: impl Fn(i64, i64) -> bool) -> Result<(), String> {
    let (lhs, rhs) = self.flags.ok_or("set without a preceding cmp")?;
    self.rax = (self.rax & !0xff) | i64::from(condition(lhs, rhs));
    Ok(())
  }
}

/// Execute the assembly text produced by the compiler.
pub fn run(asm: &str) -> Result<i64, String> {
  let mut m = Machine::new();

  for line in asm.lines().map(str::trim) {
    if line.is_empty() || line.starts_with('.') || line.ends_with(':') {
      continue;
    }
    let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
    let ops = rest
      .split(", ")
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>();
    let op = |i: usize| {
      ops
        .get(i)
        .ok_or_else(|| format!("missing operand in `{line}`"))
        .and_then(|text| operand(*text))
    };

    match mnemonic {
      "push" => {
        let value = m.read(op(0)?)?;
        m.push(value);
      }
      "pop" => {
        let value = m.pop()?;
        m.write(op(0)?, value)?;
      }
      "mov" => {
        let value = m.read(op(0)?)?;
        m.write(op(1)?, value)?;
      }
      "lea" => {
        let Operand::Mem { base, disp } = op(0)? else {
          return Err(format!("lea needs a memory operand: `{line}`"));
        };
        let addr = *m.reg(base)? + disp;
        m.write(op(1)?, addr)?;
      }
      "add" | "sub" | "imul" => {
        let src = m.read(op(0)?)?;
        let dst = m.read(op(1)?)?;
        let value = match mnemonic {
          "add" => dst.wrapping_add(src),
          "sub" => dst.wrapping_sub(src),
          _ => dst.wrapping_mul(src),
        };
        m.write(op(1)?, value)?;
      }
      "cqo" => {}
      "idiv" => {
        let divisor = m.read(op(0)?)?;
        if divisor == 0 {
          return Err("division by zero".to_string());
        }
        m.rax = m.rax.checked_div(divisor).ok_or("division overflow")?;
      }
      "cmp" => {
        let src = m.read(op(0)?)?;
        let dst = m.read(op(1)?)?;
        m.flags = Some((dst, src));
      }
      "sete" => m.set_al(|a, b| a == b)?,
      "setne" => m.set_al(|a, b| a != b)?,
      "setl" => m.set_al(|a, b| a < b)?,
      "setle" => m.set_al(|a, b| a <= b)?,
      "movzbl" => m.rax &= 0xff,
      "ret" => {
        let target = m.pop()?;
        if target != RETURN_ADDRESS || m.rsp != STACK_TOP {
          return Err(format!("unbalanced stack at ret (rsp = {:#x})", m.rsp));
        }
        return Ok(m.rax);
      }
      other => return Err(format!("unknown instruction `{other}`")),
    }
  }

  Err("program fell off the end without ret".to_string())
}
