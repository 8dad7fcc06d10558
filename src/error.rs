//! Shared error utilities used across the compilation pipeline.
//!
//! Every stage fails fast: the first problem becomes a `CompileError` that is
//! propagated to the caller untouched. Positioned errors render the source
//! line followed by a caret under the offending byte, chibicc style.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// A character the tokenizer does not understand, or an unrepresentable literal.
  #[snafu(display("{expr_line}\n{marker} {message}"))]
  Lex {
    loc: usize,
    expr_line: String,
    marker: String,
    message: String,
  },
  /// The token stream does not match the grammar.
  #[snafu(display("{expr_line}\n{marker} {message}"))]
  Syntax {
    loc: usize,
    expr_line: String,
    marker: String,
    message: String,
  },
  /// Code generation was asked for the address of something that is not a variable.
  #[snafu(display("not an lvalue"))]
  NotLvalue,
}

impl CompileError {
  /// Lexical error anchored at byte offset `loc` of `expr`.
  pub fn lex(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (expr_line, marker) = render(expr, loc);
    Self::Lex {
      loc,
      expr_line,
      marker,
      message: message.into(),
    }
  }

  /// Syntax error anchored at byte offset `loc` of `expr`.
  pub fn syntax(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (expr_line, marker) = render(expr, loc);
    Self::Syntax {
      loc,
      expr_line,
      marker,
      message: message.into(),
    }
  }

  /// Byte offset of the failure, when the error has one.
  pub fn loc(&self) -> Option<usize> {
    match self {
      Self::Lex { loc, .. } | Self::Syntax { loc, .. } => Some(*loc),
      Self::NotLvalue => None,
    }
  }

  /// The bare message without the source line and caret.
  pub fn message(&self) -> String {
    match self {
      Self::Lex { message, .. } | Self::Syntax { message, .. } => message.clone(),
      Self::NotLvalue => self.to_string(),
    }
  }
}

fn render(expr: &str, loc: usize) -> (String, String) {
  let safe_loc = loc.min(expr.len());
  // Column counts characters so the caret lines up in a terminal.
  let column = expr
    .get(..safe_loc)
    .map_or(safe_loc, |prefix| prefix.chars().count());
  (expr.to_string(), format!("{}^", " ".repeat(column)))
}
