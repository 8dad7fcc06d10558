//! Splits source text into the tokens the parser consumes.
//!
//! A token never copies text: it records where its spelling starts and how
//! long it is, and `token_text` slices it back out of the source. Operator
//! matching tries the two-byte spellings first, so `a>=1` yields `>=`.

use tracing::debug;

use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  /// Operator or punctuation such as `+`, `<=` or `;`.
  Punctuator,
  Ident,
  Num,
  /// Always the last token, positioned at the end of the source.
  Eof,
}

/// One lexeme: its kind, byte span, and value for integer literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

const TWO_BYTE_OPS: [&str; 4] = ["==", "!=", "<=", ">="];
const ONE_BYTE_OPS: &[u8] = b"+-*/()<>;=";

fn is_ident_start(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
  c.is_ascii_alphanumeric() || c == b'_'
}

/// Index one past the run of bytes from `start` that satisfy `pred`.
fn run_end(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
  bytes[start..]
    .iter()
    .position(|&b| !pred(b))
    .map_or(bytes.len(), |n| start + n)
}

/// Tokenize all of `input`, failing on the first byte no token can start with.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let bytes = input.as_bytes();
  let mut tokens = Vec::new();
  let mut pos = 0;

  while let Some(&c) = bytes.get(pos) {
    if c.is_ascii_whitespace() {
      pos += 1;
    } else if c.is_ascii_digit() {
      let end = run_end(bytes, pos, |b| b.is_ascii_digit());
      let value = input[pos..end]
        .parse::<i64>()
        .map_err(|err| CompileError::lex(input, pos, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Num, pos, end - pos, Some(value)));
      pos = end;
    } else if is_ident_start(c) {
      let end = run_end(bytes, pos + 1, is_ident_continue);
      tokens.push(Token::new(TokenKind::Ident, pos, end - pos, None));
      pos = end;
    } else if let Some(op) = TWO_BYTE_OPS
      .iter()
      .find(|op| bytes[pos..].starts_with(op.as_bytes()))
    {
      tokens.push(Token::new(TokenKind::Punctuator, pos, op.len(), None));
      pos += op.len();
    } else if ONE_BYTE_OPS.contains(&c) {
      tokens.push(Token::new(TokenKind::Punctuator, pos, 1, None));
      pos += 1;
    } else {
      // Only ASCII has been consumed, so `pos` starts a whole character.
      let bad = input[pos..].chars().next().unwrap_or('\0');
      return Err(CompileError::lex(input, pos, format!("invalid token: '{bad}'")));
    }
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  debug!(tokens = tokens.len(), "tokenized input");
  Ok(tokens)
}

/// The source spelling of `token`.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  &source[token.loc..token.loc + token.len]
}

/// Spelling for error messages; end of input reads as `EOF`.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) if t.kind != TokenKind::Eof => token_text(t, source).to_string(),
    _ => "EOF".to_string(),
  }
}
