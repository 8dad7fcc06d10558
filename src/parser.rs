//! Recursive-descent parser producing a statement list and expression AST.
//!
//! The parser mirrors the classic chibicc structure: one helper per
//! precedence level, each calling the next tighter level for its operands.
//! The cursor only ever moves forward. Identifiers are resolved against the
//! symbol table as soon as they are seen, so the AST carries frame offsets
//! rather than names.

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::symbol::SymbolTable;
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language.
///
/// There is no greater-than: `a > b` is parsed as `b < a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Num {
    value: i64,
  },
  Var {
    offset: i64,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  Assign {
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn var(offset: i64) -> Self {
    Self::Var { offset }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn assign(lhs: AstNode, rhs: AstNode) -> Self {
    Self::Assign {
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }
}

/// A parsed compilation unit: expression statements in source order, plus
/// the frame layout they were resolved against.
#[derive(Debug, Clone, Default)]
pub struct Program {
  pub body: Vec<AstNode>,
  pub locals: SymbolTable,
}

impl Program {
  /// Bytes of stack needed for every local.
  pub fn stack_size(&self) -> i64 {
    self.locals.stack_size()
  }
}

/// Parse a sequence of statements from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut parser = Parser::new(tokens, source);
  let mut body = Vec::new();

  while !parser.stream.is_eof() {
    body.push(parser.parse_stmt()?);
  }

  debug!(
    statements = body.len(),
    locals = parser.locals.len(),
    "parsed program"
  );
  Ok(Program {
    body,
    locals: parser.locals,
  })
}

/// Deepest run of nested parentheses or chained assignments accepted.
pub const MAX_NESTING: usize = 256;

/// Most operator nodes a single statement may build.
pub const MAX_OPERATORS: usize = 4096;

/// State for one parse: the token cursor and the variables seen so far.
///
/// `nesting` and `operators` bound the depth of the recursion here and of
/// the tree handed to codegen, so pathological input fails with a
/// diagnostic instead of exhausting the native stack.
struct Parser<'a> {
  stream: TokenStream<'a>,
  locals: SymbolTable,
  nesting: usize,
  operators: usize,
}

impl<'a> Parser<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      stream: TokenStream::new(tokens, source),
      locals: SymbolTable::new(),
      nesting: 0,
      operators: 0,
    }
  }

  /// Run `parse` one nesting level deeper, failing at `loc` past the limit.
  fn nested(
    &mut self,
    loc: usize,
    parse: impl FnOnce(&mut Self) -> CompileResult<AstNode>,
  ) -> CompileResult<AstNode> {
    if self.nesting >= MAX_NESTING {
      return Err(CompileError::syntax(
        self.stream.source,
        loc,
        "expression nested too deeply",
      ));
    }
    self.nesting += 1;
    let node = parse(self);
    self.nesting -= 1;
    node
  }

  /// Account for one more operator node in the current statement.
  fn count_operator(&mut self, loc: usize) -> CompileResult<()> {
    self.operators += 1;
    if self.operators > MAX_OPERATORS {
      return Err(CompileError::syntax(
        self.stream.source,
        loc,
        "expression has too many operators",
      ));
    }
    Ok(())
  }

  // stmt = expr ";"
  fn parse_stmt(&mut self) -> CompileResult<AstNode> {
    self.operators = 0;
    let expr = self.parse_expr()?;
    self.stream.skip(";")?;
    Ok(expr)
  }

  // expr = assign
  fn parse_expr(&mut self) -> CompileResult<AstNode> {
    self.parse_assign()
  }

  // assign = equality ("=" assign)?
  fn parse_assign(&mut self) -> CompileResult<AstNode> {
    let start = self.stream.loc();
    let node = self.parse_equality()?;

    let loc = self.stream.loc();
    if self.stream.equal("=") {
      if !matches!(node, AstNode::Var { .. }) {
        return Err(CompileError::syntax(
          self.stream.source,
          start,
          "left-hand side of assignment is not a variable",
        ));
      }
      self.count_operator(loc)?;
      let rhs = self.nested(loc, Self::parse_assign)?;
      return Ok(AstNode::assign(node, rhs));
    }

    Ok(node)
  }

  // equality = relational ("==" relational | "!=" relational)*
  fn parse_equality(&mut self) -> CompileResult<AstNode> {
    let mut node = self.parse_relational()?;

    loop {
      let loc = self.stream.loc();
      let op = if self.stream.equal("==") {
        BinaryOp::Eq
      } else if self.stream.equal("!=") {
        BinaryOp::Ne
      } else {
        return Ok(node);
      };

      self.count_operator(loc)?;
      let rhs = self.parse_relational()?;
      node = AstNode::binary(op, node, rhs);
    }
  }

  // relational = add ("<" add | "<=" add | ">" add | ">=" add)*
  fn parse_relational(&mut self) -> CompileResult<AstNode> {
    let mut node = self.parse_add()?;

    loop {
      let loc = self.stream.loc();
      // `a > b` is stored as `b < a`, `a >= b` as `b <= a`.
      let (op, swap) = if self.stream.equal("<") {
        (BinaryOp::Lt, false)
      } else if self.stream.equal("<=") {
        (BinaryOp::Le, false)
      } else if self.stream.equal(">") {
        (BinaryOp::Lt, true)
      } else if self.stream.equal(">=") {
        (BinaryOp::Le, true)
      } else {
        return Ok(node);
      };

      self.count_operator(loc)?;
      let rhs = self.parse_add()?;
      node = if swap {
        AstNode::binary(op, rhs, node)
      } else {
        AstNode::binary(op, node, rhs)
      };
    }
  }

  // add = mul ("+" mul | "-" mul)*
  fn parse_add(&mut self) -> CompileResult<AstNode> {
    let mut node = self.parse_mul()?;

    loop {
      let loc = self.stream.loc();
      let op = if self.stream.equal("+") {
        BinaryOp::Add
      } else if self.stream.equal("-") {
        BinaryOp::Sub
      } else {
        return Ok(node);
      };

      self.count_operator(loc)?;
      let rhs = self.parse_mul()?;
      node = AstNode::binary(op, node, rhs);
    }
  }

  // mul = unary ("*" unary | "/" unary)*
  fn parse_mul(&mut self) -> CompileResult<AstNode> {
    let mut node = self.parse_unary()?;

    loop {
      let loc = self.stream.loc();
      let op = if self.stream.equal("*") {
        BinaryOp::Mul
      } else if self.stream.equal("/") {
        BinaryOp::Div
      } else {
        return Ok(node);
      };

      self.count_operator(loc)?;
      let rhs = self.parse_unary()?;
      node = AstNode::binary(op, node, rhs);
    }
  }

  // unary = ("+" | "-")? primary
  fn parse_unary(&mut self) -> CompileResult<AstNode> {
    if self.stream.equal("+") {
      return self.parse_primary();
    }

    let loc = self.stream.loc();
    if self.stream.equal("-") {
      self.count_operator(loc)?;
      let operand = self.parse_primary()?;
      return Ok(AstNode::binary(BinaryOp::Sub, AstNode::number(0), operand));
    }

    self.parse_primary()
  }

  // primary = "(" expr ")" | ident | num
  fn parse_primary(&mut self) -> CompileResult<AstNode> {
    let loc = self.stream.loc();
    if self.stream.equal("(") {
      let node = self.nested(loc, Self::parse_expr)?;
      self.stream.skip(")")?;
      return Ok(node);
    }

    if let Some(name) = self.stream.get_ident() {
      let offset = self.locals.resolve(name);
      return Ok(AstNode::var(offset));
    }

    let value = self.stream.get_number()?;
    Ok(AstNode::number(value))
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Byte offset of the current token, or the end of input past the last one.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Punctuator
      && token.len == op.len()
      && token_text(token, self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let got = describe_token(self.peek(), self.source);
      Err(CompileError::syntax(
        self.source,
        self.loc(),
        format!("expected \"{s}\", but got \"{got}\""),
      ))
    }
  }

  /// Consume the current token if it is an integer literal and return its value.
  fn get_number(&mut self) -> CompileResult<i64> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::syntax(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      self.pos += 1;
      return Ok(value);
    }

    let got = describe_token(self.peek(), self.source);
    Err(CompileError::syntax(
      self.source,
      self.loc(),
      format!("expected a number or identifier, but got \"{got}\""),
    ))
  }

  /// Consume the current token if it is an identifier and return its spelling.
  fn get_ident(&mut self) -> Option<&'a str> {
    let token = self.peek()?;
    if token.kind != TokenKind::Ident {
      return None;
    }
    let name = token_text(token, self.source);
    self.pos += 1;
    Some(name)
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof) | None)
  }
}
