//! Local variable bookkeeping for the single stack frame.
//!
//! Every distinct identifier gets one 8-byte slot below `%rbp`, handed out in
//! first-use order. There is one flat namespace for the whole program.

use tracing::trace;

/// Size of one variable slot in bytes.
pub const SLOT_SIZE: i64 = 8;

/// The x86-64 ABI wants `%rsp` 16-byte aligned.
const STACK_ALIGN: i64 = 16;

/// A variable known to the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
  pub name: String,
  pub offset: i64,
}

impl LocalVar {
  /// Byte length of the spelling.
  pub fn len(&self) -> usize {
    self.name.len()
  }

  pub fn is_empty(&self) -> bool {
    self.name.is_empty()
  }
}

/// Identifier spelling to frame offset, in first-use order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
  locals: Vec<LocalVar>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Look a variable up by spelling.
  pub fn find(&self, name: &str) -> Option<&LocalVar> {
    self.locals.iter().find(|var| var.name == name)
  }

  /// Return the offset of `name`, allocating the next slot on first use.
  pub fn resolve(&mut self, name: &str) -> i64 {
    if let Some(var) = self.find(name) {
      return var.offset;
    }

    let offset = self.max_offset() + SLOT_SIZE;
    trace!(name, offset, "allocated local");
    self.locals.push(LocalVar {
      name: name.to_string(),
      offset,
    });
    offset
  }

  /// Highest offset handed out so far, or 0 when no variable exists.
  pub fn max_offset(&self) -> i64 {
    self.locals.last().map_or(0, |var| var.offset)
  }

  /// Bytes to reserve below `%rbp` so every slot fits.
  pub fn stack_size(&self) -> i64 {
    align_to(self.max_offset(), STACK_ALIGN)
  }

  pub fn len(&self) -> usize {
    self.locals.len()
  }

  pub fn is_empty(&self) -> bool {
    self.locals.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &LocalVar> {
    self.locals.iter()
  }
}

/// Round `n` up to the nearest multiple of `align`.
pub fn align_to(n: i64, align: i64) -> i64 {
  (n + align - 1) / align * align
}
