use std::ops::Range;

use crate::NodeId;

/// A single unit of the flat output stream: a span of the input, optionally typed with the
/// [`NodeId`] which fully covers it, along with the identities of the scopes which open before
/// and close after it.
///
/// `opens` is ordered outermost-first and `closes` innermost-first, so that a stream of tokens can
/// be folded back into a properly nested tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// `None` if no single node covers this span
    pub ty: Option<NodeId>,
    /// Byte index of the start of this token
    pub start: usize,
    /// Byte index one past the end of this token
    pub end: usize,
    pub opens: Vec<NodeId>,
    pub closes: Vec<NodeId>,
}

impl Token {
    pub fn new(ty: Option<NodeId>, start: usize, end: usize) -> Self {
        Self {
            ty,
            start,
            end,
            opens: Vec::new(),
            closes: Vec::new(),
        }
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `true` if this token carries no identity at all (no type, opens or closes)
    pub fn is_plain(&self) -> bool {
        self.ty.is_none() && self.opens.is_empty() && self.closes.is_empty()
    }
}
