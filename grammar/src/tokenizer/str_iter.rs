/// A cursor over a [`str`]ing which only ever stops on `char` boundaries, providing the utility
/// methods used by the scan loop.
#[derive(Debug, Clone)]
pub(crate) struct StrIter<'s> {
    source_str: &'s str,
    /// The number of bytes consumed so far.  Always a `char` boundary of `source_str`.
    consumed: usize,
}

impl<'s> StrIter<'s> {
    pub fn new(s: &'s str) -> Self {
        Self {
            source_str: s,
            consumed: 0,
        }
    }

    /// Moves `self` on by `len` bytes.
    ///
    /// Returns `None` if either `self` doesn't have this many bytes left to consume, or `len`
    /// bytes doesn't land on the boundary between two UTF-8 code-points.
    #[must_use]
    pub fn eat_len(&mut self, len: usize) -> Option<&'s str> {
        let str_consumed = self.str_remaining().get(..len)?;
        self.consumed += len;
        Some(str_consumed)
    }

    /// The number of bytes of `self` which have been consumed
    #[inline]
    pub fn consumed_length(&self) -> usize {
        self.consumed
    }

    /// Returns `true` if `self` has no more string to consume
    #[inline]
    pub fn is_done(&self) -> bool {
        self.consumed >= self.source_str.len()
    }

    /// The full string slice being tokenized
    #[inline]
    pub fn source_str(&self) -> &'s str {
        self.source_str
    }

    /// The string slice yet to be consumed
    pub fn str_remaining(&self) -> &'s str {
        // `consumed` is always a char boundary, so this never falls back to the empty string
        self.source_str.get(self.consumed..).unwrap_or("")
    }
}
