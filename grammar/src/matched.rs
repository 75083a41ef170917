//! The tree-shaped results of applying rules, and the algorithm which flattens them into a
//! linear stream of [`Token`]s.
//!
//! All [`Matched`] nodes of a tokenization run are stored in a [`Forest`] and referred to by
//! [`MatchedId`], so that rebasing a sub-tree ([`Forest::offset`]) or wrapping it
//! ([`Forest::wrap`]) never requires cloning it.

use std::fmt::{Display, Formatter};

use index_vec::IndexVec;

use crate::{NodeId, Token};

/// How the identity of a [`Matched`] node attaches to the output tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapping {
    /// The node covers its whole span
    Full,
    /// The node opens a scope which is closed by a later [`Wrapping::End`] node
    Begin,
    /// The node closes a scope opened by an earlier [`Wrapping::Begin`] node
    End,
}

impl Wrapping {
    #[inline]
    fn opens(self) -> bool {
        matches!(self, Wrapping::Full | Wrapping::Begin)
    }

    #[inline]
    fn closes(self) -> bool {
        matches!(self, Wrapping::Full | Wrapping::End)
    }
}

/// One of the two ends of a [`Matched`] span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Start,
    End,
}

/// The result of one successful application of a rule.  A node without `children` is a leaf;
/// the `children` of a branch are stored in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub(crate) node: NodeId,
    pub(crate) from: usize,
    pub(crate) length: usize,
    pub(crate) children: Option<Vec<MatchedId>>,
    pub(crate) wrapping: Wrapping,
}

impl Matched {
    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn from(&self) -> usize {
        self.from
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.from + self.length
    }

    #[inline]
    pub fn wrapping(&self) -> Wrapping {
        self.wrapping
    }

    pub fn children(&self) -> &[MatchedId] {
        self.children.as_deref().unwrap_or(&[])
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// The ways that compiling a [`Matched`] tree can fail.  These always indicate a malformed
/// grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A leaf with no identity tried to open or close a scope
    InvalidTree { from: usize, wrapping: Wrapping },
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::InvalidTree { from, wrapping } => write!(
                f,
                "Leaf at {} has no node but is wrapped as {:?}",
                from, wrapping
            ),
        }
    }
}

impl std::error::Error for CompileError {}

/// Arena owning every [`Matched`] node created during one tokenization run.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: IndexVec<MatchedId, Matched>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every node, invalidating all existing [`MatchedId`]s
    pub fn clear(&mut self) {
        self.nodes.raw.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: MatchedId) -> &Matched {
        &self.nodes[id]
    }

    /////////////////
    // CONSTRUCTION //
    /////////////////

    /// Adds a leaf which fully covers `from..from + length`
    pub fn leaf(&mut self, node: NodeId, from: usize, length: usize) -> MatchedId {
        self.nodes.push(Matched {
            node,
            from,
            length,
            children: None,
            wrapping: Wrapping::Full,
        })
    }

    /// Adds a branch which fully covers `from..from + length`.  `children` must be in document
    /// order.
    pub fn branch(
        &mut self,
        node: NodeId,
        from: usize,
        length: usize,
        children: Vec<MatchedId>,
    ) -> MatchedId {
        self.nodes.push(Matched {
            node,
            from,
            length,
            children: Some(children),
            wrapping: Wrapping::Full,
        })
    }

    /// Replaces the children of `id` (turning a leaf into a branch)
    pub(crate) fn set_children(&mut self, id: MatchedId, children: Vec<MatchedId>) {
        self.nodes[id].children = Some(children);
    }

    /// Moves the sub-tree rooted at `id` forward by `delta` bytes.  Used to re-anchor a tree
    /// which was matched against a substring to its true position in the outer text.
    pub fn offset(&mut self, id: MatchedId, delta: usize) {
        let mut to_visit = vec![id];
        while let Some(id) = to_visit.pop() {
            let matched = &mut self.nodes[id];
            matched.from += delta;
            if let Some(children) = &matched.children {
                to_visit.extend(children.iter().copied());
            }
        }
    }

    /// Creates a new branch with `id` as its only child, covering the same span
    pub fn wrap(&mut self, id: MatchedId, node: NodeId, wrapping: Wrapping) -> MatchedId {
        let inner = &self.nodes[id];
        let (from, length) = (inner.from, inner.length);
        self.nodes.push(Matched {
            node,
            from,
            length,
            children: Some(vec![id]),
            wrapping,
        })
    }

    /// Splices a zero-width child onto one end of `id`'s span.  This gives a boundary its own
    /// identity without consuming any text.
    ///
    /// If `id` is a leaf, its span is first moved into a `None` child, so that the text it
    /// covers is still emitted.
    pub fn push(&mut self, id: MatchedId, node: NodeId, side: Side, wrapping: Wrapping) {
        let (from, end) = (self.nodes[id].from, self.nodes[id].end());
        if self.nodes[id].is_leaf() {
            let content = self.leaf(NodeId::none(), from, end - from);
            self.set_children(id, vec![content]);
        }
        let pos = match side {
            Side::Start => from,
            Side::End => end,
        };
        let synthetic = self.nodes.push(Matched {
            node,
            from: pos,
            length: 0,
            children: None,
            wrapping,
        });
        let children = self.nodes[id].children.get_or_insert_with(Vec::new);
        match side {
            Side::Start => children.insert(0, synthetic),
            Side::End => children.push(synthetic),
        }
    }

    /////////////////
    // COMPILATION //
    /////////////////

    /// Flattens the tree rooted at `id` into [`Token`]s
    pub fn compile(&self, id: MatchedId) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        self.compile_into(id, &mut tokens)?;
        Ok(tokens)
    }

    /// Same as [`Self::compile`], but appends the [`Token`]s to an existing [`Vec`]
    pub fn compile_into(&self, id: MatchedId, out: &mut Vec<Token>) -> Result<(), CompileError> {
        let matched = &self.nodes[id];
        let children = match &matched.children {
            Some(children) => children,
            None => {
                let mut token = Token::new(None, matched.from, matched.end());
                match (matched.wrapping, matched.node.type_index()) {
                    (Wrapping::Full, ty) => token.ty = ty,
                    (wrapping, None) => {
                        return Err(CompileError::InvalidTree {
                            from: matched.from,
                            wrapping,
                        })
                    }
                    (Wrapping::Begin, Some(node)) => token.opens.push(node),
                    (Wrapping::End, Some(node)) => token.closes.push(node),
                }
                out.push(token);
                return Ok(());
            }
        };

        let first_token_idx = out.len();
        for &child in children {
            self.compile_into(child, out)?;
        }
        // A `None` branch only forwards its children's tokens
        if matched.node.is_none() || out.len() == first_token_idx {
            return Ok(());
        }
        if matched.wrapping.opens() {
            out[first_token_idx].opens.insert(0, matched.node);
        }
        if matched.wrapping.closes() {
            if let Some(last) = out.last_mut() {
                last.closes.push(matched.node);
            }
        }
        Ok(())
    }
}

index_vec::define_index_type! { pub struct MatchedId = usize; }

#[cfg(test)]
mod tests {
    use super::{CompileError, Forest, Side, Wrapping};
    use crate::{NodeId, Token};

    fn n(idx: usize) -> NodeId {
        NodeId::new(idx)
    }

    fn tok(ty: Option<usize>, start: usize, end: usize, opens: &[usize], closes: &[usize]) -> Token {
        Token {
            ty: ty.map(n),
            start,
            end,
            opens: opens.iter().copied().map(n).collect(),
            closes: closes.iter().copied().map(n).collect(),
        }
    }

    #[test]
    fn leaves() {
        let mut forest = Forest::new();
        let full = forest.leaf(n(3), 2, 4);
        assert_eq!(forest.compile(full), Ok(vec![tok(Some(3), 2, 6, &[], &[])]));
        let none = forest.leaf(NodeId::none(), 0, 1);
        assert_eq!(forest.compile(none), Ok(vec![tok(None, 0, 1, &[], &[])]));
    }

    #[test]
    fn wrapped_delimiters() {
        let mut forest = Forest::new();
        let open = forest.leaf(NodeId::none(), 0, 1);
        let open = forest.wrap(open, n(1), Wrapping::Begin);
        let close = forest.leaf(NodeId::none(), 2, 1);
        let close = forest.wrap(close, n(1), Wrapping::End);
        assert_eq!(forest.compile(open), Ok(vec![tok(None, 0, 1, &[1], &[])]));
        assert_eq!(forest.compile(close), Ok(vec![tok(None, 2, 3, &[], &[1])]));
    }

    #[test]
    fn nested_branches() {
        // `outer` covers `a` and `inner`, which covers `b` and `c`
        let mut forest = Forest::new();
        let a = forest.leaf(n(3), 0, 1);
        let b = forest.leaf(NodeId::none(), 1, 1);
        let c = forest.leaf(n(4), 2, 2);
        let inner = forest.branch(n(2), 1, 3, vec![b, c]);
        let outer = forest.branch(n(1), 0, 4, vec![a, inner]);
        assert_eq!(
            forest.compile(outer),
            Ok(vec![
                tok(Some(3), 0, 1, &[1], &[]),
                tok(None, 1, 2, &[2], &[]),
                tok(Some(4), 2, 4, &[], &[2, 1]),
            ])
        );
    }

    #[test]
    fn none_branch_forwards() {
        let mut forest = Forest::new();
        let a = forest.leaf(n(5), 0, 1);
        let b = forest.leaf(n(6), 1, 1);
        let branch = forest.branch(NodeId::none(), 0, 2, vec![a, b]);
        let wrapped = forest.wrap(branch, NodeId::none(), Wrapping::Begin);
        assert_eq!(
            forest.compile(wrapped),
            Ok(vec![tok(Some(5), 0, 1, &[], &[]), tok(Some(6), 1, 2, &[], &[])])
        );
    }

    #[test]
    fn invalid_tree() {
        let mut forest = Forest::new();
        let leaf = forest.leaf(NodeId::none(), 4, 1);
        let branch = forest.branch(NodeId::none(), 4, 1, vec![leaf]);
        forest.push(branch, NodeId::none(), Side::End, Wrapping::End);
        assert_eq!(
            forest.compile(branch),
            Err(CompileError::InvalidTree {
                from: 5,
                wrapping: Wrapping::End
            })
        );
    }

    #[test]
    fn offset() {
        let mut forest = Forest::new();
        let a = forest.leaf(n(1), 0, 1);
        let b = forest.leaf(n(2), 1, 2);
        let branch = forest.branch(n(3), 0, 3, vec![a, b]);
        forest.offset(branch, 10);
        assert_eq!(forest.get(branch).from(), 10);
        assert_eq!(forest.get(a).from(), 10);
        assert_eq!(forest.get(b).from(), 11);
        assert_eq!(forest.get(b).end(), 13);
    }

    #[test]
    fn push_zero_width() {
        let mut forest = Forest::new();
        let delim = forest.leaf(NodeId::none(), 0, 2);
        let begin = forest.wrap(delim, n(1), Wrapping::Begin);
        forest.push(begin, n(2), Side::End, Wrapping::Begin);
        assert_eq!(
            forest.compile(begin),
            Ok(vec![tok(None, 0, 2, &[1], &[]), tok(None, 2, 2, &[2], &[])])
        );

        // Pushing onto a leaf keeps its text
        let leaf = forest.leaf(n(4), 5, 3);
        forest.push(leaf, n(2), Side::Start, Wrapping::End);
        assert_eq!(
            forest.compile(leaf),
            Ok(vec![tok(None, 5, 5, &[4], &[2]), tok(None, 5, 8, &[], &[4])])
        );
    }
}
