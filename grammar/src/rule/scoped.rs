use crate::{
    matched::{Forest, MatchedId, Side, Wrapping},
    state::{Frame, MatchState},
    NodeId, Repository,
};

use super::{MatchRule, RuleId};

/// A region enclosed by a pair of delimiters.  While the region is open, the text between the
/// delimiters is tokenized against the region's own `patterns` rather than its parent's.
#[derive(Debug, Clone)]
pub struct ScopedRule {
    /// The ID of this rule, recorded as the owner of the frames it pushes
    pub(crate) id: RuleId,
    pub(crate) node: NodeId,
    /// The node which covers the region's interior (excluding the delimiters)
    pub(crate) content_node: NodeId,
    pub(crate) begin: MatchRule,
    pub(crate) end: MatchRule,
    pub(crate) patterns: Vec<RuleId>,
}

impl ScopedRule {
    #[inline]
    pub fn begin(&self) -> &MatchRule {
        &self.begin
    }

    #[inline]
    pub fn end(&self) -> &MatchRule {
        &self.end
    }

    #[inline]
    pub fn content_node(&self) -> NodeId {
        self.content_node
    }

    /// Opens this region if the `begin` delimiter matches at `pos`, pushing a new frame onto
    /// `state`.
    pub(super) fn try_match<'r>(
        &'r self,
        repo: &'r Repository,
        text: &str,
        pos: usize,
        state: &mut MatchState<'r>,
        forest: &mut Forest,
    ) -> Option<MatchedId> {
        let delim = self.begin.try_match(repo, text, pos, state, forest)?;
        let wrapped = forest.wrap(delim, self.node, Wrapping::Begin);
        if !self.content_node.is_none() {
            forest.push(wrapped, self.content_node, Side::End, Wrapping::Begin);
        }
        state.push(Frame {
            node: self.node,
            rules: &self.patterns,
            owner: Some(self.id),
        });
        Some(wrapped)
    }

    /// Closes this region if the `end` delimiter matches at `pos`, popping this region's frame
    /// off `state`.  Must only be called when this region owns the innermost frame.
    pub fn close<'r>(
        &'r self,
        repo: &'r Repository,
        text: &str,
        pos: usize,
        state: &mut MatchState<'r>,
        forest: &mut Forest,
    ) -> Option<MatchedId> {
        let delim = self.end.try_match(repo, text, pos, state, forest)?;
        Some(self.finish_close(delim, state, forest))
    }

    /// Closes this region with a zero-width delimiter at `pos`, whether or not the `end` pattern
    /// matches there.  Used for regions which are still open when their text runs out.
    pub fn force_close(&self, pos: usize, state: &mut MatchState, forest: &mut Forest) -> MatchedId {
        let delim = forest.leaf(NodeId::none(), pos, 0);
        self.finish_close(delim, state, forest)
    }

    fn finish_close(&self, delim: MatchedId, state: &mut MatchState, forest: &mut Forest) -> MatchedId {
        let wrapped = forest.wrap(delim, self.node, Wrapping::End);
        if !self.content_node.is_none() {
            forest.push(wrapped, self.content_node, Side::Start, Wrapping::End);
        }
        let frame = state.pop();
        debug_assert_eq!(frame.and_then(|f| f.owner), Some(self.id));
        wrapped
    }
}
