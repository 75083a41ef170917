//! The three kinds of rule which can be applied to text: [`MatchRule`], [`ScopedRule`] and
//! [`SwitchRule`].  All of them share the contract of [`Rule::try_match`].

mod match_rule;
mod scoped;

pub use match_rule::MatchRule;
pub use scoped::ScopedRule;

use crate::{
    matched::{Forest, MatchedId, Wrapping},
    state::MatchState,
    NodeId, Repository,
};

/// A live, fully resolved rule of a [`Repository`]
#[derive(Debug, Clone)]
pub enum Rule {
    Match(MatchRule),
    Scoped(ScopedRule),
    Switch(SwitchRule),
}

impl Rule {
    /// The [`NodeId`] which this rule emits (possibly [`NodeId::none`])
    pub fn node(&self) -> NodeId {
        match self {
            Rule::Match(r) => r.node,
            Rule::Scoped(r) => r.node,
            Rule::Switch(r) => r.node,
        }
    }

    /// The nested rules of this rule, in order of precedence
    pub fn patterns(&self) -> &[RuleId] {
        match self {
            Rule::Match(_) => &[],
            Rule::Scoped(r) => &r.patterns,
            Rule::Switch(r) => &r.patterns,
        }
    }

    /// Attempt to apply this rule at exactly `pos`, returning the root of the [`Matched`] tree on
    /// success.  Applying a [`ScopedRule`] pushes a new frame onto `state`.
    ///
    /// [`Matched`]: crate::matched::Matched
    pub fn try_match<'r>(
        &'r self,
        repo: &'r Repository,
        text: &str,
        pos: usize,
        state: &mut MatchState<'r>,
        forest: &mut Forest,
    ) -> Option<MatchedId> {
        match self {
            Rule::Match(r) => r.try_match(repo, text, pos, state, forest),
            Rule::Scoped(r) => r.try_match(repo, text, pos, state, forest),
            Rule::Switch(r) => r.try_match(repo, text, pos, state, forest),
        }
    }
}

/// How a capture group of a [`MatchRule`] is turned into output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capture {
    /// Label the captured text with a [`NodeId`]
    Node(NodeId),
    /// Re-tokenize the captured text against the patterns of a [`SwitchRule`]
    Switch(RuleId),
}

/// A named bundle of patterns with no delimiters of its own.  Used as the target of `include`s
/// and as the sub-grammar of capture groups.
#[derive(Debug, Clone)]
pub struct SwitchRule {
    pub(crate) node: NodeId,
    pub(crate) patterns: Vec<RuleId>,
}

impl SwitchRule {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            patterns: Vec::new(),
        }
    }

    /// Tries each nested pattern in turn; the first to match wins.  The result is wrapped in this
    /// rule's node unless that is [`NodeId::none`] or the match opened a region (a node can't
    /// cover a region which is still open when it ends).
    fn try_match<'r>(
        &'r self,
        repo: &'r Repository,
        text: &str,
        pos: usize,
        state: &mut MatchState<'r>,
        forest: &mut Forest,
    ) -> Option<MatchedId> {
        let depth_before = state.depth();
        let inner = first_match(repo, &self.patterns, text, pos, state, forest)?;
        Some(if self.node.is_none() || state.depth() != depth_before {
            inner
        } else {
            forest.wrap(inner, self.node, Wrapping::Full)
        })
    }
}

/// Try every rule of `rules` at `pos` in order, returning the first match.
///
/// A zero-width match can't make progress on its own, so it is only accepted if it opened a new
/// scope which hasn't already been opened at this position.  Otherwise the scan loop could
/// re-apply the same empty match forever.
pub(crate) fn first_match<'r>(
    repo: &'r Repository,
    rules: &'r [RuleId],
    text: &str,
    pos: usize,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> Option<MatchedId> {
    for &rule_id in rules {
        let depth_before = state.depth();
        let id = match repo.rule(rule_id).try_match(repo, text, pos, state, forest) {
            Some(id) => id,
            None => continue,
        };
        if !forest.get(id).is_empty() {
            return Some(id);
        }
        if state.depth() > depth_before {
            if state.note_zero_width_begin(pos, rule_id) {
                return Some(id);
            }
            state.pop();
        }
        log::trace!(
            "Rejecting zero-width match of '{}' at {}",
            repo.rule_ident(rule_id),
            pos
        );
    }
    None
}

index_vec::define_index_type! { pub struct RuleId = usize; }
