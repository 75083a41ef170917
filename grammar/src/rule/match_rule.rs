use std::{cmp::Reverse, iter::Peekable, ops::Range};

use crate::{
    matched::{Forest, MatchedId},
    matcher::Matcher,
    state::{Frame, MatchState},
    tokenizer, NodeId, Repository,
};

use super::{Capture, Rule, SwitchRule};

/// A rule consisting of a single pattern, whose capture groups can optionally be labelled with
/// their own nodes or re-tokenized against a sub-grammar.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub(crate) node: NodeId,
    pub(crate) matcher: Matcher,
    /// Maps capture group indices to what should be done with the captured text.  Sorted by
    /// group index.
    pub(crate) captures: Vec<(usize, Capture)>,
}

/// The captures which participated in a match, as `(span, capture)` pairs in document order
type CaptureSpans<'c> = Peekable<std::vec::IntoIter<(Range<usize>, &'c Capture)>>;

impl MatchRule {
    pub(crate) fn new(node: NodeId, matcher: Matcher) -> Self {
        Self {
            node,
            matcher,
            captures: Vec::new(),
        }
    }

    #[inline]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[inline]
    pub fn captures(&self) -> &[(usize, Capture)] {
        &self.captures
    }

    pub(super) fn try_match<'r>(
        &'r self,
        repo: &'r Repository,
        text: &str,
        pos: usize,
        state: &mut MatchState<'r>,
        forest: &mut Forest,
    ) -> Option<MatchedId> {
        let result = self.matcher.match_at(text, pos)?;
        let id = forest.leaf(self.node, pos, result.len());
        if self.captures.is_empty() {
            return Some(id);
        }

        // Use the offsets reported by the regex engine rather than assuming that the groups are
        // contiguous.  Outer groups come before the groups nested inside them.
        let mut spans = self
            .captures
            .iter()
            .filter_map(|(group_idx, capture)| {
                let span = result.groups.get(*group_idx)?.clone()?;
                (!span.is_empty()).then(|| (span, capture))
            })
            .collect::<Vec<_>>();
        spans.sort_by_key(|(span, _)| (span.start, Reverse(span.end)));
        let mut spans = spans.into_iter().peekable();

        let children = capture_children(repo, text, result.range, &mut spans, state, forest);
        if !children.is_empty() {
            forest.set_children(id, children);
        }
        Some(id)
    }
}

/// Builds the children covering `range` from the capture spans which start inside it.  Any
/// text between the captures is covered by `None` leaves, so the children always cover exactly
/// `range` (unless no captures fall inside it, in which case no children are returned).
///
/// Captures which partially overlap an earlier capture are ignored.
fn capture_children<'r>(
    repo: &'r Repository,
    text: &str,
    range: Range<usize>,
    spans: &mut CaptureSpans<'r>,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> Vec<MatchedId> {
    let mut children = Vec::new();
    let mut cursor = range.start;
    while let Some((span, capture)) = spans.next_if(|(span, _)| span.start < range.end) {
        if span.start < cursor || span.end > range.end {
            continue;
        }
        if cursor < span.start {
            children.push(forest.leaf(NodeId::none(), cursor, span.start - cursor));
        }
        let child = match *capture {
            Capture::Node(node) => {
                let nested = capture_children(repo, text, span.clone(), spans, state, forest);
                if nested.is_empty() {
                    forest.leaf(node, span.start, span.len())
                } else {
                    forest.branch(node, span.start, span.len(), nested)
                }
            }
            Capture::Switch(rule_id) => {
                // The sub-grammar takes over the whole capture, including any nested groups
                while spans.next_if(|(s, _)| s.start < span.end).is_some() {}
                match repo.rule(rule_id) {
                    Rule::Switch(switch) => {
                        scan_capture(repo, text, span.clone(), switch, state, forest)
                    }
                    // Captures are only ever resolved to switch rules
                    _ => forest.leaf(NodeId::none(), span.start, span.len()),
                }
            }
        };
        children.push(child);
        cursor = span.end;
    }
    if !children.is_empty() && cursor < range.end {
        children.push(forest.leaf(NodeId::none(), cursor, range.end - cursor));
    }
    children
}

/// Re-tokenizes the captured text against the patterns of `switch`.  Every character of the
/// capture is covered by the result, however many nested rules matched.
fn scan_capture<'r>(
    repo: &'r Repository,
    text: &str,
    span: Range<usize>,
    switch: &'r SwitchRule,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> MatchedId {
    state.push(Frame {
        node: switch.node,
        rules: &switch.patterns,
        owner: None,
    });
    let children = tokenizer::scan(repo, &text[span.clone()], state, forest);
    state.pop();

    for &child in &children {
        forest.offset(child, span.start);
    }
    forest.branch(switch.node, span.start, span.len(), children)
}
