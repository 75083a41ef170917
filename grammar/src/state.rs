use crate::{NodeId, RuleId};

/// The stack of active scopes of one tokenization run.  A new `MatchState` is created for each
/// run and is never shared between runs.
///
/// **Invariant**: the stack is never empty; the bottom frame is the root frame, which has no
/// owner and is never popped.
#[derive(Debug, Clone)]
pub struct MatchState<'r> {
    stack: Vec<Frame<'r>>,
    /// Scoped rules which have opened a zero-width region at the current position, at any depth.
    /// Each rule may do so at most once per position, so empty delimiters can't re-open (or
    /// recursively nest) the same region forever.
    zero_width_begins: Vec<(usize, RuleId)>,
}

/// A single active scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'r> {
    pub node: NodeId,
    /// The rules which may match inside this scope, in order of precedence
    pub rules: &'r [RuleId],
    /// The scoped rule which opened this frame (and whose `end` pattern can close it)
    pub owner: Option<RuleId>,
}

impl<'r> MatchState<'r> {
    pub fn new(root: Frame<'r>) -> Self {
        Self {
            stack: vec![root],
            zero_width_begins: Vec::new(),
        }
    }

    /// The innermost active frame
    pub fn top(&self) -> &Frame<'r> {
        // Can't fail, because the root frame is never popped
        &self.stack[self.stack.len() - 1]
    }

    pub fn push(&mut self, frame: Frame<'r>) {
        self.stack.push(frame);
    }

    /// Pops the innermost frame, returning `None` (and leaving the stack untouched) if only the
    /// root frame is left.
    pub fn pop(&mut self) -> Option<Frame<'r>> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    /// The number of frames, including the root frame
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frames(&self) -> &[Frame<'r>] {
        &self.stack
    }

    /// The nodes of the scoped regions which are still open, outermost first
    pub fn open_scopes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.stack
            .iter()
            .filter(|frame| frame.owner.is_some())
            .map(|frame| frame.node)
    }

    /// Records that `rule` opened a zero-width region at `pos`.  Returns `false` if `rule` has
    /// already opened a zero-width region at `pos` (whether or not that region is still open),
    /// in which case the caller must reject the match.
    pub(crate) fn note_zero_width_begin(&mut self, pos: usize, rule: RuleId) -> bool {
        // Entries from earlier positions can never be hit again
        self.zero_width_begins.retain(|&(p, _)| p == pos);
        if self.zero_width_begins.contains(&(pos, rule)) {
            return false;
        }
        self.zero_width_begins.push((pos, rule));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, MatchState};
    use crate::{NodeId, RuleId};

    #[test]
    fn root_is_never_popped() {
        let rules = [RuleId::new(0)];
        let mut state = MatchState::new(Frame {
            node: NodeId::none(),
            rules: &rules,
            owner: None,
        });
        let inner = Frame {
            node: NodeId::new(4),
            rules: &[],
            owner: Some(RuleId::new(2)),
        };
        state.push(inner);
        assert_eq!(state.depth(), 2);
        assert_eq!(state.open_scopes().collect::<Vec<_>>(), vec![NodeId::new(4)]);
        assert_eq!(state.pop(), Some(inner));
        assert_eq!(state.pop(), None);
        assert_eq!(state.depth(), 1);
        assert_eq!(state.top().rules, &rules);
    }

    #[test]
    fn zero_width_guard() {
        let mut state = MatchState::new(Frame {
            node: NodeId::none(),
            rules: &[],
            owner: None,
        });
        let rule = RuleId::new(1);
        assert!(state.note_zero_width_begin(3, rule));
        assert!(!state.note_zero_width_begin(3, rule));
        // Opening a deeper region doesn't make the same begin acceptable again
        state.push(Frame {
            node: NodeId::new(2),
            rules: &[],
            owner: Some(rule),
        });
        assert!(!state.note_zero_width_begin(3, rule));
        assert!(state.note_zero_width_begin(3, RuleId::new(2)));
        assert!(state.note_zero_width_begin(4, rule));
        assert!(state.note_zero_width_begin(3, rule));
    }
}
