//! The top-level scan loop, which drives the rules of a [`Repository`] over a piece of text.

mod config;
mod str_iter;

use std::{
    collections::VecDeque,
    fmt::{Display, Formatter},
};

use crate::{
    matched::{CompileError, Forest, MatchedId},
    rule::{self, Rule},
    state::MatchState,
    NodeId, Repository, Token,
};

pub use self::config::{TokenizerConfig, UnterminatedPolicy};
use self::str_iter::StrIter;

/// An [`Iterator`] over the [`Token`]s of a [`str`]ing slice, according to the rules of a
/// [`Repository`].
///
/// The spans of the yielded [`Token`]s are contiguous and cover the entire input.  Each call to
/// `next` applies at most one rule at the top level, so the tokenizer can be stopped at any point.
#[derive(Debug)]
pub struct Tokenizer<'r, 's> {
    repo: &'r Repository,
    /// **Invariant**: Between calls to `next`, `iter` stops exactly after the last matched text
    iter: StrIter<'s>,
    state: MatchState<'r>,
    /// Holds the trees of a single top-level step, and is cleared after every step
    forest: Forest,
    config: TokenizerConfig,
    /// Compiled tokens which haven't been yielded yet
    pending: VecDeque<Token>,
    steps: usize,
    is_finished: bool,
}

/// The result of tokenizing a whole [`str`]ing with [`Repository::tokenize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    pub tokens: Vec<Token>,
    /// The nodes of the scoped regions which were still open at the end of the input (outermost
    /// first).  Always empty under [`UnterminatedPolicy::ForceClose`].
    pub unclosed: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The grammar produced a tree which can't be turned into tokens
    Compile(CompileError),
    /// [`TokenizerConfig::step_limit`] was exceeded before the input ran out
    StepLimit { limit: usize, pos: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Compile(inner) => write!(f, "Invalid grammar: {}", inner),
            Error::StepLimit { limit, pos } => write!(
                f,
                "Gave up tokenizing at byte {} after {} steps",
                pos, limit
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Compile(e)
    }
}

impl<'r, 's> Tokenizer<'r, 's> {
    /// Creates a new [`Tokenizer`] which tokenizes `text` according to `repo`.
    pub fn new(repo: &'r Repository, text: &'s str, config: TokenizerConfig) -> Self {
        Self {
            repo,
            iter: StrIter::new(text),
            state: MatchState::new(repo.root_frame()),
            forest: Forest::new(),
            config,
            pending: VecDeque::new(),
            steps: 0,
            is_finished: false,
        }
    }

    /// The number of bytes which have been consumed so far
    pub fn position(&self) -> usize {
        self.iter.consumed_length()
    }

    /// The nodes of the scoped regions which are currently open, outermost first
    pub fn open_scopes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.state.open_scopes()
    }

    /// Applies one rule (or consumes one unmatched character), queueing the resulting tokens
    fn step(&mut self) -> Result<(), Error> {
        let pos = self.iter.consumed_length();
        if self.iter.is_done() {
            self.is_finished = true;
            return self.finish(pos);
        }

        self.steps += 1;
        if let Some(limit) = self.config.step_limit {
            if self.steps > limit {
                self.is_finished = true;
                return Err(Error::StepLimit { limit, pos });
            }
        }

        let id = step(
            self.repo,
            self.iter.source_str(),
            pos,
            &mut self.state,
            &mut self.forest,
        );
        let consumed = self.iter.eat_len(self.forest.get(id).len());
        debug_assert!(consumed.is_some());
        self.emit(id)
    }

    /// Deals with the regions which are still open at the end of the input
    fn finish(&mut self, end: usize) -> Result<(), Error> {
        match self.config.unterminated {
            UnterminatedPolicy::ForceClose => {
                while let Some(id) =
                    force_close_innermost(self.repo, end, &mut self.state, &mut self.forest)
                {
                    self.emit(id)?;
                }
            }
            UnterminatedPolicy::LeaveOpen => {
                if self.state.depth() > 1 {
                    log::debug!(
                        "{} region(s) left open at end of input",
                        self.state.depth() - 1
                    );
                }
            }
        }
        Ok(())
    }

    fn emit(&mut self, id: MatchedId) -> Result<(), Error> {
        let tokens = self.forest.compile(id);
        self.forest.clear();
        self.pending.extend(tokens?);
        Ok(())
    }
}

impl<'r, 's> Iterator for Tokenizer<'r, 's> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.is_finished {
                return None;
            }
            if let Err(e) = self.step() {
                return Some(Err(e));
            }
        }
    }
}

impl Repository {
    /// Tokenize `text` with the default [`TokenizerConfig`]
    pub fn tokenize(&self, text: &str) -> Result<Tokens, Error> {
        self.tokenize_with(text, &TokenizerConfig::default())
    }

    /// Tokenize the whole of `text`, collecting the tokens
    pub fn tokenize_with(&self, text: &str, config: &TokenizerConfig) -> Result<Tokens, Error> {
        let mut tokenizer = Tokenizer::new(self, text, config.clone());
        let mut tokens = Vec::<Token>::new();
        for token in &mut tokenizer {
            let token = token?;
            if config.merge_unmatched && token.is_plain() {
                if let Some(last) = tokens.last_mut() {
                    if last.is_plain() && last.end == token.start {
                        last.end = token.end;
                        continue;
                    }
                }
            }
            tokens.push(token);
        }
        Ok(Tokens {
            tokens,
            unclosed: tokenizer.open_scopes().collect(),
        })
    }

    /// Creates a lazy [`Tokenizer`] over `text`
    pub fn tokenizer<'r, 's>(&'r self, text: &'s str, config: TokenizerConfig) -> Tokenizer<'r, 's> {
        Tokenizer::new(self, text, config)
    }
}

//////////////////////
// SCANNING HELPERS //
//////////////////////

/// Applies a single rule at `pos`.  The innermost region's `end` delimiter takes precedence over
/// the region's nested rules, which are then tried in order.
pub(crate) fn try_match<'r>(
    repo: &'r Repository,
    text: &str,
    pos: usize,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> Option<MatchedId> {
    let top = *state.top();
    if let Some(Rule::Scoped(scoped)) = top.owner.map(|owner| repo.rule(owner)) {
        if let Some(id) = scoped.close(repo, text, pos, state, forest) {
            return Some(id);
        }
    }
    rule::first_match(repo, top.rules, text, pos, state, forest)
}

/// Same as [`try_match`], but falls back on consuming exactly one character as an unmatched
/// (`None`) leaf.  Always consumes at least one byte unless `pos` is at the end of `text` or a
/// region was opened or closed.
pub(crate) fn step<'r>(
    repo: &'r Repository,
    text: &str,
    pos: usize,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> MatchedId {
    match try_match(repo, text, pos, state, forest) {
        Some(id) => id,
        None => {
            let char_len = text[pos..].chars().next().map_or(0, char::len_utf8);
            forest.leaf(NodeId::none(), pos, char_len)
        }
    }
}

/// Scans the whole of `text`, returning the roots of the matched trees in document order.  Any
/// regions opened during the scan are force-closed at the end of `text`, leaving `state` as it
/// was found.
pub(crate) fn scan<'r>(
    repo: &'r Repository,
    text: &str,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> Vec<MatchedId> {
    let base_depth = state.depth();
    let mut iter = StrIter::new(text);
    let mut matches = Vec::new();
    while !iter.is_done() {
        let id = step(repo, text, iter.consumed_length(), state, forest);
        let consumed = iter.eat_len(forest.get(id).len());
        debug_assert!(consumed.is_some());
        matches.push(id);
    }
    while state.depth() > base_depth {
        match force_close_innermost(repo, text.len(), state, forest) {
            Some(id) => matches.push(id),
            None => break,
        }
    }
    matches
}

/// Closes the innermost frame if it belongs to a scoped region.  Returns `None` (leaving `state`
/// untouched) if the innermost frame has no owner.
fn force_close_innermost<'r>(
    repo: &'r Repository,
    pos: usize,
    state: &mut MatchState<'r>,
    forest: &mut Forest,
) -> Option<MatchedId> {
    let owner = state.top().owner?;
    match repo.rule(owner) {
        Rule::Scoped(scoped) => {
            log::warn!(
                "Region '{}' is unterminated; closing it at {}",
                repo.rule_ident(owner),
                pos
            );
            Some(scoped.force_close(pos, state, forest))
        }
        _ => None,
    }
}
