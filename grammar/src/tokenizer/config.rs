use serde::Deserialize;

/// What happens to scoped regions which are still open when the input runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnterminatedPolicy {
    /// Close every open region (innermost first) with a zero-width token at the end of the
    /// input, so that every `opens` entry has a matching `closes` entry.
    ForceClose,
    /// Emit nothing for the open regions; they are reported by
    /// [`Tokenizer::open_scopes`](super::Tokenizer::open_scopes) and
    /// [`Tokens::unclosed`](super::Tokens::unclosed) instead.
    LeaveOpen,
}

impl Default for UnterminatedPolicy {
    fn default() -> Self {
        UnterminatedPolicy::ForceClose
    }
}

/// Run-time options for a tokenization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TokenizerConfig {
    pub unterminated: UnterminatedPolicy,
    /// Merge runs of adjacent unmatched characters into a single token
    pub merge_unmatched: bool,
    /// The maximum number of top-level scan steps before the run is aborted.  Grammars with
    /// unterminated regions can degrade to one step per character, so callers tokenizing
    /// untrusted input should set this.
    pub step_limit: Option<usize>,
}
