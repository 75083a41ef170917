//! Crate for tokenizing text according to language-independent, pattern-based grammars.
//!
//! This includes:
//! - A deserializeable schema for grammar files (the [`spec`] module)
//! - The [`Repository`], which resolves every rule definition of a grammar exactly once, and
//!   can then be shared between any number of tokenization runs
//! - The three kinds of live [`Rule`] (in the [`rule`] module)
//! - The scan loop (in the [`tokenizer`] module), which applies the rules to a piece of text and
//!   flattens the resulting trees (see the [`matched`] module) into a stream of [`Token`]s
//!
//! The spans of the [`Token`]s always cover the input exactly, even if the grammar doesn't
//! recognise any of it.  Each [`Token`] can open and close scopes (e.g. a string or a bracketed
//! group), so the token stream can be folded back into a tree.

pub mod matched;
mod matcher;
mod node;
mod repository;
pub mod rule;
pub mod spec;
mod state;
mod token;
pub mod tokenizer;

pub use matcher::{MatchResult, Matcher, MatcherError};
pub use node::{default_declarator, Declarator, Node, NodeId, NodeMetadata, Pairing};
pub use repository::{Entry, Repository};
pub use rule::{Capture, MatchRule, Rule, RuleId, ScopedRule, SwitchRule};
pub use spec::{
    convert::{ConvertError, ConvertResult},
    SpecGrammar,
};
pub use state::{Frame, MatchState};
pub use token::Token;
pub use tokenizer::{Tokenizer, TokenizerConfig, Tokens, UnterminatedPolicy};
