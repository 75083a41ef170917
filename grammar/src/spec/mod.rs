//! Specification for the file format which specifies language grammars.  This can be roughly
//! thought of as an 'AST' for the grammar files.
//!
//! When loading a language's grammar, Bramble will perform the following sequence of actions:
//! 1. Load the `*.json` or `*.toml` file containing that language's grammar
//! 2. Read that file into a [`SpecGrammar`]
//! 3. Compile that [`SpecGrammar`] into a [`Repository`], which can tokenize text directly
//!
//! All these stages can generate errors, which are all bubbled up to the caller

pub(crate) mod convert;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{node::Declarator, Repository};

use self::convert::ConvertResult;

pub(crate) type RuleName = String;

/// A simplified version of [`Repository`] which can be [`Deserialize`]d from any JSON-like data
/// structure (usually JSON or TOML).  The only exported methods are
/// [`into_repository`](SpecGrammar::into_repository) and
/// [`into_repository_with`](SpecGrammar::into_repository_with), which check the source data and
/// build a [`Repository`] recognising the same language as the source `SpecGrammar`.
///
/// Unknown fields are ignored, so that grammars written for other engines (which carry fields
/// like `comment` or `fileTypes`) can be loaded unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecGrammar {
    /// Human-readable name of the language
    pub name: Option<String>,
    /// The name given to the root node (e.g. `source.json`)
    pub scope_name: Option<String>,
    /// The top-level pattern list, tried at every position outside any scoped region
    #[serde(default = "Vec::new")]
    pub patterns: Vec<Rule>,
    /// Named rules which can be `include`d with `#name`.  `None` means that the grammar has no
    /// repository section at all (as opposed to an empty one).
    pub repository: Option<BTreeMap<RuleName, Rule>>,
}

impl SpecGrammar {
    /// Build a [`Repository`] using the [`default_declarator`](crate::default_declarator).
    #[inline]
    pub fn into_repository(self) -> ConvertResult<Repository> {
        convert::convert(self, Box::new(crate::default_declarator))
    }

    /// Build a [`Repository`], attaching metadata to every node with a custom [`Declarator`].
    #[inline]
    pub fn into_repository_with(self, declarator: Box<Declarator>) -> ConvertResult<Repository> {
        convert::convert(self, declarator)
    }
}

/// A single rule definition.  The kind of rule is determined by which fields are present (see
/// [`Rule::kind`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Explicit identifier.  If absent, the identifier is derived from where the rule appears.
    pub id: Option<String>,
    /// The display/scope name passed to the default declarator
    pub name: Option<String>,
    /// Name given to the interior of a `begin`/`end` region (excluding its delimiters)
    pub content_name: Option<String>,

    /// Reference to another rule: `#name`, `$self` or `$base`
    pub include: Option<String>,

    #[serde(rename = "match")]
    pub match_: Option<String>,
    /// Pattern options, as a string of single-character flags (e.g. `"im"`)
    #[serde(default = "String::new")]
    pub flags: String,
    /// Maps capture group indices (as strings, like `"1"`) to nested definitions
    #[serde(default = "BTreeMap::new")]
    pub captures: BTreeMap<String, Rule>,

    pub begin: Option<String>,
    #[serde(default = "BTreeMap::new")]
    pub begin_captures: BTreeMap<String, Rule>,
    pub end: Option<String>,
    #[serde(default = "BTreeMap::new")]
    pub end_captures: BTreeMap<String, Rule>,

    pub patterns: Option<Vec<Rule>>,

    /// Space-separated identifiers of the nodes which close this one
    pub closed_by: Option<String>,
    /// Space-separated identifiers of the nodes which open this one
    pub opened_by: Option<String>,
    /// If `true`, the `begin`/`end` delimiters of this rule are registered as a bracket pair
    #[serde(default)]
    pub brackets: bool,
}

/// The different things a [`Rule`] definition can turn into, determined by its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// A definition which is nothing but a reference to another rule
    Include,
    Scoped,
    Match,
    Switch,
    /// A definition which only names something (e.g. a capture group)
    Node,
}

impl Rule {
    /// Classify this definition by which fields are present
    pub fn kind(&self) -> RuleKind {
        if self.begin.is_some() {
            RuleKind::Scoped
        } else if self.match_.is_some() {
            RuleKind::Match
        } else if self.patterns.is_some() {
            RuleKind::Switch
        } else if self.include.is_some() {
            RuleKind::Include
        } else {
            RuleKind::Node
        }
    }

    /// `true` if this definition should be observable in the output, i.e. it has been given an
    /// explicit identifier, a name or pairing hints.
    pub(crate) fn is_observable(&self) -> bool {
        self.id.is_some()
            || self.name.is_some()
            || self.closed_by.is_some()
            || self.opened_by.is_some()
    }
}
