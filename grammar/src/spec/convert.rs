use std::fmt::{Display, Formatter};

use index_vec::IndexSlice;
use itertools::Itertools;

use super::SpecGrammar;
use crate::{node::Declarator, repository::ROOT_IDENT, Repository, Rule, RuleId};

pub type ConvertResult<T> = Result<T, ConvertError>;

/// Convert a [`SpecGrammar`] (likely parsed from a JSON or TOML file) into a [`Repository`], or
/// fail with a [`ConvertError`].
///
/// The root pattern list is registered first, followed by every entry of the grammar's
/// repository section (in name order) so that broken rules are reported even if nothing includes
/// them.  Node indices are therefore deterministic for a given grammar.
pub(crate) fn convert(grammar: SpecGrammar, declarator: Box<Declarator>) -> ConvertResult<Repository> {
    let SpecGrammar {
        name,
        scope_name,
        patterns,
        repository,
    } = grammar;

    let rule_names = repository
        .as_ref()
        .map(|defs| defs.keys().cloned().collect_vec())
        .unwrap_or_default();
    let mut repo = Repository::empty(name, scope_name, repository, declarator);
    // The root never wraps its matches, so that regions opened through `$self` nest properly
    let root_def = super::Rule {
        patterns: Some(patterns),
        ..super::Rule::default()
    };
    repo.add(&root_def, ROOT_IDENT)?;
    for name in &rule_names {
        repo.get(name)?;
    }

    check_switch_cycles(repo.rules())?;
    log::debug!(
        "Built repository {:?} with {} nodes and {} rules",
        repo.name().unwrap_or("<unnamed>"),
        repo.num_nodes(),
        repo.num_rules()
    );
    Ok(repo)
}

/// The possible ways that building a [`Repository`] can fail.  All of these indicate a malformed
/// grammar.
#[derive(Debug)]
pub enum ConvertError {
    /// No rule is registered or defined with this identifier
    NotFound(String),
    /// A rule was `include`d by name, but the grammar has no repository section
    InvalidGrammar { reference: String },
    /// A capture group was mapped to something which isn't a node or a pattern list
    InvalidCapture { ident: String },
    /// A capture key which isn't a group index
    InvalidCaptureIndex { ident: String, index: String },
    UnknownFlag { ident: String, flag: char },
    Regex {
        ident: String,
        regex: String,
        inner: regex_automata::meta::BuildError,
    },
    /// A sequence of pattern lists which include each other without ever consuming text
    IncludeCycle(Vec<String>),
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::NotFound(ident) => write!(f, "No rule called '{}'", ident),
            ConvertError::InvalidGrammar { reference } => write!(
                f,
                "Can't include '{}': the grammar has no repository",
                reference
            ),
            ConvertError::InvalidCapture { ident } => write!(
                f,
                "Capture '{}' must be a name or a list of patterns",
                ident
            ),
            ConvertError::InvalidCaptureIndex { ident, index } => {
                write!(f, "'{}' has non-numeric capture '{}'", ident, index)
            }
            ConvertError::UnknownFlag { ident, flag } => {
                write!(f, "'{}' has unknown pattern flag '{}'", ident, flag)
            }
            ConvertError::Regex {
                ident,
                regex,
                inner,
            } => write!(f, "'{}' has invalid pattern {:?}: {}", ident, regex, inner),
            ConvertError::IncludeCycle(cycle) => {
                write!(f, "Patterns include themselves: {}", cycle.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ConvertError {}

///////////////////
// SWITCH CYCLES //
///////////////////

/// A [`SwitchRule`](crate::SwitchRule) tries its patterns without consuming anything, so a
/// switch rule which (indirectly) contains itself would recurse forever.  Check that the graph
/// of switch rules is acyclic.
fn check_switch_cycles(rules: &IndexSlice<RuleId, [(String, Rule)]>) -> ConvertResult<()> {
    let mut is_checked = rules.iter().map(|_| false).collect_vec();
    let mut rule_stack = Vec::<RuleId>::new(); // Switch rules being expanded further up the call
                                               // stack
    for (id, _) in rules.iter_enumerated() {
        find_switch_cycles(id, rules, &mut rule_stack, &mut is_checked)?;
        assert!(rule_stack.is_empty());
    }
    Ok(())
}

fn find_switch_cycles(
    id: RuleId,
    rules: &IndexSlice<RuleId, [(String, Rule)]>,
    rule_stack: &mut Vec<RuleId>,
    is_checked: &mut [bool],
) -> ConvertResult<()> {
    let patterns = match &rules[id].1 {
        Rule::Switch(switch) => &switch.patterns,
        _ => return Ok(()),
    };
    // Check for cycles
    if let Some(idx) = rule_stack.iter().position(|&i| i == id) {
        // `rule_stack[idx..] + id` forms the cycle (i.e. a cycle which starts and ends with `id`)
        let cycle = rule_stack[idx..]
            .iter()
            .chain(std::iter::once(&id))
            .map(|&id| rules[id].0.to_owned())
            .collect_vec();
        return Err(ConvertError::IncludeCycle(cycle));
    }
    if is_checked[id.index()] {
        return Ok(());
    }
    rule_stack.push(id);
    for &child_id in patterns {
        find_switch_cycles(child_id, rules, rule_stack, is_checked)?;
    }
    assert_eq!(rule_stack.pop(), Some(id));
    is_checked[id.index()] = true;
    Ok(())
}
