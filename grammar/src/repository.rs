use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Debug, Formatter},
};

use bimap::BiMap;
use index_vec::{IndexSlice, IndexVec};
use itertools::Itertools;

use crate::{
    matcher::{Matcher, MatcherError},
    node::{Declarator, Node, NodeId, Pairing},
    rule::{Capture, MatchRule, Rule, RuleId, ScopedRule, SwitchRule},
    spec::{self, convert::ConvertError, convert::ConvertResult, RuleKind},
    state::Frame,
};

/// The identifier of the rule holding the grammar's top-level patterns
pub(crate) const ROOT_IDENT: &str = "$self";

/// The authority which turns rule definitions into live [`Node`]s and [`Rule`]s, exactly once
/// per identifier.
///
/// A `Repository` is only mutated while its grammar is being loaded (see
/// [`SpecGrammar::into_repository`](crate::SpecGrammar::into_repository)).  After that, every
/// tokenization run only needs a `&Repository`, so one `Repository` can be shared (e.g. in an
/// [`Arc`](std::sync::Arc)) between any number of concurrent runs.
pub struct Repository {
    name: Option<String>,
    scope_name: Option<String>,

    /// Index `0` holds the `None` sentinel
    nodes: IndexVec<NodeId, Node>,
    node_idents: BiMap<String, NodeId>,
    /// Every rule, paired with its identifier
    rules: IndexVec<RuleId, (String, Rule)>,
    /// Maps identifiers to whatever has been registered under them
    entries: HashMap<String, Entry>,

    /// The named rule definitions which can be `include`d.  `None` if the grammar has no
    /// repository section.
    definitions: Option<BTreeMap<spec::RuleName, spec::Rule>>,
    declarator: Box<Declarator>,
}

/// Something registered in a [`Repository`] under an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    /// A bare node, which can label captures but can't be matched on its own
    Node(NodeId),
    Rule(RuleId),
}

impl Repository {
    pub(crate) fn empty(
        name: Option<String>,
        scope_name: Option<String>,
        definitions: Option<BTreeMap<spec::RuleName, spec::Rule>>,
        declarator: Box<Declarator>,
    ) -> Self {
        let mut nodes = IndexVec::<NodeId, Node>::new();
        let none = nodes.push(Node::none());
        debug_assert!(none.is_none());
        Self {
            name,
            scope_name,
            nodes,
            node_idents: BiMap::new(),
            rules: IndexVec::new(),
            entries: HashMap::new(),
            definitions,
            declarator,
        }
    }

    /// The human-readable name of the grammar
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The scope name of the whole grammar (e.g. `source.json`)
    pub fn scope_name(&self) -> Option<&str> {
        self.scope_name.as_deref()
    }

    ///////////
    // NODES //
    ///////////

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &IndexSlice<NodeId, [Node]> {
        &self.nodes
    }

    /// The number of nodes, **including** the `None` sentinel
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Look up the [`NodeId`] registered under `ident`
    pub fn node_id(&self, ident: &str) -> Option<NodeId> {
        self.node_idents.get_by_left(ident).copied()
    }

    ///////////
    // RULES //
    ///////////

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id].1
    }

    pub fn rule_ident(&self, id: RuleId) -> &str {
        &self.rules[id].0
    }

    pub fn rules(&self) -> &IndexSlice<RuleId, [(String, Rule)]> {
        &self.rules
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// The rule holding the grammar's top-level patterns
    pub fn root(&self) -> RuleId {
        match self.entries.get(ROOT_IDENT) {
            Some(Entry::Rule(id)) => *id,
            // The root is always the first rule to be registered
            _ => RuleId::new(0),
        }
    }

    /// The frame at the bottom of every [`MatchState`](crate::state::MatchState)
    pub fn root_frame(&self) -> Frame<'_> {
        let root = self.rule(self.root());
        Frame {
            node: root.node(),
            rules: root.patterns(),
            owner: None,
        }
    }

    /// Every [`Matcher`] of every rule (including `begin`/`end` delimiters)
    pub fn matchers(&self) -> impl Iterator<Item = &Matcher> + '_ {
        self.rules.iter().flat_map(|(_, rule)| match rule {
            Rule::Match(r) => vec![r.matcher()],
            Rule::Scoped(r) => vec![r.begin().matcher(), r.end().matcher()],
            Rule::Switch(_) => vec![],
        })
    }

    //////////////////
    // REGISTRATION //
    //////////////////

    /// Register `def` under its `id` (or `fallback_id` if it has none), returning what it was
    /// registered as.  If something is already registered under this identifier, it is returned
    /// unchanged and `def` is ignored.
    ///
    /// The identifier is registered before any nested pattern lists are resolved, so rules can
    /// (indirectly) include themselves.
    pub fn add(&mut self, def: &spec::Rule, fallback_id: &str) -> ConvertResult<Entry> {
        let ident = def.id.as_deref().unwrap_or(fallback_id);
        if let Some(&entry) = self.entries.get(ident) {
            return Ok(entry);
        }
        let ident = ident.to_owned();
        log::trace!("Registering {:?} as {:?}", ident, def.kind());

        let entry = match def.kind() {
            RuleKind::Node => {
                let node = self.declare_node(&ident, def);
                self.entries.insert(ident, Entry::Node(node));
                return Ok(Entry::Node(node));
            }
            RuleKind::Match => self.add_match(ident, def)?,
            RuleKind::Scoped => self.add_scoped(ident, def)?,
            RuleKind::Switch | RuleKind::Include => self.add_switch(ident, def)?,
        };
        Ok(Entry::Rule(entry))
    }

    /// Look up whatever is registered under `key`.  Named rules of the grammar's repository
    /// section are built the first time they are looked up.
    pub fn get(&mut self, key: &str) -> ConvertResult<Entry> {
        if let Some(&entry) = self.entries.get(key) {
            return Ok(entry);
        }
        let def = self
            .definitions
            .as_ref()
            .and_then(|defs| defs.get(key))
            .cloned()
            .ok_or_else(|| ConvertError::NotFound(key.to_owned()))?;
        self.add(&def, key)
    }

    /// Resolve an `include` reference (`#name`, `$self` or `$base`) into the rules which it
    /// refers to.  A reference to a bare node resolves to no rules.
    pub fn include(&mut self, reference: &str) -> ConvertResult<Vec<RuleId>> {
        let name = reference.strip_prefix('#').unwrap_or(reference);
        let name = match name {
            "$self" | "$base" => ROOT_IDENT,
            _ if self.definitions.is_none() => {
                return Err(ConvertError::InvalidGrammar {
                    reference: reference.to_owned(),
                })
            }
            _ => name,
        };
        Ok(match self.get(name)? {
            Entry::Rule(id) => vec![id],
            Entry::Node(_) => vec![],
        })
    }

    /// Expand a list of pattern definitions (each either an `include` or an inline rule) into a
    /// flat list of rules.  Inline rules without an `id` are registered as
    /// `{id_prefix}-p{index}`.
    pub fn get_rules(&mut self, items: &[spec::Rule], id_prefix: &str) -> ConvertResult<Vec<RuleId>> {
        let mut rules = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match &item.include {
                Some(reference) => rules.extend(self.include(reference)?),
                None => match self.add(item, &format!("{}-p{}", id_prefix, idx))? {
                    Entry::Rule(id) => rules.push(id),
                    Entry::Node(_) => {} // Nodes can't match anything on their own
                },
            }
        }
        Ok(rules)
    }

    ////////////////////
    // RULE BUILDERS //
    ////////////////////

    fn add_match(&mut self, ident: String, def: &spec::Rule) -> ConvertResult<RuleId> {
        let pattern = def.match_.as_deref().unwrap_or_default();
        let matcher = compile_matcher(&ident, pattern, &def.flags)?;
        let node = self.node_for(&ident, def);
        let id = self.register(ident.clone(), Rule::Match(MatchRule::new(node, matcher)));

        let captures = self.captures(&ident, "c", &def.captures)?;
        if let Rule::Match(rule) = &mut self.rules[id].1 {
            rule.captures = captures;
        }
        Ok(id)
    }

    fn add_scoped(&mut self, ident: String, def: &spec::Rule) -> ConvertResult<RuleId> {
        let begin = compile_matcher(&ident, def.begin.as_deref().unwrap_or_default(), &def.flags)?;
        // A region with no `end` is only ever closed by running out of text
        let end = compile_matcher(&ident, def.end.as_deref().unwrap_or(r"\z."), &def.flags)?;

        let node = self.node_for(&ident, def);
        let content_node = match &def.content_name {
            Some(content_name) => {
                let content_def = spec::Rule {
                    name: Some(content_name.clone()),
                    ..spec::Rule::default()
                };
                self.declare_node(&format!("{}-content", ident), &content_def)
            }
            None => NodeId::none(),
        };
        let (begin_node, end_node) = if def.brackets {
            self.declare_bracket_pair(&ident)
        } else {
            (NodeId::none(), NodeId::none())
        };

        let id = self.rules.next_idx();
        let rule = ScopedRule {
            id,
            node,
            content_node,
            begin: MatchRule::new(begin_node, begin),
            end: MatchRule::new(end_node, end),
            patterns: Vec::new(),
        };
        let registered_id = self.register(ident.clone(), Rule::Scoped(rule));
        debug_assert_eq!(id, registered_id);

        let begin_captures = self.captures(&ident, "bc", &def.begin_captures)?;
        let end_captures = self.captures(&ident, "ec", &def.end_captures)?;
        let patterns = self.get_rules(def.patterns.as_deref().unwrap_or_default(), &ident)?;
        if let Rule::Scoped(rule) = &mut self.rules[id].1 {
            rule.begin.captures = begin_captures;
            rule.end.captures = end_captures;
            rule.patterns = patterns;
        }
        Ok(id)
    }

    fn add_switch(&mut self, ident: String, def: &spec::Rule) -> ConvertResult<RuleId> {
        let node = self.node_for(&ident, def);
        let id = self.register(ident.clone(), Rule::Switch(SwitchRule::new(node)));

        let patterns = match (&def.patterns, &def.include) {
            (Some(items), _) => self.get_rules(items, &ident)?,
            (None, Some(reference)) => self.include(reference)?,
            (None, None) => Vec::new(),
        };
        if let Rule::Switch(rule) = &mut self.rules[id].1 {
            rule.patterns = patterns;
        }
        Ok(id)
    }

    /// Resolve a capture map into `(group index, capture)` pairs, sorted by group index.
    /// Captures are registered as `{ident}-{prefix}{index}`.
    fn captures(
        &mut self,
        ident: &str,
        prefix: &str,
        defs: &BTreeMap<String, spec::Rule>,
    ) -> ConvertResult<Vec<(usize, Capture)>> {
        let mut captures = Vec::with_capacity(defs.len());
        for (key, def) in defs {
            let group_idx = key
                .parse::<usize>()
                .map_err(|_| ConvertError::InvalidCaptureIndex {
                    ident: ident.to_owned(),
                    index: key.to_owned(),
                })?;
            let capture_ident = format!("{}-{}{}", ident, prefix, group_idx);
            let capture = match self.add(def, &capture_ident)? {
                Entry::Node(node) => Capture::Node(node),
                Entry::Rule(id) => match &self.rules[id].1 {
                    Rule::Switch(_) => Capture::Switch(id),
                    _ => {
                        return Err(ConvertError::InvalidCapture {
                            ident: self.rules[id].0.clone(),
                        })
                    }
                },
            };
            captures.push((group_idx, capture));
        }
        captures.sort_by_key(|(group_idx, _)| *group_idx);
        Ok(captures)
    }

    /////////////
    // HELPERS //
    /////////////

    fn register(&mut self, ident: String, rule: Rule) -> RuleId {
        let id = self.rules.push((ident.clone(), rule));
        self.entries.insert(ident, Entry::Rule(id));
        id
    }

    /// The node emitted by a rule: a new node if the definition is observable, otherwise
    /// [`NodeId::none`]
    fn node_for(&mut self, ident: &str, def: &spec::Rule) -> NodeId {
        if def.is_observable() {
            self.declare_node(ident, def)
        } else {
            NodeId::none()
        }
    }

    /// Create a new [`Node`], consuming the next type index
    fn declare_node(&mut self, ident: &str, def: &spec::Rule) -> NodeId {
        let metadata = (self.declarator)(ident, def);
        let mut node = Node::new(ident.to_owned(), metadata);
        node.pairing = match (&def.closed_by, &def.opened_by) {
            (Some(closed_by), _) => Some(Pairing::ClosedBy(split_idents(closed_by))),
            (None, Some(opened_by)) => Some(Pairing::OpenedBy(split_idents(opened_by))),
            (None, None) => None,
        };
        let id = self.nodes.push(node);
        self.node_idents.insert(ident.to_owned(), id);
        id
    }

    /// Declare the nodes of a pair of bracket delimiters, which refer to each other
    fn declare_bracket_pair(&mut self, ident: &str) -> (NodeId, NodeId) {
        let begin_ident = format!("{}-begin", ident);
        let end_ident = format!("{}-end", ident);
        let begin_def = spec::Rule {
            closed_by: Some(end_ident.clone()),
            ..spec::Rule::default()
        };
        let end_def = spec::Rule {
            opened_by: Some(begin_ident.clone()),
            ..spec::Rule::default()
        };
        let begin = self.declare_node(&begin_ident, &begin_def);
        let end = self.declare_node(&end_ident, &end_def);
        (begin, end)
    }
}

impl Debug for Repository {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("scope_name", &self.scope_name)
            .field("nodes", &self.nodes)
            .field("rules", &self.rules.iter().map(|(ident, _)| ident).collect_vec())
            .finish()
    }
}

fn compile_matcher(ident: &str, pattern: &str, flags: &str) -> ConvertResult<Matcher> {
    Matcher::new(pattern, flags).map_err(|e| match e {
        MatcherError::UnknownFlag(flag) => ConvertError::UnknownFlag {
            ident: ident.to_owned(),
            flag,
        },
        MatcherError::Regex(inner) => ConvertError::Regex {
            ident: ident.to_owned(),
            regex: pattern.to_owned(),
            inner,
        },
    })
}

fn split_idents(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_owned).collect()
}
