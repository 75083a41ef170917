use std::fmt::{Debug, Formatter};

use crate::spec;

/// The identity which a rule emits into the token stream.  Exactly one `Node` exists per
/// registered identifier of a [`Repository`](crate::Repository).
#[derive(Clone)]
pub struct Node {
    /// The identifier under which this `Node` was registered.  Must be unique within the
    /// [`Repository`](crate::Repository)
    pub(crate) ident: String,
    pub(crate) metadata: NodeMetadata,
    pub(crate) pairing: Option<Pairing>,
}

impl Node {
    pub(crate) fn new(ident: String, metadata: NodeMetadata) -> Self {
        Self {
            ident,
            metadata,
            pairing: None,
        }
    }

    /// The sentinel node stored at index `0` of every [`Repository`](crate::Repository)
    pub(crate) fn none() -> Self {
        Self::new(String::new(), NodeMetadata::default())
    }

    #[inline]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    #[inline]
    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    /// The bracket-pairing hints attached to this `Node`, if the grammar declared any
    #[inline]
    pub fn pairing(&self) -> Option<&Pairing> {
        self.pairing.as_ref()
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.metadata.name {
            Some(name) => write!(f, "Node({} = {})", self.ident, name),
            None => write!(f, "Node({})", self.ident),
        }
    }
}

/// Externally meaningful data attached to a [`Node`] by the grammar's declarator when the
/// [`Node`] is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetadata {
    /// The display or scope name of this node (e.g. `constant.numeric`)
    pub name: Option<String>,
}

/// Delimiter-pairing hints used by downstream consumers for bracket matching.  Each entry is the
/// identifier of a [`Node`] which can close (or open) the node carrying this `Pairing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    ClosedBy(Vec<String>),
    OpenedBy(Vec<String>),
}

/// Callback which attaches [`NodeMetadata`] to each [`Node`] as it is constructed.  This is
/// invoked exactly once per [`Node`], and is the only place where the engine depends on the
/// host's naming scheme.
pub type Declarator = dyn Fn(&str, &spec::Rule) -> NodeMetadata + Send + Sync;

/// The [`Declarator`] used when the host doesn't provide one: copies the rule's `name`.
pub fn default_declarator(_ident: &str, rule: &spec::Rule) -> NodeMetadata {
    NodeMetadata {
        name: rule.name.clone(),
    }
}

// `0` is reserved for the `None` sentinel, so real nodes start from `1`
index_vec::define_index_type! { pub struct NodeId = usize; }

impl NodeId {
    /// The sentinel identity of rules which match but must not appear in the output
    #[inline]
    pub fn none() -> Self {
        Self::new(0)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.index() == 0
    }

    /// Converts this `NodeId` into the type index of an output token (`None` if this is the
    /// sentinel)
    #[inline]
    pub fn type_index(self) -> Option<NodeId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}
