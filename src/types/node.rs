//! Nodes of artifact trees.

use std::fmt;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::ArtifactId;
use super::properties::Properties;

/// Handle of a node inside a [`Forest`](crate::Forest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "n{}v{}", index, generation)
    }
}

/// Identifier of an externally owned association a tree is checked out under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssociationId(Uuid);

impl AssociationId {
    /// Create an association id from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a random association id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AssociationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Root nodes are a distinguished variant: always unique, never atomic,
/// without artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a tree, optionally anchored to an association.
    Root {
        /// The association the tree belongs to.
        association: Option<AssociationId>,
    },
    /// Any other node.
    Inner,
}

/// A node of an artifact tree.
///
/// A *unique* node owns its artifact: the artifact's containing node is this
/// node. A non-unique node is a placeholder that keeps the path to content
/// owned elsewhere; it refers to the artifact without owning it.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) artifact: Option<ArtifactId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) unique: bool,
    pub(crate) properties: Properties,
}

impl Node {
    pub(crate) fn root(association: Option<AssociationId>) -> Self {
        Self {
            kind: NodeKind::Root { association },
            artifact: None,
            parent: None,
            children: Vec::new(),
            unique: true,
            properties: Properties::new(),
        }
    }

    pub(crate) fn inner(artifact: ArtifactId, unique: bool) -> Self {
        Self {
            kind: NodeKind::Inner,
            artifact: Some(artifact),
            parent: None,
            children: Vec::new(),
            unique,
            properties: Properties::new(),
        }
    }

    /// Root or inner node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether this is a root node.
    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root { .. })
    }

    /// The artifact this node refers to. Roots have none.
    pub fn artifact(&self) -> Option<ArtifactId> {
        self.artifact
    }

    /// The parent node, `None` for roots and detached subtrees.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node owns its artifact.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Transient properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub(crate) fn association(&self) -> Option<AssociationId> {
        match self.kind {
            NodeKind::Root { association } => association,
            NodeKind::Inner => None,
        }
    }
}
