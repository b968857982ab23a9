//! Error types shared by the forest and the tree algorithms.
//!
//! Every fallible operation returns [`TreeResult`]. Structural and consistency
//! violations abort the running traversal on the first problem found; callers
//! discard the whole operation chain instead of repairing locally.

use crate::sequence_graph::SequenceNumber;
use crate::types::{ArtifactId, NodeId};

/// A broken invariant detected while mutating or validating a forest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyViolation {
    /// A child does not point back at the node that lists it.
    #[error("Node {child} is listed under {expected} but its parent is {actual:?}")]
    OrphanedParent {
        /// The listed child.
        child: NodeId,
        /// The node whose child list contains it.
        expected: NodeId,
        /// The parent the child actually records.
        actual: Option<NodeId>,
    },
    /// Two children of an unordered node carry equal artifacts.
    #[error("Duplicate child '{data}' under unordered node {parent}")]
    DuplicateChild {
        /// The unordered node.
        parent: NodeId,
        /// Rendered data of the duplicated artifact.
        data: String,
    },
    /// An artifact owned by a unique node has no containing node.
    #[error("Artifact {0} has no containing node")]
    MissingContainingNode(ArtifactId),
    /// The containing node recorded on an artifact does not own it.
    #[error("Artifact {artifact} names {node} as containing node, but that node does not own it")]
    ContainingNodeMismatch {
        /// The artifact.
        artifact: ArtifactId,
        /// The node recorded as its container.
        node: NodeId,
    },
    /// A sequence number is assigned while the parent artifact is not sequenced.
    #[error("Artifact {artifact} carries sequence number {number} but its parent is not sequenced")]
    SequenceNumberWithoutGraph {
        /// The numbered artifact.
        artifact: ArtifactId,
        /// Its sequence number.
        number: SequenceNumber,
    },
    /// A sequence number that the parent's sequence graph never allocated.
    #[error("Artifact {artifact} carries sequence number {number} unknown to the parent's sequence graph")]
    UnknownSequenceNumber {
        /// The numbered artifact.
        artifact: ArtifactId,
        /// Its sequence number.
        number: SequenceNumber,
    },
    /// A sequence number naming a slot that holds different data.
    #[error("Artifact {artifact} carries sequence number {number} whose slot holds other data")]
    SequenceSlotMismatch {
        /// The numbered artifact.
        artifact: ArtifactId,
        /// Its sequence number.
        number: SequenceNumber,
    },
    /// Only ordered artifacts may own a sequence graph.
    #[error("Unordered artifact {0} owns a sequence graph")]
    GraphOnUnorderedArtifact(ArtifactId),
    /// The node already has a parent.
    #[error("Node {node} is already attached to {parent}")]
    DoubleAttachment {
        /// The node being attached.
        node: NodeId,
        /// Its current parent.
        parent: NodeId,
    },
    /// The artifact is already owned by another node.
    #[error("Artifact {artifact} is already contained by {node}")]
    ArtifactAlreadyContained {
        /// The artifact.
        artifact: ArtifactId,
        /// Its current owner.
        node: NodeId,
    },
    /// Root nodes never have a parent.
    #[error("Root node {0} cannot be attached as a child")]
    RootAttachment(NodeId),
    /// Attaching the node would make it its own ancestor.
    #[error("Node {node} is an ancestor of {parent}")]
    AncestorAttachment {
        /// The node being attached.
        node: NodeId,
        /// The requested parent.
        parent: NodeId,
    },
    /// One endpoint of a reference does not list it.
    #[error("Reference {referrer} -> {target} is missing its back-reference")]
    MissingBackReference {
        /// Source of the reference.
        referrer: ArtifactId,
        /// Target of the reference.
        target: ArtifactId,
    },
    /// A reference endpoint was discarded.
    #[error("Reference {referrer} -> {target} points at a discarded artifact")]
    DanglingReference {
        /// Source of the reference.
        referrer: ArtifactId,
        /// Target of the reference.
        target: ArtifactId,
    },
    /// The node handle is not (or no longer) part of the forest.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    /// The artifact handle is not (or no longer) part of the forest.
    #[error("Unknown artifact {0}")]
    UnknownArtifact(ArtifactId),
    /// The node is not a child of the given parent.
    #[error("Node {child} is not a child of {parent}")]
    NotAChild {
        /// The presumed parent.
        parent: NodeId,
        /// The presumed child.
        child: NodeId,
    },
    /// A non-root node without an artifact.
    #[error("Node {0} carries no artifact")]
    MissingArtifact(NodeId),
    /// The operation requires a detached root node.
    #[error("Node {0} is not a detached root")]
    NotARoot(NodeId),
    /// The operation requires a detached subtree.
    #[error("Node {0} is still attached")]
    StillAttached(NodeId),
    /// Both operands of a pairwise algorithm are the same tree.
    #[error("Node {0} was passed as both operands")]
    SameTree(NodeId),
}

/// Error type for forest operations and tree algorithms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// An unordered node already holds an equal child.
    #[error("Structural conflict under {parent}: an equal child '{data}' already exists")]
    StructuralConflict {
        /// The unordered node.
        parent: NodeId,
        /// Rendered data of the rejected child.
        data: String,
    },
    /// A consistency check or attachment precondition failed.
    #[error("Inconsistent state: {0}")]
    InconsistentState(#[from] ConsistencyViolation),
    /// A reference could not be redirected to a surviving artifact.
    #[error("Unresolved reference: {referrer} -> {target} has no surviving target")]
    UnresolvedReference {
        /// Source of the reference.
        referrer: ArtifactId,
        /// The superseded or discarded target.
        target: ArtifactId,
    },
    /// A sequence graph cannot order the requested artifacts.
    #[error("Ambiguous order: {0}")]
    AmbiguousOrder(String),
    /// Artifact data or configuration could not be canonically encoded.
    #[error("Canonical serialization failed: {0}")]
    Serialization(String),
}

impl TreeError {
    /// Whether the error reports a broken invariant.
    pub fn is_inconsistent_state(&self) -> bool {
        matches!(self, Self::InconsistentState(_))
    }

    /// The violation carried by an [`TreeError::InconsistentState`] error.
    pub fn violation(&self) -> Option<&ConsistencyViolation> {
        match self {
            Self::InconsistentState(v) => Some(v),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type TreeResult<T> = Result<T, TreeError>;
