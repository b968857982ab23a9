//! Artifacts: identity-bearing wrappers around plugin supplied data.
//!
//! ## Identity
//!
//! Two artifacts are equal when
//! 1. their data objects are equal,
//! 2. both are ordered or both are unordered, and
//! 3. if both carry a sequence number, the numbers are equal.
//!
//! The hash only covers `(data, ordered)`. The sequence number never takes part
//! in hashing, so an unnumbered artifact and a numbered one with equal data
//! land in the same bucket.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};

use generational_arena::Index;
use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::properties::Properties;
use super::reference::ArtifactReference;
use crate::sequence_graph::{SequenceGraph, SequenceNumber};

/// Data carried by an artifact.
///
/// Supplied by artifact plugins. It must support equality and hashing, and it
/// must serialize deterministically because subtree fingerprints are computed
/// from it.
pub trait ArtifactData: Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize {}

impl<T> ArtifactData for T where T: Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize {}

/// Handle of an artifact inside a [`Forest`](crate::Forest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(pub(crate) Index);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "a{}v{}", index, generation)
    }
}

/// Creation flags of an artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactOptions {
    /// The subtree below the artifact is never split by any tree operation.
    pub atomic: bool,
    /// The order of the artifact's children is significant.
    pub ordered: bool,
}

impl ArtifactOptions {
    /// Unordered, non-atomic.
    pub fn unordered() -> Self {
        Self::default()
    }

    /// Ordered, non-atomic.
    pub fn ordered() -> Self {
        Self {
            atomic: false,
            ordered: true,
        }
    }

    /// Atomic, unordered.
    pub fn atomic() -> Self {
        Self {
            atomic: true,
            ordered: false,
        }
    }

    /// Builder-style toggle of the atomic flag.
    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }
}

/// An artifact of an artifact tree.
///
/// The public surface is read-only; every mutation goes through the owning
/// [`Forest`](crate::Forest) and the tree algorithms.
#[derive(Debug)]
pub struct Artifact<D> {
    pub(crate) data: D,
    pub(crate) atomic: bool,
    pub(crate) ordered: bool,
    pub(crate) sequence_number: Option<SequenceNumber>,
    pub(crate) sequence_graph: Option<SequenceGraph<D>>,
    pub(crate) containing_node: Option<NodeId>,
    pub(crate) uses: Vec<ArtifactReference>,
    pub(crate) used_by: Vec<ArtifactReference>,
    pub(crate) properties: Properties,
}

impl<D: ArtifactData> Artifact<D> {
    pub(crate) fn new(data: D, options: ArtifactOptions) -> Self {
        Self {
            data,
            atomic: options.atomic,
            ordered: options.ordered,
            sequence_number: None,
            sequence_graph: None,
            containing_node: None,
            uses: Vec::new(),
            used_by: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// The plugin supplied data object.
    pub fn data(&self) -> &D {
        &self.data
    }

    /// Whether the subtree below this artifact is exempt from splitting.
    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Whether the order of the artifact's children matters.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Whether the artifact owns a sequence graph.
    ///
    /// Unordered artifacts are never sequenced. Ordered artifacts become
    /// sequenced the first time an operation needs their child order.
    pub fn is_sequenced(&self) -> bool {
        self.sequence_graph.is_some()
    }

    /// Position assigned by the parent's sequence graph, `None` if unassigned.
    pub fn sequence_number(&self) -> Option<SequenceNumber> {
        self.sequence_number
    }

    /// The sequence graph reconciling the orders of this artifact's children.
    pub fn sequence_graph(&self) -> Option<&SequenceGraph<D>> {
        self.sequence_graph.as_ref()
    }

    /// The unique node that owns this artifact.
    pub fn containing_node(&self) -> Option<NodeId> {
        self.containing_node
    }

    /// Outgoing references.
    pub fn uses(&self) -> &[ArtifactReference] {
        &self.uses
    }

    /// Incoming references.
    pub fn used_by(&self) -> &[ArtifactReference] {
        &self.used_by
    }

    /// Whether one of the outgoing references points at `target`.
    pub fn uses_artifact(&self, target: ArtifactId) -> bool {
        self.uses.iter().any(|r| r.target() == target)
    }

    /// Transient properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Shorthand for `properties().get(name)`.
    pub fn property<T: Any>(&self, name: &str) -> Option<&T> {
        self.properties.get(name)
    }
}

impl<D: ArtifactData> PartialEq for Artifact<D> {
    fn eq(&self, other: &Self) -> bool {
        if self.ordered != other.ordered || self.data != other.data {
            return false;
        }
        match (self.sequence_number, other.sequence_number) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl<D: ArtifactData> Hash for Artifact<D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
        self.ordered.hash(state);
    }
}

impl<D: ArtifactData> fmt::Display for Artifact<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}
