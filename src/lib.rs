//! # artifact-kernel
//!
//! Structural merge/diff engine for artifact trees of software variants.
//!
//! The kernel answers one question:
//!
//! > Given two variants, which content do they **share**, and how are their
//! > differences put back together?
//!
//! ## Core Contract
//!
//! 1. Decompose two artifact trees into their intersection and remainders (`slice`)
//! 2. Recompose arbitrary combinations of such pieces (`merge`)
//! 3. Reconcile every observed order of ordered children in one sequence graph
//! 4. Keep the cross-tree dependency graph intact while trees are restructured
//!
//! ## Architecture
//!
//! ```text
//! ArtifactReader → Forest (nodes + artifacts) → slice / merge / extract
//!                        ↓                              ↓
//!                  SequenceGraph              update_artifact_references
//!                                                        ↓
//!                                                 ArtifactWriter
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same inputs in the same order → identical trees, numbers and fingerprints
//! - Ties between equally good matches resolve to the first candidate in child order
//! - Linearizations prefer the smallest sequence number among unconstrained slots

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod error;
pub mod sequence_graph;
pub mod markers;
pub mod forest;
pub mod trees;
pub mod fingerprint;
pub mod canonical;
pub mod config;
pub mod logging;
pub mod plugin;

// Re-exports
pub use types::{
    Artifact, ArtifactData, ArtifactId, ArtifactOptions, ArtifactReference, AssociationId, Node,
    NodeId, NodeKind, Properties, PROPERTY_UNMODIFIED,
};
pub use error::{ConsistencyViolation, TreeError, TreeResult};
pub use sequence_graph::{Alignment, SequenceGraph, SequenceItem, SequenceNumber};
pub use markers::Markers;
pub use forest::Forest;
pub use fingerprint::TreeFingerprint;
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use config::ForestConfig;
pub use plugin::{ArtifactReader, ArtifactWriter, WriteListener, WriteListeners};

/// Schema version of the structural fingerprint.
/// Increment on changes that alter fingerprints of unchanged trees.
pub const TREE_SCHEMA_VERSION: &str = "1.0.0";
