//! Core types of the artifact tree model.

pub mod artifact;
pub mod reference;
pub mod node;
pub mod properties;

pub use artifact::{Artifact, ArtifactData, ArtifactId, ArtifactOptions};
pub use reference::ArtifactReference;
pub use node::{AssociationId, Node, NodeId, NodeKind};
pub use properties::{Properties, PROPERTY_UNMODIFIED};
