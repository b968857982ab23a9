//! Dependency edges between artifacts.

use std::fmt;

use super::artifact::ArtifactId;

/// Directed dependency from `source` to `target`.
///
/// A reference is held twice: in the `uses` list of its source and in the
/// `used_by` list of its target. Equality is structural on
/// `(source, target, reference_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactReference {
    source: ArtifactId,
    target: ArtifactId,
    reference_type: Option<String>,
}

impl ArtifactReference {
    /// Create a new reference.
    pub fn new(source: ArtifactId, target: ArtifactId, reference_type: Option<String>) -> Self {
        Self {
            source,
            target,
            reference_type,
        }
    }

    /// The depending artifact.
    pub fn source(&self) -> ArtifactId {
        self.source
    }

    /// The artifact depended upon.
    pub fn target(&self) -> ArtifactId {
        self.target
    }

    /// Free-form reference type supplied by the artifact plugin.
    pub fn reference_type(&self) -> Option<&str> {
        self.reference_type.as_deref()
    }

    pub(crate) fn with_source(&self, source: ArtifactId) -> Self {
        Self::new(source, self.target, self.reference_type.clone())
    }

    pub(crate) fn with_target(&self, target: ArtifactId) -> Self {
        Self::new(self.source, target, self.reference_type.clone())
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference_type {
            Some(t) => write!(f, "[{} > {} : {}]", self.source, self.target, t),
            None => write!(f, "[{} > {}]", self.source, self.target),
        }
    }
}
