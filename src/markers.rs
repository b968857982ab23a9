//! Transient signals shared by the algorithms of one operation chain.
//!
//! A chain such as slice, then update of references, then extraction, sets
//! and consumes the same markers. The caller creates a [`Markers`] value, hands
//! it to each step, and finally passes it to
//! [`Forest::discard_superseded`](crate::Forest::discard_superseded).

use std::collections::{HashMap, HashSet};

use crate::types::ArtifactId;

/// Marked, replacing and mapped artifact signals.
#[derive(Debug, Default, Clone)]
pub struct Markers {
    marked: HashSet<ArtifactId>,
    replacing: HashMap<ArtifactId, ArtifactId>,
    mapped: HashMap<ArtifactId, ArtifactId>,
}

impl Markers {
    /// Create an empty marker table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag an artifact for extraction.
    pub fn mark(&mut self, artifact: ArtifactId) {
        self.marked.insert(artifact);
    }

    /// Clear the extraction flag.
    pub fn unmark(&mut self, artifact: ArtifactId) -> bool {
        self.marked.remove(&artifact)
    }

    /// Whether the artifact is flagged for extraction.
    pub fn is_marked(&self, artifact: ArtifactId) -> bool {
        self.marked.contains(&artifact)
    }

    /// Number of flagged artifacts.
    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Record that `superseded` is replaced by `surviving`.
    pub fn set_replacing(&mut self, superseded: ArtifactId, surviving: ArtifactId) {
        if superseded != surviving {
            self.replacing.insert(superseded, surviving);
        }
    }

    /// Whether a replacement was recorded for the artifact.
    pub fn has_replacing(&self, artifact: ArtifactId) -> bool {
        self.replacing.contains_key(&artifact)
    }

    /// The direct replacement of the artifact.
    pub fn replacing(&self, artifact: ArtifactId) -> Option<ArtifactId> {
        self.replacing.get(&artifact).copied()
    }

    /// Record that `artifact` corresponds to `counterpart` in the other tree.
    pub fn set_mapped(&mut self, artifact: ArtifactId, counterpart: ArtifactId) {
        if artifact != counterpart {
            self.mapped.insert(artifact, counterpart);
        }
    }

    /// The counterpart recorded for the artifact.
    pub fn mapped(&self, artifact: ArtifactId) -> Option<ArtifactId> {
        self.mapped.get(&artifact).copied()
    }

    /// Follow replacement pointers to the surviving instance.
    pub fn resolve_replacing(&self, artifact: ArtifactId) -> ArtifactId {
        self.follow(artifact, |a| self.replacing(a))
    }

    /// Follow replacement pointers first, then mapped counterparts.
    pub fn resolve(&self, artifact: ArtifactId) -> ArtifactId {
        self.follow(artifact, |a| self.replacing(a).or_else(|| self.mapped(a)))
    }

    fn follow(&self, start: ArtifactId, step: impl Fn(ArtifactId) -> Option<ArtifactId>) -> ArtifactId {
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);
        while let Some(next) = step(current) {
            if !visited.insert(next) {
                break;
            }
            current = next;
        }
        current
    }

    /// Artifacts that were superseded during the chain.
    pub fn superseded(&self) -> impl Iterator<Item = ArtifactId> + '_ {
        self.replacing.keys().copied()
    }

    /// Whether no signal is set.
    pub fn is_empty(&self) -> bool {
        self.marked.is_empty() && self.replacing.is_empty() && self.mapped.is_empty()
    }
}
