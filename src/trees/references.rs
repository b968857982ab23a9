//! Repair of artifact references after artifacts were superseded.
//!
//! When slice or merge keeps one of two equal artifacts, the other one is
//! superseded: its references move to the survivor right away, and the
//! markers remember which artifact replaced which. References held by
//! artifacts that were not touched directly still point at the superseded
//! instance until [`Forest::update_artifact_references`] runs over their tree.

use std::collections::HashSet;

use crate::error::{TreeError, TreeResult};
use crate::forest::Forest;
use crate::markers::Markers;
use crate::types::{ArtifactData, ArtifactId, ArtifactReference, NodeId};

fn push_unique(list: &mut Vec<ArtifactReference>, reference: ArtifactReference) {
    if !list.contains(&reference) {
        list.push(reference);
    }
}

fn dedup(list: Vec<ArtifactReference>) -> Vec<ArtifactReference> {
    let mut out = Vec::with_capacity(list.len());
    for reference in list {
        push_unique(&mut out, reference);
    }
    out
}

fn redirect(reference: &ArtifactReference, from: ArtifactId, to: ArtifactId) -> ArtifactReference {
    let mut out = reference.clone();
    if out.source() == from {
        out = out.with_source(to);
    }
    if out.target() == from {
        out = out.with_target(to);
    }
    out
}

impl<D: ArtifactData> Forest<D> {
    /// Replace `superseded` by `surviving`: record the markers, move every
    /// reference over and release ownership of the superseded artifact.
    pub(crate) fn supersede(
        &mut self,
        superseded: ArtifactId,
        surviving: ArtifactId,
        markers: &mut Markers,
    ) -> TreeResult<()> {
        if superseded == surviving {
            return Ok(());
        }
        markers.set_replacing(superseded, surviving);
        markers.set_mapped(superseded, surviving);
        self.transfer_references(superseded, surviving)?;
        self.artifact_mut(superseded)?.containing_node = None;
        tracing::trace!(superseded = %superseded, surviving = %surviving, "Superseded artifact");
        Ok(())
    }

    fn transfer_references(&mut self, from: ArtifactId, to: ArtifactId) -> TreeResult<()> {
        let (uses, used_by) = {
            let artifact = self.artifact_mut(from)?;
            (
                std::mem::take(&mut artifact.uses),
                std::mem::take(&mut artifact.used_by),
            )
        };

        for old in uses {
            let new = redirect(&old, from, to);
            if old.target() != from {
                let target = self.artifact_mut(old.target())?;
                target.used_by.retain(|r| *r != old);
                push_unique(&mut target.used_by, new.clone());
            } else {
                push_unique(&mut self.artifact_mut(to)?.used_by, new.clone());
            }
            push_unique(&mut self.artifact_mut(to)?.uses, new);
        }

        for old in used_by {
            let new = redirect(&old, from, to);
            if old.source() != from {
                let source = self.artifact_mut(old.source())?;
                source.uses.retain(|r| *r != old);
                push_unique(&mut source.uses, new.clone());
            }
            push_unique(&mut self.artifact_mut(to)?.used_by, new);
        }
        Ok(())
    }

    /// The artifact a reference endpoint should point at after the chain
    /// recorded in `markers`.
    ///
    /// Replacements always win. A mapped counterpart is only used when the
    /// endpoint itself has no owner anymore.
    fn surviving(
        &self,
        endpoint: ArtifactId,
        referrer: ArtifactId,
        markers: &Markers,
    ) -> TreeResult<ArtifactId> {
        let replaced = markers.resolve_replacing(endpoint);
        let owned = self
            .artifact(replaced)
            .map(|a| a.containing_node().is_some())
            .unwrap_or(false);
        if owned {
            return Ok(replaced);
        }
        let mapped = markers.resolve(endpoint);
        if self.contains_artifact(mapped) {
            return Ok(mapped);
        }
        if self.contains_artifact(replaced) {
            return Ok(replaced);
        }
        Err(TreeError::UnresolvedReference {
            referrer,
            target: endpoint,
        })
    }

    fn normalize(&self, reference: &ArtifactReference, markers: &Markers) -> TreeResult<ArtifactReference> {
        let source = self.surviving(reference.source(), reference.target(), markers)?;
        let target = self.surviving(reference.target(), source, markers)?;
        Ok(ArtifactReference::new(
            source,
            target,
            reference.reference_type().map(String::from),
        ))
    }

    /// Rewrite the references of one artifact through `markers`, including
    /// the mirror entries held by the other endpoints. Idempotent.
    pub fn update_references_of(&mut self, artifact: ArtifactId, markers: &Markers) -> TreeResult<()> {
        let (uses, used_by) = {
            let a = self.artifact(artifact)?;
            (a.uses.clone(), a.used_by.clone())
        };

        let mut new_uses = Vec::with_capacity(uses.len());
        for reference in &uses {
            push_unique(&mut new_uses, self.normalize(reference, markers)?.with_source(artifact));
        }
        let mut new_used_by = Vec::with_capacity(used_by.len());
        for reference in &used_by {
            push_unique(&mut new_used_by, self.normalize(reference, markers)?.with_target(artifact));
        }

        for reference in &new_uses {
            self.normalize_mirror(reference.target(), artifact, markers)?;
            if reference.target() != artifact {
                push_unique(&mut self.artifact_mut(reference.target())?.used_by, reference.clone());
            }
        }
        for reference in &new_used_by {
            self.normalize_mirror(reference.source(), artifact, markers)?;
            if reference.source() != artifact {
                push_unique(&mut self.artifact_mut(reference.source())?.uses, reference.clone());
            }
        }

        let a = self.artifact_mut(artifact)?;
        a.uses = new_uses;
        a.used_by = new_used_by;
        Ok(())
    }

    /// Normalize the lists of `other` so they agree with the rewritten
    /// references of `artifact`.
    fn normalize_mirror(&mut self, other: ArtifactId, artifact: ArtifactId, markers: &Markers) -> TreeResult<()> {
        if other == artifact {
            return Ok(());
        }
        let (uses, used_by) = {
            let a = self.artifact(other)?;
            (a.uses.clone(), a.used_by.clone())
        };
        let mut new_uses = Vec::with_capacity(uses.len());
        for reference in &uses {
            new_uses.push(self.normalize(reference, markers)?.with_source(other));
        }
        let mut new_used_by = Vec::with_capacity(used_by.len());
        for reference in &used_by {
            new_used_by.push(self.normalize(reference, markers)?.with_target(other));
        }
        let a = self.artifact_mut(other)?;
        a.uses = dedup(new_uses);
        a.used_by = dedup(new_used_by);
        Ok(())
    }

    /// Swap superseded artifacts of the tree's nodes for their replacements
    /// and rewrite every reference of every artifact in the tree.
    ///
    /// Must run once on every tree touched by a pass that set markers.
    /// Fails with [`TreeError::UnresolvedReference`] when a reference points
    /// at an artifact that neither survives nor has a surviving replacement.
    #[tracing::instrument(level = "debug", skip(self, markers))]
    pub fn update_artifact_references(&mut self, root: NodeId, markers: &Markers) -> TreeResult<()> {
        let mut seen = HashSet::new();
        let mut artifacts = Vec::new();
        let mut swapped = 0usize;
        for node in self.descendants(root)? {
            let Some(current) = self.node(node)?.artifact() else {
                continue;
            };
            let surviving = markers.resolve_replacing(current);
            if surviving != current {
                self.artifact(surviving)?;
                self.node_mut(node)?.artifact = Some(surviving);
                swapped += 1;
            }
            if seen.insert(surviving) {
                artifacts.push(surviving);
            }
        }

        for artifact in artifacts {
            self.update_references_of(artifact, markers)?;
        }
        tracing::debug!(swapped, "Updated artifact references");
        self.verify(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactOptions;

    fn forest_with(data: &[&str]) -> (Forest<String>, Vec<ArtifactId>) {
        let mut forest = Forest::new();
        let ids = data
            .iter()
            .map(|d| forest.create_artifact(d.to_string(), ArtifactOptions::unordered()))
            .collect();
        (forest, ids)
    }

    #[test]
    fn test_supersede_moves_references() {
        let (mut forest, ids) = forest_with(&["a", "a'", "user", "dep"]);
        let (a, a2, user, dep) = (ids[0], ids[1], ids[2], ids[3]);
        forest.add_uses(user, a2, Some("call")).unwrap();
        forest.add_uses(a2, dep, None).unwrap();

        let mut markers = Markers::new();
        forest.supersede(a2, a, &mut markers).unwrap();

        assert!(forest.uses(user, a).unwrap());
        assert!(!forest.uses(user, a2).unwrap());
        assert!(forest.uses(a, dep).unwrap());
        assert!(forest.artifact(a2).unwrap().uses().is_empty());
        assert!(forest.artifact(dep).unwrap().used_by().iter().all(|r| r.source() == a));
        assert_eq!(markers.replacing(a2), Some(a));
    }

    #[test]
    fn test_update_is_idempotent() {
        let (mut forest, ids) = forest_with(&["a", "b", "b'"]);
        let (a, b, b2) = (ids[0], ids[1], ids[2]);
        forest.add_uses(a, b2, None).unwrap();

        let mut markers = Markers::new();
        markers.set_replacing(b2, b);

        forest.update_references_of(a, &markers).unwrap();
        forest.update_references_of(a, &markers).unwrap();

        assert_eq!(forest.artifact(a).unwrap().uses().len(), 1);
        assert!(forest.uses(a, b).unwrap());
        assert_eq!(forest.artifact(b).unwrap().used_by().len(), 1);
    }

    #[test]
    fn test_merged_duplicates_collapse() {
        let (mut forest, ids) = forest_with(&["a", "b", "b'"]);
        let (a, b, b2) = (ids[0], ids[1], ids[2]);
        forest.add_uses(a, b, None).unwrap();
        forest.add_uses(a, b2, None).unwrap();

        let mut markers = Markers::new();
        markers.set_replacing(b2, b);
        forest.update_references_of(a, &markers).unwrap();

        assert_eq!(forest.artifact(a).unwrap().uses().len(), 1);
        assert_eq!(forest.artifact(b).unwrap().used_by().len(), 1);
    }

    #[test]
    fn test_unresolved_reference() {
        let (mut forest, ids) = forest_with(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        forest.add_uses(a, b, None).unwrap();

        let mut markers = Markers::new();
        let gone = {
            let mut scratch: Forest<String> = Forest::new();
            scratch.create_artifact("x".to_string(), ArtifactOptions::unordered());
            scratch.create_artifact("y".to_string(), ArtifactOptions::unordered());
            scratch.create_artifact("z".to_string(), ArtifactOptions::unordered())
        };
        markers.set_replacing(b, gone);

        let err = forest.update_references_of(a, &markers).unwrap_err();
        assert!(matches!(err, TreeError::UnresolvedReference { .. }));
    }
}
