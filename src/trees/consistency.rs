//! Structural and referential consistency checks.

use crate::error::{ConsistencyViolation, TreeResult};
use crate::forest::Forest;
use crate::sequence_graph::{SequenceGraph, SequenceNumber};
use crate::types::{ArtifactData, ArtifactId, NodeId};

impl<D: ArtifactData> Forest<D> {
    /// Validate the tree rooted at `root`, failing on the first violation.
    ///
    /// Checks parent back-references, ownership of artifacts by unique nodes,
    /// uniqueness of children under unordered nodes and the sequence numbers
    /// of children under ordered nodes. Artifacts owned by unique nodes are
    /// validated with [`Forest::check_artifact_consistency`].
    pub fn check_consistency(&self, root: NodeId) -> TreeResult<()> {
        for id in self.descendants(root)? {
            let node = self.node(id)?;

            for child in node.children() {
                let child_node = self.node(*child)?;
                if child_node.is_root() {
                    return Err(ConsistencyViolation::RootAttachment(*child).into());
                }
                if child_node.parent() != Some(id) {
                    return Err(ConsistencyViolation::OrphanedParent {
                        child: *child,
                        expected: id,
                        actual: child_node.parent(),
                    }
                    .into());
                }
            }

            if let (true, Some(artifact)) = (node.is_unique(), node.artifact()) {
                match self.artifact(artifact)?.containing_node() {
                    None => return Err(ConsistencyViolation::MissingContainingNode(artifact).into()),
                    Some(owner) if owner != id => {
                        return Err(ConsistencyViolation::ContainingNodeMismatch {
                            artifact,
                            node: owner,
                        }
                        .into())
                    }
                    Some(_) => {}
                }
                self.check_artifact_consistency(artifact)?;
            }

            self.check_children(id)?;
        }
        Ok(())
    }

    fn check_children(&self, id: NodeId) -> TreeResult<()> {
        let children = self.child_artifacts(id)?;
        let graph = match self.node(id)?.artifact() {
            Some(artifact) if self.artifact(artifact)?.is_ordered() => {
                Some(self.artifact(artifact)?.sequence_graph())
            }
            _ => None,
        };

        match graph {
            None => {
                for (index, (_, a)) in children.iter().enumerate() {
                    if let Some(number) = self.artifact(*a)?.sequence_number() {
                        return Err(ConsistencyViolation::SequenceNumberWithoutGraph {
                            artifact: *a,
                            number,
                        }
                        .into());
                    }
                    for (_, b) in &children[index + 1..] {
                        if self.artifacts_equal(*a, *b)? {
                            return Err(ConsistencyViolation::DuplicateChild {
                                parent: id,
                                data: self.artifact(*a)?.data().to_string(),
                            }
                            .into());
                        }
                    }
                }
            }
            Some(graph) => {
                for (_, a) in &children {
                    let Some(number) = self.artifact(*a)?.sequence_number() else {
                        continue;
                    };
                    match graph {
                        None => {
                            return Err(ConsistencyViolation::SequenceNumberWithoutGraph {
                                artifact: *a,
                                number,
                            }
                            .into())
                        }
                        Some(graph) => self.check_slot(graph, *a, number)?,
                    }
                }
            }
        }
        Ok(())
    }

    /// The slot named by `number` must exist and hold the artifact's data.
    fn check_slot(
        &self,
        graph: &SequenceGraph<D>,
        artifact: ArtifactId,
        number: SequenceNumber,
    ) -> TreeResult<()> {
        match graph.slot(number) {
            None => Err(ConsistencyViolation::UnknownSequenceNumber { artifact, number }.into()),
            Some(data) if data != self.artifact(artifact)?.data() => {
                Err(ConsistencyViolation::SequenceSlotMismatch { artifact, number }.into())
            }
            Some(_) => Ok(()),
        }
    }

    /// Validate one artifact: its containing node, its sequencing state, and
    /// both directions of every reference it takes part in.
    pub fn check_artifact_consistency(&self, id: ArtifactId) -> TreeResult<()> {
        let artifact = self.artifact(id)?;

        if let Some(owner) = artifact.containing_node() {
            let owns = self
                .node(owner)
                .is_ok_and(|n| n.is_unique() && n.artifact() == Some(id));
            if !owns {
                return Err(ConsistencyViolation::ContainingNodeMismatch {
                    artifact: id,
                    node: owner,
                }
                .into());
            }

            if let Some(number) = artifact.sequence_number() {
                let parent_graph = match self.node(owner)?.parent() {
                    Some(parent) => match self.node(parent)?.artifact() {
                        Some(p) => self.artifact(p)?.sequence_graph(),
                        None => None,
                    },
                    None => None,
                };
                match parent_graph {
                    None => {
                        return Err(ConsistencyViolation::SequenceNumberWithoutGraph {
                            artifact: id,
                            number,
                        }
                        .into())
                    }
                    Some(graph) => self.check_slot(graph, id, number)?,
                }
            }
        }

        if !artifact.is_ordered() && artifact.is_sequenced() {
            return Err(ConsistencyViolation::GraphOnUnorderedArtifact(id).into());
        }

        for reference in artifact.uses() {
            let target = self.artifact(reference.target()).map_err(|_| {
                ConsistencyViolation::DanglingReference {
                    referrer: id,
                    target: reference.target(),
                }
            })?;
            if reference.source() != id || !target.used_by().contains(reference) {
                return Err(ConsistencyViolation::MissingBackReference {
                    referrer: reference.source(),
                    target: reference.target(),
                }
                .into());
            }
        }
        for reference in artifact.used_by() {
            let source = self.artifact(reference.source()).map_err(|_| {
                ConsistencyViolation::DanglingReference {
                    referrer: reference.source(),
                    target: id,
                }
            })?;
            if reference.target() != id || !source.uses().contains(reference) {
                return Err(ConsistencyViolation::MissingBackReference {
                    referrer: reference.source(),
                    target: reference.target(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConsistencyViolation;
    use crate::types::{ArtifactOptions, ArtifactReference};
    use crate::Forest;

    #[test]
    fn test_built_tree_is_consistent() {
        let mut forest: Forest<String> = Forest::new();
        let root = forest.create_root();
        let block = forest
            .add_artifact(root, "block".to_string(), ArtifactOptions::ordered())
            .unwrap();
        let x = forest
            .add_artifact(block, "x".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let y = forest
            .add_artifact(block, "y".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let xa = forest.node(x).unwrap().artifact().unwrap();
        let ya = forest.node(y).unwrap().artifact().unwrap();
        forest.add_uses(xa, ya, None).unwrap();

        forest.check_consistency(root).unwrap();
        forest.sequence(root).unwrap();
        forest.check_consistency(root).unwrap();
    }

    #[test]
    fn test_missing_back_reference_detected() {
        let mut forest: Forest<String> = Forest::new();
        let root = forest.create_root();
        let x = forest
            .add_artifact(root, "x".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let y = forest
            .add_artifact(root, "y".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let xa = forest.node(x).unwrap().artifact().unwrap();
        let ya = forest.node(y).unwrap().artifact().unwrap();
        forest
            .artifact_mut(xa)
            .unwrap()
            .uses
            .push(ArtifactReference::new(xa, ya, None));

        let err = forest.check_consistency(root).unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&ConsistencyViolation::MissingBackReference {
                referrer: xa,
                target: ya
            })
        );
    }

    #[test]
    fn test_orphaned_parent_detected() {
        let mut forest: Forest<String> = Forest::new();
        let root = forest.create_root();
        let x = forest
            .add_artifact(root, "x".to_string(), ArtifactOptions::unordered())
            .unwrap();
        forest.node_mut(x).unwrap().parent = None;

        let err = forest.check_consistency(root).unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(ConsistencyViolation::OrphanedParent { .. })
        ));
    }

    #[test]
    fn test_duplicate_under_unordered_detected() {
        let mut forest: Forest<String> = Forest::new();
        let root = forest.create_root();
        forest
            .add_artifact(root, "x".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let dup = forest.create_artifact("x".to_string(), ArtifactOptions::unordered());
        let node = forest.create_node(dup).unwrap();
        forest.attach(root, node).unwrap();

        let err = forest.check_consistency(root).unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(ConsistencyViolation::DuplicateChild { .. })
        ));
    }

    #[test]
    fn test_number_naming_foreign_slot_detected() {
        let mut forest: Forest<String> = Forest::new();
        let root = forest.create_root();
        let b1 = forest
            .add_artifact(root, "b1".to_string(), ArtifactOptions::ordered())
            .unwrap();
        let b2 = forest
            .add_artifact(root, "b2".to_string(), ArtifactOptions::ordered())
            .unwrap();
        let x = forest
            .add_artifact(b1, "x".to_string(), ArtifactOptions::unordered())
            .unwrap();
        forest
            .add_artifact(b2, "q".to_string(), ArtifactOptions::unordered())
            .unwrap();
        forest.sequence(root).unwrap();

        // Raw move keeps x's number, which names the slot of "q" in b2.
        forest.detach(x).unwrap();
        forest.attach(b2, x).unwrap();

        let xa = forest.node(x).unwrap().artifact().unwrap();
        let err = forest.check_consistency(root).unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&ConsistencyViolation::SequenceSlotMismatch {
                artifact: xa,
                number: crate::sequence_graph::SequenceNumber::FIRST,
            })
        );
        assert!(forest.check_artifact_consistency(xa).is_err());
    }

    #[test]
    fn test_number_without_graph_detected() {
        let mut forest: Forest<String> = Forest::new();
        let root = forest.create_root();
        let block = forest
            .add_artifact(root, "block".to_string(), ArtifactOptions::ordered())
            .unwrap();
        let x = forest
            .add_artifact(block, "x".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let xa = forest.node(x).unwrap().artifact().unwrap();
        forest.artifact_mut(xa).unwrap().sequence_number =
            Some(crate::sequence_graph::SequenceNumber::new(1));

        let err = forest.check_consistency(root).unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(ConsistencyViolation::SequenceNumberWithoutGraph { .. })
        ));
    }
}
