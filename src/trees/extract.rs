//! Extraction of marked content into a tree of its own.

use crate::error::TreeResult;
use crate::forest::Forest;
use crate::markers::Markers;
use crate::types::{ArtifactData, Node, NodeId};

impl<D: ArtifactData> Forest<D> {
    /// Move every marked unique node of the tree into a new detached tree.
    ///
    /// Ownership of a marked artifact moves to a new unique node; the source
    /// node stays behind as a placeholder. Paths to marked content are
    /// recreated with placeholders. Placeholders left without children are
    /// pruned on both sides. Extracted artifacts are unmarked.
    #[tracing::instrument(level = "debug", skip(self, markers))]
    pub fn extract_marked(&mut self, root: NodeId, markers: &mut Markers) -> TreeResult<NodeId> {
        let extracted = self.create_root();
        let moved = self.extract_into(root, extracted, markers)?;
        tracing::debug!(moved, "Extracted marked artifacts");

        self.verify(root)?;
        self.verify(extracted)?;
        Ok(extracted)
    }

    fn extract_into(
        &mut self,
        source: NodeId,
        target: NodeId,
        markers: &mut Markers,
    ) -> TreeResult<usize> {
        let mut moved = 0;
        for child in self.children(source)?.to_vec() {
            let artifact = self.artifact_of(child)?;
            let take = self.is_unique(child)? && markers.is_marked(artifact);

            let copy = if take {
                let copy = self.insert_node(Node::inner(artifact, true));
                self.node_mut(child)?.unique = false;
                self.artifact_mut(artifact)?.containing_node = Some(copy);
                markers.unmark(artifact);
                moved += 1;
                copy
            } else {
                self.create_placeholder(artifact)
            };
            self.attach(target, copy)?;

            moved += self.extract_into(child, copy, markers)?;

            self.prune_placeholder(copy)?;
            self.prune_placeholder(child)?;
        }
        self.reorder_children(target)?;
        Ok(moved)
    }
}
