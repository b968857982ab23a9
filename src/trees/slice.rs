//! Decomposition of two trees into their intersection and remainders.

use crate::error::{ConsistencyViolation, TreeResult};
use crate::forest::Forest;
use crate::markers::Markers;
use crate::types::{ArtifactData, Node, NodeId};

impl<D: ArtifactData> Forest<D> {
    /// Slice `right` against `left`.
    ///
    /// Returns the root of a new tree holding the content both trees have in
    /// common. Afterwards `left` holds what only `left` had and `right` holds
    /// what only `right` had; both keep non-unique placeholder nodes on the
    /// paths to content that moved. Every unique node left in `right` is
    /// marked for extraction.
    ///
    /// A matched pair is handled as atomic when either side is atomic. It
    /// joins the intersection only when both subtrees are structurally
    /// equivalent, which includes the atomic flag, so an atomic artifact
    /// never pairs up with a non-atomic one of equal data.
    ///
    /// For each common artifact the instance of `left` survives and the one
    /// of `right` is superseded. [`Forest::update_artifact_references`] must
    /// run on all three trees before references are used again.
    #[tracing::instrument(level = "debug", skip(self, markers))]
    pub fn slice(&mut self, left: NodeId, right: NodeId, markers: &mut Markers) -> TreeResult<NodeId> {
        if left == right {
            return Err(ConsistencyViolation::SameTree(left).into());
        }
        self.require_root(left)?;
        self.require_root(right)?;

        let intersection = self.create_root();
        self.slice_into(left, right, intersection, markers)?;

        let mut marked = 0usize;
        for node in self.descendants(right)? {
            let node = self.node(node)?;
            if let (true, Some(artifact)) = (node.is_unique(), node.artifact()) {
                markers.mark(artifact);
                marked += 1;
            }
        }

        tracing::debug!(
            common = self.count_artifacts(intersection)?,
            marked,
            "Sliced trees"
        );
        Ok(intersection)
    }

    fn slice_into(
        &mut self,
        left: NodeId,
        right: NodeId,
        common: NodeId,
        markers: &mut Markers,
    ) -> TreeResult<()> {
        for (lc, rc) in self.match_children(left, right)? {
            let la = self.artifact_of(lc)?;
            let ra = self.artifact_of(rc)?;
            let atomic = self.is_atomic(lc)? || self.is_atomic(rc)?;
            if atomic && !self.structurally_equivalent(lc, rc)? {
                tracing::trace!(left = %lc, right = %rc, "Atomic subtrees differ, kept apart");
                continue;
            }

            let owned = self.is_unique(lc)? && self.is_unique(rc)?;
            let ic = if owned {
                let ic = self.insert_node(Node::inner(la, true));
                self.node_mut(lc)?.unique = false;
                self.node_mut(rc)?.unique = false;
                self.artifact_mut(la)?.containing_node = Some(ic);
                self.supersede(ra, la, markers)?;
                ic
            } else {
                markers.set_mapped(ra, la);
                self.create_placeholder(la)
            };
            self.attach(common, ic)?;

            if atomic && owned {
                self.slice_atomic(lc, rc, ic, markers)?;
            } else {
                self.slice_into(lc, rc, ic, markers)?;
            }

            self.prune_placeholder(lc)?;
            self.prune_placeholder(rc)?;
            self.prune_placeholder(ic)?;
        }
        self.reorder_children(common)
    }

    /// Move an atomic subtree of `left` into the intersection as a whole and
    /// drop the equivalent subtree of `right`.
    fn slice_atomic(
        &mut self,
        left: NodeId,
        right: NodeId,
        common: NodeId,
        markers: &mut Markers,
    ) -> TreeResult<()> {
        self.supersede_descendants(left, right, markers)?;

        for child in self.children(left)?.to_vec() {
            self.detach(child)?;
            self.attach(common, child)?;
        }
        for child in self.children(right)?.to_vec() {
            self.detach(child)?;
            self.discard_subtree(child)?;
        }
        Ok(())
    }

    fn supersede_descendants(
        &mut self,
        left: NodeId,
        right: NodeId,
        markers: &mut Markers,
    ) -> TreeResult<()> {
        for (lc, rc) in self.match_children(left, right)? {
            let la = self.artifact_of(lc)?;
            let ra = self.artifact_of(rc)?;
            if self.is_unique(lc)? && self.is_unique(rc)? {
                self.supersede(ra, la, markers)?;
            } else {
                markers.set_mapped(ra, la);
            }
            self.supersede_descendants(lc, rc, markers)?;
        }
        Ok(())
    }
}
