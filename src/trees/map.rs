//! Node-to-node correspondence between two trees.

use crate::error::{ConsistencyViolation, TreeResult};
use crate::forest::Forest;
use crate::markers::Markers;
use crate::types::{ArtifactData, ArtifactId, NodeId};

impl<D: ArtifactData> Forest<D> {
    /// Pair the children of `left` and `right` by artifact equality.
    ///
    /// Ordered children are first numbered in the sequence graph of `left`,
    /// so equality also compares their positions. When several left children
    /// are candidates for one right child, the first one in child order is
    /// taken. Pairs are returned in the child order of `right`.
    pub(crate) fn match_children(
        &mut self,
        left: NodeId,
        right: NodeId,
    ) -> TreeResult<Vec<(NodeId, NodeId)>> {
        self.align_ordered(left, right)?;

        let lefts = self.child_artifacts(left)?;
        let rights = self.child_artifacts(right)?;
        let mut taken = vec![false; lefts.len()];
        let mut pairs = Vec::new();

        for (rc, ra) in rights {
            let mut candidates = Vec::new();
            for (index, (_, la)) in lefts.iter().enumerate() {
                if !taken[index] && self.artifacts_equal(*la, ra)? {
                    candidates.push(index);
                }
            }
            let Some(&first) = candidates.first() else {
                continue;
            };
            if candidates.len() > 1 && self.config().warn_on_ambiguous_match {
                tracing::warn!(
                    left = %left,
                    right = %right,
                    candidates = candidates.len(),
                    "Ambiguous child match, taking the first candidate"
                );
            }
            taken[first] = true;
            pairs.push((lefts[first].0, rc));
        }

        tracing::trace!(left = %left, right = %right, pairs = pairs.len(), "Matched children");
        Ok(pairs)
    }

    /// Artifact of a non-root node.
    pub(crate) fn artifact_of(&self, node: NodeId) -> TreeResult<ArtifactId> {
        self.node(node)?
            .artifact()
            .ok_or_else(|| ConsistencyViolation::MissingArtifact(node).into())
    }

    /// Compute the node correspondence between two trees.
    ///
    /// Each matched right artifact is recorded as mapped onto its left
    /// counterpart. Returns the node pairs in preorder.
    #[tracing::instrument(level = "debug", skip(self, markers))]
    pub fn map(
        &mut self,
        left: NodeId,
        right: NodeId,
        markers: &mut Markers,
    ) -> TreeResult<Vec<(NodeId, NodeId)>> {
        let mut out = Vec::new();
        self.map_into(left, right, markers, &mut out)?;
        tracing::debug!(pairs = out.len(), "Mapped trees");
        Ok(out)
    }

    fn map_into(
        &mut self,
        left: NodeId,
        right: NodeId,
        markers: &mut Markers,
        out: &mut Vec<(NodeId, NodeId)>,
    ) -> TreeResult<()> {
        for (lc, rc) in self.match_children(left, right)? {
            markers.set_mapped(self.artifact_of(rc)?, self.artifact_of(lc)?);
            out.push((lc, rc));
            self.map_into(lc, rc, markers, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::markers::Markers;
    use crate::types::ArtifactOptions;
    use crate::Forest;

    #[test]
    fn test_map_pairs_equal_paths() {
        let mut forest: Forest<String> = Forest::new();
        let left = forest.create_root();
        let right = forest.create_root();
        let la = forest
            .add_artifact(left, "a".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let lb = forest
            .add_artifact(la, "b".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let ra = forest
            .add_artifact(right, "a".to_string(), ArtifactOptions::unordered())
            .unwrap();
        let rb = forest
            .add_artifact(ra, "b".to_string(), ArtifactOptions::unordered())
            .unwrap();
        forest
            .add_artifact(right, "c".to_string(), ArtifactOptions::unordered())
            .unwrap();

        let mut markers = Markers::new();
        let pairs = forest.map(left, right, &mut markers).unwrap();

        assert_eq!(pairs, vec![(la, ra), (lb, rb)]);
        let ra_artifact = forest.node(ra).unwrap().artifact().unwrap();
        let la_artifact = forest.node(la).unwrap().artifact().unwrap();
        assert_eq!(markers.mapped(ra_artifact), Some(la_artifact));
    }

    #[test]
    fn test_ordered_duplicates_match_by_position() {
        let mut forest: Forest<String> = Forest::new();
        let left = forest.create_root();
        let right = forest.create_root();
        let lblock = forest
            .add_artifact(left, "block".to_string(), ArtifactOptions::ordered())
            .unwrap();
        let rblock = forest
            .add_artifact(right, "block".to_string(), ArtifactOptions::ordered())
            .unwrap();
        let mut lefts = Vec::new();
        for data in ["s", "t", "s"] {
            lefts.push(
                forest
                    .add_artifact(lblock, data.to_string(), ArtifactOptions::unordered())
                    .unwrap(),
            );
        }
        let mut rights = Vec::new();
        for data in ["t", "s"] {
            rights.push(
                forest
                    .add_artifact(rblock, data.to_string(), ArtifactOptions::unordered())
                    .unwrap(),
            );
        }

        let mut markers = Markers::new();
        let pairs = forest.map(left, right, &mut markers).unwrap();

        assert_eq!(
            pairs,
            vec![(lblock, rblock), (lefts[1], rights[0]), (lefts[2], rights[1])]
        );
    }
}
