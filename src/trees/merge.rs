//! Recomposition of two trees.

use std::collections::HashSet;

use crate::error::{ConsistencyViolation, TreeResult};
use crate::forest::Forest;
use crate::markers::Markers;
use crate::types::{ArtifactData, ArtifactId, NodeId};

impl<D: ArtifactData> Forest<D> {
    /// Merge `right` into `left`, consuming `right`.
    ///
    /// Unordered children are unioned. Ordered children are combined through
    /// the sequence graph of `left` and re-ordered along its linearization.
    /// For matched pairs the instance of `left` survives; a placeholder of
    /// `left` takes over ownership when `right` owned the content.
    #[tracing::instrument(level = "debug", skip(self, markers))]
    pub fn merge(&mut self, left: NodeId, right: NodeId, markers: &mut Markers) -> TreeResult<()> {
        if left == right {
            return Err(ConsistencyViolation::SameTree(left).into());
        }
        self.require_root(left)?;
        self.require_root(right)?;

        self.merge_into(left, right, markers)?;
        self.discard_subtree(right)?;

        tracing::debug!(artifacts = self.count_artifacts(left)?, "Merged trees");
        Ok(())
    }

    fn merge_into(&mut self, left: NodeId, right: NodeId, markers: &mut Markers) -> TreeResult<()> {
        let pairs = self.match_children(left, right)?;
        let matched: HashSet<NodeId> = pairs.iter().map(|(_, rc)| *rc).collect();
        let unmatched: Vec<NodeId> = self
            .children(right)?
            .iter()
            .copied()
            .filter(|c| !matched.contains(c))
            .collect();

        for (lc, rc) in pairs {
            let la = self.artifact_of(lc)?;
            let ra = self.artifact_of(rc)?;

            if self.is_unique(rc)? {
                if self.is_unique(lc)? {
                    self.supersede(ra, la, markers)?;
                } else if self.owned_elsewhere(la, rc)? {
                    let node = self.node_mut(lc)?;
                    node.artifact = Some(ra);
                    node.unique = true;
                    self.artifact_mut(ra)?.containing_node = Some(lc);
                    tracing::trace!(node = %lc, artifact = %ra, "Placeholder adopted artifact");
                } else {
                    self.node_mut(lc)?.unique = true;
                    self.artifact_mut(la)?.containing_node = Some(lc);
                    self.supersede(ra, la, markers)?;
                }
            } else {
                markers.set_mapped(ra, la);
            }

            self.merge_into(lc, rc, markers)?;
            self.detach(rc)?;
            self.discard_subtree(rc)?;
        }

        for rc in unmatched {
            self.detach(rc)?;
            self.add_child(left, rc)?;
        }
        self.reorder_children(left)
    }

    /// Whether `artifact` is owned by a live unique node other than `except`.
    fn owned_elsewhere(&self, artifact: ArtifactId, except: NodeId) -> TreeResult<bool> {
        let Some(owner) = self.artifact(artifact)?.containing_node() else {
            return Ok(false);
        };
        if owner == except {
            return Ok(false);
        }
        Ok(self.node(owner).is_ok_and(|n| n.is_unique() && n.artifact() == Some(artifact)))
    }
}

#[cfg(test)]
mod tests {
    use crate::markers::Markers;
    use crate::types::ArtifactOptions;
    use crate::{Forest, ForestConfig, NodeId};

    fn block(forest: &mut Forest<String>, items: &[&str]) -> (NodeId, NodeId) {
        let root = forest.create_root();
        let block = forest
            .add_artifact(root, "block".to_string(), ArtifactOptions::ordered())
            .unwrap();
        for item in items {
            forest
                .add_artifact(block, item.to_string(), ArtifactOptions::unordered())
                .unwrap();
        }
        (root, block)
    }

    fn labels(forest: &Forest<String>, node: NodeId) -> Vec<String> {
        forest
            .children(node)
            .unwrap()
            .iter()
            .map(|c| forest.node_data(*c).unwrap().cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_merge_unions_unordered_children() {
        let mut forest: Forest<String> = Forest::with_config(ForestConfig::strict());
        let a = forest.create_root();
        let b = forest.create_root();
        for (root, data) in [(a, "x"), (a, "y"), (b, "y"), (b, "z")] {
            forest
                .add_artifact(root, data.to_string(), ArtifactOptions::unordered())
                .unwrap();
        }

        let mut markers = Markers::new();
        forest.merge(a, b, &mut markers).unwrap();
        forest.update_artifact_references(a, &markers).unwrap();

        assert_eq!(labels(&forest, a), vec!["x", "y", "z"]);
        assert!(!forest.contains_node(b));
        assert_eq!(forest.discard_superseded(markers).unwrap(), 1);
        forest.check_consistency(a).unwrap();
    }

    #[test]
    fn test_merge_interleaves_ordered_children() {
        let mut forest: Forest<String> = Forest::new();
        let (a, a_block) = block(&mut forest, &["x", "y", "z"]);
        let (b, _) = block(&mut forest, &["x", "w", "z"]);

        let mut markers = Markers::new();
        forest.merge(a, b, &mut markers).unwrap();
        forest.update_artifact_references(a, &markers).unwrap();

        assert_eq!(labels(&forest, a_block), vec!["x", "y", "w", "z"]);
        forest.check_consistency(a).unwrap();
    }

    #[test]
    fn test_merge_requires_distinct_roots() {
        let mut forest: Forest<String> = Forest::new();
        let (a, a_block) = block(&mut forest, &["x"]);
        let mut markers = Markers::new();

        assert!(forest.merge(a, a, &mut markers).is_err());
        let b = forest.create_root();
        assert!(forest.merge(a_block, b, &mut markers).is_err());
    }
}
