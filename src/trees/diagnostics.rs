//! Human readable dumps and simple statistics of trees.

use std::collections::BTreeMap;

use termtree::Tree;

use crate::error::TreeResult;
use crate::forest::Forest;
use crate::types::{ArtifactData, NodeId};

impl<D: ArtifactData> Forest<D> {
    fn label(&self, id: NodeId) -> TreeResult<String> {
        let node = self.node(id)?;
        let Some(artifact) = node.artifact() else {
            return Ok("root".to_string());
        };
        let artifact = self.artifact(artifact)?;
        let mut label = artifact.data().to_string();
        if let Some(number) = artifact.sequence_number() {
            label.push_str(&format!(" #{}", number));
        }
        if !node.is_unique() {
            label = format!("({})", label);
        }
        Ok(label)
    }

    /// Render the subtree as a [`termtree::Tree`]. Placeholders are shown in
    /// parentheses.
    pub fn render(&self, id: NodeId) -> TreeResult<Tree<String>> {
        let mut tree = Tree::new(self.label(id)?);
        for child in self.children(id)? {
            tree.push(self.render(*child)?);
        }
        Ok(tree)
    }

    /// Print the subtree to stdout.
    pub fn print(&self, id: NodeId) -> TreeResult<()> {
        println!("{}", self.render(id)?);
        Ok(())
    }

    /// Number of artifacts owned by the subtree's unique nodes.
    pub fn count_artifacts(&self, id: NodeId) -> TreeResult<usize> {
        let mut count = 0;
        for node in self.descendants(id)? {
            let node = self.node(node)?;
            if node.is_unique() && node.artifact().is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Number of levels of the subtree. A leaf has depth 1.
    pub fn compute_depth(&self, id: NodeId) -> TreeResult<usize> {
        let mut deepest = 0;
        for child in self.children(id)? {
            deepest = deepest.max(self.compute_depth(*child)?);
        }
        Ok(deepest + 1)
    }

    /// Owned artifacts per depth, the subtree root being depth 0.
    pub fn count_artifacts_per_depth(&self, id: NodeId) -> TreeResult<BTreeMap<usize, usize>> {
        let mut counts = BTreeMap::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((current, depth)) = stack.pop() {
            let node = self.node(current)?;
            if node.is_unique() && node.artifact().is_some() {
                *counts.entry(depth).or_insert(0) += 1;
            }
            stack.extend(node.children().iter().map(|c| (*c, depth + 1)));
        }
        Ok(counts)
    }
}
