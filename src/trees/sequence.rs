//! Sequencing of whole trees.

use crate::error::TreeResult;
use crate::forest::Forest;
use crate::types::{ArtifactData, NodeId};

impl<D: ArtifactData> Forest<D> {
    /// Give every ordered artifact of the tree a sequence graph and number
    /// every child that has no number yet.
    ///
    /// Children are processed before their parents. Running the pass twice
    /// changes nothing.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn sequence(&mut self, root: NodeId) -> TreeResult<()> {
        let order = self.descendants(root)?;
        for node in order.into_iter().rev() {
            self.ensure_sequenced(node)?;
        }
        self.verify(root)
    }
}
