//! Structural fingerprints of subtrees.
//!
//! A fingerprint covers the data, the `ordered` and `atomic` flags and the
//! children of every node of a subtree. Children of unordered nodes are
//! hashed as a sorted set, children of ordered nodes in their current order.
//! Uniqueness, sequence numbers, references and properties are ignored, so two
//! trees that describe the same content fingerprint equally no matter how
//! their artifacts are shared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash;
use crate::error::TreeResult;
use crate::forest::Forest;
use crate::types::{ArtifactData, NodeId};
use crate::TREE_SCHEMA_VERSION;

/// Hex encoded structural hash of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeFingerprint(String);

impl TreeFingerprint {
    /// Get the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize)]
struct CanonicalNode<'a, D> {
    schema: &'a str,
    data: Option<&'a D>,
    ordered: bool,
    atomic: bool,
    children: Vec<u64>,
}

impl<D: ArtifactData> Forest<D> {
    fn subtree_hash(&self, id: NodeId) -> TreeResult<u64> {
        let ordered = self.is_ordered(id)?;
        let mut children = Vec::new();
        for child in self.children(id)? {
            children.push(self.subtree_hash(*child)?);
        }
        if !ordered {
            children.sort_unstable();
        }
        canonical_hash(&CanonicalNode {
            schema: TREE_SCHEMA_VERSION,
            data: self.node_data(id)?,
            ordered,
            atomic: self.is_atomic(id)?,
            children,
        })
    }

    /// Fingerprint of the subtree rooted at `id`.
    pub fn fingerprint(&self, id: NodeId) -> TreeResult<TreeFingerprint> {
        Ok(TreeFingerprint(format!("{:016x}", self.subtree_hash(id)?)))
    }

    /// Whether two subtrees describe the same content.
    pub fn structurally_equivalent(&self, a: NodeId, b: NodeId) -> TreeResult<bool> {
        Ok(self.subtree_hash(a)? == self.subtree_hash(b)?)
    }
}
