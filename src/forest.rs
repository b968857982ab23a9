//! Arena holding every node and artifact of the trees taking part in an
//! operation chain.
//!
//! Nodes and artifacts are addressed by copyable handles. Back-references
//! (a node's parent, an artifact's containing node) are handles as well, so
//! moving a subtree between trees never invalidates anything.

use std::collections::{BTreeMap, HashSet};

use generational_arena::Arena;

use crate::config::ForestConfig;
use crate::error::{ConsistencyViolation, TreeError, TreeResult};
use crate::markers::Markers;
use crate::sequence_graph::{SequenceGraph, SequenceItem, SequenceNumber};
use crate::types::{
    Artifact, ArtifactData, ArtifactId, ArtifactOptions, ArtifactReference, AssociationId, Node,
    NodeId, NodeKind, Properties,
};

/// Owner of all nodes and artifacts.
#[derive(Debug)]
pub struct Forest<D> {
    nodes: Arena<Node>,
    artifacts: Arena<Artifact<D>>,
    config: ForestConfig,
}

impl<D: ArtifactData> Default for Forest<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ArtifactData> Forest<D> {
    /// Create an empty forest with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ForestConfig::default())
    }

    /// Create an empty forest.
    pub fn with_config(config: ForestConfig) -> Self {
        Self {
            nodes: Arena::new(),
            artifacts: Arena::new(),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live artifacts.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Create a new, empty tree and return its root.
    pub fn create_root(&mut self) -> NodeId {
        NodeId(self.nodes.insert(Node::root(None)))
    }

    /// Create a new tree anchored to `association`.
    pub fn create_root_for(&mut self, association: AssociationId) -> NodeId {
        NodeId(self.nodes.insert(Node::root(Some(association))))
    }

    /// Change the association anchor of a root.
    pub fn set_association(
        &mut self,
        root: NodeId,
        association: Option<AssociationId>,
    ) -> TreeResult<()> {
        let node = self.node_mut(root)?;
        match &mut node.kind {
            NodeKind::Root { association: slot } => {
                *slot = association;
                Ok(())
            }
            NodeKind::Inner => Err(ConsistencyViolation::NotARoot(root).into()),
        }
    }

    /// Create a detached artifact.
    pub fn create_artifact(&mut self, data: D, options: ArtifactOptions) -> ArtifactId {
        ArtifactId(self.artifacts.insert(Artifact::new(data, options)))
    }

    /// Create a unique node owning `artifact`.
    ///
    /// Fails when another node already owns the artifact.
    pub fn create_node(&mut self, artifact: ArtifactId) -> TreeResult<NodeId> {
        if let Some(owner) = self.artifact(artifact)?.containing_node {
            return Err(ConsistencyViolation::ArtifactAlreadyContained {
                artifact,
                node: owner,
            }
            .into());
        }
        let node = self.insert_node(Node::inner(artifact, true));
        self.artifact_mut(artifact)?.containing_node = Some(node);
        Ok(node)
    }

    /// Create an artifact with a unique node and append it to `parent`.
    pub fn add_artifact(
        &mut self,
        parent: NodeId,
        data: D,
        options: ArtifactOptions,
    ) -> TreeResult<NodeId> {
        let artifact = self.create_artifact(data, options);
        let node = self.create_node(artifact)?;
        if let Err(e) = self.add_child(parent, node) {
            self.nodes.remove(node.0);
            self.artifacts.remove(artifact.0);
            return Err(e);
        }
        Ok(node)
    }

    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        NodeId(self.nodes.insert(node))
    }

    /// Create a placeholder referring to `artifact` without owning it.
    pub(crate) fn create_placeholder(&mut self, artifact: ArtifactId) -> NodeId {
        self.insert_node(Node::inner(artifact, false))
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> TreeResult<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| ConsistencyViolation::UnknownNode(id).into())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| ConsistencyViolation::UnknownNode(id).into())
    }

    /// Look up an artifact.
    pub fn artifact(&self, id: ArtifactId) -> TreeResult<&Artifact<D>> {
        self.artifacts
            .get(id.0)
            .ok_or_else(|| ConsistencyViolation::UnknownArtifact(id).into())
    }

    pub(crate) fn artifact_mut(&mut self, id: ArtifactId) -> TreeResult<&mut Artifact<D>> {
        self.artifacts
            .get_mut(id.0)
            .ok_or_else(|| ConsistencyViolation::UnknownArtifact(id).into())
    }

    /// Whether the handle refers to a live node.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    /// Whether the handle refers to a live artifact.
    pub fn contains_artifact(&self, id: ArtifactId) -> bool {
        self.artifacts.contains(id.0)
    }

    /// Children of a node in order.
    pub fn children(&self, id: NodeId) -> TreeResult<&[NodeId]> {
        Ok(self.node(id)?.children.as_slice())
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// The data of the node's artifact. Roots have none.
    pub fn node_data(&self, id: NodeId) -> TreeResult<Option<&D>> {
        match self.node(id)?.artifact {
            Some(artifact) => Ok(Some(&self.artifact(artifact)?.data)),
            None => Ok(None),
        }
    }

    /// Whether the node is atomic. Roots never are.
    pub fn is_atomic(&self, id: NodeId) -> TreeResult<bool> {
        match self.node(id)?.artifact {
            Some(artifact) => Ok(self.artifact(artifact)?.atomic),
            None => Ok(false),
        }
    }

    /// Whether the node's children are ordered. Roots are unordered.
    pub fn is_ordered(&self, id: NodeId) -> TreeResult<bool> {
        match self.node(id)?.artifact {
            Some(artifact) => Ok(self.artifact(artifact)?.ordered),
            None => Ok(false),
        }
    }

    /// Whether the node owns its artifact.
    pub fn is_unique(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.node(id)?.unique)
    }

    /// Topmost ancestor of a node.
    pub fn root_of(&self, id: NodeId) -> TreeResult<NodeId> {
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// The association of the tree the node belongs to.
    pub fn containing_association(&self, id: NodeId) -> TreeResult<Option<AssociationId>> {
        let root = self.root_of(id)?;
        Ok(self.node(root)?.association())
    }

    /// The node and all its descendants in preorder.
    pub fn descendants(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Append `child` to `parent`.
    ///
    /// A sequence number the child carries is kept only when the sequence
    /// graph of `parent` holds the child's data at that slot.
    ///
    /// Fails with [`TreeError::StructuralConflict`] when `parent` is unordered
    /// and already holds an equal child, and with
    /// [`TreeError::InconsistentState`] when `child` is a root, is already
    /// attached, or is an ancestor of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.is_root() {
            return Err(ConsistencyViolation::RootAttachment(child).into());
        }
        if let Some(current) = child_node.parent {
            return Err(ConsistencyViolation::DoubleAttachment {
                node: child,
                parent: current,
            }
            .into());
        }
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(ConsistencyViolation::AncestorAttachment {
                    node: child,
                    parent,
                }
                .into());
            }
            cursor = self.node(ancestor)?.parent;
        }

        if !self.is_ordered(parent)? {
            if let Some(artifact) = self.node(child)?.artifact {
                for sibling in self.children(parent)? {
                    if let Some(existing) = self.node(*sibling)?.artifact {
                        if self.artifacts_equal(existing, artifact)? {
                            return Err(TreeError::StructuralConflict {
                                parent,
                                data: self.artifact(artifact)?.data.to_string(),
                            });
                        }
                    }
                }
            }
        }

        self.release_stale_number(parent, child)?;
        self.attach(parent, child)
    }

    /// Drop the sequence number of `child` unless the graph of `parent` has
    /// a slot for it holding the child's data.
    fn release_stale_number(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let Some(artifact) = self.node(child)?.artifact else {
            return Ok(());
        };
        let Some(number) = self.artifact(artifact)?.sequence_number else {
            return Ok(());
        };
        let data = &self.artifact(artifact)?.data;
        let keep = match self.ordered_artifact(parent)? {
            Some(owner) => match &self.artifact(owner)?.sequence_graph {
                Some(graph) => graph.slot(number) == Some(data),
                None => false,
            },
            None => false,
        };
        if !keep {
            tracing::trace!(artifact = %artifact, number = %number, "Released stale sequence number");
            self.artifact_mut(artifact)?.sequence_number = None;
        }
        Ok(())
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if !self.node(parent)?.children.contains(&child) {
            return Err(ConsistencyViolation::NotAChild { parent, child }.into());
        }
        self.detach(child)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    pub(crate) fn detach(&mut self, child: NodeId) -> TreeResult<()> {
        if let Some(parent) = self.node_mut(child)?.parent.take() {
            self.node_mut(parent)?.children.retain(|c| *c != child);
        }
        Ok(())
    }

    /// Free a detached subtree and every artifact owned by its nodes.
    ///
    /// References held by other artifacts to the freed ones are removed.
    pub fn discard_subtree(&mut self, id: NodeId) -> TreeResult<()> {
        if self.node(id)?.parent.is_some() {
            return Err(ConsistencyViolation::StillAttached(id).into());
        }
        for node_id in self.descendants(id)? {
            let node = self
                .nodes
                .remove(node_id.0)
                .ok_or(ConsistencyViolation::UnknownNode(node_id))?;
            if let Some(artifact) = node.artifact {
                let owned = self
                    .artifacts
                    .get(artifact.0)
                    .is_some_and(|a| a.containing_node == Some(node_id));
                if owned {
                    self.free_artifact(artifact)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn free_node(&mut self, id: NodeId) -> TreeResult<()> {
        self.detach(id)?;
        self.nodes
            .remove(id.0)
            .map(|_| ())
            .ok_or_else(|| ConsistencyViolation::UnknownNode(id).into())
    }

    fn free_artifact(&mut self, id: ArtifactId) -> TreeResult<()> {
        let artifact = self
            .artifacts
            .remove(id.0)
            .ok_or(ConsistencyViolation::UnknownArtifact(id))?;
        for reference in artifact.uses.iter().chain(artifact.used_by.iter()) {
            for end in [reference.source(), reference.target()] {
                if end != id {
                    if let Some(other) = self.artifacts.get_mut(end.0) {
                        other.uses.retain(|r| r != reference);
                        other.used_by.retain(|r| r != reference);
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove a childless placeholder from its parent and free it.
    pub(crate) fn prune_placeholder(&mut self, id: NodeId) -> TreeResult<bool> {
        let node = self.node(id)?;
        if node.unique || node.is_root() || !node.children.is_empty() {
            return Ok(false);
        }
        self.free_node(id)?;
        Ok(true)
    }

    /// Consume the markers of a finished chain and free every superseded
    /// artifact that no node refers to anymore. Returns how many were freed.
    pub fn discard_superseded(&mut self, markers: Markers) -> TreeResult<usize> {
        let referenced: HashSet<ArtifactId> =
            self.nodes.iter().filter_map(|(_, n)| n.artifact).collect();
        let mut freed = 0;
        for artifact in markers.superseded() {
            let orphan = self
                .artifacts
                .get(artifact.0)
                .is_some_and(|a| a.containing_node.is_none());
            if orphan && !referenced.contains(&artifact) {
                self.free_artifact(artifact)?;
                freed += 1;
            }
        }
        tracing::debug!(freed, "Discarded superseded artifacts");
        Ok(freed)
    }

    // ---------------------------------------------------------------------
    // References and properties
    // ---------------------------------------------------------------------

    /// Record that `source` depends on `target`.
    ///
    /// Returns `false` when an identical reference already exists.
    pub fn add_uses(
        &mut self,
        source: ArtifactId,
        target: ArtifactId,
        reference_type: Option<&str>,
    ) -> TreeResult<bool> {
        self.artifact(target)?;
        let reference = ArtifactReference::new(source, target, reference_type.map(String::from));
        if self.artifact(source)?.uses.contains(&reference) {
            return Ok(false);
        }
        self.artifact_mut(source)?.uses.push(reference.clone());
        let target_artifact = self.artifact_mut(target)?;
        if !target_artifact.used_by.contains(&reference) {
            target_artifact.used_by.push(reference);
        }
        Ok(true)
    }

    /// Whether `source` depends on `target`.
    pub fn uses(&self, source: ArtifactId, target: ArtifactId) -> TreeResult<bool> {
        Ok(self.artifact(source)?.uses_artifact(target))
    }

    /// Mutable property map of a node.
    pub fn node_properties_mut(&mut self, id: NodeId) -> TreeResult<&mut Properties> {
        Ok(&mut self.node_mut(id)?.properties)
    }

    /// Mutable property map of an artifact.
    pub fn artifact_properties_mut(&mut self, id: ArtifactId) -> TreeResult<&mut Properties> {
        Ok(&mut self.artifact_mut(id)?.properties)
    }

    // ---------------------------------------------------------------------
    // Helpers shared by the tree algorithms
    // ---------------------------------------------------------------------

    pub(crate) fn artifacts_equal(&self, a: ArtifactId, b: ArtifactId) -> TreeResult<bool> {
        if a == b {
            return Ok(true);
        }
        Ok(self.artifact(a)? == self.artifact(b)?)
    }

    /// Child artifacts of a node, skipping children without one.
    pub(crate) fn child_artifacts(&self, id: NodeId) -> TreeResult<Vec<(NodeId, ArtifactId)>> {
        let mut out = Vec::new();
        for child in self.children(id)? {
            if let Some(artifact) = self.node(*child)?.artifact {
                out.push((*child, artifact));
            }
        }
        Ok(out)
    }

    pub(crate) fn require_root(&self, id: NodeId) -> TreeResult<()> {
        let node = self.node(id)?;
        if !node.is_root() || node.parent.is_some() {
            return Err(ConsistencyViolation::NotARoot(id).into());
        }
        Ok(())
    }

    fn ordered_artifact(&self, id: NodeId) -> TreeResult<Option<ArtifactId>> {
        match self.node(id)?.artifact {
            Some(artifact) if self.artifact(artifact)?.ordered => Ok(Some(artifact)),
            _ => Ok(None),
        }
    }

    fn sequence_items(&self, id: NodeId) -> TreeResult<Vec<(ArtifactId, SequenceItem<D>)>> {
        let mut items = Vec::new();
        for (_, artifact) in self.child_artifacts(id)? {
            let a = self.artifact(artifact)?;
            items.push((
                artifact,
                SequenceItem {
                    data: a.data.clone(),
                    anchor: a.sequence_number,
                },
            ));
        }
        Ok(items)
    }

    /// Sequence the children of `id` against the graph of `graph_owner`.
    fn sequence_children_into(&mut self, id: NodeId, graph_owner: ArtifactId) -> TreeResult<()> {
        let entries = self.sequence_items(id)?;
        let items: Vec<SequenceItem<D>> = entries.iter().map(|(_, item)| item.clone()).collect();

        let owner = self.artifact_mut(graph_owner)?;
        let graph = owner.sequence_graph.get_or_insert_with(SequenceGraph::new);
        let alignment = graph.sequence(&items)?;

        if alignment.ties > 0 && self.config.warn_on_ambiguous_match {
            tracing::warn!(
                node = %id,
                ties = alignment.ties,
                "Ordered children matched ambiguously, first candidate taken"
            );
        }
        for ((artifact, _), number) in entries.iter().zip(alignment.numbers) {
            self.artifact_mut(*artifact)?.sequence_number = Some(number);
        }
        Ok(())
    }

    /// Give an ordered node a sequence graph and number its children.
    ///
    /// Does nothing for unordered nodes and for nodes whose children all
    /// carry numbers known to the graph.
    pub(crate) fn ensure_sequenced(&mut self, id: NodeId) -> TreeResult<()> {
        let Some(artifact) = self.ordered_artifact(id)? else {
            return Ok(());
        };
        let numbered = match &self.artifact(artifact)?.sequence_graph {
            Some(graph) => self
                .sequence_items(id)?
                .iter()
                .all(|(_, item)| item.anchor.is_some_and(|n| graph.slot(n) == Some(&item.data))),
            None => false,
        };
        if numbered {
            return Ok(());
        }
        self.sequence_children_into(id, artifact)
    }

    /// Bring the children of two matched ordered nodes into one numbering:
    /// the sequence graph of `left`.
    pub(crate) fn align_ordered(&mut self, left: NodeId, right: NodeId) -> TreeResult<()> {
        self.ensure_sequenced(left)?;
        let (Some(la), Some(ra)) = (self.ordered_artifact(left)?, self.ordered_artifact(right)?)
        else {
            return Ok(());
        };
        if la == ra {
            return self.ensure_sequenced(right);
        }

        if let Some(right_graph) = self.artifact_mut(ra)?.sequence_graph.take() {
            let mapping = match self.artifact_mut(la)?.sequence_graph.as_mut() {
                Some(graph) => graph.merge(&right_graph)?,
                None => BTreeMap::new(),
            };
            for (_, artifact) in self.child_artifacts(right)? {
                let child = self.artifact_mut(artifact)?;
                child.sequence_number = child.sequence_number.and_then(|n| mapping.get(&n).copied());
            }
        }

        self.sequence_children_into(right, la)?;
        let graph = self.artifact(la)?.sequence_graph.clone();
        self.artifact_mut(ra)?.sequence_graph = graph;
        Ok(())
    }

    /// Reorder the children of an ordered node along its sequence graph.
    ///
    /// Unnumbered children keep their relative order after the numbered ones.
    pub(crate) fn reorder_children(&mut self, id: NodeId) -> TreeResult<()> {
        let Some(artifact) = self.ordered_artifact(id)? else {
            return Ok(());
        };
        let Some(graph) = self.artifact(artifact)?.sequence_graph.as_ref() else {
            return Ok(());
        };

        let mut numbers: Vec<Option<SequenceNumber>> = Vec::new();
        for child in self.children(id)? {
            let number = match self.node(*child)?.artifact {
                Some(a) => self.artifact(a)?.sequence_number,
                None => None,
            };
            numbers.push(number);
        }
        let known: Vec<SequenceNumber> = numbers.iter().flatten().copied().collect();
        let order = graph.linearize(&known)?;
        let rank: BTreeMap<SequenceNumber, usize> =
            order.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut keyed: Vec<(usize, NodeId)> = self
            .children(id)?
            .iter()
            .zip(numbers)
            .map(|(child, number)| {
                let key = number.and_then(|n| rank.get(&n).copied()).unwrap_or(usize::MAX);
                (key, *child)
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        self.node_mut(id)?.children = keyed.into_iter().map(|(_, child)| child).collect();
        Ok(())
    }

    /// Run a consistency check when the configuration asks for it.
    pub(crate) fn verify(&self, root: NodeId) -> TreeResult<()> {
        if self.config.verify_after_operations {
            self.check_consistency(root)?;
        }
        Ok(())
    }
}
