//! Interfaces to artifact format plugins.
//!
//! Plugins translate external inputs (files, documents, images) into
//! artifact trees and back. The kernel itself never parses or writes
//! anything; it only defines the seams.

use std::sync::Arc;

use crate::forest::Forest;
use crate::types::{ArtifactData, NodeId};

/// Builds artifact trees from external input.
pub trait ArtifactReader<D: ArtifactData> {
    /// Input type, e.g. a path or an in-memory document.
    type Input: ?Sized;
    /// Error type for read operations.
    type Error: std::error::Error + Send + Sync;

    /// Identifier of the plugin.
    fn plugin_id(&self) -> &str;

    /// Read `input` into a new tree of `forest` and return its root.
    fn read(&self, forest: &mut Forest<D>, input: &Self::Input) -> Result<NodeId, Self::Error>;
}

/// Notified whenever a writer produced an output.
pub trait WriteListener<O>: Send + Sync {
    /// Called once per written output.
    fn file_written(&self, plugin_id: &str, output: &O);
}

/// Writes artifact trees back to their external form.
pub trait ArtifactWriter<D: ArtifactData> {
    /// Output type, e.g. a path or a rendered document.
    type Output;
    /// Error type for write operations.
    type Error: std::error::Error + Send + Sync;

    /// Identifier of the plugin.
    fn plugin_id(&self) -> &str;

    /// Write the tree rooted at `root`, relative to `base` when given.
    fn write(
        &self,
        forest: &Forest<D>,
        root: NodeId,
        base: Option<&Self::Output>,
    ) -> Result<Vec<Self::Output>, Self::Error>;

    /// Register a listener.
    fn add_listener(&mut self, listener: Arc<dyn WriteListener<Self::Output>>);

    /// Unregister a listener previously added.
    fn remove_listener(&mut self, listener: &Arc<dyn WriteListener<Self::Output>>);
}

/// Listener registry for writer implementations.
pub struct WriteListeners<O> {
    listeners: Vec<Arc<dyn WriteListener<O>>>,
}

impl<O> Default for WriteListeners<O> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<O> WriteListeners<O> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registering the same listener twice is a no-op.
    pub fn add(&mut self, listener: Arc<dyn WriteListener<O>>) {
        if !self.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            self.listeners.push(listener);
        }
    }

    /// Unregister a listener.
    pub fn remove(&mut self, listener: &Arc<dyn WriteListener<O>>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notify every listener about `output`.
    pub fn notify(&self, plugin_id: &str, output: &O) {
        for listener in &self.listeners {
            listener.file_written(plugin_id, output);
        }
    }
}

impl<O> std::fmt::Debug for WriteListeners<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
