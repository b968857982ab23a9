//! Shared helpers for integration tests: a tiny outline format plugin.
//!
//! One artifact per line, two spaces of indentation per level. A trailing
//! `/` marks an unordered container, `:` an ordered one and `#` an atomic
//! one. Lines without suffix are leaves.

#![allow(dead_code)]

use std::sync::Arc;

use artifact_kernel::{
    ArtifactOptions, ArtifactReader, ArtifactWriter, Forest, NodeId, TreeError, WriteListener,
    WriteListeners,
};

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error("line {0}: indentation skips a level")]
    BadIndent(usize),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub struct OutlineReader;

impl ArtifactReader<String> for OutlineReader {
    type Input = str;
    type Error = OutlineError;

    fn plugin_id(&self) -> &str {
        "outline"
    }

    fn read(&self, forest: &mut Forest<String>, input: &str) -> Result<NodeId, OutlineError> {
        let root = forest.create_root();
        let mut stack = vec![root];
        for (number, line) in input.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            let level = indent / 2;
            if level + 1 > stack.len() {
                return Err(OutlineError::BadIndent(number + 1));
            }
            stack.truncate(level + 1);

            let text = line.trim();
            let (name, options) = if let Some(n) = text.strip_suffix('/') {
                (n, ArtifactOptions::unordered())
            } else if let Some(n) = text.strip_suffix(':') {
                (n, ArtifactOptions::ordered())
            } else if let Some(n) = text.strip_suffix('#') {
                (n, ArtifactOptions::atomic())
            } else {
                (text, ArtifactOptions::unordered())
            };

            let parent = stack[level];
            let node = forest.add_artifact(parent, name.to_string(), options)?;
            stack.push(node);
        }
        Ok(root)
    }
}

#[derive(Default)]
pub struct OutlineWriter {
    listeners: WriteListeners<String>,
}

impl OutlineWriter {
    fn render(
        forest: &Forest<String>,
        node: NodeId,
        level: usize,
        out: &mut String,
    ) -> Result<(), TreeError> {
        for child in forest.children(node)? {
            let artifact = forest.artifact(forest.node(*child)?.artifact().ok_or(
                artifact_kernel::ConsistencyViolation::MissingArtifact(*child),
            )?)?;
            let suffix = if artifact.is_ordered() {
                ":"
            } else if artifact.is_atomic() {
                "#"
            } else if forest.children(*child)?.is_empty() {
                ""
            } else {
                "/"
            };
            out.push_str(&format!("{}{}{}\n", "  ".repeat(level), artifact.data(), suffix));
            Self::render(forest, *child, level + 1, out)?;
        }
        Ok(())
    }
}

impl ArtifactWriter<String> for OutlineWriter {
    type Output = String;
    type Error = OutlineError;

    fn plugin_id(&self) -> &str {
        "outline"
    }

    fn write(
        &self,
        forest: &Forest<String>,
        root: NodeId,
        base: Option<&String>,
    ) -> Result<Vec<String>, OutlineError> {
        let mut out = String::new();
        Self::render(forest, root, 0, &mut out)?;
        if base == Some(&out) {
            return Ok(Vec::new());
        }
        self.listeners.notify(self.plugin_id(), &out);
        Ok(vec![out])
    }

    fn add_listener(&mut self, listener: Arc<dyn WriteListener<String>>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&mut self, listener: &Arc<dyn WriteListener<String>>) {
        self.listeners.remove(listener);
    }
}

/// Read an outline into `forest`.
pub fn read(forest: &mut Forest<String>, outline: &str) -> NodeId {
    OutlineReader.read(forest, outline).expect("valid outline")
}

/// Render a tree back into outline form.
pub fn write(forest: &Forest<String>, root: NodeId) -> String {
    OutlineWriter::default()
        .write(forest, root, None)
        .expect("writable tree")
        .pop()
        .unwrap_or_default()
}

/// Data of the children of `node`, in order.
pub fn labels(forest: &Forest<String>, node: NodeId) -> Vec<String> {
    forest
        .children(node)
        .unwrap()
        .iter()
        .map(|c| forest.node_data(*c).unwrap().cloned().unwrap_or_default())
        .collect()
}

/// Follow a path of data values from `root`.
pub fn find(forest: &Forest<String>, root: NodeId, path: &[&str]) -> Option<NodeId> {
    let mut current = root;
    for segment in path {
        current = forest
            .children(current)
            .ok()?
            .iter()
            .copied()
            .find(|c| forest.node_data(*c).ok().flatten().map(String::as_str) == Some(*segment))?;
    }
    Some(current)
}
