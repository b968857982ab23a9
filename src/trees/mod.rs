//! Structural algorithms over pairs of artifact trees.
//!
//! Every algorithm is an inherent method of [`Forest`](crate::Forest):
//!
//! | Method | Module |
//! |--------|--------|
//! | `slice` | [`slice`] |
//! | `merge` | [`merge`] |
//! | `sequence` | [`sequence`] |
//! | `update_artifact_references` | [`references`] |
//! | `extract_marked` | [`extract`] |
//! | `map` | [`map`] |
//! | `check_consistency` | [`consistency`] |
//!
//! A typical decomposition chain is
//!
//! ```text
//! let mut markers = Markers::new();
//! let common = forest.slice(a, b, &mut markers)?;
//! forest.update_artifact_references(a, &markers)?;
//! forest.update_artifact_references(b, &markers)?;
//! forest.update_artifact_references(common, &markers)?;
//! let extracted = forest.extract_marked(b, &mut markers)?;
//! forest.discard_superseded(markers)?;
//! ```

pub mod consistency;
pub mod diagnostics;
pub mod extract;
pub mod map;
pub mod merge;
pub mod references;
pub mod sequence;
pub mod slice;
