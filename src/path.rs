//! Path module provides the addressing scheme for nodes in the tree.
//!
//! A `TreePath` is an ordered, non-empty sequence of non-empty string
//! segments. Two paths are equal iff their segment sequences are equal
//! element-wise. Paths encode reversibly to a single opaque string (a JSON
//! string array), which is the key format used against the flat backend.

use crate::{Error, Result};
use std::fmt;

/// An ordered, validated sequence of string segments addressing one node.
///
/// Validation happens at construction: a `TreePath` is never empty and
/// never contains an empty segment, so operations taking `&TreePath` do not
/// re-validate. Deserializing a path therefore goes through
/// [`decode`](Self::decode), never through serde directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// Creates a new `TreePath` from a sequence of segments.
    ///
    /// # Returns
    /// `Error::InvalidPath` if the sequence is empty or any segment is empty.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::InvalidPath("path has no segments".to_string()));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::InvalidPath("path contains an empty segment".to_string()));
        }
        Ok(Self { segments })
    }

    /// The segments of this path, root-to-leaf.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; a `TreePath` cannot be empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The last segment.
    pub fn leaf(&self) -> &str {
        // Non-empty by construction.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The parent path, or `None` for a top-level path.
    pub fn parent(&self) -> Option<TreePath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(TreePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The leading sub-path of the given depth (1..=len).
    ///
    /// # Panics
    /// Panics if `depth` is zero or exceeds the path length.
    pub fn prefix(&self, depth: usize) -> TreePath {
        assert!(depth >= 1 && depth <= self.segments.len());
        TreePath {
            segments: self.segments[..depth].to_vec(),
        }
    }

    /// A path one segment longer, addressing a child of this node.
    pub fn child(&self, segment: impl Into<String>) -> Result<TreePath> {
        let segment = segment.into();
        if segment.is_empty() {
            return Err(Error::InvalidPath("child segment is empty".to_string()));
        }
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(TreePath { segments })
    }

    /// Encodes this path as a single opaque string key.
    ///
    /// The encoding is a JSON string array, which is injective over segment
    /// sequences: distinct paths can never collide on the same key.
    pub fn encode(&self) -> String {
        // Serializing a Vec<String> cannot fail.
        serde_json::to_string(&self.segments).unwrap_or_default()
    }

    /// Decodes a key produced by [`encode`](Self::encode) back into a path.
    ///
    /// Malformed input yields `None` rather than an error.
    pub fn decode(key: &str) -> Option<TreePath> {
        let segments: Vec<String> = serde_json::from_str(key).ok()?;
        TreePath::new(segments).ok()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
