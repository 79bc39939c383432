//! Store module provides the core tree engine.
//!
//! A `TreeStore` maps validated paths onto records in an injected flat
//! backend. At any instant a path holds either a scalar value or a
//! container of child segments, never both: writing a value over a
//! container cascades a delete of the former subtree first, and deleting
//! the last child of a container compacts the container away, upward to
//! the root. Every operation locks the full prefix chain of its path
//! root-to-leaf before touching the backend, and every mutation enqueues a
//! change notification per path it actually altered before returning.

use crate::adapter::BackendAdapter;
use crate::backend::FlatBackend;
use crate::encryption::EncryptionProvider;
use crate::lock::LockTable;
use crate::notify::ChangeDispatcher;
use crate::path::TreePath;
use crate::record::{NodeKind, Record};
use crate::{Error, Result};
use tracing::debug;

/// One step of the upward compaction after a delete: the parent either
/// loses its record entirely or keeps a shortened child list.
enum Compaction {
    Remove,
    Rewrite(Vec<String>),
}

/// Hierarchical key-value engine over a flat backend.
///
/// Operations are safe to call from multiple threads against one shared
/// instance (callers typically hold it in an `Arc`). Reads on a path run
/// concurrently; mutations serialize with other operations at every shared
/// prefix.
pub struct TreeStore {
    adapter: BackendAdapter,
    locks: LockTable,
    dispatcher: ChangeDispatcher,
}

impl TreeStore {
    /// Creates a store over a backend with no encryption.
    pub fn new(backend: Box<dyn FlatBackend>) -> Self {
        Self {
            adapter: BackendAdapter::new(backend),
            locks: LockTable::new(),
            dispatcher: ChangeDispatcher::new(),
        }
    }

    /// Creates a store that encrypts keys and values through `provider`.
    pub fn with_encryption(
        backend: Box<dyn FlatBackend>,
        provider: Box<dyn EncryptionProvider>,
    ) -> Self {
        Self {
            adapter: BackendAdapter::with_encryption(backend, provider),
            locks: LockTable::new(),
            dispatcher: ChangeDispatcher::new(),
        }
    }

    /// The change dispatcher delivering notifications for this store.
    pub fn changes(&self) -> &ChangeDispatcher {
        &self.dispatcher
    }

    /// Direct access to the wrapped backend, for setup and inspection.
    pub fn backend(&self) -> parking_lot::MutexGuard<'_, Box<dyn FlatBackend>> {
        self.adapter.backend()
    }

    /// Reads and decodes the record at a path, if any.
    fn read_record(&self, path: &TreePath) -> Result<Option<Record>> {
        match self.adapter.get(path)? {
            Some(raw) => Record::decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Whether any record (value or container) exists at the path.
    pub fn contains(&self, path: &TreePath) -> Result<bool> {
        let _chain = self.locks.lock_read(path);
        self.adapter.contains(path)
    }

    /// The scalar payload at the path, or `None` for a container or a
    /// missing node.
    pub fn get_value(&self, path: &TreePath) -> Result<Option<String>> {
        let _chain = self.locks.lock_read(path);
        match self.read_record(path)? {
            Some(Record::Value(payload)) => Ok(Some(payload)),
            _ => Ok(None),
        }
    }

    /// Writes a scalar value at the path.
    ///
    /// If the path currently holds a container, its entire subtree is
    /// deleted first. Missing ancestors are created as containers and an
    /// ancestor that does not list the next segment toward the path has it
    /// added; repair walks from the deepest ancestor upward and stops at
    /// the first ancestor that already lists its child, since every other
    /// mutation re-establishes that invariant before returning. One change
    /// notification is enqueued per path actually mutated.
    pub fn set_value(&self, path: &TreePath, value: &str) -> Result<()> {
        let mut chain = self.locks.lock_upgradable(path);

        // Plan every write under the upgradable chain before escalating
        // anything: the upgradable guards exclude other mutators through
        // every shared prefix, so the plan cannot go stale, and escalation
        // can then follow the same root-to-leaf order as acquisition.
        let cascade_children = match self.read_record(path)? {
            Some(Record::Container(children)) => children,
            _ => Vec::new(),
        };

        // Ancestor repair plan, deepest upward. An ancestor that already
        // lists its child implies every shallower ancestor is correct,
        // since all mutations re-establish that before returning.
        let mut repairs: Vec<(usize, Record)> = Vec::new();
        for depth in (1..path.len()).rev() {
            let ancestor = path.prefix(depth);
            let child_segment = &path.segments()[depth];
            match self.read_record(&ancestor)? {
                Some(Record::Container(children))
                    if children.iter().any(|c| c == child_segment) =>
                {
                    break;
                }
                Some(Record::Container(mut children)) => {
                    children.push(child_segment.clone());
                    repairs.push((depth, Record::Container(children)));
                }
                // A value ancestor converts to a container; a missing one
                // is created fresh.
                Some(Record::Value(_)) | None => {
                    repairs.push((depth, Record::Container(vec![child_segment.clone()])));
                }
            }
        }

        for (depth, _) in repairs.iter().rev() {
            chain.escalate(*depth);
        }
        chain.escalate(path.len());

        let mut touched = Vec::new();

        // A former container loses its whole subtree, children first.
        for segment in cascade_children {
            self.delete_subtree(&path.child(segment)?, &mut touched)?;
        }

        for (depth, record) in &repairs {
            let ancestor = path.prefix(*depth);
            self.adapter.set(&ancestor, &record.encode())?;
            touched.push(ancestor);
        }

        self.adapter
            .set(path, &Record::Value(value.to_string()).encode())?;
        touched.push(path.clone());

        debug!(%path, mutated = touched.len(), "set value");
        self.dispatcher.notify(touched);
        Ok(())
    }

    /// Deletes the node at the path and everything below it.
    ///
    /// Children are removed before their parent. Afterwards the path's own
    /// segment is removed from its parent's child list; a parent left with
    /// no children is removed too, repeating upward until a parent retains
    /// other children. Deleting a missing path is a no-op. One change
    /// notification is enqueued per removed or rewritten path.
    pub fn delete(&self, path: &TreePath) -> Result<()> {
        let mut chain = self.locks.lock_upgradable(path);
        if self.read_record(path)?.is_none() {
            return Ok(());
        }

        // Plan the upward compaction before escalating, for the same
        // reason set_value plans: escalation must stay root-to-leaf. A
        // corrupt parent chain surfaces here, before anything is mutated.
        let mut compactions: Vec<(usize, Compaction)> = Vec::new();
        let mut current = path.clone();
        while let Some(parent) = current.parent() {
            let segment = current.leaf().to_string();
            let children = match self.read_record(&parent)? {
                Some(Record::Container(children)) => children,
                Some(Record::Value(_)) => {
                    return Err(Error::Corruption(format!(
                        "parent of {current} holds a value record"
                    )));
                }
                None => {
                    return Err(Error::Corruption(format!(
                        "parent container of {current} is missing"
                    )));
                }
            };
            let remaining: Vec<String> =
                children.into_iter().filter(|c| *c != segment).collect();
            if remaining.is_empty() {
                compactions.push((parent.len(), Compaction::Remove));
                current = parent;
            } else {
                compactions.push((parent.len(), Compaction::Rewrite(remaining)));
                break;
            }
        }

        for (depth, _) in compactions.iter().rev() {
            chain.escalate(*depth);
        }
        chain.escalate(path.len());

        let mut touched = Vec::new();
        self.delete_subtree(path, &mut touched)?;
        for (depth, action) in &compactions {
            let ancestor = path.prefix(*depth);
            match action {
                Compaction::Remove => self.adapter.delete(&ancestor)?,
                Compaction::Rewrite(children) => self
                    .adapter
                    .set(&ancestor, &Record::Container(children.clone()).encode())?,
            }
            touched.push(ancestor);
        }

        debug!(%path, mutated = touched.len(), "deleted");
        self.dispatcher.notify(touched);
        Ok(())
    }

    /// Removes the record at `path` and, depth-first, everything below it.
    fn delete_subtree(&self, path: &TreePath, touched: &mut Vec<TreePath>) -> Result<()> {
        match self.read_record(path)? {
            None => Ok(()),
            Some(Record::Value(_)) => {
                self.adapter.delete(path)?;
                touched.push(path.clone());
                Ok(())
            }
            Some(Record::Container(children)) => {
                for segment in children {
                    self.delete_subtree(&path.child(segment)?, touched)?;
                }
                self.adapter.delete(path)?;
                touched.push(path.clone());
                Ok(())
            }
        }
    }

    /// The child segment names of the container at the path.
    ///
    /// A missing node or a value node has no children.
    pub fn children(&self, path: &TreePath) -> Result<Vec<String>> {
        let _chain = self.locks.lock_read(path);
        match self.read_record(path)? {
            Some(Record::Container(children)) => Ok(children),
            _ => Ok(Vec::new()),
        }
    }

    /// One level of expansion: each child as an absolute path, classified
    /// by probing its own record.
    pub fn typed_children(&self, path: &TreePath) -> Result<Vec<(TreePath, NodeKind)>> {
        let _chain = self.locks.lock_read(path);
        let mut out = Vec::new();
        for segment in self.container_children(path)? {
            let child = path.child(segment)?;
            let kind = self.probe_kind(&child)?;
            out.push((child, kind));
        }
        Ok(out)
    }

    /// One level of expansion: each child as its bare segment name,
    /// classified by probing its own record.
    pub fn relative_typed_children(&self, path: &TreePath) -> Result<Vec<(String, NodeKind)>> {
        let _chain = self.locks.lock_read(path);
        let mut out = Vec::new();
        for segment in self.container_children(path)? {
            let kind = self.probe_kind(&path.child(segment.clone())?)?;
            out.push((segment, kind));
        }
        Ok(out)
    }

    /// Depth-first traversal collecting the absolute paths of every
    /// terminal value node at or below the path.
    pub fn recursive_children(&self, path: &TreePath) -> Result<Vec<TreePath>> {
        let _chain = self.locks.lock_read(path);
        let mut out = Vec::new();
        self.collect_value_paths(path, &mut out)?;
        Ok(out)
    }

    /// Like [`recursive_children`](Self::recursive_children), but each
    /// result holds only the segments below the traversal root. When the
    /// root itself is the value node the result holds one empty sequence.
    pub fn relative_recursive_children(&self, path: &TreePath) -> Result<Vec<Vec<String>>> {
        let _chain = self.locks.lock_read(path);
        let mut absolute = Vec::new();
        self.collect_value_paths(path, &mut absolute)?;
        Ok(absolute
            .into_iter()
            .map(|p| p.segments()[path.len()..].to_vec())
            .collect())
    }

    /// Depth-first traversal collecting the payloads of every terminal
    /// value node at or below the path.
    pub fn recursive_values(&self, path: &TreePath) -> Result<Vec<String>> {
        let _chain = self.locks.lock_read(path);
        let mut out = Vec::new();
        self.collect_payloads(path, &mut out)?;
        Ok(out)
    }

    /// Walks from the path toward the root and returns the first node
    /// (including the path itself) that has any record, classified as
    /// value or container. Resolves "does anything exist along this chain"
    /// without assuming the leaf exists.
    pub fn nearest_node(&self, path: &TreePath) -> Result<Option<(TreePath, NodeKind)>> {
        let _chain = self.locks.lock_read(path);
        let mut current = Some(path.clone());
        while let Some(candidate) = current {
            if let Some(record) = self.read_record(&candidate)? {
                return Ok(Some((candidate, record.kind())));
            }
            current = candidate.parent();
        }
        Ok(None)
    }

    fn container_children(&self, path: &TreePath) -> Result<Vec<String>> {
        match self.read_record(path)? {
            Some(Record::Container(children)) => Ok(children),
            _ => Ok(Vec::new()),
        }
    }

    /// Classifies a node that a container lists as its child. A listed
    /// child with no record violates the tree's invariants.
    fn probe_kind(&self, path: &TreePath) -> Result<NodeKind> {
        match self.read_record(path)? {
            Some(record) => Ok(record.kind()),
            None => Err(Error::Corruption(format!(
                "listed child {path} has no record"
            ))),
        }
    }

    fn collect_value_paths(&self, path: &TreePath, out: &mut Vec<TreePath>) -> Result<()> {
        match self.read_record(path)? {
            None => Ok(()),
            Some(Record::Value(_)) => {
                out.push(path.clone());
                Ok(())
            }
            Some(Record::Container(children)) => {
                for segment in children {
                    self.collect_value_paths(&path.child(segment)?, out)?;
                }
                Ok(())
            }
        }
    }

    fn collect_payloads(&self, path: &TreePath, out: &mut Vec<String>) -> Result<()> {
        match self.read_record(path)? {
            None => Ok(()),
            Some(Record::Value(payload)) => {
                out.push(payload);
                Ok(())
            }
            Some(Record::Container(children)) => {
                for segment in children {
                    self.collect_payloads(&path.child(segment)?, out)?;
                }
                Ok(())
            }
        }
    }
}
