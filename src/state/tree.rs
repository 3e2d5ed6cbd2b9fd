/// Directory tree shown in the side pane
///
/// Nodes live in an arena and are loaded lazily: a directory's children are
/// read only when the user expands it, and dropped again on collapse.
use std::path::{Path, PathBuf};

use crate::error::{GalleryError, Result};
use crate::media::scanner::{has_subdirs, list_subdirs};

/// Index of a node in the tree arena
pub type NodeId = usize;

/// Expansion state of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Children not loaded yet
    Unexpanded,
    /// Children loaded and shown
    Expanded,
    /// Children were loaded once and have been dropped
    Collapsed,
}

#[derive(Debug, Clone)]
pub struct DirNode {
    /// Display name (basename)
    pub name: String,
    pub path: PathBuf,
    /// 0 for entries directly under the root
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Whether the directory has any non-hidden subdirectories
    pub has_children: bool,
    pub state: Expansion,
}

impl DirNode {
    fn new(path: PathBuf, depth: usize, parent: Option<NodeId>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let has_children = has_subdirs(&path);

        DirNode {
            name,
            path,
            depth,
            parent,
            children: Vec::new(),
            has_children,
            state: Expansion::Unexpanded,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.state == Expansion::Expanded
    }
}

#[derive(Debug)]
pub struct DirTree {
    root: PathBuf,
    slots: Vec<Option<DirNode>>,
    free: Vec<NodeId>,
    top_level: Vec<NodeId>,
}

impl DirTree {
    /// Build the tree for `root`, populated one level deep
    pub fn load(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(GalleryError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut tree = DirTree {
            root: root.to_path_buf(),
            slots: Vec::new(),
            free: Vec::new(),
            top_level: Vec::new(),
        };

        for path in list_subdirs(root) {
            let id = tree.alloc(DirNode::new(path, 0, None));
            tree.top_level.push(id);
        }

        log::debug!(
            "Loaded tree for {} with {} top-level entries",
            root.display(),
            tree.top_level.len()
        );
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&DirNode> {
        self.slots.get(id).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DirNode> {
        self.slots.get_mut(id).and_then(|slot| slot.as_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.top_level.first().copied()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Load the immediate subdirectories of `id`.
    ///
    /// Returns the directory path when the node transitioned to `Expanded`,
    /// so the caller can display its images.
    pub fn expand(&mut self, id: NodeId) -> Option<PathBuf> {
        let (path, depth) = match self.node(id) {
            Some(node) if !node.is_expanded() => (node.path.clone(), node.depth),
            _ => return None,
        };

        let children: Vec<NodeId> = list_subdirs(&path)
            .into_iter()
            .map(|child| self.alloc(DirNode::new(child, depth + 1, Some(id))))
            .collect();

        let node = self.node_mut(id)?;
        node.has_children = !children.is_empty();
        node.children = children;
        node.state = Expansion::Expanded;

        Some(path)
    }

    /// Drop all descendants of `id`. Returns false if it wasn't expanded.
    pub fn collapse(&mut self, id: NodeId) -> bool {
        let children = match self.node_mut(id) {
            Some(node) if node.is_expanded() => std::mem::take(&mut node.children),
            _ => return false,
        };

        for child in children {
            self.release(child);
        }

        if let Some(node) = self.node_mut(id) {
            node.has_children = has_subdirs(&node.path);
            node.state = Expansion::Collapsed;
        }
        true
    }

    /// Expand a collapsed node or collapse an expanded one
    pub fn toggle(&mut self, id: NodeId) -> Option<PathBuf> {
        match self.node(id) {
            Some(node) if node.is_expanded() => {
                self.collapse(id);
                None
            }
            Some(node) if node.has_children => self.expand(id),
            _ => None,
        }
    }

    /// Whether `id` sits somewhere below `ancestor`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.node(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).and_then(|node| node.parent);
        }
        false
    }

    /// Nodes in display order: pre-order over expanded nodes
    pub fn visible(&self) -> Vec<NodeId> {
        let mut rows = Vec::new();
        let mut stack: Vec<NodeId> = self.top_level.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            rows.push(id);
            if node.is_expanded() {
                stack.extend(node.children.iter().rev());
            }
        }

        rows
    }

    fn alloc(&mut self, node: DirNode) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id] = Some(node);
            id
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.slots.get_mut(id).and_then(Option::take) {
                pending.extend(node.children);
                self.free.push(id);
            }
        }
    }
}
