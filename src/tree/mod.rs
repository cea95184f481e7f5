// src/tree/mod.rs
//! In-memory category hierarchy.
//!
//! The tree is an arena: every [`CategoryNode`] lives in one id-keyed map and
//! points at its parent and children by id. A synthetic sentinel (id `"0"`,
//! level `-1`) is always present and is the only node without a parent.
//! Nodes are only ever appended under a parent that already exists, so the
//! structure cannot contain cycles.

mod builder;
mod document;
mod node;
mod resolver;

pub use builder::{flatten, BuildEntry, CategoryListing, ListingEntry};
pub use document::{DocumentNode, TreeDocument};
pub use node::CategoryNode;
pub use resolver::CategoryResolver;

use crate::error::StructureError;
use crate::types::CategoryId;
use indexmap::IndexMap;
use std::fmt::Write as _;

/// A category hierarchy rooted at the sentinel node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTree {
    /// Index 0 always holds the sentinel.
    nodes: IndexMap<CategoryId, CategoryNode>,
}

impl CategoryTree {
    /// A tree holding only the default sentinel.
    pub(crate) fn new() -> Self {
        Self::with_sentinel(CategoryNode::sentinel())
    }

    pub(crate) fn with_sentinel(sentinel: CategoryNode) -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(sentinel.id().clone(), sentinel);
        Self { nodes }
    }

    /// Appends a node as the last child of `parent_id`.
    pub(crate) fn append(
        &mut self,
        id: CategoryId,
        parent_id: &CategoryId,
        level: i32,
        name: String,
    ) -> Result<(), StructureError> {
        if id.is_root() {
            return Err(StructureError::ReservedId(id));
        }
        if self.nodes.contains_key(&id) {
            return Err(StructureError::DuplicateId(id));
        }

        let parent = self
            .nodes
            .get_mut(parent_id)
            .ok_or_else(|| StructureError::UnknownParent {
                id: id.clone(),
                parent_id: parent_id.clone(),
            })?;

        if level != parent.level() + 1 {
            log::warn!(
                "Category '{}' has level {} under '{}' (level {})",
                id,
                level,
                parent_id,
                parent.level()
            );
        }

        parent.push_child(id.clone());
        let node = CategoryNode::new(id.clone(), parent_id.clone(), level, name);
        self.nodes.insert(id, node);
        Ok(())
    }

    /// The root sentinel.
    pub fn root(&self) -> &CategoryNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: &str) -> Option<&CategoryNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of real categories, not counting the sentinel.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// `true` when the tree holds nothing but the sentinel.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child nodes of `id` in discovery order. Empty for unknown ids.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &CategoryNode> + '_ {
        self.get(id)
            .map(CategoryNode::children)
            .unwrap_or_default()
            .iter()
            .filter_map(move |child| self.nodes.get(child))
    }

    /// Every node in pre-order, starting with the sentinel.
    pub fn nodes(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![self.root().id()],
        }
    }

    /// Every id in pre-order, sentinel included, each exactly once.
    pub fn list_all_ids(&self) -> Vec<CategoryId> {
        self.nodes().map(|node| node.id().clone()).collect()
    }

    /// Indented outline of the tree, one node per line.
    pub fn render_outline(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root(), 0usize)];

        while let Some((node, depth)) = stack.pop() {
            let _ = write!(
                out,
                "{}- {} [{}] (level {})",
                "  ".repeat(depth),
                node.name(),
                node.id(),
                node.level()
            );
            if node.is_leaf() && !node.is_root() {
                out.push_str(" (leaf)");
            }
            out.push('\n');

            for child in node.children().iter().rev() {
                if let Some(child) = self.nodes.get(child) {
                    stack.push((child, depth + 1));
                }
            }
        }

        out
    }
}

/// Pre-order walk over a [`CategoryTree`].
pub struct PreOrder<'t> {
    tree: &'t CategoryTree,
    stack: Vec<&'t CategoryId>,
}

impl<'t> Iterator for PreOrder<'t> {
    type Item = &'t CategoryNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            if let Some(node) = self.tree.nodes.get(id) {
                self.stack.extend(node.children().iter().rev());
                return Some(node);
            }
        }
    }
}
