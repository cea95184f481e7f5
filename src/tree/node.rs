// src/tree/node.rs
use crate::constants::{ROOT_SENTINEL_LEVEL, ROOT_SENTINEL_NAME};
use crate::types::CategoryId;

/// One category in a [`CategoryTree`](super::CategoryTree).
///
/// Nodes refer to their parent and children by id; the tree owns all of
/// them. Nodes are read-only once the tree is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    id: CategoryId,
    parent_id: Option<CategoryId>,
    level: i32,
    name: String,
    children: Vec<CategoryId>,
}

impl CategoryNode {
    pub(crate) fn new(id: CategoryId, parent_id: CategoryId, level: i32, name: String) -> Self {
        Self {
            id,
            parent_id: Some(parent_id),
            level,
            name,
            children: Vec::new(),
        }
    }

    pub(crate) fn sentinel() -> Self {
        Self::sentinel_named(ROOT_SENTINEL_NAME.to_string(), ROOT_SENTINEL_LEVEL)
    }

    pub(crate) fn sentinel_named(name: String, level: i32) -> Self {
        Self {
            id: CategoryId::root(),
            parent_id: None,
            level,
            name,
            children: Vec::new(),
        }
    }

    pub(crate) fn push_child(&mut self, child: CategoryId) {
        self.children.push(child);
    }

    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    /// `None` only for the root sentinel.
    pub fn parent_id(&self) -> Option<&CategoryId> {
        self.parent_id.as_ref()
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child ids in discovery order.
    pub fn children(&self) -> &[CategoryId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
