// src/tree/document.rs
//! Nested JSON document form of a [`CategoryTree`].
//!
//! ```json
//! {"id": "0", "parentId": null, "level": -1, "name": "root",
//!  "children": [{"id": "1", "parentId": "0", "level": 0, "name": "A", "children": []}]}
//! ```

use super::node::CategoryNode;
use super::CategoryTree;
use crate::constants::{ROOT_SENTINEL_ID, ROOT_SENTINEL_LEVEL};
use crate::error::{HarvestError, StructureError};
use crate::types::CategoryId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One node of a tree document with its nested children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,
    pub level: i32,
    pub name: String,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

/// A whole tree document; its top node is the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeDocument {
    pub root: DocumentNode,
}

impl CategoryTree {
    /// Exports the tree as a nested document.
    pub fn export(&self) -> TreeDocument {
        TreeDocument {
            root: self.export_node(self.root()),
        }
    }

    fn export_node(&self, node: &CategoryNode) -> DocumentNode {
        DocumentNode {
            id: node.id().clone(),
            parent_id: node.parent_id().cloned(),
            level: node.level(),
            name: node.name().to_string(),
            children: self
                .children_of(node.id().as_str())
                .map(|child| self.export_node(child))
                .collect(),
        }
    }

    /// Rebuilds a tree from a document produced by [`export`](Self::export).
    ///
    /// The top node must be the sentinel and every nested node must name
    /// its enclosing node as `parentId`.
    pub fn import(document: &TreeDocument) -> Result<Self, StructureError> {
        let root = &document.root;
        if !root.id.is_root() || root.parent_id.is_some() {
            return Err(StructureError::InvalidRoot {
                expected: ROOT_SENTINEL_ID.to_string(),
                found: root.id.clone(),
            });
        }
        if root.level != ROOT_SENTINEL_LEVEL {
            log::warn!(
                "Tree document root has level {}, expected {}",
                root.level,
                ROOT_SENTINEL_LEVEL
            );
        }

        let mut tree = Self::with_sentinel(CategoryNode::sentinel_named(
            root.name.clone(),
            root.level,
        ));

        let mut stack: Vec<(&DocumentNode, &CategoryId)> = root
            .children
            .iter()
            .rev()
            .map(|child| (child, &root.id))
            .collect();

        while let Some((node, parent)) = stack.pop() {
            if node.parent_id.as_ref() != Some(parent) {
                return Err(StructureError::ParentMismatch {
                    id: node.id.clone(),
                    declared: node.parent_id.clone(),
                    actual: parent.clone(),
                });
            }
            tree.append(node.id.clone(), parent, node.level, node.name.clone())?;
            for child in node.children.iter().rev() {
                stack.push((child, &node.id));
            }
        }

        Ok(tree)
    }

    pub fn to_json_pretty(&self) -> Result<String, HarvestError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    pub fn from_json(json: &str) -> Result<Self, HarvestError> {
        let document: TreeDocument = serde_json::from_str(json)?;
        Ok(Self::import(&document)?)
    }

    /// Writes the exported document to `path`.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), HarvestError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)?;
        log::info!("Saved category tree ({} categories) to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BuildEntry;
    use pretty_assertions::assert_eq;

    fn tree() -> CategoryTree {
        CategoryTree::build(vec![
            BuildEntry::new(1u64, None, 0, "A"),
            BuildEntry::new(2u64, Some(CategoryId::from(1u64)), 1, "A1"),
        ])
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_export_shape() {
        let json = serde_json::to_value(tree().export()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "0", "parentId": null, "level": -1, "name": "root",
                "children": [{
                    "id": "1", "parentId": "0", "level": 0, "name": "A",
                    "children": [{
                        "id": "2", "parentId": "1", "level": 1, "name": "A1",
                        "children": []
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_import_rejects_non_sentinel_root() {
        let mut document = tree().export();
        document.root = document.root.children.remove(0);
        assert_eq!(
            CategoryTree::import(&document),
            Err(StructureError::InvalidRoot {
                expected: "0".to_string(),
                found: CategoryId::from(1u64),
            })
        );
    }

    #[test]
    fn test_import_rejects_wrong_parent_id() {
        let mut document = tree().export();
        document.root.children[0].children[0].parent_id = Some(CategoryId::from(7u64));
        assert!(matches!(
            CategoryTree::import(&document),
            Err(StructureError::ParentMismatch { .. })
        ));
    }

    #[test]
    fn test_import_rejects_duplicates() {
        let mut document = tree().export();
        let mut twin = document.root.children[0].clone();
        twin.children.clear();
        document.root.children.push(twin);
        assert_eq!(
            CategoryTree::import(&document),
            Err(StructureError::DuplicateId(CategoryId::from(1u64)))
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            CategoryTree::from_json("{\"id\": \"0\""),
            Err(HarvestError::MalformedDocument(_))
        ));
    }
}
