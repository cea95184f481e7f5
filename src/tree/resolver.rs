// src/tree/resolver.rs
//! Read-only queries over a built [`CategoryTree`].

use super::{CategoryNode, CategoryTree};
use crate::types::CategoryId;
use std::collections::{BTreeSet, HashSet};

/// Answers lookup and membership questions against one tree.
///
/// The tree's id index makes lookups O(1); closures are O(size of subtree).
#[derive(Debug, Clone, Copy)]
pub struct CategoryResolver<'t> {
    tree: &'t CategoryTree,
}

impl<'t> CategoryResolver<'t> {
    pub fn new(tree: &'t CategoryTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t CategoryTree {
        self.tree
    }

    pub fn find_by_id(&self, id: &str) -> Option<&'t CategoryNode> {
        self.tree.get(id)
    }

    /// The start id plus every id reachable from it through child edges.
    ///
    /// An id missing from the tree yields just `{id}`. A missing (`None`)
    /// start id yields the empty set: an uncategorized record matches
    /// nothing.
    pub fn descendant_closure(&self, start: Option<&CategoryId>) -> BTreeSet<CategoryId> {
        let Some(start) = start else {
            return BTreeSet::new();
        };

        let mut closure = BTreeSet::new();
        closure.insert(start.clone());
        if !self.tree.contains(start.as_str()) {
            log::debug!("Category '{}' not in tree, closure is just itself", start);
            return closure;
        }

        let mut pending = vec![start];
        while let Some(id) = pending.pop() {
            let Some(node) = self.tree.get(id.as_str()) else {
                continue;
            };
            for child in node.children() {
                if closure.insert(child.clone()) {
                    pending.push(child);
                }
            }
        }

        closure
    }

    /// Display name of a category.
    pub fn category_name(&self, id: &str) -> Option<&'t str> {
        self.find_by_id(id).map(CategoryNode::name)
    }

    /// Whether an item filed under `item_category` belongs under
    /// `ancestor`, directly or through any descendant.
    ///
    /// Agrees with membership in `descendant_closure(ancestor)` without
    /// building the closure.
    pub fn belongs_under(
        &self,
        item_category: Option<&CategoryId>,
        ancestor: Option<&CategoryId>,
    ) -> bool {
        let (Some(item), Some(ancestor)) = (item_category, ancestor) else {
            return false;
        };
        if item == ancestor {
            return true;
        }
        self.ancestors(item.as_str())
            .iter()
            .any(|node| node.id() == ancestor)
            || (ancestor.is_root() && self.tree.contains(item.as_str()))
    }

    /// Nodes from `id`'s parent up to, but not including, the sentinel.
    pub fn ancestors(&self, id: &str) -> Vec<&'t CategoryNode> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.find_by_id(id).and_then(CategoryNode::parent_id);

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            let Some(parent) = self.find_by_id(parent_id.as_str()) else {
                break;
            };
            if parent.is_root() {
                break;
            }
            chain.push(parent);
            current = parent.parent_id();
        }

        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BuildEntry;
    use pretty_assertions::assert_eq;

    fn id(raw: u64) -> CategoryId {
        CategoryId::from(raw)
    }

    fn ids(raw: &[u64]) -> BTreeSet<CategoryId> {
        raw.iter().copied().map(id).collect()
    }

    // 0 -> 1 -> {2 -> 4, 3}, 0 -> 5
    fn tree() -> CategoryTree {
        CategoryTree::build(vec![
            BuildEntry::new(1u64, None, 0, "Laws"),
            BuildEntry::new(2u64, Some(id(1)), 1, "Federal"),
            BuildEntry::new(4u64, Some(id(2)), 2, "Archive"),
            BuildEntry::new(3u64, Some(id(1)), 1, "State"),
            BuildEntry::new(5u64, None, 0, "Forms"),
        ])
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_find_by_id() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        for node_id in tree.list_all_ids() {
            assert_eq!(resolver.find_by_id(node_id.as_str()).unwrap().id(), &node_id);
        }
        assert!(resolver.find_by_id("99").is_none());
        assert_eq!(resolver.category_name("3"), Some("State"));
    }

    #[test]
    fn test_descendant_closure() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        assert_eq!(resolver.descendant_closure(Some(&id(1))), ids(&[1, 2, 3, 4]));
        assert_eq!(resolver.descendant_closure(Some(&id(2))), ids(&[2, 4]));
        assert_eq!(resolver.descendant_closure(Some(&id(5))), ids(&[5]));
        assert_eq!(resolver.descendant_closure(Some(&id(99))), ids(&[99]));
        assert_eq!(resolver.descendant_closure(None), BTreeSet::new());
        assert_eq!(
            resolver.descendant_closure(Some(&CategoryId::root())).len(),
            tree.len() + 1
        );
    }

    #[test]
    fn test_belongs_under_matches_closure() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        let mut candidates = tree.list_all_ids();
        candidates.push(id(99));

        for ancestor in &candidates {
            let closure = resolver.descendant_closure(Some(ancestor));
            for item in &candidates {
                assert_eq!(
                    resolver.belongs_under(Some(item), Some(ancestor)),
                    closure.contains(item),
                    "item {} under {}",
                    item,
                    ancestor
                );
            }
        }
        assert!(!resolver.belongs_under(None, Some(&id(1))));
        assert!(!resolver.belongs_under(Some(&id(1)), None));
    }

    #[test]
    fn test_ancestors() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        let path: Vec<&str> = resolver.ancestors("4").iter().map(|n| n.name()).collect();
        assert_eq!(path, vec!["Federal", "Laws"]);
        assert!(resolver.ancestors("1").is_empty());
        assert!(resolver.ancestors("99").is_empty());
    }
}
