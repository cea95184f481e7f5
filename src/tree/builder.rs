// src/tree/builder.rs
//! Building a [`CategoryTree`] from discovered listing entries.

use super::CategoryTree;
use crate::constants::{ROOT_SENTINEL_LEVEL, UNTITLED_CATEGORY_NAME};
use crate::error::StructureError;
use crate::types::CategoryId;
use serde::{Deserialize, Serialize};

/// One category as discovered while walking a nested listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEntry {
    pub id: CategoryId,
    /// `None` (or the sentinel id) attaches the entry to the sentinel.
    pub parent_id: Option<CategoryId>,
    pub level: i32,
    pub name: String,
}

impl BuildEntry {
    pub fn new(
        id: impl Into<CategoryId>,
        parent_id: Option<CategoryId>,
        level: i32,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id,
            level,
            name: name.into(),
        }
    }
}

/// A nested category listing as scraped from the source page.
///
/// Each entry may restate its parent id and level; when omitted they are
/// taken from the nesting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryListing {
    pub entries: Vec<ListingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub id: CategoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ListingEntry>,
}

impl ListingEntry {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            level: None,
            name: Some(name.into()),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ListingEntry>) -> Self {
        self.children = children;
        self
    }
}

/// Walks a nested listing in discovery (pre-)order.
///
/// A declared parent id that is empty, or the sentinel id at top level,
/// agrees with the nesting. Any other declared parent must match the
/// enclosing entry.
pub fn flatten(listing: &CategoryListing) -> Result<Vec<BuildEntry>, StructureError> {
    let mut entries = Vec::new();
    let mut stack: Vec<(&ListingEntry, CategoryId, i32)> = listing
        .entries
        .iter()
        .rev()
        .map(|entry| (entry, CategoryId::root(), ROOT_SENTINEL_LEVEL))
        .collect();

    while let Some((entry, nesting_parent, parent_level)) = stack.pop() {
        let declared = match entry.parent_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(CategoryId::parse(raw)?),
        };
        if let Some(declared) = declared {
            if declared != nesting_parent {
                return Err(StructureError::ParentMismatch {
                    id: entry.id.clone(),
                    declared: Some(declared),
                    actual: nesting_parent,
                });
            }
        }

        let level = entry.level.unwrap_or(parent_level + 1);
        let name = match entry.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNTITLED_CATEGORY_NAME.to_string(),
        };

        for child in entry.children.iter().rev() {
            stack.push((child, entry.id.clone(), level));
        }

        entries.push(BuildEntry {
            id: entry.id.clone(),
            parent_id: Some(nesting_parent),
            level,
            name,
        });
    }

    Ok(entries)
}

impl CategoryTree {
    /// Builds a tree from entries in discovery order.
    ///
    /// Each entry becomes the next child of its parent, which must already
    /// have been seen. Returns `Ok(None)` for empty input.
    pub fn build<I>(entries: I) -> Result<Option<Self>, StructureError>
    where
        I: IntoIterator<Item = BuildEntry>,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            log::debug!("No category entries, tree is empty");
            return Ok(None);
        }

        let mut tree = Self::new();
        let root = tree.root().id().clone();
        for entry in entries {
            let parent = entry.parent_id.unwrap_or_else(|| root.clone());
            tree.append(entry.id, &parent, entry.level, entry.name)?;
        }

        log::debug!("Built category tree with {} categories", tree.len());
        Ok(Some(tree))
    }

    /// Builds a tree straight from a nested listing.
    pub fn from_listing(listing: &CategoryListing) -> Result<Option<Self>, StructureError> {
        Self::build(flatten(listing)?)
    }
}
