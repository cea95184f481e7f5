// src/association.rs
//! Many-to-many links between two category-tagged record collections.
//!
//! A record `b` is linked to a record `a` when `b`'s category lies in the
//! descendant closure of `a`'s category: a post filed under "Laws" picks up
//! downloads filed under "Laws" and every subcategory of it.
//!
//! Both directions are keyed by every input id. Ids without any link map to
//! [`Association::Unassociated`], never to an empty set and never to a
//! missing key.

use crate::tree::CategoryResolver;
use crate::types::CategoryId;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// A record that can take part in an association.
pub trait CategorizedRecord {
    type Id: Clone + Eq + Hash + Ord + Send + Sync;

    fn record_id(&self) -> &Self::Id;

    /// `None` for uncategorized records, which never match anything.
    fn category_id(&self) -> Option<&CategoryId>;
}

/// Minimal record: an id and an optional category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedItem {
    pub id: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl CategorizedItem {
    pub fn new(id: impl Into<String>, category_id: Option<CategoryId>) -> Self {
        Self {
            id: id.into(),
            category_id,
        }
    }
}

impl CategorizedRecord for CategorizedItem {
    type Id = String;

    fn record_id(&self) -> &String {
        &self.id
    }

    fn category_id(&self) -> Option<&CategoryId> {
        self.category_id.as_ref()
    }
}

/// The ids linked to one record.
///
/// Serializes as a JSON array, or `null` when unassociated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Association<T: Ord> {
    Linked(BTreeSet<T>),
    Unassociated,
}

impl<T: Ord> Association<T> {
    /// `Unassociated` for an empty set.
    pub fn from_set(ids: BTreeSet<T>) -> Self {
        if ids.is_empty() {
            Self::Unassociated
        } else {
            Self::Linked(ids)
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked(_))
    }

    pub fn ids(&self) -> Option<&BTreeSet<T>> {
        match self {
            Self::Linked(ids) => Some(ids),
            Self::Unassociated => None,
        }
    }

    pub fn contains(&self, id: &T) -> bool {
        self.ids().is_some_and(|ids| ids.contains(id))
    }

    pub fn len(&self) -> usize {
        self.ids().map_or(0, BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Links from collection A to collection B and back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationMap<A: Hash + Eq + Ord, B: Hash + Eq + Ord> {
    forward: IndexMap<A, Association<B>>,
    inverse: IndexMap<B, Association<A>>,
}

impl<A, B> AssociationMap<A, B>
where
    A: Clone + Hash + Eq + Ord,
    B: Clone + Hash + Eq + Ord,
{
    /// A id to linked B ids, in A's input order.
    pub fn forward(&self) -> &IndexMap<A, Association<B>> {
        &self.forward
    }

    /// B id to linked A ids, in B's input order.
    pub fn inverse(&self) -> &IndexMap<B, Association<A>> {
        &self.inverse
    }

    pub fn links_of_a(&self, a: &A) -> Option<&Association<B>> {
        self.forward.get(a)
    }

    pub fn links_of_b(&self, b: &B) -> Option<&Association<A>> {
        self.inverse.get(b)
    }

    pub fn is_linked(&self, a: &A, b: &B) -> bool {
        self.forward.get(a).is_some_and(|links| links.contains(b))
    }

    /// Number of (a, b) pairs.
    pub fn link_count(&self) -> usize {
        self.forward.values().map(Association::len).sum()
    }

    /// B ids with no link in either direction.
    pub fn unassociated_b(&self) -> impl Iterator<Item = &B> {
        self.inverse
            .iter()
            .filter(|(_, links)| !links.is_linked())
            .map(|(id, _)| id)
    }

    /// A ids with no link.
    pub fn unassociated_a(&self) -> impl Iterator<Item = &A> {
        self.forward
            .iter()
            .filter(|(_, links)| !links.is_linked())
            .map(|(id, _)| id)
    }

    /// Splits into the forward and inverse maps.
    pub fn into_parts(self) -> (IndexMap<A, Association<B>>, IndexMap<B, Association<A>>) {
        (self.forward, self.inverse)
    }
}

/// Links every record of `a` to the records of `b` filed anywhere under its
/// category.
///
/// Closures are computed once per distinct category of `a`, in parallel.
/// Records sharing an id are merged.
pub fn associate<RA, RB>(
    a: &[RA],
    b: &[RB],
    resolver: &CategoryResolver<'_>,
) -> AssociationMap<RA::Id, RB::Id>
where
    RA: CategorizedRecord + Sync,
    RB: CategorizedRecord + Sync,
{
    // B records grouped by category; uncategorized ones can never match.
    let mut by_category: HashMap<&CategoryId, Vec<&RB::Id>> = HashMap::new();
    for record in b {
        if let Some(category) = record.category_id() {
            by_category
                .entry(category)
                .or_default()
                .push(record.record_id());
        }
    }

    let distinct: BTreeSet<&CategoryId> = a.iter().filter_map(|r| r.category_id()).collect();
    let closures: HashMap<&CategoryId, BTreeSet<CategoryId>> = distinct
        .into_par_iter()
        .map(|category| (category, resolver.descendant_closure(Some(category))))
        .collect();

    let matches: Vec<BTreeSet<RB::Id>> = a
        .par_iter()
        .map(|record| {
            let Some(closure) = record.category_id().and_then(|c| closures.get(c)) else {
                return BTreeSet::new();
            };
            closure
                .iter()
                .filter_map(|category| by_category.get(category))
                .flatten()
                .map(|id| (*id).clone())
                .collect()
        })
        .collect();

    let mut forward_sets: IndexMap<RA::Id, BTreeSet<RB::Id>> = IndexMap::with_capacity(a.len());
    for (record, linked) in a.iter().zip(matches) {
        forward_sets
            .entry(record.record_id().clone())
            .or_default()
            .extend(linked);
    }

    let mut inverse_sets: IndexMap<RB::Id, BTreeSet<RA::Id>> = b
        .iter()
        .map(|record| (record.record_id().clone(), BTreeSet::new()))
        .collect();
    for (a_id, linked) in &forward_sets {
        for b_id in linked {
            if let Some(set) = inverse_sets.get_mut(b_id) {
                set.insert(a_id.clone());
            }
        }
    }

    let map = AssociationMap {
        forward: forward_sets
            .into_iter()
            .map(|(id, set)| (id, Association::from_set(set)))
            .collect(),
        inverse: inverse_sets
            .into_iter()
            .map(|(id, set)| (id, Association::from_set(set)))
            .collect(),
    };

    log::info!(
        "Associated {} record(s) with {} record(s): {} link(s), {} unassociated",
        map.forward.len(),
        map.inverse.len(),
        map.link_count(),
        map.unassociated_b().count()
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{BuildEntry, CategoryTree};
    use pretty_assertions::assert_eq;

    fn cat(raw: &str) -> Option<CategoryId> {
        Some(CategoryId::parse(raw).unwrap())
    }

    fn tree() -> CategoryTree {
        CategoryTree::build(vec![
            BuildEntry::new(1u64, None, 0, "A"),
            BuildEntry::new(2u64, cat("1"), 1, "A1"),
            BuildEntry::new(3u64, None, 0, "B"),
        ])
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_zero_matches_are_explicit() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        let posts = vec![
            CategorizedItem::new("post1", cat("1")),
            CategorizedItem::new("post2", None),
        ];
        let downloads = vec![
            CategorizedItem::new("dl1", cat("2")),
            CategorizedItem::new("dl2", cat("99")),
            CategorizedItem::new("dl3", None),
        ];

        let map = associate(&posts, &downloads, &resolver);

        assert_eq!(
            map.links_of_a(&"post1".to_string()),
            Some(&Association::Linked(BTreeSet::from(["dl1".to_string()])))
        );
        assert_eq!(
            map.links_of_a(&"post2".to_string()),
            Some(&Association::Unassociated)
        );
        for id in ["dl2", "dl3"] {
            assert_eq!(
                map.links_of_b(&id.to_string()),
                Some(&Association::Unassociated)
            );
        }
        let unlinked: Vec<&String> = map.unassociated_b().collect();
        assert_eq!(unlinked, vec!["dl2", "dl3"]);
        assert_eq!(map.link_count(), 1);
    }

    #[test]
    fn test_duplicate_a_ids_are_merged() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        let posts = vec![
            CategorizedItem::new("post", cat("2")),
            CategorizedItem::new("post", cat("3")),
        ];
        let downloads = vec![
            CategorizedItem::new("x", cat("2")),
            CategorizedItem::new("y", cat("3")),
        ];

        let map = associate(&posts, &downloads, &resolver);
        assert_eq!(map.forward().len(), 1);
        assert_eq!(map.links_of_a(&"post".to_string()).map(Association::len), Some(2));
    }

    #[test]
    fn test_serializes_unassociated_as_null() {
        let tree = tree();
        let resolver = CategoryResolver::new(&tree);
        let map = associate(
            &[CategorizedItem::new("p", cat("3"))],
            &[CategorizedItem::new("d", cat("1"))],
            &resolver,
        );
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"forward": {"p": null}, "inverse": {"d": null}})
        );
    }
}
