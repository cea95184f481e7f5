// tests/tree_roundtrip.rs
//! Category tree construction, persistence and resolution against a
//! realistic scraped listing.

use category_harvest::{
    CategoryId, CategoryListing, CategoryResolver, CategoryTree, HarvestError, StructureError,
    TreeDocument,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn fixture_tree() -> CategoryTree {
    let json = include_str!("fixtures/category_listing.json");
    let listing: CategoryListing = serde_json::from_str(json).expect("fixture listing parses");
    CategoryTree::from_listing(&listing)
        .expect("fixture listing is well formed")
        .expect("fixture listing is not empty")
}

fn id(raw: &str) -> CategoryId {
    CategoryId::parse(raw).unwrap()
}

/// Closure computed by plain recursion over the exported document.
fn reference_closure(tree: &CategoryTree, start: &str) -> BTreeSet<CategoryId> {
    fn collect(tree: &CategoryTree, node: &str, out: &mut BTreeSet<CategoryId>) {
        out.insert(id(node));
        for child in tree.children_of(node) {
            collect(tree, child.id().as_str(), out);
        }
    }
    let mut out = BTreeSet::new();
    collect(tree, start, &mut out);
    out
}

#[test]
fn test_listing_builds_expected_shape() {
    let tree = fixture_tree();

    assert_eq!(tree.len(), 9);
    let ids: Vec<String> = tree.list_all_ids().iter().map(|i| i.to_string()).collect();
    assert_eq!(
        ids,
        vec!["0", "36", "37", "38", "41", "42", "50", "51", "52", "60"]
    );
    assert_eq!(tree.get("52").unwrap().name(), "Untitled");
    assert_eq!(tree.get("42").unwrap().level(), 2);
    assert_eq!(tree.root().level(), -1);
}

#[test]
fn test_export_import_round_trip() {
    let tree = fixture_tree();
    let document = tree.export();
    let imported = CategoryTree::import(&document).unwrap();

    assert_eq!(imported, tree);
    assert_eq!(imported.export(), document);

    for node in tree.nodes() {
        let other = imported.get(node.id().as_str()).unwrap();
        assert_eq!(other.parent_id(), node.parent_id());
        assert_eq!(other.children(), node.children());
        assert_eq!(other.level(), node.level());
        assert_eq!(other.name(), node.name());
    }
}

#[test]
fn test_json_round_trip_through_file() {
    let tree = fixture_tree();
    let path = std::env::temp_dir().join(format!(
        "category_harvest_tree_{}.json",
        std::process::id()
    ));

    tree.save_to_path(&path).unwrap();
    let loaded = CategoryTree::load_from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, tree);

    let document: TreeDocument = serde_json::from_str(&tree.to_json_pretty().unwrap()).unwrap();
    assert_eq!(document.root.id, CategoryId::root());
    assert_eq!(document.root.parent_id, None);
}

#[test]
fn test_resolution_correctness() {
    let tree = fixture_tree();
    let resolver = CategoryResolver::new(&tree);

    for node_id in tree.list_all_ids() {
        let found = resolver.find_by_id(node_id.as_str()).unwrap();
        assert_eq!(found.id(), &node_id);
    }
    for absent in ["1", "99", "360", "3"] {
        assert!(resolver.find_by_id(absent).is_none(), "{} should be absent", absent);
    }
}

#[test]
fn test_closure_completeness() {
    let tree = fixture_tree();
    let resolver = CategoryResolver::new(&tree);

    for node in tree.nodes() {
        let closure = resolver.descendant_closure(Some(node.id()));
        assert!(closure.contains(node.id()));
        assert_eq!(closure, reference_closure(&tree, node.id().as_str()));
        if node.is_leaf() {
            assert_eq!(closure, BTreeSet::from([node.id().clone()]));
        }
    }

    assert_eq!(
        resolver.descendant_closure(Some(&id("38"))),
        BTreeSet::from([id("38"), id("41"), id("42")])
    );
}

#[test]
fn test_broken_documents_are_rejected() {
    let orphan = r#"{"id": "0", "parentId": null, "level": -1, "name": "root",
        "children": [{"id": "5", "parentId": "4", "level": 0, "name": "X", "children": []}]}"#;
    assert!(matches!(
        CategoryTree::from_json(orphan),
        Err(HarvestError::Structure(StructureError::ParentMismatch { .. }))
    ));

    let wrong_root = r#"{"id": "1", "parentId": null, "level": -1, "name": "root", "children": []}"#;
    assert!(matches!(
        CategoryTree::from_json(wrong_root),
        Err(HarvestError::Structure(StructureError::InvalidRoot { .. }))
    ));

    let sentinel_only = r#"{"id": "0", "parentId": null, "level": -1, "name": "root"}"#;
    assert!(CategoryTree::from_json(sentinel_only).unwrap().is_empty());
}
