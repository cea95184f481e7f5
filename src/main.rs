// src/main.rs
//! `category-tree`: inspect, build and apply category tree documents.

use anyhow::{Context, Result};
use category_harvest::{
    associate, setup_logging, CategorizedItem, CategoryId, CategoryListing, CategoryResolver,
    CategoryTree, Command, CommandLineInput, LoggingConfig,
};
use clap::Parser;
use std::path::Path;

fn load_tree(path: &Path) -> Result<CategoryTree> {
    let tree = CategoryTree::load_from_path(path)
        .with_context(|| format!("Failed to load tree document {}", path.display()))?;
    log::info!(
        "Loaded {} categories from {}",
        tree.len(),
        path.display()
    );
    Ok(tree)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Outline { tree } => {
            print!("{}", load_tree(&tree)?.render_outline());
        }
        Command::Ids { tree } => {
            for id in load_tree(&tree)?.list_all_ids() {
                println!("{}", id);
            }
        }
        Command::Closure { tree, id } => {
            let tree = load_tree(&tree)?;
            let id = CategoryId::parse(&id).context("Invalid category id")?;
            let resolver = CategoryResolver::new(&tree);
            if resolver.find_by_id(id.as_str()).is_none() {
                log::warn!("Category '{}' is not in the tree", id);
            }
            for member in resolver.descendant_closure(Some(&id)) {
                match resolver.category_name(member.as_str()) {
                    Some(name) => println!("{}\t{}", member, name),
                    None => println!("{}", member),
                }
            }
        }
        Command::Build { listing, output } => {
            let listing: CategoryListing = load_json(&listing)?;
            let Some(tree) = CategoryTree::from_listing(&listing)? else {
                anyhow::bail!("Listing contains no categories");
            };
            match output {
                Some(path) => tree.save_to_path(&path)?,
                None => println!("{}", tree.to_json_pretty()?),
            }
        }
        Command::Associate {
            tree,
            records_a,
            records_b,
        } => {
            let tree = load_tree(&tree)?;
            let a: Vec<CategorizedItem> = load_json(&records_a)?;
            let b: Vec<CategorizedItem> = load_json(&records_b)?;
            let map = associate(&a, &b, &CategoryResolver::new(&tree));
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(&LoggingConfig {
        verbose: cli.verbose,
        log_file: cli.log_file.clone(),
    })?;

    run(cli.command)
}
