// src/lib.rs
//! category-harvest: building blocks shared by the scraping stages.
//!
//! # Public API
//!
//! - **Category tree**: `CategoryTree`, `CategoryResolver`, tree documents
//! - **Fetching**: `FetchOrchestrator`, `RetryPolicy`, `FetchTask`, `RequestCache`
//! - **Association**: `associate`, `AssociationMap`, `CategorizedRecord`
//! - **Ambient**: `HarvestConfig`, `setup_logging`, `HarvestError`

pub mod association;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod tree;
pub mod types;

// --- Error Handling ---
pub use crate::error::{HarvestError, Result, StructureError};
pub use crate::types::{CategoryId, ValidationError};

// --- Configuration ---
pub use crate::config::{Command, CommandLineInput, HarvestConfig};
pub use crate::logging::{setup_logging, LoggingConfig};

// --- Category Tree ---
pub use crate::tree::{
    flatten, BuildEntry, CategoryListing, CategoryNode, CategoryResolver, CategoryTree,
    DocumentNode, ListingEntry, TreeDocument,
};

// --- Fetching ---
pub use crate::fetch::{
    run_all, BatchSummary, FailureMode, FetchError, FetchErrorClass, FetchOperation,
    FetchOrchestrator, FetchOutcome, FetchTask, HttpFetcher, RequestCache, RetryPolicy,
    TaskState,
};

// --- Association ---
pub use crate::association::{
    associate, Association, AssociationMap, CategorizedItem, CategorizedRecord,
};
