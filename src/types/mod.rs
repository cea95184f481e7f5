// src/types/mod.rs
use thiserror::Error;

mod ids;

pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid category ID: {0}")]
    InvalidId(String),

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),
}
