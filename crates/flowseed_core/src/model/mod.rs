//! Domain model for records owned by the workflow engine store.
//!
//! # Responsibility
//! - Define identity records (groups, users, pictures) and repository records
//!   (deployments, design models) used by the seeder.
//! - Keep validation rules next to the data they protect.
//!
//! # Invariants
//! - Identity records are keyed by caller-chosen string identifiers.
//! - Repository records are keyed by engine-generated UUIDs.

pub mod identity;
pub mod repository;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised before any store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier is empty or contains unsupported characters.
    InvalidIdentifier { field: &'static str, value: String },
    /// Email does not look like `local@domain`.
    InvalidEmail(String),
    /// Required text field is blank.
    EmptyField(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier { field, value } => {
                write!(f, "invalid {field} identifier: `{value}`")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email: `{value}`"),
            Self::EmptyField(field) => write!(f, "{field} cannot be empty"),
        }
    }
}

impl Error for ValidationError {}
