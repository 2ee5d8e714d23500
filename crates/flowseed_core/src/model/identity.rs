//! Identity records: groups, users, memberships and user pictures.
//!
//! # Responsibility
//! - Define the shapes persisted by the identity store.
//! - Derive group display names from identifiers.
//!
//! # Invariants
//! - Group and user identifiers match `IDENTIFIER_RE`.
//! - A group's display name is its identifier with the first character
//!   upper-cased.

use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.@-]*$").expect("valid identifier regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// MIME type used for every avatar written by the seeder.
pub const AVATAR_MIME_TYPE: &str = "image/jpeg";

/// Category tag attached to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupType {
    /// Work-routing group used for task assignment.
    Assignment,
    /// Authorization role checked by the application.
    SecurityRole,
}

impl GroupType {
    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::SecurityRole => "security-role",
        }
    }

    /// Parses a stable storage/wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "assignment" => Some(Self::Assignment),
            "security-role" => Some(Self::SecurityRole),
            _ => None,
        }
    }
}

/// Identity group record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GroupType,
}

impl Group {
    /// Builds a group whose display name is derived from `id`.
    pub fn new(id: impl Into<String>, kind: GroupType) -> Self {
        let id = id.into();
        let name = display_name_for(&id);
        Self { id, name, kind }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("group", &self.id)
    }
}

/// Identity user record.
///
/// `password` is an opaque credential; the store persists it as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub email: String,
}

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("user", &self.id)?;
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Binary avatar attached to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Picture {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mime_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("picture mime type"));
        }
        Ok(())
    }
}

/// Returns `id` with its first character upper-cased and the rest unchanged.
pub fn display_name_for(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}
