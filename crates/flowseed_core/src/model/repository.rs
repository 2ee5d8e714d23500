//! Repository records: deployments, bundled resources and design models.
//!
//! # Invariants
//! - Deployment resources keep the order in which they were added.
//! - Deployment `version` is assigned by the store, starting at 1 per name.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine-generated deployment identifier.
pub type DeploymentId = Uuid;

/// Engine-generated design model identifier.
pub type ModelId = Uuid;

/// Persisted deployment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub name: String,
    pub version: u32,
    /// Unix epoch milliseconds.
    pub deployed_at: i64,
}

/// One named resource inside a deployment bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResource {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Accumulates resources for one deployment before it is committed.
///
/// Nothing is written until the builder is passed to
/// [`RepositoryStore::deploy`](crate::repo::repository_repo::RepositoryStore::deploy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentBuilder {
    name: String,
    resources: Vec<DeploymentResource>,
}

impl DeploymentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
        }
    }

    /// Appends one resource; declared order is preserved.
    pub fn add_resource(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.resources.push(DeploymentResource {
            name: name.into(),
            bytes,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resources(&self) -> &[DeploymentResource] {
        &self.resources
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("deployment name"));
        }
        if self
            .resources
            .iter()
            .any(|resource| resource.name.trim().is_empty())
        {
            return Err(ValidationError::EmptyField("deployment resource name"));
        }
        Ok(())
    }
}

/// Design-time process model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    /// JSON object with at least `name` and `description`.
    pub meta_info: String,
    /// Editor JSON source, attached after the model is saved.
    pub editor_source: Option<Vec<u8>>,
    /// SVG thumbnail, attached after the model is saved.
    pub editor_source_extra: Option<Vec<u8>>,
}

impl Model {
    /// Creates a model with a fresh id and metadata built from `name` and
    /// `description`.
    pub fn new(name: impl Into<String>, description: &str) -> Self {
        let name = name.into();
        let meta_info = serde_json::json!({
            "name": name,
            "description": description,
        })
        .to_string();
        Self {
            id: Uuid::new_v4(),
            name,
            meta_info,
            editor_source: None,
            editor_source_extra: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("model name"));
        }
        Ok(())
    }
}
