//! Startup seeding for a workflow-engine-backed application.
//! Ensures baseline groups, a default user and the process deployment exist.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resource;
pub mod service;

pub use bootstrap::{run_startup, store_summary, BootstrapError, StoreSummary};
pub use config::{ConfigError, FlowseedConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::identity::{Group, GroupType, Picture, User};
pub use model::repository::{Deployment, DeploymentBuilder, DeploymentResource, Model, ModelId};
pub use model::ValidationError;
pub use repo::identity_repo::{IdentityStore, SqliteIdentityStore};
pub use repo::repository_repo::{RepositoryStore, SqliteRepositoryStore};
pub use repo::{RepoError, RepoResult};
pub use resource::{DirResourceLoader, ResourceLoader};
pub use service::seed_plan::{
    demo_model_spec, DeploymentSpec, GroupSpec, ModelSpec, SeedPlan, UserSpec,
    WORKFLOW_DEPLOYMENT_NAME, WORKFLOW_RESOURCES,
};
pub use service::seed_service::{SeedError, SeedReport, SeedResult, Seeder, StepOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
