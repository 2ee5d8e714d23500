//! Process startup entry point.
//!
//! # Responsibility
//! - Open the engine store, wire the facade into a [`Seeder`] and run it
//!   exactly once, as an explicit step of the caller's startup sequence.
//! - Summarize store contents for diagnostics.

use crate::config::FlowseedConfig;
use crate::db::{open_db, DbError};
use crate::model::identity::{Group, User};
use crate::model::repository::{Deployment, DeploymentResource};
use crate::repo::identity_repo::{IdentityStore, SqliteIdentityStore};
use crate::repo::repository_repo::{RepositoryStore, SqliteRepositoryStore};
use crate::repo::RepoError;
use crate::resource::DirResourceLoader;
use crate::service::seed_service::{SeedError, SeedReport, Seeder};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum BootstrapError {
    Db(DbError),
    Repo(RepoError),
    Seed(SeedError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "failed to open engine store: {err}"),
            Self::Repo(err) => write!(f, "engine store error: {err}"),
            Self::Seed(err) => write!(f, "seeding failed: {err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Seed(err) => Some(err),
        }
    }
}

impl From<DbError> for BootstrapError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for BootstrapError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<SeedError> for BootstrapError {
    fn from(value: SeedError) -> Self {
        Self::Seed(value)
    }
}

/// Opens the configured store and runs the seeding sequence.
pub fn run_startup(config: &FlowseedConfig) -> Result<SeedReport, BootstrapError> {
    info!(
        "event=startup module=bootstrap status=start database={} resources={}",
        config.database.path.display(),
        config.resources.dir.display()
    );
    let conn = open_db(&config.database.path)?;
    seed_connection(&conn, config)
}

fn seed_connection(
    conn: &Connection,
    config: &FlowseedConfig,
) -> Result<SeedReport, BootstrapError> {
    let identity = SqliteIdentityStore::try_new(conn)?;
    let repository = SqliteRepositoryStore::try_new(conn)?;
    let resources = DirResourceLoader::new(&config.resources.dir);

    let seeder = Seeder::with_plan(identity, repository, resources, config.seed.clone());
    Ok(seeder.seed()?)
}

/// One user with its memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub user: User,
    pub groups: Vec<String>,
}

/// One deployment with its resource names in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub deployment: Deployment,
    pub resources: Vec<String>,
}

/// Snapshot of the seeded records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub groups: Vec<Group>,
    pub users: Vec<UserSummary>,
    pub deployments: Vec<DeploymentSummary>,
}

/// Reads groups, users and deployments from a migrated store.
pub fn store_summary(conn: &Connection) -> Result<StoreSummary, BootstrapError> {
    let identity = SqliteIdentityStore::try_new(conn)?;
    let repository = SqliteRepositoryStore::try_new(conn)?;

    let users = identity
        .list_users()?
        .into_iter()
        .map(|user| -> Result<UserSummary, RepoError> {
            let groups = identity.list_user_groups(&user.id)?;
            Ok(UserSummary { user, groups })
        })
        .collect::<Result<Vec<_>, RepoError>>()?;

    let deployments = repository
        .list_deployments()?
        .into_iter()
        .map(|deployment| -> Result<DeploymentSummary, RepoError> {
            let resources = repository
                .list_deployment_resources(deployment.id)?
                .into_iter()
                .map(|DeploymentResource { name, .. }| name)
                .collect();
            Ok(DeploymentSummary {
                deployment,
                resources,
            })
        })
        .collect::<Result<Vec<_>, RepoError>>()?;

    Ok(StoreSummary {
        groups: identity.list_groups()?,
        users,
        deployments,
    })
}
