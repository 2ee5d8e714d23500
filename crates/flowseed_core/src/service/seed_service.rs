//! Startup seeding use-case.
//!
//! # Responsibility
//! - Ensure baseline groups, users and the process deployment exist.
//! - Keep every step safe to run on every boot.
//!
//! # Invariants
//! - Groups, users and deployments are only created when absent.
//! - Memberships are only added when the user is created by this call.
//! - Avatar and profile writes run on every call, even for existing users.
//! - Engine failures propagate; optional attachment I/O failures are logged
//!   and skipped.

use crate::logging::field_value;
use crate::model::identity::{Group, Picture, User, AVATAR_MIME_TYPE};
use crate::model::repository::{DeploymentBuilder, Model, ModelId};
use crate::repo::identity_repo::IdentityStore;
use crate::repo::repository_repo::RepositoryStore;
use crate::repo::RepoError;
use crate::resource::ResourceLoader;
use crate::service::seed_plan::{DeploymentSpec, GroupSpec, ModelSpec, SeedPlan, UserSpec};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::time::Instant;

pub type SeedResult<T> = Result<T, SeedError>;

/// Fatal seeding failure; aborts startup.
#[derive(Debug)]
pub enum SeedError {
    /// Identity or repository store failure.
    Repo(RepoError),
    /// A required deployment resource could not be read.
    Resource { name: String, source: io::Error },
    /// Flattened profile list has a dangling key.
    OddProfileAttributes { user_id: String, len: usize },
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Resource { name, source } => {
                write!(f, "failed to load resource `{name}`: {source}")
            }
            Self::OddProfileAttributes { user_id, len } => write!(
                f,
                "profile attributes for user `{user_id}` must be key/value pairs, got {len} entries"
            ),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Resource { source, .. } => Some(source),
            Self::OddProfileAttributes { .. } => None,
        }
    }
}

impl From<RepoError> for SeedError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// What one ensure step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub created: usize,
    pub skipped: usize,
}

/// Summary of one `seed()` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub groups: StepOutcome,
    pub users: StepOutcome,
    pub deployments: StepOutcome,
}

/// Bootstrap seeder over an injected engine facade.
pub struct Seeder<I, R, L>
where
    I: IdentityStore,
    R: RepositoryStore,
    L: ResourceLoader,
{
    identity: I,
    repository: R,
    resources: L,
    plan: SeedPlan,
}

impl<I, R, L> Seeder<I, R, L>
where
    I: IdentityStore,
    R: RepositoryStore,
    L: ResourceLoader,
{
    /// Creates a seeder that ensures the built-in plan.
    pub fn new(identity: I, repository: R, resources: L) -> Self {
        Self::with_plan(identity, repository, resources, SeedPlan::default())
    }

    pub fn with_plan(identity: I, repository: R, resources: L, plan: SeedPlan) -> Self {
        Self {
            identity,
            repository,
            resources,
            plan,
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Runs groups, users and deployment steps in order.
    ///
    /// The demo model path is not part of this sequence.
    pub fn seed(&self) -> SeedResult<SeedReport> {
        let started_at = Instant::now();
        info!("event=seed module=seed status=start");

        let result = self.seed_steps();
        match &result {
            Ok(report) => info!(
                "event=seed module=seed status=ok duration_ms={} groups_created={} users_created={} deployments_created={}",
                started_at.elapsed().as_millis(),
                report.groups.created,
                report.users.created,
                report.deployments.created
            ),
            Err(err) => error!(
                "event=seed module=seed status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn seed_steps(&self) -> SeedResult<SeedReport> {
        let mut report = SeedReport::default();

        info!(
            "event=seed_groups module=seed status=start count={}",
            self.plan.groups.len()
        );
        report.groups = self.ensure_groups(&self.plan.groups)?;

        info!(
            "event=seed_users module=seed status=start count={}",
            self.plan.users.len()
        );
        for user in &self.plan.users {
            if self.ensure_user(user)? {
                report.users.created += 1;
            } else {
                report.users.skipped += 1;
            }
        }

        info!(
            "event=seed_deployment module=seed status=start name={}",
            field_value(&self.plan.deployment.name)
        );
        if self.ensure_deployment(&self.plan.deployment)? {
            report.deployments.created += 1;
        } else {
            report.deployments.skipped += 1;
        }

        Ok(report)
    }

    /// Creates each group whose identifier is not present yet.
    pub fn ensure_groups(&self, groups: &[GroupSpec]) -> SeedResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        for spec in groups {
            if self.identity.count_groups_by_id(&spec.id)? > 0 {
                outcome.skipped += 1;
                continue;
            }

            self.identity
                .create_group(&Group::new(spec.id.as_str(), spec.kind))?;
            outcome.created += 1;
        }

        info!(
            "event=seed_groups module=seed status=ok created={} skipped={}",
            outcome.created, outcome.skipped
        );
        Ok(outcome)
    }

    /// Ensures one user, then applies avatar and profile writes.
    ///
    /// Returns `true` when the user record was created by this call. Avatar
    /// and profile attributes are written whether or not the user existed.
    ///
    /// # Errors
    /// - `OddProfileAttributes` when `spec.profile` has odd length; checked
    ///   before anything is written.
    pub fn ensure_user(&self, spec: &UserSpec) -> SeedResult<bool> {
        if spec.profile.len() % 2 != 0 {
            return Err(SeedError::OddProfileAttributes {
                user_id: spec.id.clone(),
                len: spec.profile.len(),
            });
        }

        let created = self.identity.count_users_by_id(&spec.id)? == 0;
        if created {
            let user = User {
                id: spec.id.clone(),
                first_name: spec.first_name.clone(),
                last_name: spec.last_name.clone(),
                password: spec.password.clone(),
                email: spec.email.clone(),
            };
            self.identity.create_user(&user)?;

            for group_id in &spec.groups {
                self.identity.create_membership(&spec.id, group_id)?;
            }
        }

        if let Some(avatar) = spec.avatar.as_deref().filter(|name| !name.is_empty()) {
            match self.resources.load(avatar) {
                Ok(bytes) => {
                    let picture = Picture::new(bytes, AVATAR_MIME_TYPE);
                    self.identity.set_user_picture(&spec.id, &picture)?;
                }
                Err(err) => warn!(
                    "event=seed_user_avatar module=seed status=skipped user_id={} resource={} error={}",
                    spec.id,
                    field_value(avatar),
                    err
                ),
            }
        }

        for pair in spec.profile.chunks_exact(2) {
            self.identity.set_user_info(&spec.id, &pair[0], &pair[1])?;
        }

        info!(
            "event=seed_user module=seed status=ok user_id={} created={} memberships={} profile_pairs={}",
            spec.id,
            created,
            if created { spec.groups.len() } else { 0 },
            spec.profile.len() / 2
        );
        Ok(created)
    }

    /// Deploys the bundle unless a deployment with the same name exists.
    ///
    /// Existing deployments are matched by name only; resource content is
    /// not compared. Returns `true` when a deployment was created.
    pub fn ensure_deployment(&self, spec: &DeploymentSpec) -> SeedResult<bool> {
        let existing = self.repository.list_deployments_by_name(&spec.name)?;
        if !existing.is_empty() {
            info!(
                "event=seed_deployment module=seed status=skipped name={} existing={}",
                field_value(&spec.name),
                existing.len()
            );
            return Ok(false);
        }

        let mut builder = DeploymentBuilder::new(spec.name.as_str());
        for name in &spec.resources {
            let bytes = self
                .resources
                .load(name)
                .map_err(|source| SeedError::Resource {
                    name: name.clone(),
                    source,
                })?;
            builder = builder.add_resource(name.as_str(), bytes);
        }

        let deployment = self.repository.deploy(&builder)?;
        info!(
            "event=seed_deployment module=seed status=ok name={} id={} version={} resources={}",
            field_value(&deployment.name),
            deployment.id,
            deployment.version,
            spec.resources.len()
        );
        Ok(true)
    }

    /// Creates a design model with metadata and editor attachments.
    ///
    /// Returns the new model id, or `None` when a model with the same name
    /// already exists. Attachment load failures are logged and skipped.
    pub fn ensure_model(&self, spec: &ModelSpec) -> SeedResult<Option<ModelId>> {
        if !self.repository.list_models_by_name(&spec.name)?.is_empty() {
            return Ok(None);
        }

        let model = Model::new(spec.name.as_str(), &spec.description);
        let model_id = self.repository.save_model(&model)?;

        match self.resources.load(&spec.thumbnail) {
            Ok(bytes) => self
                .repository
                .add_model_editor_source_extra(model_id, &bytes)?,
            Err(err) => warn!(
                "event=seed_model_thumbnail module=seed status=skipped model_id={} resource={} error={}",
                model_id,
                field_value(&spec.thumbnail),
                err
            ),
        }

        match self.resources.load(&spec.editor_source) {
            Ok(bytes) => self.repository.add_model_editor_source(model_id, &bytes)?,
            Err(err) => warn!(
                "event=seed_model_source module=seed status=skipped model_id={} resource={} error={}",
                model_id,
                field_value(&spec.editor_source),
                err
            ),
        }

        info!(
            "event=seed_model module=seed status=ok name={} model_id={}",
            field_value(&spec.name),
            model_id
        );
        Ok(Some(model_id))
    }
}
