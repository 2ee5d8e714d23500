//! Repository store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist deployment bundles with their ordered resources.
//! - Persist design models and their binary editor attachments.
//!
//! # Invariants
//! - `deploy` writes the header and every resource in one `IMMEDIATE`
//!   transaction; a failure leaves no partial deployment behind.
//! - Deployment versions start at 1 and increase by one per name.
//! - Deployment resources are returned in declared order.

use super::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::repository::{
    Deployment, DeploymentBuilder, DeploymentId, DeploymentResource, Model, ModelId,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const DEPLOYMENT_SELECT_SQL: &str = "SELECT id, name, version, deployed_at FROM deployments";
const MODEL_SELECT_SQL: &str =
    "SELECT id, name, meta_info, editor_source, editor_source_extra FROM models";

/// Repository half of the workflow engine facade.
pub trait RepositoryStore {
    /// Lists deployments whose name matches exactly, oldest version first.
    fn list_deployments_by_name(&self, name: &str) -> RepoResult<Vec<Deployment>>;
    /// Lists every deployment ordered by name, then version.
    fn list_deployments(&self) -> RepoResult<Vec<Deployment>>;
    /// Commits the builder as a new deployment version.
    fn deploy(&self, builder: &DeploymentBuilder) -> RepoResult<Deployment>;
    fn list_deployment_resources(
        &self,
        deployment_id: DeploymentId,
    ) -> RepoResult<Vec<DeploymentResource>>;

    fn list_models_by_name(&self, name: &str) -> RepoResult<Vec<Model>>;
    /// Inserts or replaces the model header (name and metadata).
    fn save_model(&self, model: &Model) -> RepoResult<ModelId>;
    fn get_model(&self, model_id: ModelId) -> RepoResult<Option<Model>>;
    /// Attaches editor JSON source to an existing model.
    fn add_model_editor_source(&self, model_id: ModelId, bytes: &[u8]) -> RepoResult<()>;
    /// Attaches the SVG thumbnail to an existing model.
    fn add_model_editor_source_extra(&self, model_id: ModelId, bytes: &[u8]) -> RepoResult<()>;
}

/// SQLite-backed repository store.
pub struct SqliteRepositoryStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositoryStore<'conn> {
    /// Creates a store over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn set_model_blob(
        &self,
        model_id: ModelId,
        column: &'static str,
        bytes: &[u8],
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE models SET {column} = ?2 WHERE id = ?1;"),
            params![model_id.to_string(), bytes],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "model",
                id: model_id.to_string(),
            });
        }
        Ok(())
    }
}

impl RepositoryStore for SqliteRepositoryStore<'_> {
    fn list_deployments_by_name(&self, name: &str) -> RepoResult<Vec<Deployment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DEPLOYMENT_SELECT_SQL} WHERE name = ?1 ORDER BY version ASC;"
        ))?;
        let mut rows = stmt.query([name])?;
        let mut deployments = Vec::new();
        while let Some(row) = rows.next()? {
            deployments.push(parse_deployment_row(row)?);
        }
        Ok(deployments)
    }

    fn list_deployments(&self) -> RepoResult<Vec<Deployment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DEPLOYMENT_SELECT_SQL} ORDER BY name ASC, version ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut deployments = Vec::new();
        while let Some(row) = rows.next()? {
            deployments.push(parse_deployment_row(row)?);
        }
        Ok(deployments)
    }

    fn deploy(&self, builder: &DeploymentBuilder) -> RepoResult<Deployment> {
        builder.validate()?;

        let deployment_id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let version = next_deployment_version(&tx, builder.name())?;

        tx.execute(
            "INSERT INTO deployments (id, name, version) VALUES (?1, ?2, ?3);",
            params![deployment_id.to_string(), builder.name(), version],
        )?;

        for (ordinal, resource) in builder.resources().iter().enumerate() {
            tx.execute(
                "INSERT INTO deployment_resources (deployment_id, ordinal, name, bytes)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    deployment_id.to_string(),
                    ordinal as i64,
                    resource.name,
                    resource.bytes,
                ],
            )?;
        }

        let deployment = tx.query_row(
            &format!("{DEPLOYMENT_SELECT_SQL} WHERE id = ?1;"),
            [deployment_id.to_string()],
            |row| Ok(parse_deployment_row(row)),
        )??;

        tx.commit()?;
        Ok(deployment)
    }

    fn list_deployment_resources(
        &self,
        deployment_id: DeploymentId,
    ) -> RepoResult<Vec<DeploymentResource>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, bytes
             FROM deployment_resources
             WHERE deployment_id = ?1
             ORDER BY ordinal ASC;",
        )?;
        let resources = stmt
            .query_map([deployment_id.to_string()], |row| {
                Ok(DeploymentResource {
                    name: row.get(0)?,
                    bytes: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    fn list_models_by_name(&self, name: &str) -> RepoResult<Vec<Model>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MODEL_SELECT_SQL} WHERE name = ?1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([name])?;
        let mut models = Vec::new();
        while let Some(row) = rows.next()? {
            models.push(parse_model_row(row)?);
        }
        Ok(models)
    }

    fn save_model(&self, model: &Model) -> RepoResult<ModelId> {
        model.validate()?;

        self.conn.execute(
            "INSERT INTO models (id, name, meta_info) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                meta_info = excluded.meta_info;",
            params![model.id.to_string(), model.name, model.meta_info],
        )?;
        Ok(model.id)
    }

    fn get_model(&self, model_id: ModelId) -> RepoResult<Option<Model>> {
        self.conn
            .query_row(
                &format!("{MODEL_SELECT_SQL} WHERE id = ?1;"),
                [model_id.to_string()],
                |row| Ok(parse_model_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn add_model_editor_source(&self, model_id: ModelId, bytes: &[u8]) -> RepoResult<()> {
        self.set_model_blob(model_id, "editor_source", bytes)
    }

    fn add_model_editor_source_extra(&self, model_id: ModelId, bytes: &[u8]) -> RepoResult<()> {
        self.set_model_blob(model_id, "editor_source_extra", bytes)
    }
}

fn next_deployment_version(tx: &Transaction<'_>, name: &str) -> RepoResult<u32> {
    let current: Option<u32> = tx
        .query_row(
            "SELECT MAX(version) FROM deployments WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .optional()?
        .flatten();
    Ok(current.map_or(1, |version| version + 1))
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_deployment_row(row: &Row<'_>) -> RepoResult<Deployment> {
    let id_text: String = row.get("id")?;
    Ok(Deployment {
        id: parse_uuid(&id_text, "deployments.id")?,
        name: row.get("name")?,
        version: row.get("version")?,
        deployed_at: row.get("deployed_at")?,
    })
}

fn parse_model_row(row: &Row<'_>) -> RepoResult<Model> {
    let id_text: String = row.get("id")?;
    Ok(Model {
        id: parse_uuid(&id_text, "models.id")?,
        name: row.get("name")?,
        meta_info: row.get("meta_info")?,
        editor_source: row.get("editor_source")?,
        editor_source_extra: row.get("editor_source_extra")?,
    })
}
