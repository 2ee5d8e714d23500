//! Engine store schema steps.
//!
//! Each step is a SQL batch tagged with the `user_version` it leaves the
//! store at. Pending steps run together in one transaction.
//!
//! # Schema
//! - v1 `identity`: `identity_groups`, `identity_users`,
//!   `identity_memberships`, `identity_pictures`, `identity_info`.
//! - v2 `repository`: `deployments`, `deployment_resources`, `models`.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "identity",
        sql: include_str!("0001_identity.sql"),
    },
    SchemaStep {
        version: 2,
        name: "repository",
        sql: include_str!("0002_repository.sql"),
    },
];

/// Schema version a fully migrated store reports.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the store up to [`latest_version`].
///
/// A store already ahead of this build is rejected untouched. A failing step
/// rolls back every step applied in the same call.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = store_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::UnsupportedSchemaVersion { found, supported });
    }

    let mut pending = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .peekable();
    if pending.peek().is_none() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        debug!(
            "event=db_migrate module=db status=apply version={} step={}",
            step.version, step.name
        );
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;
    Ok(())
}

fn store_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
