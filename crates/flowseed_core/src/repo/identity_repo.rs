//! Identity store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist groups, users, memberships, avatars and profile attributes.
//! - Answer existence queries by identifier with a count.
//!
//! # Invariants
//! - Groups and users are insert-only; a duplicate identifier is a DB error.
//! - Avatar and profile attribute writes replace the previous value.
//! - Profile attributes keep the order in which keys were first written.

use super::{count_to_u64, ensure_connection_ready, RepoError, RepoResult};
use crate::model::identity::{validate_identifier, Group, GroupType, Picture, User};
use crate::model::ValidationError;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Identity half of the workflow engine facade.
pub trait IdentityStore {
    /// Counts groups with exactly this identifier (0 or 1).
    fn count_groups_by_id(&self, group_id: &str) -> RepoResult<u64>;
    fn create_group(&self, group: &Group) -> RepoResult<()>;
    fn get_group(&self, group_id: &str) -> RepoResult<Option<Group>>;
    /// Lists all groups ordered by identifier.
    fn list_groups(&self) -> RepoResult<Vec<Group>>;

    /// Counts users with exactly this identifier (0 or 1).
    fn count_users_by_id(&self, user_id: &str) -> RepoResult<u64>;
    fn create_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, user_id: &str) -> RepoResult<Option<User>>;
    /// Lists all users ordered by identifier.
    fn list_users(&self) -> RepoResult<Vec<User>>;

    /// Adds `user_id` to `group_id`. Both records must exist.
    fn create_membership(&self, user_id: &str, group_id: &str) -> RepoResult<()>;
    /// Returns group identifiers for one user in membership creation order.
    fn list_user_groups(&self, user_id: &str) -> RepoResult<Vec<String>>;

    /// Sets or replaces the user's avatar.
    fn set_user_picture(&self, user_id: &str, picture: &Picture) -> RepoResult<()>;
    fn get_user_picture(&self, user_id: &str) -> RepoResult<Option<Picture>>;

    /// Sets or replaces one profile attribute.
    fn set_user_info(&self, user_id: &str, key: &str, value: &str) -> RepoResult<()>;
    /// Returns profile attributes in first-write order.
    fn list_user_info(&self, user_id: &str) -> RepoResult<Vec<(String, String)>>;
}

/// SQLite-backed identity store.
pub struct SqliteIdentityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityStore<'conn> {
    /// Creates a store over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn ensure_user_exists(&self, user_id: &str) -> RepoResult<()> {
        if self.count_users_by_id(user_id)? == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
        Ok(())
    }
}

impl IdentityStore for SqliteIdentityStore<'_> {
    fn count_groups_by_id(&self, group_id: &str) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM identity_groups WHERE id = ?1;",
            [group_id],
            |row| row.get(0),
        )?;
        Ok(count_to_u64(count))
    }

    fn create_group(&self, group: &Group) -> RepoResult<()> {
        group.validate()?;

        self.conn.execute(
            "INSERT INTO identity_groups (id, name, type) VALUES (?1, ?2, ?3);",
            params![group.id, group.name, group.kind.as_str()],
        )?;
        Ok(())
    }

    fn get_group(&self, group_id: &str) -> RepoResult<Option<Group>> {
        self.conn
            .query_row(
                "SELECT id, name, type FROM identity_groups WHERE id = ?1;",
                [group_id],
                |row| Ok(parse_group_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_groups(&self) -> RepoResult<Vec<Group>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, type FROM identity_groups ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn count_users_by_id(&self, user_id: &str) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM identity_users WHERE id = ?1;",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count_to_u64(count))
    }

    fn create_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO identity_users (id, first_name, last_name, password, email)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.password,
                user.email,
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, first_name, last_name, password, email FROM identity_users WHERE id = ?1;",
                [user_id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, password, email FROM identity_users ORDER BY id ASC;",
        )?;
        let users = stmt
            .query_map([], parse_user_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn create_membership(&self, user_id: &str, group_id: &str) -> RepoResult<()> {
        validate_identifier("user", user_id)?;
        validate_identifier("group", group_id)?;
        self.ensure_user_exists(user_id)?;
        if self.count_groups_by_id(group_id)? == 0 {
            return Err(RepoError::NotFound {
                entity: "group",
                id: group_id.to_string(),
            });
        }

        self.conn.execute(
            "INSERT INTO identity_memberships (user_id, group_id) VALUES (?1, ?2);",
            params![user_id, group_id],
        )?;
        Ok(())
    }

    fn list_user_groups(&self, user_id: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id FROM identity_memberships WHERE user_id = ?1 ORDER BY rowid ASC;",
        )?;
        let groups = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn set_user_picture(&self, user_id: &str, picture: &Picture) -> RepoResult<()> {
        picture.validate()?;
        self.ensure_user_exists(user_id)?;

        self.conn.execute(
            "INSERT INTO identity_pictures (user_id, bytes, mime_type)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                bytes = excluded.bytes,
                mime_type = excluded.mime_type,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![user_id, picture.bytes, picture.mime_type],
        )?;
        Ok(())
    }

    fn get_user_picture(&self, user_id: &str) -> RepoResult<Option<Picture>> {
        let picture = self
            .conn
            .query_row(
                "SELECT bytes, mime_type FROM identity_pictures WHERE user_id = ?1;",
                [user_id],
                |row| Ok(Picture::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(picture)
    }

    fn set_user_info(&self, user_id: &str, key: &str, value: &str) -> RepoResult<()> {
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyField("user info key").into());
        }
        self.ensure_user_exists(user_id)?;

        self.conn.execute(
            "INSERT INTO identity_info (user_id, info_key, info_value, sort_order)
             VALUES (
                ?1,
                ?2,
                ?3,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM identity_info WHERE user_id = ?1)
             )
             ON CONFLICT(user_id, info_key) DO UPDATE SET
                info_value = excluded.info_value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![user_id, key, value],
        )?;
        Ok(())
    }

    fn list_user_info(&self, user_id: &str) -> RepoResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT info_key, info_value FROM identity_info WHERE user_id = ?1 ORDER BY sort_order ASC;",
        )?;
        let pairs = stmt
            .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let type_text: String = row.get("type")?;
    let kind = GroupType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid group type `{type_text}` in identity_groups.type"))
    })?;

    Ok(Group {
        id: row.get("id")?,
        name: row.get("name")?,
        kind,
    })
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        password: row.get("password")?,
        email: row.get("email")?,
    })
}
