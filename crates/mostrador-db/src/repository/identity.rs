//! # Identity Repository
//!
//! Access to `auth_users`, the identity table owned by the external
//! authentication system. The back-office reads identities and flips their
//! active flag. `insert` exists for seeding and tests only; credentials are
//! never stored here.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mostrador_core::AuthIdentity;

#[derive(Debug, Clone)]
pub struct IdentityRepository {
    pool: SqlitePool,
}

impl IdentityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        IdentityRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<AuthIdentity>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<AuthIdentity>> {
        let identity = sqlx::query_as::<_, AuthIdentity>(
            r#"
            SELECT id, username, first_name, last_name, email, is_staff, is_superuser, is_active
            FROM auth_users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    pub async fn list(&self) -> DbResult<Vec<AuthIdentity>> {
        let identities = sqlx::query_as::<_, AuthIdentity>(
            r#"
            SELECT id, username, first_name, last_name, email, is_staff, is_superuser, is_active
            FROM auth_users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(identities)
    }

    /// Inserts an identity (seed data and tests).
    pub async fn insert(&self, identity: &AuthIdentity) -> DbResult<()> {
        debug!(id = %identity.id, username = %identity.username, "Inserting identity");

        sqlx::query(
            r#"
            INSERT INTO auth_users (
                id, username, first_name, last_name, email, is_staff, is_superuser, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&identity.id)
        .bind(&identity.username)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.email)
        .bind(identity.is_staff)
        .bind(identity.is_superuser)
        .bind(identity.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets the active flag.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting identity active flag");

        let result = sqlx::query("UPDATE auth_users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Identity", id));
        }

        Ok(())
    }

    /// Looks up an identity on an existing connection or transaction.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<AuthIdentity>> {
        let identity = sqlx::query_as::<_, AuthIdentity>(
            r#"
            SELECT id, username, first_name, last_name, email, is_staff, is_superuser, is_active
            FROM auth_users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(identity)
    }
}
