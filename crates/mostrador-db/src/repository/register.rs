//! # Register Repository
//!
//! Register sessions (cajas) and the shifts (turnos) opened against them.
//!
//! ## Session Lifecycle
//! ```text
//! insert(state: open) ──► close() ──► closed
//!        │                   │
//!        └─ insert_shift()   └─ close_active_shifts()
//! ```
//!
//! Opening and closing run inside a write transaction, so those operations
//! take a `&mut SqliteConnection`. Listing and maintenance use the pool.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mostrador_core::{RegisterSession, RegisterState, Shift};

#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// All register sessions, newest first.
    pub async fn list(&self) -> DbResult<Vec<RegisterSession>> {
        let registers = sqlx::query_as::<_, RegisterSession>(
            r#"
            SELECT id, location, branch_id, state, created_at, updated_at
            FROM registers
            ORDER BY created_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(registers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RegisterSession>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Changes the location of a session. A `None` branch keeps the
    /// current one.
    pub async fn update_location(
        &self,
        id: &str,
        location: &str,
        branch_id: Option<i64>,
    ) -> DbResult<RegisterSession> {
        debug!(id = %id, location = %location, "Updating register location");

        let register = sqlx::query_as::<_, RegisterSession>(
            r#"
            UPDATE registers SET
                location = ?2,
                branch_id = COALESCE(?3, branch_id),
                updated_at = ?4
            WHERE id = ?1
            RETURNING id, location, branch_id, state, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(location)
        .bind(branch_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        register.ok_or_else(|| DbError::not_found("Register", id))
    }

    /// Deletes a session together with its shifts (and their sales).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting register");

        let result = sqlx::query("DELETE FROM registers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Register", id));
        }

        Ok(())
    }

    /// Shifts with no closing time, oldest first.
    pub async fn active_shifts(&self) -> DbResult<Vec<Shift>> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, register_id, employee_id, opened_at, closed_at
            FROM shifts
            WHERE closed_at IS NULL
            ORDER BY opened_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Every shift of one session, oldest first.
    pub async fn shifts_for(&self, register_id: &str) -> DbResult<Vec<Shift>> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, register_id, employee_id, opened_at, closed_at
            FROM shifts
            WHERE register_id = ?1
            ORDER BY opened_at, id
            "#,
        )
        .bind(register_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    pub async fn get_shift(&self, id: &str) -> DbResult<Option<Shift>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_shift(&mut conn, id).await
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<RegisterSession>> {
        let register = sqlx::query_as::<_, RegisterSession>(
            r#"
            SELECT id, location, branch_id, state, created_at, updated_at
            FROM registers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(register)
    }

    /// The open session at a location, if any.
    pub async fn find_open_at(
        conn: &mut SqliteConnection,
        location: &str,
    ) -> DbResult<Option<RegisterSession>> {
        let register = sqlx::query_as::<_, RegisterSession>(
            r#"
            SELECT id, location, branch_id, state, created_at, updated_at
            FROM registers
            WHERE location = ?1 AND state = 'open'
            "#,
        )
        .bind(location)
        .fetch_optional(conn)
        .await?;

        Ok(register)
    }

    pub async fn insert(conn: &mut SqliteConnection, register: &RegisterSession) -> DbResult<()> {
        debug!(id = %register.id, location = %register.location, "Inserting register");

        sqlx::query(
            r#"
            INSERT INTO registers (id, location, branch_id, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&register.id)
        .bind(&register.location)
        .bind(register.branch_id)
        .bind(register.state)
        .bind(register.created_at)
        .bind(register.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Marks a session closed. Returns false when it was not open.
    pub async fn close(
        conn: &mut SqliteConnection,
        id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE registers SET state = ?2, updated_at = ?3 WHERE id = ?1 AND state = 'open'",
        )
        .bind(id)
        .bind(RegisterState::Closed)
        .bind(at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn find_shift(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, register_id, employee_id, opened_at, closed_at
            FROM shifts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(shift)
    }

    pub async fn insert_shift(conn: &mut SqliteConnection, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, register_id = %shift.register_id, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (id, register_id, employee_id, opened_at, closed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.register_id)
        .bind(&shift.employee_id)
        .bind(shift.opened_at)
        .bind(shift.closed_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Stamps `closed_at` on every active shift of a session. Returns how
    /// many shifts were closed.
    pub async fn close_active_shifts(
        conn: &mut SqliteConnection,
        register_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE shifts SET closed_at = ?2 WHERE register_id = ?1 AND closed_at IS NULL",
        )
        .bind(register_id)
        .bind(at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
