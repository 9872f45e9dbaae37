//! # Employee Repository
//!
//! Employee profiles, one per authentication identity (`user_id` is unique).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mostrador_core::{Employee, EmployeeProfile};

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// All employees ordered by last name, then first name.
    pub async fn list(&self) -> DbResult<Vec<Employee>> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, first_name, last_name, email, phone, position, created_at, updated_at
            FROM employees
            ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, first_name, last_name, email, phone, position, created_at, updated_at
            FROM employees
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    pub async fn get_by_user_id(&self, user_id: &str) -> DbResult<Option<Employee>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_user(&mut conn, user_id).await
    }

    /// Saves the editable fields of an employee.
    pub async fn update(&self, employee: &Employee) -> DbResult<Employee> {
        debug!(id = %employee.id, "Updating employee");

        let updated = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees SET
                first_name = ?2,
                last_name = ?3,
                email = ?4,
                phone = ?5,
                position = ?6,
                updated_at = ?7
            WHERE id = ?1
            RETURNING id, user_id, first_name, last_name, email, phone, position, created_at, updated_at
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.position)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Employee", &employee.id))
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    pub async fn find_by_user(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, first_name, last_name, email, phone, position, created_at, updated_at
            FROM employees
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(employee)
    }

    /// Creates the profile of `user_id`. A second profile for the same
    /// identity fails with a unique violation.
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: &str,
        profile: &EmployeeProfile,
    ) -> DbResult<Employee> {
        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            position: profile.position.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %employee.id, user_id = %user_id, "Inserting employee");

        sqlx::query(
            r#"
            INSERT INTO employees (
                id, user_id, first_name, last_name, email, phone, position, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.user_id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.position)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(conn)
        .await?;

        Ok(employee)
    }
}
