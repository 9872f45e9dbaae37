//! # Register Session Manager
//!
//! Opens and closes register sessions (cajas) and their shifts (turnos).
//!
//! ## State Machine
//! ```text
//!                open_register(location)
//!   (none) ─────────────────────────────────► Open ──close_register──► Closed
//!                 fails with                    │
//!                 RegisterAlreadyOpen if        └─ shifts: closed_at = NULL
//!                 location already Open            until close stamps them
//! ```
//!
//! A closed session is never reopened; opening again creates a new record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, ServiceResult};
use crate::repository::register::RegisterRepository;
use crate::service::directory::resolve_in;
use crate::Database;
use mostrador_core::validation::validate_location;
use mostrador_core::{
    AuthIdentity, BranchMap, CoreError, Employee, FormErrors, RegisterSession, RegisterState, Shift,
};

/// Result of [`RegisterManager::open_register`].
#[derive(Debug, Clone, Serialize)]
pub struct OpenedRegister {
    pub register: RegisterSession,
    pub shift: Shift,
    pub employee: Employee,
    /// True when the employee profile was created by this call.
    pub employee_created: bool,
}

/// Result of [`RegisterManager::close_register`].
#[derive(Debug, Clone, Serialize)]
pub struct ClosedRegister {
    pub register: RegisterSession,
    pub closed_shifts: u64,
    pub closed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RegisterManager {
    db: Database,
    branches: BranchMap,
}

impl RegisterManager {
    pub fn new(db: Database, branches: BranchMap) -> Self {
        RegisterManager { db, branches }
    }

    /// The configured location → branch mapping.
    pub fn branches(&self) -> &BranchMap {
        &self.branches
    }

    /// Opens a register at `location` and starts a shift for the employee
    /// of `identity`, creating that employee's profile on first use.
    ///
    /// Fails with [`CoreError::RegisterAlreadyOpen`] when the location
    /// already has an open session. Everything happens in one transaction.
    pub async fn open_register(
        &self,
        location: &str,
        identity: &AuthIdentity,
    ) -> ServiceResult<OpenedRegister> {
        let location = validate_location(location).map_err(FormErrors::from)?;

        let mut tx = self.db.begin_write().await?;

        if RegisterRepository::find_open_at(&mut tx, &location)
            .await?
            .is_some()
        {
            warn!(location = %location, "Register already open at location");
            return Err(CoreError::RegisterAlreadyOpen { location }.into());
        }

        let now = Utc::now();
        let register = RegisterSession {
            id: Uuid::new_v4().to_string(),
            branch_id: self.branches.branch_for(&location),
            location,
            state: RegisterState::Open,
            created_at: now,
            updated_at: now,
        };

        match RegisterRepository::insert(&mut tx, &register).await {
            Err(DbError::UniqueViolation { .. }) => {
                return Err(CoreError::RegisterAlreadyOpen {
                    location: register.location,
                }
                .into())
            }
            other => other?,
        }

        let (employee, employee_created) = resolve_in(&mut tx, identity).await?;

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            register_id: register.id.clone(),
            employee_id: employee.id.clone(),
            opened_at: now,
            closed_at: None,
        };
        RegisterRepository::insert_shift(&mut tx, &shift).await?;

        tx.commit().await?;

        info!(
            register_id = %register.id,
            location = %register.location,
            branch_id = ?register.branch_id,
            shift_id = %shift.id,
            employee_id = %employee.id,
            "Register opened"
        );

        Ok(OpenedRegister {
            register,
            shift,
            employee,
            employee_created,
        })
    }

    /// Closes an open session and stamps `closed_at` on all of its active
    /// shifts.
    pub async fn close_register(&self, register_id: &str) -> ServiceResult<ClosedRegister> {
        let mut tx = self.db.begin_write().await?;

        let mut register = RegisterRepository::find(&mut tx, register_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Register", register_id))?;

        if !register.is_open() {
            return Err(CoreError::RegisterAlreadyClosed {
                register_id: register_id.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        RegisterRepository::close(&mut tx, register_id, now).await?;
        let closed_shifts = RegisterRepository::close_active_shifts(&mut tx, register_id, now).await?;

        tx.commit().await?;

        register.state = RegisterState::Closed;
        register.updated_at = now;

        info!(register_id = %register_id, closed_shifts, "Register closed");

        Ok(ClosedRegister {
            register,
            closed_shifts,
            closed_at: now,
        })
    }

    /// Moves a session to another location. A mapped location sets its
    /// branch; an unmapped one leaves the branch as it was.
    pub async fn update_register(
        &self,
        register_id: &str,
        location: &str,
    ) -> ServiceResult<RegisterSession> {
        let location = validate_location(location).map_err(FormErrors::from)?;
        let branch_id = self.branches.branch_for(&location);

        match self
            .db
            .registers()
            .update_location(register_id, &location, branch_id)
            .await
        {
            Ok(register) => {
                info!(register_id = %register_id, location = %location, "Register updated");
                Ok(register)
            }
            Err(DbError::UniqueViolation { .. }) => {
                Err(CoreError::RegisterAlreadyOpen { location }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a session with its shifts.
    pub async fn delete_register(&self, register_id: &str) -> ServiceResult<()> {
        self.db.registers().delete(register_id).await?;
        info!(register_id = %register_id, "Register deleted");
        Ok(())
    }

    pub async fn list_registers(&self) -> ServiceResult<Vec<RegisterSession>> {
        Ok(self.db.registers().list().await?)
    }

    /// Shifts a sale may currently be attached to.
    pub async fn active_shifts(&self) -> ServiceResult<Vec<Shift>> {
        Ok(self.db.registers().active_shifts().await?)
    }
}
