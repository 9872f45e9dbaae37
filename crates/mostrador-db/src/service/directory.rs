//! # Employee Directory
//!
//! Maps authentication identities to employee profiles and enforces who may
//! change which profile.
//!
//! ```text
//! AuthIdentity ──resolve_employee──► Employee   (created on first use)
//!
//! edit_profile(actor, employee, update)
//!     1. load employee + owning identity    NotFound
//!     2. authorize                          PermissionDenied
//!     3. validate fields                    FormErrors
//!     4. save
//! ```
//!
//! Authorization runs before validation and before any write, so a denied
//! request never changes a field.

use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::{DbResult, ServiceError, ServiceResult};
use crate::repository::employee::EmployeeRepository;
use crate::repository::identity::IdentityRepository;
use crate::Database;
use mostrador_core::permissions::{authorize_profile_edit, authorize_toggle_active, require_staff};
use mostrador_core::validation::{validate_employee_profile, validate_profile_update};
use mostrador_core::{
    Actor, AuthIdentity, CoreError, Employee, EmployeeProfile, FormErrors, ProfileUpdate,
    ValidationError,
};

#[derive(Debug, Clone)]
pub struct EmployeeDirectory {
    db: Database,
}

impl EmployeeDirectory {
    pub fn new(db: Database) -> Self {
        EmployeeDirectory { db }
    }

    /// Returns the employee of `identity`, creating the profile from the
    /// identity's names and email on first use.
    pub async fn resolve_employee(&self, identity: &AuthIdentity) -> ServiceResult<Employee> {
        let mut tx = self.db.begin_write().await?;
        let (employee, _) = resolve_in(&mut tx, identity).await?;
        tx.commit().await?;
        Ok(employee)
    }

    /// Applies a profile edit on behalf of `actor`.
    pub async fn edit_profile(
        &self,
        actor: &Actor,
        employee_id: &str,
        update: &ProfileUpdate,
    ) -> ServiceResult<Employee> {
        let (mut employee, owner) = self.load_with_owner(employee_id).await?;

        if let Err(e) = authorize_profile_edit(actor, &owner.id, owner.is_superuser, update) {
            warn!(actor = %actor.user_id, employee_id = %employee_id, "Profile edit denied");
            return Err(e.into());
        }

        validate_profile_update(update)?;

        if update.is_empty() {
            return Ok(employee);
        }

        update.apply_to(&mut employee);
        let saved = self.db.employees().update(&employee).await?;

        info!(actor = %actor.user_id, employee_id = %employee_id, "Employee profile updated");
        Ok(saved)
    }

    /// Flips the active flag of the employee's identity and returns the new
    /// value.
    pub async fn toggle_active(&self, actor: &Actor, employee_id: &str) -> ServiceResult<bool> {
        let (_, owner) = self.load_with_owner(employee_id).await?;

        if let Err(e) = authorize_toggle_active(actor, owner.is_superuser) {
            warn!(actor = %actor.user_id, employee_id = %employee_id, "Toggle active denied");
            return Err(e.into());
        }

        let active = !owner.is_active;
        self.db.identities().set_active(&owner.id, active).await?;

        info!(actor = %actor.user_id, user_id = %owner.id, active, "Identity active flag changed");
        Ok(active)
    }

    /// Every employee profile. Staff only.
    pub async fn list_employees(&self, actor: &Actor) -> ServiceResult<Vec<Employee>> {
        require_staff(actor, "list employees")?;
        Ok(self.db.employees().list().await?)
    }

    /// Creates the profile of an existing identity. Staff only.
    pub async fn create_employee(
        &self,
        actor: &Actor,
        identity_id: &str,
        profile: &EmployeeProfile,
    ) -> ServiceResult<Employee> {
        require_staff(actor, "create employees")?;

        let profile = validate_employee_profile(profile)?;

        let mut tx = self.db.begin_write().await?;

        IdentityRepository::find(&mut tx, identity_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Identity", identity_id))?;

        if EmployeeRepository::find_by_user(&mut tx, identity_id)
            .await?
            .is_some()
        {
            return Err(duplicate_profile());
        }

        let employee = EmployeeRepository::insert(&mut tx, identity_id, &profile).await?;
        tx.commit().await?;

        info!(actor = %actor.user_id, employee_id = %employee.id, "Employee created");
        Ok(employee)
    }

    async fn load_with_owner(&self, employee_id: &str) -> ServiceResult<(Employee, AuthIdentity)> {
        let employee = self
            .db
            .employees()
            .get_by_id(employee_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Employee", employee_id))?;

        let owner = self
            .db
            .identities()
            .get_by_id(&employee.user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Identity", &employee.user_id))?;

        Ok((employee, owner))
    }
}

fn duplicate_profile() -> ServiceError {
    FormErrors::from(ValidationError::InvalidFormat {
        field: "user_id".to_string(),
        reason: "this user already has an employee profile".to_string(),
    })
    .into()
}

/// Finds or creates the employee of `identity` inside the caller's
/// transaction. The flag is true when the profile was just created.
pub(crate) async fn resolve_in(
    conn: &mut SqliteConnection,
    identity: &AuthIdentity,
) -> DbResult<(Employee, bool)> {
    if let Some(employee) = EmployeeRepository::find_by_user(&mut *conn, &identity.id).await? {
        return Ok((employee, false));
    }

    let profile = EmployeeProfile::from_identity(identity);
    let employee = EmployeeRepository::insert(conn, &identity.id, &profile).await?;

    info!(user_id = %identity.id, employee_id = %employee.id, "Employee profile created on first use");
    Ok((employee, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_identity, test_db};

    async fn employee_of(db: &Database, identity: &AuthIdentity) -> Employee {
        EmployeeDirectory::new(db.clone())
            .resolve_employee(identity)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let db = test_db().await;
        let identity = seed_identity(&db, "jperez", false, false).await;
        let directory = EmployeeDirectory::new(db.clone());

        let first = directory.resolve_employee(&identity).await.unwrap();
        let second = directory.resolve_employee(&identity).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.first_name, "jperez");
        assert_eq!(first.email, "jperez@mostrador.test");
        assert_eq!(db.employees().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_plain_user_cannot_edit_someone_else() {
        let db = test_db().await;
        let alice = seed_identity(&db, "alice", false, false).await;
        let bob = seed_identity(&db, "bob", false, false).await;
        let bob_employee = employee_of(&db, &bob).await;
        let directory = EmployeeDirectory::new(db.clone());

        let update = ProfileUpdate {
            first_name: Some("Hacked".to_string()),
            phone: Some("000".to_string()),
            ..ProfileUpdate::default()
        };
        let err = directory
            .edit_profile(&alice.actor(), &bob_employee.id, &update)
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::PermissionDenied(_))));

        let unchanged = db
            .employees()
            .get_by_id(&bob_employee.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.first_name, bob_employee.first_name);
        assert_eq!(unchanged.phone, None);
    }

    #[tokio::test]
    async fn test_user_edits_own_profile() {
        let db = test_db().await;
        let alice = seed_identity(&db, "alice", false, false).await;
        let employee = employee_of(&db, &alice).await;
        let directory = EmployeeDirectory::new(db.clone());

        let update = ProfileUpdate {
            first_name: Some(" Alicia ".to_string()),
            phone: Some("+591 700 00000".to_string()),
            ..ProfileUpdate::default()
        };
        let saved = directory
            .edit_profile(&alice.actor(), &employee.id, &update)
            .await
            .unwrap();
        assert_eq!(saved.first_name, "Alicia");
        assert_eq!(saved.phone.as_deref(), Some("+591 700 00000"));
    }

    #[tokio::test]
    async fn test_invalid_edit_reports_form_errors() {
        let db = test_db().await;
        let alice = seed_identity(&db, "alice", false, false).await;
        let employee = employee_of(&db, &alice).await;
        let directory = EmployeeDirectory::new(db.clone());

        let update = ProfileUpdate {
            email: Some("not-an-email".to_string()),
            ..ProfileUpdate::default()
        };
        let err = directory
            .edit_profile(&alice.actor(), &employee.id, &update)
            .await
            .unwrap_err();
        match err.rule() {
            Some(CoreError::Form(errors)) => assert_eq!(errors.for_field("email").count(), 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_staff_cannot_touch_superuser() {
        let db = test_db().await;
        let staff = seed_identity(&db, "staff", true, false).await;
        let root = seed_identity(&db, "root", true, true).await;
        let root_employee = employee_of(&db, &root).await;
        let directory = EmployeeDirectory::new(db.clone());

        let update = ProfileUpdate {
            last_name: Some("X".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(directory
            .edit_profile(&staff.actor(), &root_employee.id, &update)
            .await
            .is_err());
        assert!(directory
            .toggle_active(&staff.actor(), &root_employee.id)
            .await
            .is_err());

        let still_active = db.identities().get_by_id(&root.id).await.unwrap().unwrap();
        assert!(still_active.is_active);
    }

    #[tokio::test]
    async fn test_toggle_active_flips_flag() {
        let db = test_db().await;
        let staff = seed_identity(&db, "staff", true, false).await;
        let cashier = seed_identity(&db, "cashier", false, false).await;
        let employee = employee_of(&db, &cashier).await;
        let directory = EmployeeDirectory::new(db.clone());

        assert!(!directory
            .toggle_active(&staff.actor(), &employee.id)
            .await
            .unwrap());
        assert!(directory
            .toggle_active(&staff.actor(), &employee.id)
            .await
            .unwrap());

        let err = directory
            .toggle_active(&cashier.actor(), &employee.id)
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_create_employee_rules() {
        let db = test_db().await;
        let staff = seed_identity(&db, "staff", true, false).await;
        let newcomer = seed_identity(&db, "nuevo", false, false).await;
        let directory = EmployeeDirectory::new(db.clone());

        let profile = EmployeeProfile {
            first_name: "Nora".to_string(),
            last_name: "Vargas".to_string(),
            position: Some("Cajera".to_string()),
            ..EmployeeProfile::default()
        };

        let err = directory
            .create_employee(&newcomer.actor(), &newcomer.id, &profile)
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::PermissionDenied(_))));

        let created = directory
            .create_employee(&staff.actor(), &newcomer.id, &profile)
            .await
            .unwrap();
        assert_eq!(created.position.as_deref(), Some("Cajera"));

        let err = directory
            .create_employee(&staff.actor(), &newcomer.id, &profile)
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::Form(_))));

        let err = directory
            .create_employee(&staff.actor(), "missing", &profile)
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NotFound { .. })));

        assert!(directory.list_employees(&newcomer.actor()).await.is_err());
        assert_eq!(
            directory.list_employees(&staff.actor()).await.unwrap().len(),
            1
        );
    }
}
