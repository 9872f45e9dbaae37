//! # Employee Commands

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::notice::{Notice, Response};
use crate::state::AppState;
use mostrador_core::{Employee, EmployeeProfile, ProfileUpdate};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
}

impl From<Employee> for EmployeeDto {
    fn from(e: Employee) -> Self {
        EmployeeDto {
            id: e.id,
            user_id: e.user_id,
            first_name: e.first_name,
            last_name: e.last_name,
            email: e.email,
            phone: e.phone,
            position: e.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleActiveResponse {
    pub employee_id: String,
    pub active: bool,
}

/// The profile of the requesting user, created on first use.
pub async fn my_profile(state: &AppState, username: &str) -> Result<EmployeeDto, ApiError> {
    let identity = state.identity(username).await?;
    let employee = state.directory().resolve_employee(&identity).await?;
    Ok(employee.into())
}

pub async fn list_employees(state: &AppState, username: &str) -> Result<Vec<EmployeeDto>, ApiError> {
    let actor = state.identity(username).await?.actor();
    let employees = state.directory().list_employees(&actor).await?;
    Ok(employees.into_iter().map(EmployeeDto::from).collect())
}

/// Creates the profile of `target_username`.
pub async fn create_employee(
    state: &AppState,
    username: &str,
    target_username: &str,
    profile: &EmployeeProfile,
) -> Result<Response<EmployeeDto>, ApiError> {
    debug!(username = %username, target = %target_username, "create_employee command");

    let actor = state.identity(username).await?.actor();
    let target = state
        .db()
        .identities()
        .get_by_username(target_username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", target_username))?;

    let employee = state
        .directory()
        .create_employee(&actor, &target.id, profile)
        .await?;

    Ok(Response::new(EmployeeDto::from(employee)).with(Notice::success("Employee created")))
}

pub async fn edit_profile(
    state: &AppState,
    username: &str,
    employee_id: &str,
    update: &ProfileUpdate,
) -> Result<Response<EmployeeDto>, ApiError> {
    debug!(username = %username, employee_id = %employee_id, "edit_profile command");

    let actor = state.identity(username).await?.actor();
    let employee = state
        .directory()
        .edit_profile(&actor, employee_id, update)
        .await?;

    Ok(Response::new(EmployeeDto::from(employee)).with(Notice::success("Profile saved")))
}

/// Activates or deactivates the employee's login.
pub async fn toggle_active(
    state: &AppState,
    username: &str,
    employee_id: &str,
) -> Result<Response<ToggleActiveResponse>, ApiError> {
    debug!(username = %username, employee_id = %employee_id, "toggle_active command");

    let actor = state.identity(username).await?.actor();
    let active = state.directory().toggle_active(&actor, employee_id).await?;

    let message = if active {
        "Employee activated"
    } else {
        "Employee deactivated"
    };

    Ok(Response::new(ToggleActiveResponse {
        employee_id: employee_id.to_string(),
        active,
    })
    .with(Notice::success(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackofficeConfig;
    use crate::error::ErrorCode;
    use mostrador_db::test_utils::{seed_identity, test_db};

    #[tokio::test]
    async fn test_edit_other_profile_is_rejected() {
        let state = AppState::new(test_db().await, BackofficeConfig::default());
        seed_identity(state.db(), "alice", false, false).await;
        seed_identity(state.db(), "bob", false, false).await;
        let bob = my_profile(&state, "bob").await.unwrap();

        let update = ProfileUpdate {
            first_name: Some("Hacked".into()),
            ..ProfileUpdate::default()
        };
        let err = edit_profile(&state, "alice", &bob.id, &update)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(err.is_reject());

        let saved = edit_profile(&state, "bob", &bob.id, &update).await.unwrap();
        assert_eq!(saved.data.first_name, "Hacked");
    }

    #[tokio::test]
    async fn test_deactivated_user_loses_access() {
        let state = AppState::new(test_db().await, BackofficeConfig::default());
        seed_identity(state.db(), "encargada", true, false).await;
        seed_identity(state.db(), "cajero", false, false).await;
        let cajero = my_profile(&state, "cajero").await.unwrap();

        let toggled = toggle_active(&state, "encargada", &cajero.id).await.unwrap();
        assert!(!toggled.data.active);

        let err = my_profile(&state, "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let toggled = toggle_active(&state, "encargada", &cajero.id).await.unwrap();
        assert!(toggled.data.active);
        assert!(my_profile(&state, "cajero").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_employee_for_identity() {
        let state = AppState::new(test_db().await, BackofficeConfig::default());
        seed_identity(state.db(), "encargada", true, false).await;
        seed_identity(state.db(), "nuevo", false, false).await;

        let profile = EmployeeProfile {
            first_name: "Nora".into(),
            last_name: "Vargas".into(),
            ..EmployeeProfile::default()
        };
        let created = create_employee(&state, "encargada", "nuevo", &profile)
            .await
            .unwrap();
        assert_eq!(created.data.first_name, "Nora");

        let err = create_employee(&state, "encargada", "nadie", &profile)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(list_employees(&state, "encargada").await.unwrap().len(), 1);
    }
}
