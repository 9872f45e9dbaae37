//! # Register Commands
//!
//! Opening and closing register sessions (cajas) and their shifts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::notice::{Notice, Response};
use crate::state::AppState;
use mostrador_core::{RegisterSession, RegisterState, Shift};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDto {
    pub id: String,
    pub location: String,
    pub branch_id: Option<i64>,
    pub state: RegisterState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegisterSession> for RegisterDto {
    fn from(r: RegisterSession) -> Self {
        RegisterDto {
            id: r.id,
            location: r.location,
            branch_id: r.branch_id,
            state: r.state,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRegisterResponse {
    pub register: RegisterDto,
    pub shift_id: String,
    pub employee_id: String,
    pub employee_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRegisterResponse {
    pub register: RegisterDto,
    pub closed_shifts: u64,
}

/// Opens a register at `location` with a shift for `username`.
pub async fn open_register(
    state: &AppState,
    username: &str,
    location: &str,
) -> Result<Response<OpenRegisterResponse>, ApiError> {
    debug!(username = %username, location = %location, "open_register command");

    let identity = state.identity(username).await?;
    let opened = state.registers().open_register(location, &identity).await?;

    let employee_name = format!("{} {}", opened.employee.first_name, opened.employee.last_name)
        .trim()
        .to_string();

    let opened_at = Notice::success(format!("Register opened at {}", opened.register.location));

    let mut response = Response::new(OpenRegisterResponse {
        shift_id: opened.shift.id,
        employee_id: opened.employee.id,
        employee_name,
        register: opened.register.into(),
    })
    .with(opened_at);

    if opened.employee_created {
        response.push(Notice::success(format!(
            "Employee profile created for {}",
            identity.username
        )));
    }

    Ok(response)
}

pub async fn close_register(
    state: &AppState,
    register_id: &str,
) -> Result<Response<CloseRegisterResponse>, ApiError> {
    debug!(register_id = %register_id, "close_register command");

    let closed = state.registers().close_register(register_id).await?;
    let message = format!(
        "Register at {} closed; {} shift(s) ended",
        closed.register.location, closed.closed_shifts
    );

    Ok(Response::new(CloseRegisterResponse {
        register: closed.register.into(),
        closed_shifts: closed.closed_shifts,
    })
    .with(Notice::success(message)))
}

pub async fn list_registers(state: &AppState) -> Result<Vec<RegisterDto>, ApiError> {
    let registers = state.registers().list_registers().await?;
    Ok(registers.into_iter().map(RegisterDto::from).collect())
}

/// Moves a register to another location.
pub async fn update_register(
    state: &AppState,
    register_id: &str,
    location: &str,
) -> Result<Response<RegisterDto>, ApiError> {
    debug!(register_id = %register_id, location = %location, "update_register command");

    let register = state
        .registers()
        .update_register(register_id, location)
        .await?;

    Ok(Response::new(RegisterDto::from(register)).with(Notice::success("Register updated")))
}

pub async fn delete_register(
    state: &AppState,
    register_id: &str,
) -> Result<Response<()>, ApiError> {
    debug!(register_id = %register_id, "delete_register command");

    state.registers().delete_register(register_id).await?;
    Ok(Response::new(()).with(Notice::success("Register deleted")))
}

/// Shifts a sale can be recorded against.
pub async fn active_shifts(state: &AppState) -> Result<Vec<Shift>, ApiError> {
    Ok(state.registers().active_shifts().await?)
}
