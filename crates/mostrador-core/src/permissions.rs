//! # Permissions
//!
//! Authorization rules of the employee directory and of staff-only
//! maintenance operations. The acting identity is always passed in
//! explicitly; there is no ambient "current user".
//!
//! ```text
//!                       target is superuser?
//!                        no             yes
//!                   ┌──────────────┬──────────────┐
//!  actor superuser  │    allow     │    allow     │
//!  actor staff      │    allow     │    deny      │
//!  actor (plain)    │  own only    │    deny      │
//!                   └──────────────┴──────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Actor, ProfileUpdate};

/// Requires a staff actor.
pub fn require_staff(actor: &Actor, action: &str) -> CoreResult<()> {
    if actor.is_staff || actor.is_superuser {
        Ok(())
    } else {
        Err(CoreError::denied(format!("only staff may {}", action)))
    }
}

fn guard_superuser_target(actor: &Actor, target_is_superuser: bool) -> CoreResult<()> {
    if target_is_superuser && !actor.is_superuser {
        return Err(CoreError::denied(
            "only a superuser may change a superuser's account",
        ));
    }
    Ok(())
}

/// Checks whether `actor` may apply `update` to the profile of the identity
/// `target_user_id`.
///
/// ```rust
/// use mostrador_core::permissions::authorize_profile_edit;
/// use mostrador_core::{Actor, ProfileUpdate};
///
/// let cashier = Actor { user_id: "u1".into(), is_staff: false, is_superuser: false };
/// let update = ProfileUpdate { phone: Some("555-0101".into()), ..Default::default() };
///
/// assert!(authorize_profile_edit(&cashier, "u1", false, &update).is_ok());
/// assert!(authorize_profile_edit(&cashier, "u2", false, &update).is_err());
/// ```
pub fn authorize_profile_edit(
    actor: &Actor,
    target_user_id: &str,
    target_is_superuser: bool,
    update: &ProfileUpdate,
) -> CoreResult<()> {
    guard_superuser_target(actor, target_is_superuser)?;

    let privileged = actor.is_staff || actor.is_superuser;

    if !privileged && actor.user_id != target_user_id {
        return Err(CoreError::denied("you may only edit your own profile"));
    }

    if !privileged && update.position.is_some() {
        return Err(CoreError::denied("only staff may change an employee's position"));
    }

    Ok(())
}

/// Checks whether `actor` may activate or deactivate the target identity.
pub fn authorize_toggle_active(actor: &Actor, target_is_superuser: bool) -> CoreResult<()> {
    require_staff(actor, "activate or deactivate accounts")?;
    guard_superuser_target(actor, target_is_superuser)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str, staff: bool, superuser: bool) -> Actor {
        Actor {
            user_id: id.to_string(),
            is_staff: staff,
            is_superuser: superuser,
        }
    }

    fn names_only() -> ProfileUpdate {
        ProfileUpdate {
            first_name: Some("Ana".to_string()),
            ..ProfileUpdate::default()
        }
    }

    #[test]
    fn test_plain_actor_edits_only_own_profile() {
        let cashier = actor("u1", false, false);
        assert!(authorize_profile_edit(&cashier, "u1", false, &names_only()).is_ok());
        assert!(matches!(
            authorize_profile_edit(&cashier, "u2", false, &names_only()),
            Err(CoreError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_position_is_staff_only() {
        let update = ProfileUpdate {
            position: Some("Supervisor".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(authorize_profile_edit(&actor("u1", false, false), "u1", false, &update).is_err());
        assert!(authorize_profile_edit(&actor("s1", true, false), "u1", false, &update).is_ok());
    }

    #[test]
    fn test_superuser_profiles_need_superuser_actor() {
        let staff = actor("s1", true, false);
        let root = actor("r1", true, true);

        assert!(authorize_profile_edit(&staff, "r2", true, &names_only()).is_err());
        assert!(authorize_profile_edit(&root, "r2", true, &names_only()).is_ok());
        // A superuser editing their own profile is still fine for a superuser.
        assert!(authorize_profile_edit(&root, "r1", true, &names_only()).is_ok());
    }

    #[test]
    fn test_toggle_active() {
        assert!(authorize_toggle_active(&actor("u1", false, false), false).is_err());
        assert!(authorize_toggle_active(&actor("s1", true, false), false).is_ok());
        assert!(authorize_toggle_active(&actor("s1", true, false), true).is_err());
        assert!(authorize_toggle_active(&actor("r1", false, true), true).is_ok());
    }

    #[test]
    fn test_require_staff_message() {
        let err = require_staff(&actor("u1", false, false), "delete sales").unwrap_err();
        assert_eq!(err.to_string(), "Permission denied: only staff may delete sales");
    }
}
