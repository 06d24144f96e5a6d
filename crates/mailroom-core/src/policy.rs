//! Access policy gate.
//!
//! The only place where the role hierarchy is interpreted. Checks are
//! pure: they look at the caller (if any) and either hand it back or
//! fail. The authentication check always runs before the role check, so
//! an anonymous caller sees [`MailroomError::Unauthenticated`], never
//! [`MailroomError::Forbidden`].

use crate::error::{MailroomError, MailroomResult};
use crate::models::user::{Role, User};

/// A precondition evaluated before a handler body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    AdminOrAbove,
    SuperAdmin,
}

impl Gate {
    /// Whether a caller with `role` passes this gate.
    pub fn admits(self, role: Role) -> bool {
        match self {
            Gate::Authenticated => true,
            Gate::AdminOrAbove => role >= Role::Admin,
            Gate::SuperAdmin => role == Role::SuperAdmin,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Gate::Authenticated => "authentication required",
            Gate::AdminOrAbove => "insufficient permissions",
            Gate::SuperAdmin => "super admin access required",
        }
    }
}

/// Evaluate `gate` against the current caller.
pub fn require(principal: Option<&User>, gate: Gate) -> MailroomResult<&User> {
    let user = principal.ok_or(MailroomError::Unauthenticated)?;
    if gate.admits(user.role) {
        Ok(user)
    } else {
        Err(MailroomError::forbidden(gate.denial()))
    }
}

pub fn require_authenticated(principal: Option<&User>) -> MailroomResult<&User> {
    require(principal, Gate::Authenticated)
}

pub fn require_admin_or_above(principal: Option<&User>) -> MailroomResult<&User> {
    require(principal, Gate::AdminOrAbove)
}

pub fn require_super_admin(principal: Option<&User>) -> MailroomResult<&User> {
    require(principal, Gate::SuperAdmin)
}

/// Whether `actor` may apply an update to `target` that optionally sets
/// `new_role`.
///
/// Admins may manage admins and clients, but only a super admin may
/// touch a super admin account or hand out the super admin role.
pub fn may_update_user(actor: &User, target: &User, new_role: Option<Role>) -> MailroomResult<()> {
    require_admin_or_above(Some(actor))?;
    if actor.role == Role::SuperAdmin {
        return Ok(());
    }
    if target.role == Role::SuperAdmin || new_role == Some(Role::SuperAdmin) {
        return Err(MailroomError::forbidden(Gate::SuperAdmin.denial()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: format!("{role}-user"),
            email: format!("{role}@example.com"),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            domain_id: None,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn anonymous_is_always_unauthenticated() {
        for gate in [Gate::Authenticated, Gate::AdminOrAbove, Gate::SuperAdmin] {
            assert!(matches!(
                require(None, gate),
                Err(MailroomError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn client_is_forbidden_from_admin_gates() {
        let client = user_with(Role::Client);
        assert!(require_authenticated(Some(&client)).is_ok());
        assert!(matches!(
            require_admin_or_above(Some(&client)),
            Err(MailroomError::Forbidden { .. })
        ));
        assert!(matches!(
            require_super_admin(Some(&client)),
            Err(MailroomError::Forbidden { .. })
        ));
    }

    #[test]
    fn admin_passes_admin_gate_only() {
        let admin = user_with(Role::Admin);
        assert!(require_admin_or_above(Some(&admin)).is_ok());
        assert!(matches!(
            require_super_admin(Some(&admin)),
            Err(MailroomError::Forbidden { .. })
        ));
    }

    #[test]
    fn super_admin_passes_every_gate() {
        let root = user_with(Role::SuperAdmin);
        for gate in [Gate::Authenticated, Gate::AdminOrAbove, Gate::SuperAdmin] {
            assert_eq!(require(Some(&root), gate).unwrap().id, root.id);
        }
    }

    #[test]
    fn admin_cannot_escalate_or_touch_super_admin() {
        let admin = user_with(Role::Admin);
        let client = user_with(Role::Client);
        let root = user_with(Role::SuperAdmin);

        assert!(may_update_user(&admin, &client, Some(Role::Admin)).is_ok());
        assert!(may_update_user(&admin, &client, None).is_ok());
        assert!(may_update_user(&admin, &client, Some(Role::SuperAdmin)).is_err());
        assert!(may_update_user(&admin, &root, None).is_err());
        assert!(may_update_user(&root, &admin, Some(Role::SuperAdmin)).is_ok());
    }

    #[test]
    fn client_cannot_update_anyone() {
        let client = user_with(Role::Client);
        let other = user_with(Role::Client);
        assert!(matches!(
            may_update_user(&client, &other, None),
            Err(MailroomError::Forbidden { .. })
        ));
    }
}
