use std::collections::HashMap;

use tracing::{info, warn};

use inventaris_domain::id::UserId;
use inventaris_domain::role::{Role, RoleAssignment, policy};
use inventaris_domain::user::{REGISTER_MIN_PASSWORD_LEN, UserWithRole, is_valid_email};

use crate::domain::repository::{AuthProvider, ProfileStore, RoleStore};
use crate::domain::types::{NewAccount, NewProfile, RegisterOutcome, RegisterRequest, Viewer};
use crate::error::InventoryError;

/// Admin view over accounts and their roles.
pub struct UserDirectory<R: RoleStore, P: ProfileStore, A: AuthProvider> {
    pub roles: R,
    pub profiles: P,
    pub auth: A,
    viewer: Viewer,
    users: Vec<UserWithRole>,
}

impl<R: RoleStore, P: ProfileStore, A: AuthProvider> UserDirectory<R, P, A> {
    pub fn new(roles: R, profiles: P, auth: A, viewer: Viewer) -> Self {
        Self {
            roles,
            profiles,
            auth,
            viewer,
            users: Vec::new(),
        }
    }

    pub fn users(&self) -> &[UserWithRole] {
        &self.users
    }

    pub fn get(&self, id: UserId) -> Option<&UserWithRole> {
        self.users.iter().find(|u| u.id == id)
    }

    // ── FetchUsers ───────────────────────────────────────────────────────────

    /// Every profile with at least one role row, in profile order.
    pub async fn fetch_all(&mut self) -> Result<&[UserWithRole], InventoryError> {
        self.require_admin()?;
        let assignments = self.roles.list_all().await?;
        let profiles = self.profiles.list_all().await?;

        let mut by_user: HashMap<UserId, Vec<Role>> = HashMap::new();
        for RoleAssignment { user_id, role } in assignments {
            by_user.entry(user_id).or_default().push(role);
        }

        self.users = profiles
            .into_iter()
            .filter_map(|profile| {
                let roles = by_user.get(&profile.id)?;
                Some(UserWithRole {
                    id: profile.id,
                    username: profile.username,
                    created_at: profile.created_at,
                    role: policy::effective_role(roles),
                })
            })
            .collect();
        info!(count = self.users.len(), "users fetched");
        Ok(&self.users)
    }

    // ── ToggleRole ───────────────────────────────────────────────────────────

    /// Flip `admin <-> user` on the backend, then locally.
    pub async fn toggle_role(&mut self, id: UserId) -> Result<Role, InventoryError> {
        self.require_admin()?;
        let current = self.get(id).ok_or(InventoryError::UserNotFound(id))?.role;
        let next = current.toggled();
        self.roles.set_role(id, next).await?;
        if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
            user.role = next;
        }
        info!(user_id = %id, from = %current, to = %next, "role changed");
        Ok(next)
    }

    // ── RemoveUser ───────────────────────────────────────────────────────────

    /// Delete the user's role rows and profile. The auth account remains.
    pub async fn remove(&mut self, id: UserId) -> Result<(), InventoryError> {
        self.require_admin()?;
        self.roles.delete_for(id).await?;
        self.profiles.delete(id).await?;
        self.users.retain(|u| u.id != id);
        info!(user_id = %id, "user access revoked");
        Ok(())
    }

    // ── RegisterUser ─────────────────────────────────────────────────────────

    /// Create a pre-confirmed account with a role. A failed role write is a
    /// partial success reported through `RegisterOutcome::warning`.
    pub async fn register(&mut self, request: RegisterRequest) -> Result<RegisterOutcome, InventoryError> {
        self.require_admin()?;
        let email = request.email.trim().to_owned();
        let role = match request.role {
            Some(role) if !email.is_empty() && !request.password.is_empty() => role,
            _ => return Err(InventoryError::validation("Please fill in all required fields")),
        };
        if !is_valid_email(&email) {
            return Err(InventoryError::validation("Please enter a valid email address"));
        }
        if request.password.chars().count() < REGISTER_MIN_PASSWORD_LEN {
            return Err(InventoryError::validation(format!(
                "Password must be at least {REGISTER_MIN_PASSWORD_LEN} characters long"
            )));
        }
        let full_name = request
            .full_name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());

        let identity = self
            .auth
            .create_user(&NewAccount {
                email,
                password: request.password,
                full_name: full_name.clone(),
            })
            .await?;
        info!(user_id = %identity.id, %role, "account registered");

        let warning = match self
            .roles
            .insert(RoleAssignment {
                user_id: identity.id,
                role,
            })
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "account created but role insert failed");
                Some(format!(
                    "User created but there was an issue setting the role: {e}"
                ))
            }
        };

        if let Some(username) = full_name {
            let profile = NewProfile {
                id: identity.id,
                username,
            };
            if let Err(e) = self.profiles.upsert(&profile).await {
                warn!(user_id = %identity.id, error = %e, "profile write after registration failed");
            }
        }

        Ok(RegisterOutcome {
            identity,
            role,
            warning,
        })
    }

    fn require_admin(&self) -> Result<(), InventoryError> {
        if self.viewer.is_admin {
            Ok(())
        } else {
            Err(InventoryError::Forbidden)
        }
    }
}
