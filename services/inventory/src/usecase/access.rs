use inventaris_domain::role::policy;

use crate::usecase::session::SessionState;

/// Views a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Auth,
    Home,
    AdminDashboard,
    Inventory,
    AddAsset,
    Users,
    RegisterUser,
}

impl View {
    pub fn requires_admin(self) -> bool {
        matches!(
            self,
            Self::AdminDashboard | Self::Inventory | Self::AddAsset | Self::Users | Self::RegisterUser
        )
    }
}

/// Outcome of guarding a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session not resolved yet; show a loading state.
    Pending,
    Redirect(View),
    Granted,
}

/// Decide whether `view` may be shown for `state`.
///
/// Base access fails open (any signed-in identity); admin views fail closed.
pub fn guard(state: &SessionState, view: View) -> Access {
    if !state.is_resolved() {
        return Access::Pending;
    }
    if view == View::Auth {
        return Access::Granted;
    }
    if !policy::has_base_access(state.identity().is_some()) {
        return Access::Redirect(View::Auth);
    }
    if view.requires_admin() && !state.is_admin() {
        return Access::Redirect(View::Home);
    }
    Access::Granted
}
