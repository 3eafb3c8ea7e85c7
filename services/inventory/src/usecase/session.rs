//! Process-wide session and role state.
//!
//! `SessionStore` owns the current authentication state and the derived
//! admin flag. It resolves once at [`SessionStore::init`], then follows the
//! auth provider's event stream until [`SessionStore::teardown`].

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use inventaris_domain::role::policy;
use inventaris_domain::user::{Identity, SIGN_UP_MIN_PASSWORD_LEN, is_valid_email};

use crate::domain::repository::{AuthProvider, RoleStore};
use crate::domain::types::{AuthEvent, Landing, Session, SignInOutcome, SignUpRequest, Viewer};
use crate::error::InventoryError;

/// Authentication state as seen by views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Initial session not read yet.
    Unresolved,
    Anonymous,
    /// `is_admin` stays `false` until the role lookup for `identity` resolves.
    Authenticated { identity: Identity, is_admin: bool },
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Authenticated { is_admin: true, .. })
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

struct Inner<A, R> {
    auth: A,
    roles: R,
    state: watch::Sender<SessionState>,
    /// Held for the duration of sign-in, sign-up and sign-out.
    op: tokio::sync::Mutex<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable handle onto the session state.
pub struct SessionStore<A, R> {
    inner: Arc<Inner<A, R>>,
}

impl<A, R> Clone for SessionStore<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R> SessionStore<A, R>
where
    A: AuthProvider + 'static,
    R: RoleStore + 'static,
{
    /// Read the initial session, then start following auth events.
    ///
    /// A failing initial read resolves to `Anonymous`.
    pub async fn init(auth: A, roles: R) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        let events = auth.subscribe();
        let store = Self {
            inner: Arc::new(Inner {
                auth,
                roles,
                state,
                op: tokio::sync::Mutex::new(()),
                listener: Mutex::new(None),
            }),
        };

        let initial = match store.inner.auth.get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "failed to read initial session");
                None
            }
        };
        store.apply_event(AuthEvent::InitialSession(initial));

        let handle = tokio::spawn(listen(Arc::downgrade(&store.inner), events));
        *store
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        store
    }

    /// Stop following auth events. State is left as it is.
    pub fn teardown(&self) {
        let handle = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("session listener stopped");
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    /// True until the initial session has been read.
    pub fn is_loading(&self) -> bool {
        !self.inner.state.borrow().is_resolved()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Snapshot for building a view; `NotAuthenticated` when signed out.
    pub fn viewer(&self) -> Result<Viewer, InventoryError> {
        match &*self.inner.state.borrow() {
            SessionState::Authenticated { identity, is_admin } => Ok(Viewer {
                identity: identity.clone(),
                is_admin: *is_admin,
            }),
            _ => Err(InventoryError::NotAuthenticated),
        }
    }

    /// Like [`viewer`](Self::viewer), but waits for a fresh role lookup
    /// instead of reading a flag that may still be pending.
    pub async fn resolve_viewer(&self) -> Result<Viewer, InventoryError> {
        let identity = self
            .current_identity()
            .ok_or(InventoryError::NotAuthenticated)?;
        let is_admin = self.inner.lookup_admin(&identity).await;
        self.inner.state.send_if_modified(|state| match state {
            SessionState::Authenticated {
                identity: current,
                is_admin: flag,
            } if *current == identity && *flag != is_admin => {
                *flag = is_admin;
                true
            }
            _ => false,
        });
        Ok(Viewer { identity, is_admin })
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Create an account. Role and profile rows are created by the backend.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Identity, InventoryError> {
        let _guard = self.inner.op.try_lock().map_err(|_| InventoryError::Busy)?;
        let email = request.email.trim();
        if !is_valid_email(email) {
            return Err(InventoryError::validation("Please enter a valid email address"));
        }
        if request.password.chars().count() < SIGN_UP_MIN_PASSWORD_LEN {
            return Err(InventoryError::validation(format!(
                "Password must be at least {SIGN_UP_MIN_PASSWORD_LEN} characters long"
            )));
        }
        if request.password != request.confirm_password {
            return Err(InventoryError::validation("Passwords do not match"));
        }

        let identity = self
            .inner
            .auth
            .sign_up(email, &request.password, &request.username())
            .await?;
        info!(user_id = %identity.id, "account created");
        Ok(identity)
    }

    /// Check credentials, then resolve role membership to pick the landing
    /// view. A failed role lookup lands on `Home`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, InventoryError> {
        let _guard = self.inner.op.try_lock().map_err(|_| InventoryError::Busy)?;
        if email.trim().is_empty() || password.is_empty() {
            return Err(InventoryError::validation("Email and password are required"));
        }

        let session = self
            .inner
            .auth
            .sign_in_with_password(email.trim(), password)
            .await?;
        let identity = session.user.clone();
        let is_admin = self.inner.lookup_admin(&identity).await;

        self.inner.state.send_replace(SessionState::Authenticated {
            identity: identity.clone(),
            is_admin,
        });
        info!(user_id = %identity.id, is_admin, "signed in");
        Ok(SignInOutcome {
            identity,
            is_admin,
            landing: Landing::for_admin(is_admin),
        })
    }

    /// Invalidate the session and return to anonymous. The local state is
    /// reset even if the backend call fails.
    pub async fn sign_out(&self) -> Result<Landing, InventoryError> {
        let _guard = self.inner.op.try_lock().map_err(|_| InventoryError::Busy)?;
        if let Err(e) = self.inner.auth.sign_out().await {
            warn!(error = %e, "backend sign-out failed; clearing local session anyway");
        }
        self.inner.state.send_replace(SessionState::Anonymous);
        info!("signed out");
        Ok(Landing::Auth)
    }

    fn apply_event(&self, event: AuthEvent) {
        apply_event(&self.inner, event);
    }
}

impl<A, R> Inner<A, R>
where
    A: AuthProvider,
    R: RoleStore,
{
    /// Admin privilege fails closed: lookup errors count as no admin row.
    async fn lookup_admin(&self, identity: &Identity) -> bool {
        match self.roles.roles_for(identity.id).await {
            Ok(roles) => policy::has_admin_privilege(&roles),
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "role lookup failed; treating as non-admin");
                false
            }
        }
    }
}

/// Move the state machine for one event. Entering `Authenticated` for a new
/// identity schedules a role lookup.
fn apply_event<A, R>(inner: &Arc<Inner<A, R>>, event: AuthEvent)
where
    A: AuthProvider + 'static,
    R: RoleStore + 'static,
{
    let session: Option<&Session> = event.session();
    match session {
        Some(session) => {
            let identity = session.user.clone();
            let entered = inner.state.send_if_modified(|state| match state {
                SessionState::Authenticated { identity: current, .. } if *current == identity => false,
                _ => {
                    *state = SessionState::Authenticated {
                        identity: identity.clone(),
                        is_admin: false,
                    };
                    true
                }
            });
            if entered {
                debug!(user_id = %identity.id, "session established");
                tokio::spawn(resolve_admin(Arc::downgrade(inner), identity));
            }
        }
        None => {
            inner.state.send_if_modified(|state| {
                if *state == SessionState::Anonymous {
                    false
                } else {
                    *state = SessionState::Anonymous;
                    true
                }
            });
        }
    }
}

/// Apply a role lookup only if the same identity is still signed in.
async fn resolve_admin<A, R>(inner: Weak<Inner<A, R>>, identity: Identity)
where
    A: AuthProvider + 'static,
    R: RoleStore + 'static,
{
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let is_admin = inner.lookup_admin(&identity).await;
    inner.state.send_if_modified(|state| match state {
        SessionState::Authenticated {
            identity: current,
            is_admin: flag,
        } if *current == identity && *flag != is_admin => {
            *flag = is_admin;
            true
        }
        _ => false,
    });
}

async fn listen<A, R>(inner: Weak<Inner<A, R>>, mut events: broadcast::Receiver<AuthEvent>)
where
    A: AuthProvider + 'static,
    R: RoleStore + 'static,
{
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "session listener lagged behind auth events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let Some(inner) = inner.upgrade() else {
            break;
        };
        debug!(?event, "auth event");
        apply_event(&inner, event);
    }
}
