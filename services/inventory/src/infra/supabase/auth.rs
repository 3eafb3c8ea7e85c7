use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use inventaris_domain::user::Identity;

use super::{AuthUser, Credential, SupabaseClient, TokenResponse, read_json};
use crate::domain::repository::AuthProvider;
use crate::domain::types::{AuthEvent, NewAccount, Session};
use crate::error::InventoryError;

/// GoTrue-backed [`AuthProvider`].
#[derive(Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: UsernameMeta<'a>,
}

#[derive(Serialize)]
struct UsernameMeta<'a> {
    username: &'a str,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AdminCreateUser<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: FullNameMeta<'a>,
}

#[derive(Serialize)]
struct FullNameMeta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

/// Sign-up answers with a session when email confirmation is off, otherwise
/// with the bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

impl AuthProvider for SupabaseAuth {
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<Identity, InventoryError> {
        let url = self.client.url("/auth/v1/signup", &[])?;
        let request = self
            .client
            .request(Method::POST, url, Credential::User, Some(self.client.anon_key()))?
            .json(&SignUpBody {
                email,
                password,
                data: UsernameMeta { username },
            });
        let identity = match read_json(self.client.send(request).await?).await? {
            SignUpResponse::Session(token) => token.user.into_identity(),
            SignUpResponse::User(user) => user.into_identity(),
        };
        info!(user_id = %identity.id, "account created");
        Ok(identity)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, InventoryError> {
        let url = self
            .client
            .url("/auth/v1/token", &[("grant_type", "password")])?;
        let request = self
            .client
            .request(Method::POST, url, Credential::User, Some(self.client.anon_key()))?
            .json(&PasswordGrant { email, password });
        let token: TokenResponse = read_json(self.client.send(request).await?).await?;
        let session = token.into_session(Utc::now());

        self.client.store_session(Some(session.clone())).await;
        self.client.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), InventoryError> {
        let Some(session) = self.client.cached_session() else {
            return Ok(());
        };
        let result = async {
            let url = self.client.url("/auth/v1/logout", &[])?;
            let request = self.client.request(
                Method::POST,
                url,
                Credential::User,
                Some(&session.access_token),
            )?;
            self.client.send(request).await?;
            Ok::<_, InventoryError>(())
        }
        .await;

        // The local session ends whatever the backend said.
        self.client.store_session(None).await;
        self.client.emit(AuthEvent::SignedOut);
        if let Err(e) = &result {
            warn!(user_id = %session.user.id, error = %e, "backend sign-out failed");
        }
        result
    }

    async fn get_session(&self) -> Result<Option<Session>, InventoryError> {
        self.client.current_session().await
    }

    async fn create_user(&self, account: &NewAccount) -> Result<Identity, InventoryError> {
        let url = self.client.url("/auth/v1/admin/users", &[])?;
        let request = self
            .client
            .request(Method::POST, url, Credential::Service, None)?
            .json(&AdminCreateUser {
                email: &account.email,
                password: &account.password,
                email_confirm: true,
                user_metadata: FullNameMeta {
                    full_name: account.full_name.as_deref(),
                },
            });
        let user: AuthUser = read_json(self.client.send(request).await?).await?;
        Ok(user.into_identity())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.client.subscribe()
    }
}
