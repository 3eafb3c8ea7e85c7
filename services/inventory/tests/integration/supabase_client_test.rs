use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use clap::Parser;
use tempfile::TempDir;

use inventaris_core::config::Config;
use inventaris_domain::id::ItemId;
use inventaris_domain::photo::PhotoUploads;
use inventaris_inventory::cli::{Cli, commands};
use inventaris_inventory::config::InventoryConfig;
use inventaris_inventory::domain::repository::AuthProvider;
use inventaris_inventory::domain::types::{AuthEvent, Landing, NewAccount, Session};
use inventaris_inventory::error::InventoryError;
use inventaris_inventory::state::AppState;
use inventaris_testing::builders::{ADMIN_ID, admin_identity, form, inline_edit, photo};

use crate::helpers::ADMIN_PASSWORD;
use crate::http_stub::{
    ACCESS_TOKEN, ANON_KEY, REFRESH_TOKEN, REFRESHED_TOKEN, SERVICE_KEY, StubBackend,
};

struct Harness {
    stub: StubBackend,
    state: AppState,
    session_file: PathBuf,
    _dir: TempDir,
}

async fn harness(service_key: Option<&str>, saved: Option<Session>) -> Harness {
    let stub = StubBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    if let Some(session) = saved {
        std::fs::write(&session_file, serde_json::to_vec(&session).unwrap()).unwrap();
    }

    let mut vars = vec![
        ("SUPABASE_URL".to_owned(), stub.base_url.clone()),
        ("SUPABASE_ANON_KEY".to_owned(), ANON_KEY.to_owned()),
        ("SESSION_FILE".to_owned(), session_file.display().to_string()),
        ("HTTP_TIMEOUT_SECS".to_owned(), "5".to_owned()),
    ];
    if let Some(key) = service_key {
        vars.push(("SUPABASE_SERVICE_ROLE_KEY".to_owned(), key.to_owned()));
    }
    let config = InventoryConfig::from_iter(vars).unwrap();
    let state = AppState::from_config(config).await.unwrap();

    Harness {
        stub,
        state,
        session_file,
        _dir: dir,
    }
}

fn saved_session(refresh_token: &str) -> Session {
    Session {
        access_token: "expired-token".into(),
        refresh_token: refresh_token.into(),
        expires_at: Utc::now() - Duration::minutes(5),
        user: admin_identity(),
    }
}

fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn should_sign_in_persist_session_and_authorize_table_reads() {
    let h = harness(None, None).await;
    let sessions = h.state.session_store().await;

    let outcome = sessions.sign_in("admin@updl.test", ADMIN_PASSWORD).await.unwrap();
    assert_eq!(outcome.identity.id.0, ADMIN_ID);
    assert!(outcome.is_admin);
    assert!(read_file(&h.session_file).contains(ACCESS_TOKEN));

    let lookups = h.stub.requests_to("/rest/v1/user_roles");
    let lookup = lookups.last().unwrap();
    assert_eq!(lookup.bearer.as_deref(), Some(ACCESS_TOKEN));
    assert_eq!(lookup.apikey.as_deref(), Some(ANON_KEY));
    assert!(lookup.query.contains(&format!("user_id=eq.{ADMIN_ID}")));

    let viewer = sessions.resolve_viewer().await.unwrap();
    let mut inventory = h.state.inventory(viewer);
    let ids: Vec<i64> = inventory.fetch_all().await.unwrap().iter().map(|i| i.id.0).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(inventory.get(ItemId(1)).unwrap().created_by, None);
    assert_eq!(inventory.get(ItemId(3)).unwrap().created_by.map(|u| u.0), Some(ADMIN_ID));
    let list = h.stub.requests_to("/rest/v1/inventory_items");
    assert!(list[0].query.contains("order=created_at.desc"));
    sessions.teardown();
}

#[tokio::test]
async fn should_surface_backend_message_for_rejected_credentials() {
    let h = harness(None, None).await;
    let sessions = h.state.session_store().await;

    let err = sessions.sign_in("admin@updl.test", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(!h.session_file.exists());
}

#[tokio::test]
async fn should_refresh_expired_saved_session_before_use() {
    let h = harness(None, Some(saved_session(REFRESH_TOKEN))).await;
    let auth = h.state.auth();
    let mut events = auth.subscribe();

    let session = auth.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, REFRESHED_TOKEN);
    assert!(matches!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed(_)));
    assert!(read_file(&h.session_file).contains(REFRESHED_TOKEN));

    let grant = h.stub.requests_to("/auth/v1/token");
    assert_eq!(grant.len(), 1);
    assert_eq!(grant[0].bearer.as_deref(), Some(ANON_KEY));

    // Fresh now; no second grant.
    auth.get_session().await.unwrap();
    assert_eq!(h.stub.state.lock().unwrap().refreshes, 1);
}

#[tokio::test]
async fn should_end_saved_session_when_refresh_is_rejected() {
    let h = harness(None, Some(saved_session("revoked"))).await;
    let auth = h.state.auth();
    let mut events = auth.subscribe();

    assert!(auth.get_session().await.unwrap().is_none());
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    assert!(!h.session_file.exists());
}

#[tokio::test]
async fn should_upload_photo_and_insert_row_over_http() {
    let h = harness(None, None).await;
    let sessions = h.state.session_store().await;
    sessions.sign_in("admin@updl.test", ADMIN_PASSWORD).await.unwrap();
    let mut inventory = h.state.inventory(sessions.resolve_viewer().await.unwrap());

    let photos = PhotoUploads {
        front: Some(photo("depan.jpg", 2048)),
        ..PhotoUploads::none()
    };
    let created = inventory
        .create(form("AST-0200", "Trafo", "Jl. Sudirman", "Palembang"), photos)
        .await
        .unwrap();

    let objects = h.stub.state.lock().unwrap().objects.clone();
    assert_eq!(objects.len(), 1);
    let object = &objects[0];
    assert_eq!(object.bucket, "inventory_images");
    assert!(object.path.starts_with("front/") && object.path.ends_with(".jpg"));
    assert_eq!(object.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(object.upsert.as_deref(), Some("false"));
    assert_eq!(object.size, 2048);
    assert_eq!(
        created.foto_depan,
        Some(format!(
            "{}/storage/v1/object/public/inventory_images/{}",
            h.stub.base_url, object.path
        ))
    );

    let row = h.stub.item(created.id.0).unwrap();
    assert_eq!(row["created_by"], ADMIN_ID.to_string());
    assert_eq!(row["asset_number"], "AST-0200");
    assert_eq!(inventory.items()[0].id, created.id);
    sessions.teardown();
}

#[tokio::test]
async fn should_report_missing_rows_as_not_found() {
    let h = harness(None, None).await;
    let sessions = h.state.session_store().await;
    sessions.sign_in("admin@updl.test", ADMIN_PASSWORD).await.unwrap();
    let mut inventory = h.state.inventory(sessions.resolve_viewer().await.unwrap());

    let err = inventory
        .inline_update(ItemId(999), inline_edit("X", "Y", "Jl. Z", "Palembang"))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::ItemNotFound(ItemId(999))));

    inventory.fetch_all().await.unwrap();
    inventory.stage_delete(ItemId(2)).unwrap();
    inventory.confirm_delete().await.unwrap();
    assert!(h.stub.item(2).is_none());
    let deletes = h.stub.requests_to("/rest/v1/inventory_items");
    let delete = deletes.iter().find(|r| r.method == "DELETE").unwrap();
    assert_eq!(delete.prefer.as_deref(), Some("return=representation"));
    sessions.teardown();
}

#[tokio::test]
async fn should_sign_out_and_forget_session_file() {
    let h = harness(None, None).await;
    let sessions = h.state.session_store().await;
    sessions.sign_in("admin@updl.test", ADMIN_PASSWORD).await.unwrap();

    assert_eq!(sessions.sign_out().await.unwrap(), Landing::Auth);
    assert!(!h.session_file.exists());
    let logout = h.stub.requests_to("/auth/v1/logout");
    assert_eq!(logout.len(), 1);
    assert_eq!(logout[0].bearer.as_deref(), Some(ACCESS_TOKEN));
}

#[tokio::test]
async fn should_create_accounts_only_with_service_key() {
    let account = NewAccount {
        email: "operator@updl.test".into(),
        password: "password-123".into(),
        full_name: Some("Operator".into()),
    };

    let without = harness(None, None).await;
    let err = without.state.auth().create_user(&account).await.unwrap_err();
    assert_eq!(err.kind(), "INTERNAL");
    assert!(without.stub.requests_to("/auth/v1/admin/users").is_empty());

    let with = harness(Some(SERVICE_KEY), None).await;
    let identity = with.state.auth().create_user(&account).await.unwrap();
    assert_eq!(identity.email, "operator@updl.test");
    let calls = with.stub.requests_to("/auth/v1/admin/users");
    assert_eq!(calls[0].bearer.as_deref(), Some(SERVICE_KEY));
    assert_eq!(calls[0].apikey.as_deref(), Some(SERVICE_KEY));
}

#[cfg(unix)]
#[tokio::test]
async fn should_keep_session_file_private_to_owner() {
    use std::os::unix::fs::PermissionsExt;

    let h = harness(None, None).await;
    // A file left world-readable by an older run is tightened on the next write.
    std::fs::write(&h.session_file, b"{}").unwrap();
    std::fs::set_permissions(&h.session_file, std::fs::Permissions::from_mode(0o644)).unwrap();

    let sessions = h.state.session_store().await;
    sessions.sign_in("admin@updl.test", ADMIN_PASSWORD).await.unwrap();

    let mode = std::fs::metadata(&h.session_file).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    sessions.teardown();
}

#[tokio::test]
async fn should_sign_in_right_after_cli_sign_up_when_asked() {
    let h = harness(None, None).await;
    let cli = Cli::try_parse_from([
        "inventaris",
        "sign-up",
        "--email",
        "admin@updl.test",
        "--password",
        ADMIN_PASSWORD,
        "--confirm-password",
        ADMIN_PASSWORD,
        "--sign-in",
    ])
    .unwrap();

    commands::run(cli, h.state.clone()).await.unwrap();

    assert_eq!(h.stub.requests_to("/auth/v1/signup").len(), 1);
    assert_eq!(h.stub.requests_to("/auth/v1/token").len(), 1);
    assert!(read_file(&h.session_file).contains(ACCESS_TOKEN));
}
