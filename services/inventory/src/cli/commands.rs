use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use inventaris_domain::inventory::{InventoryItem, InventorySummary, ItemForm};
use inventaris_domain::photo::{PhotoFile, PhotoUploads};
use inventaris_domain::role::Role;
use inventaris_domain::user::UserWithRole;

use super::{Cli, Command, ItemsCommand, PhotoArgs, UsersCommand};
use crate::domain::types::{RegisterRequest, SignUpRequest, Viewer};
use crate::error::InventoryError;
use crate::state::{AppState, Sessions};

/// Run one command against a fresh session store.
pub async fn run(cli: Cli, state: AppState) -> Result<(), InventoryError> {
    let sessions = state.session_store().await;
    let result = dispatch(cli, &state, &sessions).await;
    sessions.teardown();
    result
}

async fn dispatch(cli: Cli, state: &AppState, sessions: &Sessions) -> Result<(), InventoryError> {
    let json = cli.json;
    match cli.command {
        Command::SignIn { email, password } => {
            let password = secret(password, "Password").await?;
            let outcome = sessions.sign_in(&email, &password).await?;
            println!(
                "Signed in as {} ({})",
                outcome.identity.email,
                role_label(outcome.is_admin)
            );
        }
        Command::SignUp {
            email,
            password,
            confirm_password,
            username,
            sign_in,
        } => {
            let password = secret(password, "Password").await?;
            let confirm_password = secret(confirm_password, "Confirm password").await?;
            let identity = sessions
                .sign_up(SignUpRequest {
                    email: email.clone(),
                    password: password.clone(),
                    confirm_password,
                    username,
                })
                .await?;
            if !sign_in {
                println!("Account created for {}. Sign in to continue.", identity.email);
                return Ok(());
            }
            let outcome = sessions.sign_in(&email, &password).await?;
            println!(
                "Account created; signed in as {} ({})",
                outcome.identity.email,
                role_label(outcome.is_admin)
            );
        }
        Command::SignOut => {
            sessions.sign_out().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let viewer = sessions.resolve_viewer().await?;
            if json {
                print_json(&serde_json::json!({
                    "id": viewer.identity.id,
                    "email": viewer.identity.email,
                    "role": role_of(viewer.is_admin),
                }))?;
            } else {
                println!(
                    "{} {} ({})",
                    viewer.identity.id,
                    viewer.identity.email,
                    role_label(viewer.is_admin)
                );
            }
        }
        Command::Items(command) => {
            let viewer = sessions.resolve_viewer().await?;
            items(command, state.inventory(viewer), json).await?;
        }
        Command::Summary => {
            let viewer = sessions.resolve_viewer().await?;
            let mut inventory = state.inventory(viewer);
            inventory.fetch_all().await?;
            print_summary(&inventory.summary(), json)?;
        }
        Command::Users(command) => {
            let viewer = sessions.resolve_viewer().await?;
            users(command, state, viewer, json).await?;
        }
    }
    Ok(())
}

// ── Items ────────────────────────────────────────────────────────────────────

async fn items(
    command: ItemsCommand,
    mut inventory: crate::state::Inventory,
    json: bool,
) -> Result<(), InventoryError> {
    inventory.fetch_all().await?;
    match command {
        ItemsCommand::List { search, condition } => {
            let found: Vec<&InventoryItem> = inventory.search(&search, condition).collect();
            if json {
                print_json(&found)?;
            } else if found.is_empty() {
                println!("No records found");
            } else {
                for item in found {
                    print_row(item);
                }
            }
        }
        ItemsCommand::Show { id } => {
            let item = inventory.get(id).ok_or(InventoryError::ItemNotFound(id))?;
            if json {
                print_json(item)?;
            } else {
                print_detail(item);
            }
        }
        ItemsCommand::Add { fields, photos } => {
            let form = fields.merge_form(ItemForm::default());
            let photos = read_photos(&photos).await?;
            let created = inventory.create(form, photos).await?;
            report_item("Created", &created, json)?;
        }
        ItemsCommand::Edit { id, fields, photos } => {
            let current = inventory.get(id).ok_or(InventoryError::ItemNotFound(id))?;
            let form = fields.merge_form(current.to_form());
            let photos = read_photos(&photos).await?;
            let updated = inventory.update(id, form, photos).await?;
            report_item("Updated", &updated, json)?;
        }
        ItemsCommand::QuickEdit { id, fields } => {
            let current = inventory.get(id).ok_or(InventoryError::ItemNotFound(id))?;
            let edit = fields.merge_inline(current.to_inline_edit());
            let updated = inventory.inline_update(id, edit).await?;
            report_item("Updated", &updated, json)?;
        }
        ItemsCommand::Delete { id, yes } => {
            let question = {
                let item = inventory.stage_delete(id)?;
                format!(
                    "Delete {} \"{}\" ({})? This cannot be undone. [y/N]",
                    item.asset_number, item.nama_asset_1, item.kota
                )
            };
            if !yes && !confirm(&question).await? {
                inventory.cancel_delete();
                println!("Cancelled");
                return Ok(());
            }
            let deleted = inventory.confirm_delete().await?;
            println!("Deleted record {deleted}");
        }
    }
    Ok(())
}

async fn read_photos(args: &PhotoArgs) -> Result<PhotoUploads, InventoryError> {
    Ok(PhotoUploads {
        front: read_photo(args.front.as_deref()).await?,
        left: read_photo(args.left.as_deref()).await?,
        right: read_photo(args.right.as_deref()).await?,
    })
}

async fn read_photo(path: Option<&Path>) -> Result<Option<PhotoFile>, InventoryError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some(PhotoFile::new(name, bytes)))
}

// ── Users ────────────────────────────────────────────────────────────────────

async fn users(
    command: UsersCommand,
    state: &AppState,
    viewer: Viewer,
    json: bool,
) -> Result<(), InventoryError> {
    let mut directory = state.users(viewer);
    match command {
        UsersCommand::List => {
            let users = directory.fetch_all().await?;
            if json {
                print_json(&users)?;
            } else {
                for user in users {
                    print_user(user);
                }
            }
        }
        UsersCommand::ToggleRole { user_id } => {
            directory.fetch_all().await?;
            let role = directory.toggle_role(user_id).await?;
            println!("{user_id} is now {role}");
        }
        UsersCommand::Remove { user_id, yes } => {
            directory.fetch_all().await?;
            let name = directory
                .get(user_id)
                .ok_or(InventoryError::UserNotFound(user_id))?
                .display_name()
                .to_owned();
            let question = format!("Remove access for {name}? [y/N]");
            if !yes && !confirm(&question).await? {
                println!("Cancelled");
                return Ok(());
            }
            directory.remove(user_id).await?;
            println!("Removed {name}");
        }
        UsersCommand::Register {
            email,
            password,
            role,
            full_name,
        } => {
            let password = secret(password, "Password").await?;
            let outcome = directory
                .register(RegisterRequest {
                    email,
                    password,
                    role,
                    full_name,
                })
                .await?;
            println!(
                "Registered {} ({}) as {}",
                outcome.identity.email, outcome.identity.id, outcome.role
            );
            if let Some(warning) = outcome.warning {
                println!("warning: {warning}");
            }
        }
    }
    Ok(())
}

// ── Output ───────────────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), InventoryError> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

fn role_of(is_admin: bool) -> Role {
    if is_admin { Role::Admin } else { Role::User }
}

fn role_label(is_admin: bool) -> &'static str {
    role_of(is_admin).as_str()
}

fn print_row(item: &InventoryItem) {
    println!(
        "{:>5}  {:<12}  {:<28}  {:<16}  {}",
        item.id,
        item.asset_number,
        item.nama_asset_1,
        item.kota,
        item.kondisi
    );
}

fn print_detail(item: &InventoryItem) {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_owned());
    println!("id              {}", item.id);
    println!("asset number    {}", item.asset_number);
    println!("name            {}", item.nama_asset_1);
    println!("alt name        {}", or_dash(&item.nama_asset_2));
    println!("address         {}", item.alamat);
    println!("city            {}", item.kota);
    println!("location note   {}", or_dash(&item.keterangan_lokasi));
    println!("condition       {}", item.kondisi);
    println!("photo front     {}", or_dash(&item.foto_depan));
    println!("photo left      {}", or_dash(&item.foto_kiri));
    println!("photo right     {}", or_dash(&item.foto_kanan));
    println!("created         {}", item.created_at.format("%Y-%m-%d %H:%M"));
    println!("updated         {}", item.updated_at.format("%Y-%m-%d %H:%M"));
}

fn report_item(verb: &str, item: &InventoryItem, json: bool) -> Result<(), InventoryError> {
    if json {
        return print_json(item);
    }
    println!("{verb} record {} ({})", item.id, item.asset_number);
    Ok(())
}

fn print_summary(summary: &InventorySummary, json: bool) -> Result<(), InventoryError> {
    if json {
        return print_json(summary);
    }
    println!("total            {}", summary.total);
    println!("Terpasang        {}", summary.installed);
    println!("Tidak digunakan  {}", summary.unused);
    println!("Rusak            {}", summary.damaged);
    Ok(())
}

fn print_user(user: &UserWithRole) {
    println!(
        "{}  {:<24}  {:<5}  {}",
        user.id,
        user.display_name(),
        user.role,
        user.created_at.format("%Y-%m-%d")
    );
}

// ── Prompts ──────────────────────────────────────────────────────────────────

async fn prompt(label: &str) -> Result<String, InventoryError> {
    eprint!("{label}: ");
    std::io::stderr().flush().context("failed to flush prompt")?;
    // std's stdin buffer is shared, so consecutive prompts read consecutive lines.
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .context("stdin reader task failed")?
    .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

async fn secret(given: Option<String>, label: &str) -> Result<String, InventoryError> {
    match given {
        Some(value) => Ok(value),
        None => prompt(label).await,
    }
}

async fn confirm(question: &str) -> Result<bool, InventoryError> {
    let answer = prompt(question).await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
