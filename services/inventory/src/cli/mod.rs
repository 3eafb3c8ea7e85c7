//! Command-line surface. Results go to stdout; logs go to stderr.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use inventaris_domain::id::{ItemId, UserId};
use inventaris_domain::inventory::{Condition, ConditionFilter, InlineEdit, ItemForm};
use inventaris_domain::role::Role;

#[derive(Debug, Parser)]
#[command(name = "inventaris", version, about = "Asset inventory client")]
pub struct Cli {
    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and keep the session for later commands.
    SignIn {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account. Sign in afterwards.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
        /// Defaults to the part of the email before `@`.
        #[arg(long)]
        username: Option<String>,
        /// Sign in with the new account straight away.
        #[arg(long)]
        sign_in: bool,
    },
    SignOut,
    /// Show the signed-in identity and its role.
    Whoami,
    /// Inventory records.
    #[command(subcommand)]
    Items(ItemsCommand),
    /// Per-condition record counts.
    Summary,
    /// Accounts and roles (admin).
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Debug, Subcommand)]
pub enum ItemsCommand {
    /// List records, newest first.
    List {
        /// Case-insensitive match on names, address, city and location note.
        #[arg(long, default_value = "")]
        search: String,
        /// `all`, or one of Terpasang, "Tidak digunakan", Rusak.
        #[arg(long, default_value = "all")]
        condition: ConditionFilter,
    },
    Show { id: ItemId },
    /// Create a record (admin).
    Add {
        #[command(flatten)]
        fields: ItemFields,
        #[command(flatten)]
        photos: PhotoArgs,
    },
    /// Full edit with optional new photos (admin). Unset flags keep their value.
    Edit {
        id: ItemId,
        #[command(flatten)]
        fields: ItemFields,
        #[command(flatten)]
        photos: PhotoArgs,
    },
    /// Quick edit of text fields and condition (admin).
    QuickEdit {
        id: ItemId,
        #[command(flatten)]
        fields: ItemFields,
    },
    /// Delete a record (admin).
    Delete {
        id: ItemId,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    List,
    /// Switch between admin and user.
    ToggleRole { user_id: UserId },
    /// Revoke a user's roles and profile.
    Remove {
        user_id: UserId,
        #[arg(long)]
        yes: bool,
    },
    /// Create a pre-confirmed account with a role.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        /// `admin` or `user`.
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        full_name: Option<String>,
    },
}

/// Record fields. An empty string clears an optional field.
#[derive(Debug, Clone, Default, Args)]
pub struct ItemFields {
    #[arg(long)]
    pub asset_number: Option<String>,
    #[arg(long = "name")]
    pub nama_asset_1: Option<String>,
    #[arg(long = "alt-name")]
    pub nama_asset_2: Option<String>,
    #[arg(long = "address")]
    pub alamat: Option<String>,
    #[arg(long = "city")]
    pub kota: Option<String>,
    #[arg(long = "location-note")]
    pub keterangan_lokasi: Option<String>,
    #[arg(long = "condition")]
    pub kondisi: Option<Condition>,
}

impl ItemFields {
    /// Overlay the given flags on a form.
    pub fn merge_form(self, form: ItemForm) -> ItemForm {
        ItemForm {
            asset_number: self.asset_number.unwrap_or(form.asset_number),
            nama_asset_1: self.nama_asset_1.unwrap_or(form.nama_asset_1),
            nama_asset_2: self.nama_asset_2.or(form.nama_asset_2),
            alamat: self.alamat.unwrap_or(form.alamat),
            kota: self.kota.unwrap_or(form.kota),
            keterangan_lokasi: self.keterangan_lokasi.or(form.keterangan_lokasi),
            kondisi: self.kondisi.unwrap_or(form.kondisi),
            ..form
        }
    }

    /// Overlay the given flags on a quick edit.
    pub fn merge_inline(self, edit: InlineEdit) -> InlineEdit {
        InlineEdit {
            asset_number: self.asset_number.unwrap_or(edit.asset_number),
            nama_asset_1: self.nama_asset_1.unwrap_or(edit.nama_asset_1),
            nama_asset_2: self.nama_asset_2.or(edit.nama_asset_2),
            alamat: self.alamat.unwrap_or(edit.alamat),
            kota: self.kota.unwrap_or(edit.kota),
            keterangan_lokasi: self.keterangan_lokasi.or(edit.keterangan_lokasi),
            kondisi: self.kondisi.unwrap_or(edit.kondisi),
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PhotoArgs {
    #[arg(long)]
    pub front: Option<PathBuf>,
    #[arg(long)]
    pub left: Option<PathBuf>,
    #[arg(long)]
    pub right: Option<PathBuf>,
}
