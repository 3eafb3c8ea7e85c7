//! Builders for domain values used across test suites.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use inventaris_domain::id::{ItemId, UserId};
use inventaris_domain::inventory::{Condition, InlineEdit, InventoryItem, ItemForm};
use inventaris_domain::photo::PhotoFile;
use inventaris_domain::user::Identity;

/// Fixed ids so fixtures and assertions can refer to the same principals.
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0a11);
pub const USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0b22);

pub fn admin_identity() -> Identity {
    Identity {
        id: UserId(ADMIN_ID),
        email: "admin@updl.test".to_owned(),
    }
}

pub fn user_identity() -> Identity {
    Identity {
        id: UserId(USER_ID),
        email: "staff@updl.test".to_owned(),
    }
}

pub fn identity(email: &str) -> Identity {
    Identity {
        id: UserId(Uuid::new_v4()),
        email: email.to_owned(),
    }
}

/// A stored record with deterministic timestamps (older ids are older rows).
pub fn item(id: i64, nama_asset_1: &str, kota: &str, kondisi: Condition) -> InventoryItem {
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(id);
    InventoryItem {
        id: ItemId(id),
        asset_number: format!("AST-{id:04}"),
        nama_asset_1: nama_asset_1.to_owned(),
        nama_asset_2: None,
        alamat: "Jl. Demang Lebar Daun No. 1".to_owned(),
        kota: kota.to_owned(),
        keterangan_lokasi: None,
        foto_depan: None,
        foto_kiri: None,
        foto_kanan: None,
        kondisi,
        created_at,
        updated_at: created_at,
        created_by: Some(UserId(ADMIN_ID)),
    }
}

/// A manage-form submission with the four required fields filled.
pub fn form(asset_number: &str, nama_asset_1: &str, alamat: &str, kota: &str) -> ItemForm {
    ItemForm {
        asset_number: asset_number.to_owned(),
        nama_asset_1: nama_asset_1.to_owned(),
        alamat: alamat.to_owned(),
        kota: kota.to_owned(),
        ..Default::default()
    }
}

pub fn inline_edit(asset_number: &str, nama_asset_1: &str, alamat: &str, kota: &str) -> InlineEdit {
    InlineEdit {
        asset_number: asset_number.to_owned(),
        nama_asset_1: nama_asset_1.to_owned(),
        alamat: alamat.to_owned(),
        kota: kota.to_owned(),
        ..Default::default()
    }
}

/// A photo of exactly `size` bytes.
pub fn photo(file_name: &str, size: usize) -> PhotoFile {
    PhotoFile::new(file_name, vec![0xFF; size])
}
