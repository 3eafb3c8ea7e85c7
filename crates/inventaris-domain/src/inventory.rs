//! Inventory record domain types, form validation and client-side search.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{ItemId, UserId};

/// Physical condition of an asset.
///
/// Wire format is the Indonesian label stored in `inventory_items.kondisi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Condition {
    /// Installed and in service.
    #[default]
    #[serde(rename = "Terpasang")]
    Installed,
    /// Present but not in use.
    #[serde(rename = "Tidak digunakan")]
    Unused,
    /// Damaged.
    #[serde(rename = "Rusak")]
    Damaged,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Self::Installed, Self::Unused, Self::Damaged];

    pub fn label(self) -> &'static str {
        match self {
            Self::Installed => "Terpasang",
            Self::Unused => "Tidak digunakan",
            Self::Damaged => "Rusak",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string is neither a condition label nor `all`.
#[derive(Debug, Error)]
#[error("unknown condition: {0:?}")]
pub struct ParseConditionError(pub String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    /// Accepts the wire label case-insensitively, plus the English names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terpasang" | "installed" => Ok(Self::Installed),
            "tidak digunakan" | "unused" => Ok(Self::Unused),
            "rusak" | "damaged" => Ok(Self::Damaged),
            _ => Err(ParseConditionError(s.to_owned())),
        }
    }
}

/// Condition filter applied on top of the text search. `All` short-circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionFilter {
    #[default]
    All,
    Only(Condition),
}

impl ConditionFilter {
    pub fn admits(self, condition: Condition) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == condition,
        }
    }
}

impl FromStr for ConditionFilter {
    type Err = ParseConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// One tracked physical asset, as stored in `inventory_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub asset_number: String,
    pub nama_asset_1: String,
    pub nama_asset_2: Option<String>,
    pub alamat: String,
    pub kota: String,
    pub keterangan_lokasi: Option<String>,
    pub foto_depan: Option<String>,
    pub foto_kiri: Option<String>,
    pub foto_kanan: Option<String>,
    pub kondisi: Condition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` once the creating account has been deleted backend-side.
    pub created_by: Option<UserId>,
}

impl InventoryItem {
    /// Case-insensitive substring match over the name fields, address, city
    /// and location note. `needle` must already be lowercase; empty matches all.
    pub fn matches_term(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(needle);
        hit(&self.nama_asset_1)
            || self.nama_asset_2.as_deref().is_some_and(hit)
            || hit(&self.alamat)
            || hit(&self.kota)
            || self.keterangan_lokasi.as_deref().is_some_and(hit)
    }

    /// The manage-form view of this record, used to pre-fill an edit.
    pub fn to_form(&self) -> ItemForm {
        ItemForm {
            asset_number: self.asset_number.clone(),
            nama_asset_1: self.nama_asset_1.clone(),
            nama_asset_2: self.nama_asset_2.clone(),
            alamat: self.alamat.clone(),
            kota: self.kota.clone(),
            keterangan_lokasi: self.keterangan_lokasi.clone(),
            foto_depan: self.foto_depan.clone(),
            foto_kiri: self.foto_kiri.clone(),
            foto_kanan: self.foto_kanan.clone(),
            kondisi: self.kondisi,
        }
    }

    pub fn to_inline_edit(&self) -> InlineEdit {
        InlineEdit {
            asset_number: self.asset_number.clone(),
            nama_asset_1: self.nama_asset_1.clone(),
            nama_asset_2: self.nama_asset_2.clone(),
            alamat: self.alamat.clone(),
            kota: self.kota.clone(),
            keterangan_lokasi: self.keterangan_lokasi.clone(),
            kondisi: self.kondisi,
        }
    }

    /// Overwrite the mutable subset with a manage-form submission.
    pub fn apply_form(&mut self, form: &ItemForm) {
        self.asset_number = form.asset_number.clone();
        self.nama_asset_1 = form.nama_asset_1.clone();
        self.nama_asset_2 = form.nama_asset_2.clone();
        self.alamat = form.alamat.clone();
        self.kota = form.kota.clone();
        self.keterangan_lokasi = form.keterangan_lokasi.clone();
        self.foto_depan = form.foto_depan.clone();
        self.foto_kiri = form.foto_kiri.clone();
        self.foto_kanan = form.foto_kanan.clone();
        self.kondisi = form.kondisi;
    }

    /// Overwrite the inline-editable subset. Photos are left untouched.
    pub fn apply_inline(&mut self, edit: &InlineEdit) {
        self.asset_number = edit.asset_number.clone();
        self.nama_asset_1 = edit.nama_asset_1.clone();
        self.nama_asset_2 = edit.nama_asset_2.clone();
        self.alamat = edit.alamat.clone();
        self.kota = edit.kota.clone();
        self.keterangan_lokasi = edit.keterangan_lokasi.clone();
        self.kondisi = edit.kondisi;
    }
}

/// A required text field of the manage form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    AssetNumber,
    PrimaryName,
    Address,
    City,
}

impl RequiredField {
    /// Column name in `inventory_items`.
    pub fn column(self) -> &'static str {
        match self {
            Self::AssetNumber => "asset_number",
            Self::PrimaryName => "nama_asset_1",
            Self::Address => "alamat",
            Self::City => "kota",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

fn missing(asset_number: &str, nama_asset_1: &str, alamat: &str, kota: &str) -> Vec<RequiredField> {
    [
        (RequiredField::AssetNumber, asset_number),
        (RequiredField::PrimaryName, nama_asset_1),
        (RequiredField::Address, alamat),
        (RequiredField::City, kota),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect()
}

/// Blank optional text is stored as `NULL`, never as an empty string.
fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Mutable field subset written by the manage form (create and full edit).
///
/// Photo fields hold the current references; attaching a new file replaces
/// the matching reference after upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemForm {
    pub asset_number: String,
    pub nama_asset_1: String,
    pub nama_asset_2: Option<String>,
    pub alamat: String,
    pub kota: String,
    pub keterangan_lokasi: Option<String>,
    pub foto_depan: Option<String>,
    pub foto_kiri: Option<String>,
    pub foto_kanan: Option<String>,
    pub kondisi: Condition,
}

impl ItemForm {
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        missing(&self.asset_number, &self.nama_asset_1, &self.alamat, &self.kota)
    }

    pub fn normalized(self) -> Self {
        Self {
            nama_asset_2: blank_to_none(self.nama_asset_2),
            keterangan_lokasi: blank_to_none(self.keterangan_lokasi),
            foto_depan: blank_to_none(self.foto_depan),
            foto_kiri: blank_to_none(self.foto_kiri),
            foto_kanan: blank_to_none(self.foto_kanan),
            ..self
        }
    }
}

/// Reduced field subset for row-level quick edits (no photos).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineEdit {
    pub asset_number: String,
    pub nama_asset_1: String,
    pub nama_asset_2: Option<String>,
    pub alamat: String,
    pub kota: String,
    pub keterangan_lokasi: Option<String>,
    pub kondisi: Condition,
}

impl InlineEdit {
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        missing(&self.asset_number, &self.nama_asset_1, &self.alamat, &self.kota)
    }

    pub fn normalized(self) -> Self {
        Self {
            nama_asset_2: blank_to_none(self.nama_asset_2),
            keterangan_lokasi: blank_to_none(self.keterangan_lokasi),
            ..self
        }
    }
}

/// Record counts per condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub total: usize,
    pub installed: usize,
    pub unused: usize,
    pub damaged: usize,
}

impl InventorySummary {
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a InventoryItem>,
    {
        items
            .into_iter()
            .fold(Self::default(), |mut acc, item| {
                acc.total += 1;
                match item.kondisi {
                    Condition::Installed => acc.installed += 1,
                    Condition::Unused => acc.unused += 1,
                    Condition::Damaged => acc.damaged += 1,
                }
                acc
            })
    }
}
