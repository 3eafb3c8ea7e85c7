use inventaris_core::config::ConfigError;
use inventaris_core::error::BackendError;
use inventaris_domain::id::{ItemId, UserId};
use inventaris_domain::inventory::RequiredField;
use inventaris_domain::photo::{MAX_PHOTO_BYTES, Viewpoint};

/// Inventory client error variants.
///
/// Validation variants are raised before any backend call; `Backend` carries
/// the backend's own message.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("{0}")]
    Validation(String),
    #[error("required fields missing: {}", join_fields(.0))]
    MissingFields(Vec<RequiredField>),
    #[error("{viewpoint} photo is {size} bytes, limit is {limit}", limit = MAX_PHOTO_BYTES)]
    FileTooLarge { viewpoint: Viewpoint, size: usize },
    #[error("{viewpoint} photo upload failed: {source}")]
    PhotoUpload {
        viewpoint: Viewpoint,
        source: BackendError,
    },
    #[error("not signed in")]
    NotAuthenticated,
    #[error("admin privilege required")]
    Forbidden,
    #[error("no record is staged for deletion")]
    NothingStaged,
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("another session operation is in progress")]
    Busy,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

fn join_fields(fields: &[RequiredField]) -> String {
    fields
        .iter()
        .map(|f| f.column())
        .collect::<Vec<_>>()
        .join(", ")
}

impl InventoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::PhotoUpload { .. } => "UPLOAD_FAILED",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NothingStaged => "NOTHING_STAGED",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Busy => "BUSY",
            Self::Backend(e) => e.kind(),
            Self::Config(e) => e.kind(),
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_)
            | Self::MissingFields(_)
            | Self::FileTooLarge { .. }
            | Self::NothingStaged => 2,
            Self::NotAuthenticated => 3,
            Self::Forbidden => 4,
            Self::ItemNotFound(_) | Self::UserNotFound(_) => 5,
            Self::Backend(_) | Self::PhotoUpload { .. } => 6,
            Self::Busy => 7,
            Self::Config(_) => 78,
            Self::Internal(_) => 1,
        }
    }

    /// True for errors raised locally, before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::MissingFields(_) | Self::FileTooLarge { .. }
        )
    }
}
