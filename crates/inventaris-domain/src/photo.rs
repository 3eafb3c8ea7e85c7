//! Photo attachments for inventory records.

use std::fmt;
use std::path::Path;

/// Largest photo accepted for upload (5 MiB). Checked before any upload call.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Which side of the asset a photo shows. Also the storage path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewpoint {
    Front,
    Left,
    Right,
}

impl Viewpoint {
    pub const ALL: [Viewpoint; 3] = [Self::Front, Self::Left, Self::Right];

    /// Path segment under the storage bucket.
    pub fn segment(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Column in `inventory_items` holding this viewpoint's reference.
    pub fn column(self) -> &'static str {
        match self {
            Self::Front => "foto_depan",
            Self::Left => "foto_kiri",
            Self::Right => "foto_kanan",
        }
    }
}

impl fmt::Display for Viewpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// A local image file picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoFile {
    /// Original file name; only its extension survives the upload.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn exceeds_limit(&self) -> bool {
        self.size() > MAX_PHOTO_BYTES
    }

    /// Extension of the original name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
    }
}

impl fmt::Debug for PhotoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoFile")
            .field("file_name", &self.file_name)
            .field("size", &self.size())
            .finish()
    }
}

/// Newly attached files for a create or full edit, one slot per viewpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoUploads {
    pub front: Option<PhotoFile>,
    pub left: Option<PhotoFile>,
    pub right: Option<PhotoFile>,
}

impl PhotoUploads {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.left.is_none() && self.right.is_none()
    }

    pub fn get(&self, viewpoint: Viewpoint) -> Option<&PhotoFile> {
        match viewpoint {
            Viewpoint::Front => self.front.as_ref(),
            Viewpoint::Left => self.left.as_ref(),
            Viewpoint::Right => self.right.as_ref(),
        }
    }

    /// Attached files in upload order (front, left, right).
    pub fn iter(&self) -> impl Iterator<Item = (Viewpoint, &PhotoFile)> {
        Viewpoint::ALL
            .into_iter()
            .filter_map(|v| self.get(v).map(|file| (v, file)))
    }
}
