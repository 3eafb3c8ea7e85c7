use tracing::{info, warn};
use uuid::Uuid;

use inventaris_domain::inventory::ItemForm;
use inventaris_domain::photo::{PhotoFile, PhotoUploads, Viewpoint};

use crate::domain::repository::ObjectStore;
use crate::error::InventoryError;

/// One object written during a create or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPhoto {
    pub viewpoint: Viewpoint,
    pub path: String,
    pub url: String,
}

/// Objects written by one operation, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedPhotos(pub Vec<UploadedPhoto>);

impl UploadedPhotos {
    /// Substitute each uploaded viewpoint's reference on the form.
    pub fn apply_to(&self, form: &mut ItemForm) {
        for photo in &self.0 {
            let slot = match photo.viewpoint {
                Viewpoint::Front => &mut form.foto_depan,
                Viewpoint::Left => &mut form.foto_kiri,
                Viewpoint::Right => &mut form.foto_kanan,
            };
            *slot = Some(photo.url.clone());
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.iter().map(|p| p.path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reject any attached file over the size limit. Runs before any upload.
pub fn check_sizes(uploads: &PhotoUploads) -> Result<(), InventoryError> {
    match uploads.iter().find(|(_, file)| file.exceeds_limit()) {
        Some((viewpoint, file)) => Err(InventoryError::FileTooLarge {
            viewpoint,
            size: file.size(),
        }),
        None => Ok(()),
    }
}

/// Storage path for a new object: `<viewpoint>/<uuid-v4>.<ext>`.
pub fn object_path(viewpoint: Viewpoint, file: &PhotoFile) -> String {
    let name = Uuid::new_v4();
    match file.extension() {
        Some(ext) => format!("{}/{name}.{ext}", viewpoint.segment()),
        None => format!("{}/{name}", viewpoint.segment()),
    }
}

fn content_type(file: &PhotoFile) -> String {
    mime_guess::from_path(&file.file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

// ── PhotoUploader ────────────────────────────────────────────────────────────

pub struct PhotoUploader<O: ObjectStore> {
    pub objects: O,
}

impl<O: ObjectStore> PhotoUploader<O> {
    /// Upload every attached file (front, left, right). On the first failure
    /// the objects already written are removed and the error returned.
    pub async fn upload_all(&self, uploads: &PhotoUploads) -> Result<UploadedPhotos, InventoryError> {
        check_sizes(uploads)?;
        let mut done = UploadedPhotos::default();
        for (viewpoint, file) in uploads.iter() {
            let path = object_path(viewpoint, file);
            let result = self
                .objects
                .upload(&path, file.bytes.clone(), &content_type(file))
                .await;
            if let Err(e) = result {
                self.discard(&done).await;
                return Err(match e {
                    InventoryError::Backend(source) => InventoryError::PhotoUpload { viewpoint, source },
                    other => other,
                });
            }
            info!(%viewpoint, path = %path, size = file.size(), "photo uploaded");
            let url = self.objects.public_url(&path);
            done.0.push(UploadedPhoto { viewpoint, path, url });
        }
        Ok(done)
    }

    /// Best-effort removal of objects from an aborted operation.
    pub async fn discard(&self, uploaded: &UploadedPhotos) {
        if uploaded.is_empty() {
            return;
        }
        if let Err(e) = self.objects.remove(&uploaded.paths()).await {
            warn!(error = %e, count = uploaded.0.len(), "failed to remove orphaned photos");
        }
    }
}
