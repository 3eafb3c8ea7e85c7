//! Inventory record list for one view: fetch, search, create, edit, delete.
//!
//! The list is owned by the service and only mutated through `&mut self`,
//! so one view cannot interleave two mutations.

use tokio::sync::watch;
use tracing::{info, warn};

use inventaris_domain::id::ItemId;
use inventaris_domain::inventory::{
    ConditionFilter, InlineEdit, InventoryItem, InventorySummary, ItemForm,
};
use inventaris_domain::photo::PhotoUploads;

use crate::domain::repository::{InventoryStore, ObjectStore};
use crate::domain::types::{ItemUpdate, NewInventoryItem, Viewer};
use crate::error::InventoryError;
use crate::usecase::photo::{PhotoUploader, check_sizes};

pub struct InventoryService<S: InventoryStore, O: ObjectStore> {
    store: S,
    photos: PhotoUploader<O>,
    viewer: Viewer,
    items: Vec<InventoryItem>,
    loading: watch::Sender<bool>,
    pending_delete: Option<ItemId>,
}

impl<S: InventoryStore, O: ObjectStore> InventoryService<S, O> {
    pub fn new(store: S, objects: O, viewer: Viewer) -> Self {
        Self {
            store,
            photos: PhotoUploader { objects },
            viewer,
            items: Vec::new(),
            loading: watch::channel(false).0,
            pending_delete: None,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Current local list, newest first after a fetch.
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Loading flag as seen from outside the task running [`fetch_all`](Self::fetch_all).
    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn pending_delete(&self) -> Option<ItemId> {
        self.pending_delete
    }

    pub fn summary(&self) -> InventorySummary {
        InventorySummary::from_items(&self.items)
    }

    /// Records matching `term` (case-insensitive substring over names,
    /// address, city and location note) and `filter`. Only the empty term
    /// matches everything; whitespace is matched literally. Never mutates the list.
    pub fn search<'a>(
        &'a self,
        term: &str,
        filter: ConditionFilter,
    ) -> impl Iterator<Item = &'a InventoryItem> + use<'a, S, O> {
        let needle = term.to_lowercase();
        self.items
            .iter()
            .filter(move |item| filter.admits(item.kondisi))
            .filter(move |item| item.matches_term(&needle))
    }

    // ── Fetch ────────────────────────────────────────────────────────────────

    /// Replace the local list with every stored record. On failure the
    /// previous list is left intact.
    pub async fn fetch_all(&mut self) -> Result<&[InventoryItem], InventoryError> {
        self.loading.send_replace(true);
        let result = self.store.list_all().await;
        self.loading.send_replace(false);
        match result {
            Ok(items) => {
                info!(count = items.len(), "inventory fetched");
                self.items = items;
                Ok(&self.items)
            }
            Err(e) => {
                warn!(error = %e, "inventory fetch failed");
                Err(e)
            }
        }
    }

    // ── Create ───────────────────────────────────────────────────────────────

    /// Upload attached photos, insert the record as the viewer, then refetch.
    pub async fn create(
        &mut self,
        form: ItemForm,
        photos: PhotoUploads,
    ) -> Result<InventoryItem, InventoryError> {
        self.require_admin()?;
        let mut form = validate_form(form)?;
        check_sizes(&photos)?;

        let uploaded = self.photos.upload_all(&photos).await?;
        uploaded.apply_to(&mut form);

        let payload = NewInventoryItem {
            fields: form,
            created_by: self.viewer.identity.id,
        };
        let created = match self.store.insert(&payload).await {
            Ok(row) => row,
            Err(e) => {
                self.photos.discard(&uploaded).await;
                return Err(e);
            }
        };
        info!(item_id = %created.id, asset_number = %created.asset_number, "inventory item created");

        let refetch = self.fetch_all().await.map(|_| ());
        if let Err(e) = refetch {
            warn!(error = %e, "refetch after create failed; keeping inserted row locally");
            self.items.insert(0, created.clone());
        }
        Ok(created)
    }

    // ── Update ───────────────────────────────────────────────────────────────

    /// Full edit from the manage form, with optional new photos.
    pub async fn update(
        &mut self,
        id: ItemId,
        form: ItemForm,
        photos: PhotoUploads,
    ) -> Result<InventoryItem, InventoryError> {
        self.require_admin()?;
        let mut form = validate_form(form)?;
        check_sizes(&photos)?;

        let uploaded = self.photos.upload_all(&photos).await?;
        uploaded.apply_to(&mut form);

        let result = self.write(id, ItemUpdate::full(form)).await;
        if result.is_err() {
            self.photos.discard(&uploaded).await;
        }
        result
    }

    /// Row-level quick edit. Photos are untouched.
    pub async fn inline_update(
        &mut self,
        id: ItemId,
        edit: InlineEdit,
    ) -> Result<InventoryItem, InventoryError> {
        self.require_admin()?;
        let missing = edit.missing_fields();
        if !missing.is_empty() {
            return Err(InventoryError::MissingFields(missing));
        }
        self.write(id, ItemUpdate::inline(edit.normalized())).await
    }

    /// Apply locally, persist, then keep the stored row; restore the
    /// snapshot if the backend rejects the write.
    async fn write(&mut self, id: ItemId, update: ItemUpdate) -> Result<InventoryItem, InventoryError> {
        let position = self.items.iter().position(|i| i.id == id);
        let snapshot = position.map(|p| {
            let before = self.items[p].clone();
            update.apply_to(&mut self.items[p]);
            before
        });

        match self.store.update(id, &update).await {
            Ok(stored) => {
                if let Some(p) = position {
                    self.items[p] = stored.clone();
                }
                info!(item_id = %id, "inventory item updated");
                Ok(stored)
            }
            Err(e) => {
                if let (Some(p), Some(before)) = (position, snapshot) {
                    self.items[p] = before;
                }
                warn!(item_id = %id, error = %e, "inventory update failed; local entry restored");
                Err(e)
            }
        }
    }

    // ── Delete ───────────────────────────────────────────────────────────────

    /// Record `id` as the deletion target. Touches neither backend nor list.
    pub fn stage_delete(&mut self, id: ItemId) -> Result<&InventoryItem, InventoryError> {
        self.require_admin()?;
        let item = self
            .items
            .iter()
            .find(|i| i.id == id)
            .ok_or(InventoryError::ItemNotFound(id))?;
        self.pending_delete = Some(id);
        Ok(item)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the staged record. The stage is cleared whatever the outcome;
    /// the local entry goes only after the backend confirms.
    pub async fn confirm_delete(&mut self) -> Result<ItemId, InventoryError> {
        let id = self.pending_delete.take().ok_or(InventoryError::NothingStaged)?;
        self.require_admin()?;
        self.store.delete(id).await?;
        self.items.retain(|i| i.id != id);
        info!(item_id = %id, "inventory item deleted");
        Ok(id)
    }

    fn require_admin(&self) -> Result<(), InventoryError> {
        if self.viewer.is_admin {
            Ok(())
        } else {
            Err(InventoryError::Forbidden)
        }
    }
}

fn validate_form(form: ItemForm) -> Result<ItemForm, InventoryError> {
    let missing = form.missing_fields();
    if !missing.is_empty() {
        return Err(InventoryError::MissingFields(missing));
    }
    Ok(form.normalized())
}
