//! Document metadata attached to agreements.

use serde_json::json;
use std::sync::Arc;

use crate::domain::{Agreement, DocumentRecord};
use crate::error::{VellumError, VellumResult};
use crate::store::VersionedStore;
use crate::types::{partition_key, EntityKind, EntityRecord, FieldMap, Stored};

/// An uploaded file that has already been written to blob storage.
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub contents: &'a [u8],
    pub location: &'a str,
}

pub struct DocumentService {
    store: Arc<VersionedStore>,
}

impl DocumentService {
    pub fn new(store: Arc<VersionedStore>) -> Self {
        Self { store }
    }

    /// Record an upload against an agreement the uploader is a party to.
    pub async fn register(
        &self,
        agreement_id: &str,
        uploader_id: &str,
        upload: Upload<'_>,
    ) -> VellumResult<Stored<DocumentRecord>> {
        if upload.file_name.trim().is_empty() {
            return Err(VellumError::validation("A document needs a file name"));
        }
        let agreement = self
            .store
            .get_typed::<Agreement>(agreement_id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(EntityKind::Agreement, agreement_id)))?;
        if !agreement.data.involves(uploader_id) {
            return Err(VellumError::validation(format!(
                "User {} is not a party to agreement {}",
                uploader_id, agreement_id
            )));
        }

        let record = DocumentRecord::describe(
            agreement_id,
            uploader_id,
            upload.file_name.trim(),
            upload.content_type,
            upload.contents,
            upload.location,
        );
        let stored = self.store.create_typed(&record).await?;
        tracing::info!(
            document_id = %stored.id,
            agreement_id,
            size_bytes = record.size_bytes,
            "registered document"
        );
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> VellumResult<Option<Stored<DocumentRecord>>> {
        self.store.get_typed(id).await
    }

    /// Documents attached to an agreement. Scans every document.
    pub async fn for_agreement(&self, agreement_id: &str) -> VellumResult<Vec<Stored<DocumentRecord>>> {
        let records = self
            .store
            .find_where(EntityKind::Document, |record| {
                record.get_str("agreementId") == Some(agreement_id)
            })
            .await?;
        records.into_iter().map(EntityRecord::into_stored).collect()
    }

    /// Rename a document in place.
    pub async fn rename(&self, id: &str, file_name: &str) -> VellumResult<Stored<DocumentRecord>> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(VellumError::validation("A document needs a file name"));
        }
        let mut fields = FieldMap::new();
        fields.insert("fileName".to_string(), json!(file_name));
        self.store
            .update(EntityKind::Document, id, fields, false)
            .await?
            .into_stored()
    }

    pub async fn delete(&self, id: &str) -> VellumResult<usize> {
        self.store.delete(EntityKind::Document, id).await
    }
}
