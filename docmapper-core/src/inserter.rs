//! Typed inserts.

use bson::Document;
use tracing::debug;

use crate::{
    error::{MapperError, MapperResult},
    mapper::{ID_FIELD, Mapper},
    session::Session,
    update::Update,
};

/// Writes whole objects into one collection.
pub struct Inserter<'a, T, S> {
    session: &'a S,
    collection: &'a str,
    mapper: &'a Mapper<T>,
}

impl<'a, T: 'static, S: Session> Inserter<'a, T, S> {
    /// Binds `mapper` to `collection` on `session`.
    ///
    /// Usually obtained through [`SessionExt::inserter`](crate::session::SessionExt::inserter).
    pub fn new(session: &'a S, collection: &'a str, mapper: &'a Mapper<T>) -> Self {
        Self { session, collection, mapper }
    }

    /// Name of the target collection.
    pub fn collection(&self) -> &'a str {
        self.collection
    }

    /// Encodes `value` and inserts it as a new document.
    pub async fn insert(&self, value: &T) -> MapperResult<()> {
        let document = self.mapper.to_document(value)?;

        debug!(collection = self.collection, "inserting document");

        self.session
            .insert(self.collection, document)
            .await
    }

    /// Encodes `value` and replaces the fields of the document with the same `_id`,
    /// creating it when absent.
    ///
    /// # Errors
    ///
    /// [`MapperError::MissingField`] when the mapper has no `_id` entry.
    pub async fn upsert(&self, value: &T) -> MapperResult<()> {
        let mut fields = self.mapper.to_document(value)?;
        let id = fields
            .remove(ID_FIELD)
            .ok_or_else(|| MapperError::MissingField { field: ID_FIELD.to_string() })?;

        let mut filter = Document::new();
        filter.insert(ID_FIELD, id.clone());

        let update = if fields.is_empty() {
            Update::from_operation("$setOnInsert", filter.clone())
        } else {
            Update::from_operation("$set", fields)
        };

        debug!(collection = self.collection, id = %id, "upserting document");

        self.session
            .update(self.collection, filter, update.to_document(), true)
            .await
    }
}
