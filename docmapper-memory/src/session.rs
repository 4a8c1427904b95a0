//! In-memory session implementation.
//!
//! Collections are vectors of BSON documents kept in insertion order, guarded by an
//! async-aware read-write lock.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use mea::rwlock::RwLock;
use tracing::trace;

use docmapper_core::{
    error::{MapperError, MapperResult},
    query::SortDirection,
    session::{Cursor, QueryRequest, RemoveScope, Session, SessionBuilder},
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, lookup},
    modifier::{self, Target},
};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document session.
///
/// `MemorySession` is cloneable and uses an `Arc`-wrapped internal state. Multiple
/// clones of the same instance share the same underlying data.
///
/// Queries scan every document of a collection (no indexing). Documents inserted
/// without an `_id` get a fresh object id, and a second document with an existing
/// `_id` is rejected, the way a server's unique `_id` index behaves.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::MemorySession;
/// use docmapper_core::session::{Session, SessionBuilder};
/// use bson::doc;
///
/// let session = MemorySession::builder().build().await?;
/// session.insert("people", doc! { "first_name": "Jack", "age": 28 }).await?;
/// assert_eq!(session.documents("people").await.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemorySession {
    store: Arc<RwLock<StoreMap>>,
}

impl MemorySession {
    /// Creates a new empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing a `MemorySession`, optionally pre-seeded.
    pub fn builder() -> MemorySessionBuilder {
        MemorySessionBuilder::default()
    }

    /// A snapshot of the documents of `collection`, in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.store
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of every collection that has been written to.
    pub async fn collections(&self) -> Vec<String> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    fn position_of(documents: &[Document], filter: &Document) -> MapperResult<Option<usize>> {
        for (index, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document).matches(filter)? {
                return Ok(Some(index));
            }
        }

        Ok(None)
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }

    let mut identified = Document::new();
    identified.insert("_id", ObjectId::new());
    for (key, value) in document {
        identified.insert(key, value);
    }
    identified
}

fn ensure_unique_id(documents: &[Document], document: &Document, collection: &str) -> MapperResult<()> {
    let id = document.get("_id");
    let duplicate = documents
        .iter()
        .any(|existing| existing.get("_id") == id);

    if duplicate {
        return Err(MapperError::Transport(format!(
            "duplicate key error in collection '{collection}': _id {}",
            id.map(|id| id.to_string()).unwrap_or_default()
        )));
    }

    Ok(())
}

#[async_trait]
impl Session for MemorySession {
    type Cursor = MemoryCursor;

    async fn submit_query(&self, request: QueryRequest) -> MapperResult<Self::Cursor> {
        let store = self.store.read().await;
        let documents = match store.get(&request.collection) {
            Some(documents) => documents,
            None => return Ok(MemoryCursor::default()),
        };

        let mut matched = DocumentEvaluator::filter_documents(documents, &request.filter)?;

        trace!(
            collection = %request.collection,
            scanned = documents.len(),
            matched = matched.len(),
            "evaluated filter"
        );

        if let Some(sort) = &request.sort {
            matched.sort_by(|a, b| {
                let left = lookup(a, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = lookup(b, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.sort_cmp(&right),
                    SortDirection::Desc => right.sort_cmp(&left),
                }
            });
        }

        let take = match request.limit {
            0 => usize::MAX,
            limit => limit as usize,
        };

        Ok(MemoryCursor {
            documents: matched
                .into_iter()
                .skip(request.skip as usize)
                .take(take)
                .collect(),
        })
    }

    async fn insert(&self, collection: &str, document: Document) -> MapperResult<()> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        let document = with_id(document);
        ensure_unique_id(documents, &document, collection)?;

        trace!(collection, document = %document, "inserted document");
        documents.push(document);

        Ok(())
    }

    async fn remove(&self, collection: &str, filter: Document, scope: RemoveScope) -> MapperResult<()> {
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(()),
        };

        match scope {
            RemoveScope::One => {
                if let Some(index) = Self::position_of(documents, &filter)? {
                    documents.remove(index);
                }
            },
            RemoveScope::All => {
                let mut doomed = Vec::with_capacity(documents.len());
                for document in documents.iter() {
                    doomed.push(DocumentEvaluator::new(document).matches(&filter)?);
                }

                let mut flags = doomed.iter();
                documents.retain(|_| !flags.next().copied().unwrap_or(false));

                trace!(collection, removed = doomed.iter().filter(|hit| **hit).count(), "removed documents");
            },
        }

        Ok(())
    }

    async fn update(&self, collection: &str, filter: Document, update: Document, upsert: bool) -> MapperResult<()> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        match Self::position_of(documents, &filter)? {
            Some(index) => {
                trace!(collection, index, "updating matched document");
                modifier::apply(&mut documents[index], &update, Target::Existing)
            },
            None if upsert => {
                let mut document = modifier::seed_from_filter(&filter)?;
                modifier::apply(&mut document, &update, Target::Inserted)?;
                ensure_unique_id(documents, &document, collection)?;

                trace!(collection, document = %document, "upserted document");
                documents.push(document);

                Ok(())
            },
            None => Ok(()),
        }
    }
}

/// Cursor over a snapshot of the documents a query matched.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    documents: VecDeque<Document>,
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn has_more(&mut self) -> MapperResult<bool> {
        Ok(!self.documents.is_empty())
    }

    async fn advance(&mut self) -> MapperResult<Document> {
        self.documents
            .pop_front()
            .ok_or_else(|| MapperError::EmptyResult("cursor is exhausted".to_string()))
    }
}

/// Builder for [`MemorySession`].
#[derive(Debug, Default)]
pub struct MemorySessionBuilder {
    seeded: StoreMap,
}

impl MemorySessionBuilder {
    /// Pre-seeds `collection` with `documents`, in order.
    pub fn collection(mut self, collection: impl Into<String>, documents: impl IntoIterator<Item = Document>) -> Self {
        self.seeded
            .entry(collection.into())
            .or_default()
            .extend(documents.into_iter().map(with_id));
        self
    }
}

#[async_trait]
impl SessionBuilder for MemorySessionBuilder {
    type Session = MemorySession;

    async fn build(self) -> MapperResult<Self::Session> {
        Ok(MemorySession { store: Arc::new(RwLock::new(self.seeded)) })
    }
}

#[cfg(test)]
mod tests {
    use bson::{Bson, doc};
    use docmapper_core::query::Sort;

    use super::*;

    fn request(filter: Document) -> QueryRequest {
        QueryRequest {
            collection: "people".into(),
            filter,
            sort: None,
            limit: 0,
            skip: 0,
        }
    }

    async fn drain(mut cursor: MemoryCursor) -> Vec<Document> {
        let mut documents = Vec::new();
        while cursor.has_more().await.unwrap() {
            documents.push(cursor.advance().await.unwrap());
        }
        documents
    }

    async fn seeded() -> MemorySession {
        MemorySession::builder()
            .collection("people", (0..5).map(|n| doc! { "_id": n, "first_name": format!("p{n}"), "age": 29 - n }))
            .build()
            .await
            .unwrap()
    }

    fn ages(documents: &[Document]) -> Vec<i32> {
        documents
            .iter()
            .map(|document| document.get_i32("age").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn queries_sort_then_skip_then_limit() {
        let session = seeded().await;

        let mut sorted = request(doc! {});
        sorted.sort = Some(Sort { field: "age".into(), direction: SortDirection::Asc });
        sorted.skip = 1;
        sorted.limit = 2;

        let documents = drain(session.submit_query(sorted).await.unwrap()).await;
        assert_eq!(ages(&documents), vec![26, 27]);

        let unsorted = drain(session.submit_query(request(doc! {})).await.unwrap()).await;
        assert_eq!(ages(&unsorted), vec![29, 28, 27, 26, 25]);
    }

    #[tokio::test]
    async fn missing_collections_are_empty() {
        let session = MemorySession::new();
        let mut cursor = session.submit_query(request(doc! {})).await.unwrap();

        assert!(!cursor.has_more().await.unwrap());
        assert!(cursor.advance().await.unwrap_err().is_empty_result());
    }

    #[tokio::test]
    async fn inserts_generate_ids_and_reject_duplicates() {
        let session = MemorySession::new();

        session.insert("people", doc! { "first_name": "Jack" }).await.unwrap();
        session.insert("people", doc! { "_id": 1, "first_name": "Sal" }).await.unwrap();
        let duplicate = session.insert("people", doc! { "_id": 1, "first_name": "Ann" }).await;

        let documents = session.documents("people").await;
        assert!(matches!(documents[0].get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(documents[0].keys().next().map(String::as_str), Some("_id"));
        assert!(matches!(duplicate, Err(MapperError::Transport(_))));
        assert_eq!(documents.len(), 2);
        assert_eq!(session.collections().await, vec!["people".to_string()]);
    }

    #[tokio::test]
    async fn remove_one_or_all() {
        let session = seeded().await;

        session.remove("people", doc! { "age": { "$lt": 28 } }, RemoveScope::One).await.unwrap();
        assert_eq!(ages(&session.documents("people").await), vec![29, 28, 26, 25]);

        session.remove("people", doc! { "age": { "$lt": 28 } }, RemoveScope::All).await.unwrap();
        assert_eq!(ages(&session.documents("people").await), vec![29, 28]);
    }

    #[tokio::test]
    async fn updates_touch_the_first_match_only() {
        let session = seeded().await;

        session
            .update("people", doc! { "age": { "$lt": 28 } }, doc! { "$inc": { "age": 10 } }, false)
            .await
            .unwrap();

        assert_eq!(ages(&session.documents("people").await), vec![29, 28, 37, 26, 25]);
    }

    #[tokio::test]
    async fn upserts_insert_when_nothing_matches() {
        let session = seeded().await;

        session
            .update("people", doc! { "_id": 9 }, doc! { "$set": { "first_name": "Ann", "age": 9 } }, false)
            .await
            .unwrap();
        assert_eq!(session.documents("people").await.len(), 5);

        session
            .update("people", doc! { "_id": 9 }, doc! { "$set": { "first_name": "Ann", "age": 9 } }, true)
            .await
            .unwrap();

        let documents = session.documents("people").await;
        assert_eq!(documents.len(), 6);
        assert_eq!(documents[5], doc! { "_id": 9, "first_name": "Ann", "age": 9 });
    }

    #[tokio::test]
    async fn clones_share_state() {
        let session = MemorySession::new();
        let other = session.clone();

        other.insert("people", doc! { "_id": 1 }).await.unwrap();

        assert_eq!(session.documents("people").await.len(), 1);
    }
}
