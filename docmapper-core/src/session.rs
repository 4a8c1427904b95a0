//! The boundary between the mapping engine and a document store.
//!
//! A [`Session`] executes already-rendered query, insert, update and remove documents;
//! a [`Cursor`] yields the raw documents a query matched. Implementations live in
//! their own crates (`docmapper-memory`, `docmapper-mongodb`). Everything on this side
//! of the boundary is pure; every `.await` in the engine is a single call into one of
//! these traits.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! let session = MemorySession::builder().build().await?;
//! let people = Table::<Person>::of("people");
//!
//! session.inserter(&people).insert(&jack).await?;
//! let adults = session
//!     .query(&people)
//!     .filter(people.field(&member!(Person, age))?.gte(18)?)?
//!     .all()
//!     .await?;
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use bson::Document;

use crate::{
    error::MapperResult,
    inserter::Inserter,
    mapper::Mapper,
    query::{Query, Sort},
    table::Table,
};

/// Everything a session needs to run a find.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Collection to search.
    pub collection: String,
    /// Rendered filter document; empty matches everything.
    pub filter: Document,
    /// Single-field ordering, if any.
    pub sort: Option<Sort>,
    /// Maximum number of documents; `0` means no limit.
    pub limit: u32,
    /// Number of leading matches to drop.
    pub skip: u32,
}

/// How many matching documents a remove deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveScope {
    /// Every matching document.
    All,
    /// The first matching document.
    One,
}

/// A connection to a document store.
///
/// Implementations must be safe to share between tasks. Failures are reported as
/// [`MapperError::Transport`](crate::error::MapperError::Transport) and never retried.
#[async_trait]
pub trait Session: Send + Sync + Debug {
    /// The cursor type returned by [`Session::submit_query`].
    type Cursor: Cursor;

    /// Runs a find and returns a cursor over the matching documents.
    async fn submit_query(&self, request: QueryRequest) -> MapperResult<Self::Cursor>;

    /// Inserts one document into `collection`.
    async fn insert(&self, collection: &str, document: Document) -> MapperResult<()>;

    /// Deletes the documents of `collection` matching `filter`.
    async fn remove(&self, collection: &str, filter: Document, scope: RemoveScope) -> MapperResult<()>;

    /// Applies `update` to the first document of `collection` matching `filter`.
    ///
    /// With `upsert`, a document is created when nothing matches.
    async fn update(&self, collection: &str, filter: Document, update: Document, upsert: bool) -> MapperResult<()>;

    /// Gracefully shuts down the session.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> MapperResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<S> Session for &S
where
    S: Session,
{
    type Cursor = S::Cursor;

    async fn submit_query(&self, request: QueryRequest) -> MapperResult<Self::Cursor> {
        (*self).submit_query(request).await
    }

    async fn insert(&self, collection: &str, document: Document) -> MapperResult<()> {
        (*self).insert(collection, document).await
    }

    async fn remove(&self, collection: &str, filter: Document, scope: RemoveScope) -> MapperResult<()> {
        (*self)
            .remove(collection, filter, scope)
            .await
    }

    async fn update(&self, collection: &str, filter: Document, update: Document, upsert: bool) -> MapperResult<()> {
        (*self)
            .update(collection, filter, update, upsert)
            .await
    }
}

/// A server-side iteration handle over query results.
#[async_trait]
pub trait Cursor: Send {
    /// Whether at least one document is left. May fetch the next batch.
    async fn has_more(&mut self) -> MapperResult<bool>;

    /// Takes the next document.
    ///
    /// Fails with [`MapperError::EmptyResult`](crate::error::MapperError::EmptyResult)
    /// when nothing is left.
    async fn advance(&mut self) -> MapperResult<Document>;
}

/// Factory for sessions.
#[async_trait]
pub trait SessionBuilder {
    /// The session produced.
    type Session: Session;

    /// Connects and returns a ready session.
    async fn build(self) -> MapperResult<Self::Session>;
}

/// Entry points from a session into typed queries and inserts.
pub trait SessionExt: Session + Sized {
    /// Starts a query over `table`.
    fn query<'a, T: 'static>(&'a self, table: &'a Table<T>) -> Query<'a, T, Self> {
        Query::new(self, table.collection(), table.mapper())
    }

    /// Starts a query over `collection`, decoding with `mapper`.
    fn query_with<'a, T: 'static>(&'a self, collection: &'a str, mapper: &'a Mapper<T>) -> Query<'a, T, Self> {
        Query::new(self, collection, mapper)
    }

    /// Creates an inserter for `table`.
    fn inserter<'a, T: 'static>(&'a self, table: &'a Table<T>) -> Inserter<'a, T, Self> {
        Inserter::new(self, table.collection(), table.mapper())
    }

    /// Creates an inserter for `collection`, encoding with `mapper`.
    fn inserter_with<'a, T: 'static>(&'a self, collection: &'a str, mapper: &'a Mapper<T>) -> Inserter<'a, T, Self> {
        Inserter::new(self, collection, mapper)
    }
}

impl<S: Session> SessionExt for S {}
