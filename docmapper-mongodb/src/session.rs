//! MongoDB session implementation.

use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, Cursor as DriverCursor,
    options::{ClientOptions, FindOptions},
};
use tracing::trace;

use docmapper_core::{
    error::{MapperError, MapperResult},
    session::{Cursor, QueryRequest, RemoveScope, Session, SessionBuilder},
};

fn transport(error: mongodb::error::Error) -> MapperError {
    MapperError::Transport(error.to_string())
}

/// A session backed by one database of a MongoDB deployment.
///
/// Requests are forwarded to the driver as rendered; driver errors surface as
/// [`MapperError::Transport`] and are never retried here.
#[derive(Debug, Clone)]
pub struct MongoSession {
    client: Client,
    database: String,
}

impl MongoSession {
    /// Wraps an already connected client.
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }

    /// Starts configuring a session for `database` at `dsn`.
    pub fn builder(dsn: &str, database: &str) -> MongoSessionBuilder {
        MongoSessionBuilder::new(dsn, database)
    }

    /// Name of the database every collection lives in.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

/// Translates the sort, skip and limit of a request into driver options.
pub(crate) fn find_options(request: &QueryRequest) -> FindOptions {
    let mut options = FindOptions::default();

    if request.limit > 0 {
        options.limit = Some(request.limit as i64);
    }
    if request.skip > 0 {
        options.skip = Some(request.skip as u64);
    }
    if let Some(sort) = &request.sort {
        options.sort = Some(doc! { sort.field.clone(): sort.direction.as_i32() });
    }

    options
}

#[async_trait]
impl Session for MongoSession {
    type Cursor = MongoCursor;

    async fn submit_query(&self, request: QueryRequest) -> MapperResult<Self::Cursor> {
        let options = find_options(&request);

        let cursor = self
            .get_collection(&request.collection)
            .find(request.filter)
            .with_options(options)
            .await
            .map_err(transport)?;

        Ok(MongoCursor::new(cursor))
    }

    async fn insert(&self, collection: &str, document: Document) -> MapperResult<()> {
        self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(transport)?;

        Ok(())
    }

    async fn remove(&self, collection: &str, filter: Document, scope: RemoveScope) -> MapperResult<()> {
        let collection = self.get_collection(collection);

        let result = match scope {
            RemoveScope::All => collection.delete_many(filter).await,
            RemoveScope::One => collection.delete_one(filter).await,
        }
        .map_err(transport)?;

        trace!(deleted = result.deleted_count, "removed documents");

        Ok(())
    }

    async fn update(&self, collection: &str, filter: Document, update: Document, upsert: bool) -> MapperResult<()> {
        let result = self
            .get_collection(collection)
            .update_one(filter, update)
            .upsert(upsert)
            .await
            .map_err(transport)?;

        trace!(
            matched = result.matched_count,
            modified = result.modified_count,
            upserted = result.upserted_id.is_some(),
            "updated document"
        );

        Ok(())
    }

    async fn shutdown(self) -> MapperResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Driver cursor with a one-document look-ahead, so `has_more` is exact.
#[derive(Debug)]
pub struct MongoCursor {
    inner: DriverCursor<Document>,
    peeked: Option<Document>,
}

impl MongoCursor {
    fn new(inner: DriverCursor<Document>) -> Self {
        Self { inner, peeked: None }
    }
}

#[async_trait]
impl Cursor for MongoCursor {
    async fn has_more(&mut self) -> MapperResult<bool> {
        if self.peeked.is_none() {
            self.peeked = self.inner.try_next().await.map_err(transport)?;
        }

        Ok(self.peeked.is_some())
    }

    async fn advance(&mut self) -> MapperResult<Document> {
        if !self.has_more().await? {
            return Err(MapperError::EmptyResult("cursor is exhausted".to_string()));
        }

        self.peeked
            .take()
            .ok_or_else(|| MapperError::EmptyResult("cursor is exhausted".to_string()))
    }
}

/// Builder for [`MongoSession`].
#[derive(Debug, Clone)]
pub struct MongoSessionBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
}

impl MongoSessionBuilder {
    /// Creates a builder with no application name.
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Reports `app_name` to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl SessionBuilder for MongoSessionBuilder {
    type Session = MongoSession;

    async fn build(self) -> MapperResult<Self::Session> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| MapperError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }

        Ok(MongoSession::new(
            Client::with_options(options).map_err(|e| MapperError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
