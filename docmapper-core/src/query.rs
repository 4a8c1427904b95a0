//! Query building and typed result cursors.
//!
//! A [`Query`] accumulates a filter, a sort, a limit and a skip. Every builder call
//! returns a new query and leaves the receiver untouched, so one base query can be
//! reused for many derived ones:
//!
//! ```ignore
//! let people = session.query(&table);
//! let adults = people.filter(age.gte(18)?)?;
//!
//! let youngest = adults.ascending(&member!(Person, age))?.first().await?;
//! let page = adults.skip(20).limit(10).all().await?;
//! ```
//!
//! Terminal operations (`result`, `first`, `all`, `remove_*`, `update*`) render the
//! accumulated state into documents and hand them to the [`Session`].
//! [`QueryResult`] decodes the documents a cursor yields back into `T`.

use std::fmt;

use tracing::{debug, trace};

use crate::{
    accessor::Accessor,
    error::{MapperError, MapperResult},
    filter::Filter,
    mapper::Mapper,
    session::{Cursor, QueryRequest, RemoveScope, Session},
    update::Update,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The sort document value: `1` or `-1`.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The document field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// An immutable query over one collection of `T`.
pub struct Query<'a, T, S> {
    session: &'a S,
    collection: &'a str,
    mapper: &'a Mapper<T>,
    filter: Filter,
    sort: Option<Sort>,
    limit: u32,
    skip: u32,
}

impl<T, S> Clone for Query<'_, T, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            collection: self.collection,
            mapper: self.mapper,
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            skip: self.skip,
        }
    }
}

impl<T, S> fmt::Debug for Query<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("collection", &self.collection)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("skip", &self.skip)
            .finish()
    }
}

impl<'a, T: 'static, S: Session> Query<'a, T, S> {
    /// Creates an unfiltered, unsorted, unlimited query.
    pub fn new(session: &'a S, collection: &'a str, mapper: &'a Mapper<T>) -> Self {
        Self {
            session,
            collection,
            mapper,
            filter: Filter::new(),
            sort: None,
            limit: 0,
            skip: 0,
        }
    }

    /// Returns a query whose filter is this filter merged with `by`.
    ///
    /// # Errors
    ///
    /// [`MapperError::ConflictingFilter`] if `by` cannot be merged.
    pub fn filter(&self, by: Filter) -> MapperResult<Self> {
        Ok(Self { filter: self.filter.clone().and(by)?, ..self.clone() })
    }

    /// Returns a query yielding at most `limit` documents; `0` means no limit.
    pub fn limit(&self, limit: u32) -> Self {
        Self { limit, ..self.clone() }
    }

    /// Returns a query skipping the first `skip` matches.
    pub fn skip(&self, skip: u32) -> Self {
        Self { skip, ..self.clone() }
    }

    /// Returns a query sorted by the field mapped for `accessor`, smallest first.
    pub fn ascending<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<Self> {
        self.sorted(accessor, SortDirection::Asc)
    }

    /// Returns a query sorted by the field mapped for `accessor`, largest first.
    pub fn descending<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<Self> {
        self.sorted(accessor, SortDirection::Desc)
    }

    fn sorted<A: Accessor<T>>(&self, accessor: &A, direction: SortDirection) -> MapperResult<Self> {
        let field = self.mapper.lookup_field(accessor)?.to_string();

        Ok(Self { sort: Some(Sort { field, direction }), ..self.clone() })
    }

    /// Name of the queried collection.
    pub fn collection(&self) -> &'a str {
        self.collection
    }

    /// Mapper used to resolve members and decode results.
    pub fn mapper(&self) -> &'a Mapper<T> {
        self.mapper
    }

    /// Accumulated filter; empty until [`Query::filter`] is called.
    pub fn current_filter(&self) -> &Filter {
        &self.filter
    }

    /// Renders the accumulated state into the request a session executes.
    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            collection: self.collection.to_string(),
            filter: self.filter.to_document(),
            sort: self.sort.clone(),
            limit: self.limit,
            skip: self.skip,
        }
    }

    /// Submits the query and returns a cursor decoding into `T`.
    pub async fn result(&self) -> MapperResult<QueryResult<'a, T, S::Cursor>> {
        let request = self.request();

        debug!(
            collection = %request.collection,
            filter = %request.filter,
            sort = ?request.sort,
            limit = request.limit,
            skip = request.skip,
            "submitting query"
        );

        let cursor = self.session.submit_query(request).await?;

        Ok(QueryResult::new(cursor, self.mapper))
    }

    /// The first match.
    ///
    /// # Errors
    ///
    /// [`MapperError::EmptyResult`] when nothing matches.
    pub async fn first(&self) -> MapperResult<T>
    where
        T: Default,
    {
        self.limit(1).result().await?.first().await
    }

    /// Same as [`Query::first`].
    pub async fn one(&self) -> MapperResult<T>
    where
        T: Default,
    {
        self.first().await
    }

    /// Every match, in cursor order.
    pub async fn all(&self) -> MapperResult<Vec<T>>
    where
        T: Default,
    {
        self.result().await?.all().await
    }

    /// Deletes every matching document.
    pub async fn remove_all(&self) -> MapperResult<()> {
        self.remove(RemoveScope::All).await
    }

    /// Deletes the first matching document.
    pub async fn remove_one(&self) -> MapperResult<()> {
        self.remove(RemoveScope::One).await
    }

    async fn remove(&self, scope: RemoveScope) -> MapperResult<()> {
        let filter = self.filter.to_document();

        debug!(collection = self.collection, filter = %filter, ?scope, "removing documents");

        self.session
            .remove(self.collection, filter, scope)
            .await
    }

    /// Applies `update` to the first matching document.
    pub async fn update(&self, update: &Update) -> MapperResult<()> {
        let filter = self.filter.to_document();
        let update = update.to_document();

        debug!(collection = self.collection, filter = %filter, update = %update, "updating document");

        self.session
            .update(self.collection, filter, update, false)
            .await
    }

    /// Writes every mapped field of `value` except `_id` to the first matching document.
    pub async fn update_from(&self, value: &T) -> MapperResult<()> {
        let update = self.mapper.set_all(value)?;

        self.update(&update).await
    }
}

/// A cursor adapter decoding each document into `T`.
///
/// The cursor is owned; dropping the result releases it.
pub struct QueryResult<'a, T, C> {
    cursor: C,
    mapper: &'a Mapper<T>,
}

impl<T, C> fmt::Debug for QueryResult<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl<'a, T: 'static, C: Cursor> QueryResult<'a, T, C> {
    /// Wraps a raw cursor, decoding each document with `mapper`.
    pub fn new(cursor: C, mapper: &'a Mapper<T>) -> Self {
        Self { cursor, mapper }
    }

    /// Whether at least one document is left.
    pub async fn more(&mut self) -> MapperResult<bool> {
        self.cursor.has_more().await
    }

    /// Decodes the next document.
    ///
    /// # Errors
    ///
    /// [`MapperError::EmptyResult`] when the cursor is drained.
    pub async fn next(&mut self) -> MapperResult<T>
    where
        T: Default,
    {
        if !self.more().await? {
            return Err(MapperError::EmptyResult(
                "Query results are empty; cannot return any more results.".to_string(),
            ));
        }

        let document = self.cursor.advance().await?;
        trace!(document = %document, "advanced cursor");

        self.mapper.from_document(&document)
    }

    /// Decodes the next document into `target`.
    ///
    /// Returns `false`, leaving `target` alone, when the cursor is drained.
    pub async fn next_into(&mut self, target: &mut T) -> MapperResult<bool>
    where
        T: Clone,
    {
        if !self.more().await? {
            return Ok(false);
        }

        let document = self.cursor.advance().await?;
        trace!(document = %document, "advanced cursor");

        self.mapper.from_document_into(&document, target)?;

        Ok(true)
    }

    /// Decodes the first remaining document.
    ///
    /// # Errors
    ///
    /// [`MapperError::EmptyResult`] when the cursor is drained.
    pub async fn first(mut self) -> MapperResult<T>
    where
        T: Default,
    {
        if !self.more().await? {
            return Err(Self::no_first());
        }

        self.next().await
    }

    /// Same as [`QueryResult::first`].
    pub async fn one(self) -> MapperResult<T>
    where
        T: Default,
    {
        self.first().await
    }

    /// Decodes the first remaining document into `target`.
    pub async fn first_into(mut self, target: &mut T) -> MapperResult<()>
    where
        T: Clone,
    {
        if self.next_into(target).await? {
            Ok(())
        } else {
            Err(Self::no_first())
        }
    }

    /// Drains the cursor.
    pub async fn all(mut self) -> MapperResult<Vec<T>>
    where
        T: Default,
    {
        let mut values = Vec::new();

        while self.more().await? {
            values.push(self.next().await?);
        }

        Ok(values)
    }

    /// Gives up decoding and returns the raw cursor.
    pub fn into_cursor(self) -> C {
        self.cursor
    }

    fn no_first() -> MapperError {
        MapperError::EmptyResult("Query returned no results; cannot return the first element.".to_string())
    }
}
