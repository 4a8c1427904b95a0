//! A mapper bound to a collection name.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    accessor::Accessor,
    codec::Codec,
    document::Mapped,
    error::MapperResult,
    field::Field,
    mapper::Mapper,
};

/// A collection of documents shaped like `T`.
///
/// `Table` is what sessions query and insert against. It owns its [`Mapper`] and
/// forwards the registration and lookup calls to it.
#[derive(Debug, Clone)]
pub struct Table<T> {
    collection: String,
    mapper: Mapper<T>,
}

impl<T: 'static> Table<T> {
    /// Creates a table with an empty mapper.
    pub fn new(collection: impl Into<String>) -> Self {
        Self::with_mapper(collection, Mapper::new())
    }

    /// Creates a table around an existing mapper.
    pub fn with_mapper(collection: impl Into<String>, mapper: Mapper<T>) -> Self {
        Self { collection: collection.into(), mapper }
    }

    /// Creates a table for a type that carries its own mapper.
    pub fn of(collection: impl Into<String>) -> Self
    where
        T: Mapped,
    {
        Self::with_mapper(collection, T::mapper())
    }

    /// Name of the backing collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The schema of `T`.
    pub fn mapper(&self) -> &Mapper<T> {
        &self.mapper
    }

    /// See [`Mapper::add_field`].
    pub fn add_field<A>(&mut self, name: impl Into<String>, accessor: A) -> &mut Self
    where
        A: Accessor<T>,
        A::Value: Codec,
    {
        self.mapper.add_field(name, accessor);
        self
    }

    /// See [`Mapper::add_nested`].
    pub fn add_nested<A>(&mut self, name: impl Into<String>, accessor: A, mapper: Mapper<A::Value>) -> &mut Self
    where
        A: Accessor<T>,
        A::Value: Default,
    {
        self.mapper.add_nested(name, accessor, mapper);
        self
    }

    /// See [`Mapper::add_sequence`].
    pub fn add_sequence<A, U>(&mut self, name: impl Into<String>, accessor: A, element: Mapper<U>) -> &mut Self
    where
        A: Accessor<T, Value = Vec<U>>,
        U: Default + 'static,
    {
        self.mapper.add_sequence(name, accessor, element);
        self
    }

    /// See [`Mapper::add_serde_field`].
    pub fn add_serde_field<A>(&mut self, name: impl Into<String>, accessor: A) -> &mut Self
    where
        A: Accessor<T>,
        A::Value: Serialize + DeserializeOwned,
    {
        self.mapper.add_serde_field(name, accessor);
        self
    }

    /// See [`Mapper::lookup_field`].
    pub fn lookup_field<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<&str> {
        self.mapper.lookup_field(accessor)
    }

    /// See [`Mapper::field`].
    pub fn field<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<Field<'_, T, A::Value>> {
        self.mapper.field(accessor)
    }
}
