//! The object-document schema registry.
//!
//! A [`Mapper<T>`] is how a caller specifies, once per type, how the members of `T`
//! map to the fields of a document. Each registration pairs a document field name
//! with an [`Accessor`] and a [`Coder`]; everything else (encoding, decoding, building
//! filters and updates against the schema) is derived from that list.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Person {
//!     first_name: String,
//!     age: i32,
//! }
//!
//! let mut mapper = Mapper::new();
//! mapper
//!     .add_field("first_name", member!(Person, first_name))
//!     .add_field("age", member!(Person, age));
//!
//! let person = Person { first_name: "Jack".into(), age: 28 };
//! assert_eq!(mapper.to_json(&person)?, r#"{"first_name":"Jack","age":28}"#);
//! ```

use std::{any::Any, fmt};

use bson::{Bson, Document};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    accessor::{Accessor, MemberKey},
    codec::{Codec, Coder, NestedCoder, SequenceCoder, SerdeCoder, ValueCoder},
    document::DocumentJson,
    error::{MapperError, MapperResult},
    field::Field,
    update::Update,
};

/// Name of the identity field, excluded when a whole object is turned into `$set`.
pub const ID_FIELD: &str = "_id";

/// Object-safe view of a [`Coder`], so one entry type can hold any coder.
pub(crate) trait ErasedCoder<U>: Send + Sync {
    fn encode_value(&self, value: &U) -> MapperResult<Bson>;

    fn decode_value(&self, raw: &Bson) -> MapperResult<U>;

    fn clone_coder(&self) -> Box<dyn ErasedCoder<U>>;
}

impl<U, C: Coder<U>> ErasedCoder<U> for C {
    fn encode_value(&self, value: &U) -> MapperResult<Bson> {
        Coder::<U>::encode(self, value)
    }

    fn decode_value(&self, raw: &Bson) -> MapperResult<U> {
        Coder::<U>::decode(self, raw)
    }

    fn clone_coder(&self) -> Box<dyn ErasedCoder<U>> {
        Box::new(self.clone())
    }
}

/// One registered field: name, accessor and coder, erased over the component type.
trait Entry<T>: Send + Sync {
    fn name(&self) -> &str;

    fn key(&self) -> MemberKey;

    fn encode(&self, source: &T) -> MapperResult<Bson>;

    fn decode(&self, raw: &Bson, target: &mut T) -> MapperResult<()>;

    fn clone_box(&self) -> Box<dyn Entry<T>>;

    /// The concrete binding, for recovering the typed coder.
    fn as_any(&self) -> &dyn Any;
}

struct Binding<A, U> {
    name: String,
    accessor: A,
    coder: Box<dyn ErasedCoder<U>>,
}

impl<T, A, U> Entry<T> for Binding<A, U>
where
    T: 'static,
    U: 'static,
    A: Accessor<T, Value = U>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> MemberKey {
        self.accessor.key()
    }

    fn encode(&self, source: &T) -> MapperResult<Bson> {
        self.accessor.read(source, |value| self.coder.encode_value(value))
    }

    fn decode(&self, raw: &Bson, target: &mut T) -> MapperResult<()> {
        let value = self.coder.decode_value(raw)?;
        self.accessor.write(target, value);

        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Entry<T>> {
        Box::new(Binding {
            name: self.name.clone(),
            accessor: self.accessor.clone(),
            coder: self.coder.clone_coder(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> Clone for Box<dyn Entry<T>> {
    fn clone(&self) -> Box<dyn Entry<T>> {
        self.clone_box()
    }
}

/// The schema registry for `T`.
///
/// Entries are kept in registration order, which is also the field order of every
/// document the mapper produces. Cloning a mapper deep-clones its entries; two
/// mappers never share entry state.
pub struct Mapper<T> {
    entries: Vec<Box<dyn Entry<T>>>,
}

impl<T: 'static> Mapper<T> {
    /// Creates a mapper with no fields.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Maps a component whose type implements [`Codec`].
    ///
    /// Works with both direct members and getter/setter properties.
    /// Registering the same accessor twice is allowed, but lookups only ever find
    /// the first registration.
    pub fn add_field<A>(&mut self, name: impl Into<String>, accessor: A) -> &mut Self
    where
        A: Accessor<T>,
        A::Value: Codec,
    {
        self.add_field_with(name, accessor, ValueCoder)
    }

    /// Maps a component with an explicit coder.
    pub fn add_field_with<A, C>(&mut self, name: impl Into<String>, accessor: A, coder: C) -> &mut Self
    where
        A: Accessor<T>,
        C: Coder<A::Value>,
    {
        self.entries.push(Box::new(Binding {
            name: name.into(),
            accessor,
            coder: Box::new(coder),
        }));
        self
    }

    /// Maps a component that is itself described by a mapper.
    pub fn add_nested<A>(&mut self, name: impl Into<String>, accessor: A, mapper: Mapper<A::Value>) -> &mut Self
    where
        A: Accessor<T>,
        A::Value: Default,
    {
        self.add_field_with(name, accessor, NestedCoder::new(mapper))
    }

    /// Maps an ordered sequence of sub-objects, each described by `element`.
    pub fn add_sequence<A, U>(&mut self, name: impl Into<String>, accessor: A, element: Mapper<U>) -> &mut Self
    where
        A: Accessor<T, Value = Vec<U>>,
        U: Default + 'static,
    {
        self.add_field_with(name, accessor, SequenceCoder::new(element))
    }

    /// Maps a component through bson's serde bridge.
    pub fn add_serde_field<A>(&mut self, name: impl Into<String>, accessor: A) -> &mut Self
    where
        A: Accessor<T>,
        A::Value: Serialize + DeserializeOwned,
    {
        self.add_field_with(name, accessor, SerdeCoder::new())
    }

    /// Returns the field name registered for `accessor`.
    ///
    /// Entries are scanned in registration order; the first one whose accessor has
    /// the same identity (kind, component type and member) wins.
    ///
    /// # Errors
    ///
    /// [`MapperError::UnmappedMember`] if no entry matches.
    pub fn lookup_field<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<&str> {
        self.entry(accessor).map(|entry| entry.name())
    }

    fn entry<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<&dyn Entry<T>> {
        let key = accessor.key();

        self.entries
            .iter()
            .find(|entry| entry.key() == key)
            .map(|entry| &**entry)
            .ok_or_else(|| MapperError::UnmappedMember(key.to_string()))
    }

    /// Returns a typed handle to the field registered for `accessor`.
    ///
    /// The handle is the only way to build filters and updates, so a typo in a field
    /// name cannot reach the database. Values given to the handle are encoded with the
    /// coder the field was registered with.
    pub fn field<A: Accessor<T>>(&self, accessor: &A) -> MapperResult<Field<'_, T, A::Value>> {
        let entry = self.entry(accessor)?;
        let binding = entry
            .as_any()
            .downcast_ref::<Binding<A, A::Value>>()
            .ok_or_else(|| MapperError::UnmappedMember(accessor.key().to_string()))?;

        Ok(Field::new(self, &binding.name, &*binding.coder))
    }

    /// The registered field names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name())
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no field has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes `source`, one field per entry, in registration order.
    pub fn to_document(&self, source: &T) -> MapperResult<Document> {
        let mut document = Document::new();

        for entry in &self.entries {
            let value = entry
                .encode(source)
                .map_err(|e| e.in_field(entry.name()))?;
            document.insert(entry.name(), value);
        }

        Ok(document)
    }

    /// Encodes `source` and renders it as compact JSON text.
    pub fn to_json(&self, source: &T) -> MapperResult<String> {
        Ok(self.to_document(source)?.to_json_string())
    }

    /// Decodes a fresh `T` from `document`.
    ///
    /// # Errors
    ///
    /// The first entry that fails aborts the decode:
    /// [`MapperError::MissingField`] when the entry's name is absent,
    /// [`MapperError::TypeMismatch`] when the element has the wrong kind.
    pub fn from_document(&self, document: &Document) -> MapperResult<T>
    where
        T: Default,
    {
        let mut target = T::default();
        self.decode_fields(document, &mut target)?;

        Ok(target)
    }

    /// Decodes `document` into an existing `target`.
    ///
    /// `target` is only replaced once every entry decoded; on error it is untouched.
    pub fn from_document_into(&self, document: &Document, target: &mut T) -> MapperResult<()>
    where
        T: Clone,
    {
        let mut scratch = target.clone();
        self.decode_fields(document, &mut scratch)?;
        *target = scratch;

        Ok(())
    }

    fn decode_fields(&self, document: &Document, target: &mut T) -> MapperResult<()> {
        for entry in &self.entries {
            let raw = document
                .get(entry.name())
                .ok_or_else(|| MapperError::MissingField { field: entry.name().to_string() })?;

            entry
                .decode(raw, target)
                .map_err(|e| e.in_field(entry.name()))?;
        }

        Ok(())
    }

    /// Builds a `$set` update assigning every mapped field of `source` except `_id`.
    pub fn set_all(&self, source: &T) -> MapperResult<Update> {
        let mut fields = self.to_document(source)?;
        fields.remove(ID_FIELD);

        Ok(Update::from_operation("$set", fields))
    }
}

impl<T: 'static> Default for Mapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Mapper<T> {
    fn clone(&self) -> Self {
        Self { entries: self.entries.clone() }
    }
}

impl<T> fmt::Debug for Mapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("fields", &self.entries.iter().map(|entry| entry.name()).collect::<Vec<_>>())
            .finish()
    }
}
