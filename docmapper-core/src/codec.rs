//! Type-driven encode/decode strategies for mapped components.
//!
//! Two layers live here:
//!
//! - [`Codec`] is implemented by the component types themselves (scalars, sequences,
//!   string-keyed maps, a few BSON-native types). Selection is purely static: the
//!   declared type of a mapped member picks the implementation.
//! - [`Coder`] is the runtime strategy a mapper entry holds. [`ValueCoder`] defers to
//!   [`Codec`], [`NestedCoder`] and [`SequenceCoder`] delegate to another [`Mapper`],
//!   and [`SerdeCoder`] goes through bson's serde bridge.
//!
//! Decoding checks the element kind exactly. There is no numeric coercion: an `int64`
//! element never decodes into an `i32` member, a `double` never into an `i64`.
//!
//! Unsigned integers share the signed wire kinds (`u32` as `int32`, `u64` as `int64`).
//! Values that do not fit are rejected with [`MapperError::ValueOutOfRange`] in both
//! directions instead of being reinterpreted.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    marker::PhantomData,
};

use bson::{
    Binary, Bson, DateTime, Document, de::deserialize_from_bson, oid::ObjectId,
    ser::serialize_to_bson, spec::BinarySubtype,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{MapperError, MapperResult},
    mapper::Mapper,
};

/// Returns a short name for the kind of a BSON element, used in error messages.
pub fn kind_name(raw: &Bson) -> &'static str {
    match raw {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::DateTime(_) => "datetime",
        Bson::ObjectId(_) => "objectid",
        Bson::Binary(_) => "binary",
        Bson::Timestamp(_) => "timestamp",
        Bson::Decimal128(_) => "decimal128",
        Bson::RegularExpression(_) => "regex",
        _ => "other",
    }
}

/// A component type with a fixed document representation.
pub trait Codec: Sized {
    /// Encodes the value into a document element.
    fn encode(&self) -> MapperResult<Bson>;

    /// Decodes a document element, failing if its kind is not the expected one.
    fn decode(raw: &Bson) -> MapperResult<Self>;
}

/// Marker for components that `$inc` may be applied to.
pub trait Numeric: Codec {}

impl Numeric for i32 {}
impl Numeric for u32 {}
impl Numeric for i64 {}
impl Numeric for u64 {}
impl Numeric for f64 {}

impl Codec for String {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::String(self.clone()))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::String(value) => Ok(value.clone()),
            other => Err(MapperError::type_mismatch("string", kind_name(other))),
        }
    }
}

impl Codec for i32 {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::Int32(*self))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Int32(value) => Ok(*value),
            other => Err(MapperError::type_mismatch("int32", kind_name(other))),
        }
    }
}

impl Codec for u32 {
    fn encode(&self) -> MapperResult<Bson> {
        i32::try_from(*self)
            .map(Bson::Int32)
            .map_err(|_| MapperError::out_of_range(self, "int32"))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Int32(value) => u32::try_from(*value)
                .map_err(|_| MapperError::out_of_range(value, "u32")),
            other => Err(MapperError::type_mismatch("int32", kind_name(other))),
        }
    }
}

impl Codec for i64 {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::Int64(*self))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Int64(value) => Ok(*value),
            other => Err(MapperError::type_mismatch("int64", kind_name(other))),
        }
    }
}

impl Codec for u64 {
    fn encode(&self) -> MapperResult<Bson> {
        i64::try_from(*self)
            .map(Bson::Int64)
            .map_err(|_| MapperError::out_of_range(self, "int64"))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Int64(value) => u64::try_from(*value)
                .map_err(|_| MapperError::out_of_range(value, "u64")),
            other => Err(MapperError::type_mismatch("int64", kind_name(other))),
        }
    }
}

impl Codec for bool {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::Boolean(*self))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Boolean(value) => Ok(*value),
            other => Err(MapperError::type_mismatch("bool", kind_name(other))),
        }
    }
}

impl Codec for f64 {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::Double(*self))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Double(value) => Ok(*value),
            other => Err(MapperError::type_mismatch("double", kind_name(other))),
        }
    }
}

impl Codec for ObjectId {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::ObjectId(*self))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::ObjectId(value) => Ok(*value),
            other => Err(MapperError::type_mismatch("objectid", kind_name(other))),
        }
    }
}

impl Codec for DateTime {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::DateTime(*self))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::DateTime(value) => Ok(*value),
            other => Err(MapperError::type_mismatch("datetime", kind_name(other))),
        }
    }
}

impl Codec for chrono::DateTime<chrono::Utc> {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::DateTime(DateTime::from_millis(self.timestamp_millis())))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::DateTime(value) => chrono::DateTime::from_timestamp_millis(value.timestamp_millis())
                .ok_or_else(|| MapperError::out_of_range(value.timestamp_millis(), "chrono::DateTime")),
            other => Err(MapperError::type_mismatch("datetime", kind_name(other))),
        }
    }
}

impl Codec for uuid::Uuid {
    fn encode(&self) -> MapperResult<Bson> {
        Ok(Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: self.as_bytes().to_vec(),
        }))
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
                uuid::Uuid::from_slice(&binary.bytes)
                    .map_err(|err| MapperError::Serialization(err.to_string()))
            },
            other => Err(MapperError::type_mismatch("uuid", kind_name(other))),
        }
    }
}

impl<U: Codec> Codec for Option<U> {
    fn encode(&self) -> MapperResult<Bson> {
        match self {
            Some(value) => value.encode(),
            None => Ok(Bson::Null),
        }
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Null => Ok(None),
            other => U::decode(other).map(Some),
        }
    }
}

impl<U: Codec> Codec for Vec<U> {
    fn encode(&self) -> MapperResult<Bson> {
        self.iter()
            .enumerate()
            .map(|(index, item)| item.encode().map_err(|e| e.in_field(&index.to_string())))
            .collect::<MapperResult<Vec<_>>>()
            .map(Bson::Array)
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        match raw {
            Bson::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| U::decode(item).map_err(|e| e.in_field(&index.to_string())))
                .collect(),
            other => Err(MapperError::type_mismatch("array", kind_name(other))),
        }
    }
}

fn encode_entries<'a, U: Codec + 'a>(
    entries: impl Iterator<Item = (&'a String, &'a U)>,
) -> MapperResult<Bson> {
    let mut document = Document::new();

    for (key, value) in entries {
        document.insert(key.clone(), value.encode().map_err(|e| e.in_field(key))?);
    }

    Ok(Bson::Document(document))
}

fn decode_entries<U: Codec, M: FromIterator<(String, U)>>(raw: &Bson) -> MapperResult<M> {
    match raw {
        Bson::Document(document) => document
            .iter()
            .map(|(key, value)| {
                U::decode(value)
                    .map(|decoded| (key.clone(), decoded))
                    .map_err(|e| e.in_field(key))
            })
            .collect(),
        other => Err(MapperError::type_mismatch("object", kind_name(other))),
    }
}

impl<U: Codec> Codec for BTreeMap<String, U> {
    fn encode(&self) -> MapperResult<Bson> {
        encode_entries(self.iter())
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        decode_entries(raw)
    }
}

impl<U: Codec> Codec for HashMap<String, U> {
    fn encode(&self) -> MapperResult<Bson> {
        encode_entries(self.iter())
    }

    fn decode(raw: &Bson) -> MapperResult<Self> {
        decode_entries(raw)
    }
}

/// The encode/decode strategy held by a mapper entry for a component of type `U`.
///
/// Coders are cloned along with the mapper that owns them, so they must be cheap
/// value types or own their state outright.
pub trait Coder<U>: Clone + Send + Sync + 'static {
    /// Encodes a component value.
    fn encode(&self, value: &U) -> MapperResult<Bson>;

    /// Decodes a component value from its document element.
    fn decode(&self, raw: &Bson) -> MapperResult<U>;
}

/// Coder for any component implementing [`Codec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCoder;

impl<U: Codec> Coder<U> for ValueCoder {
    fn encode(&self, value: &U) -> MapperResult<Bson> {
        value.encode()
    }

    fn decode(&self, raw: &Bson) -> MapperResult<U> {
        U::decode(raw)
    }
}

/// Coder for a single nested sub-object described by its own [`Mapper`].
pub struct NestedCoder<U> {
    mapper: Mapper<U>,
}

impl<U> Clone for NestedCoder<U> {
    fn clone(&self) -> Self {
        Self { mapper: self.mapper.clone() }
    }
}

impl<U: 'static> NestedCoder<U> {
    /// Wraps the mapper describing the sub-object.
    pub fn new(mapper: Mapper<U>) -> Self {
        Self { mapper }
    }

    /// Returns the mapper describing the sub-object.
    pub fn mapper(&self) -> &Mapper<U> {
        &self.mapper
    }
}

impl<U> fmt::Debug for NestedCoder<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedCoder").field("mapper", &self.mapper).finish()
    }
}

impl<U: Default + 'static> Coder<U> for NestedCoder<U> {
    fn encode(&self, value: &U) -> MapperResult<Bson> {
        self.mapper.to_document(value).map(Bson::Document)
    }

    fn decode(&self, raw: &Bson) -> MapperResult<U> {
        match raw {
            Bson::Document(document) => self.mapper.from_document(document),
            other => Err(MapperError::type_mismatch("object", kind_name(other))),
        }
    }
}

/// Coder for an ordered sequence of mapped sub-objects.
///
/// Each element is encoded with the element mapper; decoding requires an array and
/// preserves element order.
pub struct SequenceCoder<U> {
    element: Mapper<U>,
}

impl<U> Clone for SequenceCoder<U> {
    fn clone(&self) -> Self {
        Self { element: self.element.clone() }
    }
}

impl<U: 'static> SequenceCoder<U> {
    /// Wraps the mapper describing each element.
    pub fn new(element: Mapper<U>) -> Self {
        Self { element }
    }
}

impl<U> fmt::Debug for SequenceCoder<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceCoder").field("element", &self.element).finish()
    }
}

impl<U: Default + 'static> Coder<Vec<U>> for SequenceCoder<U> {
    fn encode(&self, value: &Vec<U>) -> MapperResult<Bson> {
        value
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.element
                    .to_document(item)
                    .map(Bson::Document)
                    .map_err(|e| e.in_field(&index.to_string()))
            })
            .collect::<MapperResult<Vec<_>>>()
            .map(Bson::Array)
    }

    fn decode(&self, raw: &Bson) -> MapperResult<Vec<U>> {
        let items = match raw {
            Bson::Array(items) => items,
            other => return Err(MapperError::type_mismatch("array", kind_name(other))),
        };

        let mut decoded = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let element = match item {
                Bson::Document(document) => self.element.from_document(document),
                other => Err(MapperError::type_mismatch("object", kind_name(other))),
            };
            decoded.push(element.map_err(|e| e.in_field(&index.to_string()))?);
        }

        Ok(decoded)
    }
}

/// Coder routing a component through bson's serde bridge.
///
/// Useful for types that already derive `Serialize`/`Deserialize` and have no
/// dedicated [`Codec`]. The element kind is whatever serde produces, so the strict
/// kind check of [`Codec`] does not apply.
pub struct SerdeCoder<U> {
    _component: PhantomData<fn() -> U>,
}

impl<U> SerdeCoder<U> {
    /// Creates the coder. It carries no state, so every instance behaves the same.
    pub fn new() -> Self {
        Self { _component: PhantomData }
    }
}

impl<U> Default for SerdeCoder<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Clone for SerdeCoder<U> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<U> fmt::Debug for SerdeCoder<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerdeCoder")
    }
}

impl<U: Serialize + DeserializeOwned + 'static> Coder<U> for SerdeCoder<U> {
    fn encode(&self, value: &U) -> MapperResult<Bson> {
        Ok(serialize_to_bson(value)?)
    }

    fn decode(&self, raw: &Bson) -> MapperResult<U> {
        Ok(deserialize_from_bson(raw.clone())?)
    }
}
