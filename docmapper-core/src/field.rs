//! Typed handles to mapped fields.
//!
//! A [`Field<T, U>`] names one field of a `Mapper<T>` whose component type is `U`.
//! Fields can only be obtained from [`Mapper::field`] or
//! [`Table::field`](crate::table::Table::field), which is what protects filters and
//! updates against name and type typos.
//!
//! Values handed to a field are encoded with the coder the field was registered with,
//! so filters and updates carry the same representation the mapper stores.

use std::fmt;

use bson::Bson;

use crate::{
    codec::Numeric,
    error::MapperResult,
    filter::{ComparisonOp, Filter},
    mapper::{ErasedCoder, Mapper},
    update::Update,
};

/// A named, typed handle into the schema of a `Mapper<T>`.
pub struct Field<'m, T, U> {
    mapper: &'m Mapper<T>,
    name: &'m str,
    coder: &'m dyn ErasedCoder<U>,
}

impl<'m, T, U> Field<'m, T, U> {
    pub(crate) fn new(mapper: &'m Mapper<T>, name: &'m str, coder: &'m dyn ErasedCoder<U>) -> Self {
        Self { mapper, name, coder }
    }

    /// The mapper this field was looked up in.
    pub fn mapper(&self) -> &'m Mapper<T> {
        self.mapper
    }

    /// The document field name.
    pub fn name(&self) -> &'m str {
        self.name
    }
}

impl<T, U> Clone for Field<'_, T, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, U> Copy for Field<'_, T, U> {}

impl<T, U> fmt::Debug for Field<'_, T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

impl<T, U> Field<'_, T, U> {
    fn encode(&self, value: impl Into<U>) -> MapperResult<Bson> {
        self.coder
            .encode_value(&value.into())
            .map_err(|e| e.in_field(self.name))
    }

    fn compare(&self, op: ComparisonOp, value: impl Into<U>) -> MapperResult<Filter> {
        Ok(Filter::comparison(self.name, op, self.encode(value)?))
    }

    /// Matches documents whose field equals `value`.
    pub fn eq(&self, value: impl Into<U>) -> MapperResult<Filter> {
        Ok(Filter::equality(self.name, self.encode(value)?))
    }

    /// Matches documents whose field differs from `value` (`$ne`).
    pub fn ne(&self, value: impl Into<U>) -> MapperResult<Filter> {
        self.compare(ComparisonOp::Ne, value)
    }

    /// `$lt`
    pub fn lt(&self, value: impl Into<U>) -> MapperResult<Filter> {
        self.compare(ComparisonOp::Lt, value)
    }

    /// `$gt`
    pub fn gt(&self, value: impl Into<U>) -> MapperResult<Filter> {
        self.compare(ComparisonOp::Gt, value)
    }

    /// `$lte`
    pub fn lte(&self, value: impl Into<U>) -> MapperResult<Filter> {
        self.compare(ComparisonOp::Lte, value)
    }

    /// `$gte`
    pub fn gte(&self, value: impl Into<U>) -> MapperResult<Filter> {
        self.compare(ComparisonOp::Gte, value)
    }

    /// Assigns `value` to the field (`$set`).
    pub fn set(&self, value: impl Into<U>) -> MapperResult<Update> {
        Ok(Update::operation("$set", self.name, self.encode(value)?))
    }
}

impl<T, U: Numeric> Field<'_, T, U> {
    /// Adds `value` to the field (`$inc`).
    pub fn inc(&self, value: impl Into<U>) -> MapperResult<Update> {
        Ok(Update::operation("$inc", self.name, self.encode(value)?))
    }
}
