//! Error types and result types for mapping and query operations.
//!
//! Every fallible operation in this crate returns [`MapperResult<T>`]. The variants of
//! [`MapperError`] fall into three groups callers usually treat differently:
//!
//! - programmer errors: [`MapperError::UnmappedMember`], [`MapperError::ConflictingFilter`]
//! - schema drift: [`MapperError::MissingField`], [`MapperError::TypeMismatch`],
//!   [`MapperError::ValueOutOfRange`]
//! - absence: [`MapperError::EmptyResult`]
//!
//! Transport failures are surfaced verbatim as [`MapperError::Transport`].

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors raised by the mapping engine and its sessions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    /// A registered field is absent from the document being decoded.
    #[error("Field '{field}' is not in the document")]
    MissingField {
        /// Dotted path of the missing field.
        field: String,
    },
    /// A document element does not carry the statically expected kind.
    #[error("Field '{field}' is not of {expected} type (found {found})")]
    TypeMismatch {
        /// Dotted path of the offending field. Empty when raised outside a mapper.
        field: String,
        /// The kind the codec expected.
        expected: &'static str,
        /// The kind actually found in the document.
        found: &'static str,
    },
    /// A value cannot be represented by the target type or wire kind.
    #[error("Field '{field}' value {value} does not fit in {target}")]
    ValueOutOfRange {
        /// Dotted path of the offending field. Empty when raised outside a mapper.
        field: String,
        /// The rejected value, rendered as text.
        value: String,
        /// The type or wire kind that cannot hold it.
        target: &'static str,
    },
    /// No entry of the mapper matches the requested accessor.
    #[error("Attempted to lookup an unmapped member: {0}")]
    UnmappedMember(String),
    /// Two filter fragments constrain the same field incompatibly.
    #[error("Conflicting filters on field '{field}': {reason}")]
    ConflictingFilter {
        /// The field both fragments constrain.
        field: String,
        /// Why the constraints cannot be merged.
        reason: String,
    },
    /// A terminal operation needed at least one document and found none.
    #[error("Empty result: {0}")]
    EmptyResult(String),
    /// The session failed to carry out a request.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Conversion through the serde bridge failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A session could not be constructed.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl MapperError {
    /// Creates a type mismatch error not yet attributed to a field.
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        MapperError::TypeMismatch { field: String::new(), expected, found }
    }

    /// Creates an out-of-range error not yet attributed to a field.
    pub fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        MapperError::ValueOutOfRange { field: String::new(), value: value.to_string(), target }
    }

    /// Prefixes the field path of a decode/encode error with `segment`.
    ///
    /// Errors raised by nested codecs bubble up through every enclosing entry,
    /// so the final path reads outermost first (`children.1.name`).
    pub fn in_field(self, segment: &str) -> Self {
        fn join(segment: &str, rest: String) -> String {
            if rest.is_empty() {
                segment.to_string()
            } else {
                format!("{segment}.{rest}")
            }
        }

        match self {
            MapperError::MissingField { field } => MapperError::MissingField { field: join(segment, field) },
            MapperError::TypeMismatch { field, expected, found } => MapperError::TypeMismatch {
                field: join(segment, field),
                expected,
                found,
            },
            MapperError::ValueOutOfRange { field, value, target } => MapperError::ValueOutOfRange {
                field: join(segment, field),
                value,
                target,
            },
            other => other,
        }
    }

    /// Returns `true` for [`MapperError::EmptyResult`].
    pub fn is_empty_result(&self) -> bool {
        matches!(self, MapperError::EmptyResult(_))
    }
}

/// A specialized `Result` type for mapping and query operations.
pub type MapperResult<T> = Result<T, MapperError>;

impl From<BsonError> for MapperError {
    fn from(err: BsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}
