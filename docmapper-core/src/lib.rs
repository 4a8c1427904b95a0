//! The mapping engine behind `docmapper`.
//!
//! This crate turns statically typed values into BSON documents and back, and builds
//! type-checked filters, updates and queries against the declared schema:
//!
//! - **Codecs** ([`codec`]) - per-type encode/decode, selected by the static field type
//! - **Accessors** ([`accessor`]) - direct members and getter/setter properties, with lookup identity
//! - **Mapper** ([`mapper`]) - the per-type schema registry
//! - **Fields** ([`field`]) - typed handles producing [`filter`] and [`update`] fragments
//! - **Tables** ([`table`]) - a mapper bound to a collection name
//! - **Queries** ([`query`]) - immutable query builder and typed result cursor
//! - **Sessions** ([`session`], [`inserter`]) - the boundary to a document store
//! - **Error handling** ([`error`]) - error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmapper_core::{mapper::Mapper, member};
//!
//! #[derive(Debug, Default, Clone)]
//! pub struct Person {
//!     pub first_name: String,
//!     pub age: i32,
//! }
//!
//! let mut mapper = Mapper::new();
//! mapper
//!     .add_field("first_name", member!(Person, first_name))
//!     .add_field("age", member!(Person, age));
//!
//! let older = mapper.field(&member!(Person, age))?.gt(25)?;
//! ```

#![warn(missing_docs)]

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod accessor;
pub mod codec;
pub mod document;
pub mod error;
pub mod field;
pub mod filter;
pub mod inserter;
pub mod mapper;
pub mod query;
pub mod session;
pub mod table;
pub mod update;
