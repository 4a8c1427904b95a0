//! Typed object-document mapping for BSON document stores.
//!
//! This crate is the primary entry point of docmapper. It re-exports the mapping
//! engine from `docmapper-core`, the `Mapped` derive macro and the available sessions.
//!
//! # Features
//!
//! - **Declared once per type** - a [`Mapper`](mapper::Mapper) lists which members map to which document fields
//! - **Type-checked filters and updates** - built from [`Field`](field::Field) handles, so field names and value types cannot drift
//! - **Immutable queries** - derive many queries from one base without cloning by hand
//! - **Multiple sessions** - in-memory for tests and development, MongoDB behind the `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! #[derive(Debug, Default, Clone, Mapped)]
//! pub struct Person {
//!     #[mapped(rename = "_id")]
//!     pub id: i32,
//!     pub first_name: String,
//!     pub age: i32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MapperError> {
//!     let session = MemorySession::builder().build().await?;
//!     let people = Table::<Person>::of("people");
//!
//!     let inserter = session.inserter(&people);
//!     inserter.insert(&Person { id: 1, first_name: "Jack".into(), age: 28 }).await?;
//!     inserter.insert(&Person { id: 2, first_name: "Sal".into(), age: 31 }).await?;
//!
//!     let age = people.field(&member!(Person, age))?;
//!     let over_thirty = session.query(&people).filter(age.gt(30)?)?;
//!
//!     over_thirty.update(&age.inc(1)?).await?;
//!     assert_eq!(over_thirty.first().await?.age, 32);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Hand-written mappers
//!
//! Getter/setter pairs, nested objects and sequences can be registered explicitly:
//!
//! ```ignore
//! let mut mapper = Mapper::new();
//! mapper
//!     .add_field("first_name", property!(Person, ref first_name, set_first_name))
//!     .add_field("age", property!(Person, age, set_age))
//!     .add_sequence("children", member!(Person, children), Child::mapper());
//! ```
//!
//! # Sessions
//!
//! - [`memory`] - in-memory session for development and testing
//! - [`mongodb`] - MongoDB session (requires the `mongodb` feature)

#![warn(missing_docs)]

#[allow(unused_extern_crates)]
extern crate self as docmapper;

pub mod prelude;

pub use docmapper_core::{
    accessor, codec, document, error, field, filter, inserter, mapper, member, property, query, session, table,
    update,
};
pub use docmapper_macros::Mapped;

// Re-export BSON types for convenience
pub use bson;

/// In-memory session implementation.
pub mod memory {
    pub use docmapper_memory::{MemoryCursor, MemorySession, MemorySessionBuilder};
}

/// MongoDB session implementation.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmapper_mongodb::{MongoCursor, MongoSession, MongoSessionBuilder};
}
