//! In-memory session for docmapper.
//!
//! This crate provides a thread-safe, in-memory implementation of the `Session` trait.
//! It evaluates the filter, sort and update documents the mapper renders, using
//! async-aware read-write locks for concurrent access. It is meant for development,
//! testing and small embedded setups.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Filter evaluation** - Equality and `$eq`, `$ne`, `$lt`, `$lte`, `$gt`, `$gte`, `$in`, `$nin`, `$exists`
//! - **Updates** - `$set`, `$unset`, `$inc`, `$setOnInsert`, with upserts
//! - **Sorting and pagination** - One sort field, skip and limit
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
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = MemorySession::builder().build().await?;
//!     let people = Table::<Person>::of("people");
//!
//!     session
//!         .inserter(&people)
//!         .insert(&Person { id: 1, first_name: "Jack".into(), age: 28 })
//!         .await?;
//!
//!     let jack = session.query(&people).first().await?;
//!     assert_eq!(jack.age, 28);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

#[allow(unused_extern_crates)]
extern crate self as docmapper_memory;

pub mod evaluator;
pub mod modifier;
pub mod session;

pub use session::{MemoryCursor, MemorySession, MemorySessionBuilder};
