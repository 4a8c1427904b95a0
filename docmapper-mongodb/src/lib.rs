//! MongoDB session for docmapper.
//!
//! This crate provides a MongoDB-based implementation of the `Session` trait. Filter,
//! sort and update documents rendered by the mapper are handed to the official async
//! driver unchanged, so the server's query engine evaluates them.
//!
//! To use this session, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmapper = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A MongoDB connection string and a database name are given to the builder. Parse
//! and client construction failures surface as `MapperError::Initialization`.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::{prelude::*, mongodb::MongoSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = MongoSession::builder("mongodb://localhost:27017", "my_database")
//!         .app_name("my-service")
//!         .build()
//!         .await?;
//!
//!     let people = Table::<Person>::of("people");
//!     let everyone = session.query(&people).all().await?;
//!
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

#[allow(unused_extern_crates)]
extern crate self as docmapper_mongodb;

pub mod session;

pub use session::{MongoCursor, MongoSession, MongoSessionBuilder};
