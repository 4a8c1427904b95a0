//! Convenient re-exports of commonly used types from docmapper.
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```
//!
//! This provides access to:
//! - Mappers, tables and accessors, with the `member!`/`property!` macros
//! - Fields, filters and updates
//! - Queries, sessions and the in-memory session
//! - Error types

pub use docmapper_core::{
    accessor::{Accessor, Member, Property},
    codec::{Codec, Coder},
    document::{DocumentJson, Mapped, MappedExt},
    error::{MapperError, MapperResult},
    field::Field,
    filter::Filter,
    inserter::Inserter,
    mapper::Mapper,
    member, property,
    query::{Query, QueryResult, Sort, SortDirection},
    session::{Cursor, Session, SessionBuilder, SessionExt},
    table::Table,
    update::Update,
};
pub use docmapper_macros::Mapped;

pub use crate::memory::MemorySession;
