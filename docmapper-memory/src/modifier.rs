//! Update document application for in-memory sessions.
//!
//! Supports `$set`, `$unset`, `$inc` and, on upsert inserts only, `$setOnInsert`.

use bson::{Bson, Document, oid::ObjectId};

use docmapper_core::error::{MapperError, MapperResult};

use crate::evaluator::is_operator_object;

const ID_FIELD: &str = "_id";

/// Whether the document being modified already existed or is being created by an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// A stored document matched the filter.
    Existing,
    /// No document matched; the upsert seeds a new one.
    Inserted,
}

/// Applies every operator of `update` to `document`.
///
/// Nothing is written when any operator fails.
pub(crate) fn apply(document: &mut Document, update: &Document, target: Target) -> MapperResult<()> {
    if update.is_empty() {
        return Err(MapperError::Transport("update document must not be empty".to_string()));
    }

    let mut scratch = document.clone();

    for (op, fields) in update {
        let fields = fields
            .as_document()
            .ok_or_else(|| MapperError::Transport(format!("{op} needs an object of fields")))?;

        for (path, value) in fields {
            if path == ID_FIELD && target == Target::Existing {
                return Err(MapperError::Transport(format!("{op} would modify the immutable field '_id'")));
            }

            match op.as_str() {
                "$set" => set_path(&mut scratch, path, value.clone())?,
                "$setOnInsert" => {
                    if target == Target::Inserted {
                        set_path(&mut scratch, path, value.clone())?;
                    }
                },
                "$unset" => unset_path(&mut scratch, path),
                "$inc" => {
                    let current = crate::evaluator::lookup(&scratch, path).cloned();
                    set_path(&mut scratch, path, increment(path, current, value)?)?;
                },
                unknown => return Err(MapperError::Transport(format!("unknown update operator: {unknown}"))),
            }
        }
    }

    *document = scratch;

    Ok(())
}

/// Builds the document an upsert inserts when nothing matched `filter`.
///
/// Equality conditions of the filter seed the document; `_id` comes first and is
/// generated when the filter does not pin it.
pub(crate) fn seed_from_filter(filter: &Document) -> MapperResult<Document> {
    let mut seeded = Document::new();
    seeded.insert(
        ID_FIELD,
        filter
            .get(ID_FIELD)
            .filter(|id| !is_operator_object(id))
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new())),
    );

    for (path, condition) in filter {
        if path == ID_FIELD || path.starts_with('$') || is_operator_object(condition) {
            continue;
        }

        set_path(&mut seeded, path, condition.clone())?;
    }

    Ok(seeded)
}

fn increment(path: &str, current: Option<Bson>, delta: &Bson) -> MapperResult<Bson> {
    let non_numeric = |kind: &str| MapperError::Transport(format!("cannot apply $inc to '{path}': {kind} is not numeric"));

    let current = match current {
        None => return numeric(delta).ok_or_else(|| non_numeric("increment")),
        Some(value) => value,
    };

    Ok(match (&current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or_else(|| Bson::Int64(*a as i64 + *b as i64)),
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(*a as i64 + b),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a + *b as i64),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(|| {
            MapperError::Transport(format!("$inc on '{path}' overflows int64"))
        })?),
        (left, right) => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => Bson::Double(a + b),
            (None, _) => return Err(non_numeric("field")),
            (_, None) => return Err(non_numeric("increment")),
        },
    })
}

fn numeric(value: &Bson) -> Option<Bson> {
    as_f64(value).map(|_| value.clone())
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> MapperResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        },
        Some((head, rest)) => {
            let inner = document
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));

            match inner {
                Bson::Document(inner) => set_path(inner, rest, value),
                other => Err(MapperError::Transport(format!(
                    "cannot create field '{rest}' in element {{{head}: {other}}}"
                ))),
            }
        },
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        },
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                unset_path(inner, rest);
            }
        },
    }
}
