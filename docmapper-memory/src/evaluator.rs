//! Filter document evaluation for in-memory sessions.
//!
//! Supports the subset of the query language the mapper produces plus a few common
//! operators: plain equality, `$eq`, `$ne`, `$lt`, `$lte`, `$gt`, `$gte`, `$in`, `$nin`
//! and `$exists`. Field names may be dotted paths into sub-documents.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, DateTime, Document, oid::ObjectId};

use docmapper_core::error::{MapperError, MapperResult};

/// Type-erased, comparable view of a BSON value.
///
/// Numbers of every width compare with each other, the way the server does.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null and undefined; also what a missing field compares as.
    Null,
    /// Int32, Int64 and Double, widened.
    Number(f64),
    /// UTF-8 string, ordered bytewise.
    String(&'a str),
    /// Embedded document; key order is ignored.
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Array, compared element by element.
    Array(Vec<Comparable<'a>>),
    /// Binary payload, ignoring the subtype.
    Binary(&'a [u8]),
    /// Object id, ordered by its bytes.
    ObjectId(ObjectId),
    /// Boolean.
    Bool(bool),
    /// UTC datetime, ordered by milliseconds.
    DateTime(DateTime),
    /// Kinds with no ordering; equal only to an identical value.
    Opaque(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Opaque(other),
        }
    }
}

impl Comparable<'_> {
    /// Position of the kind in the cross-kind sort order.
    fn bracket(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Binary(_) => 5,
            Comparable::ObjectId(_) => 6,
            Comparable::Bool(_) => 7,
            Comparable::DateTime(_) => 8,
            Comparable::Opaque(_) => 9,
        }
    }

    /// Total order used for sorting: kinds first, then values within a kind.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.bracket()
            .cmp(&other.bracket())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Opaque(a), Comparable::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Whether `filter` carries operators rather than a literal sub-document.
pub(crate) fn is_operator_object(filter: &Bson) -> bool {
    match filter {
        Bson::Document(inner) => inner
            .keys()
            .next()
            .is_some_and(|key| key.starts_with('$')),
        _ => false,
    }
}

/// Checks one document against a filter document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    /// Wraps `document` for evaluation.
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Whether the document satisfies every condition of `filter`.
    pub fn matches(&self, filter: &Document) -> MapperResult<bool> {
        for (field, condition) in filter {
            if field.starts_with('$') {
                return Err(MapperError::Transport(format!("unknown top level operator: {field}")));
            }

            let value = lookup(self.document, field);

            let holds = match condition {
                Bson::Document(operators) if is_operator_object(condition) => {
                    self.all_operators_hold(value, operators)?
                },
                expected => equals(value, expected),
            };

            if !holds {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn all_operators_hold(&self, value: Option<&Bson>, operators: &Document) -> MapperResult<bool> {
        for (op, operand) in operators {
            if !evaluate_operator(value, op, operand)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Clones the documents that match `filter`, keeping their order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> MapperResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }
}

/// Equality with the server's conventions: a missing field equals `null`, and an
/// array field equals any of its elements.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    let expected = Comparable::from(expected);

    match value {
        None => expected == Comparable::Null,
        Some(Bson::Array(items)) if !matches!(expected, Comparable::Array(_)) => items
            .iter()
            .any(|item| Comparable::from(item) == expected),
        Some(value) => Comparable::from(value) == expected,
    }
}

fn compare(value: Option<&Bson>, operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);

    let holds = |candidate: &Bson| {
        Comparable::from(candidate)
            .partial_cmp(&operand)
            .is_some_and(accept)
    };

    match value {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(holds),
        Some(value) => holds(value),
    }
}

fn operand_array<'b>(op: &str, operand: &'b Bson) -> MapperResult<&'b Vec<Bson>> {
    operand
        .as_array()
        .ok_or_else(|| MapperError::Transport(format!("{op} needs an array")))
}

fn evaluate_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> MapperResult<bool> {
    Ok(match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" => compare(value, operand, |ordering| ordering == Ordering::Greater),
        "$gte" => compare(value, operand, |ordering| ordering != Ordering::Less),
        "$lt" => compare(value, operand, |ordering| ordering == Ordering::Less),
        "$lte" => compare(value, operand, |ordering| ordering != Ordering::Greater),
        "$in" => operand_array(op, operand)?
            .iter()
            .any(|candidate| equals(value, candidate)),
        "$nin" => !operand_array(op, operand)?
            .iter()
            .any(|candidate| equals(value, candidate)),
        "$exists" => {
            let should_exist = match operand {
                Bson::Boolean(flag) => *flag,
                Bson::Int32(n) => *n != 0,
                Bson::Int64(n) => *n != 0,
                Bson::Double(n) => *n != 0.0,
                _ => true,
            };
            value.is_some() == should_exist
        },
        unknown => return Err(MapperError::Transport(format!("unknown operator: {unknown}"))),
    })
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn jack() -> Document {
        doc! {
            "first_name": "Jack",
            "age": 28,
            "weight": 210.5,
            "tags": ["a", "b"],
            "address": { "city": "Oslo" },
        }
    }

    fn matches(filter: Document) -> bool {
        DocumentEvaluator::new(&jack()).matches(&filter).unwrap()
    }

    #[test]
    fn equality() {
        assert!(matches(doc! { "first_name": "Jack" }));
        assert!(!matches(doc! { "first_name": "John" }));
        assert!(matches(doc! { "first_name": "Jack", "age": 28 }));
        assert!(matches(doc! {}));
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert!(matches(doc! { "age": 28i64 }));
        assert!(matches(doc! { "age": 28.0 }));
        assert!(matches(doc! { "weight": { "$gt": 210 } }));
    }

    #[test]
    fn comparisons_require_matching_kinds() {
        assert!(matches(doc! { "age": { "$gt": 25, "$lt": 30 } }));
        assert!(!matches(doc! { "age": { "$gt": 28 } }));
        assert!(matches(doc! { "age": { "$gte": 28, "$lte": 28 } }));
        assert!(!matches(doc! { "age": { "$gt": "27" } }));
        assert!(matches(doc! { "first_name": { "$lt": "John" } }));
    }

    #[test]
    fn missing_fields() {
        assert!(!matches(doc! { "height": { "$gt": 1 } }));
        assert!(matches(doc! { "height": Bson::Null }));
        assert!(matches(doc! { "height": { "$exists": false } }));
        assert!(matches(doc! { "age": { "$exists": true } }));
        assert!(matches(doc! { "height": { "$ne": 3 } }));
    }

    #[test]
    fn membership_and_arrays() {
        assert!(matches(doc! { "age": { "$in": [27, 28] } }));
        assert!(matches(doc! { "age": { "$nin": [1, 2] } }));
        assert!(matches(doc! { "tags": "b" }));
        assert!(matches(doc! { "tags": ["a", "b"] }));
        assert!(!matches(doc! { "tags": "c" }));
    }

    #[test]
    fn dotted_paths_reach_into_sub_documents() {
        assert!(matches(doc! { "address.city": "Oslo" }));
        assert!(matches(doc! { "tags.1": "b" }));
        assert!(!matches(doc! { "address.zip": { "$exists": true } }));
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let result = DocumentEvaluator::new(&jack()).matches(&doc! { "age": { "$regex": "2" } });
        assert!(matches!(result, Err(MapperError::Transport(_))));

        let result = DocumentEvaluator::new(&jack()).matches(&doc! { "$where": "true" });
        assert!(matches!(result, Err(MapperError::Transport(_))));

        let result = DocumentEvaluator::new(&jack()).matches(&doc! { "age": { "$in": 3 } });
        assert!(matches!(result, Err(MapperError::Transport(_))));
    }

    #[test]
    fn sort_order_brackets_kinds() {
        let null = Bson::Null;
        let one = Bson::Int32(1);
        let two = Bson::Double(2.0);
        let text = Bson::String("a".into());

        assert_eq!(Comparable::from(&null).sort_cmp(&Comparable::from(&one)), Ordering::Less);
        assert_eq!(Comparable::from(&two).sort_cmp(&Comparable::from(&one)), Ordering::Greater);
        assert_eq!(Comparable::from(&text).sort_cmp(&Comparable::from(&two)), Ordering::Greater);
    }
}
