//! Composable update specifications.
//!
//! An [`Update`] groups field assignments by operator, e.g.
//! `{"$set": {"first_name": "Sal"}, "$inc": {"age": 1}}`. Fragments are built through
//! [`Field::set`](crate::field::Field::set) and [`Field::inc`](crate::field::Field::inc)
//! and merged with [`Update::and`], [`Update::all`] or `&`.
//!
//! Operators and fields keep first-seen order. When both sides assign the same field
//! under the same operator the right-hand value wins. The same field under two
//! different operators is passed through untouched; the store decides.

use std::ops::BitAnd;

use bson::{Bson, Document};

/// A composable update specification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operations: Vec<(String, Document)>,
}

impl Update {
    /// Creates the empty update.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn operation(op: &str, field: &str, value: Bson) -> Self {
        let mut fields = Document::new();
        fields.insert(field, value);

        Self::from_operation(op, fields)
    }

    pub(crate) fn from_operation(op: &str, fields: Document) -> Self {
        if fields.is_empty() {
            return Self::new();
        }

        Self { operations: vec![(op.to_string(), fields)] }
    }

    /// Merges two fragments; later assignments to the same field win.
    pub fn and(self, other: Update) -> Update {
        let mut operations = self.operations;

        for (op, fields) in other.operations {
            match operations.iter_mut().find(|(existing, _)| *existing == op) {
                Some((_, existing)) => {
                    for (field, value) in fields {
                        existing.insert(field, value);
                    }
                },
                None => operations.push((op, fields)),
            }
        }

        Update { operations }
    }

    /// Merges a sequence of fragments, left to right.
    pub fn all(updates: impl IntoIterator<Item = Update>) -> Update {
        updates.into_iter().fold(Update::new(), Update::and)
    }

    /// The fields assigned under `op`, if any.
    pub fn operator(&self, op: &str) -> Option<&Document> {
        self.operations
            .iter()
            .find(|(name, _)| name == op)
            .map(|(_, fields)| fields)
    }

    /// Whether no operation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Renders the update as an update document.
    pub fn to_document(&self) -> Document {
        self.operations
            .iter()
            .map(|(op, fields)| (op.clone(), Bson::Document(fields.clone())))
            .collect()
    }
}

impl BitAnd for Update {
    type Output = Update;

    fn bitand(self, rhs: Update) -> Update {
        self.and(rhs)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::document::DocumentJson;

    fn set(field: &str, value: impl Into<Bson>) -> Update {
        Update::operation("$set", field, value.into())
    }

    fn inc(field: &str, value: impl Into<Bson>) -> Update {
        Update::operation("$inc", field, value.into())
    }

    #[test]
    fn fields_group_under_their_operator() {
        let update = set("first_name", "Sal") & inc("age", 1) & set("alive", false);

        assert_eq!(
            update.to_document().to_json_string(),
            r#"{"$set":{"first_name":"Sal","alive":false},"$inc":{"age":1}}"#,
        );
    }

    #[test]
    fn later_assignment_wins() {
        let update = Update::all([set("age", 28), set("age", 30)]);

        assert_eq!(update.to_document(), doc! { "$set": { "age": 30 } });
    }

    #[test]
    fn cross_operator_assignments_pass_through() {
        let update = set("age", 28).and(inc("age", 1));

        assert_eq!(update.to_document(), doc! { "$set": { "age": 28 }, "$inc": { "age": 1 } });
    }

    #[test]
    fn empty_operations_vanish() {
        assert!(Update::from_operation("$set", Document::new()).is_empty());
        assert_eq!(Update::new().and(set("age", 1)), set("age", 1));
        assert_eq!(Update::all([]).to_document(), doc! {});
    }

    #[test]
    fn operator_lookup() {
        let update = set("age", 28) & inc("visits", 2i64);

        assert_eq!(update.operator("$inc"), Some(&doc! { "visits": 2i64 }));
        assert_eq!(update.operator("$unset"), None);
    }
}
