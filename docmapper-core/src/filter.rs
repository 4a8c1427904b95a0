//! Composable query predicates.
//!
//! A [`Filter`] maps field names to a [`Condition`]: either a plain value (equality)
//! or an operator object such as `{"$gt": 25, "$lt": 30}`. Fragments are built one
//! field at a time through [`Field`](crate::field::Field) and merged with
//! [`Filter::and`] or [`Filter::all`].
//!
//! # Merge policy
//!
//! - distinct fields are simply collected, in first-seen order;
//! - two operator objects on the same field are unioned;
//! - the same operator given twice on one field must carry the same value;
//! - an equality on a field that the other side also constrains is a
//!   [`MapperError::ConflictingFilter`].
//!
//! Merging is associative and never mutates its inputs.

use bson::{Bson, Document};

use crate::error::{MapperError, MapperResult};

/// A comparison operator of an operator object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `$ne`
    Ne,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
}

impl ComparisonOp {
    /// The wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Ne => "$ne",
            ComparisonOp::Lt => "$lt",
            ComparisonOp::Lte => "$lte",
            ComparisonOp::Gt => "$gt",
            ComparisonOp::Gte => "$gte",
        }
    }
}

/// The constraint a filter places on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field must equal the value.
    Equals(Bson),
    /// Every operator of the object must hold.
    Operators(Document),
}

impl Condition {
    fn to_bson(&self) -> Bson {
        match self {
            Condition::Equals(value) => value.clone(),
            Condition::Operators(operators) => Bson::Document(operators.clone()),
        }
    }
}

/// A composable query predicate.
///
/// The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    /// Creates the empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn equality(field: &str, value: Bson) -> Self {
        Self { conditions: vec![(field.to_string(), Condition::Equals(value))] }
    }

    pub(crate) fn comparison(field: &str, op: ComparisonOp, value: Bson) -> Self {
        let mut operators = Document::new();
        operators.insert(op.as_str(), value);

        Self { conditions: vec![(field.to_string(), Condition::Operators(operators))] }
    }

    /// Merges two fragments into one.
    ///
    /// # Errors
    ///
    /// [`MapperError::ConflictingFilter`] when both sides constrain the same field and
    /// either uses equality, or both give the same operator different values.
    pub fn and(self, other: Filter) -> MapperResult<Filter> {
        let mut conditions = self.conditions;

        for (field, condition) in other.conditions {
            match conditions.iter_mut().find(|(existing, _)| *existing == field) {
                Some((_, existing)) => {
                    *existing = merge_conditions(&field, existing, condition)?;
                },
                None => conditions.push((field, condition)),
            }
        }

        Ok(Filter { conditions })
    }

    /// Merges a sequence of fragments, left to right.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> MapperResult<Filter> {
        filters
            .into_iter()
            .try_fold(Filter::new(), Filter::and)
    }

    /// The condition placed on `field`, if any.
    pub fn condition(&self, field: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, condition)| condition)
    }

    /// The constrained field names, in first-seen order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(name, _)| name.as_str())
    }

    /// Whether the filter matches every document.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of constrained fields.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Renders the filter as a query document.
    pub fn to_document(&self) -> Document {
        self.conditions
            .iter()
            .map(|(field, condition)| (field.clone(), condition.to_bson()))
            .collect()
    }
}

fn merge_conditions(field: &str, left: &Condition, right: Condition) -> MapperResult<Condition> {
    let (left, right) = match (left, right) {
        (Condition::Operators(left), Condition::Operators(right)) => (left, right),
        _ => {
            return Err(MapperError::ConflictingFilter {
                field: field.to_string(),
                reason: "multiple equality filters applied to the same field".to_string(),
            });
        },
    };

    let mut merged = left.clone();

    for (op, value) in right {
        match merged.get(&op) {
            Some(existing) if *existing == value => {},
            Some(existing) => {
                return Err(MapperError::ConflictingFilter {
                    field: field.to_string(),
                    reason: format!("{op} given both {existing} and {value}"),
                });
            },
            None => {
                merged.insert(op, value);
            },
        }
    }

    Ok(Condition::Operators(merged))
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::document::DocumentJson;

    fn age_gt(value: i32) -> Filter {
        Filter::comparison("age", ComparisonOp::Gt, Bson::Int32(value))
    }

    fn age_lt(value: i32) -> Filter {
        Filter::comparison("age", ComparisonOp::Lt, Bson::Int32(value))
    }

    fn name_is(value: &str) -> Filter {
        Filter::equality("first_name", Bson::String(value.into()))
    }

    #[test]
    fn operator_objects_on_one_field_are_unioned() {
        let merged = age_gt(25).and(age_lt(30)).unwrap();

        assert_eq!(merged.to_document().to_json_string(), r#"{"age":{"$gt":25,"$lt":30}}"#);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn two_equalities_conflict() {
        let result = name_is("Jack").and(name_is("John"));

        assert!(matches!(
            result,
            Err(MapperError::ConflictingFilter { field, .. }) if field == "first_name"
        ));
    }

    #[test]
    fn equality_and_operator_conflict() {
        let equal = Filter::equality("age", Bson::Int32(26));

        assert!(equal.clone().and(age_gt(25)).is_err());
        assert!(age_gt(25).and(equal).is_err());
    }

    #[test]
    fn repeated_operator_must_agree() {
        assert!(age_gt(25).and(age_gt(25)).is_ok());
        assert!(age_gt(25).and(age_gt(26)).is_err());
    }

    #[test]
    fn distinct_fields_keep_first_seen_order() {
        let merged = Filter::all([name_is("Jack"), age_gt(25), age_lt(30)]).unwrap();

        assert_eq!(
            merged.to_document(),
            doc! { "first_name": "Jack", "age": { "$gt": 25, "$lt": 30 } },
        );
        assert_eq!(merged.fields().collect::<Vec<_>>(), vec!["first_name", "age"]);
    }

    #[test]
    fn merge_is_associative() {
        let left = name_is("Jack").and(age_gt(25)).unwrap().and(age_lt(30)).unwrap();
        let right = name_is("Jack").and(age_gt(25).and(age_lt(30)).unwrap()).unwrap();

        assert_eq!(left, right);
    }

    #[test]
    fn merge_leaves_inputs_alone() {
        let base = age_gt(25);
        let _ = base.clone().and(age_lt(30)).unwrap();

        assert_eq!(base.to_document(), doc! { "age": { "$gt": 25 } });
    }

    #[test]
    fn empty_filter_is_the_identity() {
        assert_eq!(Filter::new().and(age_gt(25)).unwrap(), age_gt(25));
        assert_eq!(Filter::all([]).unwrap().to_document(), doc! {});
    }
}
