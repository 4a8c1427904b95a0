//! Mapped types and textual rendering of documents.
//!
//! [`Mapped`] lets a type carry its own [`Mapper`], usually through
//! `#[derive(Mapped)]`. [`DocumentJson`] renders documents, filters and updates as
//! compact JSON text with field order preserved, which is what test fixtures compare
//! against.

use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

use crate::{error::MapperResult, mapper::Mapper};

/// A type that knows how it maps to a document.
///
/// # Example
///
/// ```ignore
/// use docmapper::prelude::*;
///
/// #[derive(Debug, Default, Clone, Mapped)]
/// pub struct Person {
///     #[mapped(rename = "_id")]
///     pub id: i32,
///     pub first_name: String,
/// }
///
/// let table = Table::<Person>::of("people");
/// ```
pub trait Mapped: Default + Send + Sync + 'static {
    /// Builds the mapper describing `Self`.
    fn mapper() -> Mapper<Self>;
}

/// Encoding helpers for every [`Mapped`] type.
///
/// Each call builds a fresh mapper; hold on to a [`Mapper`] (or a
/// [`Table`](crate::table::Table)) when encoding in a loop.
pub trait MappedExt: Mapped {
    /// Encodes this value with its own mapper.
    fn to_document(&self) -> MapperResult<Document>;

    /// Decodes a value with its own mapper.
    fn from_document(document: &Document) -> MapperResult<Self>;

    /// Encodes this value and renders it as compact JSON text.
    fn to_json(&self) -> MapperResult<String>;
}

impl<M: Mapped> MappedExt for M {
    fn to_document(&self) -> MapperResult<Document> {
        M::mapper().to_document(self)
    }

    fn from_document(document: &Document) -> MapperResult<Self> {
        M::mapper().from_document(document)
    }

    fn to_json(&self) -> MapperResult<String> {
        M::mapper().to_json(self)
    }
}

/// Renders BSON as JSON.
///
/// Integers render unsuffixed, doubles always with a decimal point in the mantissa
/// (`210.0`, `1.0e21`), booleans as `true`/`false`, strings quoted. Object ids and
/// datetimes use the extended JSON `$oid`/`$date` wrappers; kinds with no JSON
/// counterpart render as their display text.
///
/// [`DocumentJson::to_json_string`] is the canonical text. [`DocumentJson::to_json_value`]
/// goes through `serde_json` numbers, which drop the decimal point of exponent-form doubles.
pub trait DocumentJson {
    /// Converts to a `serde_json` value.
    fn to_json_value(&self) -> Value;

    /// Appends the compact JSON text to `out`.
    fn write_json(&self, out: &mut String);

    /// Renders compact JSON text.
    fn to_json_string(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }
}

/// Formats a double so the mantissa always carries a decimal point.
///
/// Non-finite values have no JSON number form and render as quoted text.
fn format_double(value: f64) -> String {
    if !value.is_finite() {
        return Value::String(value.to_string()).to_string();
    }

    let text = format!("{value:?}");

    match text.split_once('e') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => format!("{mantissa}.0e{exponent}"),
        _ => text,
    }
}

impl DocumentJson for Bson {
    fn to_json_value(&self) -> Value {
        match self {
            Bson::Null => Value::Null,
            Bson::Boolean(value) => Value::Bool(*value),
            Bson::Int32(value) => Value::from(*value),
            Bson::Int64(value) => Value::from(*value),
            Bson::Double(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(value.to_string())),
            Bson::String(value) => Value::String(value.clone()),
            Bson::Array(items) => Value::Array(items.iter().map(DocumentJson::to_json_value).collect()),
            Bson::Document(document) => document.to_json_value(),
            Bson::ObjectId(id) => {
                let mut wrapper = Map::new();
                wrapper.insert("$oid".to_string(), Value::String(id.to_hex()));
                Value::Object(wrapper)
            },
            Bson::DateTime(value) => {
                let mut wrapper = Map::new();
                wrapper.insert("$date".to_string(), Value::from(value.timestamp_millis()));
                Value::Object(wrapper)
            },
            other => Value::String(other.to_string()),
        }
    }

    fn write_json(&self, out: &mut String) {
        match self {
            Bson::Double(value) => out.push_str(&format_double(*value)),
            Bson::Array(items) => {
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            },
            Bson::Document(document) => document.write_json(out),
            other => out.push_str(&other.to_json_value().to_string()),
        }
    }
}

impl DocumentJson for Document {
    fn to_json_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, value)| (key.clone(), value.to_json_value()))
                .collect::<Map<String, Value>>()
        )
    }

    fn write_json(&self, out: &mut String) {
        out.push('{');
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            out.push_str(&Value::String(key.clone()).to_string());
            out.push(':');
            value.write_json(out);
        }
        out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn renders_scalars_canonically() {
        let document = doc! {
            "name": "Jack",
            "age": 28,
            "long": 42424242i64,
            "alive": true,
            "weight": 210.0,
            "nothing": Bson::Null,
        };

        assert_eq!(
            document.to_json_string(),
            r#"{"name":"Jack","age":28,"long":42424242,"alive":true,"weight":210.0,"nothing":null}"#,
        );
    }

    #[test]
    fn preserves_insertion_order() {
        let document = doc! { "z": 1, "a": 2, "m": { "y": 1, "b": [1, 2] } };

        assert_eq!(document.to_json_string(), r#"{"z":1,"a":2,"m":{"y":1,"b":[1,2]}}"#);
    }

    #[test]
    fn exponent_form_doubles_keep_a_decimal_point() {
        let document = doc! { "w": 1e21f64, "s": 1e-7f64, "n": -2.5e-9f64, "big": 1.5e300f64 };

        assert_eq!(document.to_json_string(), r#"{"w":1.0e21,"s":1.0e-7,"n":-2.5e-9,"big":1.5e300}"#);
    }

    #[test]
    fn doubles_inside_arrays_and_non_finite_values() {
        let document = doc! { "xs": [1.0, 0.5, 1e16f64], "nan": f64::NAN, "escaped": "a\"b" };

        assert_eq!(document.to_json_string(), r#"{"xs":[1.0,0.5,1.0e16],"nan":"NaN","escaped":"a\"b"}"#);
    }
}
