//! Generic document form shared by every model in the crate.
//!
//! A [`Document`] is a JSON object. Wherever a reader could not otherwise tell which concrete type
//! wrote a document, it carries the writer's type name under [`METADATA_KEY`]:
//!
//! ```json
//! {"id": "1", "name": "home", "_metadata": {"cls": "AdUnit"}}
//! ```
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Nested mapping of string keys to primitives, sequences and nested documents.
pub type Document = Map<String, Value>;

/// Reserved key holding type metadata.
pub const METADATA_KEY: &str = "_metadata";

/// Key inside the metadata object that holds the type discriminator.
pub const CLASS_KEY: &str = "cls";

/// Key holding the serialized value of a model that is not itself a JSON object, such as a
/// newtype or a unit enum.
pub const VALUE_KEY: &str = "value";

/// Bidirectional mapping between a typed value and its [`Document`].
///
/// For any valid `x`, `R::from_doc(&x.to_doc())` must equal `x`.
pub trait Record: Sized {
    /// Discriminator written into this value's document.
    fn type_name(&self) -> &'static str;

    /// Serialize the full state of this value, recursively.
    fn to_doc(&self) -> Document;

    /// Rebuild a value from a document produced by [`Record::to_doc`].
    fn from_doc(doc: &Document) -> Result<Self>;

    /// Read a single attribute by name, as it appears in the document.
    fn field(&self, name: &str) -> Option<Value> {
        self.to_doc().remove(name)
    }
}

/// Serde-backed record with a fixed discriminator.
///
/// Fields missing from a document take their `Default` value, so models implementing this trait
/// should be `#[serde(default)]`. A model that does not serialize to a JSON object is stored under
/// [`VALUE_KEY`].
pub trait Model: Serialize + DeserializeOwned {
    /// Discriminator for every value of this type.
    const TYPE_NAME: &'static str;
}

impl<T: Model> Record for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn to_doc(&self) -> Document {
        let mut doc = match serde_json::to_value(self).expect("models always serialize to JSON") {
            Value::Object(doc) => doc,
            value => {
                let mut doc = Document::new();
                doc.insert(VALUE_KEY.to_owned(), value);
                doc
            }
        };
        tag(&mut doc, T::TYPE_NAME);
        doc
    }

    fn from_doc(doc: &Document) -> Result<Self> {
        expect_type(doc, T::TYPE_NAME)?;

        let mut fields = doc.clone();
        fields.remove(METADATA_KEY);
        let wrapped = (fields.len() == 1).then(|| fields.get(VALUE_KEY).cloned()).flatten();

        match serde_json::from_value(Value::Object(fields)) {
            Ok(model) => Ok(model),
            Err(err) => match wrapped {
                Some(value) => serde_json::from_value(value),
                None => Err(err),
            }
            .map_err(|err| Error::malformed(T::TYPE_NAME, err)),
        }
    }
}

/// Record `type_name` as the discriminator of `doc`.
pub fn tag(doc: &mut Document, type_name: &str) {
    let mut metadata = Map::new();
    metadata.insert(CLASS_KEY.to_owned(), Value::from(type_name));
    doc.insert(METADATA_KEY.to_owned(), Value::Object(metadata));
}

/// Discriminator stored in `doc`, if any.
pub fn discriminator(doc: &Document) -> Option<&str> {
    doc.get(METADATA_KEY)?.get(CLASS_KEY)?.as_str()
}

/// Fail unless `doc` is untagged or tagged with `expected`.
pub(crate) fn expect_type(doc: &Document, expected: &'static str) -> Result<()> {
    match discriminator(doc) {
        Some(found) if found != expected => Err(Error::UnexpectedType {
            expected,
            found: found.to_owned(),
        }),
        _ => Ok(()),
    }
}

/// Borrow `value` as a nested document.
pub(crate) fn as_doc<'a>(type_name: &'static str, value: &'a Value) -> Result<&'a Document> {
    value.as_object().ok_or_else(|| {
        Error::malformed(
            type_name,
            serde::de::Error::invalid_type(unexpected(value), &"a nested document"),
        )
    })
}

/// Borrow `value` as a sequence.
pub(crate) fn as_seq<'a>(type_name: &'static str, value: &'a Value) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        Error::malformed(
            type_name,
            serde::de::Error::invalid_type(unexpected(value), &"a sequence"),
        )
    })
}

fn unexpected(value: &Value) -> serde::de::Unexpected<'_> {
    use serde::de::Unexpected;
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}
