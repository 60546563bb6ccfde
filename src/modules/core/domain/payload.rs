//! Classification of data handed to the document insert operation

use bson::{Bson, Document};
use serde_json::Value;

use crate::error::{ConnectorError, Result};

/// Shape of the data passed to a document insert.
///
/// External input is classified exactly once, at the boundary. Everything
/// downstream matches on the variant instead of inspecting types again.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertPayload {
    /// A single mapping
    Record(Document),
    /// A sequence in which every element is a mapping
    Records(Vec<Document>),
    /// Anything else. `index` is set when the offender is a sequence element.
    Invalid {
        index: Option<usize>,
        type_name: &'static str,
    },
}

impl InsertPayload {
    /// Classify a BSON value
    pub fn classify(value: Bson) -> Self {
        match value {
            Bson::Document(doc) => InsertPayload::Record(doc),
            Bson::Array(items) => {
                if let Some((index, item)) = items
                    .iter()
                    .enumerate()
                    .find(|(_, item)| !matches!(item, Bson::Document(_)))
                {
                    return InsertPayload::Invalid {
                        index: Some(index),
                        type_name: bson_type_name(item),
                    };
                }
                InsertPayload::Records(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Bson::Document(doc) => Some(doc),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => InsertPayload::Invalid {
                index: None,
                type_name: bson_type_name(&other),
            },
        }
    }

    /// Classify a JSON value
    pub fn from_json(value: Value) -> Result<Self> {
        let bson = bson::to_bson(&value)
            .map_err(|e| ConnectorError::MalformedInput(format!("JSON to BSON failed: {}", e)))?;
        Ok(Self::classify(bson))
    }

    /// Number of records an accepted payload carries
    pub fn len(&self) -> usize {
        match self {
            InsertPayload::Record(_) => 1,
            InsertPayload::Records(docs) => docs.len(),
            InsertPayload::Invalid { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn an invalid payload into the error reported to the caller
    pub fn into_valid(self) -> Result<Self> {
        match self {
            InsertPayload::Invalid {
                index: Some(index),
                type_name,
            } => Err(ConnectorError::MalformedInput(format!(
                "data type at index {} of the sequence is '{}', but every entry should be a mapping",
                index, type_name
            ))),
            InsertPayload::Invalid {
                index: None,
                type_name,
            } => Err(ConnectorError::MalformedInput(format!(
                "data type is '{}', but data should be a mapping or a sequence of mappings",
                type_name
            ))),
            InsertPayload::Records(docs) if docs.is_empty() => Err(
                ConnectorError::MalformedInput("no records to insert".to_string()),
            ),
            valid => Ok(valid),
        }
    }
}

impl From<Document> for InsertPayload {
    fn from(doc: Document) -> Self {
        InsertPayload::Record(doc)
    }
}

impl From<Vec<Document>> for InsertPayload {
    fn from(docs: Vec<Document>) -> Self {
        InsertPayload::Records(docs)
    }
}

/// Name reported for a value of the wrong type
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "boolean",
        Bson::Null | Bson::Undefined => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => "javascript",
        Bson::Int32(_) | Bson::Int64(_) => "integer",
        Bson::Timestamp(_) => "timestamp",
        Bson::Binary(_) => "binary",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "datetime",
        Bson::Symbol(_) => "symbol",
        Bson::Decimal128(_) => "decimal",
        Bson::MaxKey | Bson::MinKey => "key",
        Bson::DbPointer(_) => "dbPointer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    #[test]
    fn test_single_mapping() {
        let payload = InsertPayload::from_json(json!({"a": 1})).unwrap();
        assert!(matches!(payload, InsertPayload::Record(ref d) if d.contains_key("a")));
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_sequence_of_mappings() {
        let payload = InsertPayload::from_json(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(payload.len(), 2);
        assert!(payload.into_valid().is_ok());
    }

    #[test]
    fn test_sequence_with_bad_element_names_index_and_type() {
        let payload = InsertPayload::from_json(json!([{"a": 1}, "bad"])).unwrap();
        assert_eq!(
            payload,
            InsertPayload::Invalid {
                index: Some(1),
                type_name: "string"
            }
        );
        let err = payload.into_valid().unwrap_err().to_string();
        assert!(err.contains("index 1"));
        assert!(err.contains("'string'"));
    }

    #[test]
    fn test_scalar_is_invalid() {
        let payload = InsertPayload::from_json(json!(42)).unwrap();
        assert_eq!(
            payload,
            InsertPayload::Invalid {
                index: None,
                type_name: "integer"
            }
        );
        let payload = InsertPayload::from_json(json!("text")).unwrap();
        assert!(payload.into_valid().unwrap_err().to_string().contains("'string'"));
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let payload = InsertPayload::from_json(json!([])).unwrap();
        assert!(matches!(
            payload.into_valid(),
            Err(ConnectorError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_native_documents() {
        let payload: InsertPayload = doc! { "name": "abc" }.into();
        assert_eq!(payload.len(), 1);
        let payload: InsertPayload = vec![doc! { "a": 1 }, doc! { "a": 2 }].into();
        assert_eq!(payload.len(), 2);
    }
}
