//! Record source interface.

use std::ops::Deref;

use serde_json::{Map, Value};

use crate::error::{EvidexError, Result};
use crate::records::TypedRecord;

/// A flat record restricted to the fields that were requested from the source,
/// tagged with where it came from (`file:line` for files).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    origin: String,
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_fields(origin, Map::new())
    }

    pub fn with_fields(origin: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            origin: origin.into(),
            fields,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl Deref for Record {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Common interface for anything that can produce the records of a named dataset.
pub trait RecordSource: Send + Sync {
    /// Load every record of `dataset`, keeping exactly the `fields` requested.
    ///
    /// A malformed record fails the whole call; no partial results are returned.
    fn load(&self, dataset: &str, fields: &[&str]) -> Result<Vec<Record>>;
}

/// Load a dataset and deserialize each projected record into `T`.
///
/// A field of the wrong type is a `Decode` error at the record's origin.
pub fn load_typed<T: TypedRecord>(source: &dyn RecordSource) -> Result<Vec<T>> {
    let records = source.load(T::DATASET, T::FIELDS)?;
    records
        .into_iter()
        .map(|record| {
            let location = record.origin().to_string();
            serde_json::from_value(Value::Object(record.into_fields())).map_err(|e| {
                EvidexError::Decode {
                    location,
                    message: e.to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EvidenceRecord;
    use serde_json::json;

    struct Fixed(Vec<Value>);

    impl RecordSource for Fixed {
        fn load(&self, _dataset: &str, _fields: &[&str]) -> Result<Vec<Record>> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .filter_map(|(i, v)| {
                    v.as_object()
                        .map(|o| Record::with_fields(format!("part-0.json:{}", i + 1), o.clone()))
                })
                .collect())
        }
    }

    #[test]
    fn test_load_typed_evidence() {
        let source = Fixed(vec![json!({"targetId": "t1", "diseaseId": "d1", "score": 0.5})]);
        let rows: Vec<EvidenceRecord> = load_typed(&source).unwrap();
        assert_eq!(rows, vec![EvidenceRecord::new("t1", "d1", 0.5)]);
    }

    #[test]
    fn test_load_typed_rejects_wrong_type_at_origin() {
        let source = Fixed(vec![
            json!({"targetId": "t1", "diseaseId": "d1", "score": 1}),
            json!({"targetId": "t1", "diseaseId": "d1", "score": "high"}),
        ]);
        let err = load_typed::<EvidenceRecord>(&source).unwrap_err();
        match err {
            EvidexError::Decode { location, .. } => assert_eq!(location, "part-0.json:2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_record_derefs_to_fields() {
        let mut record = Record::new("x.json:3");
        record.insert("id", json!("t1"));
        assert_eq!(record.origin(), "x.json:3");
        assert_eq!(record["id"], json!("t1"));
        assert_eq!(record.len(), 1);
    }
}
