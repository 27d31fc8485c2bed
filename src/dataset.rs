//! In-memory form of the backing document.

use crate::codec::{CodecRegistry, Decoded, TIMESTAMP_TYPE, TYPE_TAG};
use crate::error::{Result, StoreError};
use crate::record::{AnyRecord, IdentityKey};
use crate::types::{RecordId, Timestamp};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved top-level key holding the last commit time.
pub const LAST_COMMIT_KEY: &str = "last_commit";

/// Persisted records of one type, keyed by identity.
pub type Table = BTreeMap<i64, Box<dyn AnyRecord>>;

/// All tables plus commit metadata.
#[derive(Debug, Clone)]
pub struct Dataset {
    last_commit: Timestamp,
    tables: BTreeMap<String, Table>,
}

impl Dataset {
    /// A table-less dataset stamped with the current time.
    pub fn empty() -> Self {
        Self {
            last_commit: Timestamp::now(),
            tables: BTreeMap::new(),
        }
    }

    pub fn last_commit(&self) -> Timestamp {
        self.last_commit
    }

    pub(crate) fn set_last_commit(&mut self, ts: Timestamp) {
        self.last_commit = ts;
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> &mut Table {
        self.tables.entry(name.to_string()).or_default()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Encode into the backing document.
    pub fn to_document(&self, codecs: &CodecRegistry) -> Result<Value> {
        let mut doc = Map::new();
        doc.insert(
            LAST_COMMIT_KEY.to_string(),
            Value::String(self.last_commit.to_iso8601()),
        );
        for (name, table) in &self.tables {
            let mut entries = Map::new();
            for (id, record) in table {
                entries.insert(RecordId(*id).to_key(), codecs.encode_record(&**record)?);
            }
            doc.insert(name.clone(), Value::Object(entries));
        }
        Ok(Value::Object(doc))
    }

    /// Decode a backing document.
    ///
    /// Structural problems yield [`StoreError::MalformedBackingFile`]; codec
    /// failures are returned as they are.
    pub fn from_document(doc: Value, codecs: &CodecRegistry) -> Result<Self> {
        let mut doc = match doc {
            Value::Object(doc) => doc,
            other => return Err(malformed(format!("top level is {}", kind(&other)))),
        };

        let last_commit = match doc.remove(LAST_COMMIT_KEY) {
            Some(node) => decode_last_commit(node, codecs)?,
            None => return Err(malformed(format!("missing '{}'", LAST_COMMIT_KEY))),
        };

        let mut tables = BTreeMap::new();
        for (name, entries) in doc {
            let entries = match entries {
                Value::Object(entries) => entries,
                other => {
                    return Err(malformed(format!("table '{}' is {}", name, kind(&other))))
                }
            };
            let mut table = Table::new();
            for (key, node) in entries {
                let id = RecordId::from_key(&key)
                    .ok_or_else(|| malformed(format!("table '{}' has key '{}'", name, key)))?;
                if !matches!(&node, Value::Object(obj) if obj.contains_key(TYPE_TAG)) {
                    return Err(malformed(format!("entry '{}/{}' is untagged", name, key)));
                }
                let mut record = codecs.decode(node)?.into_record().ok_or_else(|| {
                    malformed(format!("entry '{}/{}' is not a record", name, key))
                })?;
                record.identity_slot(IdentityKey::new()).assign(id);
                table.insert(id.0, record);
            }
            tables.insert(name, table);
        }

        Ok(Self {
            last_commit,
            tables,
        })
    }
}

/// Smallest non-negative identity not used as a key in `table`.
pub fn first_free_id(table: &Table) -> RecordId {
    let mut next = 0;
    for &id in table.keys() {
        if id == next {
            next += 1;
        } else if id > next {
            break;
        }
    }
    RecordId(next)
}

fn decode_last_commit(node: Value, codecs: &CodecRegistry) -> Result<Timestamp> {
    match node {
        Value::String(s) => Timestamp::parse_iso8601(&s)
            .map_err(|e| malformed(format!("'{}' is not a timestamp: {}", s, e))),
        node @ Value::Object(_) => match codecs.decode(node)? {
            Decoded::Value(value) => value
                .downcast::<Timestamp>()
                .map(|ts| *ts)
                .map_err(|_| malformed(format!("'{}' is not a {}", LAST_COMMIT_KEY, TIMESTAMP_TYPE))),
            _ => Err(malformed(format!("'{}' is not a timestamp", LAST_COMMIT_KEY))),
        },
        other => Err(malformed(format!("'{}' is {}", LAST_COMMIT_KEY, kind(&other)))),
    }
}

fn malformed(msg: String) -> StoreError {
    StoreError::MalformedBackingFile(msg)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Identity, Record};
    use serde_json::json;

    crate::record! {
        struct Item {
            name: String,
        }
    }

    fn item(name: &str, id: i64) -> Box<dyn AnyRecord> {
        let mut item = Item {
            identity: Identity::transient(),
            name: name.to_string(),
        };
        item.identity.assign(RecordId(id));
        Box::new(item)
    }

    fn codecs() -> CodecRegistry {
        let mut codecs = CodecRegistry::with_builtins();
        codecs.register_record::<Item>().unwrap();
        codecs
    }

    #[test]
    fn test_first_free_id() {
        let mut table = Table::new();
        assert_eq!(first_free_id(&table), RecordId(0));

        for id in [0, 1, 3] {
            table.insert(id, item("x", id));
        }
        assert_eq!(first_free_id(&table), RecordId(2));

        table.insert(2, item("x", 2));
        assert_eq!(first_free_id(&table), RecordId(4));

        let mut sparse = Table::new();
        sparse.insert(5, item("x", 5));
        assert_eq!(first_free_id(&sparse), RecordId(0));
    }

    #[test]
    fn test_document_layout() {
        let mut dataset = Dataset::empty();
        dataset.table_mut("item").insert(0, item("foo", 0));
        let doc = dataset.to_document(&codecs()).unwrap();

        assert_eq!(
            doc["item"],
            json!({"0": {"__type__": "Item", "value": {"name": "foo"}}})
        );
        assert_eq!(
            doc[LAST_COMMIT_KEY],
            json!(dataset.last_commit().to_iso8601())
        );
    }

    #[test]
    fn test_document_roundtrip() {
        let codecs = codecs();
        let mut dataset = Dataset::empty();
        dataset.table_mut("item").insert(0, item("a", 0));
        dataset.table_mut("item").insert(7, item("b", 7));

        let doc = dataset.to_document(&codecs).unwrap();
        let back = Dataset::from_document(doc, &codecs).unwrap();

        assert_eq!(back.last_commit(), dataset.last_commit());
        assert_eq!(back.table_names(), vec!["item".to_string()]);
        let table = back.table("item").unwrap();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![0, 7]);
        let b = table[&7].downcast_ref::<Item>().unwrap();
        assert_eq!(b.name, "b");
        assert_eq!(b.id(), RecordId(7));
    }

    #[test]
    fn test_tagged_last_commit_accepted() {
        let doc = json!({
            "last_commit": {"__type__": "datetime", "value": "2021-01-01T00:00:00"}
        });
        let dataset = Dataset::from_document(doc, &codecs()).unwrap();
        assert_eq!(dataset.last_commit().to_iso8601(), "2021-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_structural_errors_are_malformed() {
        let codecs = codecs();
        let cases = [
            json!([1, 2]),
            json!({"item": {}}),
            json!({"last_commit": 5}),
            json!({"last_commit": "not a time"}),
            json!({"last_commit": "2021-01-01T00:00:00Z", "item": []}),
            json!({"last_commit": "2021-01-01T00:00:00Z", "item": {"x": {"__type__": "Item", "value": {"name": "a"}}}}),
            json!({"last_commit": "2021-01-01T00:00:00Z", "item": {"0": {"name": "a"}}}),
            json!({"last_commit": "2021-01-01T00:00:00Z", "item": {"0": {"__type__": "datetime", "value": "2021-01-01T00:00:00Z"}}}),
        ];
        for doc in cases {
            let err = Dataset::from_document(doc.clone(), &codecs).unwrap_err();
            assert!(
                matches!(err, StoreError::MalformedBackingFile(_)),
                "{} gave {:?}",
                doc,
                err
            );
        }
    }

    #[test]
    fn test_unknown_record_type_propagates() {
        let doc = json!({
            "last_commit": "2021-01-01T00:00:00Z",
            "thing": {"0": {"__type__": "Thing", "value": {}}}
        });
        let err = Dataset::from_document(doc, &codecs()).unwrap_err();
        assert!(matches!(err, StoreError::NotDeserializable(tag) if tag == "Thing"));
    }
}
