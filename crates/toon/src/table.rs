use serde_json::{Map, Value};

/// A named list of homogeneous flat records.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows: Vec::new(),
        }
    }

    /// Build a table from JSON objects. The field set is the union of keys in
    /// the order first seen; records missing a field get a null cell.
    pub fn from_records(name: impl Into<String>, records: &[Map<String, Value>]) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !fields.iter().any(|f| f == key) {
                    fields.push(key.clone());
                }
            }
        }
        let rows = records
            .iter()
            .map(|record| {
                fields
                    .iter()
                    .map(|f| record.get(f).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self {
            name: name.into(),
            fields,
            rows,
        }
    }

    /// Reassemble rows into JSON objects keyed by the header fields.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.fields
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}
