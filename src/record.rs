//! Scraped records and the per-run collection holding them.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Value used for any field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// A field name to value mapping that keeps fields in the order they were first set.
///
/// Fields are only ever added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

/// A partial mapping produced by a detail extractor and merged into a [`Record`].
pub type Fields = Record;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record where every named field holds [`NOT_AVAILABLE`].
    pub fn with_defaults<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut record = Self::new();
        for name in names {
            record.set(name, NOT_AVAILABLE);
        }
        record
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Sets `name` to `value`, substituting [`NOT_AVAILABLE`] when there is none.
    pub fn set_or_default<N: Into<String>>(&mut self, name: N, value: Option<String>) {
        self.set(name, value.unwrap_or_else(|| NOT_AVAILABLE.to_string()));
    }

    /// Inserts [`NOT_AVAILABLE`] for `name` unless the field already exists.
    pub fn set_default<N: Into<String>>(&mut self, name: N) {
        let name = name.into();
        if self.get(&name).is_none() {
            self.fields.push((name, NOT_AVAILABLE.to_string()));
        }
    }

    pub fn merge(&mut self, fields: Fields) {
        for (name, value) in fields.fields {
            self.set(name, value);
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when the field exists and holds something other than [`NOT_AVAILABLE`].
    pub fn is_populated(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| value != NOT_AVAILABLE)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

/// The ordered records of one pipeline run.
///
/// Appended to during the listing phase, then addressed by index while details
/// are merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCollection {
    records: Vec<Record>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I: IntoIterator<Item = Record>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Replaces the record at `index`. Returns `false` if the index is out of bounds.
    pub fn set(&mut self, index: usize, record: Record) -> bool {
        match self.records.get_mut(index) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Union of all field names, in order of first appearance.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for name in self.records.iter().flat_map(Record::field_names) {
            if !columns.iter().any(|column| column == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }

    pub fn count_populated(&self, name: &str) -> usize {
        self.records
            .iter()
            .filter(|record| record.is_populated(name))
            .count()
    }
}

impl From<Vec<Record>> for RecordCollection {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}
