//! Snapshot sinks for the record collection.
//!
//! Every call overwrites the destination with the full current collection. The
//! content is first written next to the destination and then renamed over it,
//! so a reader never sees a half-written snapshot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{PersistError, SetupError};
use crate::record::{Record, RecordCollection, NOT_AVAILABLE};

pub trait Sink: Send + Sync {
    fn persist(&self, collection: &RecordCollection) -> Result<(), PersistError>;
    fn destination(&self) -> &Path;
}

/// Persists `collection`, logging instead of failing.
pub fn persist(sink: &dyn Sink, collection: &RecordCollection) -> bool {
    match sink.persist(collection) {
        Ok(()) => {
            tracing::debug!(
                path = %sink.destination().display(),
                rows = collection.len(),
                "snapshot written"
            );
            true
        }
        Err(err) => {
            tracing::error!("snapshot failed: {}", err);
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Csv,
    Json,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }

    pub fn sink(&self, path: impl Into<PathBuf>) -> Box<dyn Sink> {
        match self {
            Format::Csv => Box::new(CsvSink::new(path)),
            Format::Json => Box::new(JsonSink::new(path)),
        }
    }
}

/// Tabular output. Columns are the union of all fields; a record missing a
/// column gets [`NOT_AVAILABLE`] there.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn encode(&self, collection: &RecordCollection) -> Result<Vec<u8>, csv::Error> {
        let columns = collection.columns();
        let mut writer = csv::Writer::from_writer(Vec::new());
        if !columns.is_empty() {
            writer.write_record(&columns)?;
        }
        for record in collection.records() {
            writer.write_record(
                columns
                    .iter()
                    .map(|column| record.get(column).unwrap_or(NOT_AVAILABLE)),
            )?;
        }
        writer.into_inner().map_err(|err| err.into_error().into())
    }
}

impl Sink for CsvSink {
    fn persist(&self, collection: &RecordCollection) -> Result<(), PersistError> {
        let bytes = self.encode(collection).map_err(|source| PersistError::Csv {
            path: self.path.clone(),
            source,
        })?;
        write_replacing(&self.path, &bytes)
    }

    fn destination(&self) -> &Path {
        &self.path
    }
}

/// An array of objects that all share the same keys, in [`CsvSink`]'s column order.
#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// A record laid out over the collection's columns, absent cells as [`NOT_AVAILABLE`].
struct Row<'a> {
    columns: &'a [String],
    record: &'a Record,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in self.columns {
            map.serialize_entry(column, self.record.get(column).unwrap_or(NOT_AVAILABLE))?;
        }
        map.end()
    }
}

impl Sink for JsonSink {
    fn persist(&self, collection: &RecordCollection) -> Result<(), PersistError> {
        let columns = collection.columns();
        let rows: Vec<Row<'_>> = collection
            .records()
            .iter()
            .map(|record| Row {
                columns: &columns,
                record,
            })
            .collect();
        let bytes = serde_json::to_vec_pretty(&rows).map_err(|source| {
            PersistError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        write_replacing(&self.path, &bytes)
    }

    fn destination(&self) -> &Path {
        &self.path
    }
}

fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let io_err = |source: std::io::Error| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    fs::rename(&tmp, path).map_err(io_err)
}

/// Where a run writes its snapshots and its final output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub partial: PathBuf,
    pub final_output: PathBuf,
}

impl OutputPaths {
    /// Timestamped paths under `dir`, fixed for the whole run.
    /// Creates `dir` if needed.
    pub fn timestamped(
        dir: &Path,
        prefix: &str,
        format: Format,
        started_at: DateTime<Local>,
    ) -> Result<Self, SetupError> {
        fs::create_dir_all(dir).map_err(|source| SetupError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let ext = format.extension();
        Ok(Self {
            partial: dir.join(format!("{prefix}_partial_{stamp}.{ext}")),
            final_output: dir.join(format!("{prefix}_{stamp}.{ext}")),
        })
    }
}
