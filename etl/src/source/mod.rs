//! Named tabular sources.
//!
//! A [`Loader`] resolves a source identifier to a fully materialized
//! [`TabularData`]. [`CsvLoader`] reads CSV files from a data directory;
//! [`InMemoryLoader`] serves tables registered up front.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadResult};
use crate::parser::{parse_bytes_auto, TabularData};

/// Loads one named tabular source fully into memory.
pub trait Loader {
    fn load(&self, source: &str) -> LoadResult<TabularData>;
}

/// Reads CSV files relative to a data directory.
///
/// Encoding and delimiter are auto-detected per file.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    data_dir: PathBuf,
}

impl CsvLoader {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Path a source identifier resolves to. Absolute identifiers are used as-is.
    pub fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

impl Loader for CsvLoader {
    fn load(&self, source: &str) -> LoadResult<TabularData> {
        let path = self.resolve(source);
        if !path.is_file() {
            return Err(LoadError::SourceNotFound(path.display().to_string()));
        }

        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::SourceNotFound(path.display().to_string()),
            _ => LoadError::Io {
                name: path.display().to_string(),
                source: e,
            },
        })?;

        parse_bytes_auto(&bytes).map_err(|e| LoadError::Parse {
            name: path.display().to_string(),
            source: e,
        })
    }
}

/// Serves tables registered by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    tables: HashMap<String, TabularData>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: TabularData) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }
}

impl Loader for InMemoryLoader {
    fn load(&self, source: &str) -> LoadResult<TabularData> {
        self.tables
            .get(source)
            .cloned()
            .ok_or_else(|| LoadError::SourceNotFound(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_csv_loader_reads_relative_source() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("shipping_data_2.csv"),
            "shipment_identifier,on_time\n1,True\n2,False\n",
        )
        .unwrap();

        let loader = CsvLoader::new(dir.path());
        let table = loader.load("shipping_data_2.csv").unwrap();

        assert_eq!(table.headers, vec!["shipment_identifier", "on_time"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.delimiter, ',');
    }

    #[test]
    fn test_csv_loader_missing_file() {
        let dir = tempdir().unwrap();
        let loader = CsvLoader::new(dir.path());

        let err = loader.load("nope.csv").unwrap_err();
        assert!(matches!(err, LoadError::SourceNotFound(ref p) if p.ends_with("nope.csv")));
    }

    #[test]
    fn test_csv_loader_directory_is_not_a_source() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let loader = CsvLoader::new(dir.path());

        assert!(matches!(loader.load("sub"), Err(LoadError::SourceNotFound(_))));
    }

    #[test]
    fn test_csv_loader_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.csv"), "").unwrap();
        let loader = CsvLoader::new(dir.path());

        let err = loader.load("empty.csv").unwrap_err();
        match err {
            LoadError::Parse { name, source } => {
                assert!(name.ends_with("empty.csv"));
                assert!(source.message.contains("Empty"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_absolute_source_ignores_data_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("abs.csv");
        fs::write(&file, "a;b\n1;2\n").unwrap();

        let loader = CsvLoader::new("/definitely/not/here");
        let table = loader.load(file.to_str().unwrap()).unwrap();
        assert_eq!(table.delimiter, ';');
    }

    #[test]
    fn test_in_memory_loader() {
        let loader = InMemoryLoader::new()
            .with_table("routes", TabularData::from_rows(&["a"], &[&["1"]]));

        assert_eq!(loader.load("routes").unwrap().len(), 1);
        assert!(matches!(loader.load("statuses"), Err(LoadError::SourceNotFound(_))));
    }
}
