//! Backing media for the record store.
//!
//! A medium only knows how to read its whole table and overwrite it in full.
//! There is no locking: two writers that load, change and save at the same
//! time silently lose one of the changes.

#[cfg(test)]
use std::cell::{Cell, RefCell};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{ast::Table, error::StoreError, parser};

pub trait Medium {
    /// The stored table, or `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<Table>, StoreError>;

    /// Replaces everything stored with `table`.
    fn write(&self, table: &Table) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}

/// A UTF-8 comma separated file with a header row.
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Medium for CsvFile {
    fn read(&self) -> Result<Option<Table>, StoreError> {
        let source = match fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "data file does not exist yet");
                return Ok(None);
            }
            Err(err) => return Err(self.io_error(err)),
        };

        Ok(Some(parser::parse_str(&source)?))
    }

    fn write(&self, table: &Table) -> Result<(), StoreError> {
        fs::write(&self.path, parser::render(table)).map_err(|err| self.io_error(err))
    }

    fn describe(&self) -> String {
        self.path().display().to_string()
    }
}

/// Keeps the table in memory. Reads and writes can be made to fail so the
/// store's degraded paths can be exercised.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryMedium {
    table: RefCell<Option<Table>>,
    writes: Cell<usize>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
}

#[cfg(test)]
impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: Table) -> Self {
        let medium = Self::default();
        medium.table.replace(Some(table));
        medium
    }

    pub fn table(&self) -> Option<Table> {
        self.table.borrow().clone()
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn offline(kind: io::ErrorKind) -> StoreError {
        StoreError::Io {
            path: PathBuf::from("memory"),
            source: io::Error::from(kind),
        }
    }
}

#[cfg(test)]
impl Medium for MemoryMedium {
    fn read(&self) -> Result<Option<Table>, StoreError> {
        if self.fail_reads.get() {
            return Err(Self::offline(io::ErrorKind::NotConnected));
        }
        Ok(self.table())
    }

    fn write(&self, table: &Table) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(Self::offline(io::ErrorKind::PermissionDenied));
        }
        self.table.replace(Some(table.clone()));
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl<M: Medium + ?Sized> Medium for &M {
    fn read(&self) -> Result<Option<Table>, StoreError> {
        (**self).read()
    }

    fn write(&self, table: &Table) -> Result<(), StoreError> {
        (**self).write(table)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Row;

    fn sample() -> Table {
        let mut table = Table::new(vec!["Date".into(), "Type".into(), "Note".into()]);
        table.rows.push(Row::new(vec![
            "2024-03-05".into(),
            "Morning".into(),
            "covering, for Sam".into(),
        ]));
        table
    }

    #[test]
    fn test_csv_file_missing_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let medium = CsvFile::new(dir.path().join("shifts.csv"));
        assert!(medium.read().unwrap().is_none());
    }

    #[test]
    fn test_csv_file_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let medium = CsvFile::new(dir.path().join("shifts.csv"));
        medium.write(&sample()).unwrap();

        let text = fs::read_to_string(medium.path()).unwrap();
        assert!(text.starts_with("Date,Type,Note\n"));
        assert_eq!(medium.read().unwrap(), Some(sample()));
    }

    #[test]
    fn test_csv_file_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let medium = CsvFile::new(dir.path().join("missing").join("shifts.csv"));
        assert!(matches!(
            medium.write(&sample()),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_memory_medium_failures() {
        let medium = MemoryMedium::with_table(sample());
        medium.set_fail_writes(true);
        assert!(medium.write(&Table::default()).is_err());
        assert_eq!(medium.table(), Some(sample()));
        assert_eq!(medium.writes(), 0);

        medium.set_fail_reads(true);
        assert!(matches!(
            medium.read(),
            Err(StoreError::Io { ref source, .. }) if source.kind() == io::ErrorKind::NotConnected
        ));
    }
}
