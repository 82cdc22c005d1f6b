//! Persistent, append-only storage for coordinate tables.
//!
//! The matching code only sees the narrow [`FactStore`] interface. Locking
//! and write discipline are the business of the store implementation: the
//! [`JsonFileStore`] serializes writers within the process and replaces the
//! file atomically, so a concurrent reader sees either the old or the new
//! table and never a partial one. Across processes the last writer wins; any
//! duplication this introduces is removed by [`deduplicate`] on the next
//! write.

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::{
    error::TableError,
    table::{deduplicate, merge_table, CoordFact, CoordTable},
};

/// Shared storage for learned coordinate facts.
pub trait FactStore: Send + Sync {
    /// Returns the current table, sorted by character.
    fn load(&self) -> Result<CoordTable, TableError>;

    /// Appends `facts`, removes exact duplicates and persists the result.
    ///
    /// Returns the table as written. The update is all or nothing: on error
    /// the stored table is left unmodified.
    fn merge_and_save(&self, facts: &[CoordFact]) -> Result<CoordTable, TableError>;
}

/// Appends facts to a table, deduplicates and restores character order.
pub fn append_facts(mut table: CoordTable, facts: &[CoordFact]) -> CoordTable {
    for fact in facts {
        table.push(fact.clone());
    }
    let mut table = deduplicate(&table);
    table.sort();
    table
}

/// Reconciles a bundled baseline with a local table.
///
/// This is [`merge_table`] followed by [`deduplicate`].
pub fn reconcile(baseline: &CoordTable, local: &CoordTable) -> CoordTable {
    deduplicate(&merge_table(baseline, local))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking writer never leaves a half written table behind, so the
    // guarded state is still usable
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A store that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<CoordTable>,
}

impl MemoryStore {
    pub fn new(mut table: CoordTable) -> Self {
        table.sort();
        Self {
            table: Mutex::new(table),
        }
    }

    /// Creates a store holding the reconciliation of `baseline` and `local`.
    pub fn with_baseline(baseline: &CoordTable, local: &CoordTable) -> Self {
        Self::new(reconcile(baseline, local))
    }
}

impl FactStore for MemoryStore {
    fn load(&self) -> Result<CoordTable, TableError> {
        Ok(lock(&self.table).clone())
    }

    fn merge_and_save(&self, facts: &[CoordFact]) -> Result<CoordTable, TableError> {
        let mut table = lock(&self.table);
        let updated = append_facts(table.clone(), facts);
        *table = updated.clone();
        Ok(updated)
    }
}

/// A store backed by a JSON file on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store for the table at `path`.
    ///
    /// The file is not touched until the first load or write. A missing file
    /// reads as an empty table.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store at `path`, first reconciling the local table with
    /// `baseline`.
    ///
    /// The local file is only rewritten when reconciliation changed its
    /// size, so a deployment that already agrees with the baseline is left
    /// alone.
    pub fn open(path: impl Into<PathBuf>, baseline: &CoordTable) -> Result<Self, TableError> {
        let store = Self::new(path);
        {
            let _guard = lock(&store.write_lock);
            let local = read_table(&store.path)?;
            let reconciled = reconcile(baseline, &local);
            if reconciled.len() != local.len() {
                log::info!(
                    "reconciled '{}' with baseline: {} -> {} facts",
                    store.path.display(),
                    local.len(),
                    reconciled.len()
                );
                write_table(&store.path, &reconciled)?;
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the local table with `baseline`.
    ///
    /// Used to recover from a corrupt local table.
    pub fn reset_to_baseline(&self, baseline: &CoordTable) -> Result<(), TableError> {
        let _guard = lock(&self.write_lock);
        log::warn!("resetting '{}' to the baseline table", self.path.display());
        let mut table = deduplicate(baseline);
        table.sort();
        write_table(&self.path, &table)
    }
}

impl FactStore for JsonFileStore {
    fn load(&self) -> Result<CoordTable, TableError> {
        read_table(&self.path)
    }

    fn merge_and_save(&self, facts: &[CoordFact]) -> Result<CoordTable, TableError> {
        let _guard = lock(&self.write_lock);
        // re-read so facts written by other processes since our last load
        // are not discarded
        let current = read_table(&self.path)?;
        let updated = append_facts(current, facts);
        write_table(&self.path, &updated)?;
        log::debug!(
            "stored {} new fact(s) in '{}' ({} total)",
            facts.len(),
            self.path.display(),
            updated.len()
        );
        Ok(updated)
    }
}

/// Reads a table from a JSON file.
///
/// A missing file is an empty table; a file that fails to parse is reported
/// as [`TableError::Corrupt`].
pub fn read_table(path: impl AsRef<Path>) -> Result<CoordTable, TableError> {
    let path = path.as_ref();
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CoordTable::default()),
        Err(e) => return Err(TableError::io(path, e)),
    };
    CoordTable::from_json(&json).map_err(|source| TableError::Corrupt {
        path: path.to_owned(),
        source,
    })
}

/// Atomically replaces the file at `path` with the JSON form of `table`.
///
/// The table is written to a temporary file in the same directory which is
/// then renamed over the destination.
pub fn write_table(path: impl AsRef<Path>, table: &CoordTable) -> Result<(), TableError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| TableError::io(dir, e))?;
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| TableError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        serde_json::to_writer(&mut writer, table).map_err(TableError::Encode)?;
        writer.flush().map_err(|e| TableError::io(path, e))?;
    }
    file.as_file()
        .sync_all()
        .map_err(|e| TableError::io(path, e))?;
    file.persist(path)
        .map_err(|e| TableError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::Outline;
    use pretty_assertions::assert_eq;
    use std::{sync::Arc, thread};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn fact(ch: char, points: &[(i32, i32)]) -> CoordFact {
        CoordFact::new(ch, points.iter().copied().map(Into::into).collect::<Outline>())
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("table.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        fs::write(&path, "{ not a table").unwrap();
        let store = JsonFileStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(err.is_corrupt(), "{err}");
        // and recoverable through the baseline
        let baseline = CoordTable::from_facts(vec![fact('a', &[(1, 1)])]);
        store.reset_to_baseline(&baseline).unwrap();
        assert_eq!(store.load().unwrap(), baseline);
    }

    #[test]
    fn merge_and_save_persists_sorted_and_deduplicated() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.json");
        let store = JsonFileStore::new(&path);
        store
            .merge_and_save(&[fact('b', &[(1, 1)]), fact('a', &[(0, 0)])])
            .unwrap();
        let table = store
            .merge_and_save(&[fact('a', &[(0, 0)]), fact('a', &[(5, 5)])])
            .unwrap();
        let expected = vec![fact('a', &[(0, 0)]), fact('a', &[(5, 5)]), fact('b', &[(1, 1)])];
        assert_eq!(table.facts(), expected.as_slice());
        // a fresh store sees the same thing on disk
        assert_eq!(JsonFileStore::new(&path).load().unwrap().facts(), expected.as_slice());
    }

    #[test]
    fn open_reconciles_with_baseline() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        write_table(&path, &CoordTable::from_facts(vec![fact('b', &[(2, 2)])])).unwrap();
        let baseline =
            CoordTable::from_facts(vec![fact('a', &[(1, 1)]), fact('b', &[(2, 2)])]);
        let store = JsonFileStore::open(&path, &baseline).unwrap();
        assert_eq!(store.load().unwrap(), baseline);
    }

    #[test]
    fn open_leaves_agreeing_table_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        // deliberately unsorted on disk: an untouched file keeps its bytes
        let raw = r#"[["b",[[2,2]]],["a",[[1,1]]]]"#;
        fs::write(&path, raw).unwrap();
        let baseline = CoordTable::from_facts(vec![fact('a', &[(1, 1)])]);
        JsonFileStore::open(&path, &baseline).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("table.json")));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store.merge_and_save(&[fact('k', &[(i, i)])]).unwrap();
                    // everyone also learns the same shape
                    store.merge_and_save(&[fact('s', &[(0, 0)])]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let table = store.load().unwrap();
        assert_eq!(table.len(), 9);
        assert_eq!(deduplicate(&table), table);
    }

    #[test]
    fn memory_store_matches_file_semantics() {
        let baseline = CoordTable::from_facts(vec![fact('c', &[(3, 3)]), fact('a', &[(1, 1)])]);
        let store = MemoryStore::with_baseline(&baseline, &CoordTable::default());
        let table = store
            .merge_and_save(&[fact('b', &[(2, 2)]), fact('a', &[(1, 1)])])
            .unwrap();
        assert_eq!(
            table.facts(),
            &[fact('a', &[(1, 1)]), fact('b', &[(2, 2)]), fact('c', &[(3, 3)])]
        );
        assert_eq!(store.load().unwrap(), table);
    }
}
