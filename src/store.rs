//! Main Store struct tying all components together.

use crate::codec::{CodecRegistry, Decoder, Encoder};
use crate::dataset::{first_free_id, Dataset};
use crate::error::{Result, StoreError};
use crate::predicate::Predicate;
use crate::record::{AnyRecord, IdentityKey, Record};
use crate::types::{RecordId, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Backing file for the dataset.
    pub path: PathBuf,

    /// Pretty-print the backing file (two-space indentation).
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.json"),
            pretty: true,
        }
    }
}

impl StoreConfig {
    /// Backing file `file_name` inside an index directory.
    pub fn in_dir(dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: dir.as_ref().join(file_name),
            ..Default::default()
        }
    }
}

/// File-backed table store.
///
/// Holds one dataset for its whole lifetime:
/// - loaded lazily from the backing file on first access (or `rollback`)
/// - mutated in memory by `put`
/// - written back in full by `commit`
///
/// Record types must be registered before the first load if the backing file
/// already holds them; `get`, `pop` and `put` register their own type.
pub struct Store {
    /// Where the dataset is persisted.
    path: RwLock<PathBuf>,

    /// Whether to pretty-print on commit.
    pretty: bool,

    /// Codecs used to encode and decode the dataset.
    codecs: RwLock<CodecRegistry>,

    /// Loaded dataset, `None` until first access.
    data: Mutex<Option<Dataset>>,
}

impl Store {
    /// Create a store. No I/O happens until first access.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            path: RwLock::new(config.path),
            pretty: config.pretty,
            codecs: RwLock::new(CodecRegistry::with_builtins()),
            data: Mutex::new(None),
        }
    }

    // --- Codec Registration ---

    /// Register a record type, failing if its name is already taken.
    pub fn register<R: Record>(&self) -> Result<()> {
        self.codecs.write().register_record::<R>()
    }

    pub fn register_encoder(&self, encoder: Encoder) -> Result<()> {
        self.codecs.write().register_encoder(encoder)
    }

    pub fn register_decoder(&self, decoder: Decoder) -> Result<()> {
        self.codecs.write().register_decoder(decoder)
    }

    /// Register a record type unless it already is. Returns whether
    /// anything was added.
    pub fn ensure_registered<R: Record>(&self) -> bool {
        {
            let codecs = self.codecs.read();
            if codecs.has_encoder(R::TYPE_NAME) && codecs.has_decoder(R::TYPE_NAME) {
                return false;
            }
        }
        let added = self.codecs.write().ensure_record::<R>();
        if added {
            debug!(record_type = R::TYPE_NAME, "Registered record codec");
        }
        added
    }

    // --- Backing File ---

    /// Change the backing file. The loaded dataset is kept.
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        *self.path.write() = path.into();
    }

    pub fn path(&self) -> PathBuf {
        self.path.read().clone()
    }

    /// Whether the dataset has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.data.lock().is_some()
    }

    /// Reload the dataset from the backing file, discarding uncommitted changes.
    ///
    /// A missing or malformed file yields a fresh, empty dataset. Codec
    /// failures (unregistered or ambiguous record types) are returned.
    pub fn rollback(&self) -> Result<()> {
        let dataset = self.load()?;
        *self.data.lock() = Some(dataset);
        Ok(())
    }

    fn load(&self) -> Result<Dataset> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Backing file not found, starting empty dataset");
                return Ok(Dataset::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let doc: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Backing file is not JSON, starting empty dataset");
                return Ok(Dataset::empty());
            }
        };

        match Dataset::from_document(doc, &self.codecs.read()) {
            Ok(dataset) => {
                debug!(
                    path = %path.display(),
                    tables = dataset.table_names().len(),
                    "Loaded dataset"
                );
                Ok(dataset)
            }
            Err(StoreError::MalformedBackingFile(reason)) => {
                warn!(path = %path.display(), %reason, "Malformed backing file, starting empty dataset");
                Ok(Dataset::empty())
            }
            Err(e) => Err(e),
        }
    }

    /// Run `f` on the dataset, loading it first if needed.
    fn with_dataset<T>(&self, f: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T> {
        let mut data = self.data.lock();
        let dataset = match data.take() {
            Some(dataset) => dataset,
            None => self.load()?,
        };
        f(data.insert(dataset))
    }

    /// Time of the last successful commit.
    pub fn last_commit(&self) -> Result<Timestamp> {
        self.with_dataset(|dataset| Ok(dataset.last_commit()))
    }

    // --- Record Operations ---

    /// Records of type `R` matching `filter`, in identity order.
    ///
    /// Returned records are detached copies carrying their identity.
    pub fn get<R: Record>(&self, filter: Option<&Predicate<R>>) -> Result<Vec<R>> {
        self.scan(filter, |record, id| record.identity_mut(IdentityKey::new()).assign(id))
    }

    /// Transient copies of the records of type `R` matching `filter`.
    ///
    /// Nothing is removed from the table: the copies have their identity
    /// reset, so putting one back stores a new entry.
    pub fn pop<R: Record>(&self, filter: Option<&Predicate<R>>) -> Result<Vec<R>> {
        self.scan(filter, |record, _| record.identity_mut(IdentityKey::new()).clear())
    }

    fn scan<R: Record>(
        &self,
        filter: Option<&Predicate<R>>,
        stamp: impl Fn(&mut R, RecordId),
    ) -> Result<Vec<R>> {
        self.ensure_registered::<R>();
        let table_name = R::table_name();
        let keep_all = filter.map_or(true, Predicate::is_always);

        self.with_dataset(|dataset| {
            let table = match dataset.table(&table_name) {
                Some(table) => table,
                None => return Ok(Vec::new()),
            };

            let mut results = Vec::new();
            for (&id, stored) in table {
                let record = downcast::<R>(&table_name, &**stored)?;
                if keep_all || filter.map_or(true, |p| p.evaluate(record)) {
                    let mut copy = record.clone();
                    stamp(&mut copy, RecordId(id));
                    results.push(copy);
                }
            }
            Ok(results)
        })
    }

    /// Stage records in their table.
    ///
    /// Transient records get the smallest free identity in the table, written
    /// back into `records`. Each record then replaces whatever is stored
    /// under its identity. Nothing is written to disk until `commit`.
    pub fn put<R: Record>(&self, records: &mut [R]) -> Result<()> {
        self.ensure_registered::<R>();
        let table_name = R::table_name();

        self.with_dataset(|dataset| {
            let table = dataset.table_mut(&table_name);
            for record in records.iter_mut() {
                if record.id().is_transient() {
                    let id = first_free_id(table);
                    record.identity_mut(IdentityKey::new()).assign(id);
                    debug!(table = %table_name, id = id.0, "Assigned identity");
                }
                table.insert(record.id().0, Box::new(record.clone()));
            }
            Ok(())
        })
    }

    /// Stage a single record, returning its identity.
    pub fn put_one<R: Record>(&self, record: &mut R) -> Result<RecordId> {
        self.put(std::slice::from_mut(record))?;
        Ok(record.id())
    }

    /// Number of stored records of type `R`.
    pub fn len<R: Record>(&self) -> Result<usize> {
        self.ensure_registered::<R>();
        let table_name = R::table_name();
        self.with_dataset(|dataset| Ok(dataset.table(&table_name).map_or(0, |t| t.len())))
    }

    /// Names of all tables in the dataset.
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.with_dataset(|dataset| Ok(dataset.table_names()))
    }

    // --- Persistence ---

    /// Write the whole dataset to the backing file.
    ///
    /// Returns `false` on failure, after logging it. The in-memory dataset
    /// keeps its previous commit time and the old file stays in place.
    pub fn commit(&self) -> bool {
        match self.try_commit() {
            Ok(()) => true,
            Err(e) => {
                error!(path = %self.path().display(), error = %e, "Commit failed");
                false
            }
        }
    }

    /// [`Store::commit`] returning the failure instead of logging it.
    pub fn try_commit(&self) -> Result<()> {
        let path = self.path();
        self.with_dataset(|dataset| {
            let previous = dataset.last_commit();
            dataset.set_last_commit(Timestamp::now());

            match self.write_dataset(dataset, &path) {
                Ok(()) => {
                    debug!(
                        path = %path.display(),
                        last_commit = %dataset.last_commit(),
                        "Committed dataset"
                    );
                    Ok(())
                }
                Err(e) => {
                    dataset.set_last_commit(previous);
                    Err(e)
                }
            }
        })
    }

    fn write_dataset(&self, dataset: &Dataset, path: &Path) -> Result<()> {
        let doc = dataset.to_document(&self.codecs.read())?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        write_atomic(path, text.as_bytes())
            .map_err(|e| StoreError::CommitFailed(format!("{}: {}", path.display(), e)))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn downcast<'a, R: Record>(table: &str, stored: &'a dyn AnyRecord) -> Result<&'a R> {
    stored
        .downcast_ref::<R>()
        .ok_or_else(|| StoreError::TypeMismatch {
            table: table.to_string(),
            expected: R::TYPE_NAME.to_string(),
            found: stored.type_name().to_string(),
        })
}

/// Write `contents` to `path` through a sibling temp file and a rename.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = write_and_sync(&tmp_path, contents).and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_sync(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
