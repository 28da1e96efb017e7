//! Filesystem implementation of the LedgerStore trait.
//!
//! Layout under the ledger root:
//!
//! ```text
//! entries/<entry_id>.json                      one sealed entry per file
//! log/<YYYY-MM-DD>.jsonl                       one line per entry, by issuance day
//! index/subject/<prefix>/<sha256-hex>.json     {subject_ref, entry_ids}
//! ```
//!
//! The per-entry record is the commit point. It is created with an atomic
//! no-clobber rename, so two appenders of the same id (even in different
//! processes) produce exactly one record. Log appends and index updates are
//! serialized per file within the process; the index is a cache and can be
//! rebuilt with [`FsStore::rebuild_index`].

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use ledgerseal_core::{EntryId, SealedEntry};
use tempfile::NamedTempFile;

use crate::error::{CommitStage, Result, StoreError};
use crate::subject::{bucket_prefix, subject_ref_hash, SubjectIndexRecord, DEFAULT_INDEX_PREFIX_LEN};
use crate::traits::{placement, AppendResult, LedgerStore};

const ENTRIES_DIR: &str = "entries";
const LOG_DIR: &str = "log";
const INDEX_DIR: &str = "index/subject";

/// Tuning for [`FsStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsOptions {
    /// Hash hex characters used as the index bucket directory.
    pub index_prefix_len: usize,
    /// `fsync` files and directories after each write.
    pub fsync: bool,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            index_prefix_len: DEFAULT_INDEX_PREFIX_LEN,
            fsync: true,
        }
    }
}

/// What [`FsStore::reconcile`] repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Per-entry records replayed.
    pub records_scanned: usize,
    /// Daily-log lines that were missing and have been appended.
    pub log_lines_added: usize,
    /// Index memberships that were missing and have been added.
    pub index_entries_added: usize,
}

impl ReconcileReport {
    /// Whether the store was already consistent.
    pub fn is_clean(&self) -> bool {
        self.log_lines_added == 0 && self.index_entries_added == 0
    }
}

/// Filesystem-backed ledger store.
///
/// Cheap to clone; clones share locks. Blocking I/O runs on the tokio
/// blocking pool.
#[derive(Clone)]
pub struct FsStore {
    inner: Arc<FsLayout>,
}

struct FsLayout {
    root: PathBuf,
    options: FsOptions,
    locks: LockTable,
}

/// One mutex per file path, held only while some caller uses it.
#[derive(Default)]
struct LockTable {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LockTable {
    /// Run `f` while holding the lock for `path`.
    fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self
            .table()
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // clones are only taken under the table lock, so a count of two
        // (table + ours) means nobody else is waiting on this path
        let mut table = self.table();
        if Arc::strong_count(&lock) == 2 {
            table.remove(path);
        }
        result
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

impl FsStore {
    /// Open (creating if needed) a ledger rooted at `root`.
    pub fn open(root: impl AsRef<Path>, options: FsOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [ENTRIES_DIR, LOG_DIR, INDEX_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        tracing::debug!(root = %root.display(), "opened filesystem ledger store");
        Ok(Self {
            inner: Arc::new(FsLayout {
                root,
                options,
                locks: LockTable::default(),
            }),
        })
    }

    /// Ledger root directory.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn options(&self) -> &FsOptions {
        &self.inner.options
    }

    /// Path of an entry's record file.
    pub fn record_path(&self, entry_id: &EntryId) -> PathBuf {
        self.inner.record_path(entry_id)
    }

    /// Path of a day's log file.
    pub fn log_path(&self, day: NaiveDate) -> PathBuf {
        self.inner.log_path(day)
    }

    /// Path of a subject's index file.
    pub fn index_path(&self, subject_ref: &str) -> PathBuf {
        self.inner.index_path(subject_ref)
    }

    /// Replay every per-entry record and restore missing log lines and index
    /// memberships.
    ///
    /// Meant for a quiescent store, e.g. after a [`StoreError::PartialCommit`].
    /// Existing log lines and index entries are never removed or reordered.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.reconcile()).await?
    }

    /// Discard the subject index and rebuild it from the per-entry records.
    ///
    /// Memberships are rebuilt in issuance order. Meant for a quiescent store.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.rebuild_index()).await?
    }
}

impl FsLayout {
    fn record_path(&self, entry_id: &EntryId) -> PathBuf {
        self.root.join(ENTRIES_DIR).join(format!("{entry_id}.json"))
    }

    fn log_path(&self, day: NaiveDate) -> PathBuf {
        self.root
            .join(LOG_DIR)
            .join(format!("{}.jsonl", day.format("%Y-%m-%d")))
    }

    fn index_path(&self, subject_ref: &str) -> PathBuf {
        let hash = subject_ref_hash(subject_ref);
        self.root
            .join(INDEX_DIR)
            .join(bucket_prefix(&hash, self.options.index_prefix_len))
            .join(format!("{hash}.json"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    fn append(&self, entry: &SealedEntry) -> Result<AppendResult> {
        let day = placement(entry)?;
        let entry_id = entry.entry_id();
        let mut line = entry.to_bytes();
        line.push(b'\n');

        if !self.write_record(entry_id, &line)? {
            tracing::debug!(%entry_id, "duplicate entry id, nothing written");
            return Ok(AppendResult::Duplicate);
        }

        self.append_log_line(day, &line).map_err(|e| {
            tracing::error!(%entry_id, error = %e, "daily log append failed after commit");
            StoreError::partial(entry_id, CommitStage::DailyLog, e)
        })?;

        self.add_to_index(entry.subject_ref(), entry_id)
            .map_err(|e| {
                tracing::error!(%entry_id, error = %e, "index update failed after commit");
                StoreError::partial(entry_id, CommitStage::SubjectIndex, e)
            })?;

        tracing::debug!(%entry_id, %day, "committed entry");
        Ok(AppendResult::Committed)
    }

    /// Create the record file if absent. Returns false if it already existed.
    fn write_record(&self, entry_id: &EntryId, bytes: &[u8]) -> Result<bool> {
        let path = self.record_path(entry_id);
        if path.exists() {
            return Ok(false);
        }
        let dir = self.root.join(ENTRIES_DIR);
        let tmp = self.write_temp(&dir, bytes)?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                // committed; a failed directory sync must not report otherwise
                if let Err(e) = self.sync_dir(&dir) {
                    tracing::warn!(%entry_id, error = %e, "entries directory sync failed");
                }
                Ok(true)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        }
    }

    /// Append one line to the day's log in a single write.
    ///
    /// A torn final line left by an earlier crash is terminated first, so it
    /// never swallows this one. A failed write is truncated away.
    fn append_log_line(&self, day: NaiveDate, line: &[u8]) -> Result<()> {
        let path = self.log_path(day);
        self.locks.with_lock(&path, || -> Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(&path)?;
            let len = file.metadata()?.len();

            let mut buf = Vec::with_capacity(line.len() + 1);
            if len > 0 && last_byte(&mut file)? != b'\n' {
                tracing::warn!(path = %path.display(), "daily log ends in a torn line");
                buf.push(b'\n');
            }
            buf.extend_from_slice(line);

            if let Err(e) = file.write_all(&buf) {
                if let Err(trunc) = file.set_len(len) {
                    tracing::error!(path = %path.display(), error = %trunc, "could not truncate failed log write");
                }
                return Err(e.into());
            }
            if self.options.fsync {
                file.sync_data()?;
            }
            Ok(())
        })
    }

    /// Add `entry_id` to the subject's index file. Returns whether it was added.
    fn add_to_index(&self, subject_ref: &str, entry_id: &EntryId) -> Result<bool> {
        let path = self.index_path(subject_ref);
        self.locks
            .with_lock(&path, || self.write_index(&path, subject_ref, entry_id))
    }

    fn write_index(&self, path: &Path, subject_ref: &str, entry_id: &EntryId) -> Result<bool> {
        let mut record = read_index(path)?.unwrap_or_else(|| SubjectIndexRecord::new(subject_ref));
        if record.subject_ref != subject_ref {
            return Err(StoreError::InvalidData(format!(
                "index file {} belongs to a different subject",
                path.display()
            )));
        }
        if !record.insert(entry_id) {
            return Ok(false);
        }

        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidData(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec(&record)?;
        let tmp = self.write_temp(dir, &bytes)?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        self.sync_dir(dir)?;
        Ok(true)
    }

    fn write_temp(&self, dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        if self.options.fsync {
            tmp.as_file().sync_all()?;
        }
        Ok(tmp)
    }

    fn sync_dir(&self, dir: &Path) -> Result<()> {
        if self.options.fsync && cfg!(unix) {
            File::open(dir)?.sync_all()?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    fn get(&self, entry_id: &EntryId) -> Result<Option<SealedEntry>> {
        if !entry_id.is_path_safe() {
            return Ok(None);
        }
        let path = self.record_path(entry_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry = SealedEntry::from_json(text.trim_end())?;
        if entry.entry_id() != entry_id {
            return Err(StoreError::InvalidData(format!(
                "record {} holds entry {}",
                path.display(),
                entry.entry_id()
            )));
        }
        Ok(Some(entry))
    }

    fn lookup(&self, subject_ref: &str) -> Result<Vec<EntryId>> {
        let path = self.index_path(subject_ref);
        Ok(read_index(&path)?
            .filter(|record| record.subject_ref == subject_ref)
            .map(|record| record.entry_ids)
            .unwrap_or_default())
    }

    /// Log entries for a day; a repeated id keeps its first line.
    ///
    /// Lines that do not parse (a write torn by a crash) are skipped;
    /// [`FsStore::reconcile`] restores their entries from the records.
    fn entries_for_day(&self, day: NaiveDate) -> Result<Vec<SealedEntry>> {
        let path = self.log_path(day);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (n, line) in text.lines().enumerate().filter(|(_, l)| !l.is_empty()) {
            let entry = match SealedEntry::from_json(line) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(path = %path.display(), line = n + 1, error = %e, "skipping unreadable log line");
                    continue;
                }
            };
            if seen.insert(entry.entry_id().clone()) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn entry_ids(&self) -> Result<Vec<EntryId>> {
        let mut ids = Vec::new();
        for item in fs::read_dir(self.root.join(ENTRIES_DIR))? {
            let name = item?.file_name();
            // temp files are dot-prefixed and have no .json suffix
            let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let id = EntryId::new(id);
            if id.is_path_safe() {
                ids.push(id);
            } else {
                tracing::warn!(file = ?name, "ignoring record file with an unsafe name");
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load_all(&self) -> Result<Vec<SealedEntry>> {
        let mut entries = Vec::new();
        for id in self.entry_ids()? {
            if let Some(entry) = self.get(&id)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Repair
    // ─────────────────────────────────────────────────────────────────────────

    fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut logged: HashMap<NaiveDate, HashSet<EntryId>> = HashMap::new();

        for entry in self.load_all()? {
            report.records_scanned += 1;
            let day = placement(&entry)?;

            if !logged.contains_key(&day) {
                let ids = self
                    .entries_for_day(day)?
                    .into_iter()
                    .map(|e| e.entry_id().clone())
                    .collect();
                logged.insert(day, ids);
            }
            let ids = logged.entry(day).or_default();
            if !ids.contains(entry.entry_id()) {
                let mut line = entry.to_bytes();
                line.push(b'\n');
                self.append_log_line(day, &line)?;
                ids.insert(entry.entry_id().clone());
                tracing::warn!(entry_id = %entry.entry_id(), %day, "restored missing daily log line");
                report.log_lines_added += 1;
            }

            if self.add_to_index(entry.subject_ref(), entry.entry_id())? {
                tracing::warn!(entry_id = %entry.entry_id(), "restored missing index membership");
                report.index_entries_added += 1;
            }
        }

        tracing::info!(
            records = report.records_scanned,
            log_lines_added = report.log_lines_added,
            index_entries_added = report.index_entries_added,
            "reconciled ledger"
        );
        Ok(report)
    }

    fn rebuild_index(&self) -> Result<usize> {
        let index_dir = self.root.join(INDEX_DIR);
        match fs::remove_dir_all(&index_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&index_dir)?;

        let mut entries = self.load_all()?;
        entries.sort_by(|a, b| {
            (a.issued_at(), a.entry_id()).cmp(&(b.issued_at(), b.entry_id()))
        });
        let mut added = 0;
        for entry in &entries {
            if self.add_to_index(entry.subject_ref(), entry.entry_id())? {
                added += 1;
            }
        }
        tracing::info!(memberships = added, "rebuilt subject index");
        Ok(added)
    }
}

fn last_byte(file: &mut File) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_index(path: &Path) -> Result<Option<SubjectIndexRecord>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl LedgerStore for FsStore {
    async fn append(&self, entry: &SealedEntry) -> Result<AppendResult> {
        let inner = self.inner.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || inner.append(&entry)).await?
    }

    async fn get(&self, entry_id: &EntryId) -> Result<Option<SealedEntry>> {
        let inner = self.inner.clone();
        let entry_id = entry_id.clone();
        tokio::task::spawn_blocking(move || inner.get(&entry_id)).await?
    }

    async fn lookup_by_subject_ref(&self, subject_ref: &str) -> Result<Vec<EntryId>> {
        let inner = self.inner.clone();
        let subject_ref = subject_ref.to_string();
        tokio::task::spawn_blocking(move || inner.lookup(&subject_ref)).await?
    }

    async fn contains(&self, entry_id: &EntryId) -> Result<bool> {
        if !entry_id.is_path_safe() {
            return Ok(false);
        }
        let path = self.inner.record_path(entry_id);
        tokio::task::spawn_blocking(move || path.try_exists().map_err(StoreError::from)).await?
    }

    async fn entries_for_day(&self, day: NaiveDate) -> Result<Vec<SealedEntry>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.entries_for_day(day)).await?
    }

    async fn entry_ids(&self) -> Result<Vec<EntryId>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.entry_ids()).await?
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entry_ids().await?.len() as u64)
    }
}
