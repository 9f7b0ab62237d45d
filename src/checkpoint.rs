//! # Checkpoint — Resumable Snapshot Persistence
//!
//! Persists [`ResultSnapshot`]s as versioned records and restores the most
//! advanced one at startup. A record is identified by its frontier; the
//! "latest" snapshot is the one with the numerically largest frontier, never
//! the most recently modified file.
//!
//! ## On-Disk Format
//!
//! [`DirectoryStore`] keeps one `<frontier>.prime` file per snapshot in a
//! directory. Each file holds one decimal prime per line, ascending. The
//! prime 2 is written first for completeness of the file but is never loaded
//! back: the engine treats 2 as implicit and stores every odd prime from 3.
//!
//! ## Atomic Writes
//!
//! Files are written to a `.tmp` sibling and renamed into place, so a crash
//! mid-write never leaves a truncated snapshot under a valid name.
//!
//! ## Recovery
//!
//! Loading never fails. A listing error, an unparsable file name, unreadable
//! content or values that cannot belong to the named frontier all fall back to
//! the initial snapshot `{frontier = 3, known = {3}}` with a warning.
//!
//! ## Retention
//!
//! Every save adds a file. [`prune`] keeps only the highest few snapshots.

use crate::snapshot::{ResultSnapshot, INITIAL_FRONTIER};
use anyhow::{bail, Context, Result};
use rug::Integer;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const FILE_EXTENSION: &str = "prime";

pub const DEFAULT_DIRECTORY: &str = "primes";

/// Number of snapshots kept by default after a save.
pub const DEFAULT_KEEP: usize = 3;

/// Versioned snapshot storage keyed by frontier.
pub trait SnapshotStore {
    /// Frontiers of every stored snapshot, in no particular order.
    fn list_ids(&self) -> Result<Vec<Integer>>;

    /// Values stored under `id`, in stored order.
    fn load_by_id(&self, id: &Integer) -> Result<Vec<Integer>>;

    /// Store `values` under `id`, replacing any previous record.
    fn write(&self, id: &Integer, values: &mut dyn Iterator<Item = &Integer>) -> Result<()>;

    fn remove(&self, id: &Integer) -> Result<()>;
}

/// Directory of `<frontier>.prime` files.
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &Integer) -> PathBuf {
        self.dir.join(format!("{}.{}", id, FILE_EXTENSION))
    }
}

impl SnapshotStore for DirectoryStore {
    fn list_ids(&self) -> Result<Vec<Integer>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || path.extension() != Some(OsStr::new(FILE_EXTENSION)) {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(OsStr::to_str)
                .with_context(|| format!("non-UTF-8 snapshot name {}", path.display()))?;
            let id: Integer = stem
                .parse()
                .with_context(|| format!("snapshot name {} is not an integer", path.display()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_by_id(&self, id: &Integer) -> Result<Vec<Integer>> {
        let path = self.path_for(id);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| {
                line.parse::<Integer>().with_context(|| {
                    format!("{} record {}: {:?} is not an integer", path.display(), i + 1, line)
                })
            })
            .collect()
    }

    fn write(&self, id: &Integer, values: &mut dyn Iterator<Item = &Integer>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(id);
        let tmp = self.dir.join(format!("{}.{}.tmp", id, FILE_EXTENSION));

        let file = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        for value in values {
            writeln!(writer, "{}", value)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp, &path).with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, id: &Integer) -> Result<()> {
        let path = self.path_for(id);
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))
    }
}

/// Frontier of the most advanced stored snapshot.
pub fn latest_id(store: &dyn SnapshotStore) -> Result<Option<Integer>> {
    Ok(store.list_ids()?.into_iter().max())
}

/// Load the most advanced snapshot, or the initial one if none is usable.
pub fn load(store: &dyn SnapshotStore) -> ResultSnapshot {
    match try_load(store) {
        Ok(Some(snapshot)) => {
            info!(
                frontier = %snapshot.frontier(),
                known = snapshot.prime_count(),
                "checkpoint loaded"
            );
            snapshot
        }
        Ok(None) => {
            info!("no checkpoint found, starting from {}", INITIAL_FRONTIER);
            ResultSnapshot::initial()
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "checkpoint unusable, starting from {}", INITIAL_FRONTIER);
            ResultSnapshot::initial()
        }
    }
}

/// Like [`load`], but reports why a stored snapshot could not be used.
pub fn try_load(store: &dyn SnapshotStore) -> Result<Option<ResultSnapshot>> {
    let Some(id) = latest_id(store)? else {
        return Ok(None);
    };
    if id < INITIAL_FRONTIER {
        bail!("snapshot frontier {} is below {}", id, INITIAL_FRONTIER);
    }

    // An even frontier verified everything up to the odd value below it.
    let mut frontier = id.clone();
    if frontier.is_even() {
        frontier -= 1u32;
    }

    let mut primes = BTreeSet::new();
    for value in store.load_by_id(&id)? {
        if value == 2 {
            continue;
        }
        if value < INITIAL_FRONTIER || value.is_even() || value > frontier {
            bail!("value {} cannot be an odd prime up to frontier {}", value, frontier);
        }
        primes.insert(value);
    }
    primes.insert(Integer::from(INITIAL_FRONTIER));

    Ok(Some(ResultSnapshot::new(frontier, primes)))
}

/// Store `snapshot` under its frontier: 2, then every known prime, ascending.
pub fn save(store: &dyn SnapshotStore, snapshot: &ResultSnapshot) -> Result<()> {
    let two = Integer::from(2);
    let mut values = std::iter::once(&two).chain(snapshot.known_primes().iter().filter(|p| **p != 2));
    store.write(snapshot.frontier(), &mut values)
}

/// [`save`], logging instead of returning a failure. Returns whether it succeeded.
pub fn save_reporting(store: &dyn SnapshotStore, snapshot: &ResultSnapshot) -> bool {
    match save(store, snapshot) {
        Ok(()) => {
            info!(
                frontier = %snapshot.frontier(),
                primes = snapshot.prime_count(),
                "checkpoint saved"
            );
            true
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), frontier = %snapshot.frontier(), "checkpoint save failed");
            false
        }
    }
}

/// Delete all but the `keep` most advanced snapshots. `keep == 0` keeps all.
pub fn prune(store: &dyn SnapshotStore, keep: usize) -> Result<usize> {
    if keep == 0 {
        return Ok(0);
    }
    let mut ids = store.list_ids()?;
    ids.sort_unstable_by(|a, b| b.cmp(a));
    let mut removed = 0;
    for id in ids.iter().skip(keep) {
        store.remove(id)?;
        removed += 1;
    }
    Ok(removed)
}
