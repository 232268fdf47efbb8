//! Tracked-Set Store
//!
//! The set lives in a line-oriented text file, one canonical identifier per
//! line. Readers are served from an in-memory snapshot that is swapped only
//! after the file has been durably replaced, so `list()` never observes a
//! half-written state. Mutations are serialized by a single writer lock.

use crate::error::{OracleError, Result};
use crate::models::ValidatorId;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type TrackedSet = BTreeSet<ValidatorId>;

pub struct TrackedSetStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    snapshot: RwLock<Arc<TrackedSet>>,
}

impl TrackedSetStore {
    /// Open the store at `path`, loading any previously committed set.
    ///
    /// A missing file is an empty set. An unreadable (non-UTF-8) file is
    /// treated as empty with a warning; individual unparseable lines are
    /// skipped with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let set = load(&path)?;

        info!(
            path = %path.display(),
            validators = set.len(),
            "tracked set loaded"
        );

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            snapshot: RwLock::new(Arc::new(set)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add an identifier. Returns `Ok(false)` if it was already tracked.
    pub fn add(&self, raw: &str) -> Result<bool> {
        let id = ValidatorId::parse(raw)?;
        self.mutate(|set| set.insert(id.clone()))
            .map(|changed| {
                if changed {
                    info!(validator = %id, "validator added to tracked set");
                } else {
                    debug!(validator = %id, "validator already tracked");
                }
                changed
            })
    }

    /// Remove an identifier. Returns `Ok(false)` if it was not tracked.
    pub fn remove(&self, raw: &str) -> Result<bool> {
        let id = ValidatorId::parse(raw)?;
        self.mutate(|set| set.remove(&id)).map(|changed| {
            if changed {
                info!(validator = %id, "validator removed from tracked set");
            } else {
                debug!(validator = %id, "validator was not tracked");
            }
            changed
        })
    }

    /// Point-in-time snapshot of the committed set.
    pub fn list(&self) -> Arc<TrackedSet> {
        self.snapshot.read().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mutate<F>(&self, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut TrackedSet) -> bool,
    {
        let _guard = self.write_lock.lock();

        let mut next = (**self.snapshot.read()).clone();
        if !apply(&mut next) {
            return Ok(false);
        }

        write_atomic(&self.path, &next)?;
        *self.snapshot.write() = Arc::new(next);
        Ok(true)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn load(path: &Path) -> Result<TrackedSet> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TrackedSet::new()),
        Err(e) => return Err(OracleError::store_io(path, e)),
    };

    let Ok(text) = String::from_utf8(bytes) else {
        warn!(
            path = %path.display(),
            "tracked set file is not valid UTF-8; starting with an empty set"
        );
        return Ok(TrackedSet::new());
    };

    let mut set = TrackedSet::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match ValidatorId::parse(line) {
            Ok(id) => {
                set.insert(id);
            }
            Err(e) => warn!(
                path = %path.display(),
                line = lineno + 1,
                error = %e,
                "skipping unparseable tracked set entry"
            ),
        }
    }
    Ok(set)
}

/// Write to a sibling temp file, fsync, then rename over the target.
fn write_atomic(path: &Path, set: &TrackedSet) -> Result<()> {
    let tmp = temp_path(path);

    let write = || -> std::io::Result<()> {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        for id in set {
            writeln!(writer, "{}", id.as_str())?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&tmp, path)
    };

    if let Err(e) = write() {
        let _ = fs::remove_file(&tmp);
        return Err(OracleError::store_io(path, e));
    }

    // Persist the rename itself; not every platform lets a directory be opened.
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
    }

    Ok(())
}
