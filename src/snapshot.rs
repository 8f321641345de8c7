//! Durable snapshot of a [`Registry`].
//!
//! The snapshot is a single JSON document mapping flag names to [`Flag`] records. It is always
//! read and written as a whole: loading replaces the registry contents, saving overwrites the
//! previous snapshot.
use std::{
    collections::{BTreeMap, HashMap},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tempfile::NamedTempFile;

use crate::{Error, Flag, Registry, Result};

/// Outcome of [`Snapshot::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// There was no snapshot; the registry was left untouched.
    Missing,
    /// The registry was replaced with this many flags from the snapshot.
    Loaded(usize),
}

/// Permissions of a saved snapshot.
#[cfg(unix)]
const SNAPSHOT_MODE: u32 = 0o644;

/// A snapshot location on disk.
#[derive(Debug)]
pub struct Snapshot {
    path: PathBuf,
    /// Held from copying the registry until the file is renamed, so saves land in the order they
    /// read the registry.
    save_lock: Mutex<()>,
}

impl Snapshot {
    /// Use the file at `path` as snapshot location.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Snapshot {
            path: path.into(),
            save_lock: Mutex::new(()),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the contents of `registry` with the snapshot.
    ///
    /// A missing snapshot is not an error. A snapshot that cannot be parsed fails with
    /// [`Error::MalformedSnapshot`] and leaves `registry` untouched.
    pub fn load(&self, registry: &Registry) -> Result<LoadOutcome> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!(target: "flagpole", path:display = self.path.display(); "no flag snapshot to load");
                return Ok(LoadOutcome::Missing);
            }
            Err(err) => return Err(err.into()),
        };

        let flags = parse(&data).inspect_err(|err| {
            log::warn!(target: "flagpole",
                       path:display = self.path.display();
                       "failed to parse flag snapshot: {:?}", err);
        })?;

        let count = flags.len();
        registry.replace_all(flags);

        log::debug!(target: "flagpole", path:display = self.path.display(), count; "loaded flag snapshot");
        Ok(LoadOutcome::Loaded(count))
    }

    /// Write the full contents of `registry` to the snapshot, replacing any previous one.
    ///
    /// The registry lock is only held while copying the flags out; the file is written to a
    /// temporary sibling and renamed over the snapshot, so a reader of the file sees either the
    /// old or the new snapshot. Concurrent saves are serialized, so an older copy of the registry
    /// never replaces a newer one.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        // The guarded value is `()`, so a panicked saver leaves nothing inconsistent behind.
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let flags: BTreeMap<String, Flag> = registry
            .list()
            .into_iter()
            .map(|flag| (flag.name.clone(), flag))
            .collect();

        let mut data = serde_json::to_vec_pretty(&flags).map_err(std::io::Error::from)?;
        data.push(b'\n');

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::{fs::Permissions, os::unix::fs::PermissionsExt};
            // Temporary files are created owner-only; the snapshot is meant to be readable.
            file.as_file()
                .set_permissions(Permissions::from_mode(SNAPSHOT_MODE))?;
        }
        file.write_all(&data)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;

        log::debug!(target: "flagpole",
                    path:display = self.path.display(),
                    count = flags.len();
                    "saved flag snapshot");
        Ok(())
    }
}

/// Parse a snapshot document. The map key is the authoritative flag name.
fn parse(data: &[u8]) -> Result<Vec<Flag>> {
    let entries: HashMap<String, Flag> = serde_json::from_slice(data)?;

    entries
        .into_iter()
        .map(|(name, mut flag)| {
            if name.is_empty() {
                return Err(Error::InvalidFlagName);
            }
            if flag.name != name {
                log::warn!(target: "flagpole",
                           key:display = name,
                           record_name:display = flag.name;
                           "snapshot record name differs from its key, using the key");
                flag.name = name;
            }
            Ok(flag)
        })
        .collect()
}
