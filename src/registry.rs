//! A thread-safe in-memory registry of feature flags. [`Registry`] provides concurrent access for
//! readers (flag evaluation, listing) and exclusive access for writers (create, update, delete,
//! snapshot load).
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::Flag;

/// `Registry` is the single source of truth for all flags of a process.
///
/// Every write replaces a whole [`Flag`] record under the write lock, so readers never observe a
/// partially applied write. There is no per-flag locking: a write to one flag serializes with all
/// reads and writes of every other flag.
#[derive(Debug, Default)]
pub struct Registry {
    flags: RwLock<HashMap<String, Flag>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Create a registry holding the bootstrap flags.
    ///
    /// These are used when there is no snapshot to load: `new-homepage` is disabled globally but
    /// enabled for two users and two regions, `beta-dashboard` is enabled for everyone.
    pub fn with_defaults() -> Self {
        Registry::from_flags(default_flags())
    }

    /// Create a registry holding `flags`. Later flags replace earlier ones with the same name.
    pub fn from_flags(flags: impl IntoIterator<Item = Flag>) -> Self {
        Registry {
            flags: RwLock::new(index_by_name(flags)),
        }
    }

    /// Get a copy of the flag stored under `name`.
    pub fn get(&self, name: &str) -> Option<Flag> {
        self.read().get(name).cloned()
    }

    /// Get a copy of every flag. The order is unspecified.
    pub fn list(&self) -> Vec<Flag> {
        self.read().values().cloned().collect()
    }

    /// Number of flags in the registry.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the registry holds no flags.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Insert `flag`, wholly replacing any flag with the same name.
    pub fn put(&self, flag: Flag) {
        self.write().insert(flag.name.clone(), flag);
    }

    /// Replace the flag stored under `name`, but only if one exists.
    ///
    /// Returns `false` and leaves the registry unchanged if there is no such flag.
    pub fn update_if_exists(
        &self,
        name: &str,
        enabled: bool,
        target_users: Vec<String>,
        target_regions: Vec<String>,
    ) -> bool {
        // Constructing new value before requesting the lock to minimize lock span.
        let flag = Flag {
            name: name.to_owned(),
            enabled,
            target_users,
            target_regions,
        };

        match self.write().get_mut(name) {
            Some(slot) => {
                *slot = flag;
                true
            }
            None => false,
        }
    }

    /// Remove the flag stored under `name`. Returns `false` if there was none.
    pub fn delete(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Replace the entire contents of the registry with `flags`, returning the previous contents.
    ///
    /// Nothing is merged: flags absent from `flags` are gone afterwards.
    pub fn replace_all(&self, flags: impl IntoIterator<Item = Flag>) -> HashMap<String, Flag> {
        let new_value = index_by_name(flags);
        std::mem::replace(&mut *self.write(), new_value)
    }

    // Every write is a single map operation, so a writer that panicked cannot have left the map
    // half-updated and the poisoned guard is safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Flag>> {
        self.flags.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Flag>> {
        self.flags.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn index_by_name(flags: impl IntoIterator<Item = Flag>) -> HashMap<String, Flag> {
    flags
        .into_iter()
        .map(|flag| (flag.name.clone(), flag))
        .collect()
}

fn default_flags() -> [Flag; 2] {
    [
        Flag::new("new-homepage", false)
            .target_users(["123", "456"])
            .target_regions(["us", "ca"]),
        Flag::new("beta-dashboard", true),
    ]
}
