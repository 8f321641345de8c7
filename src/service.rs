use std::sync::Arc;

use crate::{
    snapshot::{LoadOutcome, Snapshot},
    Error, Evaluation, Flag, Registry, Result,
};

/// A [`Registry`] bound to its [`Snapshot`].
///
/// Every successful mutation is saved before it is acknowledged. If the save fails, the error is
/// returned but the in-memory mutation stays applied; the next successful save brings the
/// snapshot back in line with memory.
///
/// # Examples
/// ```
/// # use std::sync::Arc;
/// # use flagpole::{Flag, FlagService, Registry, Snapshot};
/// # let dir = tempfile::tempdir().unwrap();
/// let service = FlagService::new(
///     Arc::new(Registry::with_defaults()),
///     Snapshot::new(dir.path().join("flags.json")),
/// );
/// service.create(Flag::new("dark-mode", false).target_users(["42"])).unwrap();
///
/// let evaluation = service.evaluate("dark-mode", "42", "").unwrap();
/// assert!(evaluation.enabled);
/// ```
pub struct FlagService {
    registry: Arc<Registry>,
    snapshot: Snapshot,
}

impl FlagService {
    /// Create a service over an already populated registry.
    pub fn new(registry: Arc<Registry>, snapshot: Snapshot) -> Self {
        FlagService { registry, snapshot }
    }

    /// Seed a registry with the bootstrap flags, then replace them with the snapshot if one
    /// exists.
    ///
    /// Fails if the snapshot exists but cannot be read or parsed; the service must not start on a
    /// partially loaded registry.
    pub fn open(snapshot: Snapshot) -> Result<Self> {
        let registry = Arc::new(Registry::with_defaults());

        match snapshot.load(&registry)? {
            LoadOutcome::Missing => {
                log::info!(target: "flagpole",
                           path:display = snapshot.path().display();
                           "no flag snapshot found, starting with default flags");
            }
            LoadOutcome::Loaded(count) => {
                log::info!(target: "flagpole",
                           path:display = snapshot.path().display(),
                           count;
                           "loaded flags from snapshot");
            }
        }

        Ok(FlagService::new(registry, snapshot))
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The snapshot location mutations are saved to.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Evaluate a flag for the given user and region. See [`Registry::evaluate`].
    pub fn evaluate(&self, flag_name: &str, user_id: &str, region: &str) -> Option<Evaluation> {
        self.registry.evaluate(flag_name, user_id, region)
    }

    /// Get a flag by name.
    pub fn get(&self, name: &str) -> Option<Flag> {
        self.registry.get(name)
    }

    /// All flags, in unspecified order.
    pub fn list(&self) -> Vec<Flag> {
        self.registry.list()
    }

    /// Create `flag`, replacing any flag of the same name, then save.
    pub fn create(&self, flag: Flag) -> Result<()> {
        if flag.name.is_empty() {
            return Err(Error::InvalidFlagName);
        }

        let name = flag.name.clone();
        self.registry.put(flag);
        log::info!(target: "flagpole", flag_name:display = name; "created flag");

        self.save()
    }

    /// Replace the existing flag `name`, then save.
    ///
    /// Returns `Ok(false)` without saving if there is no such flag.
    pub fn update(
        &self,
        name: &str,
        enabled: bool,
        target_users: Vec<String>,
        target_regions: Vec<String>,
    ) -> Result<bool> {
        if !self
            .registry
            .update_if_exists(name, enabled, target_users, target_regions)
        {
            return Ok(false);
        }
        log::info!(target: "flagpole", flag_name = name; "updated flag");

        self.save()?;
        Ok(true)
    }

    /// Delete flag `name`, then save.
    ///
    /// Returns `Ok(false)` without saving if there is no such flag.
    pub fn delete(&self, name: &str) -> Result<bool> {
        if !self.registry.delete(name) {
            return Ok(false);
        }
        log::info!(target: "flagpole", flag_name = name; "deleted flag");

        self.save()?;
        Ok(true)
    }

    /// Save the current registry contents to the snapshot.
    pub fn save(&self) -> Result<()> {
        self.snapshot.save(&self.registry).inspect_err(|err| {
            log::warn!(target: "flagpole",
                       path:display = self.snapshot.path().display();
                       "failed to save flag snapshot, in-memory flags are ahead of disk: {:?}", err);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use super::FlagService;
    use crate::{Error, Flag, Registry, Snapshot};

    fn service_in(dir: &tempfile::TempDir) -> FlagService {
        FlagService::open(Snapshot::new(dir.path().join("flags.json"))).unwrap()
    }

    #[test]
    fn open_without_snapshot_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let service = service_in(&dir);

        assert_eq!(service.list().len(), 2);
        assert!(!dir.path().join("flags.json").exists());
    }

    #[test]
    fn open_with_snapshot_replaces_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("flags.json"),
            r#"{"from-disk": {"Name": "from-disk", "Enabled": true}}"#,
        )
        .unwrap();

        let service = service_in(&dir);

        assert_eq!(service.list(), vec![Flag::new("from-disk", true)]);
    }

    #[test]
    fn open_fails_on_malformed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("flags.json"), "[1, 2").unwrap();

        let result = FlagService::open(Snapshot::new(dir.path().join("flags.json")));

        assert!(matches!(result, Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        service
            .create(Flag::new("checkout-v2", false).target_regions(["de"]))
            .unwrap();
        assert!(service
            .update("beta-dashboard", false, vec![], vec!["fr".to_owned()])
            .unwrap());
        assert!(service.delete("new-homepage").unwrap());

        let reopened = service_in(&dir);
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(
            reopened.get("checkout-v2"),
            Some(Flag::new("checkout-v2", false).target_regions(["de"]))
        );
        assert_eq!(
            reopened.get("beta-dashboard"),
            Some(Flag::new("beta-dashboard", false).target_regions(["fr"]))
        );
        assert_eq!(reopened.get("new-homepage"), None);
    }

    #[test]
    fn missing_flags_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        assert!(!service.update("missing", true, vec![], vec![]).unwrap());
        assert!(!service.delete("missing").unwrap());
        assert_eq!(service.get("missing"), None);
        assert_eq!(service.evaluate("missing", "", ""), None);
        // Nothing changed, so nothing was saved.
        assert!(!dir.path().join("flags.json").exists());
    }

    #[test]
    fn rejects_empty_flag_name() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(&dir);

        let result = service.create(Flag::new("", true));

        assert!(matches!(result, Err(Error::InvalidFlagName)));
        assert_eq!(service.get(""), None);
    }

    #[test]
    fn concurrent_creates_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(service_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    for j in 0..10 {
                        service
                            .create(Flag::new(format!("flag-{i}-{j}"), j % 2 == 0))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = service_in(&dir);
        let mut on_disk = reopened.list();
        let mut in_memory = service.list();
        on_disk.sort_by(|a, b| a.name.cmp(&b.name));
        in_memory.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(in_memory.len(), 82);
        assert_eq!(on_disk, in_memory);
    }

    #[test]
    fn failed_save_keeps_mutation_applied() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::with_defaults());
        let service = FlagService::new(
            registry.clone(),
            Snapshot::new(dir.path().join("missing-dir").join("flags.json")),
        );

        let result = service.create(Flag::new("unsaved", true));

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(registry.get("unsaved"), Some(Flag::new("unsaved", true)));

        let result = service.delete("unsaved");
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(registry.get("unsaved"), None);
    }
}
