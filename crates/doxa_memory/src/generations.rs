//! Generation Store: versioned persistence of one persona's state
//!
//! Layout under `<data_dir>/<persona>/`:
//! - `generations.json`: manifest holding the `current`, `previous` and
//!   `backup` slots plus a monotonically increasing revision
//! - `archive/philosophy_<revision>_<timestamp>.json`: snapshots pushed out
//!   of the backup slot
//!
//! A save writes the evicted backup to the archive first and then replaces
//! the whole manifest with a single rename, so the three slots always rotate
//! together. A crash before the rename leaves the old manifest intact; the
//! archive write is repeated (to the same file name) on the next save.

use crate::error::{StoreError, StoreResult};
use crate::fsio::{read_json, write_json_atomic};
use chrono::{DateTime, Utc};
use doxa_core::{PersonaState, StateDiff};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "generations.json";
pub const ARCHIVE_PREFIX: &str = "philosophy_";

const LEGACY_CURRENT: &str = "philosophy.json";
const LEGACY_PREVIOUS: &str = "philosophy_previous.json";
const LEGACY_BACKUP: &str = "philosophy_backup.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Current,
    Previous,
    Backup,
}

impl Slot {
    /// Slot reached by rolling back `generations` steps, if any.
    pub fn from_rollback(generations: u32) -> Option<Slot> {
        match generations {
            1 => Some(Slot::Previous),
            2 => Some(Slot::Backup),
            _ => None,
        }
    }
}

/// A persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub saved_at: DateTime<Utc>,
    pub state: PersonaState,
}

impl Generation {
    fn now(state: PersonaState) -> Self {
        Self {
            saved_at: Utc::now(),
            state,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    current: Option<Generation>,
    #[serde(default)]
    previous: Option<Generation>,
    #[serde(default)]
    backup: Option<Generation>,
}

impl Manifest {
    fn slot(&self, slot: Slot) -> Option<&Generation> {
        match slot {
            Slot::Current => self.current.as_ref(),
            Slot::Previous => self.previous.as_ref(),
            Slot::Backup => self.backup.as_ref(),
        }
    }

    fn validate(&self, path: &Path) -> StoreResult<()> {
        for generation in [&self.current, &self.previous, &self.backup].into_iter().flatten() {
            generation
                .state
                .validate()
                .map_err(|source| StoreError::InvalidState {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// An archived snapshot on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    /// Manifest revision at which the snapshot left the backup slot
    pub revision: Option<u64>,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotInfo {
    pub saved_at: DateTime<Utc>,
    pub age_in_days: u32,
}

impl SlotInfo {
    fn of(generation: Option<&Generation>) -> Option<Self> {
        generation.map(|g| SlotInfo {
            saved_at: g.saved_at,
            age_in_days: g.state.age_in_days,
        })
    }
}

/// Per-slot overview of a persona's generations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStatus {
    pub persona: String,
    pub revision: u64,
    pub current: Option<SlotInfo>,
    pub previous: Option<SlotInfo>,
    pub backup: Option<SlotInfo>,
    pub archive_count: usize,
}

/// Generation rotation for a single persona directory.
///
/// Not internally synchronized; callers serialize access per persona through
/// [`crate::PersonaLocks`].
#[derive(Debug, Clone)]
pub struct GenerationStore {
    persona: String,
    dir: PathBuf,
}

impl GenerationStore {
    pub(crate) fn new(persona: &str, dir: PathBuf) -> Self {
        Self {
            persona: persona.to_string(),
            dir,
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join(crate::storage::ARCHIVE_DIR)
    }

    /// Whether any generation has been saved.
    pub fn exists(&self) -> bool {
        self.manifest_path().is_file()
    }

    fn read_manifest(&self) -> StoreResult<Manifest> {
        let path = self.manifest_path();
        let manifest: Manifest = read_json(&path)?.unwrap_or_default();
        manifest.validate(&path)?;
        Ok(manifest)
    }

    fn write_manifest(&self, manifest: &Manifest) -> StoreResult<()> {
        write_json_atomic(&self.manifest_path(), manifest)
    }

    /// The current state, or `None` if nothing was ever saved.
    pub fn load_current(&self) -> StoreResult<Option<PersonaState>> {
        Ok(self.read_manifest()?.current.map(|g| g.state))
    }

    /// The current state, or the default persona state if nothing was saved.
    /// A malformed or out-of-range manifest is an error, never replaced.
    pub fn load_or_default(&self) -> StoreResult<PersonaState> {
        match self.load_current()? {
            Some(state) => Ok(state),
            None => {
                tracing::debug!("No saved generation for '{}', using default state", self.persona);
                Ok(PersonaState::default())
            }
        }
    }

    pub fn slot(&self, slot: Slot) -> StoreResult<Option<Generation>> {
        Ok(self.read_manifest()?.slot(slot).cloned())
    }

    /// Difference between the previous and the current generation, or
    /// `None` until both slots are filled.
    pub fn diff(&self) -> StoreResult<Option<StateDiff>> {
        let manifest = self.read_manifest()?;
        Ok(match (&manifest.previous, &manifest.current) {
            (Some(previous), Some(current)) => Some(StateDiff::between(&previous.state, &current.state)),
            _ => None,
        })
    }

    /// Rotate `state` in as the new current generation.
    /// Returns the new manifest revision.
    pub fn save(&self, state: &PersonaState) -> StoreResult<u64> {
        state
            .validate()
            .map_err(|source| StoreError::InvalidState {
                path: self.manifest_path(),
                source,
            })?;

        let old = self.read_manifest()?;
        if let Some(backup) = &old.backup {
            let path = self
                .archive_dir()
                .join(archive_file_name(old.revision, &backup.saved_at));
            write_json_atomic(&path, backup)?;
            tracing::debug!("Archived backup of '{}' to {}", self.persona, path.display());
        }

        let next = Manifest {
            revision: old.revision + 1,
            current: Some(Generation::now(state.clone())),
            previous: old.current,
            backup: old.previous,
        };
        self.write_manifest(&next)?;
        tracing::info!(
            "Saved generation {} for persona '{}' (age {} days)",
            next.revision,
            self.persona,
            state.age_in_days
        );
        Ok(next.revision)
    }

    /// Copy the snapshot `generations` steps back into the current slot.
    /// `1` restores `previous`, `2` restores `backup`. Any other value, or a
    /// missing slot, returns `Ok(false)` and leaves every slot as it was.
    /// The other slots are not re-rotated.
    pub fn rollback(&self, generations: u32) -> StoreResult<bool> {
        let Some(slot) = Slot::from_rollback(generations) else {
            tracing::warn!("Rollback by {} generations is not supported", generations);
            return Ok(false);
        };
        let mut manifest = self.read_manifest()?;
        let Some(source) = manifest.slot(slot).cloned() else {
            tracing::info!(
                "No generation {} steps back for '{}', nothing rolled back",
                generations,
                self.persona
            );
            return Ok(false);
        };

        manifest.current = Some(Generation::now(source.state));
        manifest.revision += 1;
        self.write_manifest(&manifest)?;
        tracing::info!("Rolled '{}' back {} generation(s)", self.persona, generations);
        Ok(true)
    }

    /// Archived snapshots, oldest revision first.
    pub fn archive_entries(&self) -> StoreResult<Vec<ArchiveEntry>> {
        let dir = self.archive_dir();
        let read_dir = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io { path: dir, source: e }),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(StoreError::io(&dir))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(ARCHIVE_PREFIX) || !name.ends_with(".json") {
                continue;
            }
            let metadata = entry.metadata().map_err(StoreError::io(&path))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().map_err(StoreError::io(&path))?;
            entries.push(ArchiveEntry {
                revision: parse_archive_revision(name),
                modified: DateTime::<Utc>::from(modified),
                path,
            });
        }
        entries.sort_by(|a, b| {
            a.revision
                .cmp(&b.revision)
                .then_with(|| a.modified.cmp(&b.modified))
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(entries)
    }

    pub fn read_archive(&self, entry: &ArchiveEntry) -> StoreResult<Generation> {
        let generation: Generation = read_json(&entry.path)?.ok_or_else(|| StoreError::Io {
            path: entry.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "archive entry vanished"),
        })?;
        generation
            .state
            .validate()
            .map_err(|source| StoreError::InvalidState {
                path: entry.path.clone(),
                source,
            })?;
        Ok(generation)
    }

    /// Delete archived snapshots last modified more than `days_to_keep` days
    /// ago. Returns how many were deleted.
    pub fn cleanup_archive(&self, days_to_keep: u64) -> StoreResult<usize> {
        let cutoff = i64::try_from(days_to_keep)
            .ok()
            .and_then(chrono::Duration::try_days)
            .and_then(|keep| Utc::now().checked_sub_signed(keep));
        let Some(cutoff) = cutoff else {
            return Ok(0);
        };

        let mut deleted = 0;
        for entry in self.archive_entries()? {
            if entry.modified < cutoff {
                fs::remove_file(&entry.path).map_err(StoreError::io(&entry.path))?;
                deleted += 1;
            }
        }
        if deleted > 0 {
            tracing::info!(
                "Deleted {} archived generation(s) of '{}' older than {} days",
                deleted,
                self.persona,
                days_to_keep
            );
        }
        Ok(deleted)
    }

    pub fn status(&self) -> StoreResult<GenerationStatus> {
        let manifest = self.read_manifest()?;
        Ok(GenerationStatus {
            persona: self.persona.clone(),
            revision: manifest.revision,
            current: SlotInfo::of(manifest.current.as_ref()),
            previous: SlotInfo::of(manifest.previous.as_ref()),
            backup: SlotInfo::of(manifest.backup.as_ref()),
            archive_count: self.archive_entries()?.len(),
        })
    }

    /// Import the three-file layout (`philosophy.json`,
    /// `philosophy_previous.json`, `philosophy_backup.json`) found in
    /// `source_dir` as this persona's manifest, then remove those files.
    ///
    /// Does nothing (returns `Ok(false)`) if this persona already has a
    /// manifest or `source_dir` holds no `philosophy.json`.
    pub fn import_legacy(&self, source_dir: &Path) -> StoreResult<bool> {
        if self.exists() {
            return Ok(false);
        }
        let Some(current) = read_legacy(&source_dir.join(LEGACY_CURRENT))? else {
            return Ok(false);
        };
        let previous = read_legacy(&source_dir.join(LEGACY_PREVIOUS))?;
        let backup = read_legacy(&source_dir.join(LEGACY_BACKUP))?;

        let revision = 1 + previous.is_some() as u64 + backup.is_some() as u64;
        let manifest = Manifest {
            revision,
            current: Some(current),
            previous,
            backup,
        };
        self.write_manifest(&manifest)?;

        for name in [LEGACY_CURRENT, LEGACY_PREVIOUS, LEGACY_BACKUP] {
            let path = source_dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io { path, source: e }),
            }
        }
        tracing::info!(
            "Migrated legacy generation files from {} into persona '{}'",
            source_dir.display(),
            self.persona
        );
        Ok(true)
    }
}

fn read_legacy(path: &Path) -> StoreResult<Option<Generation>> {
    let Some(state) = read_json::<PersonaState>(path)? else {
        return Ok(None);
    };
    state.validate().map_err(|source| StoreError::InvalidState {
        path: path.to_path_buf(),
        source,
    })?;
    let saved_at = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(Some(Generation { saved_at, state }))
}

fn archive_file_name(revision: u64, saved_at: &DateTime<Utc>) -> String {
    format!(
        "{}{:06}_{}.json",
        ARCHIVE_PREFIX,
        revision,
        saved_at.format("%Y%m%dT%H%M%S%.3fZ")
    )
}

fn parse_archive_revision(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(ARCHIVE_PREFIX)?
        .split('_')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn store(dir: &tempfile::TempDir) -> GenerationStore {
        GenerationStore::new("alice", dir.path().join("alice"))
    }

    fn state_with_age(age: u32) -> PersonaState {
        PersonaState {
            age_in_days: age,
            ..PersonaState::default()
        }
    }

    fn current_age(store: &GenerationStore, slot: Slot) -> Option<u32> {
        store.slot(slot).unwrap().map(|g| g.state.age_in_days)
    }

    #[test]
    fn test_three_saves_fill_slots_without_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=3 {
            store.save(&state_with_age(age)).unwrap();
        }
        assert_eq!(current_age(&store, Slot::Current), Some(3));
        assert_eq!(current_age(&store, Slot::Previous), Some(2));
        assert_eq!(current_age(&store, Slot::Backup), Some(1));
        assert!(store.archive_entries().unwrap().is_empty());
    }

    #[test]
    fn test_fourth_save_archives_oldest() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=4 {
            store.save(&state_with_age(age)).unwrap();
        }
        assert_eq!(current_age(&store, Slot::Current), Some(4));
        assert_eq!(current_age(&store, Slot::Previous), Some(3));
        assert_eq!(current_age(&store, Slot::Backup), Some(2));

        let archive = store.archive_entries().unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].revision, Some(3));
        let archived = store.read_archive(&archive[0]).unwrap();
        assert_eq!(archived.state.age_in_days, 1);
    }

    #[test]
    fn test_archive_is_ordered_oldest_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=6 {
            store.save(&state_with_age(age)).unwrap();
        }
        let ages: Vec<u32> = store
            .archive_entries()
            .unwrap()
            .iter()
            .map(|e| store.read_archive(e).unwrap().state.age_in_days)
            .collect();
        assert_eq!(ages, vec![1, 2, 3]);
    }

    #[test]
    fn test_rollback_one_restores_previous() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=4 {
            store.save(&state_with_age(age)).unwrap();
        }
        assert!(store.rollback(1).unwrap());
        assert_eq!(current_age(&store, Slot::Current), Some(3));
        // Skipped slots are not re-rotated
        assert_eq!(current_age(&store, Slot::Previous), Some(3));
        assert_eq!(current_age(&store, Slot::Backup), Some(2));
    }

    #[test]
    fn test_diff_compares_previous_with_current() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.diff().unwrap().is_none());
        store.save(&state_with_age(1)).unwrap();
        assert!(store.diff().unwrap().is_none());

        let mut moved = state_with_age(2);
        moved.stance.economic_axis = 0.25;
        store.save(&moved).unwrap();
        let diff = store.diff().unwrap().unwrap();
        assert_eq!((diff.age_before, diff.age_after), (1, 2));
        assert!(diff.economic_delta() > 0.0);
    }

    #[test]
    fn test_rollback_two_restores_backup() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=3 {
            store.save(&state_with_age(age)).unwrap();
        }
        assert!(store.rollback(2).unwrap());
        assert_eq!(current_age(&store, Slot::Current), Some(1));
    }

    #[test]
    fn test_rollback_unsupported_or_missing_is_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=4 {
            store.save(&state_with_age(age)).unwrap();
        }
        let before = std::fs::read(store.manifest_path()).unwrap();
        assert!(!store.rollback(3).unwrap());
        assert!(!store.rollback(0).unwrap());
        assert_eq!(std::fs::read(store.manifest_path()).unwrap(), before);

        let dir = tempfile::TempDir::new().unwrap();
        let fresh = GenerationStore::new("bob", dir.path().join("bob"));
        fresh.save(&state_with_age(1)).unwrap();
        assert!(!fresh.rollback(1).unwrap());
        assert!(!fresh.rollback(2).unwrap());
        assert_eq!(current_age(&fresh, Slot::Current), Some(1));
    }

    #[test]
    fn test_load_or_default_without_saves() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        assert!(!store.exists());
        assert!(store.load_current().unwrap().is_none());
        assert_eq!(store.load_or_default().unwrap(), PersonaState::default());
    }

    #[test]
    fn test_malformed_manifest_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(dir.path().join("alice")).unwrap();
        std::fs::write(store.manifest_path(), "{ broken").unwrap();
        assert!(matches!(store.load_or_default(), Err(StoreError::Malformed { .. })));
        assert!(store.save(&PersonaState::default()).is_err());
    }

    #[test]
    fn test_out_of_range_manifest_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&PersonaState::default()).unwrap();
        let text = std::fs::read_to_string(store.manifest_path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["current"]["state"]["bias"]["recency"] = serde_json::json!(1.7);
        std::fs::write(store.manifest_path(), value.to_string()).unwrap();
        assert!(matches!(store.load_current(), Err(StoreError::InvalidState { .. })));
    }

    #[test]
    fn test_save_rejects_invalid_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        let mut state = PersonaState::default();
        state.stance.economic_axis = 2.0;
        assert!(matches!(store.save(&state), Err(StoreError::InvalidState { .. })));
        assert!(!store.exists());
    }

    #[test]
    fn test_cleanup_archive_by_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        for age in 1..=6 {
            store.save(&state_with_age(age)).unwrap();
        }
        let entries = store.archive_entries().unwrap();
        assert_eq!(entries.len(), 3);

        let old = SystemTime::now() - Duration::from_secs(40 * 86_400);
        for entry in &entries[..2] {
            let file = std::fs::File::options().write(true).open(&entry.path).unwrap();
            file.set_modified(old).unwrap();
        }

        assert_eq!(store.cleanup_archive(30).unwrap(), 2);
        let remaining = store.archive_entries().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path, entries[2].path);
        assert_eq!(store.cleanup_archive(30).unwrap(), 0);
    }

    #[test]
    fn test_status_reports_slots() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        let empty = store.status().unwrap();
        assert_eq!(empty.revision, 0);
        assert!(empty.current.is_none());

        for age in 1..=4 {
            store.save(&state_with_age(age)).unwrap();
        }
        let status = store.status().unwrap();
        assert_eq!(status.persona, "alice");
        assert_eq!(status.revision, 4);
        assert_eq!(status.current.as_ref().map(|s| s.age_in_days), Some(4));
        assert_eq!(status.backup.as_ref().map(|s| s.age_in_days), Some(2));
        assert_eq!(status.archive_count, 1);
    }

    #[test]
    fn test_import_legacy_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let legacy_dir = dir.path().join("legacy");
        std::fs::create_dir_all(&legacy_dir).unwrap();
        for (name, age) in [(LEGACY_CURRENT, 9), (LEGACY_PREVIOUS, 8)] {
            let json = serde_json::to_string(&state_with_age(age)).unwrap();
            std::fs::write(legacy_dir.join(name), json).unwrap();
        }

        let store = store(&dir);
        assert!(store.import_legacy(&legacy_dir).unwrap());
        assert_eq!(current_age(&store, Slot::Current), Some(9));
        assert_eq!(current_age(&store, Slot::Previous), Some(8));
        assert!(store.slot(Slot::Backup).unwrap().is_none());
        assert!(!legacy_dir.join(LEGACY_CURRENT).exists());
        assert!(!legacy_dir.join(LEGACY_PREVIOUS).exists());

        // Second import is a no-op
        assert!(!store.import_legacy(&legacy_dir).unwrap());
    }

    #[test]
    fn test_archive_name_roundtrip() {
        let name = archive_file_name(42, &Utc::now());
        assert!(name.starts_with("philosophy_000042_"));
        assert_eq!(parse_archive_revision(&name), Some(42));
        assert_eq!(parse_archive_revision("philosophy_2024_1_2_3_4.json"), Some(2024));
        assert_eq!(parse_archive_revision("other.json"), None);
    }
}
