//! Check-result caching.
//!
//! A cache entry is valid only while its fingerprint matches the recomputed
//! one. The fingerprint covers the serialized configuration plus the digest
//! of every file matching the `cache_dependencies` globs, so any relevant
//! change invalidates the whole entry. Entries also carry per-file parse
//! snapshots keyed by content digest, letting a rebuild reuse facts for
//! unchanged files.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::parser::ImportFact;
use crate::types::{ParseDiagnostic, Violation};

/// Bumped whenever the serialized entry layout changes.
pub const CACHE_SCHEMA: u32 = 1;

/// SHA-256 fingerprint of everything a check run depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parse state of one source file at the time the entry was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// SHA-256 hex digest of the file content.
    pub digest: String,
    /// Import facts extracted from the file.
    pub facts: Vec<ImportFact>,
    /// Parse error message, if the file failed to parse.
    pub error: Option<String>,
}

/// One cached check run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Entry layout version.
    pub schema: u32,
    /// Fingerprint the entry was computed under.
    pub fingerprint: Fingerprint,
    /// The full ordered violation list of the run.
    pub violations: Vec<Violation>,
    /// Per-file snapshots, keyed by project-relative path.
    pub files: BTreeMap<PathBuf, FileSnapshot>,
}

impl CacheEntry {
    /// Rebuilds the parse diagnostics recorded in the snapshots.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<ParseDiagnostic> {
        self.files
            .iter()
            .filter_map(|(file, snapshot)| {
                snapshot.error.as_ref().map(|message| ParseDiagnostic {
                    file: file.clone(),
                    message: message.clone(),
                })
            })
            .collect()
    }
}

/// Persistence backend for cache entries.
pub trait CacheStore: Send + Sync {
    /// Loads the stored entry, if any. Unreadable or incompatible content
    /// counts as absent.
    fn load(&self) -> Option<CacheEntry>;

    /// Replaces the stored entry wholesale.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the entry cannot be written.
    fn store(&self, entry: &CacheEntry) -> io::Result<()>;

    /// Removes any stored entry.
    ///
    /// # Errors
    ///
    /// Returns an IO error when removal fails for a reason other than the
    /// entry being absent.
    fn invalidate(&self) -> io::Result<()>;
}

/// Single-document JSON store under `.modbound/cache.json`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at the project directory.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(".modbound").join("cache.json"),
        }
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Option<CacheEntry> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "discarding unreadable cache");
                return None;
            }
        };
        if entry.schema != CACHE_SCHEMA {
            debug!(
                found = entry.schema,
                expected = CACHE_SCHEMA,
                "discarding cache with mismatched schema"
            );
            return None;
        }
        Some(entry)
    }

    fn store(&self, entry: &CacheEntry) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent"))?;
        std::fs::create_dir_all(parent)?;

        // Write-then-rename keeps readers from ever seeing a torn entry.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut tmp, entry)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn invalidate(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// A store that never hits and never persists.
pub struct NullStore;

impl CacheStore for NullStore {
    fn load(&self) -> Option<CacheEntry> {
        None
    }

    fn store(&self, _entry: &CacheEntry) -> io::Result<()> {
        Ok(())
    }

    fn invalidate(&self) -> io::Result<()> {
        Ok(())
    }
}

/// SHA-256 hex digest of a byte slice.
#[must_use]
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Computes the fingerprint of a project under its current configuration.
///
/// Hashes the engine version, the canonical JSON form of the configuration,
/// then the sorted (relative path, content digest) pairs of every
/// non-hidden file under `root` matching a `cache_dependencies` glob.
/// Including the version means upgrading the checker itself discards
/// entries even when nothing in the project changed.
///
/// # Errors
///
/// Returns an IO error when a matched file cannot be read.
pub fn compute_fingerprint(root: &Path, config: &ProjectConfig) -> io::Result<Fingerprint> {
    fingerprint_for_engine(root, config, env!("CARGO_PKG_VERSION"))
}

fn fingerprint_for_engine(
    root: &Path,
    config: &ProjectConfig,
    engine: &str,
) -> io::Result<Fingerprint> {
    let patterns: Vec<glob::Pattern> = config
        .cache_dependencies
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let mut digests: BTreeMap<String, String> = BTreeMap::new();
    for result in ignore::WalkBuilder::new(root).build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during fingerprint walk");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if !patterns.iter().any(|p| p.matches(&rel_str)) {
            continue;
        }
        let content = std::fs::read(entry.path())?;
        digests.insert(rel_str, digest_hex(&content));
    }

    let config_json = serde_json::to_vec(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut hasher = Sha256::new();
    hasher.update(engine.as_bytes());
    hasher.update(b"\0");
    hasher.update(&config_json);
    for (path, digest) in &digests {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(digest.as_bytes());
        hasher.update(b"\0");
    }
    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(fingerprint: &str) -> CacheEntry {
        CacheEntry {
            schema: CACHE_SCHEMA,
            fingerprint: Fingerprint(fingerprint.to_string()),
            violations: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    #[test]
    fn store_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.load().is_none());
        store.store(&entry("abc")).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.fingerprint.as_str(), "abc");
    }

    #[test]
    fn invalidate_removes_entry() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.store(&entry("abc")).unwrap();
        store.invalidate().unwrap();
        assert!(store.load().is_none());
        // Idempotent
        store.invalidate().unwrap();
    }

    #[test]
    fn corrupt_entry_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join(".modbound")).unwrap();
        std::fs::write(dir.path().join(".modbound/cache.json"), "not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn schema_mismatch_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut stale = entry("abc");
        stale.schema = CACHE_SCHEMA + 1;
        // Bypass store() to simulate an entry from another version.
        std::fs::create_dir_all(dir.path().join(".modbound")).unwrap();
        std::fs::write(
            dir.path().join(".modbound/cache.json"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn fingerprint_changes_with_file_content() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn a() {}").unwrap();
        let config = ProjectConfig::default();

        let before = compute_fingerprint(dir.path(), &config).unwrap();
        let again = compute_fingerprint(dir.path(), &config).unwrap();
        assert_eq!(before, again);

        std::fs::write(dir.path().join("src/lib.rs"), "fn b() {}").unwrap();
        let after = compute_fingerprint(dir.path(), &config).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn fingerprint_changes_with_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn a() {}").unwrap();

        let base = ProjectConfig::default();
        let mut strictened = ProjectConfig::default();
        strictened.forbid_circular_dependencies = true;

        let a = compute_fingerprint(dir.path(), &base).unwrap();
        let b = compute_fingerprint(dir.path(), &strictened).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_engine_version() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn a() {}").unwrap();
        let config = ProjectConfig::default();

        let current = compute_fingerprint(dir.path(), &config).unwrap();
        let same = fingerprint_for_engine(dir.path(), &config, env!("CARGO_PKG_VERSION")).unwrap();
        assert_eq!(current, same);

        let upgraded = fingerprint_for_engine(dir.path(), &config, "99.0.0").unwrap();
        assert_ne!(current, upgraded);
    }

    #[test]
    fn fingerprint_ignores_unmatched_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn a() {}").unwrap();
        let config = ProjectConfig::default();

        let before = compute_fingerprint(dir.path(), &config).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "scratch").unwrap();
        let after = compute_fingerprint(dir.path(), &config).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn diagnostics_rebuilt_from_snapshots() {
        let mut e = entry("abc");
        e.files.insert(
            PathBuf::from("src/bad.rs"),
            FileSnapshot {
                digest: "d".to_string(),
                facts: Vec::new(),
                error: Some("unexpected token".to_string()),
            },
        );
        e.files.insert(
            PathBuf::from("src/good.rs"),
            FileSnapshot {
                digest: "d".to_string(),
                facts: Vec::new(),
                error: None,
            },
        );
        let diags = e.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, PathBuf::from("src/bad.rs"));
    }
}
