//! Directory snapshots and change classification.
//!
//! A snapshot maps every account file in a directory to a cheap signature
//! (length + modification time). Comparing two snapshots tells us which
//! files appeared, disappeared or changed since the last look, without
//! reading any file contents.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What we remember about a file between scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl From<&Metadata> for FileSignature {
    fn from(meta: &Metadata) -> Self {
        Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

/// Path -> signature for every account file seen in one scan.
pub type Snapshot = BTreeMap<PathBuf, FileSignature>;

/// Paths that changed between two snapshots. The three sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanDiff {
    pub created: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,
    pub updated: BTreeSet<PathBuf>,
}

impl ScanDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }

    /// Total number of changed paths.
    pub fn len(&self) -> usize {
        self.created.len() + self.deleted.len() + self.updated.len()
    }
}

/// Remembers the last snapshot of a directory and diffs against it.
#[derive(Debug, Default)]
pub struct FileScanner {
    snapshot: Snapshot,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot taken by the last successful scan.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Scans `root` and returns what changed since the previous scan.
    ///
    /// A missing directory scans as empty. If the directory exists but can't
    /// be listed, the error is returned and the previous snapshot is kept,
    /// so a transient failure doesn't look like every file was deleted.
    pub fn scan(&mut self, root: &Path) -> io::Result<ScanDiff> {
        let current = read_snapshot(root)?;
        let diff = diff_snapshots(&self.snapshot, &current);
        self.snapshot = current;
        Ok(diff)
    }
}

/// Lists the account files directly inside `root`.
pub fn read_snapshot(root: &Path) -> io::Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            warn!("{} is not a directory, treating it as empty", root.display());
            return Ok(snapshot);
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist yet", root.display());
            return Ok(snapshot);
        }
        Err(e) => return Err(e),
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // The root itself couldn't be read.
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy();
        if !is_account_file_name(&name) {
            continue;
        }
        // Directories, symlinks, sockets and the like are never account files.
        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(meta) => {
                snapshot.insert(entry.path().to_path_buf(), FileSignature::from(&meta));
            }
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    Ok(snapshot)
}

/// Classifies every path that differs between `previous` and `current`.
pub fn diff_snapshots(previous: &Snapshot, current: &Snapshot) -> ScanDiff {
    let mut diff = ScanDiff::default();

    for (path, signature) in current {
        match previous.get(path) {
            None => {
                diff.created.insert(path.clone());
            }
            Some(old) if old != signature => {
                diff.updated.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    diff.deleted = previous
        .keys()
        .filter(|path| !current.contains_key(*path))
        .cloned()
        .collect();

    diff
}

/// Hidden files and editor backups are never account files.
fn is_account_file_name(name: &str) -> bool {
    !(name.starts_with('.') || name.ends_with('~'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sig(len: u64) -> FileSignature {
        FileSignature {
            len,
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(len)),
        }
    }

    #[test]
    fn test_diff_classifies_paths() {
        let mut previous = Snapshot::new();
        previous.insert(PathBuf::from("/keys/kept"), sig(1));
        previous.insert(PathBuf::from("/keys/changed"), sig(2));
        previous.insert(PathBuf::from("/keys/gone"), sig(3));

        let mut current = Snapshot::new();
        current.insert(PathBuf::from("/keys/kept"), sig(1));
        current.insert(PathBuf::from("/keys/changed"), sig(20));
        current.insert(PathBuf::from("/keys/new"), sig(4));

        let diff = diff_snapshots(&previous, &current);
        assert_eq!(
            diff.created.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/keys/new")]
        );
        assert_eq!(
            diff.deleted.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/keys/gone")]
        );
        assert_eq!(
            diff.updated.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/keys/changed")]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let mut scanner = FileScanner::new();
        let diff = scanner.scan(&dir.path().join("not-yet")).unwrap();
        assert!(diff.is_empty());
        assert!(scanner.snapshot().is_empty());
    }

    #[test]
    fn test_scan_skips_non_account_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("acct.json"), "{}").unwrap();
        fs::write(dir.path().join(".hidden"), "{}").unwrap();
        fs::write(dir.path().join("acct.json~"), "{}").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir").join("nested.json"), "{}").unwrap();

        let snapshot = read_snapshot(dir.path()).unwrap();
        let names: Vec<_> = snapshot
            .keys()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["acct.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_symlinks() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("real.json");
        fs::write(&target, "{}").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.json")).unwrap();

        let snapshot = read_snapshot(dir.path()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&target));
    }

    #[test]
    fn test_successive_scans() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let mut scanner = FileScanner::new();

        fs::write(&a, "one").unwrap();
        let diff = scanner.scan(dir.path()).unwrap();
        assert!(diff.created.contains(&a));
        assert_eq!(diff.len(), 1);

        // Nothing changed.
        assert!(scanner.scan(dir.path()).unwrap().is_empty());

        // Length change is always visible, whatever the mtime granularity.
        fs::write(&a, "one plus more").unwrap();
        fs::write(&b, "two").unwrap();
        let diff = scanner.scan(dir.path()).unwrap();
        assert!(diff.updated.contains(&a));
        assert!(diff.created.contains(&b));

        fs::remove_file(&a).unwrap();
        let diff = scanner.scan(dir.path()).unwrap();
        assert!(diff.deleted.contains(&a));
        assert_eq!(diff.len(), 1);
    }
}
