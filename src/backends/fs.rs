//! Filesystem backends: metadata lookups, directory walking and deletion.

use crate::core::hasher::hex_lower;
use crate::core::{
    ActionError, ActionExecutor, ActionResult, ExtensionInfo, FileDigest, FileHasher,
    FileMetadataProvider, FileSystemWalker, LookupError, LookupResult, ProcessInfo, ServiceInfo,
};
use crate::remediation::{ProcessFlags, ServiceFlags};

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use walkdir::WalkDir;

/// Default number of leading bytes read for magic detection.
const MAGIC_LEN: u64 = 4;

/// [`FileMetadataProvider`] over `std::fs`.
///
/// MIME types are guessed from the extension with `mime_guess`, falling
/// back to `application/octet-stream` for existing files. Match digests are
/// BLAKE3, plus SHA-256 when the hasher is configured for it.
#[derive(Debug, Clone)]
pub struct FsMetadataProvider {
    hasher: FileHasher,
    magic_len: u64,
}

impl Default for FsMetadataProvider {
    fn default() -> Self {
        Self {
            hasher: FileHasher::new(),
            magic_len: MAGIC_LEN,
        }
    }
}

impl FsMetadataProvider {
    /// Creates a provider with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many leading bytes make up the magic.
    pub fn with_magic_len(mut self, len: u64) -> Self {
        self.magic_len = len.max(1);
        self
    }

    /// Sets the hasher used for match digests.
    pub fn with_hasher(mut self, hasher: FileHasher) -> Self {
        self.hasher = hasher;
        self
    }
}

impl FileMetadataProvider for FsMetadataProvider {
    fn size(&self, path: &Path) -> LookupResult<u64> {
        let metadata = std::fs::metadata(path).map_err(|e| LookupError::from_io(path, e))?;
        Ok(metadata.len())
    }

    fn mime_type(&self, path: &Path) -> LookupResult<String> {
        std::fs::metadata(path).map_err(|e| LookupError::from_io(path, e))?;
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(mime)
    }

    fn magic(&self, path: &Path) -> LookupResult<String> {
        let file = std::fs::File::open(path).map_err(|e| LookupError::from_io(path, e))?;
        let mut leading = Vec::with_capacity(self.magic_len as usize);
        file.take(self.magic_len).read_to_end(&mut leading)?;
        if leading.is_empty() {
            return Err(LookupError::unavailable("magic", "file is empty"));
        }
        Ok(hex_lower(&leading))
    }

    fn sha256(&self, path: &Path) -> LookupResult<String> {
        FileHasher::sha256_file(path)
    }

    fn digest(&self, path: &Path) -> LookupResult<FileDigest> {
        if !std::fs::metadata(path).map_err(|e| LookupError::from_io(path, e))?.is_file() {
            return Err(LookupError::unavailable(
                "digest",
                format!("{} is not a regular file", path.display()),
            ));
        }
        self.hasher.hash_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// [`FileSystemWalker`] over the `walkdir` crate.
///
/// Unreadable entries are skipped and logged at debug level.
#[derive(Debug, Clone, Default)]
pub struct WalkDirWalker {
    follow_links: bool,
    max_depth: Option<usize>,
}

impl WalkDirWalker {
    /// Creates a walker that does not follow symlinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables following symbolic links.
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Stops descending below the given depth.
    ///
    /// Depth filtering of search results happens in the remediator; this
    /// only bounds the walk itself.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

impl FileSystemWalker for WalkDirWalker {
    fn enumerate<'a>(&'a self, dir: &Path) -> LookupResult<Box<dyn Iterator<Item = PathBuf> + 'a>> {
        let metadata = std::fs::metadata(dir).map_err(|e| LookupError::from_io(dir, e))?;
        if !metadata.is_dir() {
            return Err(LookupError::unavailable(
                "directory",
                format!("{} is not a directory", dir.display()),
            ));
        }

        let mut walk = WalkDir::new(dir)
            .min_depth(1)
            .follow_links(self.follow_links)
            .sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walk = walk.max_depth(depth);
        }

        let root = dir.to_path_buf();
        let entries = walk.into_iter().filter_map(move |entry| match entry {
            Ok(entry) => entry.path().strip_prefix(&root).ok().map(Path::to_path_buf),
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                None
            }
        });
        Ok(Box::new(entries))
    }
}

/// [`ActionExecutor`] that deletes files from disk.
///
/// Only regular files and symlinks are removed; a symlink is removed itself,
/// never its target. Directories and other special files are refused, so a
/// search pattern matching a directory name never deletes its contents.
/// Keeps concurrency-safe tallies of deletions and failed deletions.
/// Process, service and extension actions are unsupported.
#[derive(Debug, Default)]
pub struct FsActionExecutor {
    deleted: AtomicU64,
    failed: AtomicU64,
}

impl FsActionExecutor {
    /// Creates an executor with zeroed tallies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of files deleted.
    pub fn deleted_count(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }

    /// Returns the number of failed deletions.
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl ActionExecutor for FsActionExecutor {
    fn delete_file(&self, path: &Path) -> ActionResult<()> {
        let result = match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => {
                std::fs::remove_file(path).map_err(ActionError::Io)
            }
            Ok(_) => Err(ActionError::failed(format!(
                "{} is not a regular file",
                path.display()
            ))),
            Err(e) => Err(ActionError::Io(e)),
        };

        match result {
            Ok(()) => {
                self.deleted.fetch_add(1, Ordering::Relaxed);
                tracing::info!(path = %path.display(), "Deleted file");
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete file");
                Err(e)
            }
        }
    }

    fn remediate_process(&self, _process: &ProcessInfo, _flags: &ProcessFlags) -> ActionResult<()> {
        Err(ActionError::unsupported("terminate process"))
    }

    fn remediate_service(&self, _service: &ServiceInfo, _flags: &ServiceFlags) -> ActionResult<()> {
        Err(ActionError::unsupported("unload service"))
    }

    fn disable_extension(&self, _extension: &ExtensionInfo) -> ActionResult<()> {
        Err(ActionError::unsupported("disable extension"))
    }
}
