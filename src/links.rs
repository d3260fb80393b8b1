//! Symbolic link management and in-use probing.

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::LinkError;
use crate::platform;

/// File or directory semantics of a link (matters on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    File,
    Directory,
}

impl LinkKind {
    pub fn from_is_dir(is_dir: bool) -> Self {
        if is_dir { LinkKind::Directory } else { LinkKind::File }
    }

    pub fn is_dir(self) -> bool {
        self == LinkKind::Directory
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::File => "file",
            LinkKind::Directory => "directory",
        }
    }
}

/// OS-level link operations used by the engine.
pub trait LinkManager: Send + Sync {
    /// Create a link at `link` pointing to `target`.
    fn create_link(&self, link: &Path, target: &Path, kind: LinkKind) -> Result<(), LinkError>;

    /// True when `path` itself is a link (the link is not followed).
    fn is_link(&self, path: &Path) -> io::Result<bool>;

    /// Remove the link at `path`, leaving its target alone. Non-links are refused.
    fn remove_link(&self, path: &Path) -> Result<(), LinkError>;

    /// Best-effort: true when `path` (or any file below it) is held open by
    /// another process.
    fn is_in_use(&self, path: &Path) -> io::Result<bool>;
}

/// Links of the running platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLinks;

impl LinkManager for SystemLinks {
    fn create_link(&self, link: &Path, target: &Path, kind: LinkKind) -> Result<(), LinkError> {
        platform::create_symlink(target, link, kind.is_dir()).map_err(|source| LinkError::Create {
            link: link.to_path_buf(),
            target: target.to_path_buf(),
            source,
        })?;
        debug!(link = %link.display(), target = %target.display(), kind = kind.as_str(), "link created");
        Ok(())
    }

    fn is_link(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::symlink_metadata(path)?.file_type().is_symlink())
    }

    fn remove_link(&self, path: &Path) -> Result<(), LinkError> {
        let is_link = self.is_link(path).map_err(|source| LinkError::Remove {
            path: path.to_path_buf(),
            source,
        })?;
        if !is_link {
            return Err(LinkError::NotALink(path.to_path_buf()));
        }
        platform::remove_symlink(path).map_err(|source| LinkError::Remove {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(link = %path.display(), "link removed");
        Ok(())
    }

    fn is_in_use(&self, path: &Path) -> io::Result<bool> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_file() {
            return platform::is_locked_by_other(path);
        }
        if !meta.is_dir() {
            return Ok(false);
        }

        let files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(root = %path.display(), error = %err, "skipping unreadable entry during in-use probe");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        let busy = files.par_iter().find_any(|f| match platform::is_locked_by_other(f) {
            Ok(locked) => locked,
            Err(e) => {
                // Unreadable files cannot be copied either; the copy reports them.
                debug!(path = %f.display(), error = %e, "in-use probe failed; assuming free");
                false
            }
        });
        if let Some(f) = busy {
            debug!(path = %f.display(), "file held open by another process");
        }
        Ok(busy.is_some())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use fs2::FileExt;
    use tempfile::tempdir;

    #[test]
    fn remove_refuses_real_directory() {
        let td = tempdir().unwrap();
        let d = td.path().join("real");
        fs::create_dir(&d).unwrap();
        let err = SystemLinks.remove_link(&d).unwrap_err();
        assert!(matches!(err, LinkError::NotALink(_)));
        assert!(d.is_dir());
    }

    #[test]
    fn create_detect_remove() {
        let td = tempdir().unwrap();
        let target = td.path().join("t.txt");
        fs::write(&target, b"x").unwrap();
        let link = td.path().join("l.txt");
        SystemLinks.create_link(&link, &target, LinkKind::File).unwrap();
        assert!(SystemLinks.is_link(&link).unwrap());
        assert!(!SystemLinks.is_link(&target).unwrap());
        SystemLinks.remove_link(&link).unwrap();
        assert!(target.exists());
    }

    #[test]
    fn in_use_detects_locked_file_in_tree() {
        let td = tempdir().unwrap();
        let root = td.path().join("tree");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a"), b"a").unwrap();
        fs::write(root.join("sub/b"), b"b").unwrap();
        assert!(!SystemLinks.is_in_use(&root).unwrap());

        let holder = fs::File::open(root.join("sub/b")).unwrap();
        holder.lock_exclusive().unwrap();
        assert!(SystemLinks.is_in_use(&root).unwrap());
        drop(holder);
        assert!(!SystemLinks.is_in_use(&root).unwrap());
    }
}
