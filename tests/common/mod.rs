//! Shared fixtures for the integration tests: two fake volumes rooted in a
//! temp directory and link managers with injectable failures.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use space_shift::{
    Copier, Ledger, LinkError, LinkKind, LinkManager, MigrationEngine, SystemLinks, VolumeCatalog,
    VolumeId, VolumeInfo,
};
use tempfile::TempDir;

pub const TOTAL: u64 = 1 << 40;

pub fn vol(c: char) -> VolumeId {
    VolumeId::new(c).unwrap()
}

/// Volumes backed by plain directories with scripted free space.
pub struct FakeVolumes {
    roots: Vec<(VolumeId, PathBuf)>,
    free: Mutex<HashMap<VolumeId, u64>>,
}

impl FakeVolumes {
    pub fn new(roots: Vec<(VolumeId, PathBuf)>) -> Self {
        Self { roots, free: Mutex::new(HashMap::new()) }
    }

    pub fn set_free(&self, id: VolumeId, bytes: u64) {
        self.free.lock().unwrap().insert(id, bytes);
    }
}

impl VolumeCatalog for FakeVolumes {
    fn volumes(&self) -> Vec<VolumeInfo> {
        let free = self.free.lock().unwrap();
        self.roots
            .iter()
            .map(|(id, root)| VolumeInfo {
                id: *id,
                label: format!("Fake {id}"),
                root: root.clone(),
                total_bytes: TOTAL,
                free_bytes: free.get(id).copied().unwrap_or(TOTAL / 2),
            })
            .collect()
    }
}

/// System links whose creation can be made to fail on demand.
#[derive(Default)]
pub struct FlakyLinks {
    pub fail_create: AtomicBool,
}

impl FlakyLinks {
    pub fn failing() -> Self {
        Self { fail_create: AtomicBool::new(true) }
    }
}

impl LinkManager for FlakyLinks {
    fn create_link(&self, link: &Path, target: &Path, kind: LinkKind) -> Result<(), LinkError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LinkError::Create {
                link: link.to_path_buf(),
                target: target.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "symlink privilege not held"),
            });
        }
        SystemLinks.create_link(link, target, kind)
    }

    fn is_link(&self, path: &Path) -> io::Result<bool> {
        SystemLinks.is_link(path)
    }

    fn remove_link(&self, path: &Path) -> Result<(), LinkError> {
        SystemLinks.remove_link(path)
    }

    fn is_in_use(&self, path: &Path) -> io::Result<bool> {
        SystemLinks.is_in_use(path)
    }
}

/// Temp tree with volume C at `<tmp>/c` and D at `<tmp>/d`.
pub struct Fixture {
    _td: TempDir,
    pub c_root: PathBuf,
    pub d_root: PathBuf,
    pub volumes: Arc<FakeVolumes>,
    pub links: Arc<FlakyLinks>,
    pub engine: Arc<MigrationEngine>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_ledger(Ledger::open_in_memory().unwrap())
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        let td = tempfile::tempdir().unwrap();
        let base = dunce::canonicalize(td.path()).unwrap();
        let c_root = base.join("c");
        let d_root = base.join("d");
        fs::create_dir_all(&c_root).unwrap();
        fs::create_dir_all(&d_root).unwrap();
        let volumes = Arc::new(FakeVolumes::new(vec![
            (vol('C'), c_root.clone()),
            (vol('D'), d_root.clone()),
        ]));
        let links = Arc::new(FlakyLinks::default());
        let engine = Arc::new(
            MigrationEngine::new(ledger)
                .with_volumes(volumes.clone())
                .with_links(links.clone())
                .with_copier(Copier::with_buffer_size(4 * 1024)),
        );
        Self { _td: td, c_root, d_root, volumes, links, engine }
    }

    /// Write `contents` at `rel` under volume C, creating parents.
    pub fn file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let p = self.c_root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, contents).unwrap();
        p
    }

    /// Where `rel` under C lands on D.
    pub fn moved(&self, rel: &str) -> PathBuf {
        self.d_root.join("MovedFiles").join("C").join(rel)
    }

    pub fn fail_links(&self, fail: bool) {
        self.links.fail_create.store(fail, Ordering::SeqCst);
    }
}

pub fn is_symlink(p: &Path) -> bool {
    fs::symlink_metadata(p).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}
