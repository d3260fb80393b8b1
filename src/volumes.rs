//! Volume enumeration and space accounting.
//!
//! A volume is identified by a single uppercase letter. On Windows the letters
//! are the drive letters of the fixed disks; elsewhere volumes come from the
//! configured letter-to-root mapping (`<volume id="D" root="/mnt/data"/>`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

/// Single-letter volume identifier, always uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VolumeId(char);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid volume identifier '{0}' (expected a letter such as D or D:)")]
pub struct InvalidVolumeId(pub String);

impl VolumeId {
    pub fn new(letter: char) -> Result<Self, InvalidVolumeId> {
        if letter.is_ascii_alphabetic() {
            Ok(VolumeId(letter.to_ascii_uppercase()))
        } else {
            Err(InvalidVolumeId(letter.to_string()))
        }
    }

    pub fn letter(self) -> char {
        self.0
    }
}

impl FromStr for VolumeId {
    type Err = InvalidVolumeId;

    /// Accepts `D`, `d`, `D:`, `D:\` and `D:/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let rest = t.trim_end_matches(['\\', '/']);
        let rest = rest.strip_suffix(':').unwrap_or(rest);
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => VolumeId::new(c).map_err(|_| InvalidVolumeId(s.to_string())),
            _ => Err(InvalidVolumeId(s.to_string())),
        }
    }
}

impl TryFrom<String> for VolumeId {
    type Error = InvalidVolumeId;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VolumeId> for String {
    fn from(v: VolumeId) -> String {
        v.0.to_string()
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub id: VolumeId,
    pub label: String,
    pub root: PathBuf,
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl VolumeInfo {
    pub fn used(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }

    /// Used share in percent, 0 when the total is unknown.
    pub fn used_percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.used() as f64 / self.total_bytes as f64 * 100.0
        }
    }
}

/// Source of volume information for the engine.
pub trait VolumeCatalog: Send + Sync {
    /// All usable volumes, sorted by id.
    fn volumes(&self) -> Vec<VolumeInfo>;

    fn volume(&self, id: VolumeId) -> Option<VolumeInfo> {
        self.volumes().into_iter().find(|v| v.id == id)
    }

    /// The volume whose root is the longest prefix of `path`.
    fn volume_of(&self, path: &Path) -> Option<VolumeInfo> {
        self.volumes()
            .into_iter()
            .filter(|v| path_is_under(path, &v.root))
            .max_by_key(|v| v.root.components().count())
    }

    fn free_space(&self, id: VolumeId) -> Option<u64> {
        self.volume(id).map(|v| v.free_bytes)
    }

    /// Every volume except `exclude` (destination candidates for a source).
    fn other_volumes(&self, exclude: VolumeId) -> Vec<VolumeInfo> {
        self.volumes().into_iter().filter(|v| v.id != exclude).collect()
    }
}

/// A letter bound to a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub id: VolumeId,
    pub root: PathBuf,
    pub label: Option<String>,
}

/// Volumes of the running system.
#[derive(Debug, Clone, Default)]
pub struct SystemVolumes {
    mounts: Vec<VolumeMount>,
}

impl SystemVolumes {
    /// Use exactly these mounts.
    pub fn from_mounts(mut mounts: Vec<VolumeMount>) -> Self {
        mounts.sort_by_key(|m| m.id);
        mounts.dedup_by_key(|m| m.id);
        Self { mounts }
    }

    /// Fixed drives of the machine (Windows) merged with `configured`;
    /// configured entries win on conflicting letters. Without drive letters
    /// only `configured` is used.
    pub fn detect(configured: &[VolumeMount]) -> Self {
        let mut mounts: Vec<VolumeMount> = configured.to_vec();
        for m in detect_fixed_drives() {
            if !mounts.iter().any(|c| c.id == m.id) {
                mounts.push(m);
            }
        }
        Self::from_mounts(mounts)
    }

    pub fn mounts(&self) -> &[VolumeMount] {
        &self.mounts
    }
}

impl VolumeCatalog for SystemVolumes {
    fn volumes(&self) -> Vec<VolumeInfo> {
        let mut disks: Option<sysinfo::Disks> = None;
        self.mounts
            .iter()
            .filter_map(|m| {
                let total = fs2::total_space(&m.root);
                let free = fs2::available_space(&m.root);
                match (total, free) {
                    (Ok(total_bytes), Ok(free_bytes)) => {
                        let label = match &m.label {
                            Some(l) => l.clone(),
                            None => disk_name_for(
                                disks.get_or_insert_with(sysinfo::Disks::new_with_refreshed_list),
                                &m.root,
                            ),
                        };
                        trace!(volume = %m.id, root = %m.root.display(), total_bytes, free_bytes, "volume queried");
                        Some(VolumeInfo { id: m.id, label, root: m.root.clone(), total_bytes, free_bytes })
                    }
                    (Err(e), _) | (_, Err(e)) => {
                        debug!(volume = %m.id, root = %m.root.display(), error = %e, "volume not ready; skipping");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Name of the disk whose mount point is the longest prefix of `root`.
fn disk_name_for(disks: &sysinfo::Disks, root: &Path) -> String {
    let mut best: Option<(&sysinfo::Disk, usize)> = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if path_is_under(root, mount) {
            let len = mount.as_os_str().len();
            if best.is_none_or(|(_, l)| len > l) {
                best = Some((disk, len));
            }
        }
    }
    best.map(|(d, _)| d.name().to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(windows)]
fn detect_fixed_drives() -> Vec<VolumeMount> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|d| !d.is_removable())
        .filter_map(|d| {
            let mount = d.mount_point().to_string_lossy().into_owned();
            let id: VolumeId = mount.parse().ok()?;
            let name = d.name().to_string_lossy().into_owned();
            Some(VolumeMount {
                id,
                root: d.mount_point().to_path_buf(),
                label: (!name.is_empty()).then_some(name),
            })
        })
        .collect()
}

#[cfg(not(windows))]
fn detect_fixed_drives() -> Vec<VolumeMount> {
    Vec::new()
}

/// Component-wise prefix test; case-insensitive where the filesystem is.
pub(crate) fn path_is_under(path: &Path, root: &Path) -> bool {
    #[cfg(windows)]
    {
        let norm = |c: std::path::Component<'_>| c.as_os_str().to_string_lossy().to_lowercase();
        let mut p = path.components().map(norm);
        root.components().map(norm).all(|r| p.next().is_some_and(|x| x == r))
    }
    #[cfg(not(windows))]
    {
        path.starts_with(root)
    }
}

/// `path` with the first `root`'s component count stripped.
pub(crate) fn remainder_after_root(path: &Path, root: &Path) -> PathBuf {
    path.components().skip(root.components().count()).collect()
}

/// Human-readable byte count (binary units, two decimals above bytes).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
