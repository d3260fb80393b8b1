//! Recursive size estimation.
//! Sums the lengths of regular files; directories and links contribute nothing.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use super::helpers::io_error_with_help_io;

/// Total bytes of regular files at or below `path` (no link following).
/// A missing path has size 0.
pub fn calculate_size(path: &Path) -> io::Result<u64> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_error_with_help_io("stat", path)(e)),
    };
    if meta.is_file() {
        return Ok(meta.len());
    }
    if !meta.is_dir() {
        return Ok(0);
    }

    let mut total: u64 = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| {
            let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
            let io_err = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk failed"));
            io_error_with_help_io("walk directory", &at)(io_err)
        })?;
        if entry.file_type().is_file() {
            let len = entry
                .metadata()
                .map_err(|e| io::Error::other(format!("stat '{}': {}", entry.path().display(), e)))?
                .len();
            total = total.saturating_add(len);
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sums_nested_files() {
        let td = tempdir().unwrap();
        let root = td.path().join("tree");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("one.bin"), vec![0u8; 100]).unwrap();
        fs::write(root.join("a/two.bin"), vec![0u8; 20]).unwrap();
        fs::write(root.join("a/b/three.bin"), vec![0u8; 3]).unwrap();
        assert_eq!(calculate_size(&root).unwrap(), 123);
    }

    #[test]
    fn empty_dir_and_missing_path_are_zero() {
        let td = tempdir().unwrap();
        assert_eq!(calculate_size(td.path()).unwrap(), 0);
        assert_eq!(calculate_size(&td.path().join("missing")).unwrap(), 0);
    }

    #[test]
    fn single_file_is_its_length() {
        let td = tempdir().unwrap();
        let f = td.path().join("f.txt");
        fs::write(&f, b"hello").unwrap();
        assert_eq!(calculate_size(&f).unwrap(), 5);
    }
}
