use assert_fs::TempDir;
use space_shift::{PathValidator, ValidationError};
use std::fs;
use std::path::Path;

#[test]
fn ordinary_files_and_folders_pass() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let dir = root.join("Projects");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plan.txt"), b"x").unwrap();

    let v = PathValidator::new();
    assert!(v.validate(&dir).is_ok());
    assert!(v.validate(&dir.join("plan.txt")).is_ok());
}

#[test]
fn checks_run_in_order() {
    let v = PathValidator::new();
    assert!(matches!(v.validate(Path::new("   ")), Err(ValidationError::Empty)));
    // A relative path is reported as such before its existence is checked.
    assert!(matches!(v.validate(Path::new("no/such/thing")), Err(ValidationError::NotAbsolute(_))));

    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    // Missing wins over the protected marker in the name.
    let missing = root.join("Windows").join("gone.dll");
    assert!(matches!(v.validate(&missing), Err(ValidationError::NotFound(_))));
}

#[test]
fn protected_markers_ignore_case() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    for rel in ["program files/App/app.exe", "$RECYCLE.BIN/S-1-5/x", "System Volume Information/idx"] {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, b"x").unwrap();
        assert!(
            matches!(PathValidator::new().validate(&p), Err(ValidationError::ProtectedLocation { .. })),
            "{rel} should be protected"
        );
    }
}

#[test]
fn critical_names_and_roots_are_refused() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let hib = root.join("HIBERFIL.SYS");
    fs::write(&hib, b"x").unwrap();
    match PathValidator::new().validate(&hib) {
        Err(ValidationError::CriticalFile { name, .. }) => assert_eq!(name, "hiberfil.sys"),
        other => panic!("expected CriticalFile, got {other:?}"),
    }

    let fs_root = if cfg!(windows) { Path::new(r"C:\") } else { Path::new("/") };
    assert!(matches!(PathValidator::new().validate(fs_root), Err(ValidationError::VolumeRoot(_))));

    let mount = root.join("mnt_data");
    fs::create_dir_all(&mount).unwrap();
    let v = PathValidator::with_volume_roots([mount.clone()]);
    assert!(matches!(v.validate(&mount), Err(ValidationError::VolumeRoot(_))));
}

#[cfg(unix)]
#[test]
fn unix_system_trees_are_protected() {
    let v = PathValidator::new();
    assert!(matches!(v.validate(Path::new("/etc")), Err(ValidationError::ProtectedLocation { .. })));
    assert!(matches!(v.validate(Path::new("/usr/bin")), Err(ValidationError::ProtectedLocation { .. })));
}

#[cfg(target_os = "linux")]
#[test]
fn non_unicode_paths_are_refused_after_blank() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let odd = root.join(OsStr::from_bytes(b"r\xe9sum\xe9.txt"));
    fs::write(&odd, b"x").unwrap();

    let v = PathValidator::new();
    assert!(matches!(v.validate(&odd), Err(ValidationError::NotUnicode(_))));
    // Reported ahead of the relative-path check.
    let relative = Path::new(OsStr::from_bytes(b"dir/\xff"));
    assert!(matches!(v.validate(relative), Err(ValidationError::NotUnicode(_))));
}
