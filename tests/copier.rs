use assert_fs::TempDir;
use space_shift::{calculate_size, CancelToken, Copier, CopyError, NoProgress, TransferProgress};
use std::fs;

#[test]
fn tree_copy_preserves_content_and_mtime() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = root.join("src");
    fs::create_dir_all(src.join("nested/deeper")).unwrap();
    fs::write(src.join("top.txt"), b"top").unwrap();
    fs::write(src.join("nested/mid.txt"), b"middle").unwrap();
    fs::write(src.join("nested/deeper/low.bin"), vec![9u8; 100_000]).unwrap();
    let old = filetime::FileTime::from_unix_time(1_500_000_000, 0);
    filetime::set_file_mtime(src.join("nested/mid.txt"), old).unwrap();

    let dst = root.join("out").join("copy");
    let copier = Copier::new();
    let bytes = copier.copy(&src, &dst, &mut NoProgress, &CancelToken::new()).unwrap();

    assert_eq!(bytes, 100_009);
    assert_eq!(calculate_size(&dst).unwrap(), calculate_size(&src).unwrap());
    assert_eq!(fs::read(dst.join("nested/deeper/low.bin")).unwrap().len(), 100_000);
    let mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(dst.join("nested/mid.txt")).unwrap());
    assert_eq!(mtime.unix_seconds(), 1_500_000_000);
}

#[test]
fn small_buffer_reports_every_write() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = root.join("blob.bin");
    fs::write(&src, vec![0u8; 10 * 1024]).unwrap();

    let mut seen = Vec::new();
    let mut sink = |p: &TransferProgress| seen.push(p.copied_bytes);
    Copier::with_buffer_size(1024)
        .copy(&src, &root.join("blob.copy"), &mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(seen, (1..=10).map(|i| i * 1024).collect::<Vec<u64>>());
}

#[test]
fn pre_cancelled_copy_writes_nothing() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = root.join("a.txt");
    fs::write(&src, b"abc").unwrap();
    let token = CancelToken::new();
    token.cancel();

    let err = Copier::new()
        .copy(&src, &root.join("b.txt"), &mut NoProgress, &token)
        .unwrap_err();
    assert!(matches!(err, CopyError::Cancelled));
    assert!(!root.join("b.txt").exists());
}

#[test]
fn delete_removes_read_only_trees() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let dir = root.join("ro");
    fs::create_dir_all(dir.join("inner")).unwrap();
    let file = dir.join("inner/locked.txt");
    fs::write(&file, b"x").unwrap();
    let mut perms = fs::metadata(&file).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&file, perms).unwrap();

    Copier::new().delete(&dir).unwrap();
    assert!(!dir.exists());
    // Deleting something already gone is not an error.
    Copier::new().delete(&dir).unwrap();
}
