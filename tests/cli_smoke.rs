use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

/// Temp home for one CLI run: config, ledger, log and two volume roots.
struct Sandbox {
    _td: TempDir,
    base: PathBuf,
    config: PathBuf,
    ledger: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let td = tempdir().unwrap();
        let base = dunce::canonicalize(td.path()).unwrap();
        let c = base.join("vol_c");
        let d = base.join("vol_d");
        fs::create_dir_all(&c).unwrap();
        fs::create_dir_all(&d).unwrap();
        let config = base.join("config.xml");
        let xml = format!(
            "<config>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <volume id=\"C\" root=\"{}\" label=\"System\"/>\n  <volume id=\"D\" root=\"{}\" label=\"Data\"/>\n</config>\n",
            base.join("logs").join("space_shift.log").display(),
            c.display(),
            d.display()
        );
        fs::write(&config, xml).unwrap();
        let ledger = base.join("ledger.db");
        Self { _td: td, base, config, ledger }
    }

    fn run(&self, args: &[&str]) -> Output {
        let me = assert_cmd::cargo::cargo_bin!("space_shift");
        Command::new(me)
            .env("SPACE_SHIFT_CONFIG", &self.config)
            .arg("--ledger")
            .arg(&self.ledger)
            .args(args)
            .output()
            .expect("spawn binary")
    }

    fn c(&self, rel: &str) -> PathBuf {
        self.base.join("vol_c").join(rel)
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn code(out: &Output) -> i32 {
    out.status.code().unwrap_or(-1)
}

#[test]
fn print_config_shows_the_env_override() {
    let sb = Sandbox::new();
    let out = sb.run(&["--print-config"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains(&sb.config.display().to_string()));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let sb = Sandbox::new();
    assert_eq!(code(&sb.run(&[])), 2);
}

#[test]
fn volumes_json_lists_configured_roots() {
    let sb = Sandbox::new();
    let out = sb.run(&["volumes", "--json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let ids: Vec<&str> = v.as_array().unwrap().iter().map(|e| e["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["C", "D"]);
    assert_eq!(v[1]["label"], "Data");
}

#[test]
fn invalid_paths_map_to_error_codes() {
    let sb = Sandbox::new();
    assert_eq!(code(&sb.run(&["migrate", "relative.txt", "--to", "D"])), 10);

    let f = sb.c("here.txt");
    fs::write(&f, b"x").unwrap();
    assert_eq!(code(&sb.run(&["target-path", f.to_str().unwrap(), "--to", "C"])), 15);
    assert_eq!(code(&sb.run(&["delete", "77"])), 30);
}

#[test]
fn target_path_prints_the_destination() {
    let sb = Sandbox::new();
    let f = sb.c("Music/song.flac");
    fs::create_dir_all(f.parent().unwrap()).unwrap();
    fs::write(&f, b"x").unwrap();

    let out = sb.run(&["target-path", f.to_str().unwrap(), "--to", "d:"]);
    assert!(out.status.success());
    let expected = sb.base.join("vol_d").join("MovedFiles").join("C").join("Music").join("song.flac");
    assert_eq!(Path::new(stdout(&out).trim()), expected);
}

#[cfg(unix)]
#[test]
fn full_lifecycle_through_the_binary() {
    let sb = Sandbox::new();
    let dir = sb.c("Videos/holiday");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("day1.mp4"), vec![0u8; 5000]).unwrap();

    let out = sb.run(&["migrate", dir.to_str().unwrap(), "--to", "D"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(fs::symlink_metadata(&dir).unwrap().file_type().is_symlink());

    let out = sb.run(&["list", "--json"]);
    let list: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["status"], "active");
    assert_eq!(list[0]["is_valid"], true);
    assert_eq!(list[0]["size"], 5000);
    let id = list[0]["id"].as_i64().unwrap().to_string();

    assert!(stdout(&sb.run(&["list"])).contains("1 records, 0 invalid"));
    assert_eq!(stdout(&sb.run(&["sources"])).trim(), "C");
    assert_eq!(stdout(&sb.run(&["targets"])).trim(), "D");
    assert!(stdout(&sb.run(&["list", "--source", "D"])).contains("0 records, 0 invalid"));

    assert!(sb.run(&["restore", &id]).status.success());
    assert!(dir.join("day1.mp4").is_file());
    assert!(!fs::symlink_metadata(&dir).unwrap().file_type().is_symlink());
    assert_eq!(code(&sb.run(&["restore", &id])), 31);

    assert!(sb.run(&["remigrate", &id]).status.success());
    assert!(fs::symlink_metadata(&dir).unwrap().file_type().is_symlink());

    assert!(sb.run(&["delete", &id]).status.success());
    assert!(stdout(&sb.run(&["list"])).contains("0 records, 0 invalid"));
    assert!(sb.base.join("logs").join("space_shift.log").is_file());
}
