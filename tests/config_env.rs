use serial_test::serial;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

use space_shift::config::{default_config_path, load_config, load_config_from_xml_path, CONFIG_ENV};
use space_shift::LogLevel;

struct EnvGuard;

impl EnvGuard {
    fn set(value: &std::path::Path) -> Self {
        unsafe {
            std::env::set_var(CONFIG_ENV, value);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            std::env::remove_var(CONFIG_ENV);
        }
    }
}

#[test]
#[serial]
fn env_directory_gets_the_file_name_appended() {
    let td = tempdir().unwrap();
    let _env = EnvGuard::set(td.path());
    assert_eq!(default_config_path().unwrap(), td.path().join("config.xml"));
}

#[test]
#[serial]
fn explicit_missing_file_is_an_error() {
    let td = tempdir().unwrap();
    let _env = EnvGuard::set(&td.path().join("nope.xml"));
    let err = load_config().unwrap_err().to_string();
    assert!(err.contains("does not exist"), "{err}");
}

#[test]
#[serial]
fn explicit_file_is_loaded() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("custom.xml");
    fs::write(&cfg, "<config><log_level>quiet</log_level></config>").unwrap();
    let _env = EnvGuard::set(&cfg);

    let loaded = load_config().unwrap();
    assert_eq!(loaded.source.as_deref(), Some(cfg.as_path()));
    assert_eq!(loaded.config.log_level, LogLevel::Quiet);
}

#[test]
fn init_config_writes_a_loadable_template() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("fresh").join("config.xml");
    let me = assert_cmd::cargo::cargo_bin!("space_shift");

    let out = Command::new(me).env(CONFIG_ENV, &cfg).arg("init-config").output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let parsed = load_config_from_xml_path(&cfg).unwrap();
    assert_eq!(parsed.log_level, LogLevel::Normal);

    let again = Command::new(me).env(CONFIG_ENV, &cfg).arg("init-config").output().unwrap();
    assert!(!again.status.success(), "an existing config is never overwritten");
}

#[cfg(unix)]
#[test]
fn template_is_private() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempdir().unwrap();
    let cfg = td.path().join("config.xml");
    space_shift::config::create_template_config(&cfg).unwrap();
    assert_eq!(fs::metadata(&cfg).unwrap().permissions().mode() & 0o777, 0o600);
}

#[test]
fn invalid_volume_roots_fail_validation() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("config.xml");
    let missing = td.path().join("not-there");
    fs::write(
        &cfg,
        format!("<config><volume id=\"D\" root=\"{}\"/></config>", missing.display()),
    )
    .unwrap();
    let parsed = load_config_from_xml_path(&cfg).unwrap();
    assert!(parsed.validate().is_err());
}
