#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// A stand-in firewall: answers `uname` and `test`, logs every shell script
/// it receives and replies to each with the same framed snmpd section.
fn fake_firewall(platform: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let log = dir.path().join("scripts.log");
    let shell = dir.path().join("fake-shell.sh");
    fs::write(
        &shell,
        format!(
            r#"case "$1" in
  uname) echo {platform} ;;
  test) exit 0 ;;
  *)
    cat >> '{log}'
    echo '---' >> '{log}'
    printf 'pfSense shell\n\npfSense shell: exec\n%s\n\npfSense shell: exit\n' '{{"syslocation":"","rocommunity":"public"}}'
    ;;
esac
"#,
            log = log.display()
        ),
    )
    .expect("write shell");

    let target = dir.path().join("target.toml");
    fs::write(
        &target,
        format!("launcher = [\"sh\", \"{}\"]\n", shell.display()),
    )
    .expect("write target");
    (dir, target, log)
}

fn snmp_params(dir: &Path) -> PathBuf {
    let params = dir.join("snmp.toml");
    fs::write(&params, "[snmpd]\nsyslocation = \"rack 4\"\n").expect("write params");
    params
}

fn reconcile() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsense-reconcile"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn dry_run_only_reads() {
    let (dir, target, log) = fake_firewall("FreeBSD");

    reconcile()
        .arg("--target")
        .arg(&target)
        .arg("config")
        .arg("--params")
        .arg(snmp_params(dir.path()))
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "$config['snmpd']['syslocation'] = 'rack 4';",
        ))
        .stdout(predicate::str::contains("config: would change (1 statements)"));

    let scripts = fs::read_to_string(&log).expect("log");
    assert!(scripts.contains("json_encode($config['snmpd'])"));
    assert!(!scripts.contains("write_config();"));
}

#[test]
fn commit_writes_then_persists() {
    let (dir, target, log) = fake_firewall("FreeBSD");

    reconcile()
        .arg("--target")
        .arg(&target)
        .arg("config")
        .arg("--params")
        .arg(snmp_params(dir.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("config: changed (1 statements)"));

    let scripts = fs::read_to_string(&log).expect("log");
    assert!(scripts.contains(
        "$config['snmpd']['syslocation'] = 'rack 4';\nwrite_config();\nexec\nexit\n"
    ));
    // read, commit, re-read
    assert_eq!(scripts.matches("---").count(), 3);
}

#[test]
fn foreign_platform_is_refused_before_any_script() {
    let (dir, target, log) = fake_firewall("Linux");

    reconcile()
        .arg("--target")
        .arg(&target)
        .arg("config")
        .arg("--params")
        .arg(snmp_params(dir.path()))
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "pfSense platform expected: FreeBSD found: Linux",
        ));
    assert!(!log.exists());
}

#[test]
fn dump_reads_through_the_shell() {
    let (_dir, target, _log) = fake_firewall("FreeBSD");

    reconcile()
        .arg("--target")
        .arg(&target)
        .arg("dump")
        .arg("snmpd")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rocommunity\": \"public\""));
}
