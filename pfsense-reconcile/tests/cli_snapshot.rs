use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn reconcile() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsense-reconcile"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn dry_run_against_snapshot_prints_statements() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("alias.toml");
    fs::write(&params, "name = \"web\"\ntype = \"host\"\naddress = \"10.0.0.5\"\n").expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("alias")
        .arg("--params")
        .arg(&params)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "if (empty($config['aliases'])) $config['aliases'] = [];",
        ))
        .stdout(predicate::str::contains("$config['aliases']['alias'][] = ["))
        .stdout(predicate::str::contains("alias: would change (2 statements)"));
}

#[test]
fn json_output_carries_outcome_fields() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("snmp.json");
    fs::write(&params, r#"{"snmpd":{"syslocation":"rack 4","rocommunity":"public"}}"#).expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("config")
        .arg("--params")
        .arg(&params)
        .arg("--dry-run")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\": true"))
        .stdout(predicate::str::contains("\"syslocation\": \"rack 4\""))
        .stdout(predicate::str::contains(
            "\"generatedStatements\": \"$config['snmpd']['syslocation'] = 'rack 4';\"",
        ));
}

#[test]
fn unchanged_state_reports_nothing_to_do() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("rule.toml");
    fs::write(
        &params,
        concat!(
            "tracker = \"1500000102\"\n",
            "interface = \"wan\"\n",
            "protocol = \"tcp\"\n",
            "descr = \"Web GUI from anywhere\"\n",
            "destination = { network = \"wanip\", port = \"443\" }\n",
        ),
    )
    .expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("rule")
        .arg("--params")
        .arg(&params)
        .assert()
        .success()
        .stdout(predicate::str::contains("rule: unchanged (0 statements)"));
}

#[test]
fn snapshot_refuses_to_commit() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("group.toml");
    fs::write(&params, "name = \"vpn-users\"\n").expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("group")
        .arg("--params")
        .arg(&params)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot commit to a snapshot"));
}

#[test]
fn safe_mode_names_missing_key() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("system.toml");
    fs::write(&params, "[system]\nhostnmae = \"fw2\"\n").expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("config")
        .arg("--params")
        .arg(&params)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "key system.hostnmae not found, cannot create new keys in safe mode",
        ));
}

#[test]
fn injection_attempt_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("snmp.toml");
    fs::write(&params, "[snmpd]\nsyscontact = \"x'; exec('id'); //\"\n").expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("config")
        .arg("--params")
        .arg(&params)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for snmpd.syscontact"));
}

#[test]
fn invalid_choice_fails_at_load() {
    let dir = tempdir().expect("tempdir");
    let params = dir.path().join("vip.toml");
    fs::write(&params, "subnet = \"10.0.0.1\"\nmode = \"vrrp\"\n").expect("write");

    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("virtualip")
        .arg("--params")
        .arg(&params)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid parameters"));
}

#[test]
fn dump_prints_a_section() {
    reconcile()
        .arg("--snapshot")
        .arg(fixture("fixtures/pfsense-base.xml"))
        .arg("dump")
        .arg("system.group[1]")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"admins\""))
        .stdout(predicate::str::contains("\"page-all\""));
}
