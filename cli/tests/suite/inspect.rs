use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use chronicle_core::Attributes;
use chronicle_core::Chronicle;
use chronicle_core::EngineConfig;
use chronicle_core::EntityState;
use chronicle_core::ItemRef;
use chronicle_core::JsonlVersionStore;
use chronicle_core::RequestContext;
use chronicle_core::changes_between;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

const PLAIN: &str = "[types.Widget]\n";

const YAML: &str = r#"
snapshot_format = "yaml"

[types.Widget]
ignore = ["updated_at", "price"]
"#;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn widget(name: &str, updated_at: i64) -> Attributes {
    let Value::Object(map) = json!({
        "id": 1,
        "name": name,
        "price": 100,
        "updated_at": updated_at,
    }) else {
        unreachable!()
    };
    map.into_iter().collect()
}

struct Fixture {
    dir: TempDir,
    store: PathBuf,
    live: PathBuf,
    config: PathBuf,
}

/// Widget#1 created by alice at t=10 as "A", renamed to "B" by bob at t=20.
fn fixture(config: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("versions.jsonl");
    let live = dir.path().join("live.json");
    let config_path = dir.path().join("chronicle.toml");
    std::fs::write(&config_path, config).unwrap();

    let chronicle = Chronicle::from_config(
        EngineConfig::load(&config_path).unwrap(),
        JsonlVersionStore::open(&store),
    )
    .unwrap();
    let item = ItemRef::new("Widget", "1");

    let created = EntityState::live(item.clone(), widget("A", 0));
    chronicle
        .after_create(&created, &RequestContext::as_actor("alice").at(at(10)))
        .unwrap();

    let renamed = EntityState::live(item, widget("B", 20));
    let changes = changes_between(&created.attributes, &renamed.attributes);
    let ctx = RequestContext::as_actor("bob")
        .with_metadata("ip", "10.0.0.1")
        .at(at(20));
    if let Some(staged) = chronicle.before_update(&renamed, &changes, &ctx).unwrap() {
        chronicle.append_staged(staged).unwrap();
    }

    std::fs::write(&live, serde_json::to_string(&renamed.attributes).unwrap()).unwrap();
    Fixture {
        dir,
        store,
        live,
        config: config_path,
    }
}

fn chronicle(subcommand: &str, store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chronicle").unwrap();
    cmd.arg(subcommand)
        .arg("--store")
        .arg(store)
        .args(["--type", "Widget", "--id", "1"]);
    cmd
}

#[test]
fn versions_lists_history_oldest_first() {
    let fixture = fixture(PLAIN);

    chronicle("versions", &fixture.store)
        .assert()
        .success()
        .stdout(predicates::str::diff(format!(
            "#0 create by alice at {}\n#1 update by bob at {} [ip=\"10.0.0.1\"]\n",
            at(10).to_rfc3339(),
            at(20).to_rfc3339()
        )));
}

#[test]
fn versions_json_is_machine_readable() {
    let fixture = fixture(PLAIN);

    let output = chronicle("versions", &fixture.store)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let versions: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let events: Vec<&str> = versions
        .iter()
        .filter_map(|v| v["event"].as_str())
        .collect();
    assert_eq!(events, vec!["create", "update"]);
}

#[test]
fn show_reconstructs_past_state() {
    let fixture = fixture(PLAIN);

    chronicle("show", &fixture.store)
        .args(["--at", "1970-01-01T00:00:15Z"])
        .assert()
        .success()
        .stdout(contains("Widget#1 (before update #1)"))
        .stdout(contains("  name: \"A\""));
}

#[test]
fn show_after_last_version_needs_live_state() {
    let fixture = fixture(PLAIN);

    chronicle("show", &fixture.store)
        .args(["--at", "1970-01-01T00:00:30Z"])
        .assert()
        .failure()
        .stderr(contains("pass --live"));

    chronicle("show", &fixture.store)
        .args(["--at", "1970-01-01T00:00:30Z"])
        .arg("--live")
        .arg(&fixture.live)
        .assert()
        .success()
        .stdout(contains("Widget#1 (live)"))
        .stdout(contains("  name: \"B\""));
}

#[test]
fn trail_hides_updated_at_by_default() {
    let fixture = fixture(PLAIN);

    chronicle("trail", &fixture.store)
        .arg("--live")
        .arg(&fixture.live)
        .assert()
        .success()
        .stdout(contains(format!(
            "#1 update by bob at {}: name: \"A\" -> \"B\"\n",
            at(20).to_rfc3339()
        )))
        .stdout(contains("#0 create by alice"))
        .stdout(contains("updated_at").not());
}

#[test]
fn trail_ignore_flag_replaces_defaults() {
    let fixture = fixture(PLAIN);

    chronicle("trail", &fixture.store)
        .arg("--live")
        .arg(&fixture.live)
        .args(["--ignore", "name,id,price"])
        .assert()
        .success()
        .stdout(contains("updated_at: 0 -> 20"))
        .stdout(contains("name:").not());
}

#[test]
fn config_sets_format_and_ignore_list() {
    let fixture = fixture(YAML);

    let raw = std::fs::read_to_string(&fixture.store).unwrap();
    assert!(raw.contains("name: A"), "{raw}");

    let output = chronicle("trail", &fixture.store)
        .arg("--config")
        .arg(&fixture.config)
        .arg("--live")
        .arg(&fixture.live)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0]["changes"],
        json!([{ "attribute": "name", "before": "A", "after": "B" }])
    );
    assert_eq!(entries[0]["changed_by"], json!("bob"));
}

#[test]
fn unreadable_live_file_reports_context() {
    let fixture = fixture(PLAIN);
    let bogus = fixture.dir.path().join("bogus.json");
    std::fs::write(&bogus, "[1, 2, 3]").unwrap();

    chronicle("trail", &fixture.store)
        .arg("--live")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(contains("must hold a JSON object of attributes"));
}
