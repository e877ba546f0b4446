use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use serde_json::{Value, json};

fn watchkeepctl(data_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("watchkeepctl");
    cmd.current_dir(data_dir)
        .env("WATCHKEEP_DATA_DIR", data_dir)
        .env_remove("WATCHKEEP_CONFIG_PATH")
        .env_remove("WATCHKEEP_STORE_KEY")
        .env_remove("TMDB_API_KEY");
    cmd
}

fn stored(data_dir: &Path) -> Value {
    let bytes = fs::read(data_dir.join("video-progress.json")).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("watchkeepctl");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);

    for command in ["show", "load", "import-legacy", "reset"] {
        assert!(text.contains(command), "help missing '{command}'");
    }
}

#[test]
fn import_legacy_help_documents_force() {
    let mut cmd = cargo_bin_cmd!("watchkeepctl");
    cmd.args(["import-legacy", "--help"])
        .assert()
        .success()
        .stdout(contains("--force"));
}

#[test]
fn show_reports_missing_data() {
    let dir = tempfile::tempdir().unwrap();

    watchkeepctl(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(contains("no data stored under 'video-progress'"));
}

#[test]
fn imported_history_migrates_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.json");
    fs::write(
        &history,
        json!([{
            "mediaId": 1,
            "mediaType": "movie",
            "percentage": 40,
            "progress": 1200,
            "providerId": "legacy",
            "title": "Up",
            "year": "2009-05-01"
        }])
        .to_string(),
    )
    .unwrap();

    watchkeepctl(dir.path())
        .arg("import-legacy")
        .arg(&history)
        .assert()
        .success()
        .stdout(contains("imported 1 legacy item(s)"));
    assert_eq!(stored(dir.path())["--version"], 1);

    watchkeepctl(dir.path())
        .arg("import-legacy")
        .arg(&history)
        .assert()
        .failure()
        .stderr(contains("--force"));

    watchkeepctl(dir.path())
        .args(["load", "--no-reconcile", "--discard-legacy"])
        .assert()
        .success()
        .stdout(contains("skipped 1 background task(s)"))
        .stdout(contains("0 watched item(s)"));
    assert_eq!(stored(dir.path()), json!({ "--version": 2, "items": [] }));
}

#[test]
fn load_keeps_legacy_history_it_cannot_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.json");
    fs::write(
        &history,
        json!({ "items": [{
            "mediaId": "1",
            "mediaType": "series",
            "percentage": 10,
            "progress": 30,
            "title": "Show",
            "year": "2010",
            "seasonId": 1,
            "episodeId": "3"
        }]})
        .to_string(),
    )
    .unwrap();

    watchkeepctl(dir.path())
        .arg("import-legacy")
        .arg(&history)
        .assert()
        .success()
        .stdout(contains("imported 1 legacy item(s)"));
    let imported = stored(dir.path());

    for args in [&["load"][..], &["load", "--no-reconcile"][..]] {
        watchkeepctl(dir.path())
            .args(args)
            .assert()
            .failure()
            .stderr(contains("--discard-legacy"));
        assert_eq!(stored(dir.path()), imported, "history left in place");
    }
    assert_eq!(imported["--version"], 1);
}

#[test]
fn reset_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();

    watchkeepctl(dir.path())
        .arg("reset")
        .assert()
        .failure()
        .stderr(contains("--yes"));

    watchkeepctl(dir.path())
        .args(["reset", "--yes"])
        .assert()
        .success();
    assert_eq!(stored(dir.path()), json!({ "--version": 2, "items": [] }));

    watchkeepctl(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(contains("version: 2"));
}
