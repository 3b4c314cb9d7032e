use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("relent-{nanos}-{name}"))
}

fn write_tasks(store_dir: &Path, tasks: serde_json::Value) {
    std::fs::create_dir_all(store_dir).unwrap();
    std::fs::write(
        store_dir.join("tasks.json"),
        serde_json::to_string_pretty(&tasks).unwrap(),
    )
    .unwrap();
}

fn relent(store_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_relent"))
        .args(args)
        .env("RELENT_STORE_DIR", store_dir)
        .env("RELENT_CONFIG_PATH", store_dir.join("missing-config.json"))
        .env("RELENT_DISABLE_NOTIFICATIONS", "1")
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run relent")
}

fn task(id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": "Dentist",
        "description": "",
        "deadline": "2025-12-21T00:00:00Z",
        "reminderInterval": 30,
        "lastReminderSent": "2025-12-21T00:30:00Z",
        "status": status,
        "createdAt": "2025-12-20T00:00:00Z"
    })
}

#[test]
fn done_toggles_both_ways_and_keeps_reminder_stamp() {
    let store_dir = temp_dir("done-toggle");
    write_tasks(&store_dir, serde_json::json!([task("task-1", "pending")]));

    let first = relent(&store_dir, &["done", "task-1", "--json"]);
    let second = relent(&store_dir, &["done", "task-1", "--json"]);
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store_dir.join("tasks.json")).unwrap())
            .unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(first.status.success());
    let first: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    assert_eq!(first["status"], "done");

    assert!(second.status.success());
    let second: serde_json::Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(second["status"], "pending");

    assert_eq!(stored[0]["status"], "pending");
    assert_eq!(stored[0]["lastReminderSent"], "2025-12-21T00:30:00Z");
}

#[test]
fn done_accepts_unique_prefix() {
    let store_dir = temp_dir("done-prefix");
    write_tasks(
        &store_dir,
        serde_json::json!([task("ab12-one", "pending"), task("cd34-two", "pending")]),
    );

    let output = relent(&store_dir, &["done", "cd34"]);
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store_dir.join("tasks.json")).unwrap())
            .unwrap();
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(output.status.success());
    assert_eq!(stored[0]["status"], "pending");
    assert_eq!(stored[1]["status"], "done");
}

#[test]
fn done_unknown_id_is_not_found() {
    let store_dir = temp_dir("done-missing");
    write_tasks(&store_dir, serde_json::json!([task("task-1", "pending")]));

    let output = relent(&store_dir, &["done", "nope"]);
    std::fs::remove_dir_all(&store_dir).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: not_found"));
}
