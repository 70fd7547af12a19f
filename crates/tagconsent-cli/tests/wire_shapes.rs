//! Wire shape tests: the cookie jar and `consent-updated` payloads written
//! by the `tagconsent` binary, as seen by a consumer of those formats.

use std::path::Path;
use std::process::{Command, Output};

use tagconsent_core::{ConsentCategory, ConsentNotification};

fn tagconsent(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tagconsent"))
        .args(args)
        .env("TAGCONSENT_DATA_DIR", data_dir)
        .env("TAGCONSENT_MEASUREMENT_ID", "G-WIRE")
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn notifications(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|l| l.strip_prefix("consent-updated "))
        .map(|json| serde_json::from_str(json).unwrap())
        .collect()
}

/// Accept-all notification:
/// { key: "all", mode: "accept-all", state: {7 categories}, timestamp: "<millis>" }
#[test]
fn test_accept_all_notification_shape() {
    let dir = tempfile::tempdir().unwrap();
    let output = tagconsent(dir.path(), &["accept-all"]);
    assert!(output.status.success());

    let events = notifications(&output);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event["key"], "all");
    assert_eq!(event["mode"], "accept-all");
    assert!(event["timestamp"].as_str().unwrap().chars().all(|c| c.is_ascii_digit()));

    let state = event["state"].as_object().unwrap();
    assert_eq!(state.len(), 7);
    for category in ConsentCategory::all() {
        assert_eq!(state[category.name()], "granted");
    }

    // Also decodes back into the typed payload.
    let typed: ConsentNotification = serde_json::from_value(event.clone()).unwrap();
    assert!(typed.state.is_uniform(tagconsent_core::ConsentMode::Granted));
}

/// Single-category notification: key is the category name, mode the new mode.
#[test]
fn test_set_notification_shape() {
    let dir = tempfile::tempdir().unwrap();
    let output = tagconsent(dir.path(), &["set", "ad_user_data", "granted"]);
    assert!(output.status.success());

    let events = notifications(&output);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["key"], "ad_user_data");
    assert_eq!(events[0]["mode"], "granted");
    assert_eq!(events[0]["state"]["ad_user_data"], "granted");
    assert_eq!(events[0]["state"]["ad_storage"], "denied");
}

/// The jar holds one `consentConfig` cookie whose value is the
/// percent-encoded JSON record.
#[test]
fn test_cookie_jar_shape() {
    let dir = tempfile::tempdir().unwrap();
    assert!(tagconsent(dir.path(), &["toggle", "analytics_storage"]).status.success());

    let jar: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("cookies.json")).unwrap()).unwrap();
    let cookies = jar.as_array().unwrap();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0]["name"], "consentConfig");
    assert_eq!(cookies[0]["path"], "/");
    assert!(cookies[0]["expires"].is_string());

    let value = cookies[0]["value"].as_str().unwrap();
    assert!(value.starts_with("%7B%22"));
    let decoded = tagconsent_store::decode_component(value).unwrap();
    let record: serde_json::Value = serde_json::from_str(&decoded).unwrap();
    assert_eq!(record["analytics_storage"], "granted");
    assert_eq!(record.as_object().unwrap().len(), 7);
}

#[test]
fn test_status_after_reject_all_reports_returning_user() {
    let dir = tempfile::tempdir().unwrap();
    assert!(tagconsent(dir.path(), &["reject-all"]).status.success());

    let output = tagconsent(dir.path(), &["status"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("New user:       false"));
    assert!(stdout.contains("All denied:     true"));
    assert!(notifications(&output).is_empty());
}

#[test]
fn test_render_markup() {
    let dir = tempfile::tempdir().unwrap();
    let output = tagconsent(dir.path(), &["render"]);
    assert!(output.status.success());

    let html = String::from_utf8_lossy(&output.stdout);
    let consent_at = html.find(r#"gtag("consent", "default""#).unwrap();
    let loader_at = html.find("gtag/js?id=G-WIRE").unwrap();
    let config_at = html.find(r#"gtag("config", "G-WIRE""#).unwrap();
    assert!(consent_at < loader_at);
    assert!(loader_at < config_at);
}

#[test]
fn test_unknown_command_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = tagconsent(dir.path(), &["launch"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown command"));
}
