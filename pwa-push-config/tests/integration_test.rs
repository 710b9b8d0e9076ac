//! Integration tests for pwa-push-config

use pwa_push::{ContentEncoding, VapidKeyPair};
use pwa_push_config::*;
use std::env;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_toml_file_with_keys() {
    let keys = VapidKeyPair::generate().unwrap();
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "push.toml",
        &format!(
            r#"
public_key = "{}"
private_key = "{}"
admin_email = "admin@example.com"
concurrency = 2
encoding = "aes128gcm"
"#,
            keys.public_key, keys.private_key
        ),
    );

    let settings = SettingsLoader::new().without_env().file(&path).load().unwrap();
    let (loaded, config) = settings.into_parts().unwrap();

    assert_eq!(loaded, keys);
    assert_eq!(config.concurrency, 2);
    assert_eq!(config.encoding, ContentEncoding::Aes128Gcm);
    assert_eq!(config.ttl, 86400);
}

#[test]
fn test_later_layers_win() {
    let dir = TempDir::new().unwrap();
    let json = write(&dir, "push.json", r#"{"admin_email": "file@example.com", "ttl": 100, "topic": "file"}"#);
    let dotenv = write(&dir, ".env", "PWA_PUSH_TTL=200\nPWA_PUSH_TOPIC=dotenv\n");

    let settings = SettingsLoader::new()
        .without_env()
        .file(&json)
        .file(&dotenv)
        .set("topic", "override")
        .load_with_env(vec![("admin_email".to_string(), "env@example.com".to_string())])
        .unwrap();

    assert_eq!(settings.admin_email, "env@example.com");
    assert_eq!(settings.ttl, 200);
    assert_eq!(settings.topic.as_deref(), Some("override"));
}

#[test]
fn test_process_environment() {
    unsafe {
        env::set_var("PWA_PUSH_IT_ADMIN_EMAIL", "ops@example.com");
        env::set_var("PWA_PUSH_IT_CONCURRENCY", "3");
    }

    let settings = SettingsLoader::new().env_prefix("PWA_PUSH_IT").load().unwrap();
    assert_eq!(settings.admin_email, "ops@example.com");
    assert_eq!(settings.concurrency, 3);

    unsafe {
        env::remove_var("PWA_PUSH_IT_ADMIN_EMAIL");
        env::remove_var("PWA_PUSH_IT_CONCURRENCY");
    }
}

#[test]
fn test_mismatched_keys_are_rejected() {
    let a = VapidKeyPair::generate().unwrap();
    let b = VapidKeyPair::generate().unwrap();

    let settings = SettingsLoader::new()
        .without_env()
        .set("admin_email", "admin@example.com")
        .set("public_key", a.public_key.as_str())
        .set("private_key", b.private_key.as_str())
        .load()
        .unwrap();

    assert!(matches!(settings.vapid_keys(), Err(ConfigError::Push(_))));
}

#[test]
fn test_missing_file() {
    let result = SettingsLoader::new().without_env().file("/nonexistent/push.json").load();
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_invalid_contact_fails_validation() {
    let result = SettingsLoader::new()
        .without_env()
        .set("admin_email", "not-an-address")
        .load();
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::Missing("private_key".to_string());
    assert!(err.to_string().contains("private_key"));
}
