//! Loading configuration from files on disk.

use std::io::Write;

use hermes_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::NamedTempFile;

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file() {
    let file = file_with(
        ".toml",
        r#"
        [server]
        http_addr = "127.0.0.1:4000"
        max_body_bytes = 4096

        [logging]
        format = "pretty"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:4000");
    assert_eq!(config.server.max_body_bytes, 4096);
    assert_eq!(config.server.shutdown_timeout_secs, 30);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_json_file() {
    let file = file_with(".json", r#"{"decoder": {"require_json_content_type": true}}"#);

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert!(config.decoder.require_json_content_type);
}

#[test]
fn test_unknown_field_in_file() {
    let file = file_with(".toml", "[server]\nhttp2_enabled = true\n");

    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::Toml(_))));
}

#[test]
fn test_unsupported_extension() {
    let file = file_with(".yaml", "server: {}\n");

    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
}

#[test]
fn test_optional_file_present() {
    let file = file_with(".toml", "[logging]\nlevel = \"trace\"\n");

    let config = ConfigLoader::new()
        .with_optional_file(file.path())
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_malformed_dotenv_file() {
    let file = file_with(".env", "NOT A VALID LINE WITH 'QUOTE\n");

    let result = ConfigLoader::new().with_dotenv_file(file.path());
    assert!(matches!(result, Err(ConfigError::Dotenv(_))));
}
