// Integration test for configuration file support

use serverctl::config::{AutoReload, ServerConfig};
use serverctl::error::ServerCtlError;
use serverctl::supervisor::SignalKind;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_toml_single_server() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("serverctl.toml");

    let toml_content = r#"
        name = "chatroom"
        description = "Chat room websocket server"
        pid_file = "/var/run/chatroom.pid"
        auto_reload = 5000
        stop_timeout_secs = 20
        lock = true

        [server]
        command = "/usr/bin/php"
        args = ["think", "swoole"]
        write_pid_file = false

        [server.env]
        APP_ENV = "production"
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let configs = ServerConfig::from_file(&config_path).unwrap();
    assert_eq!(configs.len(), 1);

    let config = &configs[0];
    assert_eq!(config.name, "chatroom");
    assert_eq!(config.description, "Chat room websocket server");
    assert_eq!(config.pid_file, PathBuf::from("/var/run/chatroom.pid"));
    assert_eq!(config.auto_reload, AutoReload::Millis(5000));
    assert_eq!(config.stop_timeout_secs, 20);
    assert!(config.lock);
    assert_eq!(config.stop_signal, SignalKind::Terminate);
    assert_eq!(config.reload_signal, SignalKind::User1);
    assert_eq!(config.server.args, vec!["think", "swoole"]);
    assert_eq!(
        config.server.env.get("APP_ENV"),
        Some(&"production".to_string())
    );
}

#[test]
fn test_load_toml_multiple_servers_and_select() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("serverctl.toml");

    let toml_content = r#"
        [[servers]]
        name = "http"
        pid_file = "/tmp/http.pid"
        server = { command = "/usr/local/bin/http-server" }

        [[servers]]
        name = "ws"
        pid_file = "/tmp/ws.pid"
        reload_signal = "SIGHUP"
        server = { command = "/usr/local/bin/ws-server", args = ["--port", "9501"] }
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let configs = ServerConfig::from_file(&config_path).unwrap();
    assert_eq!(configs.len(), 2);

    let ws = ServerConfig::select(configs, "ws").unwrap();
    assert_eq!(ws.reload_signal, SignalKind::Hangup);
    assert_eq!(ws.server.args, vec!["--port", "9501"]);
}

#[test]
fn test_load_json_single_server() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("serverctl.json");

    let json_content = r#"
        {
            "name": "api",
            "pid_file": "/tmp/api.pid",
            "auto_reload": true,
            "stop_signal": "SIGINT",
            "server": {
                "command": "/usr/bin/node",
                "args": ["api.js"],
                "write_pid_file": true
            }
        }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let configs = ServerConfig::from_file(&config_path).unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].auto_reload, AutoReload::Switch(true));
    assert_eq!(configs[0].stop_signal, SignalKind::Interrupt);
    assert!(configs[0].server.write_pid_file);
}

#[test]
fn test_env_expansion_in_paths() {
    std::env::set_var("SERVERCTL_IT_RUN_DIR", "/run/serverctl");
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("serverctl.toml");

    let toml_content = r#"
        name = "http"
        pid_file = "${SERVERCTL_IT_RUN_DIR}/http.pid"

        [server]
        command = "/bin/sh"
        args = ["-c", "echo $SERVERCTL_IT_RUN_DIR"]
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let configs = ServerConfig::from_file(&config_path).unwrap();
    assert_eq!(configs[0].pid_file, PathBuf::from("/run/serverctl/http.pid"));
    assert_eq!(configs[0].server.args[1], "echo /run/serverctl");
}

#[test]
fn test_config_validation_empty_pid_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("serverctl.json");

    let json_content = r#"
        {
            "name": "api",
            "pid_file": "",
            "server": {"command": "/usr/bin/node"}
        }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let result = ServerConfig::from_file(&config_path);
    assert!(matches!(
        result,
        Err(ServerCtlError::MissingConfigField(field)) if field == "pid_file"
    ));
}

#[test]
fn test_config_invalid_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("serverctl.json");
    fs::write(&config_path, "{ not json").unwrap();

    assert!(matches!(
        ServerConfig::from_file(&config_path),
        Err(ServerCtlError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_missing_file() {
    let result = ServerConfig::from_file(&PathBuf::from("/nonexistent/serverctl.toml"));
    assert!(matches!(result, Err(ServerCtlError::ConfigError(_))));
}
