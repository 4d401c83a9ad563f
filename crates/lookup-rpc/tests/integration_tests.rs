//! Integration tests for the lookup-rpc server.
//!
//! These run a real server, either in-process through `start_server` or as
//! the `lookup-rpc` binary, and talk to it over TCP.

use lookup_plugin::{FunctionRegistry, Value};
use lookup_rpc::{start_server, ServeOptions};
use serde_json::Value as Json;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

fn ephemeral() -> ServeOptions {
    ServeOptions {
        host: "127.0.0.1".to_string(),
        min_port: 0,
        max_port: 0,
    }
}

async fn fetch(url: &str, params: &[(&str, &str)]) -> (u16, String) {
    let response = reqwest::Client::new()
        .get(url)
        .query(params)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_in_process_server() {
    let registry = FunctionRegistry::new();
    registry
        .register_lookup_key("my_lk", |_ctx, key| {
            Ok(if key == "host" {
                Value::from("example.com")
            } else {
                Value::Null
            })
        })
        .unwrap();

    let handle = start_server(&registry, &ephemeral()).await.unwrap();
    let base = format!("http://{}/lookup_key/my_lk", handle.addr);

    assert_eq!(
        fetch(&base, &[("key", "host")]).await,
        (200, r#""example.com""#.to_string())
    );
    assert_eq!(
        fetch(&base, &[("key", "port")]).await,
        (404, "404 value not found".to_string())
    );

    let response = reqwest::Client::new().post(&base).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 405);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_start_server_rejects_empty_registry() {
    assert!(start_server(&FunctionRegistry::new(), &ephemeral())
        .await
        .is_err());
}

struct PluginProcess {
    child: tokio::process::Child,
    handshake: Json,
}

impl Drop for PluginProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Start the plugin binary and read its handshake line.
async fn start_plugin() -> Result<PluginProcess, String> {
    let binary = PathBuf::from(env!("CARGO_BIN_EXE_lookup-rpc"));
    let mut child = tokio::process::Command::new(&binary)
        .arg("--host")
        .arg("127.0.0.1")
        .env("LOOKUP_PLUGIN_MIN_PORT", "0")
        .env("LOOKUP_PLUGIN_MAX_PORT", "0")
        .env("LOOKUP_RPC_TEST_GREETING", "hello")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to spawn lookup-rpc: {e}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| "failed to capture stdout".to_string())?;
    let mut lines = tokio::io::BufReader::new(stdout).lines();

    let line = tokio::time::timeout(Duration::from_secs(20), lines.next_line())
        .await
        .map_err(|_| "handshake line not emitted in time".to_string())?
        .map_err(|e| format!("failed to read lookup-rpc stdout: {e}"))?
        .ok_or_else(|| "lookup-rpc exited before the handshake".to_string())?;
    let handshake =
        serde_json::from_str(&line).map_err(|e| format!("invalid handshake '{line}': {e}"))?;

    Ok(PluginProcess { child, handshake })
}

#[tokio::test]
async fn test_plugin_binary_handshake_and_lookup() {
    let plugin = start_plugin().await.unwrap();
    let handshake = &plugin.handshake;

    assert_eq!(handshake["network"], "tcp");
    assert_eq!(handshake["version"], 1);
    assert_eq!(
        handshake["functions"],
        serde_json::json!({
            "data_dig": ["json_file"],
            "data_hash": ["json_file"],
            "lookup_key": ["environment"],
        })
    );

    let address = handshake["address"].as_str().unwrap();
    let url = format!("http://{}/lookup_key/environment", address);

    assert_eq!(
        fetch(&url, &[("key", "LOOKUP_RPC_TEST_GREETING")]).await,
        (200, r#""hello""#.to_string())
    );
    assert_eq!(
        fetch(
            &url,
            &[
                ("key", "GREETING"),
                ("options", r#"{"prefix":"LOOKUP_RPC_TEST_","sensitive":true}"#),
            ]
        )
        .await,
        (200, r#"{"__ptype":"Sensitive","__pvalue":"hello"}"#.to_string())
    );
    assert_eq!(
        fetch(&url, &[("key", "LOOKUP_RPC_TEST_MISSING")]).await.0,
        404
    );
}
