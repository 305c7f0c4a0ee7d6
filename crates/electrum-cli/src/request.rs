//! JSON-RPC request lines and server address handling.

use electrum_core::constants::{DEFAULT_TCP_PORT, DEFAULT_TLS_PORT, DELIMITER};
use serde_json::{Value, json};

/// Build one newline-terminated JSON-RPC 2.0 request.
///
/// Each parameter is parsed as JSON when possible (`1`, `true`, `["a"]`)
/// and sent as a plain string otherwise.
pub fn build_request(id: u64, method: &str, params: &[String]) -> serde_json::Result<Vec<u8>> {
    let params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();

    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    });

    let mut line = serde_json::to_vec(&request)?;
    line.push(DELIMITER);
    Ok(line)
}

fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// The `id` of a response frame, if it parses as a JSON object carrying one.
pub fn response_id(payload: &[u8]) -> Option<u64> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    value.get("id")?.as_u64()
}

/// Raw line with the delimiter appended when missing.
pub fn terminated(line: &str) -> Vec<u8> {
    let mut bytes = line.as_bytes().to_vec();
    if bytes.last() != Some(&DELIMITER) {
        bytes.push(DELIMITER);
    }
    bytes
}

/// Append the conventional Electrum port when `server` has none.
pub fn with_default_port(server: &str, tls: bool) -> String {
    if has_port(server) {
        return server.to_string();
    }

    let port = if tls { DEFAULT_TLS_PORT } else { DEFAULT_TCP_PORT };

    // Bare IPv6 literal needs brackets before a port can follow
    if server.contains(':') && !server.starts_with('[') {
        format!("[{}]:{}", server, port)
    } else {
        format!("{}:{}", server, port)
    }
}

fn has_port(server: &str) -> bool {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            let host_ok = !host.is_empty() && (!host.contains(':') || host.ends_with(']'));
            host_ok && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}
