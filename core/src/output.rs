//! # Result File Parsing
//!
//! The scanners write either plain `host:port` lines or JSON. Output from
//! interrupted runs regularly ends in a half-written line, so JSON parsing
//! keeps every record it can read and drops the rest.

use std::fs;
use std::io;
use std::path::Path;

use mtscan_common::error::OutputError;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Lines(Vec<String>),
    Json(Vec<Value>),
}

impl Records {
    pub fn len(&self) -> usize {
        match self {
            Records::Lines(lines) => lines.len(),
            Records::Json(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn parse(path: &Path, format: OutputFormat) -> Result<Records, OutputError> {
    match format {
        OutputFormat::Text => read_lines(path).map(Records::Lines),
        OutputFormat::Json => read_json_records(path).map(Records::Json),
    }
}

/// Non-blank lines, trimmed.
pub fn read_lines(path: &Path) -> Result<Vec<String>, OutputError> {
    let raw = read(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// A JSON array document, or else one JSON value per line.
pub fn read_json_records(path: &Path) -> Result<Vec<Value>, OutputError> {
    let raw = read(path)?;
    Ok(parse_json_records(&raw))
}

pub fn parse_json_records(raw: &str) -> Vec<Value> {
    if let Ok(Value::Array(values)) = serde_json::from_str::<Value>(raw) {
        return values;
    }

    let mut skipped = 0usize;
    let records: Vec<Value> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        debug!("Skipped {skipped} malformed JSON line(s)");
    }
    records
}

/// `url` of every probe record, first occurrence wins.
pub fn service_urls(records: &[Value]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in records.iter().filter_map(|r| r.get("url").and_then(Value::as_str)) {
        let url = url.trim();
        if !url.is_empty() && !urls.iter().any(|seen| seen == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// `host:port` of every port scanner record, first occurrence wins.
///
/// The host name is preferred over the address; IPv6 addresses are
/// bracketed so the result stays parseable.
pub fn port_endpoints(records: &[Value]) -> Vec<String> {
    let mut endpoints: Vec<String> = Vec::new();
    for record in records {
        let Some(endpoint) = port_endpoint(record) else {
            continue;
        };
        if !endpoints.contains(&endpoint) {
            endpoints.push(endpoint);
        }
    }
    endpoints
}

fn port_endpoint(record: &Value) -> Option<String> {
    let host = text_field(record, "host").or_else(|| text_field(record, "ip"))?;
    let port = match record.get("port")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    if host.contains(':') && !host.starts_with('[') {
        Some(format!("[{host}]:{port}"))
    } else {
        Some(format!("{host}:{port}"))
    }
}

fn text_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn read(path: &Path) -> Result<String, OutputError> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(OutputError::Missing(path.to_path_buf())),
        Err(source) => Err(OutputError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_lines_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulns.jsonl");
        fs::write(&path, "{\"a\":1}\n not-json\n {\"b\":2}\n").unwrap();

        let records = read_json_records(&path).unwrap();
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn whole_array_documents_are_accepted() {
        let records = parse_json_records("[{\"host\":\"a\"},{\"host\":\"b\"}]");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn a_single_object_document_counts_once() {
        let records = parse_json_records("{\"url\":\"http://a\"}\n");
        assert_eq!(records, vec![json!({"url": "http://a"})]);
    }

    #[test]
    fn missing_file_is_an_explicit_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");

        assert!(matches!(read_lines(&path), Err(OutputError::Missing(_))));
        assert!(matches!(
            parse(&path, OutputFormat::Json),
            Err(OutputError::Missing(_))
        ));
    }

    #[test]
    fn text_mode_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ports.txt");
        fs::write(&path, "a.com:80\n\n  \na.com:443\n").unwrap();

        assert_eq!(
            parse(&path, OutputFormat::Text).unwrap(),
            Records::Lines(vec!["a.com:80".into(), "a.com:443".into()])
        );
    }

    #[test]
    fn service_urls_are_deduplicated_in_order() {
        let records = vec![
            json!({"url": "https://a.example", "status_code": 200}),
            json!({"input": "b.example"}),
            json!({"url": "http://a.example"}),
            json!({"url": "https://a.example"}),
        ];
        assert_eq!(service_urls(&records), vec!["https://a.example", "http://a.example"]);
    }

    #[test]
    fn port_records_become_endpoints() {
        let records = vec![
            json!({"host": "example.com", "ip": "93.184.216.34", "port": 443, "protocol": "tcp"}),
            json!({"ip": "10.0.0.5", "port": "8080"}),
            json!({"host": "", "ip": "::1", "port": 22}),
            json!({"host": "example.com", "port": 443}),
            json!({"host": "no-port.example"}),
            json!({"port": 80}),
        ];
        assert_eq!(
            port_endpoints(&records),
            vec!["example.com:443", "10.0.0.5:8080", "[::1]:22"]
        );
    }
}
