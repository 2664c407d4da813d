//! Host registry: parses the configured target list into [`HostConfig`]
//! records.
//!
//! Two input modes are supported: an inline comma-separated list of
//! colon-delimited entries, or a JSON side file. Any malformed entry is a
//! fatal configuration error; the process must not start the polling loop
//! with a partial registry.

use crate::config::Settings;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Registry parsing error types.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("wrong PIHOLE_HOSTS entry <{0}>")]
    MalformedEntry(String),
    #[error("invalid port <{port}> in PIHOLE_HOSTS entry <{entry}>")]
    InvalidPort { entry: String, port: String },
    #[error("hosts file {0} not found")]
    FileNotFound(String),
    #[error("failed to read hosts file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse hosts file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("hosts file {0} does not contain a JSON array")]
    NotAnArray(String),
    #[error("missing key \"{key}\" in hosts file entry #{index}")]
    MissingKey { key: &'static str, index: usize },
    #[error("invalid value for key \"{key}\" in hosts file entry #{index}")]
    InvalidValue { key: &'static str, index: usize },
}

/// A single Pi-hole target. Immutable once loaded.
#[derive(Debug, Clone, Serialize)]
pub struct HostConfig {
    pub address: String,
    pub port: u16,
    pub name: String,
    pub token: Option<String>,
}

impl HostConfig {
    /// `address:port(name)` label used in log lines.
    pub fn label(&self) -> String {
        format!("{}:{}({})", self.address, self.port, self.name)
    }
}

/// Load the registry from the configured source.
///
/// The literal value `file` selects the JSON side file; anything else is
/// parsed as an inline list.
pub fn load(settings: &Settings) -> Result<Vec<HostConfig>, RegistryError> {
    if settings.pihole_hosts == "file" {
        let hosts = load_from_file(Path::new(&settings.pihole_hosts_file))?;
        tracing::debug!(
            "Imported hosts definitions from file {}",
            settings.pihole_hosts_file
        );
        Ok(hosts)
    } else {
        parse_inline(&settings.pihole_hosts)
    }
}

/// Parse a comma-separated list of `host:port:token:name` entries.
///
/// A three-field `host:port:name` entry is accepted for targets without a
/// credential; any other field count is an error.
pub fn parse_inline(list: &str) -> Result<Vec<HostConfig>, RegistryError> {
    let mut hosts = Vec::new();

    for entry in list.split(',') {
        let fields: Vec<&str> = entry.split(':').collect();
        let (address, port, token, name) = match fields.as_slice() {
            [address, port, token, name] => (*address, *port, Some((*token).to_string()), *name),
            [address, port, name] => (*address, *port, None, *name),
            _ => return Err(RegistryError::MalformedEntry(entry.to_string())),
        };

        let port: u16 = port.parse().map_err(|_| RegistryError::InvalidPort {
            entry: entry.to_string(),
            port: port.to_string(),
        })?;

        hosts.push(HostConfig {
            address: address.to_string(),
            port,
            name: name.to_string(),
            token,
        });
    }

    Ok(hosts)
}

/// Load hosts from a JSON side file: an array of objects each carrying the
/// keys `host`, `name`, `port` and `password`.
pub fn load_from_file(path: &Path) -> Result<Vec<HostConfig>, RegistryError> {
    if !path.is_file() {
        return Err(RegistryError::FileNotFound(path.display().to_string()));
    }

    let raw = fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let parsed: Value = serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let entries = parsed
        .as_array()
        .ok_or_else(|| RegistryError::NotAnArray(path.display().to_string()))?;

    let mut hosts = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        // Entry positions are reported 1-based for the operator.
        let index = position + 1;

        hosts.push(HostConfig {
            address: required_string(entry, "host", index)?,
            port: required_port(entry, index)?,
            name: required_string(entry, "name", index)?,
            token: Some(required_string(entry, "password", index)?),
        });
    }

    Ok(hosts)
}

fn required_key<'a>(
    entry: &'a Value,
    key: &'static str,
    index: usize,
) -> Result<&'a Value, RegistryError> {
    entry
        .get(key)
        .ok_or(RegistryError::MissingKey { key, index })
}

fn required_string(entry: &Value, key: &'static str, index: usize) -> Result<String, RegistryError> {
    required_key(entry, key, index)?
        .as_str()
        .map(str::to_string)
        .ok_or(RegistryError::InvalidValue { key, index })
}

/// The port key may hold either a JSON number or a numeric string.
fn required_port(entry: &Value, index: usize) -> Result<u16, RegistryError> {
    let value = required_key(entry, "port", index)?;
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    port.ok_or(RegistryError::InvalidValue { key: "port", index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_inline_with_tokens() {
        let hosts = parse_inline("10.0.0.5:80:secret:dns1,10.0.0.6:8080:other:dns2").unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].address, "10.0.0.5");
        assert_eq!(hosts[0].port, 80);
        assert_eq!(hosts[0].token.as_deref(), Some("secret"));
        assert_eq!(hosts[0].name, "dns1");
        assert_eq!(hosts[1].name, "dns2");
    }

    #[test]
    fn test_parse_inline_without_tokens() {
        let hosts = parse_inline("10.0.0.5:80:dns1").unwrap();
        assert_eq!(hosts.len(), 1);
        assert!(hosts[0].token.is_none());
        assert_eq!(hosts[0].name, "dns1");
    }

    #[test]
    fn test_parse_inline_rejects_wrong_field_count() {
        let err = parse_inline("10.0.0.5:80:secret:dns1,10.0.0.6:8080").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedEntry(entry) if entry == "10.0.0.6:8080"));
    }

    #[test]
    fn test_parse_inline_rejects_bad_port() {
        let err = parse_inline("10.0.0.5:http:secret:dns1").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPort { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"host": "10.0.0.5", "name": "dns1", "port": 80, "password": "secret"}},
               {{"host": "10.0.0.6", "name": "dns2", "port": "8080", "password": "other"}}]"#
        )
        .unwrap();

        let hosts = load_from_file(file.path()).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].label(), "10.0.0.5:80(dns1)");
        assert_eq!(hosts[1].port, 8080);
    }

    #[test]
    fn test_load_from_file_reports_missing_key_and_position() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"host": "10.0.0.5", "name": "dns1", "port": 80, "password": "secret"}},
               {{"host": "10.0.0.6", "name": "dns2", "port": 8080}}]"#
        )
        .unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MissingKey { key: "password", index: 2 }
        ));
    }

    #[test]
    fn test_load_from_file_rejects_non_array() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"host": "10.0.0.5"}}"#).unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, RegistryError::NotAnArray(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = load_from_file(Path::new("/nonexistent/pihole_hosts")).unwrap_err();
        assert!(matches!(err, RegistryError::FileNotFound(_)));
    }
}
