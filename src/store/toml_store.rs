//! # TomlStore: node sets from `<dir>/<descriptor>.toml`.
//!
//! ## File format
//! ```toml
//! [[node]]
//! identity = "hv-01"
//! config_ref = "arich/hv/sector1"
//!
//! [[node]]
//! identity = "hv-02"
//! config_ref = "arich/hv/sector2"
//! enabled = false        # optional, default true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ConfigError, ConfigStore, ensure_unique};
use crate::nodes::NodeDescriptor;

#[derive(Debug, Deserialize)]
struct NodeSetFile {
    #[serde(default)]
    node: Vec<NodeDescriptor>,
}

/// Directory of TOML node-set files.
#[derive(Debug, Clone)]
pub struct TomlStore {
    dir: PathBuf,
}

impl TomlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parses a node-set document.
    pub fn parse(text: &str, origin: &str) -> Result<Vec<NodeDescriptor>, ConfigError> {
        let file: NodeSetFile = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        ensure_unique(&file.node)?;
        Ok(file.node)
    }

    fn path_of(&self, descriptor: &str) -> Result<PathBuf, ConfigError> {
        let plain = !descriptor.is_empty()
            && descriptor
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !descriptor.starts_with('.');
        if !plain {
            return Err(ConfigError::InvalidDescriptor {
                descriptor: descriptor.to_string(),
            });
        }
        Ok(self.dir.join(format!("{descriptor}.toml")))
    }
}

impl ConfigStore for TomlStore {
    fn load(&self, descriptor: &str) -> Result<Vec<NodeDescriptor>, ConfigError> {
        let path = self.path_of(descriptor)?;
        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound {
                descriptor: descriptor.to_string(),
            },
            _ => ConfigError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        tracing::debug!(path = %path.display(), "loading node set");
        Self::parse(&text, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let nodes = TomlStore::parse(
            r#"
            [[node]]
            identity = "hv-01"
            config_ref = "a"

            [[node]]
            identity = "hv-02"
            enabled = false
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].enabled);
        assert_eq!(nodes[0].config_ref, "a");
        assert!(!nodes[1].enabled);
        assert_eq!(nodes[1].config_ref, "");
    }

    #[test]
    fn loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("arich.toml"),
            "[[node]]\nidentity = \"x\"\n[[node]]\nidentity = \"y\"\n",
        )
        .unwrap();

        let store = TomlStore::new(dir.path());
        let nodes = store.load("arich").unwrap();
        let ids: Vec<_> = nodes.iter().map(|n| n.identity.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);

        assert_eq!(store.load("nope").unwrap_err().as_label(), "config_not_found");
        assert_eq!(
            store.load("../etc/passwd").unwrap_err().as_label(),
            "config_invalid_descriptor"
        );
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = TomlStore::parse("[[node]]\nenabled = 3\n", "inline").unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }
}
