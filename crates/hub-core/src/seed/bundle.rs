//! Seed bundle loading.
//!
//! A bundle is every `.yaml`, `.yml` and `.json` file under the seed
//! directory, read in sorted path order. YAML is a superset of JSON, so one
//! decoder reads both.

use crate::config::SeedConfig;
use crate::error::{HubError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One seed file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Lowercased item kind (e.g. `tagcategory`).
    pub kind: String,
    pub version: u32,
    pub items: Vec<serde_yaml::Value>,
    /// File the document was read from.
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct RawDocument {
    kind: String,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    items: Vec<serde_yaml::Value>,
}

impl Document {
    /// Parse a document from file content.
    pub fn parse(path: &Path, content: &[u8]) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_slice(content).map_err(|e| HubError::Yaml {
            message: format!("{}: {}", path.display(), e),
            source: Some(e),
        })?;
        if raw.version < 1 {
            return Err(HubError::Config {
                message: format!(
                    "{}: seed version must be >= 1, got {}",
                    path.display(),
                    raw.version
                ),
            });
        }
        Ok(Self {
            kind: raw.kind.to_lowercase(),
            version: raw.version,
            items: raw.items,
            path: path.to_path_buf(),
        })
    }

    /// Parse `content` when it is a seed document (a mapping with `kind`).
    ///
    /// Other YAML, such as rule files referenced by rule sets, yields `None`.
    pub fn parse_if_document(path: &Path, content: &[u8]) -> Result<Option<Self>> {
        let value: serde_yaml::Value = serde_yaml::from_slice(content).map_err(|e| HubError::Yaml {
            message: format!("{}: {}", path.display(), e),
            source: Some(e),
        })?;
        let is_document = value
            .as_mapping()
            .is_some_and(|map| map.contains_key("kind"));
        if !is_document {
            return Ok(None);
        }
        Self::parse(path, content).map(Some)
    }

    /// Directory that relative file references resolve against.
    pub fn base(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Decode every item as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.items
            .iter()
            .map(|item| {
                serde_yaml::from_value(item.clone()).map_err(|e| HubError::Yaml {
                    message: format!("{} ({}): {}", self.path.display(), self.kind, e),
                    source: Some(e),
                })
            })
            .collect()
    }
}

/// Seed documents and their rolling checksum.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub documents: Vec<Document>,
    /// Hex SHA-256 over each file's relative path and content.
    pub checksum: String,
}

impl Bundle {
    /// Load the bundle under `dir`; `None` when the directory does not exist.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| seed_file(p))
            .collect();
        paths.sort();

        let mut hasher = Sha256::new();
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read(&path).map_err(|e| HubError::io_with_path(e, &path))?;
            let relative = path.strip_prefix(dir).unwrap_or(&path);
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(&content);
            // Non-document files still count toward the checksum: rule
            // files are copied into the file store when their rule set is
            // applied.
            match Document::parse_if_document(&path, &content)? {
                Some(document) => {
                    debug!(
                        "Seed document: {} kind={} items={}",
                        relative.display(),
                        document.kind,
                        document.items.len()
                    );
                    documents.push(document);
                }
                None => debug!("Seed file is not a document: {}", relative.display()),
            }
        }

        Ok(Some(Self {
            documents,
            checksum: hex::encode(hasher.finalize()),
        }))
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn seed_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SeedConfig::EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(Bundle::load(&tmp.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn test_load_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b/jobs.yaml", "kind: JobFunction\nversion: 1\nitems:\n- uuid: j1\n  name: Dev\n");
        write(tmp.path(), "a.json", r#"{"kind": "tagcategory", "version": 1, "items": []}"#);
        write(tmp.path(), "notes.txt", "ignored");

        let bundle = Bundle::load(tmp.path()).unwrap().unwrap();
        assert_eq!(bundle.documents.len(), 2);
        assert_eq!(bundle.documents[0].kind, "tagcategory");
        assert_eq!(bundle.documents[1].kind, "jobfunction");
        assert_eq!(bundle.documents[1].base(), tmp.path().join("b"));
        assert_eq!(bundle.checksum.len(), 64);
    }

    #[test]
    fn test_rule_files_are_not_documents() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "rulesets/rulesets.yaml",
            "kind: RuleSet\nversion: 1\nitems:\n- uuid: rs\n  name: Base\n  rules:\n  - path: rules/base.yaml\n",
        );
        write(tmp.path(), "rulesets/rules/base.yaml", "- ruleID: base-1\n");
        write(tmp.path(), "rulesets/rules/meta.yaml", "name: not a document\n");

        let bundle = Bundle::load(tmp.path()).unwrap().unwrap();
        assert_eq!(bundle.documents.len(), 1);
        assert_eq!(bundle.documents[0].kind, "ruleset");

        // Rule content is part of the checksum.
        let before = bundle.checksum;
        write(tmp.path(), "rulesets/rules/base.yaml", "- ruleID: base-2\n");
        let after = Bundle::load(tmp.path()).unwrap().unwrap().checksum;
        assert_ne!(before, after);
    }

    #[test]
    fn test_malformed_yaml_fails() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad.yaml", "kind: [unclosed\n");
        assert!(matches!(Bundle::load(tmp.path()), Err(HubError::Yaml { .. })));
    }

    #[test]
    fn test_checksum_tracks_content() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.yaml", "kind: jobfunction\nversion: 1\n");
        let first = Bundle::load(tmp.path()).unwrap().unwrap().checksum;
        let again = Bundle::load(tmp.path()).unwrap().unwrap().checksum;
        assert_eq!(first, again);

        write(tmp.path(), "a.yaml", "kind: jobfunction\nversion: 2\n");
        let changed = Bundle::load(tmp.path()).unwrap().unwrap().checksum;
        assert_ne!(first, changed);
    }

    #[test]
    fn test_version_required() {
        let err = Document::parse(Path::new("x.yaml"), b"kind: target\nitems: []\n").unwrap_err();
        assert!(matches!(err, HubError::Config { .. }));
    }

    #[test]
    fn test_decode_items() {
        #[derive(Deserialize)]
        struct Item {
            name: String,
        }
        let doc = Document::parse(
            Path::new("seed/x.yaml"),
            b"kind: x\nversion: 1\nitems:\n- name: one\n- name: two\n",
        )
        .unwrap();
        let items: Vec<Item> = doc.decode().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "two");

        let bad = Document::parse(Path::new("x.yaml"), b"kind: x\nversion: 1\nitems:\n- 3\n").unwrap();
        assert!(bad.decode::<Item>().is_err());
    }
}
