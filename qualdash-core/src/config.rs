//! Configuration file support for qualdash
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.qualdashrc.json` in project root
//! 3. `qualdash.config.json` in project root
//! 4. `"qualdash"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.
//! Relative paths are resolved against the directory of the config file, or
//! the project root when running on defaults.

use crate::version_diff::{VersionOrder, LABEL_SEPARATOR, PAIR_SEPARATOR};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Data directory used when none is configured
const DEFAULT_DATA_DIR: &str = "data";

/// Prefix stripped from version ids to get their git tag
const DEFAULT_VERSION_PREFIX: &str = "transitfeed-";

/// Versions whose git revision is not `<id minus prefix>`
const DEFAULT_REVISION_OVERRIDES: &[(&str, &str)] = &[("transitfeed-github", "transitfeed-github")];

/// Release order of the analysed transitfeed history
const DEFAULT_VERSION_ORDER: &[&str] = &[
    "transitfeed-1.0.7",
    "transitfeed-1.0.8",
    "transitfeed-1.0.9",
    "transitfeed-1.1.0",
    "transitfeed-1.1.1",
    "transitfeed-1.1.2",
    "transitfeed-1.1.3",
    "transitfeed-1.1.4",
    "transitfeed-1.1.5",
    "transitfeed-1.1.6",
    "transitfeed-1.1.7",
    "transitfeed-1.1.8",
    "transitfeed-1.1.9",
    "transitfeed-1.2.0",
    "transitfeed-1.2.1",
    "transitfeed-1.2.2",
    "transitfeed-1.2.4",
    "transitfeed-1.2.5",
    "transitfeed-1.2.6",
    "transitfeed-1.2.7",
    "transitfeed-1.2.8",
    "transitfeed-1.2.9",
    "transitfeed-1.2.10",
    "transitfeed-1.2.11",
    "transitfeed-1.2.12",
    "transitfeed-github",
    "transitfeed-1.2.3",
    "transitfeed-1.2.13",
    "transitfeed-1.2.14",
    "transitfeed-1.2.15",
    "transitfeed-1.2.16",
];

/// qualdash configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualdashConfig {
    /// Directory holding the precomputed artifacts (default: `data`)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Release order of every known version (default: transitfeed history)
    #[serde(default)]
    pub versions: Vec<String>,

    /// Prefix stripped from a version id to get its git revision
    #[serde(default)]
    pub version_prefix: Option<String>,

    /// Version id -> git revision, for versions the prefix rule does not fit
    #[serde(default)]
    pub revision_overrides: Option<BTreeMap<String, String>>,

    /// Git clone of the analysed project, needed for source diffs
    #[serde(default)]
    pub repository: Option<PathBuf>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub version_order: VersionOrder,
    pub version_prefix: String,
    pub revision_overrides: BTreeMap<String, String>,
    pub repository: Option<PathBuf>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl QualdashConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for version in &self.versions {
            if version.trim().is_empty() {
                anyhow::bail!("versions must not contain empty ids");
            }
            if version.contains(PAIR_SEPARATOR) {
                anyhow::bail!(
                    "version {:?} must not contain '{}' (reserved for version pairs)",
                    version,
                    PAIR_SEPARATOR
                );
            }
            if version.contains(LABEL_SEPARATOR) {
                anyhow::bail!(
                    "version {:?} must not contain '{}' (reserved for version labels)",
                    version,
                    LABEL_SEPARATOR
                );
            }
            if !seen.insert(version.as_str()) {
                anyhow::bail!("version {:?} is listed more than once", version);
            }
        }

        if let Some(ref overrides) = self.revision_overrides {
            for (version, revision) in overrides {
                if version.trim().is_empty() {
                    anyhow::bail!("revision_overrides must not have an empty version key");
                }
                if revision.trim().is_empty() {
                    anyhow::bail!(
                        "revision_overrides.{} must not be an empty revision",
                        version
                    );
                }
            }
        }

        if let Some(ref dir) = self.data_dir {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("data_dir must not be empty");
            }
        }

        Ok(())
    }

    /// Resolve config into its final form, relative paths left as written
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let versions = if self.versions.is_empty() {
            DEFAULT_VERSION_ORDER.iter().map(|v| v.to_string()).collect()
        } else {
            self.versions.clone()
        };

        let revision_overrides = match &self.revision_overrides {
            Some(overrides) => overrides.clone(),
            None => DEFAULT_REVISION_OVERRIDES
                .iter()
                .map(|(v, r)| (v.to_string(), r.to_string()))
                .collect(),
        };

        Ok(ResolvedConfig {
            data_dir: self
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            version_order: VersionOrder::new(versions),
            version_prefix: self
                .version_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_VERSION_PREFIX.to_string()),
            revision_overrides,
            repository: self.repository.clone(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        QualdashConfig::default().resolve()
    }

    /// Git revision of a version id
    ///
    /// An override wins; otherwise the configured prefix is stripped.
    pub fn revision_for<'a>(&'a self, version: &'a str) -> &'a str {
        if let Some(revision) = self.revision_overrides.get(version) {
            return revision;
        }
        version
            .strip_prefix(self.version_prefix.as_str())
            .unwrap_or(version)
    }

    /// Make relative paths absolute against `base`
    fn anchor(mut self, base: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = base.join(&self.data_dir);
        }
        if let Some(repo) = self.repository.take() {
            self.repository = Some(if repo.is_relative() { base.join(repo) } else { repo });
        }
        self
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.qualdashrc.json`
/// 2. `qualdash.config.json`
/// 3. `"qualdash"` key in `package.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(QualdashConfig, PathBuf)>> {
    // 1. .qualdashrc.json
    let rc_path = project_root.join(".qualdashrc.json");
    if rc_path.exists() {
        let config = load_config_file(&rc_path)?;
        return Ok(Some((config, rc_path)));
    }

    // 2. qualdash.config.json
    let config_path = project_root.join("qualdash.config.json");
    if config_path.exists() {
        let config = load_config_file(&config_path)?;
        return Ok(Some((config, config_path)));
    }

    // 3. package.json "qualdash" key
    let pkg_path = project_root.join("package.json");
    if pkg_path.exists() {
        if let Some(config) = load_from_package_json(&pkg_path)? {
            return Ok(Some((config, pkg_path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<QualdashConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: QualdashConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load qualdash config from the "qualdash" key in package.json
fn load_from_package_json(path: &Path) -> Result<Option<QualdashConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("qualdash") {
        Some(value) => {
            let config: QualdashConfig = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid qualdash config in {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid qualdash config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (QualdashConfig::default(), None),
        }
    };

    let base = source_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(project_root)
        .to_path_buf();

    let mut resolved = config.resolve()?.anchor(&base);
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = QualdashConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert_eq!(resolved.data_dir, PathBuf::from("data"));
        assert_eq!(resolved.version_order.len(), 31);
        assert_eq!(resolved.version_prefix, "transitfeed-");
        assert!(resolved.repository.is_none());
        assert!(resolved
            .version_order
            .is_adjacent("transitfeed-github", "transitfeed-1.2.3"));
    }

    #[test]
    fn test_default_version_order_is_valid() {
        let config = QualdashConfig {
            versions: DEFAULT_VERSION_ORDER.iter().map(|v| v.to_string()).collect(),
            ..QualdashConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "data_dir": "/srv/qualdash",
            "versions": ["app-1.0", "app-1.1", "app-2.0"],
            "version_prefix": "app-",
            "revision_overrides": {"app-2.0": "main"},
            "repository": "/src/app"
        }"#;
        let config: QualdashConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.data_dir, PathBuf::from("/srv/qualdash"));
        assert_eq!(resolved.version_order.as_slice(), ["app-1.0", "app-1.1", "app-2.0"]);
        assert_eq!(resolved.revision_for("app-1.1"), "1.1");
        assert_eq!(resolved.revision_for("app-2.0"), "main");
        assert_eq!(resolved.repository, Some(PathBuf::from("/src/app")));
    }

    #[test]
    fn test_revision_for_defaults() {
        let resolved = ResolvedConfig::defaults().unwrap();
        assert_eq!(resolved.revision_for("transitfeed-1.0.7"), "1.0.7");
        assert_eq!(resolved.revision_for("transitfeed-github"), "transitfeed-github");
        assert_eq!(resolved.revision_for("v3"), "v3");
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"unknown_field": true}"#;
        let result: Result<QualdashConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_duplicate_versions() {
        let json = r#"{"versions": ["a", "b", "a"]}"#;
        let config: QualdashConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_pair_separator_in_version() {
        let json = r#"{"versions": ["a&b"]}"#;
        let config: QualdashConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_label_separator_in_version() {
        let json = r#"{"versions": ["1--a"]}"#;
        let config: QualdashConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_empty_override() {
        let json = r#"{"revision_overrides": {"a": " "}}"#;
        let config: QualdashConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_qualdashrc() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".qualdashrc.json");
        fs::write(&config_path, r#"{"version_prefix": "app-"}"#).unwrap();

        let result = discover_config(dir.path()).unwrap();
        assert!(result.is_some());
        let (config, path) = result.unwrap();
        assert_eq!(config.version_prefix.as_deref(), Some("app-"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_package_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
            "name": "vis",
            "version": "0.1.0",
            "qualdash": {"data_dir": "back/data"}
        }"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("back/data")));
    }

    #[test]
    fn test_discover_package_json_without_qualdash_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "vis"}"#).unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();

        // Create both config files - .qualdashrc.json should win
        fs::write(dir.path().join(".qualdashrc.json"), r#"{"version_prefix": "a-"}"#).unwrap();
        fs::write(
            dir.path().join("qualdash.config.json"),
            r#"{"version_prefix": "b-"}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.version_prefix.as_deref(),
            Some("a-"),
            ".qualdashrc.json should take priority"
        );
    }

    #[test]
    fn test_load_and_resolve_defaults_anchor_at_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.data_dir, dir.path().join("data"));
    }

    #[test]
    fn test_load_and_resolve_explicit_path_anchors_at_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("conf");
        fs::create_dir_all(&nested).unwrap();
        let config_path = nested.join("custom.json");
        fs::write(&config_path, r#"{"data_dir": "artifacts", "repository": "clone"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.data_dir, nested.join("artifacts"));
        assert_eq!(resolved.repository, Some(nested.join("clone")));
        assert_eq!(resolved.config_path, Some(config_path));
    }
}
