///
/// # Binding Configuration
///
/// Decides where the SQLite3 library image comes from and how it is located.
/// The configuration is read once, before the binding loads, and is usually
/// kept in a TOML file:
///
/// ```toml
/// library_name = "libsqlite3.so"
/// search_paths = ["/opt/sqlite/lib"]
/// cache_dir = "/var/cache/naml"
/// system_fallback = true
/// require_all_symbols = false
///
/// [source]
/// kind = "file"
/// path = "/opt/sqlite/lib/libsqlite3.so"
/// ```
///
/// ## Sources
///
/// - `linked`: the engine statically linked into the process
/// - `search`: search well-known locations, then the system loader
/// - `file`: an explicit image path
/// - embedded: an in-memory image, only settable from Rust
///
/// ## Environment
///
/// `from_env()` starts from the file named by `NAML_SQLITE3_CONFIG` (or the
/// defaults), then `NAML_SQLITE3_LIBRARY` forces a `file` source and
/// `NAML_SQLITE3_SOURCE` selects `linked` or `search`.
///

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;

pub const ENV_CONFIG: &str = "NAML_SQLITE3_CONFIG";
pub const ENV_LIBRARY: &str = "NAML_SQLITE3_LIBRARY";
pub const ENV_SOURCE: &str = "NAML_SQLITE3_SOURCE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LibrarySource {
    Linked,
    Search,
    File { path: PathBuf },
    #[serde(skip)]
    Embedded(Arc<[u8]>),
}

impl Default for LibrarySource {
    fn default() -> Self {
        if cfg!(feature = "linked") {
            LibrarySource::Linked
        } else {
            LibrarySource::Search
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BindingConfig {
    pub source: LibrarySource,
    pub library_name: String,
    pub search_paths: Vec<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub system_fallback: bool,
    pub require_all_symbols: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            source: LibrarySource::default(),
            library_name: default_library_name().to_string(),
            search_paths: Vec::new(),
            cache_dir: None,
            system_fallback: true,
            require_all_symbols: false,
        }
    }
}

pub fn default_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "sqlite3.dll"
    } else if cfg!(target_os = "macos") {
        "libsqlite3.dylib"
    } else {
        "libsqlite3.so"
    }
}

pub fn parse_config(path: &Path) -> Result<BindingConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<BindingConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

impl BindingConfig {
    pub fn linked() -> Self {
        Self {
            source: LibrarySource::Linked,
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: LibrarySource::File { path: path.into() },
            ..Self::default()
        }
    }

    /// An in-memory image, e.g. from `include_bytes!`.
    pub fn embedded(image: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: LibrarySource::Embedded(image.into()),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let config = match std::env::var_os(ENV_CONFIG) {
            Some(path) if !path.is_empty() => parse_config(Path::new(&path))?,
            _ => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply the environment overrides, reading variables through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_LIBRARY).filter(|p| !p.is_empty()) {
            self.source = LibrarySource::File { path: PathBuf::from(path) };
        }
        match lookup(ENV_SOURCE).as_deref() {
            Some("linked") => self.source = LibrarySource::Linked,
            Some("search") => self.source = LibrarySource::Search,
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config, BindingConfig::default());
        assert!(config.system_fallback);
        assert!(!config.require_all_symbols);
        assert_eq!(config.library_name, default_library_name());
    }

    #[test]
    fn test_parse_file_source() {
        let config = parse_config_str(
            r#"
library_name = "sqlite3.dll"
search_paths = ["/opt/sqlite/lib", "support"]
require_all_symbols = true

[source]
kind = "file"
path = "/opt/sqlite/lib/sqlite3.dll"
"#,
        )
        .unwrap();

        assert_eq!(
            config.source,
            LibrarySource::File { path: PathBuf::from("/opt/sqlite/lib/sqlite3.dll") }
        );
        assert_eq!(config.library_name, "sqlite3.dll");
        assert_eq!(config.search_paths.len(), 2);
        assert!(config.require_all_symbols);
    }

    #[test]
    fn test_parse_search_source() {
        let config = parse_config_str("[source]\nkind = \"search\"\n").unwrap();
        assert_eq!(config.source, LibrarySource::Search);
    }

    #[test]
    fn test_unknown_source_kind_is_rejected() {
        let err = parse_config_str("[source]\nkind = \"embedded\"\n").unwrap_err();
        assert!(err.to_string().contains("Invalid binding config"));
    }

    #[test]
    fn test_embedded_source_from_static_image() {
        static IMAGE: &[u8] = b"\x7fELF embedded";
        let config = BindingConfig::embedded(IMAGE);
        match &config.source {
            LibrarySource::Embedded(image) => assert_eq!(&image[..], IMAGE),
            other => panic!("expected embedded source, got {other:?}"),
        }
        assert_eq!(config.clone(), config);
        assert!(toml::to_string(&config).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = parse_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sqlite3.toml");
        let config = BindingConfig {
            search_paths: vec![PathBuf::from("/usr/local/lib")],
            ..BindingConfig::file("/usr/local/lib/libsqlite3.so")
        };
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();
        assert_eq!(parse_config(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_LIBRARY, "/tmp/libsqlite3.so")].into();
        let config = BindingConfig::linked().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.source, LibrarySource::File { path: PathBuf::from("/tmp/libsqlite3.so") });

        let vars: HashMap<&str, &str> = [(ENV_LIBRARY, "/tmp/libsqlite3.so"), (ENV_SOURCE, "search")].into();
        let config = BindingConfig::linked().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.source, LibrarySource::Search);

        let config = BindingConfig::file("a.so").with_overrides(|_| None);
        assert_eq!(config.source, LibrarySource::File { path: PathBuf::from("a.so") });
    }
}
