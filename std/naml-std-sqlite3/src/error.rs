///
/// Binding error types.
///
/// Three layers can fail: loading the library image (`LoadError`, recorded
/// once per binding), resolving one entry point (`BindingError::Unresolved`),
/// and marshaling an argument before the native call
/// (`BindingError::InteriorNul`, `BindingError::TooLarge`). Native status
/// codes are not errors at this level; they are returned to the caller as-is.
///

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("SQLite3 library '{name}' not found (searched: {})", format_paths(searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("Failed to load SQLite3 library {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Failed to extract embedded SQLite3 library to {path}: {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine a cache directory for the embedded SQLite3 library")]
    CacheDir,

    #[error("SQLite3 library is missing required symbols: {}", .0.join(", "))]
    MissingSymbols(Vec<&'static str>),

    #[error("SQLite3 was not linked into this build (enable the `linked` feature)")]
    LinkedUnavailable,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Error)]
pub enum BindingError {
    #[error("SQLite3 binding failed to initialize: {0}")]
    Init(Arc<LoadError>),

    #[error("SQLite3 entry point '{0}' is not available in the loaded library")]
    Unresolved(&'static str),

    #[error("{what} contains an interior NUL byte")]
    InteriorNul { what: &'static str },

    #[error("{what} is {len} bytes, larger than the native length limit")]
    TooLarge { what: &'static str, len: usize },

    #[error("{what} {value} does not fit the native 32-bit parameter")]
    OutOfRange { what: &'static str, value: i64 },

    #[error("{what} handle is null")]
    NullHandle { what: &'static str },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read binding config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid binding config: {0}")]
    Toml(#[from] toml::de::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = LoadError::NotFound {
            name: "sqlite3.dll".to_string(),
            searched: vec![PathBuf::from("sqlite3.dll"), PathBuf::from("/app/support/sqlite3.dll")],
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"SQLite3 library 'sqlite3.dll' not found (searched: sqlite3.dll, /app/support/sqlite3.dll)"
        );

        let err = LoadError::MissingSymbols(vec!["sqlite3_errstr", "sqlite3_close_v2"]);
        insta::assert_snapshot!(
            err.to_string(),
            @"SQLite3 library is missing required symbols: sqlite3_errstr, sqlite3_close_v2"
        );

        let err = BindingError::Unresolved("sqlite3_prepare_v2");
        assert!(err.to_string().contains("sqlite3_prepare_v2"));

        let err = BindingError::InteriorNul { what: "filename" };
        assert!(err.to_string().contains("filename"));
        assert!(err.to_string().contains("NUL"));

        let err = BindingError::TooLarge { what: "blob", len: 3_000_000_000 };
        assert!(err.to_string().contains("3000000000"));

        let err = BindingError::OutOfRange { what: "ordinal", value: 1 << 40 };
        insta::assert_snapshot!(err.to_string(), @"ordinal 1099511627776 does not fit the native 32-bit parameter");

        let err = BindingError::NullHandle { what: "statement" };
        assert_eq!(err.to_string(), "statement handle is null");
    }

    #[test]
    fn test_config_error_is_a_load_error() {
        let toml_err = toml::from_str::<toml::Table>("= broken").unwrap_err();
        let err: LoadError = ConfigError::Toml(toml_err).into();
        assert!(err.to_string().starts_with("Invalid binding config"));
    }

    #[test]
    fn test_init_error_wraps_load_error() {
        let load = Arc::new(LoadError::CacheDir);
        let err = BindingError::Init(load);
        assert!(err.to_string().contains("failed to initialize"));
        assert!(err.to_string().contains("cache directory"));
    }
}
