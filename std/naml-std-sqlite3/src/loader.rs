///
/// # Library Loading
///
/// Locates the SQLite3 library image, loads it and builds the binding table.
///
/// ## Search Order
///
/// For `LibrarySource::Search` the candidates are tried in this order:
/// 1. the bare library name, relative to the working directory
/// 2. the directory of the running executable
/// 3. the `support/` directory next to the executable
/// 4. each configured search path
///
/// If no candidate exists and `system_fallback` is set, the platform loader
/// gets the bare name and applies its own search rules.
///
/// ## Embedded Images
///
/// An embedded image is written once into the cache directory under
/// `{hash}-{library_name}`, where `hash` is the first 16 hex characters of
/// the BLAKE3 hash of the image. Identical images share one file; a file
/// that already exists with the right size is reused.
///

use libloading::Library;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::config::{BindingConfig, LibrarySource};
use crate::error::LoadError;
use crate::symbols::Symbols;

/// Where the binding table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOrigin {
    Linked,
    Path(PathBuf),
    System(String),
    Injected,
}

/// A resolved binding table together with the image that backs it. The
/// image is kept loaded for as long as the table is reachable.
pub struct LoadedLibrary {
    pub symbols: Symbols,
    pub origin: LibraryOrigin,
    _image: Option<Library>,
}

impl LoadedLibrary {
    /// Wrap a table that is not backed by a loaded image.
    pub fn injected(symbols: Symbols) -> Self {
        Self {
            symbols,
            origin: LibraryOrigin::Injected,
            _image: None,
        }
    }
}

pub fn load(config: &BindingConfig) -> Result<LoadedLibrary, LoadError> {
    let result = match &config.source {
        LibrarySource::Linked => load_linked(),
        LibrarySource::File { path } => open_path(path),
        LibrarySource::Search => search(config),
        LibrarySource::Embedded(image) => {
            let path = extract_embedded(image, config)?;
            open_path(&path)
        }
    };

    let loaded = match result {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "failed to load SQLite3 library");
            return Err(e);
        }
    };

    let missing = loaded.symbols.unresolved();
    if !missing.is_empty() {
        if config.require_all_symbols {
            error!(missing = ?missing, "SQLite3 library is missing required symbols");
            return Err(LoadError::MissingSymbols(missing));
        }
        warn!(missing = ?missing, "SQLite3 library does not export every entry point");
    }

    info!(origin = ?loaded.origin, "SQLite3 library loaded");
    Ok(loaded)
}

#[cfg(feature = "linked")]
fn load_linked() -> Result<LoadedLibrary, LoadError> {
    Ok(LoadedLibrary {
        symbols: Symbols::linked(),
        origin: LibraryOrigin::Linked,
        _image: None,
    })
}

#[cfg(not(feature = "linked"))]
fn load_linked() -> Result<LoadedLibrary, LoadError> {
    Err(LoadError::LinkedUnavailable)
}

fn open_path(path: &Path) -> Result<LoadedLibrary, LoadError> {
    let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let symbols = unsafe { Symbols::resolve(&library) };
    Ok(LoadedLibrary {
        symbols,
        origin: LibraryOrigin::Path(path.to_path_buf()),
        _image: Some(library),
    })
}

/// Candidate image locations for `LibrarySource::Search`, in search order.
pub fn candidate_paths(config: &BindingConfig) -> Vec<PathBuf> {
    let name = &config.library_name;
    let mut candidates = vec![PathBuf::from(name)];

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        candidates.push(exe_dir.join(name));
        candidates.push(exe_dir.join("support").join(name));
    }

    for dir in &config.search_paths {
        candidates.push(dir.join(name));
    }

    candidates
}

fn search(config: &BindingConfig) -> Result<LoadedLibrary, LoadError> {
    let candidates = candidate_paths(config);

    for candidate in &candidates {
        debug!(path = %candidate.display(), "probing for SQLite3 library");
        if candidate.is_file() {
            return open_path(candidate);
        }
    }

    if config.system_fallback {
        debug!(name = %config.library_name, "falling back to the system loader");
        match unsafe { Library::new(&config.library_name) } {
            Ok(library) => {
                let symbols = unsafe { Symbols::resolve(&library) };
                return Ok(LoadedLibrary {
                    symbols,
                    origin: LibraryOrigin::System(config.library_name.clone()),
                    _image: Some(library),
                });
            }
            Err(e) => debug!(error = %e, "system loader could not find SQLite3"),
        }
    }

    Err(LoadError::NotFound {
        name: config.library_name.clone(),
        searched: candidates,
    })
}

/// The file an embedded image is extracted to.
pub fn embedded_path(image: &[u8], config: &BindingConfig) -> Result<PathBuf, LoadError> {
    let base = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => dirs::cache_dir().ok_or(LoadError::CacheDir)?.join("naml").join("sqlite3"),
    };

    let hash = blake3::hash(image);
    let hash_hex = hash.to_hex();
    let short_hash = &hash_hex.as_str()[..16];

    Ok(base.join(format!("{}-{}", short_hash, config.library_name)))
}

fn extract_embedded(image: &[u8], config: &BindingConfig) -> Result<PathBuf, LoadError> {
    let path = embedded_path(image, config)?;
    let extract_err = |source| LoadError::Extract { path: path.clone(), source };

    if let Ok(meta) = std::fs::metadata(&path) {
        if meta.is_file() && meta.len() == image.len() as u64 {
            debug!(path = %path.display(), "reusing extracted SQLite3 library");
            return Ok(path);
        }
    }

    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(extract_err)?;

    // Each extraction stages into its own uniquely named file beside the
    // target; a concurrent loader never maps a partially written image.
    let mut staging = NamedTempFile::new_in(dir).map_err(extract_err)?;
    staging.write_all(image).map_err(extract_err)?;
    staging.persist(&path).map_err(|e| extract_err(e.error))?;

    info!(path = %path.display(), bytes = image.len(), "extracted embedded SQLite3 library");
    Ok(path)
}
