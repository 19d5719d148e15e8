//!
//! Dynamic Loading Integration Tests
//!
//! Loads a SQLite3 shared library installed on the host through the `file`,
//! `search` and embedded sources, then drives it through the resolved entry
//! points. Tests return early when no system library is found.
//!
//! Run all:  `cargo test -p naml-std-sqlite3 --test dynamic_load`
//!

use std::path::{Path, PathBuf};
use std::sync::Arc;

use naml_std_sqlite3::ffi::*;
use naml_std_sqlite3::{Binding, BindingConfig, LibraryOrigin, LibrarySource};

const SYSTEM_LIBRARIES: &[&str] = &[
    "/lib/x86_64-linux-gnu/libsqlite3.so.0",
    "/usr/lib/x86_64-linux-gnu/libsqlite3.so.0",
    "/lib/aarch64-linux-gnu/libsqlite3.so.0",
    "/usr/lib/aarch64-linux-gnu/libsqlite3.so.0",
    "/usr/lib64/libsqlite3.so.0",
    "/usr/lib/libsqlite3.so.0",
    "/usr/lib/libsqlite3.dylib",
    "/opt/homebrew/opt/sqlite/lib/libsqlite3.dylib",
];

fn system_library() -> Option<PathBuf> {
    let found = SYSTEM_LIBRARIES.iter().map(PathBuf::from).find(|p| p.is_file());
    if found.is_none() {
        eprintln!("no system SQLite3 library found, skipping");
    }
    found
}

fn strict(source: LibrarySource) -> BindingConfig {
    BindingConfig {
        source,
        system_fallback: false,
        require_all_symbols: true,
        ..BindingConfig::default()
    }
}

/// open, prepare with a tail, step, read text, finalize, close.
fn exercise(binding: &Binding) {
    assert!(binding.is_loaded(), "load failed: {:?}", binding.init_error());
    assert!(binding.unresolved_symbols().unwrap().is_empty());
    assert!(binding.libversion().unwrap().starts_with("3."));

    let opened = binding
        .open_v2(":memory:", SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE, None)
        .unwrap();
    assert_eq!(opened.code, SQLITE_OK);
    let db = opened.conn.unwrap();

    unsafe {
        let prepared = binding.prepare_v2(db, "SELECT 'x'; SELECT 3").unwrap();
        assert_eq!(prepared.code, SQLITE_OK);
        assert_eq!(prepared.tail, " SELECT 3");
        let stmt = prepared.stmt.unwrap();

        assert_eq!(binding.step(stmt).unwrap().code, SQLITE_ROW);
        assert_eq!(binding.column_text(stmt, 0).unwrap(), "x");
        assert_eq!(binding.step(stmt).unwrap().code, SQLITE_DONE);
        assert_eq!(binding.finalize(stmt).unwrap(), SQLITE_OK);

        let stmt = binding.prepare_v2(db, "SELECT hex(?1)").unwrap().stmt.unwrap();
        assert_eq!(binding.bind_text_bytes(stmt, 1, &[0xff, b'a']).unwrap(), SQLITE_OK);
        assert_eq!(binding.step(stmt).unwrap().code, SQLITE_ROW);
        assert_eq!(binding.column_text(stmt, 0).unwrap(), "FF61");
        assert_eq!(binding.finalize(stmt).unwrap(), SQLITE_OK);

        assert_eq!(binding.close_v2(db).unwrap(), SQLITE_OK);
    }
}

#[test]
fn load_from_file() {
    let Some(library) = system_library() else { return };
    let binding = Binding::load(&strict(LibrarySource::File { path: library.clone() }));
    assert_eq!(binding.origin().unwrap(), &LibraryOrigin::Path(library));
    exercise(&binding);
}

#[test]
fn load_by_search_path() {
    let Some(library) = system_library() else { return };
    let dir = library.parent().unwrap().to_path_buf();
    let name = library.file_name().unwrap().to_string_lossy().into_owned();

    let config = BindingConfig {
        library_name: name,
        search_paths: vec![dir],
        ..strict(LibrarySource::Search)
    };
    let binding = Binding::load(&config);
    assert_eq!(binding.origin().unwrap(), &LibraryOrigin::Path(library));
    exercise(&binding);
}

#[test]
fn load_embedded_image() {
    let Some(library) = system_library() else { return };
    let image: Arc<[u8]> = std::fs::read(&library).unwrap().into();
    let cache = tempfile::tempdir().unwrap();

    let config = BindingConfig {
        cache_dir: Some(cache.path().to_path_buf()),
        ..strict(LibrarySource::Embedded(image.clone()))
    };
    let binding = Binding::load(&config);
    match binding.origin().unwrap() {
        LibraryOrigin::Path(extracted) => {
            assert!(extracted.starts_with(cache.path()));
            assert_eq!(std::fs::read(extracted).unwrap(), &image[..]);
        }
        other => panic!("expected an extracted image, got {other:?}"),
    }
    exercise(&binding);

    let again = Binding::load(&config);
    assert_eq!(again.origin().unwrap(), binding.origin().unwrap());
    assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 1);
}

#[test]
fn missing_file_is_a_load_error() {
    let binding = Binding::load(&strict(LibrarySource::File {
        path: Path::new("/nonexistent/libsqlite3.so").to_path_buf(),
    }));
    assert!(!binding.is_loaded());
    assert!(binding.libversion().is_err());
}
