///
/// naml SQLite3 Native Binding
///
/// Exposes the SQLite3 C API to naml programs as a thin, explicit binding.
/// The library image is located and loaded at runtime (or taken from the
/// statically linked engine), each entry point is resolved by name, and
/// every call marshals its arguments to the native ABI and returns the raw
/// status code. There is no connection pooling, no row materialization and
/// no error classification here; that is left to naml code built on top.
///
/// Layers:
/// - `config`: where the library comes from (linked, search, file, embedded)
/// - `loader`: finds and loads the image, extracts embedded images
/// - `symbols`: the table of resolved entry points
/// - `binding`: `Binding`, one safe(ish) Rust method per entry point
/// - `runtime`: `naml_db_sqlite3_*` C exports backed by one process binding
///
/// Functions:
/// - Library: libversion, libversion_number, sourceid, threadsafe, errstr
/// - Connection: open_v2, close_v2, busy_timeout, errcode, extended_errcode,
///   errmsg, get_autocommit, interrupt, last_insert_rowid, changes
/// - Statement: prepare_v2, step, reset, clear_bindings, finalize, db_handle
/// - Binding values: bind_parameter_count, bind_parameter_index, bind_null,
///   bind_int, bind_int64, bind_double, bind_text, bind_blob
/// - Columns: column_count, column_name, column_decltype, column_type,
///   column_int64, column_double, column_bytes, column_blob, column_text
///

pub mod binding;
pub mod config;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod loader;
pub mod marshal;
pub mod runtime;
pub mod symbols;

pub use binding::{Binding, Opened, Prepared, Stepped};
pub use config::{parse_config, parse_config_str, BindingConfig, LibrarySource};
pub use error::{BindingError, ConfigError, LoadError};
pub use handle::{ConnHandle, StmtHandle};
pub use loader::{LibraryOrigin, LoadedLibrary};
pub use runtime::*;
pub use symbols::Symbols;
