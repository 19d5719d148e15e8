///
/// SQLite3 runtime exports for naml.
///
/// The naml runtime calls these through the C ABI. Connection and statement
/// handles travel as `i64`, text as `*const NamlString`, blobs as
/// `*const NamlBytes`; results that have more than one part come back
/// through out-pointers.
///
/// The process has a single `Binding`. It is created by
/// `naml_db_sqlite3_init` or, failing that, from the environment on first
/// use, and never replaced.
///
/// Error handling follows naml's exception pattern, but only for failures of
/// the binding itself:
/// - native status codes are returned as-is and never thrown
/// - an initialization failure, a missing entry point or an unusable
///   argument sets a typed DBError and returns a negative sentinel
///   (`BINDING_INIT_FAILED`, `BINDING_UNRESOLVED`, `BINDING_INVALID_ARGUMENT`)
///   or an empty value for string/bytes results
///

use std::borrow::Cow;
use std::sync::OnceLock;

use naml_std_core::{
    db_error_new, naml_bytes_from_slice, naml_string_from_str, naml_string_new, throw_db_error,
    NamlBytes, NamlString,
};
use tracing::{error, warn};

use crate::binding::Binding;
use crate::config::{parse_config, BindingConfig};
use crate::error::{BindingError, LoadError};
use crate::handle::{ConnHandle, StmtHandle};
use crate::marshal::narrow;

pub const BINDING_INIT_FAILED: i64 = -1;
pub const BINDING_UNRESOLVED: i64 = -2;
pub const BINDING_INVALID_ARGUMENT: i64 = -3;

static RUNTIME_BINDING: OnceLock<Binding> = OnceLock::new();

fn binding_from_env() -> Binding {
    match BindingConfig::from_env() {
        Ok(config) => Binding::load(&config),
        Err(e) => {
            error!(error = %e, "invalid SQLite3 binding configuration");
            Binding::failed(LoadError::Config(e))
        }
    }
}

fn runtime_binding() -> &'static Binding {
    RUNTIME_BINDING.get_or_init(binding_from_env)
}

fn sentinel(err: &BindingError) -> i64 {
    match err {
        BindingError::Init(_) => BINDING_INIT_FAILED,
        BindingError::Unresolved(_) => BINDING_UNRESOLVED,
        BindingError::InteriorNul { .. }
        | BindingError::TooLarge { .. }
        | BindingError::OutOfRange { .. }
        | BindingError::NullHandle { .. } => BINDING_INVALID_ARGUMENT,
    }
}

fn throw_binding_error(err: &BindingError) -> i64 {
    let code = sentinel(err);
    throw_db_error(&err.to_string(), code);
    code
}

fn code_or_throw(result: Result<i32, BindingError>) -> i64 {
    match result {
        Ok(code) => code as i64,
        Err(e) => throw_binding_error(&e),
    }
}

fn value_or_throw<T: Default>(result: Result<T, BindingError>) -> T {
    result.unwrap_or_else(|e| {
        throw_binding_error(&e);
        T::default()
    })
}

fn string_or_throw(result: Result<String, BindingError>) -> *mut NamlString {
    naml_string_from_str(&value_or_throw(result))
}

unsafe fn text_arg<'a>(s: *const NamlString) -> Cow<'a, str> {
    match unsafe { NamlString::borrow(s) } {
        Some(s) => String::from_utf8_lossy(s.as_bytes()),
        None => Cow::Borrowed(""),
    }
}

/// The bytes of a managed string, unchanged.
unsafe fn text_bytes_arg<'a>(s: *const NamlString) -> &'a [u8] {
    match unsafe { NamlString::borrow(s) } {
        Some(s) => s.as_bytes(),
        None => &[],
    }
}

unsafe fn blob_arg<'a>(b: *const NamlBytes) -> &'a [u8] {
    match unsafe { NamlBytes::borrow(b) } {
        Some(b) => b.as_slice(),
        None => &[],
    }
}

fn conn(raw: i64) -> Result<ConnHandle, BindingError> {
    ConnHandle::from_raw(raw).ok_or(BindingError::NullHandle { what: "connection" })
}

fn stmt(raw: i64) -> Result<StmtHandle, BindingError> {
    StmtHandle::from_raw(raw).ok_or(BindingError::NullHandle { what: "statement" })
}

unsafe fn write_out<T>(out: *mut T, value: T) {
    if !out.is_null() {
        unsafe { *out = value };
    }
}

/// Initialize the process binding from a TOML config file, or from the
/// environment when `config_path` is null or empty. Returns 0 when the
/// binding is usable. Later calls report on the binding already in place
/// and log a warning if they name a config file that is not applied.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_init(config_path: *const NamlString) -> i64 {
    let path = unsafe { text_arg(config_path) }.into_owned();
    let mut initialized_here = false;
    let binding = RUNTIME_BINDING.get_or_init(|| {
        initialized_here = true;
        if path.is_empty() {
            return binding_from_env();
        }
        match parse_config(std::path::Path::new(&path)) {
            Ok(config) => Binding::load(&config),
            Err(e) => Binding::failed(LoadError::Config(e)),
        }
    });
    if !initialized_here && !path.is_empty() {
        warn!(config = %path, "SQLite3 binding already initialized; ignoring config file");
    }
    match binding.init_error() {
        None => 0,
        Some(e) => throw_binding_error(&BindingError::Init(e.clone())),
    }
}

/// 0 if the process binding loaded, `BINDING_INIT_FAILED` otherwise. Never throws.
#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_init_status() -> i64 {
    if runtime_binding().is_loaded() { 0 } else { BINDING_INIT_FAILED }
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_error_new(message: *mut NamlString, code: i64) -> *mut u8 {
    db_error_new(message, code) as *mut u8
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_libversion() -> *mut NamlString {
    string_or_throw(runtime_binding().libversion())
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_libversion_number() -> i64 {
    code_or_throw(runtime_binding().libversion_number())
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_sourceid() -> *mut NamlString {
    string_or_throw(runtime_binding().sourceid())
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_threadsafe() -> i64 {
    code_or_throw(runtime_binding().threadsafe())
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_db_sqlite3_errstr(code: i64) -> *mut NamlString {
    string_or_throw(narrow("result code", code).and_then(|code| runtime_binding().errstr(code)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_errcode(db: i64) -> i64 {
    code_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().errcode(db) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_extended_errcode(db: i64) -> i64 {
    code_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().extended_errcode(db) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_errmsg(db: i64) -> *mut NamlString {
    string_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().errmsg(db) }))
}

/// Open a database; the connection handle (possibly non-zero even on error)
/// is written to `out_db`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_open_v2(
    filename: *const NamlString,
    out_db: *mut i64,
    flags: i64,
    vfs: *const NamlString,
) -> i64 {
    let filename = unsafe { text_arg(filename) };
    let vfs = unsafe { text_arg(vfs) };
    let result = narrow("open flags", flags)
        .and_then(|flags| runtime_binding().open_v2(&filename, flags, Some(&*vfs)));
    match result {
        Ok(opened) => {
            unsafe { write_out(out_db, opened.conn.map_or(0, ConnHandle::to_raw)) };
            opened.code as i64
        }
        Err(e) => {
            unsafe { write_out(out_db, 0) };
            throw_binding_error(&e)
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_busy_timeout(db: i64, ms: i64) -> i64 {
    code_or_throw(conn(db).and_then(|db| {
        let ms = narrow("busy timeout", ms)?;
        unsafe { runtime_binding().busy_timeout(db, ms) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_close_v2(db: i64) -> i64 {
    code_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().close_v2(db) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_get_autocommit(db: i64) -> i64 {
    code_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().get_autocommit(db) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_interrupt(db: i64) {
    value_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().interrupt(db) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_last_insert_rowid(db: i64) -> i64 {
    value_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().last_insert_rowid(db) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_changes(db: i64) -> i64 {
    code_or_throw(conn(db).and_then(|db| unsafe { runtime_binding().changes(db) }))
}

/// Compile the first statement of `sql`. The statement handle goes to
/// `out_stmt` (0 when the text held no statement) and the unconsumed text to
/// `out_tail` as a new string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_prepare_v2(
    db: i64,
    sql: *const NamlString,
    out_stmt: *mut i64,
    out_tail: *mut *mut NamlString,
) -> i64 {
    let sql = unsafe { text_bytes_arg(sql) };
    let result = conn(db).and_then(|db| unsafe { runtime_binding().prepare_v2_bytes(db, sql) });
    match result {
        Ok(prepared) => unsafe {
            write_out(out_stmt, prepared.stmt.map_or(0, StmtHandle::to_raw));
            if !out_tail.is_null() {
                *out_tail = naml_string_new(prepared.tail.as_ptr(), prepared.tail.len());
            }
            prepared.code as i64
        },
        Err(e) => {
            unsafe { write_out(out_stmt, 0) };
            throw_binding_error(&e)
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_finalize(stmt_handle: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().finalize(s) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_reset(stmt_handle: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().reset(s) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_clear_bindings(stmt_handle: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().clear_bindings(s) }))
}

/// Advance a statement. The owning connection's last insert id and change
/// count are written to `out_rowid` and `out_changes`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_step(
    stmt_handle: i64,
    out_rowid: *mut i64,
    out_changes: *mut i64,
) -> i64 {
    match stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().step(s) }) {
        Ok(stepped) => unsafe {
            write_out(out_rowid, stepped.last_insert_rowid);
            write_out(out_changes, stepped.changes);
            stepped.code as i64
        },
        Err(e) => throw_binding_error(&e),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_db_handle(stmt_handle: i64) -> i64 {
    let result = stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().db_handle(s) });
    value_or_throw(result).map_or(0, ConnHandle::to_raw)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_parameter_count(stmt_handle: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().bind_parameter_count(s) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_parameter_index(
    stmt_handle: i64,
    name: *const NamlString,
) -> i64 {
    let name = unsafe { text_arg(name) };
    code_or_throw(stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().bind_parameter_index(s, &name) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_null(stmt_handle: i64, ord: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let ord = narrow("ordinal", ord)?;
        unsafe { runtime_binding().bind_null(s, ord) }
    }))
}

/// Bind a 32-bit integer. The value parameter is `i32` so the native width
/// is fixed by the signature.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_int(stmt_handle: i64, ord: i64, value: i32) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let ord = narrow("ordinal", ord)?;
        unsafe { runtime_binding().bind_int(s, ord, value) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_int64(stmt_handle: i64, ord: i64, value: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let ord = narrow("ordinal", ord)?;
        unsafe { runtime_binding().bind_int64(s, ord, value) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_double(stmt_handle: i64, ord: i64, value: f64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let ord = narrow("ordinal", ord)?;
        unsafe { runtime_binding().bind_double(s, ord, value) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_text(
    stmt_handle: i64,
    ord: i64,
    value: *const NamlString,
) -> i64 {
    let value = unsafe { text_bytes_arg(value) };
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let ord = narrow("ordinal", ord)?;
        unsafe { runtime_binding().bind_text_bytes(s, ord, value) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_bind_blob(
    stmt_handle: i64,
    ord: i64,
    value: *const NamlBytes,
) -> i64 {
    let value = unsafe { blob_arg(value) };
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let ord = narrow("ordinal", ord)?;
        unsafe { runtime_binding().bind_blob(s, ord, value) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_count(stmt_handle: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| unsafe { runtime_binding().column_count(s) }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_name(stmt_handle: i64, index: i64) -> *mut NamlString {
    string_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        Ok(unsafe { runtime_binding().column_name(s, index)? }.unwrap_or_default())
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_decltype(stmt_handle: i64, index: i64) -> *mut NamlString {
    string_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        Ok(unsafe { runtime_binding().column_decltype(s, index)? }.unwrap_or_default())
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_type(stmt_handle: i64, index: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        unsafe { runtime_binding().column_type(s, index) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_int64(stmt_handle: i64, index: i64) -> i64 {
    value_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        unsafe { runtime_binding().column_int64(s, index) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_double(stmt_handle: i64, index: i64) -> f64 {
    value_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        unsafe { runtime_binding().column_double(s, index) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_bytes(stmt_handle: i64, index: i64) -> i64 {
    code_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        unsafe { runtime_binding().column_bytes(s, index) }
    }))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_blob(stmt_handle: i64, index: i64) -> *mut NamlBytes {
    let blob = value_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        unsafe { runtime_binding().column_blob(s, index) }
    }));
    naml_bytes_from_slice(&blob)
}

/// Column text as a new string, copied byte for byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_db_sqlite3_column_text(stmt_handle: i64, index: i64) -> *mut NamlString {
    let text = value_or_throw(stmt(stmt_handle).and_then(|s| {
        let index = narrow("column index", index)?;
        unsafe { runtime_binding().column_text_bytes(s, index) }
    }));
    unsafe { naml_string_new(text.as_ptr(), text.len()) }
}
