//!
//! Native SQLite3 ABI definitions.
//!
//! Opaque handle types, result codes, open flags and the function pointer
//! type of every entry point the binding resolves. Each pointer type is
//! written against the C prototype in `sqlite3.h`, so integer and floating
//! point widths are fixed by the type signature rather than checked at run
//! time.
//!
//! With the `linked` feature the opaque handle types are the ones of the
//! bundled engine, so its function items coerce directly into these pointer
//! types.
//!

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uchar, c_void};

#[cfg(feature = "linked")]
pub use rusqlite::ffi::{sqlite3, sqlite3_stmt};

/// Opaque connection object owned by the native library.
#[cfg(not(feature = "linked"))]
#[repr(C)]
pub struct sqlite3 {
    _unused: [u8; 0],
}

/// Opaque prepared statement object owned by the native library.
#[cfg(not(feature = "linked"))]
#[repr(C)]
pub struct sqlite3_stmt {
    _unused: [u8; 0],
}

pub type sqlite3_destructor_type = Option<unsafe extern "C" fn(*mut c_void)>;

/// Destructor sentinel asking the native library to copy the buffer before
/// the bind call returns.
pub fn sqlite_transient() -> sqlite3_destructor_type {
    Some(unsafe { std::mem::transmute::<isize, unsafe extern "C" fn(*mut c_void)>(-1_isize) })
}

// Primary result codes
pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_INTERNAL: c_int = 2;
pub const SQLITE_PERM: c_int = 3;
pub const SQLITE_ABORT: c_int = 4;
pub const SQLITE_BUSY: c_int = 5;
pub const SQLITE_LOCKED: c_int = 6;
pub const SQLITE_NOMEM: c_int = 7;
pub const SQLITE_READONLY: c_int = 8;
pub const SQLITE_INTERRUPT: c_int = 9;
pub const SQLITE_IOERR: c_int = 10;
pub const SQLITE_CORRUPT: c_int = 11;
pub const SQLITE_NOTFOUND: c_int = 12;
pub const SQLITE_FULL: c_int = 13;
pub const SQLITE_CANTOPEN: c_int = 14;
pub const SQLITE_PROTOCOL: c_int = 15;
pub const SQLITE_EMPTY: c_int = 16;
pub const SQLITE_SCHEMA: c_int = 17;
pub const SQLITE_TOOBIG: c_int = 18;
pub const SQLITE_CONSTRAINT: c_int = 19;
pub const SQLITE_MISMATCH: c_int = 20;
pub const SQLITE_MISUSE: c_int = 21;
pub const SQLITE_NOLFS: c_int = 22;
pub const SQLITE_AUTH: c_int = 23;
pub const SQLITE_FORMAT: c_int = 24;
pub const SQLITE_RANGE: c_int = 25;
pub const SQLITE_NOTADB: c_int = 26;
pub const SQLITE_NOTICE: c_int = 27;
pub const SQLITE_WARNING: c_int = 28;
pub const SQLITE_ROW: c_int = 100;
pub const SQLITE_DONE: c_int = 101;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
pub const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
pub const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
pub const SQLITE_OPEN_URI: c_int = 0x0000_0040;
pub const SQLITE_OPEN_MEMORY: c_int = 0x0000_0080;
pub const SQLITE_OPEN_NOMUTEX: c_int = 0x0000_8000;
pub const SQLITE_OPEN_FULLMUTEX: c_int = 0x0001_0000;
pub const SQLITE_OPEN_SHAREDCACHE: c_int = 0x0002_0000;
pub const SQLITE_OPEN_PRIVATECACHE: c_int = 0x0004_0000;

// Fundamental column datatypes
pub const SQLITE_INTEGER: c_int = 1;
pub const SQLITE_FLOAT: c_int = 2;
pub const SQLITE_TEXT: c_int = 3;
pub const SQLITE_BLOB: c_int = 4;
pub const SQLITE_NULL: c_int = 5;

pub type LibversionFn = unsafe extern "C" fn() -> *const c_char;
pub type LibversionNumberFn = unsafe extern "C" fn() -> c_int;
pub type SourceidFn = unsafe extern "C" fn() -> *const c_char;
pub type ErrstrFn = unsafe extern "C" fn(c_int) -> *const c_char;
pub type ErrcodeFn = unsafe extern "C" fn(*mut sqlite3) -> c_int;
pub type ErrmsgFn = unsafe extern "C" fn(*mut sqlite3) -> *const c_char;
pub type ThreadsafeFn = unsafe extern "C" fn() -> c_int;
pub type OpenV2Fn =
    unsafe extern "C" fn(*const c_char, *mut *mut sqlite3, c_int, *const c_char) -> c_int;
pub type BusyTimeoutFn = unsafe extern "C" fn(*mut sqlite3, c_int) -> c_int;
pub type ConnIntFn = unsafe extern "C" fn(*mut sqlite3) -> c_int;
pub type PrepareV2Fn = unsafe extern "C" fn(
    *mut sqlite3,
    *const c_char,
    c_int,
    *mut *mut sqlite3_stmt,
    *mut *const c_char,
) -> c_int;
pub type StmtIntFn = unsafe extern "C" fn(*mut sqlite3_stmt) -> c_int;
pub type BindParameterIndexFn = unsafe extern "C" fn(*mut sqlite3_stmt, *const c_char) -> c_int;
pub type BindNullFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> c_int;
pub type BindInt64Fn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int, i64) -> c_int;
pub type BindIntFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int, c_int) -> c_int;
pub type BindTextFn = unsafe extern "C" fn(
    *mut sqlite3_stmt,
    c_int,
    *const c_char,
    c_int,
    sqlite3_destructor_type,
) -> c_int;
pub type BindDoubleFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int, f64) -> c_int;
pub type BindBlobFn = unsafe extern "C" fn(
    *mut sqlite3_stmt,
    c_int,
    *const c_void,
    c_int,
    sqlite3_destructor_type,
) -> c_int;
pub type ColumnNameFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> *const c_char;
pub type InterruptFn = unsafe extern "C" fn(*mut sqlite3);
pub type ColumnIntFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> c_int;
pub type ColumnInt64Fn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> i64;
pub type ColumnDoubleFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> f64;
pub type ColumnBlobFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> *const c_void;
pub type ColumnTextFn = unsafe extern "C" fn(*mut sqlite3_stmt, c_int) -> *const c_uchar;
pub type DbHandleFn = unsafe extern "C" fn(*mut sqlite3_stmt) -> *mut sqlite3;
pub type LastInsertRowidFn = unsafe extern "C" fn(*mut sqlite3) -> i64;
