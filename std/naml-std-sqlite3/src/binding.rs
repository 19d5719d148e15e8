///
/// The marshaling shim.
///
/// `Binding` owns one binding table (or the error that prevented building
/// it) and exposes one method per native entry point. Each method converts
/// its arguments to the native representation, calls through the table and
/// converts the result back. Native status codes are returned untouched;
/// classifying them is the caller's business.
///
/// A `Binding` is created once and shared (`&Binding` or `Arc<Binding>`) by
/// every collaborator that issues native calls. If loading failed, the
/// error is kept and every method returns it without touching the native
/// side.
///
/// # Safety
///
/// Methods that take a `ConnHandle` or `StmtHandle` are `unsafe`: the handle
/// must have come from this binding (`open_v2`, `prepare_v2`, `db_handle`)
/// and must not have been closed or finalized. Concurrent use of one
/// statement handle must be serialized by the caller.
///

use std::sync::Arc;

use crate::config::BindingConfig;
use crate::error::{BindingError, LoadError};
use crate::ffi::{self, sqlite3, sqlite3_stmt};
use crate::handle::{ConnHandle, StmtHandle};
use crate::loader::{self, LibraryOrigin, LoadedLibrary};
use crate::marshal::{self, copy_native, owned_c_str, ptr_or_null};
use crate::symbols::{resolved, Symbols};

/// Result of `open_v2`. The native library may hand back a connection even
/// when `code` is an error; it still has to be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opened {
    pub code: i32,
    pub conn: Option<ConnHandle>,
}

/// Result of `prepare_v2`. `stmt` is `None` when the input held no
/// statement (only whitespace or comments). `tail` is the unconsumed source
/// text after the first statement, as a `String` or, from
/// `prepare_v2_bytes`, as the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared<T = String> {
    pub code: i32,
    pub stmt: Option<StmtHandle>,
    pub tail: T,
}

/// Result of `step`, with the owning connection's insert id and change
/// count read immediately after the step returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepped {
    pub code: i32,
    pub last_insert_rowid: i64,
    pub changes: i64,
}

pub struct Binding {
    state: Result<LoadedLibrary, Arc<LoadError>>,
}

/// Fetch an entry point from the table, failing with the cached load error
/// or the missing symbol's name.
macro_rules! entry {
    ($self:ident . $name:ident) => {
        resolved($self.symbols()?.$name, stringify!($name))?
    };
}

impl Binding {
    /// Load the library described by `config`. Never fails; a load error is
    /// kept and returned by every later call.
    pub fn load(config: &BindingConfig) -> Self {
        Self {
            state: loader::load(config).map_err(Arc::new),
        }
    }

    /// The statically linked engine.
    #[cfg(feature = "linked")]
    pub fn linked() -> Self {
        Self::load(&BindingConfig::linked())
    }

    /// A binding over a caller-built table.
    pub fn from_symbols(symbols: Symbols) -> Self {
        Self {
            state: Ok(LoadedLibrary::injected(symbols)),
        }
    }

    /// A binding whose initialization already failed.
    pub fn failed(error: LoadError) -> Self {
        Self {
            state: Err(Arc::new(error)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_ok()
    }

    pub fn init_error(&self) -> Option<&Arc<LoadError>> {
        self.state.as_ref().err()
    }

    pub fn origin(&self) -> Result<&LibraryOrigin, BindingError> {
        self.loaded().map(|loaded| &loaded.origin)
    }

    /// Entry points the loaded image does not export.
    pub fn unresolved_symbols(&self) -> Result<Vec<&'static str>, BindingError> {
        Ok(self.symbols()?.unresolved())
    }

    fn loaded(&self) -> Result<&LoadedLibrary, BindingError> {
        self.state.as_ref().map_err(|e| BindingError::Init(Arc::clone(e)))
    }

    fn symbols(&self) -> Result<&Symbols, BindingError> {
        self.loaded().map(|loaded| &loaded.symbols)
    }

    // Library introspection

    pub fn libversion(&self) -> Result<String, BindingError> {
        let f = entry!(self.sqlite3_libversion);
        Ok(unsafe { owned_c_str(f()) }.unwrap_or_default())
    }

    pub fn libversion_number(&self) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_libversion_number);
        Ok(unsafe { f() })
    }

    pub fn sourceid(&self) -> Result<String, BindingError> {
        let f = entry!(self.sqlite3_sourceid);
        Ok(unsafe { owned_c_str(f()) }.unwrap_or_default())
    }

    pub fn threadsafe(&self) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_threadsafe);
        Ok(unsafe { f() })
    }

    /// English description of a result code.
    pub fn errstr(&self, code: i32) -> Result<String, BindingError> {
        let f = entry!(self.sqlite3_errstr);
        Ok(unsafe { owned_c_str(f(code)) }.unwrap_or_default())
    }

    // Connections

    /// Open a database. An empty `filename` and an absent or empty `vfs`
    /// are passed as null.
    pub fn open_v2(&self, filename: &str, flags: i32, vfs: Option<&str>) -> Result<Opened, BindingError> {
        let f = entry!(self.sqlite3_open_v2);
        let filename = marshal::optional_c_string("filename", Some(filename))?;
        let vfs = marshal::optional_c_string("vfs name", vfs)?;

        let mut db: *mut sqlite3 = std::ptr::null_mut();
        let code = unsafe { f(ptr_or_null(&filename), &mut db, flags, ptr_or_null(&vfs)) };
        Ok(Opened {
            code,
            conn: ConnHandle::from_ptr(db),
        })
    }

    pub unsafe fn close_v2(&self, db: ConnHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_close_v2);
        Ok(unsafe { f(db.as_ptr()) })
    }

    pub unsafe fn busy_timeout(&self, db: ConnHandle, ms: i32) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_busy_timeout);
        Ok(unsafe { f(db.as_ptr(), ms) })
    }

    pub unsafe fn errcode(&self, db: ConnHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_errcode);
        Ok(unsafe { f(db.as_ptr()) })
    }

    pub unsafe fn extended_errcode(&self, db: ConnHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_extended_errcode);
        Ok(unsafe { f(db.as_ptr()) })
    }

    pub unsafe fn errmsg(&self, db: ConnHandle) -> Result<String, BindingError> {
        let f = entry!(self.sqlite3_errmsg);
        Ok(unsafe { owned_c_str(f(db.as_ptr())) }.unwrap_or_default())
    }

    pub unsafe fn get_autocommit(&self, db: ConnHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_get_autocommit);
        Ok(unsafe { f(db.as_ptr()) })
    }

    /// Flag a running connection to abort at its next checkpoint.
    pub unsafe fn interrupt(&self, db: ConnHandle) -> Result<(), BindingError> {
        let f = entry!(self.sqlite3_interrupt);
        unsafe { f(db.as_ptr()) };
        Ok(())
    }

    pub unsafe fn last_insert_rowid(&self, db: ConnHandle) -> Result<i64, BindingError> {
        let f = entry!(self.sqlite3_last_insert_rowid);
        Ok(unsafe { f(db.as_ptr()) })
    }

    pub unsafe fn changes(&self, db: ConnHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_changes);
        Ok(unsafe { f(db.as_ptr()) })
    }

    // Statements

    /// Compile the first statement in `sql`.
    ///
    /// The text is passed by pointer and byte length. Unlike the bind calls,
    /// empty text is not turned into null here: the native library rejects a
    /// null source with `SQLITE_MISUSE`, while an empty one prepares nothing.
    pub unsafe fn prepare_v2(&self, db: ConnHandle, sql: &str) -> Result<Prepared, BindingError> {
        let prepared = unsafe { self.prepare_v2_bytes(db, sql.as_bytes())? };
        Ok(Prepared {
            code: prepared.code,
            stmt: prepared.stmt,
            tail: lossless_or_lossy(prepared.tail),
        })
    }

    /// `prepare_v2` over the raw source bytes; the bytes reach the native
    /// library unchanged and the tail comes back unchanged.
    pub unsafe fn prepare_v2_bytes(&self, db: ConnHandle, sql: &[u8]) -> Result<Prepared<Vec<u8>>, BindingError> {
        let f = entry!(self.sqlite3_prepare_v2);
        let len = marshal::native_len("sql", sql.len())?;

        let mut stmt: *mut sqlite3_stmt = std::ptr::null_mut();
        let mut tail: *const std::ffi::c_char = std::ptr::null();
        let code = unsafe { f(db.as_ptr(), sql.as_ptr().cast(), len, &mut stmt, &mut tail) };

        Ok(Prepared {
            code,
            stmt: StmtHandle::from_ptr(stmt),
            tail: tail_of(sql, tail),
        })
    }

    pub unsafe fn finalize(&self, stmt: StmtHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_finalize);
        Ok(unsafe { f(stmt.as_ptr()) })
    }

    pub unsafe fn reset(&self, stmt: StmtHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_reset);
        Ok(unsafe { f(stmt.as_ptr()) })
    }

    pub unsafe fn clear_bindings(&self, stmt: StmtHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_clear_bindings);
        Ok(unsafe { f(stmt.as_ptr()) })
    }

    /// Advance the statement, then read the owning connection's last insert
    /// id and change count before anything else can run on it.
    pub unsafe fn step(&self, stmt: StmtHandle) -> Result<Stepped, BindingError> {
        let step = entry!(self.sqlite3_step);
        let db_handle = entry!(self.sqlite3_db_handle);
        let last_insert_rowid = entry!(self.sqlite3_last_insert_rowid);
        let changes = entry!(self.sqlite3_changes);

        unsafe {
            let code = step(stmt.as_ptr());
            let db = db_handle(stmt.as_ptr());
            let (rowid, changed) = if db.is_null() {
                (0, 0)
            } else {
                (last_insert_rowid(db), changes(db) as i64)
            };
            Ok(Stepped {
                code,
                last_insert_rowid: rowid,
                changes: changed,
            })
        }
    }

    pub unsafe fn db_handle(&self, stmt: StmtHandle) -> Result<Option<ConnHandle>, BindingError> {
        let f = entry!(self.sqlite3_db_handle);
        Ok(ConnHandle::from_ptr(unsafe { f(stmt.as_ptr()) }))
    }

    // Parameters

    pub unsafe fn bind_parameter_count(&self, stmt: StmtHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_parameter_count);
        Ok(unsafe { f(stmt.as_ptr()) })
    }

    /// Ordinal of a named parameter (`:name`, `@name`, `$name`), or 0.
    pub unsafe fn bind_parameter_index(&self, stmt: StmtHandle, name: &str) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_parameter_index);
        let name = marshal::c_string("parameter name", name)?;
        Ok(unsafe { f(stmt.as_ptr(), name.as_ptr()) })
    }

    pub unsafe fn bind_null(&self, stmt: StmtHandle, ord: i32) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_null);
        Ok(unsafe { f(stmt.as_ptr(), ord) })
    }

    pub unsafe fn bind_int(&self, stmt: StmtHandle, ord: i32, value: i32) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_int);
        Ok(unsafe { f(stmt.as_ptr(), ord, value) })
    }

    pub unsafe fn bind_int64(&self, stmt: StmtHandle, ord: i32, value: i64) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_int64);
        Ok(unsafe { f(stmt.as_ptr(), ord, value) })
    }

    pub unsafe fn bind_double(&self, stmt: StmtHandle, ord: i32, value: f64) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_double);
        Ok(unsafe { f(stmt.as_ptr(), ord, value) })
    }

    pub unsafe fn bind_text(&self, stmt: StmtHandle, ord: i32, value: &str) -> Result<i32, BindingError> {
        unsafe { self.bind_text_bytes(stmt, ord, value.as_bytes()) }
    }

    /// Bind text by pointer and byte length, copied by the native library.
    /// The bytes are passed as they are; empty text is passed as a null
    /// pointer.
    pub unsafe fn bind_text_bytes(&self, stmt: StmtHandle, ord: i32, value: &[u8]) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_text);
        let buf = marshal::length_prefixed("text", value)?;
        Ok(unsafe { f(stmt.as_ptr(), ord, buf.ptr.cast(), buf.len, ffi::sqlite_transient()) })
    }

    /// Bind a blob by pointer and byte length, copied by the native library.
    /// An empty blob is passed as a null pointer.
    pub unsafe fn bind_blob(&self, stmt: StmtHandle, ord: i32, value: &[u8]) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_bind_blob);
        let buf = marshal::length_prefixed("blob", value)?;
        Ok(unsafe { f(stmt.as_ptr(), ord, buf.ptr.cast(), buf.len, ffi::sqlite_transient()) })
    }

    // Columns

    pub unsafe fn column_count(&self, stmt: StmtHandle) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_column_count);
        Ok(unsafe { f(stmt.as_ptr()) })
    }

    pub unsafe fn column_name(&self, stmt: StmtHandle, index: i32) -> Result<Option<String>, BindingError> {
        let f = entry!(self.sqlite3_column_name);
        Ok(unsafe { owned_c_str(f(stmt.as_ptr(), index)) })
    }

    /// Declared type of a result column; `None` for expressions.
    pub unsafe fn column_decltype(&self, stmt: StmtHandle, index: i32) -> Result<Option<String>, BindingError> {
        let f = entry!(self.sqlite3_column_decltype);
        Ok(unsafe { owned_c_str(f(stmt.as_ptr(), index)) })
    }

    pub unsafe fn column_type(&self, stmt: StmtHandle, index: i32) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_column_type);
        Ok(unsafe { f(stmt.as_ptr(), index) })
    }

    pub unsafe fn column_int64(&self, stmt: StmtHandle, index: i32) -> Result<i64, BindingError> {
        let f = entry!(self.sqlite3_column_int64);
        Ok(unsafe { f(stmt.as_ptr(), index) })
    }

    pub unsafe fn column_double(&self, stmt: StmtHandle, index: i32) -> Result<f64, BindingError> {
        let f = entry!(self.sqlite3_column_double);
        Ok(unsafe { f(stmt.as_ptr(), index) })
    }

    pub unsafe fn column_bytes(&self, stmt: StmtHandle, index: i32) -> Result<i32, BindingError> {
        let f = entry!(self.sqlite3_column_bytes);
        Ok(unsafe { f(stmt.as_ptr(), index) })
    }

    /// Copy a blob column. The pointer is fetched first and its length
    /// queried afterwards, since fetching can convert the value in place.
    pub unsafe fn column_blob(&self, stmt: StmtHandle, index: i32) -> Result<Vec<u8>, BindingError> {
        let blob = entry!(self.sqlite3_column_blob);
        let bytes = entry!(self.sqlite3_column_bytes);
        unsafe {
            let ptr = blob(stmt.as_ptr(), index);
            let len = bytes(stmt.as_ptr(), index);
            Ok(copy_native(ptr.cast(), len))
        }
    }

    /// Copy a text column's raw UTF-8 bytes, same order as `column_blob`.
    pub unsafe fn column_text_bytes(&self, stmt: StmtHandle, index: i32) -> Result<Vec<u8>, BindingError> {
        let text = entry!(self.sqlite3_column_text);
        let bytes = entry!(self.sqlite3_column_bytes);
        unsafe {
            let ptr = text(stmt.as_ptr(), index);
            let len = bytes(stmt.as_ptr(), index);
            Ok(copy_native(ptr, len))
        }
    }

    pub unsafe fn column_text(&self, stmt: StmtHandle, index: i32) -> Result<String, BindingError> {
        let bytes = unsafe { self.column_text_bytes(stmt, index)? };
        Ok(lossless_or_lossy(bytes))
    }
}

fn lossless_or_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// The suffix of `sql` starting at `tail`, a pointer the native library
/// placed inside `sql`'s buffer.
fn tail_of(sql: &[u8], tail: *const std::ffi::c_char) -> Vec<u8> {
    if tail.is_null() {
        return Vec::new();
    }
    let offset = (tail as usize).saturating_sub(sql.as_ptr() as usize).min(sql.len());
    sql[offset..].to_vec()
}
