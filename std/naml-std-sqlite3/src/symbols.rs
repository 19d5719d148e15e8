///
/// The binding table.
///
/// One slot per native entry point. A slot is filled once, when the table is
/// built from a loaded library image (or from the statically linked engine),
/// and never written again, so the table is shared read-only between threads
/// without synchronization.
///
/// An empty slot is a symbol the image does not export. Calls through it fail
/// with `BindingError::Unresolved` instead of jumping to a null address.
///

use libloading::Library;

use crate::error::BindingError;
use crate::ffi::*;

macro_rules! symbol_table {
    ($($name:ident: $ty:ty),* $(,)?) => {
        #[derive(Clone, Copy, Default)]
        pub struct Symbols {
            $(pub $name: Option<$ty>,)*
        }

        impl Symbols {
            /// Every entry point the binding resolves, by native symbol name.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($name)),*];

            /// Resolve each entry point from `library`. Missing symbols leave
            /// their slot empty.
            ///
            /// # Safety
            /// The image must be a SQLite3 build whose exported symbols match
            /// the prototypes in `ffi`.
            pub unsafe fn resolve(library: &Library) -> Self {
                Self {
                    $($name: unsafe {
                        library
                            .get::<$ty>(concat!(stringify!($name), "\0").as_bytes())
                            .ok()
                            .map(|symbol| *symbol)
                    },)*
                }
            }

            /// Entry points of the SQLite3 engine linked into this process.
            #[cfg(feature = "linked")]
            pub fn linked() -> Self {
                Self {
                    $($name: Some(rusqlite::ffi::$name),)*
                }
            }

            /// Names of the entry points whose slot is empty.
            pub fn unresolved(&self) -> Vec<&'static str> {
                let mut missing = Vec::new();
                $(if self.$name.is_none() {
                    missing.push(stringify!($name));
                })*
                missing
            }
        }
    };
}

symbol_table! {
    sqlite3_libversion: LibversionFn,
    sqlite3_libversion_number: LibversionNumberFn,
    sqlite3_sourceid: SourceidFn,
    sqlite3_errstr: ErrstrFn,
    sqlite3_errcode: ErrcodeFn,
    sqlite3_extended_errcode: ErrcodeFn,
    sqlite3_errmsg: ErrmsgFn,
    sqlite3_threadsafe: ThreadsafeFn,
    sqlite3_open_v2: OpenV2Fn,
    sqlite3_busy_timeout: BusyTimeoutFn,
    sqlite3_close_v2: ConnIntFn,
    sqlite3_prepare_v2: PrepareV2Fn,
    sqlite3_get_autocommit: ConnIntFn,
    sqlite3_finalize: StmtIntFn,
    sqlite3_bind_parameter_count: StmtIntFn,
    sqlite3_bind_parameter_index: BindParameterIndexFn,
    sqlite3_reset: StmtIntFn,
    sqlite3_bind_null: BindNullFn,
    sqlite3_bind_int64: BindInt64Fn,
    sqlite3_bind_int: BindIntFn,
    sqlite3_bind_text: BindTextFn,
    sqlite3_bind_double: BindDoubleFn,
    sqlite3_bind_blob: BindBlobFn,
    sqlite3_column_count: StmtIntFn,
    sqlite3_column_name: ColumnNameFn,
    sqlite3_interrupt: InterruptFn,
    sqlite3_clear_bindings: StmtIntFn,
    sqlite3_step: StmtIntFn,
    sqlite3_column_decltype: ColumnNameFn,
    sqlite3_column_type: ColumnIntFn,
    sqlite3_column_int64: ColumnInt64Fn,
    sqlite3_column_double: ColumnDoubleFn,
    sqlite3_column_bytes: ColumnIntFn,
    sqlite3_column_blob: ColumnBlobFn,
    sqlite3_column_text: ColumnTextFn,
    sqlite3_db_handle: DbHandleFn,
    sqlite3_last_insert_rowid: LastInsertRowidFn,
    sqlite3_changes: ConnIntFn,
}

/// Take the function out of a slot, or name the symbol that is missing.
pub(crate) fn resolved<F: Copy>(slot: Option<F>, name: &'static str) -> Result<F, BindingError> {
    slot.ok_or(BindingError::Unresolved(name))
}
