//!
//! Exception Slot
//!
//! Native code signals a failure to naml by parking an exception object in a
//! per-thread slot and returning normally; generated code checks the slot
//! after the call and unwinds into the matching `catch`.
//!
//! Exception Type IDs:
//! - 0: Unknown/User-defined exception
//! - 1: IOError
//! - 7: DBError
//!
//! A DBError object is a `DbErrorRecord`, 24 bytes: the message string at
//! offset 0, the captured stack at 8 (null when no stack was captured) and
//! the `i64` code at 16.
//!

use std::alloc::{alloc, Layout};
use std::cell::Cell;

use crate::value::{naml_string_from_str, NamlString};

pub const EXCEPTION_TYPE_UNKNOWN: i64 = 0;
pub const EXCEPTION_TYPE_IO_ERROR: i64 = 1;
pub const EXCEPTION_TYPE_DB_ERROR: i64 = 7;

#[derive(Clone, Copy)]
struct Pending {
    object: *mut u8,
    type_id: i64,
}

const NONE: Pending = Pending {
    object: std::ptr::null_mut(),
    type_id: EXCEPTION_TYPE_UNKNOWN,
};

thread_local! {
    static PENDING: Cell<Pending> = const { Cell::new(NONE) };
}

#[repr(C)]
pub struct DbErrorRecord {
    pub message: *mut NamlString,
    pub stack: *mut u8,
    pub code: i64,
}

const _: () = assert!(std::mem::size_of::<DbErrorRecord>() == 24);

/// Allocate a DBError object. Ownership of `message` moves into it.
pub fn db_error_new(message: *mut NamlString, code: i64) -> *mut DbErrorRecord {
    let layout = Layout::new::<DbErrorRecord>();
    unsafe {
        let record = alloc(layout) as *mut DbErrorRecord;
        if record.is_null() {
            std::alloc::handle_alloc_error(layout);
        }
        record.write(DbErrorRecord {
            message,
            stack: std::ptr::null_mut(),
            code,
        });
        record
    }
}

/// Park a new DBError carrying `message` and `code`.
pub fn throw_db_error(message: &str, code: i64) {
    let record = db_error_new(naml_string_from_str(message), code);
    naml_exception_set_typed(record as *mut u8, EXCEPTION_TYPE_DB_ERROR);
}

/// Borrow the pending DBError, if that is what is parked.
pub fn pending_db_error<'a>() -> Option<&'a DbErrorRecord> {
    let pending = PENDING.with(Cell::get);
    if pending.type_id != EXCEPTION_TYPE_DB_ERROR {
        return None;
    }
    unsafe { (pending.object as *const DbErrorRecord).as_ref() }
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_exception_set_typed(exception_ptr: *mut u8, type_id: i64) {
    PENDING.with(|slot| slot.set(Pending { object: exception_ptr, type_id }));
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_exception_get_type_id() -> i64 {
    PENDING.with(Cell::get).type_id
}

/// The parked exception object, null if none.
#[unsafe(no_mangle)]
pub extern "C" fn naml_exception_get() -> *mut u8 {
    PENDING.with(Cell::get).object
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_exception_clear() {
    PENDING.with(|slot| slot.set(NONE));
}

#[unsafe(no_mangle)]
pub extern "C" fn naml_exception_check() -> i64 {
    (!naml_exception_get().is_null()) as i64
}
