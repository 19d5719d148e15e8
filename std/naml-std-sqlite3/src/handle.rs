///
/// Opaque native handles.
///
/// Connection and statement objects live in the native library's address
/// space. The binding only carries their addresses around: a handle can be
/// compared, hashed and converted to and from the `i64` representation naml
/// code holds, but exposes no arithmetic and is never dereferenced here.
///

use std::ptr::NonNull;

use crate::ffi::{sqlite3, sqlite3_stmt};

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident => $target:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(NonNull<$target>);

        // The native library decides which threads may use an object; the
        // handle itself is only an address.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            /// Wrap a pointer returned by the native library. Null yields `None`.
            pub fn from_ptr(ptr: *mut $target) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            pub fn as_ptr(self) -> *mut $target {
                self.0.as_ptr()
            }

            /// The `i64` form handed to naml code.
            pub fn to_raw(self) -> i64 {
                self.0.as_ptr() as usize as i64
            }

            /// Rebuild a handle from its `i64` form. Zero yields `None`.
            pub fn from_raw(raw: i64) -> Option<Self> {
                Self::from_ptr(raw as usize as *mut $target)
            }
        }
    };
}

native_handle! {
    /// An open database connection (`sqlite3 *`).
    ConnHandle => sqlite3
}

native_handle! {
    /// A prepared statement (`sqlite3_stmt *`).
    StmtHandle => sqlite3_stmt
}
