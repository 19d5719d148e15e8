//!
//! Runtime Value Representation
//!
//! Heap objects handed across the native boundary share a common header
//! followed by their payload. Strings store UTF-8 bytes inline after the
//! header; the length is carried explicitly so the payload is never
//! NUL-terminated.
//!

use std::alloc::{alloc, dealloc, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Type tags for heap objects
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapTag {
    String = 0,
    Bytes = 6,
}

/// Header for all heap-allocated objects
#[repr(C)]
pub struct HeapHeader {
    pub refcount: AtomicUsize,
    pub tag: HeapTag,
    pub _pad: [u8; 7],
}

impl HeapHeader {
    pub fn new(tag: HeapTag) -> Self {
        Self {
            refcount: AtomicUsize::new(1),
            tag,
            _pad: [0; 7],
        }
    }

    pub fn incref(&self) {
        self.refcount.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decref(&self) -> bool {
        if self.refcount.fetch_sub(1, Ordering::Release) == 1 {
            std::sync::atomic::fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    pub fn refcount(&self) -> usize {
        self.refcount.load(Ordering::Relaxed)
    }
}

/// A heap-allocated string
#[repr(C)]
pub struct NamlString {
    pub header: HeapHeader,
    pub len: usize,
    pub data: [u8; 0],
}

impl NamlString {
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    pub fn as_str(&self) -> &str {
        unsafe { std::str::from_utf8_unchecked(self.as_bytes()) }
    }

    /// Borrow the contents of a possibly-null string pointer.
    ///
    /// # Safety
    /// `s` must be null or point to a live `NamlString`.
    pub unsafe fn borrow<'a>(s: *const NamlString) -> Option<&'a NamlString> {
        unsafe { s.as_ref() }
    }
}

fn string_layout(len: usize) -> Layout {
    Layout::from_size_align(
        std::mem::size_of::<NamlString>() + len,
        std::mem::align_of::<NamlString>(),
    ).unwrap()
}

/// Allocate a new string on the heap
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_string_new(data: *const u8, len: usize) -> *mut NamlString {
    unsafe {
        let ptr = alloc(string_layout(len)) as *mut NamlString;
        if ptr.is_null() {
            panic!("Failed to allocate string");
        }

        std::ptr::write(&mut (*ptr).header, HeapHeader::new(HeapTag::String));
        (*ptr).len = len;

        if !data.is_null() && len > 0 {
            std::ptr::copy_nonoverlapping(data, (*ptr).data.as_mut_ptr(), len);
        }

        ptr
    }
}

/// Allocate a new heap string holding a copy of `s`
pub fn naml_string_from_str(s: &str) -> *mut NamlString {
    unsafe { naml_string_new(s.as_ptr(), s.len()) }
}

/// Increment reference count of a string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_string_incref(s: *mut NamlString) {
    if !s.is_null() {
        unsafe { (*s).header.incref(); }
    }
}

/// Decrement reference count and free if zero
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_string_decref(s: *mut NamlString) {
    if !s.is_null() {
        unsafe {
            if (*s).header.decref() {
                dealloc(s as *mut u8, string_layout((*s).len));
            }
        }
    }
}

/// Get string length in bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_string_len(s: *const NamlString) -> i64 {
    if s.is_null() {
        0
    } else {
        unsafe { (*s).len as i64 }
    }
}

/// Get pointer to string data
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_string_data(s: *const NamlString) -> *const u8 {
    if s.is_null() {
        std::ptr::null()
    } else {
        unsafe { (*s).data.as_ptr() }
    }
}

/// Create a NamlString from a null-terminated C string pointer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_string_from_cstr(cstr: *const std::ffi::c_char) -> *mut NamlString {
    if cstr.is_null() {
        return unsafe { naml_string_new(std::ptr::null(), 0) };
    }
    unsafe {
        let bytes = std::ffi::CStr::from_ptr(cstr).to_bytes();
        naml_string_new(bytes.as_ptr(), bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_creation() {
        unsafe {
            let data = b"hello";
            let s = naml_string_new(data.as_ptr(), data.len());
            assert!(!s.is_null());
            assert_eq!((*s).len, 5);
            assert_eq!((*s).header.refcount(), 1);
            assert_eq!((*s).as_str(), "hello");
            naml_string_decref(s);
        }
    }

    #[test]
    fn test_string_refcount() {
        unsafe {
            let s = naml_string_from_str("shared");
            naml_string_incref(s);
            assert_eq!((*s).header.refcount(), 2);
            naml_string_decref(s);
            assert_eq!((*s).header.refcount(), 1);
            naml_string_decref(s);
        }
    }

    #[test]
    fn test_null_string_accessors() {
        unsafe {
            assert_eq!(naml_string_len(std::ptr::null()), 0);
            assert!(naml_string_data(std::ptr::null()).is_null());
            assert!(NamlString::borrow(std::ptr::null()).is_none());
        }
    }

    #[test]
    fn test_string_from_cstr() {
        unsafe {
            let s = naml_string_from_cstr(c"main.db".as_ptr());
            assert_eq!((*s).as_bytes(), b"main.db");
            naml_string_decref(s);

            let empty = naml_string_from_cstr(std::ptr::null());
            assert_eq!((*empty).len, 0);
            naml_string_decref(empty);
        }
    }
}
