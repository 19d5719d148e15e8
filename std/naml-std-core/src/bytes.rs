///
/// NamlBytes - Core Bytes Type
///
/// Provides the heap-allocated byte buffer type shared across all std crates.
/// Similar to strings but for raw binary data; blobs cross the native
/// boundary in this form.
///

use std::alloc::{alloc, dealloc, Layout};

use crate::{HeapHeader, HeapTag};

/// A heap-allocated byte array
#[repr(C)]
pub struct NamlBytes {
    pub header: HeapHeader,
    pub len: usize,
    pub capacity: usize,
    pub data: [u8; 0],
}

impl NamlBytes {
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    /// Borrow a possibly-null bytes pointer.
    ///
    /// # Safety
    /// `b` must be null or point to a live `NamlBytes`.
    pub unsafe fn borrow<'a>(b: *const NamlBytes) -> Option<&'a NamlBytes> {
        unsafe { b.as_ref() }
    }
}

fn bytes_layout(capacity: usize) -> Layout {
    Layout::from_size_align(
        std::mem::size_of::<NamlBytes>() + capacity,
        std::mem::align_of::<NamlBytes>(),
    ).unwrap()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_bytes_from(data: *const u8, len: usize) -> *mut NamlBytes {
    unsafe {
        let cap = if len == 0 { 8 } else { len };
        let ptr = alloc(bytes_layout(cap)) as *mut NamlBytes;
        if ptr.is_null() {
            panic!("Failed to allocate bytes");
        }

        std::ptr::write(&mut (*ptr).header, HeapHeader::new(HeapTag::Bytes));
        (*ptr).len = len;
        (*ptr).capacity = cap;

        if !data.is_null() && len > 0 {
            std::ptr::copy_nonoverlapping(data, (*ptr).data.as_mut_ptr(), len);
        }

        ptr
    }
}

/// Allocate a new bytes object holding a copy of `data`
pub fn naml_bytes_from_slice(data: &[u8]) -> *mut NamlBytes {
    unsafe { naml_bytes_from(data.as_ptr(), data.len()) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_bytes_len(b: *const NamlBytes) -> i64 {
    if b.is_null() {
        0
    } else {
        unsafe { (*b).len as i64 }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_bytes_incref(b: *mut NamlBytes) {
    if !b.is_null() {
        unsafe { (*b).header.incref(); }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn naml_bytes_decref(b: *mut NamlBytes) {
    if !b.is_null() {
        unsafe {
            if (*b).header.decref() {
                dealloc(b as *mut u8, bytes_layout((*b).capacity));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_from_slice() {
        unsafe {
            let b = naml_bytes_from_slice(&[0xde, 0xad, 0x00, 0xef]);
            assert_eq!(naml_bytes_len(b), 4);
            assert_eq!((*b).as_slice(), &[0xde, 0xad, 0x00, 0xef]);
            assert_eq!((*b).header.tag, HeapTag::Bytes);
            naml_bytes_decref(b);
        }
    }

    #[test]
    fn test_empty_bytes_is_not_null() {
        unsafe {
            let b = naml_bytes_from(std::ptr::null(), 0);
            assert!(!b.is_null());
            assert_eq!(naml_bytes_len(b), 0);
            assert!((*b).as_slice().is_empty());
            naml_bytes_decref(b);
        }
    }
}
