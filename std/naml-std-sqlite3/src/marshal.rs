///
/// Argument and result marshaling between Rust values and the native ABI.
///
/// Rules:
/// - Length-prefixed buffers (`bind_text`, `bind_blob`) pass a null pointer
///   for empty input. The native library treats a null text or blob as "no
///   value" and a non-null zero-length buffer as an empty value, so the
///   binding never hands it a dangling zero-length pointer.
/// - NUL-terminated strings (`open_v2`, `bind_parameter_index`) are copied
///   into a `CString`; interior NUL bytes are rejected before the call.
/// - Native lengths are C `int`; larger buffers are rejected before the call.
/// - Native result buffers carry no length. The caller queries it with
///   `sqlite3_column_bytes` and copies exactly that many bytes.
///

use std::ffi::{c_char, c_int, CStr, CString};

use crate::error::BindingError;

/// A borrowed buffer in the pointer + length form the native library expects.
#[derive(Debug, Clone, Copy)]
pub struct NativeBuf {
    pub ptr: *const u8,
    pub len: c_int,
}

impl NativeBuf {
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

/// Borrow `bytes` as a length-prefixed buffer. Empty input becomes a null
/// pointer with length zero.
pub fn length_prefixed(what: &'static str, bytes: &[u8]) -> Result<NativeBuf, BindingError> {
    let len = native_len(what, bytes.len())?;
    let ptr = if bytes.is_empty() { std::ptr::null() } else { bytes.as_ptr() };
    Ok(NativeBuf { ptr, len })
}

pub fn native_len(what: &'static str, len: usize) -> Result<c_int, BindingError> {
    c_int::try_from(len).map_err(|_| BindingError::TooLarge { what, len })
}

/// Narrow a naml `int` to a native 32-bit argument.
pub fn narrow(what: &'static str, value: i64) -> Result<c_int, BindingError> {
    c_int::try_from(value).map_err(|_| BindingError::OutOfRange { what, value })
}

/// Copy `s` into a NUL-terminated buffer.
pub fn c_string(what: &'static str, s: &str) -> Result<CString, BindingError> {
    CString::new(s).map_err(|_| BindingError::InteriorNul { what })
}

/// Like `c_string`, but absent or empty input yields `None` so the caller
/// passes a null pointer.
pub fn optional_c_string(what: &'static str, s: Option<&str>) -> Result<Option<CString>, BindingError> {
    match s {
        Some(s) if !s.is_empty() => c_string(what, s).map(Some),
        _ => Ok(None),
    }
}

pub fn ptr_or_null(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(std::ptr::null(), |s| s.as_ptr())
}

/// Copy a NUL-terminated string owned by the native library.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn owned_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(ptr) };
    Some(s.to_string_lossy().into_owned())
}

/// Copy `len` bytes out of a native result buffer. A null pointer or a
/// non-positive length yields an empty vector.
///
/// # Safety
/// When non-null, `ptr` must be valid for reads of `len` bytes.
pub unsafe fn copy_native(ptr: *const u8, len: c_int) -> Vec<u8> {
    if ptr.is_null() || len <= 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }.to_vec()
}
