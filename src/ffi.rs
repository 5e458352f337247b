//! C-compatible wrappers around [`StatusTable`].
//!
//! The crate builds as a cdylib; hosts `dlopen` it and drive the table
//! through these exports. The factory hands out an opaque heap handle, the
//! per-operation wrappers return the stable integer codes (`OK=0`,
//! `NOT_FOUND=-1`, `NO_SPACE=-2`, `DUPLICATE=-3`), and the cleanup entry
//! unlinks the segment.
use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_int};

use crate::error::OpStatus;
use crate::shm::{LockBackend, StatusTable};

/// Open the default reader/writer-lock table and return an opaque handle,
/// or null if the segment could not be opened or initialized.
///
/// Each call returns an independent handle onto the same segment; release
/// every handle with [`status_table_release`].
#[no_mangle]
pub extern "C" fn status_table_acquire() -> *mut StatusTable {
    match StatusTable::open(LockBackend::RwLock) {
        Ok(table) => Box::into_raw(Box::new(table)),
        Err(err) => {
            tracing::warn!(error = %err, "status_table_acquire failed");
            std::ptr::null_mut()
        }
    }
}

/// Release a handle from [`status_table_acquire`]. The segment itself is
/// untouched. Null is a no-op.
///
/// # Safety
/// `table` must be a handle returned by [`status_table_acquire`] that has
/// not been released yet.
#[no_mangle]
pub unsafe extern "C" fn status_table_release(table: *mut StatusTable) {
    if !table.is_null() {
        drop(Box::from_raw(table));
    }
}

/// Insert a new entry. `value` is a NUL-terminated C string.
///
/// # Safety
/// `table` must be a live handle; `value` must be a valid C string. Null
/// arguments return `NO_SPACE`.
#[no_mangle]
pub unsafe extern "C" fn status_table_add(
    table: *const StatusTable,
    key: c_int,
    value: *const c_char,
) -> c_int {
    let Some(table) = table.as_ref() else {
        return OpStatus::NoSpace.code();
    };
    if value.is_null() {
        return OpStatus::NoSpace.code();
    }
    table.add(key, CStr::from_ptr(value).to_bytes()).code()
}

/// Overwrite an existing entry.
///
/// # Safety
/// Same contract as [`status_table_add`].
#[no_mangle]
pub unsafe extern "C" fn status_table_update(
    table: *const StatusTable,
    key: c_int,
    value: *const c_char,
) -> c_int {
    let Some(table) = table.as_ref() else {
        return OpStatus::NoSpace.code();
    };
    if value.is_null() {
        return OpStatus::NoSpace.code();
    }
    table.update(key, CStr::from_ptr(value).to_bytes()).code()
}

/// Insert or overwrite.
///
/// # Safety
/// Same contract as [`status_table_add`].
#[no_mangle]
pub unsafe extern "C" fn status_table_upsert(
    table: *const StatusTable,
    key: c_int,
    value: *const c_char,
) -> c_int {
    let Some(table) = table.as_ref() else {
        return OpStatus::NoSpace.code();
    };
    if value.is_null() {
        return OpStatus::NoSpace.code();
    }
    table.upsert(key, CStr::from_ptr(value).to_bytes()).code()
}

/// Copy the value for `key` into `buf` as a NUL-terminated string.
///
/// Returns the value length in bytes (0 for a missing key or an empty
/// value — distinguish with [`status_table_contains`]), or `NO_SPACE` if
/// `buf_len` cannot hold the value plus its terminator.
///
/// # Safety
/// `table` must be a live handle; `buf` must point to `buf_len` writable
/// bytes.
#[no_mangle]
pub unsafe extern "C" fn status_table_get(
    table: *const StatusTable,
    key: c_int,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    let Some(table) = table.as_ref() else {
        return OpStatus::NoSpace.code();
    };
    if buf.is_null() || buf_len == 0 {
        return OpStatus::NoSpace.code();
    }
    let value = table.get(key);
    if value.len() + 1 > buf_len {
        return OpStatus::NoSpace.code();
    }
    std::ptr::copy_nonoverlapping(value.as_ptr(), buf as *mut u8, value.len());
    *buf.add(value.len()) = 0;
    value.len() as c_int
}

/// Tombstone the entry for `key`.
///
/// # Safety
/// `table` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn status_table_remove(table: *const StatusTable, key: c_int) -> c_int {
    match table.as_ref() {
        Some(table) => table.remove(key).code(),
        None => OpStatus::NotFound.code(),
    }
}

/// 1 if the key is present, else 0.
///
/// # Safety
/// `table` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn status_table_contains(table: *const StatusTable, key: c_int) -> c_int {
    match table.as_ref() {
        Some(table) => c_int::from(table.contains(key)),
        None => 0,
    }
}

/// Number of live entries.
///
/// # Safety
/// `table` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn status_table_count(table: *const StatusTable) -> c_int {
    match table.as_ref() {
        Some(table) => table.count() as c_int,
        None => 0,
    }
}

/// Reset every slot.
///
/// # Safety
/// `table` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn status_table_clear(table: *const StatusTable) -> c_int {
    match table.as_ref() {
        Some(table) => table.clear().code(),
        None => OpStatus::NoSpace.code(),
    }
}

/// Live entries divided by capacity.
///
/// # Safety
/// `table` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn status_table_load_factor(table: *const StatusTable) -> c_double {
    match table.as_ref() {
        Some(table) => table.load_factor(),
        None => 0.0,
    }
}

/// Print the occupancy/probe statistics to stdout.
///
/// # Safety
/// `table` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn status_table_print_stats(table: *const StatusTable) {
    if let Some(table) = table.as_ref() {
        println!("{}", table.stats());
    }
}

/// Unlink the default reader/writer-lock segment. Returns 0 on success
/// (including when the segment does not exist) and -1 on unexpected error.
#[no_mangle]
pub extern "C" fn status_table_cleanup() -> c_int {
    match StatusTable::cleanup(LockBackend::RwLock) {
        Ok(()) => 0,
        Err(err) => {
            tracing::warn!(error = %err, "status_table_cleanup failed");
            -1
        }
    }
}
