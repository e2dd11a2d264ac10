//! FFI bindings for Synheart Energy
//!
//! This module provides C-compatible functions for calling the engine from the host
//! application. All functions use C strings (null-terminated) and return allocated memory
//! that must be freed by the caller using `energy_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{parse_reference_date, records_to_snapshot, EnergyProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Map a pipeline result to an owned C string, recording errors
fn result_to_cstr(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute a snapshot from health records.
///
/// # Safety
/// - `records_json` and `reference_date` must be valid null-terminated C strings.
/// - `config_json` may be NULL to use the default configuration.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_records_to_snapshot(
    records_json: *const c_char,
    config_json: *const c_char,
    reference_date: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let records_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records string pointer");
            return ptr::null_mut();
        }
    };

    let config_str = if config_json.is_null() {
        None
    } else {
        match cstr_to_string(config_json) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid config string");
                return ptr::null_mut();
            }
        }
    };

    let date_str = match cstr_to_string(reference_date) {
        Some(s) => s,
        None => {
            set_last_error("Invalid reference date pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(records_to_snapshot(records_str, config_str, date_str))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to an EnergyProcessor
pub struct EnergyProcessorHandle {
    processor: EnergyProcessor,
}

/// Create a new EnergyProcessor.
///
/// # Safety
/// - `config_json` may be NULL to use the default configuration.
/// - Returns a pointer to a newly allocated EnergyProcessor.
/// - Must be freed with `energy_processor_free`.
/// - Returns NULL on an invalid configuration; call `energy_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_new(
    config_json: *const c_char,
) -> *mut EnergyProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        Ok(EnergyProcessor::new())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => EngineConfig::from_json(&json).and_then(EnergyProcessor::with_config),
            None => {
                set_last_error("Invalid config string");
                return ptr::null_mut();
            }
        }
    };

    match processor {
        Ok(processor) => Box::into_raw(Box::new(EnergyProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an EnergyProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_free(processor: *mut EnergyProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Refresh the processor and return the new snapshot.
///
/// On error the previous snapshot is kept and can still be saved.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - `records_json` and `reference_date` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error; call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_process(
    processor: *mut EnergyProcessorHandle,
    records_json: *const c_char,
    reference_date: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let records_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records string pointer");
            return ptr::null_mut();
        }
    };

    let date_str = match cstr_to_string(reference_date) {
        Some(s) => s,
        None => {
            set_last_error("Invalid reference date pointer");
            return ptr::null_mut();
        }
    };

    let result = parse_reference_date(&date_str)
        .and_then(|date| handle.processor.process(&records_str, date));
    result_to_cstr(result)
}

/// Save the processor's last snapshot to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - Returns a newly allocated string that must be freed with `energy_free_string`.
/// - Returns NULL on error or when nothing has been computed yet.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_save_snapshot(
    processor: *mut EnergyProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    result_to_cstr(handle.processor.save_snapshot())
}

/// Load a previously saved snapshot into the processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `energy_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `energy_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn energy_processor_load_snapshot(
    processor: *mut EnergyProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.load_snapshot(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Energy functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an Energy function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn energy_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Energy function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn energy_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn energy_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
