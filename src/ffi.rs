//! FFI bindings for Inner Weather
//!
//! This module provides C-compatible functions for calling the predictor from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using
//! `inner_weather_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::model::LoadedModel;
use crate::pipeline::PhasePredictor;

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

/// Opaque handle to a PhasePredictor
pub struct PredictorHandle {
    predictor: PhasePredictor,
}

fn into_handle(model: LoadedModel) -> *mut PredictorHandle {
    let handle = Box::new(PredictorHandle {
        predictor: PhasePredictor::with_model(model),
    });
    Box::into_raw(handle)
}

/// Load a model artifact file and create a predictor for it.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `inner_weather_predictor_free`.
/// - Returns NULL on error; call `inner_weather_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_predictor_load(path: *const c_char) -> *mut PredictorHandle {
    clear_last_error();

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return ptr::null_mut();
        }
    };

    match LoadedModel::from_path(&path_str) {
        Ok(model) => into_handle(model),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Create a predictor from an artifact held in memory as JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `inner_weather_predictor_free`.
/// - Returns NULL on error; call `inner_weather_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_predictor_from_json(
    json: *const c_char,
) -> *mut PredictorHandle {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match LoadedModel::from_json(&json_str) {
        Ok(model) => into_handle(model),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a predictor.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by one of the constructors.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_predictor_free(predictor: *mut PredictorHandle) {
    if !predictor.is_null() {
        drop(Box::from_raw(predictor));
    }
}

/// Predict phase and mood for a JSON request.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by one of the constructors.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `inner_weather_free_string`.
/// - Returns NULL on error; call `inner_weather_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_predict(
    predictor: *const PredictorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if predictor.is_null() {
        set_last_error("Null predictor pointer");
        return ptr::null_mut();
    }

    let handle = &*predictor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.predictor.predict_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Describe the predictor's model as JSON.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by one of the constructors.
/// - Returns a newly allocated string that must be freed with `inner_weather_free_string`.
/// - Returns NULL on error; call `inner_weather_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_model_info(predictor: *const PredictorHandle) -> *mut c_char {
    clear_last_error();

    if predictor.is_null() {
        set_last_error("Null predictor pointer");
        return ptr::null_mut();
    }

    let handle = &*predictor;

    let info = handle
        .predictor
        .model_info()
        .map_err(|e| e.to_string())
        .and_then(|info| serde_json::to_string(&info).map_err(|e| e.to_string()));

    match info {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// Free a string returned by an Inner Weather function.
///
/// # Safety
/// - `s` must be a pointer returned by an Inner Weather function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the last error message on this thread.
///
/// # Safety
/// - Returns a pointer owned by the library, valid until the next call on
///   the same thread. Do not free it.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn inner_weather_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}
