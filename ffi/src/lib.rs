//! C-ABI wrapper around `fluent-request-core`.
//!
//! # Overview
//! Lets any language with a C FFI configure a request through an opaque
//! handle, dispatch it, and receive the outcome through a plain C function
//! pointer plus a `void*` context.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Setters mirror the builder 1:1 and return 0 on success, -1 when a
//!   required pointer is null or an argument is out of range.
//! - Strings passed in are copied; invalid UTF-8 is replaced.
//! - Strings returned by `fr_request_last_response` are owned by the caller
//!   and must be released with `fr_string_free`. Strings inside an
//!   `FfiOutcome` are borrowed and die with the callback.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use fluent_request::RequestBuilder;
use tracing::warn;

pub use types::*;

const OK: i32 = 0;
const ERR: i32 = -1;

/// Copy a C string. Returns `None` for null.
fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Run `f` against the handle behind `request`, or return -1 for null.
fn with_request(request: *mut FfiRequest, f: impl FnOnce(&mut FfiRequest) -> i32) -> i32 {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return ERR;
        }
        f(unsafe { &mut *request })
    }))
    .unwrap_or(ERR)
}

/// Apply a builder setter, mapping a handle that lost its builder to -1.
fn apply(req: &mut FfiRequest, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> i32 {
    if req.update(f) {
        OK
    } else {
        warn!("request handle is unusable after an earlier panic");
        ERR
    }
}

/// Set a string-valued option through a by-value builder setter.
fn set_string(
    request: *mut FfiRequest,
    value: *const c_char,
    set: impl FnOnce(RequestBuilder, String) -> RequestBuilder,
) -> i32 {
    with_request(request, |req| match read_str(value) {
        Some(value) => apply(req, |builder| set(builder, value)),
        None => ERR,
    })
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Create a request targeting `url` with default settings.
///
/// Returns null if `url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `fr_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_new(url: *const c_char) -> *mut FfiRequest {
    catch_unwind(|| match read_str(url) {
        Some(url) => Box::into_raw(Box::new(FfiRequest::new(RequestBuilder::new().url(url)))),
        None => std::ptr::null_mut(),
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a request created by `fr_request_new`. Safe to call with null.
///
/// Asynchronous dispatches already in flight keep running and still invoke
/// their callback.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_free(request: *mut FfiRequest) {
    if !request.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(request) });
        }));
    }
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fr_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_url(request: *mut FfiRequest, url: *const c_char) -> i32 {
    set_string(request, url, |builder, value| builder.url(value))
}

/// Select `FR_METHOD_GET` (0) or `FR_METHOD_POST` (1). Any other value
/// returns -1 and leaves the method unchanged.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_method(request: *mut FfiRequest, method: u32) -> i32 {
    with_request(request, |req| match method_from_raw(method) {
        Some(method) => apply(req, |builder| builder.method(method)),
        None => {
            warn!(method, "unknown method code");
            ERR
        }
    })
}

/// Append a parameter. Both `key` and `value` are required.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_add_parameter(
    request: *mut FfiRequest,
    key: *const c_char,
    value: *const c_char,
) -> i32 {
    with_request(request, |req| match (read_str(key), read_str(value)) {
        (Some(key), Some(value)) => apply(req, |builder| builder.parameter(key, value)),
        _ => ERR,
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_content_type(request: *mut FfiRequest, value: *const c_char) -> i32 {
    set_string(request, value, |builder, value| builder.content_type(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_content_language(request: *mut FfiRequest, value: *const c_char) -> i32 {
    set_string(request, value, |builder, value| builder.content_language(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_user_agent(request: *mut FfiRequest, value: *const c_char) -> i32 {
    set_string(request, value, |builder, value| builder.user_agent(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_async(request: *mut FfiRequest, enabled: bool) -> i32 {
    with_request(request, |req| apply(req, |builder| builder.asynchronous(enabled)))
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_use_caches(request: *mut FfiRequest, enabled: bool) -> i32 {
    with_request(request, |req| apply(req, |builder| builder.use_caches(enabled)))
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_allow_request_body(request: *mut FfiRequest, enabled: bool) -> i32 {
    with_request(request, |req| apply(req, |builder| builder.allow_request_body(enabled)))
}

#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_allow_response_body(request: *mut FfiRequest, enabled: bool) -> i32 {
    with_request(request, |req| apply(req, |builder| builder.allow_response_body(enabled)))
}

/// Register the completion callback. `user_data` is passed back verbatim;
/// with asynchronous dispatch the callback runs on a background thread.
///
/// Returns -1 if `request` or `callback` is null.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_set_on_complete(
    request: *mut FfiRequest,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) -> i32 {
    let user_data = UserData::new(user_data);
    with_request(request, |req| match callback {
        Some(callback) => apply(req, move |builder| {
            builder.on_complete(move |outcome| deliver(callback, outcome, user_data))
        }),
        None => ERR,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Dispatch the request. Synchronous requests have finished, and their
/// callback has run, by the time this returns; asynchronous requests return
/// immediately.
///
/// Transport failures are reported through the callback, not here: the
/// return value is 0 whenever the handle was valid, and -1 for a null
/// handle or one left unusable by an earlier panic.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_dispatch(request: *mut FfiRequest) -> i32 {
    with_request(request, |req| match req.builder() {
        Some(builder) => {
            drop(builder.dispatch());
            OK
        }
        None => ERR,
    })
}

/// Status of the most recently completed dispatch, 0 if none or if
/// `request` is null.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_last_status(request: *const FfiRequest) -> u16 {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return 0;
        }
        unsafe { &*request }.builder().map_or(0, RequestBuilder::status_code)
    }))
    .unwrap_or(0)
}

/// Body of the most recently completed dispatch (empty if none).
///
/// Returns null if `request` is null or unusable. The caller must free the returned
/// string with `fr_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fr_request_last_response(request: *const FfiRequest) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return std::ptr::null_mut();
        }
        match unsafe { &*request }.builder() {
            Some(builder) => to_c_string(&builder.response()).into_raw(),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}
