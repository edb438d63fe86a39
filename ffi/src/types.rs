//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! `FfiRequest` is opaque to C. `FfiOutcome` is the only struct C reads
//! directly; its strings are borrowed for the duration of the callback and
//! must be copied if the caller wants to keep them.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use fluent_request::{HttpMethod, Outcome, RequestBuilder};

/// Opaque handle to a `RequestBuilder`.
///
/// The builder is taken out while a setter runs. If that setter panics the
/// slot stays empty and every later call on the handle fails, instead of
/// quietly continuing with a default builder.
pub struct FfiRequest {
    builder: Option<RequestBuilder>,
}

impl FfiRequest {
    pub(crate) fn new(builder: RequestBuilder) -> Self {
        Self { builder: Some(builder) }
    }

    pub(crate) fn builder(&self) -> Option<&RequestBuilder> {
        self.builder.as_ref()
    }

    /// Apply a by-value builder setter in place. Returns `false` if the
    /// handle lost its builder to an earlier panic.
    pub(crate) fn update(&mut self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> bool {
        match self.builder.take() {
            Some(builder) => {
                self.builder = Some(f(builder));
                true
            }
            None => false,
        }
    }
}

pub const FR_METHOD_GET: u32 = 0;
pub const FR_METHOD_POST: u32 = 1;

pub(crate) fn method_from_raw(raw: u32) -> Option<HttpMethod> {
    match raw {
        FR_METHOD_GET => Some(HttpMethod::Get),
        FR_METHOD_POST => Some(HttpMethod::Post),
        _ => None,
    }
}

/// Result of one dispatch as seen from C.
///
/// `body` is never null. `error` is null on success and otherwise holds a
/// description of the failure; `status` is 0 if no response arrived.
#[repr(C)]
pub struct FfiOutcome {
    pub status: u16,
    pub body: *const c_char,
    pub error: *const c_char,
}

/// Completion callback. `outcome` is valid only until the callback returns.
pub type FfiCallback = extern "C" fn(outcome: *const FfiOutcome, user_data: *mut c_void);

/// Caller-owned context pointer handed back to the callback, possibly on
/// another thread. The C side is responsible for its thread safety.
#[derive(Clone, Copy)]
pub(crate) struct UserData(*mut c_void);

unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

impl UserData {
    pub(crate) fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub(crate) fn get(self) -> *mut c_void {
        self.0
    }
}

/// Convert a Rust string to a `CString`, dropping interior NULs.
pub(crate) fn to_c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Invoke `callback` with a borrowed view of `outcome`.
pub(crate) fn deliver(callback: FfiCallback, outcome: &Outcome, user_data: UserData) {
    let body = to_c_string(outcome.body());
    let error = outcome.error().map(|err| to_c_string(&err.to_string()));
    let ffi = FfiOutcome {
        status: outcome.status(),
        body: body.as_ptr(),
        error: error.as_ref().map_or(std::ptr::null(), |err| err.as_ptr()),
    };
    callback(&ffi, user_data.get());
}
