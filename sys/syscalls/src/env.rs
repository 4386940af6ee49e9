// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process environment, which is empty.
//!
//! newlib's `getenv` walks `environ` until it finds a null pointer, so the
//! smallest valid environment is a one-element list holding just that. Both
//! symbols are writable from C (`setenv` replaces `environ`), so they live in
//! RAM rather than flash.

use core::cell::UnsafeCell;
use core::ffi::c_char;

#[repr(transparent)]
pub struct EnvList(UnsafeCell<[*mut c_char; 1]>);

#[repr(transparent)]
pub struct Environ(UnsafeCell<*mut *mut c_char>);

// Safety: there is one thread, and only C code ever writes these.
unsafe impl Sync for EnvList {}
// Safety: as above.
unsafe impl Sync for Environ {}

impl EnvList {
    pub const fn as_ptr(&'static self) -> *mut *mut c_char {
        self.0.get().cast()
    }
}

impl Environ {
    /// The list `environ` currently points at.
    pub fn get(&self) -> *mut *mut c_char {
        // Safety: reading a pointer-sized word; only C writes it, and not
        // concurrently with us.
        unsafe { *self.0.get() }
    }
}

#[cfg_attr(target_os = "none", export_name = "__env")]
#[used]
pub static ENV: EnvList = EnvList(UnsafeCell::new([core::ptr::null_mut()]));

#[cfg_attr(target_os = "none", export_name = "environ")]
#[used]
pub static ENVIRON: Environ = Environ(UnsafeCell::new(ENV.as_ptr()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environ_is_the_empty_list() {
        let list = ENVIRON.get();
        assert_eq!(list, ENV.as_ptr());
        assert!(unsafe { *list }.is_null());
    }
}
