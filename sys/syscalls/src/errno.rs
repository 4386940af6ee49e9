// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The shared `errno` word.

use core::sync::atomic::{AtomicI32, Ordering};

use abi::Errno;
use static_assertions::assert_eq_size;

/// A C `int` holding the code of the most recent failure.
///
/// Nothing clears it; it only means something right after a call returned its
/// failure sentinel. Only loads and stores are used, so this works on parts
/// without atomic read-modify-write.
#[repr(transparent)]
pub struct ErrorState(AtomicI32);

// C code reads this as a plain `int`.
assert_eq_size!(ErrorState, i32);

impl ErrorState {
    pub const fn new() -> Self {
        Self(AtomicI32::new(0))
    }

    pub fn set(&self, errno: Errno) {
        self.0.store(errno.code(), Ordering::Relaxed);
    }

    /// The raw word, which may be something C code stored.
    pub fn raw(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    /// The last failure recorded, if it's one of ours.
    pub fn last(&self) -> Option<Errno> {
        Errno::from_code(self.raw())
    }
}

impl Default for ErrorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(target_os = "none", export_name = "errno")]
#[used]
pub static ERROR_STATE: ErrorState = ErrorState::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        let e = ErrorState::new();
        assert_eq!(e.raw(), 0);
        assert_eq!(e.last(), None);
    }

    #[test]
    fn overwritten_not_accumulated() {
        let e = ErrorState::new();
        e.set(Errno::EBADF);
        assert_eq!(e.last(), Some(Errno::EBADF));
        e.set(Errno::ENOENT);
        assert_eq!(e.raw(), 2);
        assert_eq!(e.last(), Some(Errno::ENOENT));
    }
}
