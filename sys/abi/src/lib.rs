// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! System-call ABI definitions, shared between the runtime and the C library
//! glue.
//!
//! Everything in here mirrors a definition from newlib's headers for
//! `arm-none-eabi`. The numeric values are part of the binary contract with
//! the precompiled C library and must not be renumbered.

#![no_std]

use num_derive::{FromPrimitive, ToPrimitive};
use static_assertions::{assert_eq_size, const_assert_eq};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Error codes the system-call layer can report through `errno`.
///
/// This is deliberately only the subset of newlib's `<sys/errno.h>` that this
/// runtime produces; there is no catch-all variant.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, FromPrimitive, ToPrimitive,
)]
#[repr(i32)]
#[allow(clippy::upper_case_acronyms)]
pub enum Errno {
    /// No such file or directory.
    ENOENT = 2,
    /// I/O error.
    EIO = 5,
    /// Bad file number.
    EBADF = 9,
    /// No child processes.
    ECHILD = 10,
    /// No more processes; try again.
    EAGAIN = 11,
    /// Not enough space.
    ENOMEM = 12,
    /// Bad address.
    EFAULT = 14,
    /// Invalid argument.
    EINVAL = 22,
    /// Too many links.
    EMLINK = 31,
    /// Function not implemented.
    ENOSYS = 88,
}

impl Errno {
    /// The raw value stored into `errno`.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Recovers an `Errno` from a raw `errno` value, if it's one we produce.
    pub fn from_code(code: i32) -> Option<Self> {
        num_traits::FromPrimitive::from_i32(code)
    }
}

/// A file descriptor as passed across the C ABI.
///
/// No descriptor is ever handed out by `open`, so the only ones that can show
/// up are the three conventional streams and garbage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct FileDesc(pub i32);

impl FileDesc {
    pub const STDIN: Self = Self(0);
    pub const STDOUT: Self = Self(1);
    pub const STDERR: Self = Self(2);

    /// Checks whether this is one of the two output streams that a console
    /// transport would serve.
    pub fn is_output_stream(self) -> bool {
        self == Self::STDOUT || self == Self::STDERR
    }
}

/// A process identifier.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct Pid(pub i32);

impl Pid {
    /// The one and only process. There is nothing else it could be.
    pub const SELF: Self = Self(1);
}

/// Mask of the file type bits within `st_mode`.
pub const S_IFMT: u32 = 0o170000;
/// File type: character special device.
pub const S_IFCHR: u32 = 0o020000;
/// File type: regular file.
pub const S_IFREG: u32 = 0o100000;

/// Leading fields of newlib's `struct stat`.
///
/// The C library hands us a pointer to the full structure, but the only field
/// we ever fill in is `st_mode` (which the C library consults to pick a
/// buffering mode). Describing just the prefix keeps us from depending on the
/// layout of the time fields, which has changed across newlib releases.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    FromBytes,
    IntoBytes,
    KnownLayout,
    Immutable,
)]
#[repr(C)]
pub struct Stat {
    pub st_dev: i16,
    pub st_ino: u16,
    pub st_mode: u32,
}

impl Stat {
    /// Extracts the file type bits of `st_mode`.
    pub fn file_type(&self) -> u32 {
        self.st_mode & S_IFMT
    }

    pub fn is_char_device(&self) -> bool {
        self.file_type() == S_IFCHR
    }
}

// newlib: dev_t is a short, ino_t an unsigned short, mode_t a 32-bit word.
const_assert_eq!(core::mem::offset_of!(Stat, st_mode), 4);
assert_eq_size!(Stat, [u32; 2]);

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    #[test]
    fn errno_values_match_newlib() {
        assert_eq!(Errno::ENOENT.code(), 2);
        assert_eq!(Errno::EBADF.code(), 9);
        assert_eq!(Errno::ECHILD.code(), 10);
        assert_eq!(Errno::EAGAIN.code(), 11);
        assert_eq!(Errno::ENOMEM.code(), 12);
        assert_eq!(Errno::EINVAL.code(), 22);
        assert_eq!(Errno::EMLINK.code(), 31);
        assert_eq!(Errno::ENOSYS.code(), 88);
    }

    #[test]
    fn errno_from_code() {
        assert_eq!(Errno::from_code(9), Some(Errno::EBADF));
        assert_eq!(Errno::from_code(0), None);
        assert_eq!(Errno::from_code(-1), None);
        assert_eq!(Errno::from_code(1), None);
    }

    #[test]
    fn output_streams() {
        assert!(FileDesc::STDOUT.is_output_stream());
        assert!(FileDesc::STDERR.is_output_stream());
        assert!(!FileDesc::STDIN.is_output_stream());
        assert!(!FileDesc(3).is_output_stream());
        assert!(!FileDesc(-1).is_output_stream());
    }

    #[test]
    fn stat_mode_lands_after_dev_and_ino() {
        let st = Stat {
            st_dev: 0,
            st_ino: 0,
            st_mode: S_IFCHR,
        };
        let bytes = st.as_bytes();
        assert_eq!(bytes[..4], [0; 4]);
        assert_eq!(bytes[4..8], S_IFCHR.to_ne_bytes());
        assert!(st.is_char_device());
    }

    #[test]
    fn file_type_ignores_permission_bits() {
        let st = Stat {
            st_mode: S_IFREG | 0o644,
            ..Stat::default()
        };
        assert_eq!(st.file_type(), S_IFREG);
        assert!(!st.is_char_device());
    }
}
