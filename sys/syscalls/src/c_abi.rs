// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The symbols newlib links against.
//!
//! These use newlib's names and C signatures for `arm-none-eabi`, where
//! `int`, `ssize_t`, `off_t` and `clock_t` are all one word. On failure each
//! stores the code into `errno` and returns the C sentinel (`-1`, or
//! `(void *)-1` for `_sbrk`).
//!
//! Symbol names are only exported on the target, so that host tests don't
//! collide with the host's C library.

use core::ffi::{c_char, c_int, c_void, CStr};

use abi::{Errno, FileDesc, Pid, Stat};
use zerocopy::IntoBytes;

use crate::{ops, Call, Trace, ERROR_STATE, SYSCALL_TRACE};

/// Records a failure the way C expects to find it.
fn fail(call: Call, errno: Errno) -> c_int {
    ERROR_STATE.set(errno);
    trace!(SYSCALL_TRACE, Trace::Syscall { call, errno });
    -1
}

fn status(call: Call, result: Result<c_int, Errno>) -> c_int {
    result.unwrap_or_else(|e| fail(call, e))
}

fn to_c_int(n: usize) -> Result<c_int, Errno> {
    c_int::try_from(n).map_err(|_| Errno::EINVAL)
}

/// Borrows a C string, which may be null.
///
/// # Safety
///
/// If non-null, `p` must point to a NUL-terminated string that outlives
/// `'a`.
unsafe fn opt_cstr<'a>(p: *const c_char) -> Option<&'a CStr> {
    if p.is_null() {
        None
    } else {
        // Safety: per our contract.
        Some(unsafe { CStr::from_ptr(p) })
    }
}

/// Copies `stat` into newlib's `struct stat`. Only the leading fields are
/// written; the rest are left as the caller had them.
///
/// # Safety
///
/// If non-null, `buf` must be valid for writes of `size_of::<Stat>()` bytes.
/// It needn't be aligned.
unsafe fn store_stat(buf: *mut Stat, stat: Stat) -> Result<c_int, Errno> {
    if buf.is_null() {
        return Err(Errno::EFAULT);
    }
    let bytes = stat.as_bytes();
    // Safety: per our contract; `bytes` is a local, so they can't overlap.
    unsafe {
        core::ptr::copy_nonoverlapping(
            bytes.as_ptr(),
            buf.cast::<u8>(),
            bytes.len(),
        );
    }
    Ok(0)
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _exit(status: c_int) -> ! {
    ops::exit(status)
}

/// # Safety
///
/// `path` must be null or a valid C string.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _open(
    path: *const c_char,
    flags: c_int,
    mode: c_int,
) -> c_int {
    // Safety: per our contract.
    let path = unsafe { opt_cstr(path) };
    status(Call::Open, ops::open(path, flags, mode).map(|fd| fd.0))
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _close(fd: c_int) -> c_int {
    status(Call::Close, ops::close(FileDesc(fd)).map(|()| 0))
}

/// # Safety
///
/// `buf` must be valid for writes of `len` bytes, or null with `len` zero.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _read(
    fd: c_int,
    buf: *mut c_void,
    len: usize,
) -> c_int {
    let buf: &mut [u8] = if buf.is_null() {
        if len != 0 {
            return fail(Call::Read, Errno::EFAULT);
        }
        &mut []
    } else {
        // Safety: per our contract.
        unsafe { core::slice::from_raw_parts_mut(buf.cast(), len) }
    };
    status(Call::Read, ops::read(FileDesc(fd), buf).and_then(to_c_int))
}

/// # Safety
///
/// `buf` must be valid for reads of `len` bytes, or null with `len` zero.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _write(
    fd: c_int,
    buf: *const c_void,
    len: usize,
) -> c_int {
    let buf: &[u8] = if buf.is_null() {
        if len != 0 {
            return fail(Call::Write, Errno::EFAULT);
        }
        &[]
    } else {
        // Safety: per our contract.
        unsafe { core::slice::from_raw_parts(buf.cast(), len) }
    };
    status(Call::Write, ops::write(FileDesc(fd), buf).and_then(to_c_int))
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _lseek(fd: c_int, offset: c_int, whence: c_int) -> c_int {
    // Can't fail, so there's no call to record it under.
    ops::lseek(FileDesc(fd), offset, whence).unwrap_or(-1)
}

/// # Safety
///
/// `path` must be null or a valid C string, and `buf` null or valid for
/// writes of a `struct stat`.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _stat(path: *const c_char, buf: *mut Stat) -> c_int {
    // Safety: per our contract.
    let path = unsafe { opt_cstr(path) };
    let result = ops::stat(path).and_then(|st| {
        // Safety: per our contract.
        unsafe { store_stat(buf, st) }
    });
    status(Call::Stat, result)
}

/// # Safety
///
/// `buf` must be null or valid for writes of a `struct stat`.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _fstat(fd: c_int, buf: *mut Stat) -> c_int {
    let result = ops::fstat(FileDesc(fd)).and_then(|st| {
        // Safety: per our contract.
        unsafe { store_stat(buf, st) }
    });
    status(Call::Fstat, result)
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _isatty(fd: c_int) -> c_int {
    ops::isatty(FileDesc(fd)) as c_int
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _fork() -> c_int {
    status(Call::Fork, ops::fork().map(|pid| pid.0))
}

/// # Safety
///
/// `path` must be null or a valid C string. The argument and environment
/// vectors are never looked at.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _execve(
    path: *const c_char,
    _argv: *const *const c_char,
    _envp: *const *const c_char,
) -> c_int {
    // Safety: per our contract.
    let path = unsafe { opt_cstr(path) };
    status(Call::Execve, ops::execve(path).map(|never| match never {}))
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _getpid() -> c_int {
    ops::getpid().0
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _kill(pid: c_int, sig: c_int) -> c_int {
    status(Call::Kill, ops::kill(Pid(pid), sig).map(|()| 0))
}

/// # Safety
///
/// Both paths must be null or valid C strings.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _link(
    existing: *const c_char,
    new: *const c_char,
) -> c_int {
    // Safety: per our contract.
    let (existing, new) = unsafe { (opt_cstr(existing), opt_cstr(new)) };
    status(Call::Link, ops::link(existing, new).map(|()| 0))
}

/// # Safety
///
/// `path` must be null or a valid C string.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn _unlink(path: *const c_char) -> c_int {
    // Safety: per our contract.
    let path = unsafe { opt_cstr(path) };
    status(Call::Unlink, ops::unlink(path).map(|()| 0))
}

/// The `struct tms` is never written.
#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _times(_buf: *mut c_void) -> c_int {
    status(Call::Times, ops::times().map(|ticks| ticks as c_int))
}

/// The status word is never written, since nothing is reaped.
#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _wait(_status: *mut c_int) -> c_int {
    status(Call::Wait, ops::wait().map(|pid| pid.0))
}

#[cfg_attr(target_os = "none", no_mangle)]
pub extern "C" fn _sbrk(increment: isize) -> *mut c_void {
    match ops::sbrk(increment) {
        Ok(prev) => prev.cast(),
        Err(e) => {
            fail(Call::Sbrk, e);
            usize::MAX as *mut c_void
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::S_IFCHR;
    use std::sync::Mutex;

    // ERROR_STATE is one word shared by every test in the binary.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn check(expect: Errno, f: impl FnOnce() -> c_int) {
        let _g = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        ERROR_STATE.set(Errno::EIO);
        assert_eq!(f(), -1);
        assert_eq!(ERROR_STATE.last(), Some(expect));
    }

    fn last_trace() -> Option<Trace> {
        critical_section::with(|cs| {
            SYSCALL_TRACE.borrow(cs).borrow().latest().map(|e| e.payload)
        })
    }

    #[cfg(not(feature = "semihosting"))]
    #[test]
    fn stdout_write_fails_with_ebadf() {
        let msg = b"hello\n";
        check(Errno::EBADF, || unsafe {
            _write(1, msg.as_ptr().cast(), msg.len())
        });
        check(Errno::EBADF, || unsafe {
            _write(2, msg.as_ptr().cast(), msg.len())
        });
    }

    #[test]
    fn bad_descriptors() {
        check(Errno::EBADF, || unsafe { _write(5, core::ptr::null(), 0) });
        check(Errno::EBADF, || _close(0));
        check(Errno::EFAULT, || unsafe { _write(1, core::ptr::null(), 4) });
    }

    #[test]
    fn fixed_error_codes() {
        check(Errno::ENOSYS, || unsafe { _open(c"f".as_ptr(), 0, 0) });
        check(Errno::ENOSYS, || unsafe {
            _read(0, [0u8; 8].as_mut_ptr().cast(), 8)
        });
        check(Errno::EAGAIN, || _fork());
        check(Errno::ENOMEM, || unsafe {
            _execve(c"/bin/sh".as_ptr(), core::ptr::null(), core::ptr::null())
        });
        check(Errno::EINVAL, || _kill(1, 15));
        check(Errno::EMLINK, || unsafe {
            _link(c"a".as_ptr(), core::ptr::null())
        });
        check(Errno::ENOENT, || unsafe { _unlink(core::ptr::null()) });
        check(Errno::ECHILD, || _wait(core::ptr::null_mut()));
        check(Errno::ENOSYS, || _times(core::ptr::null_mut()));
    }

    #[test]
    fn failures_are_traced() {
        let _g = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(_kill(1, 9), -1);
        assert_eq!(
            last_trace(),
            Some(Trace::Syscall {
                call: Call::Kill,
                errno: Errno::EINVAL
            })
        );
    }

    #[test]
    fn successes_leave_errno_alone() {
        let _g = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        ERROR_STATE.set(Errno::EIO);
        assert_eq!(_isatty(-5), 1);
        assert_eq!(_isatty(1), 1);
        assert_eq!(_getpid(), 1);
        assert_eq!(_getpid(), _getpid());
        assert_eq!(_lseek(1, 42, 2), 0);
        assert_eq!(ERROR_STATE.last(), Some(Errno::EIO));
    }

    /// A stand-in for newlib's `struct stat`, which is longer than the
    /// prefix we describe.
    #[repr(C)]
    struct FullStat {
        prefix: Stat,
        rest: [u32; 14],
    }

    #[test]
    fn stat_reports_char_device() {
        let mut st = FullStat {
            prefix: Stat {
                st_dev: 3,
                st_ino: 4,
                st_mode: 0,
            },
            rest: [0xAAAA_AAAA; 14],
        };
        let p = core::ptr::addr_of_mut!(st).cast::<Stat>();
        assert_eq!(unsafe { _fstat(1, p) }, 0);
        assert_eq!(st.prefix.st_mode, S_IFCHR);
        assert!(st.rest.iter().all(|&w| w == 0xAAAA_AAAA));

        st.prefix.st_mode = 0;
        assert_eq!(unsafe { _stat(c"/dev/tty".as_ptr(), p) }, 0);
        assert!(st.prefix.is_char_device());
    }

    #[test]
    fn stat_into_null_is_efault() {
        check(Errno::EFAULT, || unsafe { _fstat(1, core::ptr::null_mut()) });
        check(Errno::EFAULT, || unsafe {
            _stat(c"x".as_ptr(), core::ptr::null_mut())
        });
    }

    #[cfg(not(feature = "heap"))]
    #[test]
    fn sbrk_without_heap() {
        let _g = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        ERROR_STATE.set(Errno::EIO);
        assert_eq!(_sbrk(32) as usize, usize::MAX);
        assert_eq!(ERROR_STATE.last(), Some(Errno::ENOMEM));
    }
}
