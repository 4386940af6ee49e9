// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The system calls, as Rust.
//!
//! Each of these answers the way a POSIX system would if it had no
//! filesystem, no other processes and no clock. None of them block, allocate
//! or retry, and none of them touch `errno`; that's the C wrappers' job.

use core::convert::Infallible;
use core::ffi::CStr;

use abi::{Errno, FileDesc, Pid, Stat, S_IFCHR};

use crate::{console, heap};

/// Ends the program. There's no process to return to, so this traps into
/// the debugger and then halts.
pub fn exit(_status: i32) -> ! {
    tm4c_rt::trap()
}

/// There are no files to open.
pub fn open(
    _path: Option<&CStr>,
    _flags: i32,
    _mode: i32,
) -> Result<FileDesc, Errno> {
    Err(Errno::ENOSYS)
}

/// Nothing was ever opened, and the standard streams can't be closed.
pub fn close(_fd: FileDesc) -> Result<(), Errno> {
    Err(Errno::EBADF)
}

/// There's no input device.
pub fn read(_fd: FileDesc, _buf: &mut [u8]) -> Result<usize, Errno> {
    Err(Errno::ENOSYS)
}

/// Writes to stdout or stderr, if a console transport is configured.
pub fn write(fd: FileDesc, buf: &[u8]) -> Result<usize, Errno> {
    if fd.is_output_stream() {
        console::write(fd, buf)
    } else {
        Err(Errno::EBADF)
    }
}

/// Every stream is permanently at offset zero.
pub fn lseek(_fd: FileDesc, _offset: i32, _whence: i32) -> Result<i32, Errno> {
    Ok(0)
}

/// Everything is a character device. newlib only asks so it can pick a
/// buffering mode, and this one gets output out promptly.
pub fn fstat(_fd: FileDesc) -> Result<Stat, Errno> {
    Ok(char_device())
}

pub fn stat(_path: Option<&CStr>) -> Result<Stat, Errno> {
    Ok(char_device())
}

fn char_device() -> Stat {
    Stat {
        st_mode: S_IFCHR,
        ..Stat::default()
    }
}

pub fn isatty(_fd: FileDesc) -> bool {
    true
}

pub fn fork() -> Result<Pid, Errno> {
    Err(Errno::EAGAIN)
}

/// Would replace the running program. On success this doesn't return, hence
/// the uninhabited `Ok` type.
pub fn execve(_path: Option<&CStr>) -> Result<Infallible, Errno> {
    Err(Errno::ENOMEM)
}

pub fn getpid() -> Pid {
    Pid::SELF
}

pub fn kill(_pid: Pid, _sig: i32) -> Result<(), Errno> {
    Err(Errno::EINVAL)
}

pub fn link(
    _existing: Option<&CStr>,
    _new: Option<&CStr>,
) -> Result<(), Errno> {
    Err(Errno::EMLINK)
}

pub fn unlink(_path: Option<&CStr>) -> Result<(), Errno> {
    Err(Errno::ENOENT)
}

/// Reaps a child. There are never any.
pub fn wait() -> Result<Pid, Errno> {
    Err(Errno::ECHILD)
}

/// Would report process times in clock ticks, but there's no tick source.
pub fn times() -> Result<u32, Errno> {
    Err(Errno::ENOSYS)
}

/// Grows the heap by `increment` bytes, returning the old break.
pub fn sbrk(increment: isize) -> Result<*mut u8, Errno> {
    heap::sbrk(increment)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FDS: [FileDesc; 5] = [
        FileDesc::STDIN,
        FileDesc::STDOUT,
        FileDesc::STDERR,
        FileDesc(3),
        FileDesc(-1),
    ];

    #[test]
    fn file_ops_fail() {
        assert_eq!(open(Some(c"/etc/passwd"), 0, 0), Err(Errno::ENOSYS));
        assert_eq!(open(None, 0, 0), Err(Errno::ENOSYS));
        for fd in FDS {
            assert_eq!(close(fd), Err(Errno::EBADF));
            assert_eq!(read(fd, &mut [0; 4]), Err(Errno::ENOSYS));
        }
    }

    #[cfg(not(feature = "semihosting"))]
    #[test]
    fn writes_fail_without_a_transport() {
        assert_eq!(write(FileDesc::STDOUT, b"hi\n"), Err(Errno::EBADF));
        assert_eq!(write(FileDesc::STDERR, b"hi\n"), Err(Errno::EBADF));
    }

    #[test]
    fn writes_to_other_descriptors_are_bad() {
        assert_eq!(write(FileDesc::STDIN, b"x"), Err(Errno::EBADF));
        assert_eq!(write(FileDesc(7), b"x"), Err(Errno::EBADF));
        assert_eq!(write(FileDesc(-1), b""), Err(Errno::EBADF));
    }

    #[test]
    fn everything_is_a_terminal() {
        for fd in FDS {
            assert!(isatty(fd));
            assert!(fstat(fd).unwrap().is_char_device());
            assert_eq!(lseek(fd, 100, 0), Ok(0));
        }
        assert!(stat(Some(c"anything")).unwrap().is_char_device());
        assert!(stat(None).unwrap().is_char_device());
    }

    #[test]
    fn process_ops_fail_with_fixed_codes() {
        assert_eq!(fork(), Err(Errno::EAGAIN));
        assert_eq!(execve(Some(c"/bin/sh")).unwrap_err(), Errno::ENOMEM);
        assert_eq!(kill(Pid::SELF, 9), Err(Errno::EINVAL));
        assert_eq!(kill(Pid(0), 0), Err(Errno::EINVAL));
        assert_eq!(link(Some(c"a"), Some(c"b")), Err(Errno::EMLINK));
        assert_eq!(unlink(Some(c"a")), Err(Errno::ENOENT));
        assert_eq!(wait(), Err(Errno::ECHILD));
        assert_eq!(times(), Err(Errno::ENOSYS));
    }

    #[test]
    fn one_process() {
        assert_eq!(getpid(), Pid(1));
        assert_eq!(getpid(), getpid());
    }

    #[test]
    fn exit_never_returns() {
        let _: fn(i32) -> ! = exit;
    }
}
