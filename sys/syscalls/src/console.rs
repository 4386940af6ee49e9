// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Where stdout and stderr go.

use abi::{Errno, FileDesc};

#[cfg(any(test, all(feature = "semihosting", target_arch = "arm")))]
use core::cell::RefCell;
#[cfg(any(test, all(feature = "semihosting", target_arch = "arm")))]
use critical_section::Mutex;

/// A host stream that is opened on first use and kept open after that.
///
/// Opening one costs a round trip to the debugger, which is too much to pay
/// on every `write`. A failed open is not remembered; the next write tries
/// again.
#[cfg(any(test, all(feature = "semihosting", target_arch = "arm")))]
pub struct LazyStream<S> {
    slot: Mutex<RefCell<Option<S>>>,
}

#[cfg(any(test, all(feature = "semihosting", target_arch = "arm")))]
impl<S> LazyStream<S> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn with<R>(
        &self,
        open: impl FnOnce() -> Result<S, ()>,
        body: impl FnOnce(&mut S) -> R,
    ) -> Result<R, Errno> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            let stream = match &mut *slot {
                Some(s) => s,
                empty => empty.insert(open().map_err(|()| Errno::EIO)?),
            };
            Ok(body(stream))
        })
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "semihosting", target_arch = "arm"))] {
        use cortex_m_semihosting::hio::{self, HostStream};

        static STDOUT: LazyStream<HostStream> = LazyStream::new();
        static STDERR: LazyStream<HostStream> = LazyStream::new();

        pub fn write(fd: FileDesc, buf: &[u8]) -> Result<usize, Errno> {
            let written = if fd == FileDesc::STDERR {
                STDERR.with(hio::hstderr, |s| s.write_all(buf))
            } else {
                STDOUT.with(hio::hstdout, |s| s.write_all(buf))
            };
            written?.map_err(|()| Errno::EIO)?;
            Ok(buf.len())
        }
    } else {
        /// No transport is wired up, so the streams exist but can't be
        /// written.
        pub fn write(_fd: FileDesc, _buf: &[u8]) -> Result<usize, Errno> {
            Err(Errno::EBADF)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Fake(u32);

    #[test]
    fn opens_once_then_reuses() {
        let stream = LazyStream::<Fake>::new();
        let opens = Cell::new(0);
        let open = || {
            opens.set(opens.get() + 1);
            Ok(Fake(0))
        };

        for _ in 0..3 {
            stream.with(open, |s| s.0 += 1).unwrap();
        }

        assert_eq!(opens.get(), 1);
        assert_eq!(stream.with(open, |s| s.0), Ok(3));
    }

    #[test]
    fn failed_open_is_retried() {
        let stream = LazyStream::<Fake>::new();
        assert_eq!(stream.with(|| Err(()), |_| ()), Err(Errno::EIO));

        let opens = Cell::new(0);
        let open = || {
            opens.set(opens.get() + 1);
            Ok(Fake(7))
        };
        assert_eq!(stream.with(open, |s| s.0), Ok(7));
        assert_eq!(stream.with(open, |s| s.0), Ok(7));
        assert_eq!(opens.get(), 1);
    }

    #[test]
    fn without_transport_streams_are_bad() {
        assert_eq!(write(FileDesc::STDOUT, b"hi"), Err(Errno::EBADF));
    }
}
