// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Terminal states, and the evidence left behind on the way into them.
//!
//! This module defines the following binary interface to debuggers:
//!
//! - `tm4c_rt::fail::RT_HAS_FAILED` is a `bool`. It's zero (false) in the
//!   loaded image, since it lives in `.bss`, and is set to one (true) when a
//!   panic reaches [`die`]. Any other value means RAM was never initialized or
//!   got trampled on the way down.
//!
//! - `tm4c_rt::fail::RT_EPITAPH` is an array of `u8`. [`die`] writes as much of
//!   the failure reason into it (as UTF-8) as fits, and the rest stays NUL. To
//!   print it, trim trailing NULs.
//!
//! Both of those are written at most once per boot.

use core::fmt::{Display, Write};
use core::sync::atomic::{self, Ordering};

use crate::arch;

/// Set by all failure reporting paths.
#[used]
pub static mut RT_HAS_FAILED: bool = false;

pub const EPITAPH_LEN: usize = 128;

/// Up to `EPITAPH_LEN` bytes of description of what went wrong, padded with
/// NULs.
#[cfg(feature = "panic-epitaph")]
#[used]
pub static mut RT_EPITAPH: [u8; EPITAPH_LEN] = [0; EPITAPH_LEN];

/// Parks the CPU forever.
///
/// Interrupts are left as they are: an exception that preempts the loop is
/// serviced and execution returns here. A watchdog, if the application armed
/// one, will eventually reset the part.
pub fn halt() -> ! {
    loop {
        // Platform-independent NOP that the optimizer can't fold away.
        atomic::fence(Ordering::SeqCst);
    }
}

/// Hands control to an attached debugger, then halts.
///
/// This is what process exit looks like when there's no process: the
/// debugger sees the breakpoint, and without one the CPU ends up parked in
/// [`HardFault`](crate::HardFault) instead.
pub fn trap() -> ! {
    arch::breakpoint();
    halt()
}

/// Flags the failure, returning `false` if it was already flagged.
fn mark_failed() -> bool {
    // Not an AtomicBool, so this stays usable from ARMv6-M.
    //
    // Safety: the flag is a plain byte; a torn write isn't possible, and the
    // only writers are on the way into `halt`.
    let previous = unsafe {
        core::ptr::replace(core::ptr::addr_of_mut!(RT_HAS_FAILED), true)
    };
    !previous
}

/// Records `msg` as the epitaph and halts.
#[inline(always)]
pub fn die(msg: impl Display) -> ! {
    die_impl(&msg)
}

#[inline(never)]
fn die_impl(msg: &dyn Display) -> ! {
    if !mark_failed() {
        // Recursive failure. Whatever's in the epitaph is the better story.
        halt();
    }

    #[cfg(feature = "panic-epitaph")]
    {
        // Safety: only the caller that flipped the flag gets here, so this is
        // the only reference that will ever exist.
        let buf = unsafe { &mut *core::ptr::addr_of_mut!(RT_EPITAPH) };
        write!(Epitaph::new(buf), "{msg}").ok();
    }
    #[cfg(not(feature = "panic-epitaph"))]
    let _ = msg;

    halt()
}

/// A `fmt::Write` that fills a byte buffer and silently drops whatever
/// doesn't fit.
pub struct Epitaph<'a> {
    dest: &'a mut [u8],
}

impl<'a> Epitaph<'a> {
    pub fn new(dest: &'a mut [u8]) -> Self {
        Self { dest }
    }
}

impl Write for Epitaph<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let s = s.as_bytes();
        let n = s.len().min(self.dest.len());
        let (dest, leftovers) = core::mem::take(&mut self.dest).split_at_mut(n);
        dest.copy_from_slice(&s[..n]);
        self.dest = leftovers;
        Ok(())
    }
}

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    die(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epitaph_fills_in_order() {
        let mut buf = [0u8; 16];
        let mut e = Epitaph::new(&mut buf);
        write!(e, "abc").unwrap();
        write!(e, "{}", 42).unwrap();
        assert_eq!(&buf[..6], b"abc42\0");
    }

    #[test]
    fn epitaph_truncates_without_error() {
        let mut buf = [0u8; 8];
        let mut e = Epitaph::new(&mut buf);
        assert!(write!(e, "panicked at src/main.rs:12:5").is_ok());
        assert!(write!(e, "more").is_ok());
        assert_eq!(&buf, b"panicked");
    }

    #[test]
    fn halt_never_returns() {
        // Checked by the type system; a `-> ()` function wouldn't coerce.
        let _: fn() -> ! = halt;
        let _: fn() -> ! = trap;
    }
}
