// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static trace buffers for post-mortem debugging.
//!
//! There is no console this early in boot, and there may never be one, so the
//! runtime leaves breadcrumbs in small ring buffers instead. A debugger can
//! print them by symbol name:
//!
//! ```console
//! (gdb) set print pretty on
//! (gdb) print tm4c_rt::startup::RT_TRACE
//! ```
//!
//! Buffers are declared with [`trace_buf!`] and appended to with [`trace!`].
//! An entry identical to the most recent one (same source line and payload)
//! bumps that entry's `count` instead of taking a new slot, so a tight loop
//! doesn't wash out the history.
//!
//! Recording never fails loudly. If the buffer is already being written (an
//! exception arrived in the middle of a `trace!` and traced into the same
//! buffer) the nested entry is dropped.

use core::cell::RefCell;

/// One slot of a [`Ring`].
#[derive(Debug, Copy, Clone)]
pub struct Entry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

/// A fixed-size ring of trace entries. Usually reached through [`trace_buf!`]
/// rather than built by hand.
#[derive(Debug)]
pub struct Ring<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [Entry<T>; N],
}

/// What [`trace_buf!`] actually declares.
pub type TraceBuf<T, const N: usize> =
    critical_section::Mutex<RefCell<Ring<T, N>>>;

impl<T: Copy + PartialEq, const N: usize> Ring<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [Entry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // None is treated as an out-of-range index so the first entry lands in
        // slot 0 and is never merged.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // Cortex-M4 has a divider but M0 doesn't; compare instead of `%`.
        let ndx = {
            let next = last.wrapping_add(1);
            if next >= self.buffer.len() {
                0
            } else {
                next
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = Entry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };
        self.last = Some(ndx);
    }

    /// The most recently recorded entry, if any.
    pub fn latest(&self) -> Option<&Entry<T>> {
        self.last.and_then(|i| self.buffer.get(i))
    }
}

/// Appends to `buf`, or silently drops the entry if `buf` is busy.
pub fn record<T: Copy + PartialEq, const N: usize>(
    buf: &TraceBuf<T, N>,
    line: u16,
    payload: T,
) {
    critical_section::with(|cs| {
        if let Ok(mut ring) = buf.borrow(cs).try_borrow_mut() {
            ring.entry(line, payload);
        }
    });
}

/// Declares a static trace buffer.
///
/// `trace_buf!(NAME, Type, N, init)` makes a static named `NAME` holding `N`
/// entries of `Type`, each initialized to `init`.
#[macro_export]
macro_rules! trace_buf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        pub static $name: $crate::trace::TraceBuf<$t, $n> =
            $crate::trace::TraceBuf::new(::core::cell::RefCell::new(
                $crate::trace::Ring::new($init),
            ));
    };
}

/// Records `payload` in the trace buffer `buf`, tagged with the current line.
#[macro_export]
macro_rules! trace {
    ($buf:expr, $payload:expr) => {{
        let (p, buf) = ($payload, &$buf);
        $crate::trace::record(buf, line!() as u16, p);
    }};
}
