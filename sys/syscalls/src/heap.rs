// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The program break, which is where newlib's `malloc` gets its memory.
//!
//! The heap is the RAM between the end of the statics (`__sheap` in link.x)
//! and the bottom of the stack reservation (`HEAP_LIMIT`). The break only
//! ever moves up: newlib never gives memory back this way, and refusing a
//! shrink keeps the bookkeeping to a single word.
//!
//! Without the `heap` feature there is no heap, and every request fails.

use abi::Errno;

/// A bump pointer with a ceiling.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProgramBreak {
    current: usize,
    limit: usize,
}

impl ProgramBreak {
    pub const fn new(base: usize, limit: usize) -> Self {
        Self {
            current: base,
            limit,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Moves the break up by `increment` bytes, returning where it was.
    ///
    /// A zero increment is a query. A negative one is refused with `EINVAL`,
    /// and one that would cross the limit with `ENOMEM`; either way the break
    /// stays put.
    pub fn extend(&mut self, increment: isize) -> Result<usize, Errno> {
        let increment =
            usize::try_from(increment).map_err(|_| Errno::EINVAL)?;
        let next = self
            .current
            .checked_add(increment)
            .filter(|&next| next <= self.limit)
            .ok_or(Errno::ENOMEM)?;
        Ok(core::mem::replace(&mut self.current, next))
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "heap")] {
        use core::cell::RefCell;
        use critical_section::Mutex;

        // Starts out empty and is set up on first use, since the base comes
        // from a linker symbol that can't be read at compile time.
        static BREAK: Mutex<RefCell<Option<ProgramBreak>>> =
            Mutex::new(RefCell::new(None));

        pub fn sbrk(increment: isize) -> Result<*mut u8, Errno> {
            critical_section::with(|cs| {
                let mut brk = BREAK.borrow_ref_mut(cs);
                let brk = brk.get_or_insert_with(image_break);
                brk.extend(increment).map(|prev| prev as *mut u8)
            })
        }

        #[cfg(target_os = "none")]
        fn image_break() -> ProgramBreak {
            extern "C" {
                static __sheap: u8;
            }
            // Safety: only the address is taken.
            let base = unsafe { core::ptr::addr_of!(__sheap) } as usize;
            ProgramBreak::new(base, tm4c_rt::consts::HEAP_LIMIT)
        }

        #[cfg(not(target_os = "none"))]
        fn image_break() -> ProgramBreak {
            const ARENA_LEN: usize = 4096;
            static mut ARENA: [u8; ARENA_LEN] = [0; ARENA_LEN];
            let base = core::ptr::addr_of_mut!(ARENA) as usize;
            ProgramBreak::new(base, base + ARENA_LEN)
        }
    } else {
        pub fn sbrk(_increment: isize) -> Result<*mut u8, Errno> {
            Err(Errno::ENOMEM)
        }
    }
}
