// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reset sequence.
//!
//! Nothing in RAM can be trusted when [`Reset`] starts: `.data` holds
//! whatever the SRAM powered up with and `.bss` is not guaranteed to be
//! zero. Compiled code is allowed to assume otherwise, so on the target the
//! first half of `Reset` is assembly (see `arch::arm_m`) that prepares RAM
//! before entering `start`. [`init_ram`] is the same word loop, for the host.

use core::ops::Range;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::{arch, fail};

pub use crate::arch::Reset;

/// Where the initialized and zero-initialized statics live.
///
/// All pointers are word-aligned, and each range has `start <= end`. link.x
/// guarantees both for the real image.
#[derive(Clone, Debug)]
pub struct MemoryRegions {
    /// The initializer image for `.data`, in flash.
    pub data_image: *const u32,
    /// `.data`, in RAM.
    pub data: Range<*mut u32>,
    /// `.bss`, in RAM.
    pub bss: Range<*mut u32>,
}

impl MemoryRegions {
    /// The regions of the running image, as placed by link.x.
    pub fn from_linker() -> Self {
        arch::linker_regions()
    }

    pub fn data_words(&self) -> usize {
        words_in(&self.data)
    }

    pub fn bss_words(&self) -> usize {
        words_in(&self.bss)
    }

    /// The sizes a RAM initialization pass over these regions covers.
    pub fn extent(&self) -> RamInit {
        RamInit {
            data_words: self.data_words(),
            bss_words: self.bss_words(),
        }
    }
}

fn words_in(r: &Range<*mut u32>) -> usize {
    (r.end as usize).saturating_sub(r.start as usize) / core::mem::size_of::<u32>()
}

/// How much RAM initialization covered.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RamInit {
    pub data_words: usize,
    pub bss_words: usize,
}

/// Copies the `.data` image into RAM, then zeroes `.bss`, one word at a time.
///
/// # Safety
///
/// `regions` must describe memory that is valid for the whole copy and the
/// whole fill, `data` must not overlap the image, and nothing else may be
/// using either region.
pub unsafe fn init_ram(regions: &MemoryRegions) -> RamInit {
    let mut src = regions.data_image;
    let mut dest = regions.data.start;
    while dest < regions.data.end {
        // Safety: per our contract, both stay within their regions.
        unsafe {
            dest.write_volatile(src.read());
            dest = dest.add(1);
            src = src.add(1);
        }
    }

    let mut dest = regions.bss.start;
    while dest < regions.bss.end {
        // Safety: per our contract.
        unsafe {
            dest.write_volatile(0);
            dest = dest.add(1);
        }
    }

    // Do *not* reorder any accesses to statics above this point.
    compiler_fence(Ordering::SeqCst);

    regions.extent()
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trace {
    None,
    DataCopied { words: usize },
    BssZeroed { words: usize },
    EnterMain,
    MainReturned(i32),
}

trace_buf!(RT_TRACE, Trace, 8, Trace::None);

/// The sequence after RAM preparation: `prepare` reports (or, on the host,
/// performs) it, then `entry` runs exactly once. Returns what `entry`
/// returned.
pub fn boot(
    prepare: impl FnOnce() -> RamInit,
    entry: impl FnOnce() -> i32,
) -> i32 {
    let init = prepare();

    // The trace buffer is itself a static, so these can only come now.
    trace!(RT_TRACE, Trace::DataCopied { words: init.data_words });
    trace!(RT_TRACE, Trace::BssZeroed { words: init.bss_words });
    trace!(RT_TRACE, Trace::EnterMain);

    let code = entry();

    trace!(RT_TRACE, Trace::MainReturned(code));
    code
}

/// The Rust half of [`Reset`], entered with RAM already prepared.
///
/// Calls the application's `main`, and halts if it ever returns. Its return
/// value has nowhere to go; it's kept in the trace.
///
/// # Safety
///
/// Only to be entered from `Reset`, once.
pub(crate) unsafe extern "C" fn start() -> ! {
    let regions = MemoryRegions::from_linker();
    boot(
        || regions.extent(),
        // Safety: RAM is initialized, and we never come back here.
        || unsafe { arch::call_main() },
    );
    fail::halt()
}
