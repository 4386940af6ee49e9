// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::handlers::FaultRecord;
use crate::startup::{self, MemoryRegions};

pub fn linker_regions() -> MemoryRegions {
    panic!("no linker image on the host");
}

pub unsafe fn call_main() -> i32 {
    panic!("no application entry point on the host");
}

/// Stand-in for the assembly reset handler, doing the same steps in the same
/// order. It gets no further than `linker_regions` on the host.
pub unsafe extern "C" fn Reset() -> ! {
    let regions = linker_regions();
    // Safety: per our contract, which is the hardware's.
    unsafe {
        startup::init_ram(&regions);
        startup::start()
    }
}

pub fn active_exception() -> u32 {
    0
}

pub fn fault_status() -> FaultRecord {
    FaultRecord::default()
}

pub fn breakpoint() {}
