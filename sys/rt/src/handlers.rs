// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exception handlers supplied by the runtime.
//!
//! All but one of these halt. There is nothing above us to report to, and
//! returning from an interrupt whose source was never acknowledged would
//! just take the same interrupt again. What they do first is leave a note for
//! whoever attaches a debugger:
//!
//! - `tm4c_rt::handlers::LAST_UNHANDLED` holds the exception number (as read
//!   from IPSR) that reached [`DefaultHandler`]. Subtract 16 for the IRQ.
//! - `tm4c_rt::handlers::FAULT_RECORD` holds the fault status registers as
//!   they were on entry to [`HardFault`], which also writes a one-line
//!   summary of them to the epitaph.

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;

use crate::{arch, fail};

bitflags::bitflags! {
    /// Bits in the Configurable Fault Status Register.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct Cfsr: u32 {
        // Bits 0-7: MMFSR (Memory Management Fault Status Register)
        const IACCVIOL = 1 << 0;
        const DACCVIOL = 1 << 1;
        // MMFSR bit 2 reserved
        const MUNSTKERR = 1 << 3;
        const MSTKERR = 1 << 4;
        const MLSPERR = 1 << 5;
        // MMFSR bit 6 reserved
        const MMARVALID = 1 << 7;

        // Bits 8-15: BFSR (Bus Fault Status Register)
        const IBUSERR = 1 << (8 + 0);
        const PRECISERR = 1 << (8 + 1);
        const IMPRECISERR = 1 << (8 + 2);
        const UNSTKERR = 1 << (8 + 3);
        const STKERR = 1 << (8 + 4);
        const LSPERR = 1 << (8 + 5);
        // BFSR bit 6 reserved
        const BFARVALID = 1 << (8 + 7);

        // Bits 16-31: UFSR (Usage Fault Status Register)
        const UNDEFINSTR = 1 << (16 + 0);
        const INVSTATE = 1 << (16 + 1);
        const INVPC = 1 << (16 + 2);
        const NOCP = 1 << (16 + 3);
        // UFSR bits 4-7 reserved
        const UNALIGNED = 1 << (16 + 8);
        const DIVBYZERO = 1 << (16 + 9);
        // UFSR bits 10-31 reserved
    }
}

bitflags::bitflags! {
    /// Bits in the HardFault Status Register.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct Hfsr: u32 {
        /// The fault happened reading the vector table.
        const VECTTBL = 1 << 1;
        /// A configurable fault was escalated because its handler was
        /// disabled or couldn't run.
        const FORCED = 1 << 30;
        const DEBUGEVT = 1 << 31;
    }
}

/// Fault status as it stood on entry to [`HardFault`].
///
/// All zeros means either no fault has happened or the part has no fault
/// status registers (ARMv6-M).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct FaultRecord {
    pub cfsr: u32,
    pub hfsr: u32,
    pub mmfar: u32,
    pub bfar: u32,
}

/// Rough classification of a [`FaultRecord`], for humans.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultCause {
    VectorRead,
    MemoryManagement,
    Bus,
    Usage,
    /// HFSR says something was escalated, but CFSR doesn't say what.
    Escalated,
    Unknown,
}

impl FaultRecord {
    const ZERO: Self = Self {
        cfsr: 0,
        hfsr: 0,
        mmfar: 0,
        bfar: 0,
    };

    pub fn cfsr(&self) -> Cfsr {
        Cfsr::from_bits_truncate(self.cfsr)
    }

    pub fn hfsr(&self) -> Hfsr {
        Hfsr::from_bits_truncate(self.hfsr)
    }

    pub fn cause(&self) -> FaultCause {
        // The CFSR subregisters are one byte (MMFSR, BFSR) and a halfword
        // (UFSR) wide.
        let cfsr = self.cfsr;
        if self.hfsr().contains(Hfsr::VECTTBL) {
            FaultCause::VectorRead
        } else if cfsr & 0xFF != 0 {
            FaultCause::MemoryManagement
        } else if cfsr & 0xFF00 != 0 {
            FaultCause::Bus
        } else if cfsr & 0xFFFF_0000 != 0 {
            FaultCause::Usage
        } else if self.hfsr().contains(Hfsr::FORCED) {
            FaultCause::Escalated
        } else {
            FaultCause::Unknown
        }
    }

    /// The faulting data address, if the hardware captured one.
    pub fn fault_address(&self) -> Option<u32> {
        let cfsr = self.cfsr();
        if cfsr.contains(Cfsr::MMARVALID) {
            Some(self.mmfar)
        } else if cfsr.contains(Cfsr::BFARVALID) {
            Some(self.bfar)
        } else {
            None
        }
    }
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hard fault: {:?}", self.cause())?;
        if let Some(addr) = self.fault_address() {
            write!(f, " at {addr:#010x}")?;
        }
        write!(f, " (cfsr={:#010x} hfsr={:#010x})", self.cfsr, self.hfsr)
    }
}

#[used]
pub static FAULT_RECORD: Mutex<Cell<FaultRecord>> =
    Mutex::new(Cell::new(FaultRecord::ZERO));

#[used]
pub static LAST_UNHANDLED: AtomicU32 = AtomicU32::new(0);

/// Handler for every slot the application didn't claim.
///
/// # Safety
///
/// Only meant to be entered by the hardware through the vector table.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn DefaultHandler() -> ! {
    LAST_UNHANDLED.store(arch::active_exception(), Ordering::Relaxed);
    fail::halt()
}

/// Handler for the non-maskable interrupt. There's nothing to acknowledge
/// it with generically, so it halts like the rest.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn NonMaskableInt() -> ! {
    LAST_UNHANDLED.store(arch::active_exception(), Ordering::Relaxed);
    fail::halt()
}

#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn HardFault() -> ! {
    let record = arch::fault_status();
    critical_section::with(|cs| FAULT_RECORD.borrow(cs).set(record));
    fail::die(record)
}

/// Default for the slots that are extension points rather than errors
/// (SVCall, PendSV, SysTick). Returns straight away.
#[cfg_attr(target_os = "none", no_mangle)]
pub unsafe extern "C" fn NoOpHandler() {}
