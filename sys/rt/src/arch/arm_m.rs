// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture support for ARMv{6,7,8}-M.
//!
//! The TM4C123 is an ARMv7E-M part, but nothing in here depends on that beyond
//! the fault status registers, which ARMv6-M doesn't have, and the FPU, which
//! only hard-float builds (`cfg(has_fpu)`) switch on.

use core::arch;
use core::ptr::{addr_of, addr_of_mut};

use crate::handlers::FaultRecord;
use crate::startup::MemoryRegions;

// Boundary symbols from link.x. These are never read as values, only used for
// their addresses.
extern "C" {
    static __sidata: u32;
    static mut __sdata: u32;
    static mut __edata: u32;
    static mut __sbss: u32;
    static mut __ebss: u32;
}

// Provided by the application, in whatever language it's written in.
extern "C" {
    fn main() -> i32;
}

extern "C" {
    /// The reset handler, defined in assembly below.
    pub fn Reset() -> !;
}

/// Coprocessor Access Control Register.
const CPACR: u32 = 0xE000_ED88;

/// Full access to CP10 and CP11, which together are the FPU. Zero on targets
/// that don't use it, which skips the CPACR write entirely.
#[cfg(has_fpu)]
const FPU_ACCESS: u32 = 0b1111 << 20;
#[cfg(not(has_fpu))]
const FPU_ACCESS: u32 = 0;

// Reset has to prepare RAM before any Rust code runs, since compiled code is
// free to assume that statics already hold their initial values. So the first
// half of it is assembly: enable the FPU if this is a hard-float build, copy
// .data, zero .bss, then call into Rust.
//
// The instructions are all ones ARMv6-M has, too.
arch::global_asm!(
    ".section .text.Reset, \"ax\", %progbits",
    ".global Reset",
    ".type Reset, %function",
    ".thumb_func",
    "Reset:",
    "
    @ Grant access to the FPU, if we have one to grant. Hard-float code
    @ traps with NOCP on its first FP instruction otherwise.

    ldr r2, ={fpu_access}
    cmp r2, #0
    beq 3f
    ldr r0, ={cpacr}
    ldr r1, [r0]
    orrs r1, r2
    str r1, [r0]
    dsb
    isb
3:
    @ Copy data initialization image into data section.
    @ Note: this assumes that both source and destination are 32-bit
    @ aligned and padded to 4-byte boundary.

    ldr r0, =__edata            @ upper bound in r0
    ldr r1, =__sidata           @ source in r1
    ldr r2, =__sdata            @ dest in r2

    b 1f                        @ check for zero-sized data

2:  ldm r1!, {{r3}}             @ read and advance source
    stm r2!, {{r3}}             @ write and advance dest

1:  cmp r2, r0                  @ has dest reached the upper bound?
    bne 2b                      @ if not, repeat

    @ Zero BSS section.

    ldr r0, =__ebss             @ upper bound in r0
    ldr r1, =__sbss             @ base in r1

    movs r2, #0                 @ materialize a zero

    b 1f                        @ check for zero-sized BSS

2:  stm r1!, {{r2}}             @ zero one word and advance

1:  cmp r1, r0                  @ has base reached bound?
    bne 2b                      @ if not, repeat

    @ Make sure those stores are visible before anything reads them.

    dsb
    isb

    @ On to Rust, which never comes back.
    bl {start}
    udf #0
    ",
    ".ltorg",
    ".size Reset, . - Reset",
    fpu_access = const FPU_ACCESS,
    cpacr = const CPACR,
    start = sym crate::startup::start,
);

/// Collects the data and bss boundaries placed by link.x.
pub fn linker_regions() -> MemoryRegions {
    // Safety: only the addresses of these symbols are taken. Nothing is read or
    // written through them here.
    unsafe {
        MemoryRegions {
            data_image: addr_of!(__sidata),
            data: addr_of_mut!(__sdata)..addr_of_mut!(__edata),
            bss: addr_of_mut!(__sbss)..addr_of_mut!(__ebss),
        }
    }
}

/// Transfers control to the application entry point.
///
/// # Safety
///
/// RAM must have been initialized, and this must only happen once per boot.
pub unsafe fn call_main() -> i32 {
    // Safety: per our own contract.
    unsafe { main() }
}

/// Returns the number of the exception currently being handled, from the
/// bottom 9 bits of IPSR. Zero means thread mode.
pub fn active_exception() -> u32 {
    // Safety: we're just reading the PSR.
    let ipsr: u32 = unsafe {
        let mut ipsr: u32;
        arch::asm!(
            "mrs {}, IPSR",
            out(reg) ipsr,
            options(pure, nomem, preserves_flags, nostack),
        );
        ipsr
    };
    ipsr & 0x1FF
}

/// Snapshots the configurable fault status registers.
#[cfg(not(armv6m))]
pub fn fault_status() -> FaultRecord {
    // Safety: this is dereferencing the raw pointer produced by SCB::PTR,
    // which is valid for the life of the program. We only read through the
    // resulting shared reference.
    let scb = unsafe { &*cortex_m::peripheral::SCB::PTR };
    FaultRecord {
        cfsr: scb.cfsr.read(),
        hfsr: scb.hfsr.read(),
        mmfar: scb.mmfar.read(),
        bfar: scb.bfar.read(),
    }
}

/// ARMv6-M has no fault status registers; all we know is that something
/// faulted.
#[cfg(armv6m)]
pub fn fault_status() -> FaultRecord {
    FaultRecord::default()
}

/// Stops at a breakpoint if a debugger is attached. Without one, the
/// breakpoint escalates to HardFault.
pub fn breakpoint() {
    cortex_m::asm::bkpt();
}
