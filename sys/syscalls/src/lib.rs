// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! System calls for newlib on a machine with nothing underneath.
//!
//! newlib's portable code bottoms out in a handful of functions (`_write`,
//! `_sbrk`, `_fstat` and friends) that it expects an operating system to
//! provide. There isn't one, so this crate provides them: a few succeed
//! with harmless answers, and the rest fail with the error a POSIX system
//! would give for a facility that doesn't exist.
//!
//! There are two layers. [`ops`] is the Rust interface, with every fallible
//! call returning `Result<_, Errno>`. [`c_abi`] wraps it in the symbols
//! newlib links against, translating `Err` into the C convention of a `-1`
//! return plus a code in `errno` ([`ERROR_STATE`]).
//!
//! Failed calls are also recorded in [`SYSCALL_TRACE`], for debugging.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
extern crate tm4c_rt;

pub mod c_abi;
mod console;
pub mod env;
pub mod errno;
pub mod heap;
pub mod ops;

pub use errno::{ErrorState, ERROR_STATE};

/// The calls that can fail, for the trace.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Open,
    Close,
    Read,
    Write,
    Stat,
    Fstat,
    Fork,
    Execve,
    Kill,
    Link,
    Unlink,
    Times,
    Wait,
    Sbrk,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trace {
    None,
    Syscall { call: Call, errno: abi::Errno },
}

trace_buf!(SYSCALL_TRACE, Trace, 16, Trace::None);
