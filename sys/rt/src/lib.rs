// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bare-metal runtime for TM4C123 (Cortex-M4F) parts.
//!
//! This is the code that stands between the silicon and the application: the
//! vector table that the CPU reads at reset and on every exception, the reset
//! sequence that prepares RAM before any other code runs, and the handlers
//! that catch exceptions nobody asked to handle.
//!
//! # Using it
//!
//! An image links against `link.x` (see `.cargo/config.toml`), supplies a C
//! ABI `main`, and instantiates the vector table once:
//!
//! ```ignore
//! struct Board;
//!
//! impl tm4c_rt::Handlers for Board {
//!     const GPIO_PORT_F: tm4c_rt::Vector = tm4c_rt::Vector::handler(buttons);
//! }
//!
//! tm4c_rt::vector_table!(Board);
//!
//! #[no_mangle]
//! pub extern "C" fn main() -> i32 {
//!     // ...
//! }
//! ```
//!
//! Any slot the application doesn't name resolves to [`DefaultHandler`],
//! which halts. The table is assembled at compile time, so there is no
//! registration step and no indirection on interrupt entry.
//!
//! # Design principles
//!
//! 1. Nothing is recoverable. There's no supervisor to recover to, so every
//!    unexpected event parks the CPU in [`halt`] where a debugger or watchdog
//!    can find it.
//! 2. Leave evidence. Fault registers, the panic message and a short trace of
//!    the boot sequence are kept in RAM under well-known symbol names.
//! 3. As much as possible is fixed at build time: the memory map comes from
//!    the board configuration, the table layout from the interrupt map.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
pub mod trace;

pub mod arch;
pub mod fail;
pub mod handlers;
pub mod startup;
pub mod vectors;

/// Memory map and table geometry, generated from the board configuration.
pub mod consts {
    include!(concat!(env!("OUT_DIR"), "/consts.rs"));
}

pub use fail::{halt, trap};
pub use handlers::{DefaultHandler, HardFault, NoOpHandler, NonMaskableInt};
pub use startup::{MemoryRegions, RamInit, Reset};
pub use vectors::{
    vector_table, Exception, Handlers, Interrupt, Vector, VectorTable,
};
