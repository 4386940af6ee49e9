// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Entries in the vector table. `src/vectors.rs` checks its table type against
/// this at compile time, and link.x checks the emitted section at link time.
const VECTOR_COUNT: u32 = 155;

fn main() -> Result<()> {
    build_util::expose_m_profile()?;

    let board: BoardConfig = build_util::config_or_default()?;
    board.validate()?;

    let out = PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR not set")?);

    // Put the linker script somewhere the linker can find it
    fs::write(out.join("link.x"), include_bytes!("link.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=link.x");

    write_memory_x(&board, &out.join("memory.x"))
        .context("writing memory.x")?;
    write_consts(&board, &out.join("consts.rs")).context("writing consts.rs")?;

    Ok(())
}

/// Board description, supplied as TOML through `TM4C_RT_BOARD_CONFIG`.
///
/// ```toml
/// stack-size = 0x1000
///
/// [flash]
/// origin = 0x0000_0000
/// length = 0x0004_0000
///
/// [ram]
/// origin = 0x2000_0000
/// length = 0x0000_8000
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct BoardConfig {
    flash: Region,
    ram: Region,
    #[serde(default = "default_stack_size")]
    stack_size: u32,
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Region {
    origin: u32,
    length: u32,
}

fn default_stack_size() -> u32 {
    0x1000
}

/// The EK-TM4C123GXL LaunchPad: 256 KiB of flash, 32 KiB of SRAM.
impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            flash: Region {
                origin: 0x0000_0000,
                length: 0x0004_0000,
            },
            ram: Region {
                origin: 0x2000_0000,
                length: 0x0000_8000,
            },
            stack_size: default_stack_size(),
        }
    }
}

impl Region {
    fn end(&self) -> Result<u32> {
        self.origin
            .checked_add(self.length)
            .with_context(|| format!("region {self:x?} wraps the address space"))
    }
}

impl BoardConfig {
    fn validate(&self) -> Result<()> {
        for (name, region) in [("flash", &self.flash), ("ram", &self.ram)] {
            if region.length == 0 {
                bail!("{name} region is empty");
            }
            if region.origin % 4 != 0 || region.length % 4 != 0 {
                bail!("{name} region {region:x?} is not word-aligned");
            }
            region.end()?;
        }

        if self.flash.length < VECTOR_COUNT * 4 {
            bail!("flash is too small to hold the vector table");
        }

        // AAPCS requires 8-byte stack alignment at public interfaces, and the
        // initial stack pointer is one.
        if self.ram.end()? % 8 != 0 {
            bail!("top of RAM {:#x} is not 8-byte aligned", self.ram.end()?);
        }
        if self.stack_size % 8 != 0 {
            bail!("stack-size {:#x} is not a multiple of 8", self.stack_size);
        }
        if self.stack_size >= self.ram.length {
            bail!(
                "stack-size {:#x} leaves no RAM for statics (RAM is {:#x})",
                self.stack_size,
                self.ram.length,
            );
        }
        Ok(())
    }

    fn stack_top(&self) -> u32 {
        self.ram.origin + self.ram.length
    }

    fn heap_limit(&self) -> u32 {
        self.stack_top() - self.stack_size
    }
}

fn write_memory_x(board: &BoardConfig, path: &Path) -> Result<()> {
    let mut linkscr = File::create(path)?;
    writeln!(linkscr, "/* Generated by tm4c-rt's build.rs */")?;
    writeln!(linkscr, "MEMORY\n{{")?;
    for (name, attrs, region) in
        [("FLASH", "rx", &board.flash), ("RAM", "rwx", &board.ram)]
    {
        writeln!(
            linkscr,
            "    {name} ({attrs}) : ORIGIN = {:#010x}, LENGTH = {:#010x}",
            region.origin, region.length,
        )?;
    }
    writeln!(linkscr, "}}")?;
    writeln!(linkscr, "_stack_top = {:#010x};", board.stack_top())?;
    writeln!(linkscr, "_heap_limit = {:#010x};", board.heap_limit())?;
    Ok(())
}

fn write_consts(board: &BoardConfig, path: &Path) -> Result<()> {
    let mut const_file = File::create(path)?;
    writeln!(const_file, "// See build.rs for details")?;
    writeln!(
        const_file,
        "pub const VECTOR_COUNT: usize = {VECTOR_COUNT};"
    )?;
    writeln!(
        const_file,
        "pub const INITIAL_STACK_TOP: usize = {:#010x};",
        board.stack_top()
    )?;
    writeln!(
        const_file,
        "pub const HEAP_LIMIT: usize = {:#010x};",
        board.heap_limit()
    )?;
    Ok(())
}
