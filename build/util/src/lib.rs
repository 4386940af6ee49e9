// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers shared by the build scripts of the runtime crates.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::env;

/// Name of the environment variable carrying the board description, as a TOML
/// document.
pub const BOARD_CONFIG_VAR: &str = "TM4C_RT_BOARD_CONFIG";

/// Exposes the CPU's M-profile architecture version. This isn't available in
/// rustc's standard environment.
///
/// This will set one of `cfg(armv6m)`, `cfg(armv7m)`, or `cfg(armv8m)`
/// depending on the value of the `TARGET` environment variable, plus
/// `cfg(has_fpu)` for hard-float targets. Host targets (used for unit tests)
/// get none of them.
pub fn expose_m_profile() -> Result<()> {
    let target = env::var("TARGET").context("TARGET not set by cargo")?;

    for profile in ["armv6m", "armv7m", "armv8m"] {
        println!("cargo::rustc-check-cfg=cfg({profile})");
    }

    println!("cargo::rustc-check-cfg=cfg(has_fpu)");

    if let Some(profile) = m_profile(&target) {
        println!("cargo:rustc-cfg={profile}");
    } else if target.starts_with("thumb") {
        anyhow::bail!("don't know the M-profile of target {target}");
    }
    if has_fpu(&target) {
        println!("cargo:rustc-cfg=has_fpu");
    }
    Ok(())
}

/// Checks whether code for `target` uses the hard-float ABI, and so needs the
/// FPU switched on before it runs.
pub fn has_fpu(target: &str) -> bool {
    target.starts_with("thumb") && target.ends_with("eabihf")
}

/// Maps a target triple onto the M-profile cfg name, if it is one.
pub fn m_profile(target: &str) -> Option<&'static str> {
    if target.starts_with("thumbv6m") {
        Some("armv6m")
    } else if target.starts_with("thumbv7m") || target.starts_with("thumbv7em")
    {
        Some("armv7m")
    } else if target.starts_with("thumbv8m") {
        Some("armv8m")
    } else {
        None
    }
}

/// Pulls the board configuration for purposes of a build script, using
/// `T::default()` if the environment variable is missing. If it's present but
/// fails to parse, this fails with `Err`. As with any serde-driven config, `T`
/// need only describe the parts that a particular build script cares about.
pub fn config_or_default<T: DeserializeOwned + Default>() -> Result<T> {
    toml_from_env_def(BOARD_CONFIG_VAR)
}

/// Parses a configuration document. Split out from the environment plumbing
/// so the parsing rules can be exercised directly.
pub fn parse_config<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).context("board configuration is not valid TOML")
}

fn toml_from_env_def<T: DeserializeOwned + Default>(var: &str) -> Result<T> {
    // We want to emit this whether or not the env var is present, so that we'll
    // be re-run if it becomes present.
    println!("cargo:rerun-if-env-changed={var}");

    let config = match env::var(var) {
        Ok(text) => {
            println!("--- toml for ${var} ---");
            println!("{text}");
            text
        }
        Err(_) => {
            println!("--- var ${var} not present, using default ---");
            return Ok(T::default());
        }
    };
    parse_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        origin: u32,
        #[serde(default)]
        length: u32,
    }

    #[test]
    fn profiles() {
        assert_eq!(m_profile("thumbv6m-none-eabi"), Some("armv6m"));
        assert_eq!(m_profile("thumbv7m-none-eabi"), Some("armv7m"));
        assert_eq!(m_profile("thumbv7em-none-eabihf"), Some("armv7m"));
        assert_eq!(m_profile("thumbv8m.main-none-eabihf"), Some("armv8m"));
        assert_eq!(m_profile("x86_64-unknown-linux-gnu"), None);
    }

    #[test]
    fn fpu_follows_float_abi() {
        assert!(has_fpu("thumbv7em-none-eabihf"));
        assert!(has_fpu("thumbv8m.main-none-eabihf"));
        assert!(!has_fpu("thumbv7em-none-eabi"));
        assert!(!has_fpu("thumbv6m-none-eabi"));
        assert!(!has_fpu("armv7-unknown-linux-gnueabihf"));
    }

    #[test]
    fn parse_accepts_hex_and_defaults() {
        let s: Sample = parse_config("origin = 0x2000_0000").unwrap();
        assert_eq!(
            s,
            Sample {
                origin: 0x2000_0000,
                length: 0
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        assert!(parse_config::<Sample>("origin = 0\nbogus = 1").is_err());
    }
}
