// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture-specific support.
//!
//! In practice, this works by
//!
//! - Conditionally defining a nested module (below).
//! - `pub use`-ing its contents
//!
//! On the host, where the unit tests run, `fake` stands in. It answers the
//! harmless questions with zeros and refuses to pretend to boot.
//!
//! Each architecture support module must define the same set of names.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "arm")] {
        pub mod arm_m;
        pub use arm_m::*;
    } else {
        pub mod fake;
        pub use fake::*;
    }
}
