// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kiln is a conformance and regression test harness for a
//! graphics-and-compute driver.
//!
//! Tests are static [`TestDef`] descriptors declared with
//! [`test_define!`]. A run is a two-pass protocol: the [`Registry`]'s
//! enable pass decides which registered tests the command-line patterns
//! select, then the [`Runner`]'s execute pass runs exactly those, one at a
//! time, in registration order. Rendered results are checked against
//! golden PNG references through the [`kiln_image`] crate.
//!
//! The `kiln` binary fronts this with a small command table; see
//! [`cmd`].

pub mod cmd;
mod registry;
mod runner;
mod suite;
mod test_def;

pub use registry::Registry;
pub use runner::{RunSummary, Runner};
pub use test_def::{ApiVersion, QueueSetup, StencilRef, TestDef, TestResult};
