// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The built-in test suite.
//!
//! Test modules export an ordered `TESTS` slice; this module concatenates
//! the slices in a fixed order, and that concatenation order is the
//! registration order both runner passes iterate in.

use crate::test_def::TestDef;

mod self_image;

static MODULES: &[&[&TestDef]] = &[self_image::TESTS];

/// Every registered test, in registration order.
pub(crate) fn all() -> impl Iterator<Item = &'static TestDef> {
    MODULES.iter().flat_map(|tests| tests.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_order_is_stable() {
        let names: Vec<_> = all().map(|def| def.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len(), "duplicate test names registered");
    }
}
