// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test descriptors: the static record a test author hands the framework.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use kiln_image::Format;

/// How to set up the test's default queue.
///
/// This essentially specifies whether the test uses graphics, compute
/// and/or transfer operations; the device layer picks a matching queue
/// family from it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum QueueSetup {
    /// Graphics and compute; the default when a test does not specify.
    #[default]
    GraphicsAndCompute,
    Graphics,
    Compute,
    Transfer,
}

/// Outcome of a single test.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestResult::Pass => "pass",
            TestResult::Fail => "fail",
            TestResult::Skip => "skip",
        };
        f.write_str(s)
    }
}

/// Minimum driver API version a test requires.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const V1_0: ApiVersion = ApiVersion::new(1, 0);

    pub const fn new(major: u32, minor: u32) -> ApiVersion {
        ApiVersion { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Which reference stencil image, if any, a test checks against.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StencilRef {
    /// The test has no reference stencil image.
    None,
    /// The default filename `{test_name}.ref-stencil.png`.
    Default,
    /// A custom filename, relative to the data directory.
    Named(&'static str),
}

/// A test definition.
///
/// Descriptors are immutable statics; the runner keeps its per-run
/// scheduling state (the enable flag and queue preference) in the registry,
/// never in the descriptor, so a test cannot modify its own definition
/// while running.
///
/// Declare one with [`test_define!`](crate::test_define); every field the
/// declaration leaves out stays at its default.
pub struct TestDef {
    /// The test name must be a valid filename with no path separator.
    pub name: &'static str,

    /// The test's entry point. Panics inside the test are caught by the
    /// runner and recorded as failures.
    pub start: fn() -> TestResult,

    /// Filename of the test's reference image, relative to the data
    /// directory. If unset, the default `{test_name}.ref.png` is used.
    pub image_filename: Option<&'static str>,

    /// If set, [`TestDef::depthstencil_format`] must also be set.
    pub ref_stencil_filename: StencilRef,

    pub samples: u32,

    /// The test renders no image at all; no default framebuffer is created.
    pub no_image: bool,

    /// If and only if set, the test's default framebuffer gets a
    /// depth-stencil attachment of this format.
    pub depthstencil_format: Option<Format>,

    /// Skip this test. Useful for work-in-progress tests.
    pub skip: bool,

    pub queue_setup: QueueSetup,

    pub api_version: ApiVersion,

    pub robust_buffer_access: bool,
    pub robust_image_access: bool,

    /// Reserved for the test author. The framework never touches this.
    pub user_data: Option<&'static (dyn Any + Sync)>,
}

impl TestDef {
    /// A descriptor with every optional field at its default.
    pub const fn new(name: &'static str, start: fn() -> TestResult) -> TestDef {
        TestDef {
            name,
            start,
            image_filename: None,
            ref_stencil_filename: StencilRef::None,
            samples: 0,
            no_image: false,
            depthstencil_format: None,
            skip: false,
            queue_setup: QueueSetup::GraphicsAndCompute,
            api_version: ApiVersion::V1_0,
            robust_buffer_access: false,
            robust_image_access: false,
            user_data: None,
        }
    }

    /// Filename of the test's reference image, relative to the data
    /// directory.
    ///
    /// Defined even when [`TestDef::no_image`] is set, for tests that
    /// generate their reference image at runtime and wish to dump it.
    pub fn reference_filename(&self) -> Cow<'static, str> {
        match self.image_filename {
            Some(filename) => Cow::Borrowed(filename),
            None => Cow::Owned(format!("{}.ref.png", self.name)),
        }
    }

    /// Filename of the test's reference stencil image, if it has one.
    pub fn reference_stencil_filename(&self) -> Option<Cow<'static, str>> {
        match self.ref_stencil_filename {
            StencilRef::None => None,
            StencilRef::Default => Some(Cow::Owned(format!("{}.ref-stencil.png", self.name))),
            StencilRef::Named(filename) => Some(Cow::Borrowed(filename)),
        }
    }
}

/// Declares a static [`TestDef`], filling unspecified fields with their
/// defaults.
///
/// ```
/// use kiln::{test_define, QueueSetup, TestResult};
///
/// fn fill_buffer() -> TestResult {
///     TestResult::Pass
/// }
///
/// test_define!(static FILL_BUFFER = {
///     name: "func.buffer.fill",
///     start: fill_buffer,
///     queue_setup: QueueSetup::Transfer,
/// });
/// ```
#[macro_export]
macro_rules! test_define {
    ($vis:vis static $ident:ident = {
        name: $name:expr,
        start: $start:expr
        $(, $field:ident: $value:expr)* $(,)?
    }) => {
        $vis static $ident: $crate::TestDef = {
            let mut def = $crate::TestDef::new($name, $start);
            $(def.$field = $value;)*
            def
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TestResult {
        TestResult::Pass
    }

    test_define!(static PLAIN = {
        name: "func.example.plain",
        start: noop,
    });

    test_define!(static CUSTOMIZED = {
        name: "func.example.customized",
        start: noop,
        image_filename: Some("shared.ref.png"),
        ref_stencil_filename: StencilRef::Default,
        depthstencil_format: Some(Format::Depth24UnormStencil8),
        samples: 4,
        queue_setup: QueueSetup::Compute,
    });

    #[test]
    fn defaults_are_filled_in() {
        assert_eq!(PLAIN.samples, 0);
        assert_eq!(PLAIN.queue_setup, QueueSetup::GraphicsAndCompute);
        assert_eq!(PLAIN.api_version, ApiVersion::V1_0);
        assert!(!PLAIN.skip);
        assert_eq!(PLAIN.reference_filename(), "func.example.plain.ref.png");
        assert_eq!(PLAIN.reference_stencil_filename(), None);
    }

    #[test]
    fn overrides_are_applied() {
        assert_eq!(CUSTOMIZED.reference_filename(), "shared.ref.png");
        assert_eq!(
            CUSTOMIZED.reference_stencil_filename().as_deref(),
            Some("func.example.customized.ref-stencil.png")
        );
        assert_eq!(CUSTOMIZED.samples, 4);
        assert_eq!(CUSTOMIZED.queue_setup, QueueSetup::Compute);
    }
}
