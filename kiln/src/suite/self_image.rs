// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Self-checks of the harness's own image subsystem. These run without a
//! device and keep the comparison machinery honest on machines where the
//! real driver tests cannot run at all.

use kiln_image::{Format, Image, ImageError, MapAccess};

use crate::test_def::{TestDef, TestResult};
use crate::test_define;

pub(super) static TESTS: &[&TestDef] = &[
    &COMPARE_PITCHED,
    &CONVERT_UNORM_TO_FLOAT,
    &STENCIL_GRAYSCALE_REFERENCE,
];

fn check(body: impl FnOnce() -> Result<bool, ImageError>) -> TestResult {
    match body() {
        Ok(true) => TestResult::Pass,
        Ok(false) => TestResult::Fail,
        Err(err) => {
            log::error!("{err}");
            TestResult::Fail
        }
    }
}

/// A tightly packed image must compare equal to the same pixels behind a
/// padded row stride, the layout a linearly-tiled readback produces.
fn compare_pitched() -> TestResult {
    check(|| {
        let tight = Image::from_pixels(vec![0x40; 16], Format::R8Unorm, 4, 4)?;
        let mut padded = vec![0; 8 * 4];
        for row in padded.chunks_exact_mut(8) {
            row[..4].fill(0x40);
        }
        let readback = Image::from_device_readback(padded, Format::R8Unorm, 4, 4)?;
        readback.set_pitch_bytes(8);
        tight.compare(&readback)
    })
}

test_define!(static COMPARE_PITCHED = {
    name: "self.image.compare-pitched",
    start: compare_pitched,
    no_image: true,
});

fn convert_unorm_to_float() -> TestResult {
    check(|| {
        let src = Image::from_pixels((0..=255).collect(), Format::R8Unorm, 16, 16)?;
        let dest = Image::from_pixels(vec![0; 16 * 16 * 4], Format::Depth32Float, 16, 16)?;
        dest.copy_from(&src)?;
        let map = dest.map(MapAccess::READ)?;
        for (i, pixel) in map.chunks_exact(4).enumerate() {
            let value = f32::from_ne_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            if value != i as f32 / 255.0 {
                log::error!("pixel {i} converted to {value}");
                return Ok(false);
            }
        }
        Ok(true)
    })
}

test_define!(static CONVERT_UNORM_TO_FLOAT = {
    name: "self.image.convert-unorm-to-float",
    start: convert_unorm_to_float,
    no_image: true,
});

/// Rendered stencil output is checked against grayscale references; the
/// comparator sanctions exactly that cross-format pair.
fn stencil_grayscale_reference() -> TestResult {
    check(|| {
        let pixels: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
        let stencil = Image::from_pixels(pixels.clone(), Format::Stencil8, 8, 8)?;
        let reference = Image::from_pixels(pixels, Format::R8Unorm, 8, 8)?;
        Ok(stencil.compare(&reference)? && reference.compare(&stencil)?)
    })
}

test_define!(static STENCIL_GRAYSCALE_REFERENCE = {
    name: "self.image.stencil-grayscale-reference",
    start: stencil_grayscale_reference,
    no_image: true,
});
