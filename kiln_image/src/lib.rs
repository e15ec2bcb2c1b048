// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats, images and golden-image handling for the Kiln test
//! harness.
//!
//! The harness checks rendered and computed results against reference
//! images stored as PNG files. This crate provides the pieces that make
//! that possible:
//!
//! - [`FormatInfo`]: a static table describing the driver pixel formats the
//!   harness touches (channel count, numeric type, byte size).
//! - [`Image`]: a reference-counted 2D pixel buffer with three backing
//!   variants (caller-supplied pixels, a lazily decoded PNG file, a
//!   snapshot read back from a device resource), supporting mapping, a
//!   closed set of format conversions, and byte-exact comparison.
//! - [`ImageArray`]: an ordered sequence of images sharing one lifetime,
//!   for multi-layer and multi-level sources.
//!
//! Comparison is deliberately exact: a single differing byte fails. The
//! harness tests drivers, and a tolerance would paper over exactly the
//! regressions it exists to catch.

#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]

use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod format;
mod image;
mod png_image;

pub use format::{Format, FormatInfo, NumType};
pub use image::{Image, ImageArray, MapAccess, Mapping};

/// Errors produced by the image, format and PNG layers.
///
/// Every variant is recoverable: the layer logs one diagnostic line at the
/// failure site and returns the error for the caller (usually a test) to
/// interpret. Programmer-contract violations, such as write-mapping a
/// read-only image, panic instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ImageError {
    #[error("no format descriptor is registered for {0:?}")]
    UnknownFormat(Format),
    #[error("cannot create an image with zero width or height")]
    ZeroExtent,
    #[error("pixel buffer holds {actual} bytes, need at least {expected}")]
    ShortPixelBuffer { expected: usize, actual: usize },
    #[error("unknown file extension in {0}")]
    UnknownExtension(String),
    #[error("filename {0} does not have a '.png' extension")]
    NotPng(String),
    #[error(
        "unsupported (color type, bit depth) = ({color_type:?}, {bit_depth:?}) in PNG file {}",
        path.display()
    )]
    UnsupportedPng {
        color_type: png::ColorType,
        bit_depth: png::BitDepth,
        path: PathBuf,
    },
    #[error("cannot write {0} to a PNG file")]
    Unencodable(&'static str),
    #[error("copy source and destination are the same image")]
    SameImage,
    #[error("image formats {a} and {b} differ in channel count")]
    ChannelCountMismatch { a: &'static str, b: &'static str },
    #[error("image extents differ ({a_width}x{a_height} vs {b_width}x{b_height})")]
    ExtentMismatch {
        a_width: u32,
        a_height: u32,
        b_width: u32,
        b_height: u32,
    },
    #[error("destination image is read-only")]
    ReadOnlyDestination,
    #[error("unsupported conversion from {src} to {dest}")]
    UnsupportedConversion {
        src: &'static str,
        dest: &'static str,
    },
    #[error("image formats {a} and {b} are incompatible")]
    IncompatibleFormats { a: &'static str, b: &'static str },
    #[error("rect exceeds image dimensions")]
    RectOutOfBounds,
    #[error("i/o error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to decode PNG file {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: png::DecodingError,
    },
    #[error("failed to encode PNG file {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        source: png::EncodingError,
    },
}
