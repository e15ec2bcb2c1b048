// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static descriptions of the driver pixel formats the harness touches.
//!
//! This table is the single source of truth for channel counts, numeric
//! types and byte sizes. Adding a pixel format anywhere in the harness
//! means adding one row here.

/// A pixel format of the driver API under test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Sentinel; never registered in the format table.
    Undefined,
    R8Unorm,
    Rgba8Unorm,
    R16Unorm,
    R32Float,
    R32Uint,
    Depth16Unorm,
    /// 24-bit depth in the low bits of a 32-bit word.
    Depth24Unorm,
    Depth32Float,
    Stencil8,
    Depth16UnormStencil8,
    Depth24UnormStencil8,
    Depth32FloatStencil8,
    Bc3RgbaUnorm,
}

/// Numeric interpretation of a format's channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NumType {
    /// Packed depth-stencil composites have no single numeric type.
    Composite,
    Unorm,
    Float,
    Uint,
}

/// Channel layout and numeric interpretation of a [`Format`].
///
/// All descriptors live in one static table; [`FormatInfo::lookup`] returns
/// references into it, so descriptors can be compared by address.
#[derive(Debug)]
pub struct FormatInfo {
    pub format: Format,
    pub name: &'static str,
    pub num_type: NumType,
    /// Number of channels, 1-4.
    pub channels: u8,
    /// Bytes per pixel as far as mapping and comparison are concerned.
    /// Zero for block-compressed formats, which only support identity
    /// copies.
    pub cpp: u8,
    pub is_color: bool,
    pub has_alpha: bool,
    /// For depth-bearing formats, the format of the depth aspect.
    pub depth_format: Option<Format>,
    /// For stencil-bearing formats, the format of the stencil aspect.
    pub stencil_format: Option<Format>,
}

const BASE: FormatInfo = FormatInfo {
    format: Format::Undefined,
    name: "Undefined",
    num_type: NumType::Composite,
    channels: 0,
    cpp: 0,
    is_color: false,
    has_alpha: false,
    depth_format: None,
    stencil_format: None,
};

static FORMAT_TABLE: &[FormatInfo] = &[
    FormatInfo {
        format: Format::R8Unorm,
        name: "R8Unorm",
        num_type: NumType::Unorm,
        channels: 1,
        cpp: 1,
        is_color: true,
        ..BASE
    },
    FormatInfo {
        format: Format::Rgba8Unorm,
        name: "Rgba8Unorm",
        num_type: NumType::Unorm,
        channels: 4,
        cpp: 4,
        is_color: true,
        has_alpha: true,
        ..BASE
    },
    FormatInfo {
        format: Format::R16Unorm,
        name: "R16Unorm",
        num_type: NumType::Unorm,
        channels: 1,
        cpp: 2,
        is_color: true,
        ..BASE
    },
    FormatInfo {
        format: Format::R32Float,
        name: "R32Float",
        num_type: NumType::Float,
        channels: 1,
        cpp: 4,
        is_color: true,
        ..BASE
    },
    FormatInfo {
        format: Format::R32Uint,
        name: "R32Uint",
        num_type: NumType::Uint,
        channels: 1,
        cpp: 4,
        is_color: true,
        ..BASE
    },
    FormatInfo {
        format: Format::Depth16Unorm,
        name: "Depth16Unorm",
        num_type: NumType::Unorm,
        channels: 1,
        cpp: 2,
        depth_format: Some(Format::Depth16Unorm),
        ..BASE
    },
    FormatInfo {
        format: Format::Depth24Unorm,
        name: "Depth24Unorm",
        num_type: NumType::Unorm,
        channels: 1,
        cpp: 3,
        depth_format: Some(Format::Depth24Unorm),
        ..BASE
    },
    FormatInfo {
        format: Format::Depth32Float,
        name: "Depth32Float",
        num_type: NumType::Float,
        channels: 1,
        cpp: 4,
        depth_format: Some(Format::Depth32Float),
        ..BASE
    },
    FormatInfo {
        format: Format::Stencil8,
        name: "Stencil8",
        num_type: NumType::Uint,
        channels: 1,
        cpp: 1,
        stencil_format: Some(Format::Stencil8),
        ..BASE
    },
    FormatInfo {
        format: Format::Depth16UnormStencil8,
        name: "Depth16UnormStencil8",
        num_type: NumType::Composite,
        channels: 2,
        cpp: 3,
        depth_format: Some(Format::Depth16Unorm),
        stencil_format: Some(Format::Stencil8),
        ..BASE
    },
    FormatInfo {
        format: Format::Depth24UnormStencil8,
        name: "Depth24UnormStencil8",
        num_type: NumType::Composite,
        channels: 2,
        cpp: 4,
        depth_format: Some(Format::Depth24Unorm),
        stencil_format: Some(Format::Stencil8),
        ..BASE
    },
    FormatInfo {
        format: Format::Depth32FloatStencil8,
        name: "Depth32FloatStencil8",
        num_type: NumType::Composite,
        channels: 2,
        cpp: 5,
        depth_format: Some(Format::Depth32Float),
        stencil_format: Some(Format::Stencil8),
        ..BASE
    },
    FormatInfo {
        format: Format::Bc3RgbaUnorm,
        name: "Bc3RgbaUnorm",
        num_type: NumType::Unorm,
        is_color: true,
        ..BASE
    },
    // Sentinel; lookup stops here.
    BASE,
];

impl FormatInfo {
    /// Looks up the descriptor for `format`.
    ///
    /// Returns `None` for formats without a table row, including
    /// [`Format::Undefined`] itself.
    pub fn lookup(format: Format) -> Option<&'static FormatInfo> {
        FORMAT_TABLE
            .iter()
            .take_while(|info| info.format != Format::Undefined)
            .find(|info| info.format == format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_matching_descriptor() {
        for info in FORMAT_TABLE
            .iter()
            .take_while(|info| info.format != Format::Undefined)
        {
            let found = FormatInfo::lookup(info.format).unwrap();
            assert_eq!(found.format, info.format);
            assert!(std::ptr::eq(found, info));
        }
    }

    #[test]
    fn lookup_undefined_is_none() {
        assert!(FormatInfo::lookup(Format::Undefined).is_none());
    }

    #[test]
    fn composite_formats_link_their_aspects() {
        let info = FormatInfo::lookup(Format::Depth24UnormStencil8).unwrap();
        assert_eq!(info.depth_format, Some(Format::Depth24Unorm));
        assert_eq!(info.stencil_format, Some(Format::Stencil8));
        assert_eq!(info.channels, 2);
    }

    #[test]
    fn block_compressed_formats_have_no_cpp() {
        let info = FormatInfo::lookup(Format::Bc3RgbaUnorm).unwrap();
        assert_eq!(info.cpp, 0);
        assert!(info.is_color);
    }
}
