//! Pixel-type tags.
//!
//! A tag packs the element depth code in the low three bits and
//! `channels - 1` above them, so `tag = depth + ((channels - 1) << 3)`.
//! Only single- and three-channel images are carried on the bus.

use std::fmt;

use crate::error::{CodecError, Result};

/// Scalar element type of an image or array buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    U8,
    I8,
    U16,
    I16,
    F32,
    F64,
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        ElementKind::U8,
        ElementKind::I8,
        ElementKind::U16,
        ElementKind::I16,
        ElementKind::F32,
        ElementKind::F64,
    ];

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementKind::U8 | ElementKind::I8 => 1,
            ElementKind::U16 | ElementKind::I16 => 2,
            ElementKind::F32 => 4,
            ElementKind::F64 => 8,
        }
    }

    const fn depth(self) -> u32 {
        match self {
            ElementKind::U8 => 0,
            ElementKind::I8 => 1,
            ElementKind::U16 => 2,
            ElementKind::I16 => 3,
            ElementKind::F32 => 5,
            ElementKind::F64 => 6,
        }
    }

    fn from_depth(depth: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.depth() == depth)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::U8 => "u8",
            ElementKind::I8 => "i8",
            ElementKind::U16 => "u16",
            ElementKind::I16 => "i16",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a Rust scalar to its [`ElementKind`].
pub trait Element: bytemuck::Pod {
    const KIND: ElementKind;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Element for $ty {
            const KIND: ElementKind = ElementKind::$kind;
        })*
    };
}

impl_element! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    f32 => F32,
    f64 => F64,
}

/// A supported (channels, element kind) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelType {
    channels: u32,
    element: ElementKind,
}

const CHANNEL_SHIFT: u32 = 3;
const DEPTH_MASK: u32 = (1 << CHANNEL_SHIFT) - 1;

impl PixelType {
    pub const MONO8: PixelType = PixelType::of(1, ElementKind::U8);
    pub const BGR8: PixelType = PixelType::of(3, ElementKind::U8);
    pub const MONO16: PixelType = PixelType::of(1, ElementKind::U16);
    pub const BGR16: PixelType = PixelType::of(3, ElementKind::U16);
    /// Signed 16-bit disparity.
    pub const DISPARITY16: PixelType = PixelType::of(1, ElementKind::I16);
    pub const MONO32F: PixelType = PixelType::of(1, ElementKind::F32);

    /// Every supported pair: channels in {1, 3} crossed with each element kind.
    pub const ALL: [PixelType; 12] = [
        PixelType::of(1, ElementKind::U8),
        PixelType::of(3, ElementKind::U8),
        PixelType::of(1, ElementKind::I8),
        PixelType::of(3, ElementKind::I8),
        PixelType::of(1, ElementKind::U16),
        PixelType::of(3, ElementKind::U16),
        PixelType::of(1, ElementKind::I16),
        PixelType::of(3, ElementKind::I16),
        PixelType::of(1, ElementKind::F32),
        PixelType::of(3, ElementKind::F32),
        PixelType::of(1, ElementKind::F64),
        PixelType::of(3, ElementKind::F64),
    ];

    const fn of(channels: u32, element: ElementKind) -> Self {
        Self { channels, element }
    }

    pub fn new(channels: u32, element: ElementKind) -> Result<Self> {
        match channels {
            1 | 3 => Ok(Self::of(channels, element)),
            _ => Err(CodecError::UnsupportedPixelType { channels, element }),
        }
    }

    /// Resolve a wire tag.
    pub fn from_tag(tag: u32) -> Result<Self> {
        let element =
            ElementKind::from_depth(tag & DEPTH_MASK).ok_or(CodecError::UnknownPixelTag(tag))?;
        let channels = (tag >> CHANNEL_SHIFT) + 1;
        match channels {
            1 | 3 => Ok(Self::of(channels, element)),
            _ => Err(CodecError::UnknownPixelTag(tag)),
        }
    }

    pub const fn tag(self) -> u32 {
        self.element.depth() + ((self.channels - 1) << CHANNEL_SHIFT)
    }

    pub const fn channels(self) -> u32 {
        self.channels
    }

    pub const fn element(self) -> ElementKind {
        self.element
    }

    pub const fn bytes_per_pixel(self) -> usize {
        self.channels as usize * self.element.size()
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}C{}", self.element, self.channels)
    }
}
