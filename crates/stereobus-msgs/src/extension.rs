//! Known layouts for the opaque image extension bytes.
//!
//! The codec itself treats the extension as opaque. Producers on the bus use
//! a handful of conventions, recognized here by length and tag:
//!
//! - top/bottom raw images carry the second camera's timestamp (u64),
//! - occupancy maps carry their metric extent and cell size (5 × f32),
//! - images published with extrinsics carry a 16-byte tag followed by
//!   Euler angles and a translation (6 × f64).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::image::Image;

/// Length of a secondary-timestamp extension.
pub const SECONDARY_TIMESTAMP_SIZE: usize = 8;

/// Length of an occupancy-map metadata extension.
pub const OCCUPANCY_METADATA_SIZE: usize = 5 * 4;

/// Tag that opens an extrinsics extension.
pub const EXTRINSICS_TAG: [u8; 16] = [
    0x2c, 0x5e, 0x9c, 0x77, 0xa7, 0x30, 0x42, 0xce, 0xac, 0x21, 0xc3, 0x3e, 0x26, 0x79, 0x3b, 0xcb,
];

/// Length of an extrinsics extension, tag included.
pub const EXTRINSICS_SIZE: usize = EXTRINSICS_TAG.len() + 6 * 8;

/// Metric extent of an occupancy-map image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OccupancyMetadata {
    pub x_min: f32,
    pub x_max: f32,
    pub z_min: f32,
    pub z_max: f32,
    pub cell_size: f32,
}

impl OccupancyMetadata {
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(OCCUPANCY_METADATA_SIZE);
        for value in [self.x_min, self.x_max, self.z_min, self.z_max, self.cell_size] {
            buf.put_f32_le(value);
        }
        buf.freeze()
    }

    pub fn parse(mut src: &[u8]) -> Option<Self> {
        if src.len() != OCCUPANCY_METADATA_SIZE {
            return None;
        }
        Some(Self {
            x_min: src.get_f32_le(),
            x_max: src.get_f32_le(),
            z_min: src.get_f32_le(),
            z_max: src.get_f32_le(),
            cell_size: src.get_f32_le(),
        })
    }
}

/// Camera extrinsics: Euler angles in degrees and a translation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extrinsics {
    pub euler_x_deg: f64,
    pub euler_y_deg: f64,
    pub euler_z_deg: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

impl Extrinsics {
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(EXTRINSICS_SIZE);
        buf.put_slice(&EXTRINSICS_TAG);
        for value in [
            self.euler_x_deg,
            self.euler_y_deg,
            self.euler_z_deg,
            self.tx,
            self.ty,
            self.tz,
        ] {
            buf.put_f64_le(value);
        }
        buf.freeze()
    }

    pub fn parse(src: &[u8]) -> Option<Self> {
        if src.len() != EXTRINSICS_SIZE {
            return None;
        }
        let (tag, mut body) = src.split_at(EXTRINSICS_TAG.len());
        if tag != EXTRINSICS_TAG {
            return None;
        }
        Some(Self {
            euler_x_deg: body.get_f64_le(),
            euler_y_deg: body.get_f64_le(),
            euler_z_deg: body.get_f64_le(),
            tx: body.get_f64_le(),
            ty: body.get_f64_le(),
            tz: body.get_f64_le(),
        })
    }
}

impl Image {
    /// The second camera's timestamp, if the extension carries one.
    pub fn secondary_timestamp(&self) -> Option<u64> {
        let raw: [u8; SECONDARY_TIMESTAMP_SIZE] = self.extension.as_ref().try_into().ok()?;
        Some(u64::from_le_bytes(raw))
    }

    pub fn with_secondary_timestamp(self, time: u64) -> Self {
        self.with_extension(Bytes::copy_from_slice(&time.to_le_bytes()))
    }

    pub fn occupancy_metadata(&self) -> Option<OccupancyMetadata> {
        OccupancyMetadata::parse(&self.extension)
    }

    pub fn extrinsics(&self) -> Option<Extrinsics> {
        Extrinsics::parse(&self.extension)
    }
}
