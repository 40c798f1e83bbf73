//! Obstacle list message.
//!
//! Obstacles live in the ground plane of the camera frame, so each point is an
//! `(x, z)` pair. The element layout is `#[repr(C)]` and maps 1:1 onto the wire.

use bytemuck::{Pod, Zeroable};

use crate::array::PodArray;
use crate::config::CodecConfig;
use crate::error::Result;
use crate::header::MessageKind;
use crate::message::Message;
use crate::wire::{WireReader, WireWriter};

/// Size of the fixed region before the obstacles.
pub const OBSTACLE_HEADER_SIZE: usize = 512;

/// Wire size of one [`Obstacle`].
pub const OBSTACLE_SIZE: usize = std::mem::size_of::<Obstacle>();

#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

/// Four corners of the obstacle footprint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct BoundingBox {
    pub points: [Vec2; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Obstacle {
    pub bounding_box: BoundingBox,
    /// m/s in the ground plane.
    pub velocity: Vec2,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObstacleData {
    pub time: u64,
    pub frame_id: u64,
    pub obstacles: PodArray<Obstacle>,
}

impl ObstacleData {
    pub fn new(time: u64, frame_id: u64, obstacles: impl Into<PodArray<Obstacle>>) -> Self {
        Self {
            time,
            frame_id,
            obstacles: obstacles.into(),
        }
    }
}

impl Message for ObstacleData {
    const KIND: MessageKind = MessageKind::ObstacleData;

    fn required_size(&self) -> usize {
        OBSTACLE_HEADER_SIZE + self.obstacles.as_bytes().len()
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.array_header(self.time, self.frame_id, self.obstacles.len(), OBSTACLE_HEADER_SIZE);
        w.pod_array(&self.obstacles);
    }

    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self> {
        let (time, frame_id, count) = r.array_header("obstacles", OBSTACLE_HEADER_SIZE, config)?;
        Ok(Self {
            time,
            frame_id,
            obstacles: r.pod_array(count)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    fn square(x: f32, z: f32, half: f32, velocity: Vec2) -> Obstacle {
        Obstacle {
            bounding_box: BoundingBox {
                points: [
                    Vec2::new(x - half, z - half),
                    Vec2::new(x + half, z - half),
                    Vec2::new(x + half, z + half),
                    Vec2::new(x - half, z + half),
                ],
            },
            velocity,
        }
    }

    #[test]
    fn element_is_forty_bytes() {
        assert_eq!(OBSTACLE_SIZE, 40);
    }

    #[test]
    fn roundtrip_preserves_order_and_layout() {
        let data = ObstacleData::new(
            100,
            5,
            vec![
                square(1.0, 10.0, 0.5, Vec2::new(0.0, -1.0)),
                square(-3.0, 25.0, 1.0, Vec2::default()),
            ],
        );
        let wire = data.to_bytes().unwrap();
        assert_eq!(wire.len(), OBSTACLE_HEADER_SIZE + 2 * OBSTACLE_SIZE);
        // first corner x, then the velocity z of the first obstacle
        assert_eq!(&wire[512..516], &0.5f32.to_le_bytes());
        assert_eq!(&wire[548..552], &(-1.0f32).to_le_bytes());

        let decoded = ObstacleData::from_bytes(&wire).unwrap();
        assert_eq!(decoded, data);
        let second = decoded.obstacles.get(1).unwrap();
        assert_eq!(second.bounding_box.points[2], Vec2::new(-2.0, 26.0));
    }

    #[test]
    fn empty_list() {
        let data = ObstacleData::default();
        let wire = data.to_bytes().unwrap();
        assert_eq!(wire.len(), OBSTACLE_HEADER_SIZE);
        assert!(ObstacleData::from_bytes(&wire).unwrap().obstacles.is_empty());
    }

    #[test]
    fn count_above_bound_is_rejected() {
        let mut wire = ObstacleData::new(0, 0, Vec::<Obstacle>::new()).to_bytes().unwrap().to_vec();
        wire[20..28].copy_from_slice(&100_000_001u64.to_le_bytes());
        let err = ObstacleData::from_bytes(&bytes::Bytes::from(wire)).unwrap_err();
        assert!(matches!(err, CodecError::SizeSanity { field: "obstacles", .. }));
    }
}
