//! Flat telemetry and RPC messages: fixed-size records with no
//! variable-length content.

use crate::config::CodecConfig;
use crate::error::Result;
use crate::header::{MessageKind, HEADER_SIZE};
use crate::message::Message;
use crate::wire::{WireReader, WireWriter};

/// Row-major 3×3 identity.
pub const IDENTITY_3X3: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Row-major 4×4 identity.
pub const IDENTITY_4X4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

pub const NAVIGATION_SIZE: usize = 212;
pub const VELOCITY_SIZE: usize = 60;
pub const SET_BOOL_SIZE: usize = HEADER_SIZE + 1;
pub const CAMERA_PARAMETER_REQUEST_SIZE: usize = HEADER_SIZE + 4;
pub const CAMERA_PARAMETER_RESPONSE_SIZE: usize = HEADER_SIZE + 1;

/// IMU sample in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Imu {
    pub timestamp_ns: u64,
    /// m/s²
    pub acceleration: [f32; 3],
    /// rad/s
    pub gyro: [f32; 3],
    /// gauss
    pub magnetometer: [f32; 3],
    pub temperature_deg_c: f32,
}

/// GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gps {
    pub timestamp_ns: u64,
    pub latitude_deg: f32,
    pub longitude_deg: f32,
    pub altitude_m: f32,
    pub horizontal_uncertainty_m: f32,
    pub vertical_uncertainty_m: f32,
    pub speed_m_s: f32,
    pub course_deg: f32,
    pub fix_type: i32,
    pub num_satellites: i32,
}

/// Odometry in the odometry frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Odometry {
    pub timestamp_ns: u64,
    /// m
    pub position: [f32; 3],
    /// m/s
    pub velocity: [f32; 3],
    /// rad/s
    pub angular_velocity: [f32; 3],
}

/// Combined IMU, GPS and odometry sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Navigation {
    pub timestamp_ns: u64,
    pub imu: Imu,
    pub gps: Gps,
    pub odometry: Odometry,
    /// Row-major transform from the body frame to the raw camera frame.
    pub body_to_raw_camera: [f32; 16],
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            timestamp_ns: 0,
            imu: Imu::default(),
            gps: Gps::default(),
            odometry: Odometry::default(),
            body_to_raw_camera: IDENTITY_4X4,
        }
    }
}

impl Message for Navigation {
    const KIND: MessageKind = MessageKind::Navigation;

    fn required_size(&self) -> usize {
        NAVIGATION_SIZE
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.u64(self.timestamp_ns);

        let imu = &self.imu;
        w.u64(imu.timestamp_ns);
        w.f32_slice(&imu.acceleration);
        w.f32_slice(&imu.gyro);
        w.f32_slice(&imu.magnetometer);
        w.f32(imu.temperature_deg_c);

        let gps = &self.gps;
        w.u64(gps.timestamp_ns);
        w.f32_slice(&[
            gps.latitude_deg,
            gps.longitude_deg,
            gps.altitude_m,
            gps.horizontal_uncertainty_m,
            gps.vertical_uncertainty_m,
            gps.speed_m_s,
            gps.course_deg,
        ]);
        w.i32(gps.fix_type);
        w.i32(gps.num_satellites);

        let odom = &self.odometry;
        w.u64(odom.timestamp_ns);
        w.f32_slice(&odom.position);
        w.f32_slice(&odom.velocity);
        w.f32_slice(&odom.angular_velocity);

        w.f32_slice(&self.body_to_raw_camera);
    }

    fn read_body(r: &mut WireReader, _config: &CodecConfig) -> Result<Self> {
        r.ensure(NAVIGATION_SIZE - HEADER_SIZE)?;
        let timestamp_ns = r.u64()?;

        let imu = Imu {
            timestamp_ns: r.u64()?,
            acceleration: r.f32_array()?,
            gyro: r.f32_array()?,
            magnetometer: r.f32_array()?,
            temperature_deg_c: r.f32()?,
        };

        let gps = Gps {
            timestamp_ns: r.u64()?,
            latitude_deg: r.f32()?,
            longitude_deg: r.f32()?,
            altitude_m: r.f32()?,
            horizontal_uncertainty_m: r.f32()?,
            vertical_uncertainty_m: r.f32()?,
            speed_m_s: r.f32()?,
            course_deg: r.f32()?,
            fix_type: r.i32()?,
            num_satellites: r.i32()?,
        };

        let odometry = Odometry {
            timestamp_ns: r.u64()?,
            position: r.f32_array()?,
            velocity: r.f32_array()?,
            angular_velocity: r.f32_array()?,
        };

        Ok(Self {
            timestamp_ns,
            imu,
            gps,
            odometry,
            body_to_raw_camera: r.f32_array()?,
        })
    }
}

/// Velocity in the odometry frame, with the rotation into the raw camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub time: u64,
    /// m/s
    pub velocity: [f32; 3],
    /// Row-major rotation from the odometry frame to the raw camera frame.
    pub rotation_to_raw_camera: [f32; 9],
}

impl Velocity {
    pub fn new(time: u64, velocity: [f32; 3]) -> Self {
        Self {
            time,
            velocity,
            rotation_to_raw_camera: IDENTITY_3X3,
        }
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self::new(0, [0.0; 3])
    }
}

impl Message for Velocity {
    const KIND: MessageKind = MessageKind::Velocity;

    fn required_size(&self) -> usize {
        VELOCITY_SIZE
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.u64(self.time);
        w.f32_slice(&self.velocity);
        w.f32_slice(&self.rotation_to_raw_camera);
    }

    fn read_body(r: &mut WireReader, _config: &CodecConfig) -> Result<Self> {
        r.ensure(VELOCITY_SIZE - HEADER_SIZE)?;
        Ok(Self {
            time: r.u64()?,
            velocity: r.f32_array()?,
            rotation_to_raw_camera: r.f32_array()?,
        })
    }
}

/// Toggle request (e.g. start/stop recording).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetBoolRequest {
    pub value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetBoolResponse {
    pub success: bool,
}

/// Exposure or gain setpoint sent to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraParameterRequest {
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraParameterResponse {
    pub success: bool,
}

macro_rules! bool_message {
    ($ty:ident, $field:ident, $kind:ident) => {
        impl Message for $ty {
            const KIND: MessageKind = MessageKind::$kind;

            fn required_size(&self) -> usize {
                HEADER_SIZE + 1
            }

            fn write_body(&self, w: &mut WireWriter<'_>) {
                w.bool(self.$field);
            }

            fn read_body(r: &mut WireReader, _config: &CodecConfig) -> Result<Self> {
                Ok(Self { $field: r.bool()? })
            }
        }
    };
}

bool_message!(SetBoolRequest, value, SetBoolRequest);
bool_message!(SetBoolResponse, success, SetBoolResponse);
bool_message!(CameraParameterResponse, success, CameraParameterResponse);

impl Message for CameraParameterRequest {
    const KIND: MessageKind = MessageKind::CameraParameterRequest;

    fn required_size(&self) -> usize {
        CAMERA_PARAMETER_REQUEST_SIZE
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.f32(self.value);
    }

    fn read_body(r: &mut WireReader, _config: &CodecConfig) -> Result<Self> {
        Ok(Self { value: r.f32()? })
    }
}
