use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

pub mod codec;

pub use codec::{decode_message, encode_frame, encode_message, CodecError, MAX_FRAME_SIZE};

pub const MAX_HEALTH: i32 = 100;
pub const BULLET_LIFETIME: f32 = 2.0;
pub const DEFAULT_BULLET_SPEED: f32 = 80.0;
pub const PLAY_AREA_HALF_WIDTH: f32 = 140.0;
pub const PLAY_AREA_MIN_Y: f32 = -5.0;
pub const PLAY_AREA_MAX_Y: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn length(&self) -> f32 {
        self.dot(*self).sqrt()
    }

    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len == 0.0 {
            Vec3::ZERO
        } else {
            *self / len
        }
    }

    pub fn distance(&self, other: Vec3) -> f32 {
        (*self - other).length()
    }

    pub fn axis(&self, index: usize) -> f32 {
        match index {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;

    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// A player's state as fanned out by the relay.
///
/// `joined` introduces the player to receivers, `left` removes it, and a
/// record with neither flag is a position/rotation update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: u32,
    pub username: String,
    pub position: [f32; 3],
    pub rotation: f32,
    pub joined: bool,
    pub left: bool,
    pub health: i32,
}

/// A locally fired bullet; receivers spawn a cosmetic replica from it.
///
/// `direction` is the yaw and `x_direction` the pitch, both in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletRecord {
    pub position: [f32; 3],
    pub direction: f32,
    pub x_direction: f32,
    pub damage: i32,
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// First frame a client sends after connecting.
    Hello { username: String },
    /// Relay reply to `Hello` carrying the per-connection id.
    Welcome { client_id: u32 },
    Player(PlayerRecord),
    Bullet(BulletRecord),
    /// Absolute new health of the named entity, never a delta.
    HealthUpdate { id: u32, health: i32 },
    Restart { seed: u64 },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "hello",
            Message::Welcome { .. } => "welcome",
            Message::Player(_) => "player",
            Message::Bullet(_) => "bullet",
            Message::HealthUpdate { .. } => "health_update",
            Message::Restart { .. } => "restart",
        }
    }
}
