// Domain-level player records and the small vector type used for shooting rays.

use std::ops::Sub;

// Stored state for one named player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    // Grid cell, always within `[0, grid_size - 1]` on both axes.
    pub x: i32,
    pub y: i32,
    // Terrain height reported by the client for the current cell.
    pub base_y: Option<f64>,
    pub score: u64,
    pub online: bool,
    // Present only while the player owns a live connection.
    pub connection_id: Option<String>,
    // Epoch milliseconds of the last successful write.
    pub last_active: u64,
}

impl Player {
    // Fresh record at the spawn cell.
    pub fn spawn(name: impl Into<String>, connection_id: impl Into<String>, now: u64) -> Self {
        Self {
            name: name.into(),
            x: 0,
            y: 0,
            base_y: None,
            score: 0,
            online: true,
            connection_id: Some(connection_id.into()),
            last_active: now,
        }
    }

    pub fn live_connection(&self) -> Option<LiveConnection> {
        if !self.online {
            return None;
        }
        let connection_id = self.connection_id.as_deref().filter(|id| !id.is_empty())?;
        Some(LiveConnection {
            connection_id: connection_id.to_string(),
            name: self.name.clone(),
        })
    }
}

// A `(connectionId, name)` pair believed to be reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiveConnection {
    pub connection_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    // Unit vector in the same direction, or `None` for zero/non-finite input.
    pub fn normalized(self) -> Option<Vec3> {
        if !self.is_finite() {
            return None;
        }
        let len = self.length_squared().sqrt();
        if len <= f64::EPSILON {
            return None;
        }
        Some(Vec3::new(self.x / len, self.y / len, self.z / len))
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}
