//! Game world, map data points and world storage

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::api::{HostApiClient, HostApiError};

/// Map data point categories read by the game
pub mod data_point {
    pub const SPAWN: &str = "SPAWN";
    pub const CENTER: &str = "CENTER";
    pub const BORDER: &str = "BORDER";
    pub const TIER1_CHEST: &str = "TIER1_CHEST";
    pub const TIER2_CHEST: &str = "TIER2_CHEST";
}

/// A point in the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0, yaw: 0.0, pitch: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, yaw: 0.0, pitch: 0.0 }
    }

    /// Horizontal (XZ-plane) distance to another position
    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Copy of this position rotated to face `target` on the horizontal plane
    pub fn facing(&self, target: &Position) -> Position {
        let dx = target.x - self.x;
        let dz = target.z - self.z;
        let yaw = (-dx).atan2(dz).to_degrees() as f32;
        Position { yaw, ..*self }
    }
}

/// An in-progress border shrink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderTarget {
    pub size: f64,
    pub remaining_ticks: u32,
}

/// World border with a shrink target
#[derive(Debug, Clone)]
pub struct WorldBorder {
    pub center: Position,
    /// Current diameter
    pub size: f64,
    pub target: Option<BorderTarget>,
    pub damage_per_second: f64,
    pub damage_buffer: f64,
    pub warning_distance: u32,
}

impl WorldBorder {
    pub fn new(center: Position, size: f64) -> Self {
        Self {
            center,
            size,
            target: None,
            damage_per_second: 0.2,
            damage_buffer: 5.0,
            warning_distance: 5,
        }
    }

    /// Begin shrinking to a new diameter over `seconds`
    pub fn shrink_to(&mut self, size: f64, seconds: u32) {
        if seconds == 0 || (size - self.size).abs() < f64::EPSILON {
            self.size = size;
            self.target = None;
        } else {
            self.target = Some(BorderTarget {
                size,
                remaining_ticks: seconds * crate::util::time::TICKS_PER_SECOND,
            });
        }
    }

    /// Advance one simulation step of the active shrink
    pub fn tick(&mut self) {
        if let Some(target) = &mut self.target {
            let step = (self.size - target.size) / target.remaining_ticks as f64;
            self.size -= step;
            target.remaining_ticks -= 1;
            if target.remaining_ticks == 0 {
                self.size = target.size;
                self.target = None;
            }
        }
    }

    /// Whether a position lies inside the border square
    pub fn contains(&self, position: &Position) -> bool {
        let half = self.size / 2.0;
        (position.x - self.center.x).abs() <= half && (position.z - self.center.z).abs() <= half
    }
}

/// Template metadata stored next to the world files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldTemplate {
    pub name: String,
    #[serde(default)]
    pub data_points: HashMap<String, Vec<Position>>,
}

/// The world the current match plays in
#[derive(Debug)]
pub struct GameWorld {
    pub name: String,
    data_points: HashMap<String, Vec<Position>>,
    pub border: WorldBorder,
    /// Set once the missing-center fallback has been logged
    warned_missing_center: bool,
}

impl GameWorld {
    pub fn new(name: impl Into<String>, data_points: HashMap<String, Vec<Position>>) -> Self {
        let mut world = Self {
            name: name.into(),
            data_points,
            border: WorldBorder::new(Position::ORIGIN, 256.0),
            warned_missing_center: false,
        };
        let center = world.center();
        let size = world.initial_border_size(center);
        world.border = WorldBorder::new(center, size);
        world
    }

    /// Load a world from its template metadata file
    pub fn from_template_file(path: &Path) -> Result<Self, WorldError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| WorldError::Read { path: path.display().to_string(), source: e })?;
        let template: WorldTemplate = serde_json::from_str(&raw)
            .map_err(|e| WorldError::Parse { path: path.display().to_string(), source: e })?;
        Ok(Self::new(template.name, template.data_points))
    }

    pub fn data_points(&self, category: &str) -> &[Position] {
        self.data_points
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Map center, falling back to the origin when the map defines none
    ///
    /// The fallback is logged once per world.
    pub fn center(&mut self) -> Position {
        match self.data_points(data_point::CENTER).first() {
            Some(p) => *p,
            None => {
                if !self.warned_missing_center {
                    self.warned_missing_center = true;
                    warn!(world = %self.name, "Map defines no center point, using origin");
                }
                Position::ORIGIN
            }
        }
    }

    /// Initial border diameter: twice the farthest axis-aligned distance
    /// from the center across all border markers, 256 blocks when the map
    /// defines none
    pub fn initial_border_size(&self, center: Position) -> f64 {
        let points = self.data_points(data_point::BORDER);
        if points.is_empty() {
            return 256.0;
        }
        let radius = points
            .iter()
            .map(|p| (p.x - center.x).abs().max((p.z - center.z).abs()))
            .fold(0.0, f64::max);
        radius * 2.0
    }

    pub fn spawns(&self) -> &[Position] {
        self.data_points(data_point::SPAWN)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Failed to read world template {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("Failed to parse world template {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

/// Persistent world storage backed by a platform bucket
#[derive(Clone)]
pub struct WorldStoreClient {
    client: HostApiClient,
    bucket: String,
}

impl WorldStoreClient {
    pub fn new(client: HostApiClient, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    /// Download a serialized world by name
    pub async fn load(&self, name: &str) -> Result<Vec<u8>, HostApiError> {
        self.client.download_object(&self.bucket, name).await
    }

    /// Delete a stored world by name
    pub async fn delete(&self, name: &str) -> Result<(), HostApiError> {
        self.client.delete_object(&self.bucket, name).await
    }
}
